// fps_bot_core/server/src/systems/ai/commands.rs
//! Console command text issued on behalf of an agent.

use crate::core::error::{BotError, BotResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

/// Splits command text into whitespace-separated tokens. Double quotes group
/// a token and may contain spaces.
pub fn tokenize(text: &str) -> BotResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;

    for ch in text.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                in_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_quotes {
        return Err(BotError::MalformedCommand(format!("unterminated quote in {:?}", text)));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

pub fn parse_command(text: &str) -> BotResult<ParsedCommand> {
    let mut tokens = tokenize(text)?.into_iter();
    let name = match tokens.next() {
        Some(name) if !name.is_empty() => name,
        _ => return Err(BotError::MalformedCommand("empty command".into())),
    };
    Ok(ParsedCommand { name, args: tokens.collect() })
}
