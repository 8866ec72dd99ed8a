// fps_bot_core/server/src/systems/ai/states.rs
use crate::core::config::StateTuning;
use crate::core::types::TimeMs;
use crate::operational::monitoring::metrics::BOT_STATE_TRANSITIONS_TOTAL;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BotStateKind {
    Idle,
    Curious,
    Attack,
    /// Reserved; no selection logic enters it.
    Grenade,
    /// Reserved; no selection logic enters it.
    Weapon,
}

impl BotStateKind {
    pub fn name(self) -> &'static str {
        match self {
            BotStateKind::Idle => "idle",
            BotStateKind::Curious => "curious",
            BotStateKind::Attack => "attack",
            BotStateKind::Grenade => "grenade",
            BotStateKind::Weapon => "weapon",
        }
    }
}

impl fmt::Display for BotStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Enter/exit side effects, supplied by the owner of the state machine.
pub trait StateHooks {
    fn on_exit(&mut self, state: BotStateKind);
    fn on_enter(&mut self, state: BotStateKind);
}

/// Exactly one active state, with hysteresis on every change.
#[derive(Debug, Clone)]
pub struct BotStateMachine {
    current: Option<BotStateKind>,
    last_transition: Option<TimeMs>,
    transitions: u64,
}

impl Default for BotStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl BotStateMachine {
    pub fn new() -> Self {
        BotStateMachine { current: None, last_transition: None, transitions: 0 }
    }

    /// Starts in `state` without counting a transition.
    pub fn with_initial(state: BotStateKind) -> Self {
        BotStateMachine { current: Some(state), last_transition: None, transitions: 0 }
    }

    pub fn current(&self) -> Option<BotStateKind> {
        self.current
    }

    pub fn last_transition(&self) -> Option<TimeMs> {
        self.last_transition
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn should_transition(&self, desired: BotStateKind, now: TimeMs, tuning: &StateTuning) -> bool {
        let Some(current) = self.current else { return true };
        if current == desired {
            return false;
        }
        let Some(last) = self.last_transition else { return true };
        let elapsed = now.saturating_sub(last);
        if elapsed < tuning.min_transition_ms {
            return false;
        }
        if current == BotStateKind::Attack && elapsed < tuning.attack_exit_delay_ms {
            return false;
        }
        true
    }

    /// Applies `desired` if hysteresis allows. Returns whether the state changed.
    pub fn request(
        &mut self,
        desired: BotStateKind,
        now: TimeMs,
        tuning: &StateTuning,
        hooks: &mut dyn StateHooks,
    ) -> bool {
        if !self.should_transition(desired, now, tuning) {
            return false;
        }
        self.force(desired, now, hooks);
        true
    }

    /// Switches to `state` regardless of hysteresis. Used for self-healing.
    pub fn recover(&mut self, state: BotStateKind, now: TimeMs, hooks: &mut dyn StateHooks) {
        if self.current == Some(state) {
            return;
        }
        self.force(state, now, hooks);
    }

    fn force(&mut self, state: BotStateKind, now: TimeMs, hooks: &mut dyn StateHooks) {
        if let Some(previous) = self.current {
            hooks.on_exit(previous);
            debug!("state {} -> {}", previous, state);
        }
        hooks.on_enter(state);
        self.current = Some(state);
        self.last_transition = Some(now);
        self.transitions += 1;
        metrics::counter!(BOT_STATE_TRANSITIONS_TOTAL, "to" => state.name()).increment(1);
    }
}
