// fps_bot_core/server/src/concurrent/event_queue.rs
use crate::core::types::{EntityHandle, EventKind, NoticeEvent, Vec3};
use crossbeam_queue::SegQueue;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPriority {
    High,
    Normal,
    Low,
}

/// Notifications raised by the host for the bot controllers.
#[derive(Debug, Clone, PartialEq)]
pub enum BotNotification {
    /// A sound, explosion or voice line heard by every agent in range.
    Broadcast { position: Vec3, kind: EventKind, originator: EntityHandle, radius: f32 },
    /// An event already resolved for one agent.
    Notice { target: EntityHandle, event: NoticeEvent },
    Killed { victim: EntityHandle, attacker: Option<EntityHandle> },
    GotKill { killer: EntityHandle, victim: EntityHandle },
    Spawned { entity: EntityHandle },
    StuffText { target: EntityHandle, text: String },
}

impl BotNotification {
    pub fn priority(&self) -> EventPriority {
        match self {
            BotNotification::Killed { .. } | BotNotification::GotKill { .. } | BotNotification::Spawned { .. } => {
                EventPriority::High
            }
            BotNotification::Broadcast { kind, .. } if kind.is_minor() => EventPriority::Low,
            BotNotification::Notice { event, .. } if event.kind.is_minor() => EventPriority::Low,
            _ => EventPriority::Normal,
        }
    }
}

// Lock-free queue with priority lanes
pub struct PriorityEventQueue {
    high_priority: SegQueue<BotNotification>,
    normal_priority: SegQueue<BotNotification>,
    low_priority: SegQueue<BotNotification>,
}

impl PriorityEventQueue {
    pub fn new() -> Self {
        PriorityEventQueue {
            high_priority: SegQueue::new(),
            normal_priority: SegQueue::new(),
            low_priority: SegQueue::new(),
        }
    }

    pub fn push(&self, event: BotNotification) {
        match event.priority() {
            EventPriority::High => self.high_priority.push(event),
            EventPriority::Normal => self.normal_priority.push(event),
            EventPriority::Low => self.low_priority.push(event),
        }
    }

    pub fn pop(&self) -> Option<BotNotification> {
        self.high_priority
            .pop()
            .or_else(|| self.normal_priority.pop())
            .or_else(|| self.low_priority.pop())
    }

    pub fn pop_batch(&self, max_count: usize) -> Vec<BotNotification> {
        let mut batch = Vec::with_capacity(max_count.min(self.len()));
        while batch.len() < max_count {
            match self.pop() {
                Some(event) => batch.push(event),
                None => break,
            }
        }
        batch
    }

    pub fn is_empty(&self) -> bool {
        self.high_priority.is_empty() && self.normal_priority.is_empty() && self.low_priority.is_empty()
    }

    pub fn len(&self) -> usize {
        self.high_priority.len() + self.normal_priority.len() + self.low_priority.len()
    }
}

impl Default for PriorityEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable, thread-safe entry point for notifications. Safe to call while
/// any agent is mid-tick: events are only applied when the manager drains them.
#[derive(Clone, Default)]
pub struct BotEventSender {
    queue: Arc<PriorityEventQueue>,
}

impl BotEventSender {
    pub fn new(queue: Arc<PriorityEventQueue>) -> Self {
        BotEventSender { queue }
    }

    pub fn send(&self, notification: BotNotification) {
        self.queue.push(notification);
    }

    pub fn broadcast(&self, position: Vec3, kind: EventKind, originator: EntityHandle, radius: f32) {
        self.send(BotNotification::Broadcast { position, kind, originator, radius });
    }

    pub fn notice(&self, target: EntityHandle, event: NoticeEvent) {
        self.send(BotNotification::Notice { target, event });
    }

    pub fn killed(&self, victim: EntityHandle, attacker: Option<EntityHandle>) {
        self.send(BotNotification::Killed { victim, attacker });
    }

    pub fn got_kill(&self, killer: EntityHandle, victim: EntityHandle) {
        self.send(BotNotification::GotKill { killer, victim });
    }

    pub fn spawned(&self, entity: EntityHandle) {
        self.send(BotNotification::Spawned { entity });
    }

    pub fn stuff_text(&self, target: EntityHandle, text: impl Into<String>) {
        self.send(BotNotification::StuffText { target, text: text.into() });
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
