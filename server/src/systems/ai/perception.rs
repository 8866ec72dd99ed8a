// fps_bot_core/server/src/systems/ai/perception.rs
// Enemy tracking, target acquisition, reaction time and curiosity.

use super::random;
use crate::core::config::PerceptionTuning;
use crate::core::types::*;
use crate::world::WorldQuery;
use rand::Rng;
use smallvec::SmallVec;
use tracing::{debug, trace};

/// The controlled agent as seen by the validity rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentIdentity {
    pub handle: EntityHandle,
    pub team: Team,
    pub faction: u8,
    pub origin: Vec3,
}

impl AgentIdentity {
    pub fn from_client(handle: EntityHandle, client: &ClientView) -> Self {
        AgentIdentity { handle, team: client.team, faction: client.faction, origin: client.origin }
    }
}

/// Whether `candidate` may be targeted by `me`.
pub fn is_valid_enemy(candidate: &EntityView, me: &AgentIdentity, team_play: bool) -> bool {
    if candidate.handle == me.handle {
        return false;
    }
    if candidate.hidden || candidate.no_target || candidate.dead || !candidate.solid {
        return false;
    }
    match candidate.kind {
        EntityKind::Player { team } => !(team_play && team == me.team),
        EntityKind::Npc { faction } => faction != me.faction,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeTagCache {
    Unresolved,
    Resolved(TagId),
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyRecord {
    pub handle: EntityHandle,
    pub last_position: Vec3,
    /// Position at the start of the previous attack tick.
    pub old_position: Vec3,
    pub last_seen: TimeMs,
    pub eye_tag: EyeTagCache,
}

impl EnemyRecord {
    fn new(handle: EntityHandle, position: Vec3, now: TimeMs) -> Self {
        EnemyRecord { handle, last_position: position, old_position: Vec3::ZERO, last_seen: now, eye_tag: EyeTagCache::Unresolved }
    }
}

/// Result of the per-tick attack-eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackCheck {
    /// An enemy is visible.
    Engaged,
    /// Nothing visible, but the attack-active window is still open.
    Grace,
    /// The window lapsed this tick; the enemy record was cleared.
    Lapsed,
    Idle,
}

impl AttackCheck {
    pub fn is_attacking(self) -> bool {
        matches!(self, AttackCheck::Engaged | AttackCheck::Grace)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CuriosityCheck {
    Inactive,
    /// The curiosity window ran out this tick and was cleared.
    Expired,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Curiosity {
    pub until: TimeMs,
    pub target: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeOutcome {
    Ignored,
    Curious,
    Engaged,
}

#[derive(Debug, Clone, Default)]
pub struct EnemyPerceptionTracker {
    enemy: Option<EnemyRecord>,
    attack_active_until: Option<TimeMs>,
    last_unseen: Option<TimeMs>,
    reaction_deadline: Option<TimeMs>,
    last_full_scan: Option<TimeMs>,
    curiosity: Option<Curiosity>,
}

/// Reaction delay in milliseconds for an enemy at `distance_squared`.
/// `variance_roll` is the random part, already drawn from `[0, (1 - skill) * variance)`.
pub fn reaction_delay_ms(tuning: &PerceptionTuning, skill: Skill, distance_squared: f32, variance_roll: f32) -> f32 {
    let max_d2 = tuning.reaction_distance_max * tuning.reaction_distance_max;
    let base = (tuning.reaction_base_max_ms * (distance_squared / max_d2).min(1.0)).min(tuning.reaction_base_max_ms);
    let multiplier = tuning.reaction_multiplier_max
        - skill.value() * (tuning.reaction_multiplier_max - tuning.reaction_multiplier_min);
    (base + tuning.reaction_fixed_ms + variance_roll) * multiplier
}

impl EnemyPerceptionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enemy(&self) -> Option<&EnemyRecord> {
        self.enemy.as_ref()
    }

    pub fn enemy_handle(&self) -> Option<EntityHandle> {
        self.enemy.map(|e| e.handle)
    }

    pub fn attack_active_until(&self) -> Option<TimeMs> {
        self.attack_active_until
    }

    pub fn last_unseen(&self) -> Option<TimeMs> {
        self.last_unseen
    }

    pub fn reaction_deadline(&self) -> Option<TimeMs> {
        self.reaction_deadline
    }

    pub fn curiosity(&self) -> Option<Curiosity> {
        self.curiosity
    }

    /// Curiosity deadline, zero when no curiosity is active.
    pub fn curiosity_until(&self) -> TimeMs {
        self.curiosity.map_or(0, |c| c.until)
    }

    /// Curiosity point, the origin when no curiosity is active.
    pub fn curiosity_target(&self) -> Vec3 {
        self.curiosity.map_or(Vec3::ZERO, |c| c.target)
    }

    pub fn max_vision_distance(world: &dyn WorldQuery, tuning: &PerceptionTuning) -> f32 {
        world.vision_distance().min(world.far_plane_distance() * tuning.far_plane_factor)
    }

    /// Drops the enemy and disarms the attack window. Returns true if an
    /// engagement was actually in progress.
    pub fn clear_enemy(&mut self) -> bool {
        let was_engaged = self.enemy.is_some() || self.attack_active_until.is_some();
        self.enemy = None;
        self.attack_active_until = None;
        was_engaged
    }

    pub fn disarm_attack(&mut self) {
        self.attack_active_until = None;
    }

    pub fn clear_curiosity(&mut self) {
        self.curiosity = None;
    }

    pub fn extend_attack(&mut self, until: TimeMs) {
        self.attack_active_until = Some(until);
    }

    fn mark_unseen(&mut self, now: TimeMs) {
        self.last_unseen = Some(now);
        self.reaction_deadline = None;
    }

    fn acquire(&mut self, target: &EntityView, now: TimeMs, tuning: &PerceptionTuning) {
        match self.enemy.as_mut() {
            Some(record) if record.handle == target.handle => {
                record.last_position = target.origin;
                record.last_seen = now;
            }
            Some(record) => {
                debug!("switching target {} -> {}", record.handle, target.handle);
                *record = EnemyRecord::new(target.handle, target.origin, now);
            }
            None => {
                self.enemy = Some(EnemyRecord::new(target.handle, target.origin, now));
                self.mark_unseen(now);
            }
        }
        self.attack_active_until = Some(now + tuning.attack_active_ms);
    }

    fn attack_window(&mut self, now: TimeMs) -> AttackCheck {
        match self.attack_active_until {
            Some(until) if now > until => {
                self.clear_enemy();
                AttackCheck::Lapsed
            }
            Some(_) => AttackCheck::Grace,
            None => AttackCheck::Idle,
        }
    }

    /// Attack-eligibility check, run once per tick.
    pub fn check_attack(&mut self, world: &dyn WorldQuery, me: &AgentIdentity, tuning: &PerceptionTuning) -> AttackCheck {
        let now = world.now();
        let max_distance = Self::max_vision_distance(world, tuning);
        let team_play = world.team_play();

        if let Some(current) = self.enemy.and_then(|e| world.entity(e.handle)) {
            if is_valid_enemy(&current, me, team_play)
                && world.can_see(me.handle, current.handle, tuning.detection_angle, max_distance)
            {
                self.acquire(&current, now, tuning);
                return AttackCheck::Engaged;
            }
        }

        if let Some(last) = self.last_full_scan {
            if now < last + tuning.scan_interval_ms {
                return self.attack_window(now);
            }
        }
        self.last_full_scan = Some(now);

        let mut candidates: SmallVec<[(f32, EntityView); 16]> = world
            .sentients()
            .into_iter()
            .filter_map(|handle| world.entity(handle))
            .filter(|view| is_valid_enemy(view, me, team_play))
            .map(|view| (view.origin.distance_squared(me.origin), view))
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let previous = self.enemy_handle();
        let mut best: Option<(f32, EntityView)> = None;
        for (d2, view) in candidates {
            if let Some((best_d2, _)) = best {
                if d2 > best_d2 {
                    break;
                }
                if Some(view.handle) != previous {
                    continue;
                }
            }
            if world.can_see(me.handle, view.handle, tuning.detection_angle, max_distance) {
                best = Some((d2, view));
            }
        }

        match best {
            Some((d2, target)) => {
                trace!("scan acquired {} at {:.0}u", target.handle, d2.sqrt());
                self.acquire(&target, now, tuning);
                AttackCheck::Engaged
            }
            None => self.attack_window(now),
        }
    }

    pub fn check_curious(&mut self, now: TimeMs) -> CuriosityCheck {
        if self.attack_active_until.is_some() {
            self.curiosity = None;
            return CuriosityCheck::Inactive;
        }
        match self.curiosity {
            None => CuriosityCheck::Inactive,
            Some(c) if now > c.until => {
                self.curiosity = None;
                CuriosityCheck::Expired
            }
            Some(c) if c.target.is_zero() => {
                self.curiosity = None;
                CuriosityCheck::Inactive
            }
            Some(_) => CuriosityCheck::Active,
        }
    }

    /// Start-of-tick bookkeeping for the attack state.
    pub fn begin_attack_tick(&mut self) {
        if let Some(record) = self.enemy.as_mut() {
            record.old_position = record.last_position;
        }
    }

    pub fn enemy_moved(&self) -> bool {
        self.enemy.map_or(false, |e| e.old_position != e.last_position)
    }

    /// Called while the enemy is out of sight; restarts the reaction gate
    /// once it has been unseen for long enough.
    pub fn note_unseen(&mut self, now: TimeMs, tuning: &PerceptionTuning) {
        if let Some(record) = self.enemy {
            if now > record.last_seen + tuning.unseen_delay_ms {
                self.mark_unseen(now);
            }
        }
    }

    /// Reaction-time gate. Returns true once the agent may fire at a
    /// (re)appeared enemy. The delay is rolled once per reappearance.
    pub fn check_reaction(
        &mut self,
        now: TimeMs,
        distance_squared: f32,
        skill: Skill,
        tuning: &PerceptionTuning,
        rng: &mut impl Rng,
    ) -> bool {
        let Some(unseen_at) = self.last_unseen else {
            return true;
        };
        let deadline = match self.reaction_deadline {
            Some(deadline) => deadline,
            None => {
                let roll = random(rng, skill.inverse() * tuning.reaction_variance_ms);
                let delay = reaction_delay_ms(tuning, skill, distance_squared, roll);
                let deadline = unseen_at + delay.max(0.0) as u64;
                self.reaction_deadline = Some(deadline);
                deadline
            }
        };
        if now < deadline {
            return false;
        }
        self.last_unseen = None;
        self.reaction_deadline = None;
        true
    }

    /// Refreshes the engagement after a firing decision.
    pub fn refresh_engagement(&mut self, now: TimeMs, enemy_origin: Vec3, tuning: &PerceptionTuning) {
        self.attack_active_until = Some(now + tuning.attack_active_ms);
        if let Some(record) = self.enemy.as_mut() {
            record.last_seen = now;
            record.last_position = enemy_origin;
        }
    }

    /// Resolves and caches the enemy's eye reference point.
    pub fn resolve_eye_tag(&mut self, world: &dyn WorldQuery) -> Option<TagId> {
        let record = self.enemy.as_mut()?;
        if record.eye_tag == EyeTagCache::Unresolved {
            record.eye_tag = match world.eye_tag(record.handle) {
                Some(tag) => EyeTagCache::Resolved(tag),
                None => EyeTagCache::Missing,
            };
        }
        match record.eye_tag {
            EyeTagCache::Resolved(tag) => Some(tag),
            _ => None,
        }
    }

    /// Applies a perceived sound/explosion/voice event.
    pub fn notice_event(
        &mut self,
        world: &dyn WorldQuery,
        me: &AgentIdentity,
        event: &NoticeEvent,
        tuning: &PerceptionTuning,
        rng: &mut impl Rng,
    ) -> NoticeOutcome {
        let now = world.now();

        if let Some(current) = self.curiosity {
            if me.origin.distance_squared(current.target) < me.origin.distance_squared(event.position) {
                return NoticeOutcome::Ignored;
            }
        }

        if event.radius_squared <= 0.0 {
            return NoticeOutcome::Ignored;
        }
        let range_factor = 1.0 - event.distance_squared / event.radius_squared;
        if range_factor <= 0.0 || range_factor < rng.gen::<f32>() {
            return NoticeOutcome::Ignored;
        }

        let owner = world
            .entity(event.originator)
            .and_then(|view| view.responsible_owner())
            .and_then(|handle| world.entity(handle));

        if let Some(owner) = owner.as_ref() {
            if owner.handle == me.handle || owner.no_target || !owner.solid {
                return NoticeOutcome::Ignored;
            }
            if let EntityKind::Player { team } = owner.kind {
                if world.team_play() && team == me.team {
                    return NoticeOutcome::Ignored;
                }
            }
        }

        let curious_for = if event.kind.is_minor() {
            tuning.curious_minor_event_ms
        } else if event.kind.is_combat() {
            if let Some(owner) = owner.filter(|o| is_valid_enemy(o, me, world.team_play())) {
                self.enemy = Some(EnemyRecord::new(owner.handle, owner.origin, now));
                self.attack_active_until = Some(now + tuning.attack_from_event_ms);
                debug!("engaging {} after {:?} event", owner.handle, event.kind);
                return NoticeOutcome::Engaged;
            }
            tuning.curious_event_ms
        } else {
            tuning.curious_event_ms
        };

        self.curiosity = Some(Curiosity { until: now + curious_for, target: event.position });
        NoticeOutcome::Curious
    }
}
