// fps_bot_core/server/src/core/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Absolute simulation time in milliseconds (the host's level time).
pub type TimeMs = u64;

// --- Entity handles ---

/// Generation-checked reference into the host entity table. Never owns the
/// entity; every lookup through `WorldQuery::entity` re-validates it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle {
    pub index: u32,
    pub generation: u32,
}

impl EntityHandle {
    pub const fn new(index: u32, generation: u32) -> Self {
        EntityHandle { index, generation }
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.index, self.generation)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WeaponId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TagId(pub u32);

// --- Basic Geometric Types ---
#[derive(Clone, Debug, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self { Vec3 { x, y, z } }
    pub const fn zero() -> Self { Vec3::ZERO }

    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance_squared(&self, other: Vec3) -> f32 {
        (*self - other).length_squared()
    }

    pub fn dot(&self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn normalized(&self) -> Vec3 {
        let len = self.length();
        if len < f32::EPSILON {
            Vec3::ZERO
        } else {
            *self * (1.0 / len)
        }
    }

    /// Converts a direction into view angles in degrees: (pitch, yaw, roll).
    /// Pitch is positive when looking down, matching the client input convention.
    pub fn to_angles(&self) -> Vec3 {
        if self.x == 0.0 && self.y == 0.0 {
            let pitch = if self.z > 0.0 { -90.0 } else if self.z < 0.0 { 90.0 } else { 0.0 };
            return Vec3::new(pitch, 0.0, 0.0);
        }
        let mut yaw = self.y.atan2(self.x).to_degrees();
        if yaw < 0.0 {
            yaw += 360.0;
        }
        let forward = (self.x * self.x + self.y * self.y).sqrt();
        let pitch = -self.z.atan2(forward).to_degrees();
        Vec3::new(pitch, yaw, 0.0)
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 { Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z) }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 { Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z) }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Vec3 { Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs) }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 { Vec3::new(-self.x, -self.y, -self.z) }
}

// --- Skill ---

/// Immutable per-agent skill scalar in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Skill(f32);

impl Skill {
    pub fn new(value: f32) -> Self {
        if value.is_finite() {
            Skill(value.clamp(0.0, 1.0))
        } else {
            Skill(0.0)
        }
    }

    #[inline]
    pub fn value(self) -> f32 {
        self.0
    }

    /// `1 - skill`, used by every "worse at low skill" curve.
    #[inline]
    pub fn inverse(self) -> f32 {
        1.0 - self.0
    }
}

// --- Intent command button bits ---
pub const BUTTON_RUN: u32              = 1 << 0;
pub const BUTTON_ATTACK_PRIMARY: u32   = 1 << 1;
pub const BUTTON_ATTACK_SECONDARY: u32 = 1 << 2;
pub const BUTTON_USE: u32              = 1 << 3;

/// Bits that only the Attack state may leave set at tick end.
pub const COMBAT_BUTTONS: u32 = BUTTON_ATTACK_PRIMARY | BUTTON_ATTACK_SECONDARY;

/// Movement axis extreme accepted by the client input pipeline.
pub const MOVE_AXIS_MAX: i32 = 127;

/// Per-tick output consumed by the host's client-simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntentCommand {
    pub server_time: TimeMs,
    pub forward_move: i32,
    pub right_move: i32,
    pub up_move: i32,
    pub buttons: u32,
    pub angles: Vec3,
}

impl IntentCommand {
    #[inline]
    pub fn has(&self, bits: u32) -> bool {
        self.buttons & bits != 0
    }

    #[inline]
    pub fn press(&mut self, bits: u32) {
        self.buttons |= bits;
    }

    #[inline]
    pub fn release(&mut self, bits: u32) {
        self.buttons &= !bits;
    }

    #[inline]
    pub fn toggle(&mut self, bits: u32) {
        self.buttons ^= bits;
    }

    pub fn set_right_move(&mut self, value: i32) {
        self.right_move = value.clamp(-MOVE_AXIS_MAX, MOVE_AXIS_MAX);
    }

    pub fn set_forward_move(&mut self, value: i32) {
        self.forward_move = value.clamp(-MOVE_AXIS_MAX, MOVE_AXIS_MAX);
    }

    /// Standing, running, not attacking.
    pub fn reset_to_baseline(&mut self) {
        self.up_move = 0;
        self.press(BUTTON_RUN);
        self.release(COMBAT_BUTTONS);
    }
}

/// Eye offset and angle adjustments handed over together with the intent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EyeInfo {
    pub offset: Vec3,
    pub angles: [f32; 2],
}

// --- Teams and entity views ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Team {
    #[default]
    None,
    Spectator,
    FreeForAll,
    Allies,
    Axis,
}

impl Team {
    pub fn is_playing(self) -> bool {
        !matches!(self, Team::None | Team::Spectator)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityKind {
    Player { team: Team },
    Npc { faction: u8 },
    Projectile { owner: Option<EntityHandle> },
    Item { owner: Option<EntityHandle> },
    Turret { owner: Option<EntityHandle> },
    Other,
}

/// Read-only snapshot of a world entity, valid for the current frame only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityView {
    pub handle: EntityHandle,
    pub kind: EntityKind,
    pub origin: Vec3,
    pub velocity: Vec3,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub view_height: f32,
    pub hidden: bool,
    pub no_target: bool,
    pub dead: bool,
    pub solid: bool,
}

impl EntityView {
    pub fn is_sentient(&self) -> bool {
        matches!(self.kind, EntityKind::Player { .. } | EntityKind::Npc { .. })
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, EntityKind::Player { .. })
    }

    /// The sentient responsible for this entity: itself for sentients,
    /// the recorded owner for projectiles, items and turrets.
    pub fn responsible_owner(&self) -> Option<EntityHandle> {
        match self.kind {
            EntityKind::Player { .. } | EntityKind::Npc { .. } => Some(self.handle),
            EntityKind::Projectile { owner } | EntityKind::Item { owner } | EntityKind::Turret { owner } => owner,
            EntityKind::Other => None,
        }
    }
}

/// Client-side state of the controlled player.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClientView {
    pub name_index: u32,
    pub team: Team,
    pub faction: u8,
    pub dead: bool,
    pub spectator: bool,
    pub has_primary_choice: bool,
    pub origin: Vec3,
    pub velocity: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub view_height: f32,
    pub ammo: i32,
    pub clip_ammo: i32,
    pub view_model_idle: bool,
    pub zoomed: bool,
    pub on_ladder: bool,
    pub weapon_switch_pending: bool,
}

impl ClientView {
    pub fn out_of_ammo(&self) -> bool {
        self.ammo <= 0 && self.clip_ammo <= 0
    }
}

/// Weapon statistics of the active main-hand weapon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    pub id: WeaponId,
    pub fire_delay_secs: f32,
    pub primary_range: f32,
    pub secondary_range: f32,
    pub spread: f32,
    pub semi_auto: bool,
    pub secondary_melee: bool,
    pub has_zoom: bool,
    pub max_fire_movement: f32,
    pub max_fire_movement_mult: f32,
    pub has_ammo_in_clip: bool,
    pub has_primary_ammo: bool,
    pub needs_reload: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InventoryWeapon {
    pub id: WeaponId,
    pub rank: i32,
    pub throwable: bool,
    pub inventory_item: bool,
    pub has_primary_ammo: bool,
    pub secondary_melee: bool,
}

/// What the "use" trace in front of the agent hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UseTarget {
    #[default]
    Nothing,
    OpenDoor,
    ClosedDoor,
    Ladder,
    Other,
}

// --- Perception events ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Misc,
    MiscLoud,
    WeaponFire,
    WeaponImpact,
    Explosion,
    Voice,
    UrgentVoice,
    Footstep,
    Grenade,
}

impl EventKind {
    /// Minor ambient noise: only ever raises short-lived curiosity.
    pub fn is_minor(self) -> bool {
        matches!(self, EventKind::Misc | EventKind::MiscLoud)
    }

    /// Events that reveal a shooter and may start an engagement.
    pub fn is_combat(self) -> bool {
        matches!(self, EventKind::WeaponFire | EventKind::WeaponImpact | EventKind::Explosion)
    }
}

/// A perceived sound/explosion/voice as seen by one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoticeEvent {
    pub position: Vec3,
    pub kind: EventKind,
    pub originator: EntityHandle,
    pub distance_squared: f32,
    pub radius_squared: f32,
}
