//! Action ids and state flags reported by the engine
//!
//! An action is a `u32`: the low 9 bits are the id and group, the high bits
//! are `ActionFlags` describing how the action behaves.

use bitflags::bitflags;

bitflags! {
    /// Behaviour bits carried in every action id
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ActionFlags: u32 {
        const STATIONARY = 1 << 9;
        const MOVING = 1 << 10;
        const AIR = 1 << 11;
        const INTANGIBLE = 1 << 12;
        const SWIMMING = 1 << 13;
        const METAL_WATER = 1 << 14;
        const SHORT_HITBOX = 1 << 15;
        const RIDING_SHELL = 1 << 16;
        const INVULNERABLE = 1 << 17;
        const BUTT_OR_STOMACH_SLIDE = 1 << 18;
        const DIVING = 1 << 19;
        const ON_POLE = 1 << 20;
        const HANGING = 1 << 21;
        const IDLE = 1 << 22;
        const ATTACKING = 1 << 23;
        const ALLOW_VERTICAL_WIND_ACTION = 1 << 24;
        const CONTROL_JUMP_HEIGHT = 1 << 25;
        const ALLOW_FIRST_PERSON = 1 << 26;
        const PAUSE_EXIT = 1 << 27;
        const SWIMMING_OR_FLYING = 1 << 28;
        const WATER_OR_TEXT = 1 << 29;
        const THROWING = 1 << 31;
    }
}

bitflags! {
    /// Character state flags (caps, attack states)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MarioFlags: u32 {
        const NORMAL_CAP = 0x0000_0001;
        const VANISH_CAP = 0x0000_0002;
        const METAL_CAP = 0x0000_0004;
        const WING_CAP = 0x0000_0008;
        const CAP_ON_HEAD = 0x0000_0010;
        const CAP_IN_HAND = 0x0000_0020;
        const METAL_SHOCK = 0x0000_0040;
        const TELEPORTING = 0x0000_0080;
        const ACTION_SOUND_PLAYED = 0x0001_0000;
        const MARIO_SOUND_PLAYED = 0x0002_0000;
        const PUNCHING = 0x0010_0000;
        const KICKING = 0x0020_0000;
        const TRIPPING = 0x0040_0000;
    }
}

impl MarioFlags {
    pub const SPECIAL_CAPS: Self = Self::VANISH_CAP.union(Self::METAL_CAP).union(Self::WING_CAP);

    /// A power-up cap is currently active
    pub fn has_cap_active(&self) -> bool {
        self.intersects(Self::SPECIAL_CAPS)
    }

    /// The character is in the middle of a punch, kick or trip
    pub fn is_attacking(&self) -> bool {
        self.intersects(Self::PUNCHING | Self::KICKING | Self::TRIPPING)
    }
}

/// Health of an unhurt character, eight wedges
pub const FULL_HEALTH: i16 = 0x0880;
/// One health wedge
pub const HEALTH_WEDGE: i16 = 0x0100;
/// Health at or below which the character counts as dead
pub const DEAD_HEALTH: i16 = 0x0100;

pub fn is_dead_health(health: i16) -> bool {
    health <= DEAD_HEALTH
}

pub const ACT_ID_MASK: u32 = 0x0000_01FF;
pub const ACT_GROUP_MASK: u32 = 0x0000_01C0;
pub const ACT_GROUP_CUTSCENE: u32 = 4 << 6;

const STATIONARY: u32 = ActionFlags::STATIONARY.bits();
const MOVING: u32 = ActionFlags::MOVING.bits();
const CONTROL_JUMP_HEIGHT: u32 = ActionFlags::CONTROL_JUMP_HEIGHT.bits();
const AIR: u32 = ActionFlags::AIR.bits();
const INTANGIBLE: u32 = ActionFlags::INTANGIBLE.bits();
const IDLE_FLAG: u32 = ActionFlags::IDLE.bits();
const ATTACKING: u32 = ActionFlags::ATTACKING.bits();
const DIVING: u32 = ActionFlags::DIVING.bits();
const FIRST_PERSON: u32 = ActionFlags::ALLOW_FIRST_PERSON.bits();
const PAUSE_EXIT: u32 = ActionFlags::PAUSE_EXIT.bits();
const SWIMMING_OR_FLYING: u32 = ActionFlags::SWIMMING_OR_FLYING.bits();
const VERTICAL_WIND: u32 = ActionFlags::ALLOW_VERTICAL_WIND_ACTION.bits();
const INVULNERABLE: u32 = ActionFlags::INVULNERABLE.bits();

pub const ACT_UNINITIALIZED: u32 = 0;
pub const ACT_IDLE: u32 = 0x001 | STATIONARY | IDLE_FLAG | FIRST_PERSON | PAUSE_EXIT;
pub const ACT_WALKING: u32 = 0x040 | MOVING | FIRST_PERSON;
pub const ACT_JUMP: u32 = 0x080 | AIR | VERTICAL_WIND | CONTROL_JUMP_HEIGHT;
pub const ACT_FREEFALL: u32 = 0x08C | AIR | VERTICAL_WIND;
pub const ACT_FLYING: u32 = 0x099 | AIR | DIVING | ATTACKING | SWIMMING_OR_FLYING;
pub const ACT_TWIRLING: u32 = 0x0A4 | AIR | ATTACKING | SWIMMING_OR_FLYING;
pub const ACT_STAR_DANCE_EXIT: u32 = 0x102 | STATIONARY | INTANGIBLE;
pub const ACT_STAR_DANCE_WATER: u32 = 0x103 | STATIONARY | INTANGIBLE;
pub const ACT_FALL_AFTER_STAR_GRAB: u32 = 0x104 | AIR | INTANGIBLE;
pub const ACT_STAR_DANCE_NO_EXIT: u32 = 0x107 | STATIONARY | INTANGIBLE;
pub const ACT_WAITING_FOR_DIALOG: u32 = 0x10A | STATIONARY | INTANGIBLE;
pub const ACT_STANDING_DEATH: u32 = 0x111 | STATIONARY | INTANGIBLE | INVULNERABLE;

/// Flag bits of an action id
pub fn action_flags(action: u32) -> ActionFlags {
    ActionFlags::from_bits_truncate(action)
}

/// Part of the star-collection sequence
pub fn is_star_dance(action: u32) -> bool {
    matches!(
        action,
        ACT_FALL_AFTER_STAR_GRAB | ACT_STAR_DANCE_EXIT | ACT_STAR_DANCE_NO_EXIT | ACT_STAR_DANCE_WATER
    )
}

/// Engine-side cutscene action that should block host input
pub fn is_cutscene(action: u32) -> bool {
    action & ACT_GROUP_MASK == ACT_GROUP_CUTSCENE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_values_match_engine() {
        assert_eq!(ACT_IDLE, 0x0C40_0201);
        assert_eq!(ACT_FREEFALL, 0x0100_088C);
        assert_eq!(ACT_WAITING_FOR_DIALOG, 0x0000_130A);
        assert_eq!(ACT_WALKING, 0x0400_0440);
        assert_eq!(ACT_JUMP, 0x0300_0880);
    }

    #[test]
    fn test_action_flags() {
        let flags = action_flags(ACT_FLYING);
        assert!(flags.contains(ActionFlags::AIR | ActionFlags::DIVING));
        assert!(!flags.contains(ActionFlags::STATIONARY));
    }

    #[test]
    fn test_cutscene_group() {
        assert!(is_cutscene(ACT_WAITING_FOR_DIALOG));
        assert!(is_cutscene(ACT_STAR_DANCE_EXIT));
        assert!(!is_cutscene(ACT_IDLE));
        assert!(!is_cutscene(ACT_TWIRLING));
    }

    #[test]
    fn test_cap_flags() {
        assert!(!MarioFlags::NORMAL_CAP.has_cap_active());
        assert!((MarioFlags::WING_CAP | MarioFlags::CAP_ON_HEAD).has_cap_active());
        assert!(MarioFlags::KICKING.is_attacking());
        assert!(!(MarioFlags::WING_CAP | MarioFlags::CAP_ON_HEAD).is_attacking());
    }

    #[test]
    fn test_dead_health_threshold() {
        assert!(is_dead_health(DEAD_HEALTH));
        assert!(is_dead_health(0x00ff));
        assert!(!is_dead_health(DEAD_HEALTH + 1));
        assert!(!is_dead_health(FULL_HEALTH));
        assert_eq!(FULL_HEALTH, 8 * HEALTH_WEDGE + 0x80);
    }
}
