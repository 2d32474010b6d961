/// Combat rule constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatConfig {
    /// AC bonus granted by half cover.
    pub half_cover_bonus: i32,
    /// AC bonus granted by three-quarters cover.
    pub three_quarters_cover_bonus: i32,
    /// Damage dealt by a hit whose roll totals less than one.
    pub minimum_hit_damage: u32,
}

impl CombatConfig {
    // ===== compile-time constants =====
    /// Spell levels tracked in a slot pool: 0 (cantrip) through 9.
    pub const SPELL_LEVELS: usize = 10;
    pub const MAX_SPELL_LEVEL: u8 = 9;
    /// Feet per grid square.
    pub const CELL_FEET: u32 = 5;
    /// Reach of an ordinary melee attack, in squares.
    pub const MELEE_REACH: u32 = 1;
    /// Reach of a weapon with the reach property, in squares.
    pub const EXTENDED_REACH: u32 = 2;
    pub const MAX_GRID_SIDE: u32 = 256;
    /// Character levels at which cantrips gain an extra damage die.
    pub const CANTRIP_TIERS: [u32; 3] = [5, 11, 17];

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_GRID_WIDTH: u32 = 12;
    pub const DEFAULT_GRID_HEIGHT: u32 = 8;
    pub const DEFAULT_HALF_COVER_BONUS: i32 = 2;
    pub const DEFAULT_THREE_QUARTERS_COVER_BONUS: i32 = 5;
    pub const DEFAULT_MINIMUM_HIT_DAMAGE: u32 = 1;
    pub const CONCENTRATION_MIN_DC: i32 = 10;

    pub const fn new() -> Self {
        Self {
            half_cover_bonus: Self::DEFAULT_HALF_COVER_BONUS,
            three_quarters_cover_bonus: Self::DEFAULT_THREE_QUARTERS_COVER_BONUS,
            minimum_hit_damage: Self::DEFAULT_MINIMUM_HIT_DAMAGE,
        }
    }

    /// Converts a distance in feet to whole squares, rounding down.
    pub const fn feet_to_squares(feet: u32) -> u32 {
        feet / Self::CELL_FEET
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self::new()
    }
}
