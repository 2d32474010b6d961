//! Dice and ability services.
//!
//! All randomness in the combat core flows through a [`DiceRoller`] passed in
//! explicitly by the caller. Seeding a [`PcgDice`] with the same value replays
//! an encounter exactly; [`ScriptedDice`] returns predetermined faces and is
//! what tests use to pin down hit/miss and damage outcomes.

use std::collections::VecDeque;

/// Source of die rolls.
///
/// Implementations must return a value in `1..=sides` for every call. A
/// `sides` of zero or one always yields one.
pub trait DiceRoller {
    /// Rolls a single die with `sides` faces.
    fn roll_die(&mut self, sides: u32) -> u32;

    /// Rolls a d20.
    fn d20(&mut self) -> u32 {
        self.roll_die(20)
    }

    /// Rolls a d20 honoring advantage or disadvantage.
    fn roll_d20(&mut self, advantage: Advantage) -> D20Roll {
        let first = self.d20();
        match advantage {
            Advantage::Normal => D20Roll {
                natural: first,
                discarded: None,
                advantage,
            },
            Advantage::Advantage | Advantage::Disadvantage => {
                let second = self.d20();
                let (kept, dropped) = match advantage {
                    Advantage::Advantage => (first.max(second), first.min(second)),
                    _ => (first.min(second), first.max(second)),
                };
                D20Roll {
                    natural: kept,
                    discarded: Some(dropped),
                    advantage,
                }
            }
        }
    }
}

impl<T: DiceRoller + ?Sized> DiceRoller for &mut T {
    fn roll_die(&mut self, sides: u32) -> u32 {
        (**self).roll_die(sides)
    }
}

/// Converts an ability score into its modifier: `floor((score - 10) / 2)`.
#[inline]
pub const fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// Whether a d20 test is rolled straight, with advantage, or with disadvantage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Advantage {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl Advantage {
    /// Combines advantage and disadvantage sources; any of both cancels out.
    pub fn from_sources(advantage: bool, disadvantage: bool) -> Self {
        match (advantage, disadvantage) {
            (true, false) => Self::Advantage,
            (false, true) => Self::Disadvantage,
            _ => Self::Normal,
        }
    }
}

/// Result of a single d20 test before modifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct D20Roll {
    /// The face that counts.
    pub natural: u32,
    /// The face thrown away under advantage or disadvantage.
    pub discarded: Option<u32>,
    pub advantage: Advantage,
}

/// PCG-XSH-RR dice stream.
///
/// Same seed, same sequence of faces. The state advances once per die.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcgDice {
    state: u64,
}

impl PcgDice {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    pub fn new(seed: u64) -> Self {
        // Warm up once so that small seeds do not produce correlated first rolls.
        let mut dice = Self {
            state: seed.wrapping_add(Self::INCREMENT),
        };
        dice.next_u32();
        dice
    }

    fn next_u32(&mut self) -> u32 {
        let old = self.state;
        self.state = old
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);

        let xorshifted = (((old >> 18) ^ old) >> 27) as u32;
        let rot = (old >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl DiceRoller for PcgDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides <= 1 {
            return 1;
        }
        (self.next_u32() % sides) + 1
    }
}

/// Dice that return a fixed script of faces, for tests and replays.
///
/// Each face is clamped into `1..=sides` of the die being rolled. When the
/// script runs dry the fallback face is used.
#[derive(Clone, Debug, Default)]
pub struct ScriptedDice {
    faces: VecDeque<u32>,
    fallback: u32,
    rolled: usize,
}

impl ScriptedDice {
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
            fallback: 1,
            rolled: 0,
        }
    }

    /// Face returned once the script is exhausted.
    pub fn with_fallback(mut self, face: u32) -> Self {
        self.fallback = face;
        self
    }

    pub fn push(&mut self, face: u32) {
        self.faces.push_back(face);
    }

    /// Number of dice rolled so far.
    pub fn rolled(&self) -> usize {
        self.rolled
    }

    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl DiceRoller for ScriptedDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.rolled += 1;
        let face = self.faces.pop_front().unwrap_or(self.fallback);
        face.clamp(1, sides.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_floors_toward_negative_infinity() {
        assert_eq!(ability_modifier(10), 0);
        assert_eq!(ability_modifier(11), 0);
        assert_eq!(ability_modifier(9), -1);
        assert_eq!(ability_modifier(8), -1);
        assert_eq!(ability_modifier(1), -5);
        assert_eq!(ability_modifier(20), 5);
    }

    #[test]
    fn pcg_dice_are_replayable_and_in_range() {
        let mut a = PcgDice::new(42);
        let mut b = PcgDice::new(42);
        for _ in 0..500 {
            let face = a.roll_die(6);
            assert_eq!(face, b.roll_die(6));
            assert!((1..=6).contains(&face));
        }
    }

    #[test]
    fn advantage_keeps_the_higher_face() {
        let mut dice = ScriptedDice::new([4, 17]);
        let roll = dice.roll_d20(Advantage::Advantage);
        assert_eq!(roll.natural, 17);
        assert_eq!(roll.discarded, Some(4));

        let mut dice = ScriptedDice::new([4, 17]);
        let roll = dice.roll_d20(Advantage::Disadvantage);
        assert_eq!(roll.natural, 4);
    }

    #[test]
    fn scripted_faces_clamp_to_the_die() {
        let mut dice = ScriptedDice::new([9]).with_fallback(3);
        assert_eq!(dice.roll_die(4), 4);
        assert_eq!(dice.roll_die(8), 3);
        assert_eq!(dice.rolled(), 2);
    }

    #[test]
    fn both_sources_cancel() {
        assert_eq!(Advantage::from_sources(true, true), Advantage::Normal);
        assert_eq!(Advantage::from_sources(true, false), Advantage::Advantage);
    }
}
