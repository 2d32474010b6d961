use std::fmt;
use std::str::FromStr;

use crate::dice::DiceRoller;

/// Dice expression `NdM+K`: `count` dice of `sides` faces plus a flat bonus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiceFormula {
    pub count: u32,
    pub sides: u32,
    pub bonus: i32,
}

impl DiceFormula {
    pub const fn new(count: u32, sides: u32, bonus: i32) -> Self {
        Self {
            count,
            sides,
            bonus,
        }
    }

    pub const fn flat(bonus: i32) -> Self {
        Self::new(0, 0, bonus)
    }

    /// Same dice with `bonus` added.
    pub const fn plus(self, bonus: i32) -> Self {
        Self::new(self.count, self.sides, self.bonus + bonus)
    }

    /// Adds `extra` dice of the same size.
    pub const fn with_extra_dice(self, extra: u32) -> Self {
        Self::new(self.count + extra, self.sides, self.bonus)
    }

    /// Rolls every die once and adds the bonus.
    pub fn roll(&self, dice: &mut dyn DiceRoller) -> i32 {
        let rolled: u32 = (0..self.count).map(|_| dice.roll_die(self.sides)).sum();
        rolled as i32 + self.bonus
    }

    /// Mean of the distribution.
    pub fn expected(&self) -> f32 {
        let per_die = if self.sides == 0 {
            0.0
        } else {
            (self.sides as f32 + 1.0) / 2.0
        };
        self.count as f32 * per_die + self.bonus as f32
    }

    pub fn max(&self) -> i32 {
        (self.count * self.sides) as i32 + self.bonus
    }

    pub fn min(&self) -> i32 {
        let per_die = u32::from(self.sides > 0);
        (self.count * per_die) as i32 + self.bonus
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 || self.sides == 0 {
            return write!(f, "{}", self.bonus);
        }
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.bonus {
            0 => Ok(()),
            b if b > 0 => write!(f, "+{b}"),
            b => write!(f, "{b}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid dice formula '{0}'")]
pub struct FormulaError(pub String);

impl FromStr for DiceFormula {
    type Err = FormulaError;

    /// Accepts `NdM`, `dM`, `NdM+K`, `NdM-K` and plain integers.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let err = || FormulaError(text.to_owned());
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let compact = compact.to_ascii_lowercase();

        let Some((count, rest)) = compact.split_once('d') else {
            return compact.parse::<i32>().map(Self::flat).map_err(|_| err());
        };

        let count = if count.is_empty() {
            1
        } else {
            count.parse::<u32>().map_err(|_| err())?
        };

        let split = rest.find(['+', '-']);
        let (sides, bonus) = match split {
            Some(i) => {
                let (sides, bonus) = rest.split_at(i);
                let bonus = bonus
                    .trim_start_matches('+')
                    .parse::<i32>()
                    .map_err(|_| err())?;
                (sides, bonus)
            }
            None => (rest, 0),
        };
        let sides = sides.parse::<u32>().map_err(|_| err())?;
        if sides == 0 {
            return Err(err());
        }
        Ok(Self::new(count, sides, bonus))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;

    #[test]
    fn parses_common_shapes() {
        assert_eq!("2d6+3".parse(), Ok(DiceFormula::new(2, 6, 3)));
        assert_eq!("1d8".parse(), Ok(DiceFormula::new(1, 8, 0)));
        assert_eq!("d20".parse(), Ok(DiceFormula::new(1, 20, 0)));
        assert_eq!("1d4 - 1".parse(), Ok(DiceFormula::new(1, 4, -1)));
        assert_eq!("5".parse(), Ok(DiceFormula::flat(5)));
        assert!("2d".parse::<DiceFormula>().is_err());
        assert!("xd6".parse::<DiceFormula>().is_err());
        assert!("1d0".parse::<DiceFormula>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for text in ["3d8+2", "1d10", "2d4-1", "7"] {
            let formula: DiceFormula = text.parse().unwrap();
            assert_eq!(formula.to_string(), text);
        }
    }

    #[test]
    fn roll_sums_each_die_once() {
        let mut dice = ScriptedDice::new([2, 5]);
        assert_eq!(DiceFormula::new(2, 6, 3).roll(&mut dice), 10);
        assert_eq!(dice.rolled(), 2);
    }

    #[test]
    fn statistics() {
        let formula = DiceFormula::new(2, 6, 1);
        assert_eq!(formula.expected(), 8.0);
        assert_eq!(formula.max(), 13);
        assert_eq!(formula.min(), 3);
    }
}
