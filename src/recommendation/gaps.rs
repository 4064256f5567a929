//! Sign-pattern classification of the gap between daily targets and intake.
//!
//! A macro is in deficit when its gap is strictly positive. Each of the nine patterns
//! carries its own rule for turning gaps into the proportion vector the catalog search
//! aims at.

use serde::Serialize;

use crate::calculator::targets::DailyNutrients;
use crate::catalog::repo_types::{Macro, MacroProportions};

/// `target - actual` per macro, in grams.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct MacroGaps {
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
}

impl MacroGaps {
    pub fn between(targets: &DailyNutrients, actual: &DailyNutrients) -> Self {
        Self {
            proteins: (targets.proteins - actual.proteins) as f64,
            fats: (targets.fats - actual.fats) as f64,
            carbohydrates: (targets.carbohydrates - actual.carbohydrates) as f64,
        }
    }

    pub fn get(&self, nutrient: Macro) -> f64 {
        match nutrient {
            Macro::Proteins => self.proteins,
            Macro::Fats => self.fats,
            Macro::Carbohydrates => self.carbohydrates,
        }
    }

    /// Macro with the largest gap; on equal gaps the later macro wins.
    pub fn largest(&self) -> Macro {
        let mut best = Macro::Proteins;
        for nutrient in Macro::ALL {
            if self.get(nutrient) >= self.get(best) {
                best = nutrient;
            }
        }
        best
    }

    fn min(&self) -> f64 {
        self.proteins.min(self.fats).min(self.carbohydrates)
    }

    fn max(&self) -> f64 {
        self.proteins.max(self.fats).max(self.carbohydrates)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GapPattern {
    /// Every macro below target.
    AllDeficit,
    /// Every macro strictly above target.
    AllSurplus,
    ProteinOnly,
    FatOnly,
    CarbohydrateOnly,
    ProteinFat,
    FatCarbohydrate,
    ProteinCarbohydrate,
    /// Nothing in deficit, but some macro exactly on target.
    NoDeficit,
}

impl GapPattern {
    pub fn classify(gaps: &MacroGaps) -> Self {
        let deficit = (gaps.proteins > 0.0, gaps.fats > 0.0, gaps.carbohydrates > 0.0);
        match deficit {
            (true, true, true) => Self::AllDeficit,
            (true, false, false) => Self::ProteinOnly,
            (false, true, false) => Self::FatOnly,
            (false, false, true) => Self::CarbohydrateOnly,
            (true, true, false) => Self::ProteinFat,
            (false, true, true) => Self::FatCarbohydrate,
            (true, false, true) => Self::ProteinCarbohydrate,
            (false, false, false) if gaps.max() < 0.0 => Self::AllSurplus,
            (false, false, false) => Self::NoDeficit,
        }
    }

    /// Proportion vector for this pattern; `None` when there is nothing to seek.
    pub fn proportions(self, gaps: &MacroGaps) -> Option<MacroProportions> {
        let mixed = |p: bool, f: bool, c: bool| {
            let pick = |in_deficit: bool, gap: f64| if in_deficit { gap.abs() } else { 1.0 };
            MacroProportions::new(
                pick(p, gaps.proteins),
                pick(f, gaps.fats),
                pick(c, gaps.carbohydrates),
            )
        };
        let proportions = match self {
            Self::AllDeficit => {
                let min = gaps.min();
                MacroProportions::new(
                    round2(gaps.proteins / min),
                    round2(gaps.fats / min),
                    round2(gaps.carbohydrates / min),
                )
            }
            Self::AllSurplus => {
                let max = gaps.max();
                MacroProportions::new(
                    round2(max / gaps.proteins),
                    round2(max / gaps.fats),
                    round2(max / gaps.carbohydrates),
                )
            }
            Self::ProteinOnly => mixed(true, false, false),
            Self::FatOnly => mixed(false, true, false),
            Self::CarbohydrateOnly => mixed(false, false, true),
            Self::ProteinFat => mixed(true, true, false),
            Self::FatCarbohydrate => mixed(false, true, true),
            Self::ProteinCarbohydrate => mixed(true, false, true),
            Self::NoDeficit => return None,
        };
        Some(proportions)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaps(proteins: f64, fats: f64, carbohydrates: f64) -> MacroGaps {
        MacroGaps {
            proteins,
            fats,
            carbohydrates,
        }
    }

    #[test]
    fn every_nonzero_sign_pattern_has_its_own_case() {
        let signs = [-3.0, 4.0];
        let mut seen = Vec::new();
        for p in signs {
            for f in signs {
                for c in signs {
                    let pattern = GapPattern::classify(&gaps(p, f, c));
                    assert_ne!(pattern, GapPattern::NoDeficit);
                    assert!(!seen.contains(&pattern), "{pattern:?} fired twice");
                    seen.push(pattern);
                }
            }
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn zero_gaps_count_as_met() {
        assert_eq!(GapPattern::classify(&gaps(0.0, 0.0, 0.0)), GapPattern::NoDeficit);
        assert_eq!(GapPattern::classify(&gaps(-2.0, 0.0, -1.0)), GapPattern::NoDeficit);
        assert_eq!(GapPattern::classify(&gaps(5.0, 0.0, -1.0)), GapPattern::ProteinOnly);
        assert_eq!(GapPattern::classify(&gaps(0.0, 2.0, 3.0)), GapPattern::FatCarbohydrate);
    }

    #[test]
    fn all_deficit_divides_by_smallest_gap() {
        let g = gaps(30.0, 10.0, 45.0);
        let p = GapPattern::AllDeficit.proportions(&g).unwrap();
        assert_eq!(p, MacroProportions::new(3.0, 1.0, 4.5));
    }

    #[test]
    fn all_deficit_rounds_to_two_decimals() {
        let g = gaps(10.0, 3.0, 7.0);
        let p = GapPattern::AllDeficit.proportions(&g).unwrap();
        assert_eq!(p, MacroProportions::new(3.33, 1.0, 2.33));
    }

    #[test]
    fn all_surplus_divides_largest_gap_by_each() {
        let g = gaps(-10.0, -20.0, -40.0);
        let p = GapPattern::classify(&g).proportions(&g).unwrap();
        assert_eq!(p, MacroProportions::new(1.0, 0.5, 0.25));
    }

    #[test]
    fn mixed_cases_weight_deficits_by_magnitude() {
        let g = gaps(25.0, -5.0, 0.0);
        let p = GapPattern::classify(&g).proportions(&g).unwrap();
        assert_eq!(p, MacroProportions::new(25.0, 1.0, 1.0));

        let g = gaps(-8.0, 12.0, 40.0);
        let p = GapPattern::classify(&g).proportions(&g).unwrap();
        assert_eq!(p, MacroProportions::new(1.0, 12.0, 40.0));
    }

    #[test]
    fn no_deficit_seeks_nothing() {
        let g = gaps(0.0, -3.0, 0.0);
        assert_eq!(GapPattern::classify(&g).proportions(&g), None);
    }

    #[test]
    fn largest_gap_prefers_later_macro_on_ties() {
        assert_eq!(gaps(10.0, 10.0, 3.0).largest(), Macro::Fats);
        assert_eq!(gaps(5.0, 5.0, 5.0).largest(), Macro::Carbohydrates);
        assert_eq!(gaps(12.0, -1.0, 3.0).largest(), Macro::Proteins);
    }

    #[test]
    fn gaps_subtract_intake_from_targets() {
        let targets = DailyNutrients {
            calories: 2296,
            proteins: 64,
            fats: 56,
            carbohydrates: 238,
            water: 2250,
        };
        let actual = DailyNutrients {
            proteins: 70,
            fats: 20,
            carbohydrates: 238,
            ..Default::default()
        };
        assert_eq!(MacroGaps::between(&targets, &actual), gaps(-6.0, 36.0, 0.0));
    }
}
