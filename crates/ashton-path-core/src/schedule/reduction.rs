//! Per-step reduction amounts for each taper pace.
//!
//! Amounts are in diazepam milligrams and computed from the dose remaining
//! before the cut.

use crate::models::TaperPace;

/// Ashton Manual drops: (dose threshold, cut), highest threshold first.
const ASHTON_TABLE: [(f64, f64); 4] = [(50.0, 5.0), (20.0, 2.0), (10.0, 1.0), (5.0, 0.5)];

/// Cut applied below the lowest Ashton threshold.
const ASHTON_FINAL_CUT: f64 = 0.5;

const MODERATE_FRACTION: f64 = 0.10;
const MODERATE_FLOOR: f64 = 0.25;

/// At or below this dose the moderate pace switches to micro cuts.
const MICRO_TAPER_THRESHOLD: f64 = 1.0;
const MICRO_TAPER_FLOOR: f64 = 0.125;

const SLOW_FRACTION: f64 = 0.05;
const SLOW_FLOOR: f64 = 0.125;

/// How much to cut at each reduction step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReductionPolicy {
    /// 5% of the remaining dose
    Slow,
    /// 10% of the remaining dose, micro cuts near the end
    Moderate,
    /// Fixed drops from the Ashton table
    AshtonStandard,
    /// The same cut every step, sized to reach zero by a target date
    Custom { per_step: f64, floor: f64 },
}

impl ReductionPolicy {
    /// Policy for a pace. `custom_per_step` is only evaluated for the custom pace.
    pub fn for_pace(pace: TaperPace, custom_per_step: impl FnOnce() -> (f64, f64)) -> Self {
        match pace {
            TaperPace::Slow => ReductionPolicy::Slow,
            TaperPace::Moderate => ReductionPolicy::Moderate,
            TaperPace::AshtonStandard => ReductionPolicy::AshtonStandard,
            TaperPace::Custom => {
                let (per_step, floor) = custom_per_step();
                ReductionPolicy::Custom { per_step, floor }
            }
        }
    }

    /// Milligrams to cut from `remaining`.
    pub fn amount(&self, remaining: f64) -> f64 {
        match *self {
            ReductionPolicy::AshtonStandard => ASHTON_TABLE
                .iter()
                .find(|(threshold, _)| remaining >= *threshold)
                .map(|(_, cut)| *cut)
                .unwrap_or(ASHTON_FINAL_CUT),
            ReductionPolicy::Moderate => {
                let floor = if remaining <= MICRO_TAPER_THRESHOLD {
                    MICRO_TAPER_FLOOR
                } else {
                    MODERATE_FLOOR
                };
                (remaining * MODERATE_FRACTION).max(floor)
            }
            ReductionPolicy::Slow => (remaining * SLOW_FRACTION).max(SLOW_FLOOR),
            ReductionPolicy::Custom { per_step, floor } => per_step.max(floor),
        }
    }
}

/// Round a dose to 2 decimal places for display and storage.
pub fn round_dose(mg: f64) -> f64 {
    (mg * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ashton_table() {
        let policy = ReductionPolicy::AshtonStandard;
        assert_eq!(policy.amount(60.0), 5.0);
        assert_eq!(policy.amount(50.0), 5.0);
        assert_eq!(policy.amount(49.0), 2.0);
        assert_eq!(policy.amount(20.0), 2.0);
        assert_eq!(policy.amount(19.5), 1.0);
        assert_eq!(policy.amount(10.0), 1.0);
        assert_eq!(policy.amount(9.0), 0.5);
        assert_eq!(policy.amount(5.0), 0.5);
        assert_eq!(policy.amount(2.0), 0.5);
    }

    #[test]
    fn test_moderate_floors() {
        let policy = ReductionPolicy::Moderate;
        assert!((policy.amount(10.0) - 1.0).abs() < 1e-12);
        assert_eq!(policy.amount(2.0), 0.25);
        assert_eq!(policy.amount(1.0), 0.125);
        assert_eq!(policy.amount(0.5), 0.125);
    }

    #[test]
    fn test_slow_floor() {
        let policy = ReductionPolicy::Slow;
        assert!((policy.amount(20.0) - 1.0).abs() < 1e-12);
        assert_eq!(policy.amount(2.0), 0.125);
    }

    #[test]
    fn test_custom_floor() {
        let policy = ReductionPolicy::for_pace(TaperPace::Custom, || (0.05, 0.1));
        assert_eq!(policy.amount(10.0), 0.1);

        let policy = ReductionPolicy::for_pace(TaperPace::Custom, || (0.8, 0.1));
        assert_eq!(policy.amount(10.0), 0.8);
    }

    #[test]
    fn test_round_dose() {
        assert_eq!(round_dose(19.166666), 19.17);
        assert_eq!(round_dose(7.29), 7.29);
        assert_eq!(round_dose(0.0), 0.0);
    }
}
