//! Taper schedule generation.
//!
//! Pipeline: Validation → Unit conversion → Crossover / Stabilization → Reduction loop
//!
//! All arithmetic runs on the diazepam-equivalent dose. Generation is pure:
//! the same request always yields the same plan.

mod reduction;
mod timeline;

pub use reduction::*;
pub use timeline::*;

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::TaperConfig;
use crate::models::{BenzoType, BiologicalFactors, TaperPace, TaperPhase, TaperPlan, TaperStep};

/// Schedule generation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("Invalid dose: {0} (must be a positive number of mg)")]
    InvalidDose(f64),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Custom pace requires a target end date")]
    MissingTargetDate,

    #[error("Target end date {target} must be after start date {start}")]
    TargetDateNotAfterStart { start: NaiveDate, target: NaiveDate },

    #[error("Target end date {target} leaves {weeks} weekly cuts, more than the {max_steps} allowed")]
    TargetDateTooFar { target: NaiveDate, weeks: u32, max_steps: u32 },

    #[error("Schedule did not reach zero after {iterations} steps ({remaining_dose}mg remaining)")]
    DidNotConverge { iterations: u32, remaining_dose: f64 },
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Inputs for one schedule generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRequest {
    /// Starting medication
    pub medication: BenzoType,
    /// Current daily dose of `medication`, in mg
    pub current_dose: f64,
    /// Requested pace
    pub pace: TaperPace,
    /// First day of the plan
    pub start_date: NaiveDate,
    /// Required for the custom pace
    pub target_end_date: Option<NaiveDate>,
    /// Age, metabolism and years of use
    pub biological: BiologicalFactors,
}

impl ScheduleRequest {
    /// Create a request with average biological factors and no target date.
    pub fn new(medication: BenzoType, current_dose: f64, pace: TaperPace, start_date: NaiveDate) -> Self {
        Self {
            medication,
            current_dose,
            pace,
            start_date,
            target_end_date: None,
            biological: BiologicalFactors::default(),
        }
    }

    pub fn with_target_end_date(mut self, target: NaiveDate) -> Self {
        self.target_end_date = Some(target);
        self
    }

    pub fn with_biological(mut self, biological: BiologicalFactors) -> Self {
        self.biological = biological;
        self
    }
}

/// Parse an ISO-8601 date, accepting a full timestamp by taking its date part.
pub fn parse_iso_date(value: &str) -> ScheduleResult<NaiveDate> {
    let trimmed = value.trim();
    let date_part = trimmed.split('T').next().unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| ScheduleError::InvalidDate(value.to_string()))
}

/// Add days to a date, saturating at the latest representable date.
pub(crate) fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(chrono::Days::new(days as u64))
        .unwrap_or(NaiveDate::MAX)
}

/// Generates taper plans.
#[derive(Debug, Clone, Default)]
pub struct ScheduleGenerator {
    config: TaperConfig,
}

impl ScheduleGenerator {
    /// Create a generator with the standard constants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator with custom constants.
    pub fn with_config(config: TaperConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TaperConfig {
        &self.config
    }

    /// Generate a complete plan.
    pub fn generate(&self, request: &ScheduleRequest) -> ScheduleResult<TaperPlan> {
        self.validate(request)?;

        let full_equivalent = request.medication.to_reference_equivalent(request.current_dose);
        let requires_crossover = !request.medication.is_reference();

        let mut steps = if requires_crossover {
            self.crossover_steps(request, full_equivalent)
        } else {
            vec![self.initial_stabilization(full_equivalent)]
        };
        let lead_in_days = self.config.lead_in_days(requires_crossover);

        let policy = self.reduction_policy(request, full_equivalent, lead_in_days);
        steps.extend(self.reduction_steps(request, policy, full_equivalent, lead_in_days)?);
        lay_out_days(&mut steps);

        tracing::info!(
            medication = request.medication.key(),
            pace = request.pace.key(),
            full_equivalent,
            steps = steps.len(),
            "Generated taper plan"
        );

        Ok(TaperPlan {
            medication: request.medication,
            start_dose: request.current_dose,
            start_date: request.start_date,
            pace: request.pace,
            target_end_date: request.target_end_date,
            biological: request.biological.clone(),
            steps,
            requires_crossover,
        })
    }

    /// Reject inputs that cannot produce a meaningful plan.
    pub fn validate(&self, request: &ScheduleRequest) -> ScheduleResult<()> {
        if !request.current_dose.is_finite() || request.current_dose <= 0.0 {
            return Err(ScheduleError::InvalidDose(request.current_dose));
        }
        // Huge doses of potent drugs overflow once converted
        if !request.medication.to_reference_equivalent(request.current_dose).is_finite() {
            return Err(ScheduleError::InvalidDose(request.current_dose));
        }

        if request.pace == TaperPace::Custom {
            let target = request.target_end_date.ok_or(ScheduleError::MissingTargetDate)?;
            if target <= request.start_date {
                return Err(ScheduleError::TargetDateNotAfterStart {
                    start: request.start_date,
                    target,
                });
            }

            let lead_in_days = self.config.lead_in_days(!request.medication.is_reference());
            let weeks = custom_weeks_left(request, lead_in_days);
            if weeks > self.config.max_reduction_steps as f64 {
                return Err(ScheduleError::TargetDateTooFar {
                    target,
                    weeks: weeks.ceil() as u32,
                    max_steps: self.config.max_reduction_steps,
                });
            }
        }
        Ok(())
    }

    /// Length of every reduction step for this patient and pace.
    pub fn reduction_step_days(&self, request: &ScheduleRequest) -> u32 {
        if request.pace == TaperPace::Slow
            || request.biological.needs_extended_steps(self.config.elderly_age)
        {
            self.config.extended_step_days
        } else {
            self.config.standard_step_days
        }
    }

    /// Reduction policy for the request.
    ///
    /// The custom pace spreads `starting_dose` evenly over the weeks left
    /// between the end of the lead-in and the target date.
    pub fn reduction_policy(
        &self,
        request: &ScheduleRequest,
        starting_dose: f64,
        lead_in_days: u32,
    ) -> ReductionPolicy {
        ReductionPolicy::for_pace(request.pace, || {
            let weeks_left = custom_weeks_left(request, lead_in_days);
            tracing::debug!(weeks_left, "Custom pace reduction window");
            (starting_dose / weeks_left, self.config.custom_min_reduction)
        })
    }

    /// Four weekly steps moving 25% more of the dose onto diazepam each week.
    fn crossover_steps(&self, request: &ScheduleRequest, full_equivalent: f64) -> Vec<TaperStep> {
        let weeks = self.config.crossover_weeks;
        let days = self.config.crossover_step_days;
        let name = request.medication.profile().name;

        (1..=weeks)
            .map(|week| {
                let diazepam_share = week as f64 / weeks as f64;
                let is_last = week == weeks;
                let phase = if is_last {
                    TaperPhase::Stabilize
                } else {
                    TaperPhase::Crossover
                };

                let mut step = TaperStep::new(format!("step-crossover-{}", week), phase, days)
                    .with_reference_dose(round_dose(full_equivalent));
                step.week = ((week - 1) * days) as f64 / 7.0;
                step.original_med_dose = round_dose(request.current_dose * (1.0 - diazepam_share));
                step.diazepam_dose = round_dose(full_equivalent * diazepam_share);
                step.notes = Some(if is_last {
                    "Fully on diazepam: stabilize before reducing".to_string()
                } else {
                    format!(
                        "Crossover week {}: replace {}% of {} with diazepam",
                        week,
                        (diazepam_share * 100.0).round(),
                        name
                    )
                });
                step
            })
            .collect()
    }

    /// Holding period at the full dose for patients already on diazepam.
    fn initial_stabilization(&self, full_equivalent: f64) -> TaperStep {
        let dose = round_dose(full_equivalent);
        let mut step = TaperStep::new(
            "step-init",
            TaperPhase::Stabilize,
            self.config.initial_stabilization_days,
        )
        .with_reference_dose(dose);
        step.diazepam_dose = dose;
        step.notes = Some("Stabilization phase".to_string());
        step
    }

    /// Cut the dose step by step until it reaches zero.
    fn reduction_steps(
        &self,
        request: &ScheduleRequest,
        policy: ReductionPolicy,
        starting_dose: f64,
        lead_in_days: u32,
    ) -> ScheduleResult<Vec<TaperStep>> {
        let step_days = self.reduction_step_days(request);
        let mut week = lead_in_days as f64 / 7.0;
        let mut remaining = starting_dose;
        let mut iterations = 0;
        let mut steps = Vec::new();

        while remaining > 0.0 {
            if iterations == self.config.max_reduction_steps {
                tracing::warn!(iterations, remaining, "Reduction did not converge");
                return Err(ScheduleError::DidNotConverge {
                    iterations,
                    remaining_dose: round_dose(remaining),
                });
            }
            iterations += 1;

            let next = remaining - policy.amount(remaining);
            remaining = if next <= self.config.zero_epsilon { 0.0 } else { next };

            let phase = if remaining == 0.0 {
                TaperPhase::JumpOff
            } else {
                TaperPhase::Reduction
            };
            let dose = round_dose(remaining);

            let mut step = TaperStep::new(format!("step-{}", iterations), phase, step_days)
                .with_reference_dose(dose);
            step.diazepam_dose = dose;
            step.week = week;
            if phase == TaperPhase::JumpOff {
                step.notes = Some("Final step: diazepam stopped".to_string());
            }
            steps.push(step);

            week += step_days as f64 / 7.0;
        }

        Ok(steps)
    }
}

/// Weeks between the end of the lead-in and the target date, at least one.
fn custom_weeks_left(request: &ScheduleRequest, lead_in_days: u32) -> f64 {
    let adjusted_start = add_days(request.start_date, lead_in_days);
    let days_left = request
        .target_end_date
        .map(|target| (target - adjusted_start).num_days() as f64)
        .unwrap_or(0.0);
    (days_left / 7.0).max(1.0)
}

/// Assign back-to-back 1-based day offsets.
fn lay_out_days(steps: &mut [TaperStep]) {
    let mut day = 1;
    for step in steps {
        step.global_day_start = day;
        day += step.duration_days;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metabolism;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_dose() {
        let generator = ScheduleGenerator::new();
        for dose in [0.0, -1.0, f64::NAN] {
            let request = ScheduleRequest::new(BenzoType::Diazepam, dose, TaperPace::Moderate, date(2024, 1, 1));
            assert!(matches!(generator.generate(&request), Err(ScheduleError::InvalidDose(_))));
        }
    }

    #[test]
    fn test_rejects_dose_overflowing_on_conversion() {
        let generator = ScheduleGenerator::new();
        let request = ScheduleRequest::new(BenzoType::Alprazolam, 1e307, TaperPace::Moderate, date(2024, 1, 1));
        assert_eq!(generator.generate(&request), Err(ScheduleError::InvalidDose(1e307)));
    }

    #[test]
    fn test_custom_target_too_far() {
        let generator = ScheduleGenerator::new();
        let request = ScheduleRequest::new(BenzoType::Diazepam, 20.0, TaperPace::Custom, date(2024, 1, 1))
            .with_target_end_date(date(2027, 6, 1));
        assert_eq!(
            generator.generate(&request),
            Err(ScheduleError::TargetDateTooFar {
                target: date(2027, 6, 1),
                weeks: 177,
                max_steps: 150,
            })
        );
    }

    #[test]
    fn test_custom_target_at_step_limit() {
        let generator = ScheduleGenerator::new();
        // 14-day stabilization, then exactly 150 weeks
        let target = date(2024, 1, 15) + chrono::Days::new(150 * 7);
        let request = ScheduleRequest::new(BenzoType::Diazepam, 20.0, TaperPace::Custom, date(2024, 1, 1))
            .with_target_end_date(target);
        let plan = generator.generate(&request).unwrap();

        assert_eq!(plan.steps.len(), 151);
        assert_eq!(plan.steps.last().unwrap().reference_dose_equivalent, 0.0);
    }

    #[test]
    fn test_custom_requires_target() {
        let generator = ScheduleGenerator::new();
        let request = ScheduleRequest::new(BenzoType::Diazepam, 10.0, TaperPace::Custom, date(2024, 1, 1));
        assert_eq!(generator.generate(&request), Err(ScheduleError::MissingTargetDate));

        let request = request.with_target_end_date(date(2024, 1, 1));
        assert!(matches!(
            generator.generate(&request),
            Err(ScheduleError::TargetDateNotAfterStart { .. })
        ));
    }

    #[test]
    fn test_step_duration_policy() {
        let generator = ScheduleGenerator::new();
        let base = ScheduleRequest::new(BenzoType::Diazepam, 10.0, TaperPace::Moderate, date(2024, 1, 1));
        assert_eq!(generator.reduction_step_days(&base), 7);

        let slow = ScheduleRequest { pace: TaperPace::Slow, ..base.clone() };
        assert_eq!(generator.reduction_step_days(&slow), 14);

        let elderly = base.clone().with_biological(BiologicalFactors {
            age: Some(70),
            ..Default::default()
        });
        assert_eq!(generator.reduction_step_days(&elderly), 14);

        let slow_metabolism = base.with_biological(BiologicalFactors {
            metabolism: Metabolism::Slow,
            ..Default::default()
        });
        assert_eq!(generator.reduction_step_days(&slow_metabolism), 14);
    }

    #[test]
    fn test_lead_in_steps_ignore_duration_policy() {
        let generator = ScheduleGenerator::new();
        let request = ScheduleRequest::new(BenzoType::Lorazepam, 1.0, TaperPace::Slow, date(2024, 1, 1));
        let plan = generator.generate(&request).unwrap();

        assert!(plan.steps[..4].iter().all(|s| s.duration_days == 7));
        assert!(plan.steps[4..].iter().all(|s| s.duration_days == 14));
    }

    #[test]
    fn test_day_layout_is_contiguous() {
        let generator = ScheduleGenerator::new();
        let request = ScheduleRequest::new(BenzoType::Clonazepam, 0.5, TaperPace::Moderate, date(2024, 1, 1));
        let plan = generator.generate(&request).unwrap();

        assert_eq!(plan.steps[0].global_day_start, 1);
        for pair in plan.steps.windows(2) {
            assert_eq!(
                pair[1].global_day_start,
                pair[0].global_day_start + pair[0].duration_days
            );
            assert!(pair[1].week >= pair[0].week);
        }
    }

    #[test]
    fn test_week_numbers() {
        let generator = ScheduleGenerator::new();
        let request = ScheduleRequest::new(BenzoType::Diazepam, 5.0, TaperPace::Slow, date(2024, 1, 1));
        let plan = generator.generate(&request).unwrap();

        assert_eq!(plan.steps[0].week, 0.0);
        assert_eq!(plan.steps[1].week, 2.0);
        assert_eq!(plan.steps[2].week, 4.0);
    }

    #[test]
    fn test_did_not_converge() {
        let config = TaperConfig {
            max_reduction_steps: 3,
            ..Default::default()
        };
        let generator = ScheduleGenerator::with_config(config);
        let request = ScheduleRequest::new(BenzoType::Diazepam, 40.0, TaperPace::AshtonStandard, date(2024, 1, 1));

        assert!(matches!(
            generator.generate(&request),
            Err(ScheduleError::DidNotConverge { iterations: 3, .. })
        ));
    }

    #[test]
    fn test_tiny_dose_jumps_off_immediately() {
        let generator = ScheduleGenerator::new();
        let request = ScheduleRequest::new(BenzoType::Diazepam, 0.1, TaperPace::Moderate, date(2024, 1, 1));
        let plan = generator.generate(&request).unwrap();

        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[1].phase, TaperPhase::JumpOff);
        assert_eq!(plan.steps[1].reference_dose_equivalent, 0.0);
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_iso_date("2024-01-01"), Ok(date(2024, 1, 1)));
        assert_eq!(parse_iso_date("2024-03-05T00:00:00.000Z"), Ok(date(2024, 3, 5)));
        assert!(matches!(parse_iso_date("March 5"), Err(ScheduleError::InvalidDate(_))));
    }
}
