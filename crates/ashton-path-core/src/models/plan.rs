//! Taper plan and step models.
//!
//! A plan is produced once by the schedule generator and afterwards only
//! changes through [`TaperPlan::toggle_day`] and [`TaperPlan::extend_step`],
//! both of which return a new plan and leave the original untouched.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::medication::{BenzoType, BiologicalFactors, TaperPace};

/// Errors from plan mutations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("Day {day_index} is outside step {step_id} ({duration_days} days)")]
    DayOutOfRange {
        step_id: String,
        day_index: usize,
        duration_days: u32,
    },
}

pub type PlanResult<T> = Result<T, PlanError>;

/// Phase of the taper a step belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaperPhase {
    /// Substituting the original medication with diazepam
    Crossover,
    /// Holding the dose steady
    Stabilize,
    /// Regular dose reduction
    Reduction,
    /// Final step, dose reaches zero
    #[serde(alias = "jump")]
    JumpOff,
}

/// One scheduled interval at a fixed dose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaperStep {
    /// Unique within the plan
    pub id: String,
    /// Weeks elapsed before this step begins (ordering key)
    pub week: f64,
    /// Taper phase
    pub phase: TaperPhase,
    /// Daily dose of the starting medication (non-zero only during crossover)
    pub original_med_dose: f64,
    /// Daily diazepam actually taken
    pub diazepam_dose: f64,
    /// Total daily dose in diazepam milligrams
    pub reference_dose_equivalent: f64,
    /// Same as `reference_dose_equivalent`, kept for charting
    pub total_dose_equivalent: f64,
    /// Calendar days this step spans
    pub duration_days: u32,
    /// Per-day completion flags, always `duration_days` long
    pub completed_days: Vec<bool>,
    /// True iff every day is completed
    pub is_completed: bool,
    /// 1-based day offset of the first day from the plan start
    pub global_day_start: u32,
    /// Optional annotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TaperStep {
    /// Create a step with no doses and no completed days.
    pub fn new(id: impl Into<String>, phase: TaperPhase, duration_days: u32) -> Self {
        Self {
            id: id.into(),
            week: 0.0,
            phase,
            original_med_dose: 0.0,
            diazepam_dose: 0.0,
            reference_dose_equivalent: 0.0,
            total_dose_equivalent: 0.0,
            duration_days,
            completed_days: vec![false; duration_days as usize],
            is_completed: false,
            global_day_start: 1,
            notes: None,
        }
    }

    /// Set the total diazepam-equivalent dose (both the reference and total fields).
    pub fn with_reference_dose(mut self, dose: f64) -> Self {
        self.reference_dose_equivalent = dose;
        self.total_dose_equivalent = dose;
        self
    }

    /// Number of days marked done.
    pub fn completed_day_count(&self) -> usize {
        self.completed_days.iter().filter(|done| **done).count()
    }

    /// Flip one day's completion flag.
    pub fn toggle_day(&mut self, day_index: usize) -> PlanResult<()> {
        let duration_days = self.duration_days;
        let day = self
            .completed_days
            .get_mut(day_index)
            .ok_or_else(|| PlanError::DayOutOfRange {
                step_id: self.id.clone(),
                day_index,
                duration_days,
            })?;
        *day = !*day;
        self.refresh_completion();
        Ok(())
    }

    /// Lengthen the step by one not-yet-completed day.
    pub fn extend_by_one_day(&mut self) {
        self.duration_days += 1;
        self.completed_days.push(false);
        self.refresh_completion();
    }

    /// Recompute `is_completed` from the per-day flags.
    pub fn refresh_completion(&mut self) {
        self.is_completed = self.completed_days.iter().all(|done| *done);
    }
}

/// A complete taper plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaperPlan {
    /// Starting medication
    pub medication: BenzoType,
    /// Starting daily dose of `medication`, in mg
    pub start_dose: f64,
    /// First day of the plan
    pub start_date: NaiveDate,
    /// Chosen pace
    pub pace: TaperPace,
    /// Target end date (custom pace only)
    #[serde(default)]
    pub target_end_date: Option<NaiveDate>,
    /// Age, metabolism and years of use
    #[serde(flatten)]
    pub biological: BiologicalFactors,
    /// Ordered steps
    pub steps: Vec<TaperStep>,
    /// True iff the starting medication is not diazepam
    pub requires_crossover: bool,
}

impl TaperPlan {
    /// Look up a step by id.
    pub fn step(&self, step_id: &str) -> Option<&TaperStep> {
        self.steps.iter().find(|step| step.id == step_id)
    }

    fn step_position(&self, step_id: &str) -> PlanResult<usize> {
        self.steps
            .iter()
            .position(|step| step.id == step_id)
            .ok_or_else(|| PlanError::StepNotFound(step_id.to_string()))
    }

    /// Return a copy of the plan with one day of one step toggled.
    pub fn toggle_day(&self, step_id: &str, day_index: usize) -> PlanResult<TaperPlan> {
        let position = self.step_position(step_id)?;
        let mut updated = self.clone();
        updated.steps[position].toggle_day(day_index)?;

        tracing::debug!(
            step_id,
            day_index,
            done = updated.steps[position].completed_days[day_index],
            "Toggled day"
        );
        Ok(updated)
    }

    /// Return a copy of the plan with one step lengthened by a day.
    ///
    /// Later steps keep their stored `global_day_start`; calendar dates are
    /// always derived from cumulative durations, so they shift on display.
    pub fn extend_step(&self, step_id: &str) -> PlanResult<TaperPlan> {
        let position = self.step_position(step_id)?;
        let mut updated = self.clone();
        updated.steps[position].extend_by_one_day();

        tracing::debug!(
            step_id,
            duration_days = updated.steps[position].duration_days,
            "Extended step"
        );
        Ok(updated)
    }

    /// Sum of all step durations.
    pub fn total_days(&self) -> u32 {
        self.steps.iter().map(|step| step.duration_days).sum()
    }

    /// First step that still has days left to complete.
    pub fn current_step(&self) -> Option<&TaperStep> {
        self.steps.iter().find(|step| !step.is_completed)
    }

    /// Whether every step is completed.
    pub fn is_finished(&self) -> bool {
        self.steps.iter().all(|step| step.is_completed)
    }

    /// Serialize to the JSON stored by the host app.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
