//! Calendar, chart and progress views derived from a plan.
//!
//! Dates are always recomputed from the plan start date and cumulative step
//! durations, never from stored per-step offsets, so extending a step moves
//! every later step.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::add_days;
use crate::models::TaperPlan;

/// Calendar span of one step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepDates {
    pub step_id: String,
    /// First day of the step
    pub start: NaiveDate,
    /// Last day of the step (inclusive)
    pub end: NaiveDate,
}

/// Calendar dates of every step.
pub fn step_calendar(plan: &TaperPlan) -> Vec<StepDates> {
    let mut offset = 0;
    plan.steps
        .iter()
        .map(|step| {
            let start = add_days(plan.start_date, offset);
            let end = add_days(plan.start_date, offset + step.duration_days.saturating_sub(1));
            offset += step.duration_days;
            StepDates {
                step_id: step.id.clone(),
                start,
                end,
            }
        })
        .collect()
}

/// Date of a specific day within a step, or `None` for an unknown step.
pub fn day_date(plan: &TaperPlan, step_id: &str, day_index: u32) -> Option<NaiveDate> {
    step_calendar(plan)
        .into_iter()
        .find(|dates| dates.step_id == step_id)
        .map(|dates| add_days(dates.start, day_index))
}

/// One point of the dose-reduction curve.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    /// Days elapsed since the plan start
    pub day: u32,
    /// Diazepam-equivalent dose from this day on
    pub dose: f64,
    pub label: String,
}

/// Dose curve: one point per step plus a closing point at zero.
pub fn dose_curve(plan: &TaperPlan) -> Vec<ChartPoint> {
    let mut elapsed = 0;
    let mut points: Vec<ChartPoint> = plan
        .steps
        .iter()
        .map(|step| {
            let point = ChartPoint {
                day: elapsed,
                dose: step.total_dose_equivalent,
                label: format!("Week {}", step.week.ceil() as u32),
            };
            elapsed += step.duration_days;
            point
        })
        .collect();

    points.push(ChartPoint {
        day: elapsed,
        dose: 0.0,
        label: "Finish".to_string(),
    });
    points
}

/// Progress summary for dashboards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanProgress {
    pub completed_steps: u32,
    pub total_steps: u32,
    /// Completed steps as a rounded percentage
    pub percent_complete: u32,
    /// Diazepam-equivalent dose of the first unfinished step, 0 when done
    pub current_dose: f64,
    pub completed_days: u32,
    pub total_days: u32,
    /// Last day of the final step
    pub projected_end_date: NaiveDate,
}

impl PlanProgress {
    /// Summarize a plan.
    pub fn of(plan: &TaperPlan) -> Self {
        let total_steps = plan.steps.len() as u32;
        let completed_steps = plan.steps.iter().filter(|step| step.is_completed).count() as u32;
        let percent_complete = if total_steps == 0 {
            0
        } else {
            (completed_steps as f64 / total_steps as f64 * 100.0).round() as u32
        };

        let total_days = plan.total_days();
        Self {
            completed_steps,
            total_steps,
            percent_complete,
            current_dose: plan
                .current_step()
                .map(|step| step.reference_dose_equivalent)
                .unwrap_or(0.0),
            completed_days: plan.steps.iter().map(|s| s.completed_day_count() as u32).sum(),
            total_days,
            projected_end_date: add_days(plan.start_date, total_days.saturating_sub(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BenzoType, TaperPace};
    use crate::schedule::{ScheduleGenerator, ScheduleRequest};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn diazepam_plan() -> TaperPlan {
        let request = ScheduleRequest::new(BenzoType::Diazepam, 2.0, TaperPace::AshtonStandard, date(2024, 1, 1));
        ScheduleGenerator::new().generate(&request).unwrap()
    }

    #[test]
    fn test_step_calendar() {
        let plan = diazepam_plan();
        let calendar = step_calendar(&plan);

        assert_eq!(calendar.len(), plan.steps.len());
        assert_eq!(calendar[0].start, date(2024, 1, 1));
        assert_eq!(calendar[0].end, date(2024, 1, 14));
        assert_eq!(calendar[1].start, date(2024, 1, 15));
        assert_eq!(calendar[1].end, date(2024, 1, 21));
    }

    #[test]
    fn test_extension_shifts_later_dates() {
        let plan = diazepam_plan();
        let extended = plan.extend_step("step-init").unwrap();
        let calendar = step_calendar(&extended);

        assert_eq!(calendar[0].end, date(2024, 1, 15));
        assert_eq!(calendar[1].start, date(2024, 1, 16));
        // Stored offsets are left alone
        assert_eq!(extended.steps[1].global_day_start, 15);
    }

    #[test]
    fn test_day_date() {
        let plan = diazepam_plan();
        assert_eq!(day_date(&plan, "step-1", 2), Some(date(2024, 1, 17)));
        assert_eq!(day_date(&plan, "missing", 0), None);
    }

    #[test]
    fn test_dose_curve() {
        let plan = diazepam_plan();
        let curve = dose_curve(&plan);

        assert_eq!(curve.len(), plan.steps.len() + 1);
        assert_eq!(curve[0].day, 0);
        assert_eq!(curve[0].dose, 2.0);
        assert_eq!(curve[0].label, "Week 0");
        assert_eq!(curve[1].day, 14);
        assert_eq!(curve[1].label, "Week 2");

        let last = curve.last().unwrap();
        assert_eq!(last.label, "Finish");
        assert_eq!(last.dose, 0.0);
        assert_eq!(last.day, plan.total_days());
    }

    #[test]
    fn test_progress() {
        // 2mg Ashton: init + 4 half-milligram cuts
        let plan = diazepam_plan();
        assert_eq!(plan.steps.len(), 5);

        let progress = PlanProgress::of(&plan);
        assert_eq!(progress.completed_steps, 0);
        assert_eq!(progress.percent_complete, 0);
        assert_eq!(progress.current_dose, 2.0);
        assert_eq!(progress.total_days, 14 + 4 * 7);
        assert_eq!(progress.projected_end_date, date(2024, 2, 11));

        let mut plan = plan;
        for day in 0..14 {
            plan = plan.toggle_day("step-init", day).unwrap();
        }
        plan = plan.toggle_day("step-1", 0).unwrap();

        let progress = PlanProgress::of(&plan);
        assert_eq!(progress.completed_steps, 1);
        assert_eq!(progress.percent_complete, 20);
        assert_eq!(progress.current_dose, 1.5);
        assert_eq!(progress.completed_days, 15);
    }
}
