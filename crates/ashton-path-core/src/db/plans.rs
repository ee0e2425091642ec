//! Plan persistence and decoding of stored plan JSON.
//!
//! Plans are stored verbatim as JSON. Decoding goes through lenient record
//! types so plans written by earlier app versions still load:
//! - missing or zero `durationDays` → 7
//! - missing `completedDays` → `durationDays` copies of the legacy `isCompleted`
//! - missing `phase` → inferred from position, dose and crossover share
//! - missing `globalDayStart` → cumulative from durations
//! - legacy names (`speed`, `totalDiazepamEq`, `isDiazepamCrossOver`)

use serde::Deserialize;

use super::{Database, DbError, DbResult, PlanStore};
use crate::models::{BenzoType, BiologicalFactors, Metabolism, TaperPace, TaperPhase, TaperPlan, TaperStep};
use crate::schedule::parse_iso_date;

/// Key of the current plan in the key/value table.
pub const PLAN_KEY: &str = "plan";

/// Step length assumed for legacy steps without one.
pub const LEGACY_DURATION_DAYS: u32 = 7;

impl PlanStore for Database {
    fn load_plan(&self) -> DbResult<Option<TaperPlan>> {
        self.get_value(PLAN_KEY)?
            .map(|json| decode_plan(&json))
            .transpose()
    }

    fn save_plan(&self, plan: &TaperPlan) -> DbResult<()> {
        let json = serde_json::to_string(plan)?;
        self.set_value(PLAN_KEY, &json)?;
        tracing::debug!(steps = plan.steps.len(), "Saved plan");
        Ok(())
    }

    fn clear_plan(&self) -> DbResult<()> {
        self.delete_value(PLAN_KEY)?;
        Ok(())
    }
}

/// Decode stored plan JSON, repairing legacy data.
pub fn decode_plan(json: &str) -> DbResult<TaperPlan> {
    let record: PlanRecord = serde_json::from_str(json)?;
    record.try_into()
}

/// Stored plan with every field that older versions may omit made optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanRecord {
    medication: BenzoType,
    start_dose: f64,
    start_date: String,
    #[serde(alias = "speed")]
    pace: TaperPace,
    #[serde(default)]
    target_end_date: Option<String>,
    #[serde(default)]
    age: Option<u32>,
    #[serde(default)]
    metabolism: Option<Metabolism>,
    #[serde(default)]
    years_using: Option<f64>,
    steps: Vec<StepRecord>,
    #[serde(default, alias = "isDiazepamCrossOver")]
    requires_crossover: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepRecord {
    id: String,
    #[serde(default)]
    week: Option<f64>,
    #[serde(default)]
    phase: Option<TaperPhase>,
    #[serde(default)]
    original_med_dose: Option<f64>,
    #[serde(default)]
    diazepam_dose: Option<f64>,
    #[serde(default)]
    reference_dose_equivalent: Option<f64>,
    #[serde(default, alias = "totalDiazepamEq")]
    total_dose_equivalent: Option<f64>,
    #[serde(default)]
    is_completed: Option<bool>,
    #[serde(default)]
    completed_days: Option<Vec<bool>>,
    #[serde(default)]
    duration_days: Option<u32>,
    #[serde(default)]
    global_day_start: Option<u32>,
    #[serde(default)]
    notes: Option<String>,
}

impl StepRecord {
    fn into_step(self, index: usize, is_last: bool, next_day: u32, requires_crossover: bool) -> TaperStep {
        let duration_days = match (self.duration_days, &self.completed_days) {
            (Some(days), _) if days > 0 => days,
            (_, Some(flags)) if !flags.is_empty() => flags.len() as u32,
            _ => LEGACY_DURATION_DAYS,
        };

        let completed_days = match self.completed_days {
            Some(mut flags) => {
                if flags.len() != duration_days as usize {
                    tracing::warn!(
                        step_id = %self.id,
                        stored = flags.len(),
                        duration_days,
                        "Resizing completed days to step duration"
                    );
                    flags.resize(duration_days as usize, false);
                }
                flags
            }
            None => vec![self.is_completed.unwrap_or(false); duration_days as usize],
        };

        let reference = self
            .reference_dose_equivalent
            .or(self.total_dose_equivalent)
            .or(self.diazepam_dose)
            .unwrap_or(0.0);

        let original_med_dose = self.original_med_dose.unwrap_or(0.0);
        let phase = self.phase.unwrap_or(if requires_crossover && original_med_dose > 0.0 {
            TaperPhase::Crossover
        } else if index == 0 {
            TaperPhase::Stabilize
        } else if is_last && reference == 0.0 {
            TaperPhase::JumpOff
        } else {
            TaperPhase::Reduction
        });

        let mut step = TaperStep {
            id: self.id,
            week: self.week.unwrap_or(0.0),
            phase,
            original_med_dose,
            diazepam_dose: self.diazepam_dose.unwrap_or(reference),
            reference_dose_equivalent: reference,
            total_dose_equivalent: self.total_dose_equivalent.unwrap_or(reference),
            duration_days,
            completed_days,
            is_completed: false,
            global_day_start: self.global_day_start.unwrap_or(next_day),
            notes: self.notes,
        };
        step.refresh_completion();
        step
    }
}

impl TryFrom<PlanRecord> for TaperPlan {
    type Error = DbError;

    fn try_from(record: PlanRecord) -> Result<Self, Self::Error> {
        let start_date = parse_iso_date(&record.start_date)
            .map_err(|e| DbError::InvalidRecord(e.to_string()))?;
        let target_end_date = record
            .target_end_date
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(parse_iso_date)
            .transpose()
            .map_err(|e| DbError::InvalidRecord(e.to_string()))?;

        let requires_crossover = record
            .requires_crossover
            .unwrap_or(!record.medication.is_reference());

        let count = record.steps.len();
        let mut next_day = 1;
        let mut steps = Vec::with_capacity(count);
        for (index, step_record) in record.steps.into_iter().enumerate() {
            let step = step_record.into_step(index, index + 1 == count, next_day, requires_crossover);
            next_day += step.duration_days;
            steps.push(step);
        }

        Ok(TaperPlan {
            requires_crossover,
            medication: record.medication,
            start_dose: record.start_dose,
            start_date,
            pace: record.pace,
            target_end_date,
            biological: BiologicalFactors {
                age: record.age,
                metabolism: record.metabolism.unwrap_or_default(),
                years_using: record.years_using,
            },
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::schedule::{ScheduleGenerator, ScheduleRequest};

    fn make_plan() -> TaperPlan {
        let request = ScheduleRequest::new(
            BenzoType::Alprazolam,
            0.5,
            TaperPace::Moderate,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        ScheduleGenerator::new().generate(&request).unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.load_plan().unwrap().is_none());

        let plan = make_plan().toggle_day("step-crossover-1", 0).unwrap();
        db.save_plan(&plan).unwrap();

        let loaded = db.load_plan().unwrap().unwrap();
        assert_eq!(loaded, plan);
    }

    #[test]
    fn test_save_replaces_plan() {
        let db = Database::open_in_memory().unwrap();
        let first = make_plan();
        db.save_plan(&first).unwrap();

        let second = first.extend_step("step-1").unwrap();
        db.save_plan(&second).unwrap();

        assert_eq!(db.load_plan().unwrap().unwrap(), second);
    }

    #[test]
    fn test_clear_plan() {
        let db = Database::open_in_memory().unwrap();
        db.save_plan(&make_plan()).unwrap();
        db.clear_plan().unwrap();
        assert!(db.load_plan().unwrap().is_none());
    }

    #[test]
    fn test_decode_legacy_step_without_tracking() {
        let json = r#"{
            "medication": "Diazepam (Valium)",
            "startDose": 10,
            "startDate": "2024-01-01",
            "speed": "Moderate (10% cuts)",
            "steps": [
                {"id": "step-init", "week": 0, "originalMedDose": 10, "diazepamDose": 10, "isCompleted": true, "durationDays": 14},
                {"id": "step-1", "week": 1, "originalMedDose": 9, "diazepamDose": 9, "isCompleted": false},
                {"id": "step-2", "week": 2, "originalMedDose": 0, "diazepamDose": 0, "isCompleted": false}
            ],
            "isDiazepamCrossOver": false
        }"#;

        let plan = decode_plan(json).unwrap();

        assert_eq!(plan.medication, BenzoType::Diazepam);
        assert_eq!(plan.pace, TaperPace::Moderate);
        assert!(!plan.requires_crossover);
        assert_eq!(plan.biological.metabolism, Metabolism::Average);

        let init = &plan.steps[0];
        assert_eq!(init.completed_days, vec![true; 14]);
        assert!(init.is_completed);
        assert_eq!(init.phase, TaperPhase::Stabilize);
        assert_eq!(init.reference_dose_equivalent, 10.0);

        let second = &plan.steps[1];
        assert_eq!(second.duration_days, 7);
        assert_eq!(second.completed_days, vec![false; 7]);
        assert_eq!(second.global_day_start, 15);
        assert_eq!(second.phase, TaperPhase::Reduction);

        let last = &plan.steps[2];
        assert_eq!(last.phase, TaperPhase::JumpOff);
        assert_eq!(last.global_day_start, 22);
    }

    #[test]
    fn test_decode_zero_duration_and_mismatched_days() {
        let json = r#"{
            "medication": "lorazepam",
            "startDose": 1,
            "startDate": "2024-05-01T09:30:00.000Z",
            "pace": "slow",
            "steps": [
                {"id": "a", "durationDays": 0, "isCompleted": false, "totalDiazepamEq": 10},
                {"id": "b", "durationDays": 3, "completedDays": [true, true, true, true], "totalDiazepamEq": 0}
            ]
        }"#;

        let plan = decode_plan(json).unwrap();

        assert_eq!(plan.start_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert!(plan.requires_crossover);
        assert_eq!(plan.steps[0].duration_days, 7);
        assert_eq!(plan.steps[0].reference_dose_equivalent, 10.0);
        assert_eq!(plan.steps[1].completed_days, vec![true, true, true]);
        assert!(plan.steps[1].is_completed);
    }

    #[test]
    fn test_decode_infers_crossover_phase() {
        let json = r#"{
            "medication": "clonazepam", "startDose": 1, "startDate": "2024-01-01", "pace": "moderate",
            "steps": [
                {"id": "a", "originalMedDose": 0.75, "diazepamDose": 5, "totalDiazepamEq": 20},
                {"id": "b", "originalMedDose": 0.5, "diazepamDose": 10, "totalDiazepamEq": 20},
                {"id": "c", "originalMedDose": 0, "diazepamDose": 20, "totalDiazepamEq": 20},
                {"id": "d", "originalMedDose": 0, "diazepamDose": 0, "totalDiazepamEq": 0}
            ]
        }"#;

        let phases: Vec<TaperPhase> = decode_plan(json).unwrap().steps.iter().map(|s| s.phase).collect();
        assert_eq!(
            phases,
            vec![
                TaperPhase::Crossover,
                TaperPhase::Crossover,
                TaperPhase::Reduction,
                TaperPhase::JumpOff
            ]
        );
    }

    #[test]
    fn test_decode_days_without_duration() {
        let json = r#"{
            "medication": "diazepam", "startDose": 5, "startDate": "2024-01-01", "pace": "moderate",
            "steps": [{"id": "a", "completedDays": [true, false]}]
        }"#;

        let plan = decode_plan(json).unwrap();
        assert_eq!(plan.steps[0].duration_days, 2);
        assert!(!plan.steps[0].is_completed);
    }

    #[test]
    fn test_decode_rejects_bad_start_date() {
        let json = r#"{
            "medication": "diazepam", "startDose": 5, "startDate": "soon", "pace": "moderate", "steps": []
        }"#;
        assert!(matches!(decode_plan(json), Err(DbError::InvalidRecord(_))));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_plan("not json"), Err(DbError::Json(_))));
    }
}
