//! In-process plan store for hosts that persist elsewhere.

use std::sync::Mutex;

use super::{decode_plan, DbError, DbResult, PlanStore};
use crate::models::TaperPlan;

/// Keeps the current plan as JSON in memory.
///
/// Stores the serialized form rather than the plan itself so loading goes
/// through the same legacy-repairing decoder as the SQLite store.
#[derive(Debug, Default)]
pub struct MemoryPlanStore {
    plan_json: Mutex<Option<String>>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with previously saved JSON.
    pub fn with_json(json: impl Into<String>) -> Self {
        Self {
            plan_json: Mutex::new(Some(json.into())),
        }
    }

    /// Raw JSON currently held, if any.
    pub fn json(&self) -> DbResult<Option<String>> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> DbResult<std::sync::MutexGuard<'_, Option<String>>> {
        self.plan_json
            .lock()
            .map_err(|e| DbError::LockPoisoned(e.to_string()))
    }
}

impl PlanStore for MemoryPlanStore {
    fn load_plan(&self) -> DbResult<Option<TaperPlan>> {
        self.lock()?.as_deref().map(decode_plan).transpose()
    }

    fn save_plan(&self, plan: &TaperPlan) -> DbResult<()> {
        let json = serde_json::to_string(plan)?;
        *self.lock()? = Some(json);
        Ok(())
    }

    fn clear_plan(&self) -> DbResult<()> {
        *self.lock()? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::models::{BenzoType, TaperPace};
    use crate::schedule::{ScheduleGenerator, ScheduleRequest};

    #[test]
    fn test_round_trip() {
        let store = MemoryPlanStore::new();
        assert!(store.load_plan().unwrap().is_none());

        let request = ScheduleRequest::new(
            BenzoType::Temazepam,
            20.0,
            TaperPace::AshtonStandard,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );
        let plan = ScheduleGenerator::new().generate(&request).unwrap();
        store.save_plan(&plan).unwrap();

        assert_eq!(store.load_plan().unwrap(), Some(plan));
        assert!(store.json().unwrap().unwrap().contains("\"medication\":\"temazepam\""));

        store.clear_plan().unwrap();
        assert!(store.load_plan().unwrap().is_none());
    }

    #[test]
    fn test_seeded_legacy_json() {
        let store = MemoryPlanStore::with_json(
            r#"{"medication":"diazepam","startDose":2,"startDate":"2024-01-01","speed":"Ashton Manual Standard",
                "steps":[{"id":"step-init","diazepamDose":2,"isCompleted":false}]}"#,
        );

        let plan = store.load_plan().unwrap().unwrap();
        assert_eq!(plan.pace, TaperPace::AshtonStandard);
        assert_eq!(plan.steps[0].completed_days.len(), 7);
    }
}
