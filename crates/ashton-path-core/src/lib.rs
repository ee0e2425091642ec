//! AshtonPath Core Library
//!
//! Local-first benzodiazepine taper planning and tracking, following the
//! Ashton Manual method.
//!
//! # Architecture
//!
//! ```text
//! Medication + dose + pace + start date (+ target date, age, metabolism)
//!                               │
//!                      MedicationResolver
//!                               │
//!                 ┌─────────────▼─────────────┐
//!                 │     ScheduleGenerator     │
//!                 │  convert to diazepam eq.  │
//!                 │  crossover / stabilize    │
//!                 │  reduction loop → 0mg     │
//!                 └─────────────┬─────────────┘
//!                               │
//!                           TaperPlan ──── toggle day / extend step
//!                               │             (new plan each time)
//!                           PlanStore
//!                               │
//!               ┌───────────────┼───────────────┐
//!               ▼               ▼               ▼
//!           Calendar        Dose chart      Progress
//! ```
//!
//! # Core Principle
//!
//! **Generation is deterministic.** The same inputs always produce the same
//! plan; the generator does no I/O and reads no clock.
//!
//! # Modules
//!
//! - [`schedule`]: Schedule generator, reduction policies, timeline views
//! - [`models`]: Domain types (BenzoType, TaperPlan, TaperStep, DailyLogEntry, etc.)
//! - [`resolver`]: Medication name resolution with typo suggestions
//! - [`db`]: SQLite and in-memory plan stores, symptom journal
//! - [`config`]: Generator constants and logging setup

pub mod config;
pub mod db;
pub mod models;
pub mod resolver;
pub mod schedule;

// Re-export commonly used types
pub use config::TaperConfig;
pub use db::{decode_plan, Database, MemoryPlanStore, PlanStore};
pub use models::{
    BenzoType, BiologicalFactors, DailyLogEntry, Metabolism, StabilityStatus, TaperPace,
    TaperPhase, TaperPlan, TaperStep,
};
pub use resolver::MedicationResolver;
pub use schedule::{PlanProgress, ScheduleError, ScheduleGenerator, ScheduleRequest};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum AshtonPathError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Plan generation failed: {0}")]
    GenerationFailed(String),
}

impl From<db::DbError> for AshtonPathError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::Json(e) => AshtonPathError::SerializationError(e.to_string()),
            db::DbError::Journal(e) => AshtonPathError::InvalidInput(e.to_string()),
            other => AshtonPathError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AshtonPathError {
    fn from(e: serde_json::Error) -> Self {
        AshtonPathError::SerializationError(e.to_string())
    }
}

impl From<schedule::ScheduleError> for AshtonPathError {
    fn from(e: schedule::ScheduleError) -> Self {
        match e {
            schedule::ScheduleError::DidNotConverge { .. } => {
                AshtonPathError::GenerationFailed(e.to_string())
            }
            other => AshtonPathError::InvalidInput(other.to_string()),
        }
    }
}

impl From<models::PlanError> for AshtonPathError {
    fn from(e: models::PlanError) -> Self {
        match e {
            models::PlanError::StepNotFound(_) => AshtonPathError::NotFound(e.to_string()),
            other => AshtonPathError::InvalidInput(other.to_string()),
        }
    }
}

impl From<resolver::ResolverError> for AshtonPathError {
    fn from(e: resolver::ResolverError) -> Self {
        AshtonPathError::InvalidInput(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for AshtonPathError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        AshtonPathError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<AshtonPathCore>, AshtonPathError> {
    let db = Database::open(&path)?;
    tracing::info!(path = %path, "Opened database");
    Ok(Arc::new(AshtonPathCore::new(db)))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<AshtonPathCore>, AshtonPathError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(AshtonPathCore::new(db)))
}

/// Install the tracing subscriber for the host process.
#[uniffi::export]
pub fn init_logging() {
    config::init_logging();
}

/// Every supported medication with its reference data.
#[uniffi::export]
pub fn medication_profiles() -> Vec<FfiMedicationProfile> {
    BenzoType::ALL.into_iter().map(|m| m.into()).collect()
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct AshtonPathCore {
    db: Arc<Mutex<Database>>,
    resolver: MedicationResolver,
    generator: ScheduleGenerator,
}

impl AshtonPathCore {
    fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            resolver: MedicationResolver::new(),
            generator: ScheduleGenerator::new(),
        }
    }

    fn active_plan(&self, db: &Database) -> Result<TaperPlan, AshtonPathError> {
        db.load_plan()?
            .ok_or_else(|| AshtonPathError::NotFound("No active taper plan".to_string()))
    }

    fn to_request(&self, request: FfiPlanRequest) -> Result<ScheduleRequest, AshtonPathError> {
        let medication = self.resolver.resolve(&request.medication)?;
        let pace: TaperPace = request.pace.parse().map_err(AshtonPathError::InvalidInput)?;
        let start_date = schedule::parse_iso_date(&request.start_date)?;
        let target_end_date = request
            .target_end_date
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(schedule::parse_iso_date)
            .transpose()?;
        let metabolism = request
            .metabolism
            .as_deref()
            .map(str::parse::<Metabolism>)
            .transpose()
            .map_err(AshtonPathError::InvalidInput)?
            .unwrap_or_default();

        Ok(ScheduleRequest {
            medication,
            current_dose: request.dose,
            pace,
            start_date,
            target_end_date,
            biological: BiologicalFactors {
                age: request.age,
                metabolism,
                years_using: request.years_using,
            },
        })
    }
}

#[uniffi::export]
impl AshtonPathCore {
    // =========================================================================
    // Plan Operations
    // =========================================================================

    /// Generate a plan, replace the saved one, and return it as JSON.
    pub fn generate_plan(&self, request: FfiPlanRequest) -> Result<String, AshtonPathError> {
        let request = self.to_request(request)?;
        let plan = self.generator.generate(&request)?;

        let db = self.db.lock()?;
        db.save_plan(&plan)?;
        tracing::info!(steps = plan.steps.len(), "Saved new taper plan");
        Ok(plan.to_json()?)
    }

    /// The saved plan as JSON, if any.
    pub fn current_plan_json(&self) -> Result<Option<String>, AshtonPathError> {
        let db = self.db.lock()?;
        match db.load_plan()? {
            Some(plan) => Ok(Some(plan.to_json()?)),
            None => Ok(None),
        }
    }

    /// Flip one day of one step and return the updated plan JSON.
    pub fn toggle_day(&self, step_id: String, day_index: u32) -> Result<String, AshtonPathError> {
        let db = self.db.lock()?;
        let plan = self.active_plan(&db)?.toggle_day(&step_id, day_index as usize)?;
        db.save_plan(&plan)?;
        Ok(plan.to_json()?)
    }

    /// Add one day to a step and return the updated plan JSON.
    pub fn extend_step(&self, step_id: String) -> Result<String, AshtonPathError> {
        let db = self.db.lock()?;
        let plan = self.active_plan(&db)?.extend_step(&step_id)?;
        db.save_plan(&plan)?;
        Ok(plan.to_json()?)
    }

    /// Forget the saved plan.
    pub fn clear_plan(&self) -> Result<(), AshtonPathError> {
        let db = self.db.lock()?;
        db.clear_plan()?;
        tracing::info!("Cleared taper plan");
        Ok(())
    }

    /// Progress summary of the saved plan.
    pub fn plan_progress(&self) -> Result<FfiPlanProgress, AshtonPathError> {
        let db = self.db.lock()?;
        let plan = self.active_plan(&db)?;
        Ok(PlanProgress::of(&plan).into())
    }

    /// Dose chart points of the saved plan.
    pub fn dose_curve(&self) -> Result<Vec<FfiChartPoint>, AshtonPathError> {
        let db = self.db.lock()?;
        let plan = self.active_plan(&db)?;
        Ok(schedule::dose_curve(&plan).into_iter().map(|p| p.into()).collect())
    }

    // =========================================================================
    // Journal Operations
    // =========================================================================

    /// Save a journal entry given as JSON, replacing that day's entry.
    pub fn save_log(&self, entry_json: String) -> Result<(), AshtonPathError> {
        let entry: DailyLogEntry = serde_json::from_str(&entry_json)?;
        let db = self.db.lock()?;
        db.save_log(&entry)?;
        Ok(())
    }

    /// All journal entries as a JSON array, oldest first.
    pub fn list_logs_json(&self) -> Result<String, AshtonPathError> {
        let db = self.db.lock()?;
        let logs = db.list_logs()?;
        Ok(serde_json::to_string(&logs)?)
    }

    /// Stability over the most recent journal entries.
    pub fn stability_status(&self) -> Result<String, AshtonPathError> {
        let db = self.db.lock()?;
        let logs = db.list_logs()?;
        Ok(StabilityStatus::assess(&logs).as_str().to_string())
    }

    /// Whether the entry for a day shows warning signs.
    pub fn log_needs_attention(&self, date: String) -> Result<bool, AshtonPathError> {
        let db = self.db.lock()?;
        let entry = db
            .get_log(&date)?
            .ok_or_else(|| AshtonPathError::NotFound(format!("No journal entry for {}", date)))?;
        Ok(entry.needs_attention())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe plan inputs.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPlanRequest {
    /// Key, generic name, brand name or display label
    pub medication: String,
    pub dose: f64,
    /// Pace key or label
    pub pace: String,
    /// ISO date (YYYY-MM-DD or full timestamp)
    pub start_date: String,
    pub target_end_date: Option<String>,
    pub age: Option<u32>,
    pub metabolism: Option<String>,
    pub years_using: Option<f64>,
}

/// FFI-safe medication reference data.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicationProfile {
    pub key: String,
    pub name: String,
    pub brand_name: String,
    pub half_life_range: String,
    pub diazepam_equivalence_factor: f64,
}

impl From<BenzoType> for FfiMedicationProfile {
    fn from(medication: BenzoType) -> Self {
        let profile = medication.profile();
        Self {
            key: medication.key().to_string(),
            name: profile.name.to_string(),
            brand_name: profile.brand_name.to_string(),
            half_life_range: profile.half_life_range.to_string(),
            diazepam_equivalence_factor: profile.diazepam_equivalence_factor,
        }
    }
}

/// FFI-safe progress summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPlanProgress {
    pub completed_steps: u32,
    pub total_steps: u32,
    pub percent_complete: u32,
    pub current_dose: f64,
    pub completed_days: u32,
    pub total_days: u32,
    pub projected_end_date: String,
}

impl From<PlanProgress> for FfiPlanProgress {
    fn from(progress: PlanProgress) -> Self {
        Self {
            completed_steps: progress.completed_steps,
            total_steps: progress.total_steps,
            percent_complete: progress.percent_complete,
            current_dose: progress.current_dose,
            completed_days: progress.completed_days,
            total_days: progress.total_days,
            projected_end_date: progress.projected_end_date.to_string(),
        }
    }
}

/// FFI-safe chart point.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiChartPoint {
    pub day: u32,
    pub dose: f64,
    pub label: String,
}

impl From<schedule::ChartPoint> for FfiChartPoint {
    fn from(point: schedule::ChartPoint) -> Self {
        Self {
            day: point.day,
            dose: point.dose,
            label: point.label,
        }
    }
}
