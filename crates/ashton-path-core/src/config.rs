//! Generator tunables and logging setup.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Crate version, reported at startup.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "ashton_path_core=info,warn"
}

/// Install a fmt subscriber for the host process.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logging() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("AshtonPath core v{} logging initialized", APP_VERSION);
    }
}

/// Constants that drive schedule generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaperConfig {
    /// Weekly substitution steps when crossing over to diazepam
    pub crossover_weeks: u32,
    /// Length of each crossover step
    pub crossover_step_days: u32,
    /// Holding period before reducing when already on diazepam
    pub initial_stabilization_days: u32,
    /// Reduction step length for most patients
    pub standard_step_days: u32,
    /// Reduction step length for slow pace, older or slow-metabolism patients
    pub extended_step_days: u32,
    /// Patients older than this get extended steps
    pub elderly_age: u32,
    /// Maximum reduction iterations before giving up
    pub max_reduction_steps: u32,
    /// Remaining doses at or below this are treated as zero
    pub zero_epsilon: f64,
    /// Smallest per-step cut for the custom pace
    pub custom_min_reduction: f64,
}

impl Default for TaperConfig {
    fn default() -> Self {
        Self {
            crossover_weeks: 4,
            crossover_step_days: 7,
            initial_stabilization_days: 14,
            standard_step_days: 7,
            extended_step_days: 14,
            elderly_age: 65,
            max_reduction_steps: 150,
            zero_epsilon: 0.005,
            custom_min_reduction: 0.1,
        }
    }
}

impl TaperConfig {
    /// Days spent before the first reduction step.
    pub fn lead_in_days(&self, requires_crossover: bool) -> u32 {
        if requires_crossover {
            self.crossover_weeks * self.crossover_step_days
        } else {
            self.initial_stabilization_days
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TaperConfig::default();
        assert_eq!(config.lead_in_days(true), 28);
        assert_eq!(config.lead_in_days(false), 14);
        assert_eq!(config.max_reduction_steps, 150);
    }

    #[test]
    fn test_partial_override() {
        let config: TaperConfig = serde_json::from_str(r#"{"elderly_age": 70}"#).unwrap();
        assert_eq!(config.elderly_age, 70);
        assert_eq!(config.standard_step_days, 7);
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging();
        init_logging();
    }
}
