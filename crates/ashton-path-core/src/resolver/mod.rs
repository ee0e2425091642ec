//! Medication identifier resolution.
//!
//! Handles:
//! - Storage keys ("alprazolam")
//! - Generic and brand names, any case ("Xanax", "VALIUM")
//! - Display labels from earlier app versions ("Lorazepam (Ativan)")
//! - Typo suggestions for anything else ("alprazolan" → did you mean alprazolam?)

use std::collections::HashMap;

use strsim::{jaro_winkler, normalized_levenshtein};
use thiserror::Error;

use crate::models::BenzoType;

/// Minimum similarity for a "did you mean" suggestion.
const MIN_SUGGESTION_SCORE: f64 = 0.75;

/// Resolver errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolverError {
    #[error("Unknown medication '{input}'{}", suggestion_hint(.suggestion))]
    UnknownMedication {
        input: String,
        suggestion: Option<String>,
    },
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(", did you mean '{}'?", s))
        .unwrap_or_default()
}

pub type ResolverResult<T> = Result<T, ResolverError>;

/// Maps user- or storage-supplied names to a supported medication.
pub struct MedicationResolver {
    /// Lowercase name → medication
    names: HashMap<String, BenzoType>,
}

impl Default for MedicationResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MedicationResolver {
    /// Create a resolver knowing every supported medication.
    pub fn new() -> Self {
        let mut names = HashMap::new();
        for medication in BenzoType::ALL {
            let profile = medication.profile();
            names.insert(medication.key().to_string(), medication);
            names.insert(profile.name.to_lowercase(), medication);
            names.insert(profile.brand_name.to_lowercase(), medication);
            names.insert(medication.display_label().to_lowercase(), medication);
        }
        Self { names }
    }

    /// Add an extra name, e.g. a regional brand.
    pub fn add_alias(&mut self, alias: &str, medication: BenzoType) {
        self.names.insert(alias.trim().to_lowercase(), medication);
    }

    /// Resolve a name to a medication.
    pub fn resolve(&self, input: &str) -> ResolverResult<BenzoType> {
        let lower = input.trim().to_lowercase();
        if let Some(medication) = self.names.get(&lower) {
            return Ok(*medication);
        }

        let suggestion = self.suggest(&lower);
        tracing::debug!(input, ?suggestion, "Unknown medication");
        Err(ResolverError::UnknownMedication {
            input: input.to_string(),
            suggestion,
        })
    }

    /// Closest known name, if any is similar enough.
    pub fn suggest(&self, input: &str) -> Option<String> {
        let lower = input.trim().to_lowercase();
        self.names
            .keys()
            .map(|name| (name, fuzzy_match(&lower, name)))
            .filter(|(_, score)| *score >= MIN_SUGGESTION_SCORE)
            // Ties go to the alphabetically first name
            .max_by(|a, b| {
                a.1.partial_cmp(&b.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.0.cmp(a.0))
            })
            .map(|(name, _)| name.clone())
    }
}

/// Compute fuzzy string similarity using combined metrics.
fn fuzzy_match(a: &str, b: &str) -> f64 {
    // Jaro-Winkler favors shared prefixes, Levenshtein overall similarity
    let jw = jaro_winkler(a, b);
    let lev = normalized_levenshtein(a, b);
    jw * 0.6 + lev * 0.4
}
