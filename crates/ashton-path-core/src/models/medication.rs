//! Medication reference data and patient inputs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported benzodiazepines.
///
/// Serialized as the lowercase key. The `alias` entries accept the display
/// labels written by earlier versions of the app.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BenzoType {
    #[serde(alias = "Alprazolam (Xanax)")]
    Alprazolam,
    #[serde(alias = "Clonazepam (Klonopin)")]
    Clonazepam,
    #[serde(alias = "Diazepam (Valium)")]
    Diazepam,
    #[serde(alias = "Lorazepam (Ativan)")]
    Lorazepam,
    #[serde(alias = "Temazepam (Restoril)")]
    Temazepam,
    #[serde(alias = "Chlordiazepoxide (Librium)")]
    Chlordiazepoxide,
}

/// Immutable reference data for one medication.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MedicationProfile {
    /// Generic name
    pub name: &'static str,
    /// Best-known brand name
    pub brand_name: &'static str,
    /// Elimination half-life range, for display
    pub half_life_range: &'static str,
    /// Milligrams of diazepam equal to 1mg of this drug
    pub diazepam_equivalence_factor: f64,
}

// Approximate equivalents to 10mg diazepam per the Ashton Manual.
const ALPRAZOLAM: MedicationProfile = MedicationProfile {
    name: "Alprazolam",
    brand_name: "Xanax",
    half_life_range: "6-12 hrs",
    diazepam_equivalence_factor: 20.0,
};

const CLONAZEPAM: MedicationProfile = MedicationProfile {
    name: "Clonazepam",
    brand_name: "Klonopin",
    half_life_range: "18-50 hrs",
    diazepam_equivalence_factor: 20.0,
};

const DIAZEPAM: MedicationProfile = MedicationProfile {
    name: "Diazepam",
    brand_name: "Valium",
    half_life_range: "20-100 hrs",
    diazepam_equivalence_factor: 1.0,
};

const LORAZEPAM: MedicationProfile = MedicationProfile {
    name: "Lorazepam",
    brand_name: "Ativan",
    half_life_range: "10-20 hrs",
    diazepam_equivalence_factor: 10.0,
};

const TEMAZEPAM: MedicationProfile = MedicationProfile {
    name: "Temazepam",
    brand_name: "Restoril",
    half_life_range: "8-22 hrs",
    diazepam_equivalence_factor: 0.5,
};

const CHLORDIAZEPOXIDE: MedicationProfile = MedicationProfile {
    name: "Chlordiazepoxide",
    brand_name: "Librium",
    half_life_range: "5-30 hrs",
    diazepam_equivalence_factor: 0.4,
};

impl BenzoType {
    /// Every supported medication, in display order.
    pub const ALL: [BenzoType; 6] = [
        BenzoType::Alprazolam,
        BenzoType::Clonazepam,
        BenzoType::Diazepam,
        BenzoType::Lorazepam,
        BenzoType::Temazepam,
        BenzoType::Chlordiazepoxide,
    ];

    /// The drug all doses are converted to.
    pub const REFERENCE: BenzoType = BenzoType::Diazepam;

    /// Reference data for this medication.
    pub fn profile(&self) -> &'static MedicationProfile {
        match self {
            BenzoType::Alprazolam => &ALPRAZOLAM,
            BenzoType::Clonazepam => &CLONAZEPAM,
            BenzoType::Diazepam => &DIAZEPAM,
            BenzoType::Lorazepam => &LORAZEPAM,
            BenzoType::Temazepam => &TEMAZEPAM,
            BenzoType::Chlordiazepoxide => &CHLORDIAZEPOXIDE,
        }
    }

    /// Whether this is the reference drug (no crossover needed).
    pub fn is_reference(&self) -> bool {
        *self == Self::REFERENCE
    }

    /// Convert a daily dose of this drug into diazepam milligrams.
    pub fn to_reference_equivalent(&self, dose_mg: f64) -> f64 {
        dose_mg * self.profile().diazepam_equivalence_factor
    }

    /// Stable identifier used in storage and over FFI.
    pub fn key(&self) -> &'static str {
        match self {
            BenzoType::Alprazolam => "alprazolam",
            BenzoType::Clonazepam => "clonazepam",
            BenzoType::Diazepam => "diazepam",
            BenzoType::Lorazepam => "lorazepam",
            BenzoType::Temazepam => "temazepam",
            BenzoType::Chlordiazepoxide => "chlordiazepoxide",
        }
    }

    /// Human-readable label, e.g. "Alprazolam (Xanax)".
    pub fn display_label(&self) -> String {
        let profile = self.profile();
        format!("{} ({})", profile.name, profile.brand_name)
    }
}

impl fmt::Display for BenzoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().name)
    }
}

/// Requested taper pace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaperPace {
    /// ~5% cuts every two weeks
    #[serde(alias = "Slow (5% cuts)")]
    Slow,
    /// ~10% cuts
    #[serde(alias = "Moderate (10% cuts)")]
    Moderate,
    /// Fixed drops from the Ashton Manual table
    #[serde(alias = "Ashton Manual Standard")]
    AshtonStandard,
    /// Linear reduction to a target end date
    #[serde(alias = "Custom (Target Date)")]
    Custom,
}

impl TaperPace {
    pub const ALL: [TaperPace; 4] = [
        TaperPace::Slow,
        TaperPace::Moderate,
        TaperPace::AshtonStandard,
        TaperPace::Custom,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            TaperPace::Slow => "slow",
            TaperPace::Moderate => "moderate",
            TaperPace::AshtonStandard => "ashton-standard",
            TaperPace::Custom => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaperPace::Slow => "Slow (5% cuts)",
            TaperPace::Moderate => "Moderate (10% cuts)",
            TaperPace::AshtonStandard => "Ashton Manual Standard",
            TaperPace::Custom => "Custom (Target Date)",
        }
    }
}

impl FromStr for TaperPace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TaperPace::ALL
            .into_iter()
            .find(|pace| {
                pace.key().eq_ignore_ascii_case(wanted) || pace.label().eq_ignore_ascii_case(wanted)
            })
            .or_else(|| match wanted.to_lowercase().as_str() {
                "ashton" | "ashton_standard" | "ashtonstandard" => Some(TaperPace::AshtonStandard),
                _ => None,
            })
            .ok_or_else(|| format!("unknown taper pace '{}'", s))
    }
}

impl fmt::Display for TaperPace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Self-reported metabolism category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metabolism {
    Slow,
    #[default]
    Average,
    Fast,
}

impl FromStr for Metabolism {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "slow" => Ok(Metabolism::Slow),
            "average" | "normal" => Ok(Metabolism::Average),
            "fast" => Ok(Metabolism::Fast),
            other => Err(format!("unknown metabolism '{}'", other)),
        }
    }
}

/// Patient inputs that shape step length.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BiologicalFactors {
    /// Age in years
    #[serde(default)]
    pub age: Option<u32>,
    /// Metabolism category
    #[serde(default)]
    pub metabolism: Metabolism,
    /// Years of benzodiazepine use. Recorded only; does not affect dosing.
    #[serde(default)]
    pub years_using: Option<f64>,
}

impl BiologicalFactors {
    /// Whether age or metabolism call for the longer step duration.
    pub fn needs_extended_steps(&self, elderly_age: u32) -> bool {
        self.age.is_some_and(|age| age > elderly_age) || self.metabolism == Metabolism::Slow
    }
}
