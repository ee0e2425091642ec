//! Daily symptom journal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest value on every 0-10 symptom scale.
pub const MAX_SCORE: u8 = 10;

/// Sleep quality assumed for entries that left it unset (0).
const UNSET_SLEEP_QUALITY: u8 = 5;

/// Symptom scores above this call for attention.
const SEVERE_SYMPTOM: u8 = 8;

/// Blood pressure outside these bounds calls for attention (mmHg).
const SYSTOLIC_RANGE: (u32, u32) = (90, 160);
const DIASTOLIC_RANGE: (u32, u32) = (60, 100);

const POOR_SLEEP_QUALITY: u8 = 3;
const SHORT_SLEEP_HOURS: f64 = 4.0;

/// Number of recent entries considered when assessing stability.
const STABILITY_WINDOW: usize = 5;

/// Journal validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JournalError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("{field} must be between 0 and 10, got {value}")]
    ScoreOutOfRange { field: &'static str, value: u8 },

    #[error("Sleep hours must be between 0 and 24, got {0}")]
    SleepHoursOutOfRange(f64),
}

pub type JournalResult<T> = Result<T, JournalError>;

/// One day's symptom log, using the symptom scales from the Ashton Manual.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DailyLogEntry {
    /// Calendar day (YYYY-MM-DD), unique per journal
    pub date: String,
    pub stress: u8,
    pub tremors: u8,
    pub dizziness: u8,
    #[serde(default)]
    pub muscle_pain: Option<u8>,
    #[serde(default)]
    pub nausea: Option<u8>,
    #[serde(default)]
    pub irritability: Option<u8>,
    /// Psychological
    #[serde(default)]
    pub depersonalization: Option<u8>,
    /// Light, sound, taste
    #[serde(default)]
    pub sensory_sensitivity: Option<u8>,
    #[serde(default)]
    pub tinnitus: Option<u8>,
    pub sleep_quality: u8,
    pub sleep_hours: f64,
    /// Blood pressure, free text as entered
    #[serde(default)]
    pub systolic: String,
    #[serde(default)]
    pub diastolic: String,
    /// Other medications taken
    #[serde(default)]
    pub medications: String,
    #[serde(default)]
    pub activities: Option<Vec<String>>,
    #[serde(default)]
    pub notes: String,
}

impl DailyLogEntry {
    /// Create an empty entry for a day.
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Default::default()
        }
    }

    /// Check the date format and every score range.
    pub fn validate(&self) -> JournalResult<()> {
        chrono::NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| JournalError::InvalidDate(self.date.clone()))?;

        let scores = [
            ("stress", Some(self.stress)),
            ("tremors", Some(self.tremors)),
            ("dizziness", Some(self.dizziness)),
            ("sleepQuality", Some(self.sleep_quality)),
            ("musclePain", self.muscle_pain),
            ("nausea", self.nausea),
            ("irritability", self.irritability),
            ("depersonalization", self.depersonalization),
            ("sensorySensitivity", self.sensory_sensitivity),
            ("tinnitus", self.tinnitus),
        ];
        for (field, value) in scores {
            if let Some(value) = value.filter(|v| *v > MAX_SCORE) {
                return Err(JournalError::ScoreOutOfRange { field, value });
            }
        }

        if !(0.0..=24.0).contains(&self.sleep_hours) {
            return Err(JournalError::SleepHoursOutOfRange(self.sleep_hours));
        }
        Ok(())
    }

    /// Daily distress score: mean of stress, tremors, dizziness and poor sleep.
    ///
    /// An unset (0) sleep quality counts as a neutral 5.
    pub fn distress_score(&self) -> f64 {
        let sleep_quality = if self.sleep_quality == 0 {
            UNSET_SLEEP_QUALITY
        } else {
            self.sleep_quality
        };
        let sleep_badness = MAX_SCORE.saturating_sub(sleep_quality);
        let total = self.stress as f64 + self.tremors as f64 + self.dizziness as f64 + sleep_badness as f64;
        total / 4.0
    }

    /// Whether this entry shows warning signs worth raising with a doctor:
    /// a symptom above 8, blood pressure above 160/100 or below 90/60, or
    /// very poor or very short sleep.
    pub fn needs_attention(&self) -> bool {
        let symptoms = [
            Some(self.stress),
            Some(self.tremors),
            Some(self.dizziness),
            self.muscle_pain,
            self.nausea,
            self.irritability,
            self.depersonalization,
            self.sensory_sensitivity,
            self.tinnitus,
        ];
        let symptoms_high = symptoms.into_iter().flatten().any(|score| score > SEVERE_SYMPTOM);

        let out_of_range = |reading: &str, (low, high): (u32, u32)| {
            parse_pressure(reading).is_some_and(|value| value > high || value < low)
        };
        let pressure_abnormal =
            out_of_range(&self.systolic, SYSTOLIC_RANGE) || out_of_range(&self.diastolic, DIASTOLIC_RANGE);

        let sleep_bad = self.sleep_quality < POOR_SLEEP_QUALITY || self.sleep_hours < SHORT_SLEEP_HOURS;

        symptoms_high || pressure_abnormal || sleep_bad
    }
}

/// Leading integer of a free-text pressure reading; empty or 0 means not taken.
fn parse_pressure(reading: &str) -> Option<u32> {
    let digits: String = reading.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok().filter(|value| *value > 0)
}

/// How settled the patient has been over their most recent entries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StabilityStatus {
    Unknown,
    Stable,
    Moderate,
    Unstable,
}

impl StabilityStatus {
    /// Assess stability from the five most recent journal entries.
    pub fn assess(logs: &[DailyLogEntry]) -> Self {
        if logs.is_empty() {
            return StabilityStatus::Unknown;
        }

        let mut recent: Vec<&DailyLogEntry> = logs.iter().collect();
        recent.sort_by(|a, b| b.date.cmp(&a.date));
        recent.truncate(STABILITY_WINDOW);

        let average =
            recent.iter().map(|entry| entry.distress_score()).sum::<f64>() / recent.len() as f64;

        if average > 4.5 {
            StabilityStatus::Unstable
        } else if average > 2.5 {
            StabilityStatus::Moderate
        } else {
            StabilityStatus::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StabilityStatus::Unknown => "unknown",
            StabilityStatus::Stable => "stable",
            StabilityStatus::Moderate => "moderate",
            StabilityStatus::Unstable => "unstable",
        }
    }
}
