use serde::Deserialize;
use time::OffsetDateTime;

use crate::body::services::Gender;

#[derive(Debug, Deserialize)]
pub struct SaveBodyRequest {
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub age: u32,
    pub gender: Gender,
    pub body_fat_pct: f64,
    pub muscle_mass_kg: f64,
    #[serde(default)]
    pub basal_metabolic_rate: Option<f64>,
    #[serde(default)]
    pub activity_level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    /// YYYY-MM-DD, inclusive.
    pub from: String,
    /// YYYY-MM-DD, inclusive.
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct DailyCaloriesRequest {
    /// YYYY-MM-DD
    pub date: String,
    pub consumed: f64,
    pub burned: f64,
}
