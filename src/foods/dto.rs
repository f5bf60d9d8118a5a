use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::foods::repo::MealType;
use crate::nutrition::NutritionInfo;

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub name: String,
    pub nutrition: NutritionInfo,
    pub amount_grams: f64,
    pub meal_type: MealType,
    #[serde(with = "time::serde::rfc3339")]
    pub eaten_at: OffsetDateTime,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchCreateRequest {
    pub entries: Vec<CreateRecordRequest>,
}

/// Log a product that came out of barcode resolution or name search.
#[derive(Debug, Deserialize)]
pub struct CreateFromProductRequest {
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub nutrition: NutritionInfo,
    pub amount_grams: f64,
    pub meal_type: MealType,
    #[serde(with = "time::serde::rfc3339")]
    pub eaten_at: OffsetDateTime,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    /// YYYY-MM-DD
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct DayTotalsResponse {
    pub date: String,
    pub record_count: usize,
    pub total: NutritionInfo,
}
