use serde::{Deserialize, Serialize};

use crate::nutrition::NutritionInfo;
use crate::search::services::FoodHit;

#[derive(Debug, Deserialize)]
pub struct NameSearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct FoodHitItem {
    pub source: &'static str,
    /// Shared-store document id; bundled items have none.
    pub id: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub nutrition: NutritionInfo,
    pub trust_score: f64,
}

impl From<FoodHit> for FoodHitItem {
    fn from(hit: FoodHit) -> Self {
        let trust_score = hit.trust_score();
        match hit {
            FoodHit::Local(f) => FoodHitItem {
                source: "local",
                id: None,
                name: f.name,
                brand: f.brand,
                category: f.category,
                barcode: None,
                nutrition: f.nutrition,
                trust_score,
            },
            FoodHit::Shared(p) => FoodHitItem {
                source: "shared",
                id: Some(p.id),
                name: p.name,
                brand: p.brand,
                category: p.category,
                barcode: p.barcode,
                nutrition: p.nutrition,
                trust_score,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ManualEntryRequest {
    pub name: String,
    pub nutrition: NutritionInfo,
    pub barcode: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub package_size: Option<f64>,
    pub image_url: Option<String>,
    pub description: Option<String>,
}
