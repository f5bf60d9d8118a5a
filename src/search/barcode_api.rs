use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::nutrition::NutritionInfo;

#[derive(Debug, thiserror::Error)]
pub enum BarcodeApiError {
    #[error("invalid barcode or url")]
    InvalidUrl,
    #[error("barcode api network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("barcode api decoding error: {0}")]
    Decoding(#[from] serde_json::Error),
    #[error("product not found")]
    ProductNotFound,
}

/// A product as mapped from the open-data API, always on a 100 g basis.
#[derive(Debug, Clone)]
pub struct ApiProduct {
    pub barcode: String,
    pub name: String,
    pub brand: Option<String>,
    pub package_size: Option<String>,
    pub image_url: Option<String>,
    pub nutrition: NutritionInfo,
}

#[async_trait]
pub trait BarcodeApi: Send + Sync {
    /// `Ok(None)` means the catalog has no such product; only malformed
    /// responses surface as errors.
    async fn fetch_product(&self, barcode: &str) -> Result<Option<ApiProduct>, BarcodeApiError>;
}

pub(crate) fn is_valid_barcode(barcode: &str) -> bool {
    lazy_static! {
        static ref BARCODE_RE: Regex = Regex::new(r"^[0-9]{8,14}$").unwrap();
    }
    BARCODE_RE.is_match(barcode)
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: i64,
    #[serde(default)]
    product: Option<ApiProductBody>,
}

#[derive(Debug, Deserialize)]
struct ApiProductBody {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    brands: Option<String>,
    #[serde(default)]
    quantity: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    nutriments: Value,
}

/// Map the raw API body to an [`ApiProduct`].
///
/// `status != 1` and nameless products are "not found", not errors;
/// malformed JSON is a decoding error. Nutriment values may arrive as
/// numbers or numeric strings, sugar falls back to `carbohydrates * 0.8`
/// when absent, and sodium is converted from grams to milligrams.
fn parse_api_response(barcode: &str, body: &str) -> Result<Option<ApiProduct>, BarcodeApiError> {
    let resp: ApiResponse = serde_json::from_str(body)?;
    if resp.status != 1 {
        return Ok(None);
    }
    let Some(product) = resp.product else {
        return Ok(None);
    };
    let name = match product.product_name {
        Some(n) if !n.trim().is_empty() => n,
        _ => return Ok(None),
    };

    let nutriments = &product.nutriments;
    let num = |key: &str| -> Option<f64> {
        nutriments.get(key).and_then(|v| {
            v.as_f64()
                .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        })
    };

    let carbohydrates = num("carbohydrates_100g").unwrap_or(0.0);
    let sugar = num("sugars_100g").unwrap_or(carbohydrates * 0.8);

    let nutrition = NutritionInfo {
        calories: num("energy-kcal_100g").unwrap_or(0.0),
        protein: num("proteins_100g").unwrap_or(0.0),
        fat: num("fat_100g").unwrap_or(0.0),
        carbohydrates,
        sugar,
        serving_size: 100.0,
        fiber: num("fiber_100g"),
        sodium: num("sodium_100g").map(|g| g * 1000.0),
        calcium: None,
        iron: None,
    };

    Ok(Some(ApiProduct {
        barcode: barcode.to_string(),
        name,
        brand: product.brands.filter(|b| !b.trim().is_empty()),
        package_size: product.quantity.filter(|q| !q.trim().is_empty()),
        image_url: product.image_url,
        nutrition,
    }))
}

/// Client for the public open-data nutrition catalog.
pub struct OpenDataFoodApi {
    client: reqwest::Client,
    base_url: String,
}

impl OpenDataFoodApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BarcodeApi for OpenDataFoodApi {
    async fn fetch_product(&self, barcode: &str) -> Result<Option<ApiProduct>, BarcodeApiError> {
        if !is_valid_barcode(barcode) {
            return Err(BarcodeApiError::InvalidUrl);
        }
        let url = format!("{}/api/v0/product/{barcode}.json", self.base_url);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let body = resp.text().await?;
        parse_api_response(barcode, &body)
    }
}
