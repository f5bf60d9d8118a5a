use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::debug;

use crate::nutrition::NutritionInfo;

#[derive(Debug, thiserror::Error)]
pub enum SharedStoreError {
    #[error("action already recorded for this user")]
    AlreadyActioned,
    #[error("anonymous authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("shared store network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("product not found")]
    ProductNotFound,
}

/// A crowd-sourced product document as stored in `shared_products`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedProduct {
    pub id: String,
    pub barcode: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub nutrition: NutritionInfo,
    pub category: Option<String>,
    pub package_size: Option<f64>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub contributor_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub verification_count: u32,
    pub report_count: u32,
    pub is_verified: bool,
}

impl SharedProduct {
    pub fn trust_score(&self) -> f64 {
        trust_score(self.verification_count, self.report_count, self.is_verified)
    }
}

/// Bounded confidence heuristic over the community counters.
/// Pure, recomputed on every read, always within [0, 1].
pub fn trust_score(verification_count: u32, report_count: u32, is_verified: bool) -> f64 {
    let score = 0.5 + (f64::from(verification_count) * 0.1).min(0.4)
        - (f64::from(report_count) * 0.2).min(0.3)
        + if is_verified { 0.2 } else { 0.0 };
    score.clamp(0.0, 1.0)
}

pub fn trust_label(score: f64) -> &'static str {
    if score >= 0.8 {
        "highly trusted community data"
    } else if score >= 0.5 {
        "community verified data"
    } else {
        "unverified community data"
    }
}

/// Payload for a product the client contributes to the store.
#[derive(Debug, Clone, Serialize)]
pub struct NewSharedProduct {
    pub barcode: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub nutrition: NutritionInfo,
    pub category: Option<String>,
    pub package_size: Option<f64>,
    pub image_url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductAction {
    Verify,
    Report,
}

#[async_trait]
pub trait SharedProductStore: Send + Sync {
    /// Exact barcode match, ordered by verification count descending, limit 1.
    async fn find_by_barcode(&self, barcode: &str)
        -> Result<Option<SharedProduct>, SharedStoreError>;

    /// Prefix-range name query, ordered by verification count descending.
    async fn search_by_name(
        &self,
        prefix: &str,
        limit: u32,
    ) -> Result<Vec<SharedProduct>, SharedStoreError>;

    /// Conditional write keyed by barcode: the document id is the barcode,
    /// so repeated contributions of the same product converge on one
    /// document server-side. Returns whether a document was created.
    async fn put_barcode_product(
        &self,
        product: &NewSharedProduct,
    ) -> Result<bool, SharedStoreError>;

    /// Manual entry with a fresh document id and zeroed counters.
    async fn submit_product(
        &self,
        product: &NewSharedProduct,
    ) -> Result<SharedProduct, SharedStoreError>;

    /// Append a verify/report action. The server keys the action log by
    /// (product, user, action) and bumps the counter atomically; a repeat
    /// from the same anonymous user comes back as `AlreadyActioned`.
    async fn record_action(
        &self,
        product_id: &str,
        action: ProductAction,
    ) -> Result<(), SharedStoreError>;
}

#[derive(Debug, Clone, Deserialize)]
struct AnonSession {
    token: String,
    uid: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedSession {
    token: String,
    uid: String,
    expires_at: OffsetDateTime,
}

/// HTTP client for the companion crowd-sourcing service.
pub struct HttpSharedStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    session: Mutex<Option<CachedSession>>,
}

impl HttpSharedStore {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            session: Mutex::new(None),
        }
    }

    /// Anonymous device session. Idempotent: a still-valid cached session
    /// is reused, otherwise a new one is requested.
    async fn session(&self) -> Result<CachedSession, SharedStoreError> {
        {
            let cached = self.session.lock().await;
            if let Some(ref s) = *cached {
                if s.expires_at > OffsetDateTime::now_utc() + time::Duration::seconds(60) {
                    return Ok(s.clone());
                }
            }
        }

        let url = format!("{}/v1/auth/anonymous", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SharedStoreError::AuthenticationFailed(format!(
                "{status} - {body}"
            )));
        }
        let anon: AnonSession = resp
            .json()
            .await
            .map_err(|e| SharedStoreError::AuthenticationFailed(e.to_string()))?;

        let session = CachedSession {
            token: anon.token,
            uid: anon.uid,
            expires_at: OffsetDateTime::now_utc() + time::Duration::seconds(anon.expires_in),
        };
        *self.session.lock().await = Some(session.clone());
        debug!(uid = %session.uid, "anonymous session established");
        Ok(session)
    }
}

#[async_trait]
impl SharedProductStore for HttpSharedStore {
    async fn find_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<SharedProduct>, SharedStoreError> {
        let session = self.session().await?;
        let url = format!("{}/v1/shared_products", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&session.token)
            .query(&[
                ("barcode", barcode),
                ("order", "verification_count.desc"),
                ("limit", "1"),
            ])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let products: Vec<SharedProduct> = resp.error_for_status()?.json().await?;
        Ok(products.into_iter().next())
    }

    async fn search_by_name(
        &self,
        prefix: &str,
        limit: u32,
    ) -> Result<Vec<SharedProduct>, SharedStoreError> {
        let session = self.session().await?;
        let url = format!("{}/v1/shared_products", self.base_url);
        // Prefix range: name >= prefix AND name < prefix + U+F8FF.
        let upper = format!("{prefix}\u{f8ff}");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&session.token)
            .query(&[
                ("name_gte", prefix),
                ("name_lt", upper.as_str()),
                ("order", "verification_count.desc"),
                ("limit", limit.to_string().as_str()),
            ])
            .send()
            .await?;
        let products: Vec<SharedProduct> = resp.error_for_status()?.json().await?;
        Ok(products)
    }

    async fn put_barcode_product(
        &self,
        product: &NewSharedProduct,
    ) -> Result<bool, SharedStoreError> {
        let session = self.session().await?;
        let barcode = product.barcode.as_deref().unwrap_or_default();
        let url = format!("{}/v1/shared_products/barcode/{barcode}", self.base_url);
        let resp = self
            .client
            .put(&url)
            .bearer_auth(&session.token)
            .json(product)
            .send()
            .await?;
        match resp.status() {
            StatusCode::CREATED => Ok(true),
            // Someone else contributed this barcode first.
            StatusCode::OK | StatusCode::CONFLICT => Ok(false),
            _ => {
                resp.error_for_status()?;
                Ok(false)
            }
        }
    }

    async fn submit_product(
        &self,
        product: &NewSharedProduct,
    ) -> Result<SharedProduct, SharedStoreError> {
        let session = self.session().await?;
        let url = format!("{}/v1/shared_products", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&session.token)
            .json(product)
            .send()
            .await?;
        let created: SharedProduct = resp.error_for_status()?.json().await?;
        Ok(created)
    }

    async fn record_action(
        &self,
        product_id: &str,
        action: ProductAction,
    ) -> Result<(), SharedStoreError> {
        let session = self.session().await?;
        let url = format!(
            "{}/v1/shared_products/{product_id}/actions",
            self.base_url
        );
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&session.token)
            .json(&serde_json::json!({ "action": action }))
            .send()
            .await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(SharedStoreError::ProductNotFound),
            StatusCode::CONFLICT => Err(SharedStoreError::AlreadyActioned),
            _ => {
                resp.error_for_status()?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_score_baseline_is_half() {
        assert_eq!(trust_score(0, 0, false), 0.5);
    }

    #[test]
    fn trust_score_caps_verification_bonus() {
        // 4 verifications reach the 0.4 cap; more do not help.
        assert_eq!(trust_score(4, 0, false), 0.9);
        assert_eq!(trust_score(100, 0, false), 0.9);
    }

    #[test]
    fn trust_score_caps_report_penalty() {
        assert!((trust_score(0, 1, false) - 0.3).abs() < 1e-12);
        assert!((trust_score(0, 50, false) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn trust_score_verified_bonus() {
        assert!((trust_score(0, 0, true) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn trust_score_is_bounded_for_any_counters() {
        for vc in [0u32, 1, 3, 7, 100, u32::MAX] {
            for rc in [0u32, 1, 2, 9, 1000, u32::MAX] {
                for verified in [false, true] {
                    let s = trust_score(vc, rc, verified);
                    assert!((0.0..=1.0).contains(&s), "score {s} out of range");
                }
            }
        }
    }

    #[test]
    fn trust_labels_follow_score_bands() {
        assert_eq!(trust_label(0.95), "highly trusted community data");
        assert_eq!(trust_label(0.5), "community verified data");
        assert_eq!(trust_label(0.2), "unverified community data");
    }
}
