use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::nutrition::NutritionInfo;
use crate::search::barcode_api::{ApiProduct, BarcodeApi, BarcodeApiError};
use crate::search::dataset::{LocalFood, LocalFoodDataset};
use crate::search::shared_store::{
    NewSharedProduct, ProductAction, SharedProduct, SharedProductStore, SharedStoreError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSource {
    Shared,
    OpenData,
}

/// Unified product shape handed back to the client after barcode resolution.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedProduct {
    pub source: ProductSource,
    pub barcode: String,
    pub name: String,
    pub brand: Option<String>,
    pub nutrition: NutritionInfo,
    pub image_url: Option<String>,
    pub description: String,
    pub trust_score: Option<f64>,
}

impl ResolvedProduct {
    fn from_shared(product: SharedProduct) -> Self {
        let score = product.trust_score();
        Self {
            source: ProductSource::Shared,
            barcode: product.barcode.clone().unwrap_or_default(),
            name: product.name,
            brand: product.brand,
            nutrition: product.nutrition,
            image_url: product.image_url,
            description: format!("{} ({:.0}%)", crate::search::shared_store::trust_label(score), score * 100.0),
            trust_score: Some(score),
        }
    }

    fn from_api(product: ApiProduct) -> Self {
        Self {
            source: ProductSource::OpenData,
            barcode: product.barcode,
            name: product.name,
            brand: product.brand,
            nutrition: product.nutrition,
            image_url: product.image_url,
            description: "open data catalog".to_string(),
            trust_score: None,
        }
    }
}

/// One hit of a name search, from either source.
#[derive(Debug, Clone)]
pub enum FoodHit {
    Local(LocalFood),
    Shared(SharedProduct),
}

impl FoodHit {
    /// Bundled items are authoritative; shared items carry their computed score.
    pub fn trust_score(&self) -> f64 {
        match self {
            FoodHit::Local(_) => 1.0,
            FoodHit::Shared(p) => p.trust_score(),
        }
    }
}

/// Orchestrates the three food-data sources in priority order.
pub struct IntegratedSearch {
    dataset: Arc<LocalFoodDataset>,
    store: Arc<dyn SharedProductStore>,
    api: Arc<dyn BarcodeApi>,
}

impl IntegratedSearch {
    pub fn new(
        dataset: Arc<LocalFoodDataset>,
        store: Arc<dyn SharedProductStore>,
        api: Arc<dyn BarcodeApi>,
    ) -> Self {
        Self {
            dataset,
            store,
            api,
        }
    }

    /// Resolve a scanned barcode: crowd-sourced store first, open-data
    /// catalog second. A catalog hit is contributed back to the store
    /// (barcode-keyed, so repeat resolutions stay idempotent). `Ok(None)`
    /// sends the caller to manual entry.
    pub async fn search_product_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<ResolvedProduct>, BarcodeApiError> {
        match self.store.find_by_barcode(barcode).await {
            Ok(Some(product)) => {
                return Ok(Some(ResolvedProduct::from_shared(product)));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, barcode, "shared store lookup failed; falling back to open data");
            }
        }

        let api_product = match self.api.fetch_product(barcode).await {
            Ok(Some(p)) => p,
            Ok(None) => return Ok(None),
            Err(BarcodeApiError::Network(e)) => {
                warn!(error = %e, barcode, "open data lookup failed");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        match self
            .store
            .put_barcode_product(&new_product_from_api(&api_product))
            .await
        {
            Ok(true) => info!(barcode, "contributed open data product to shared store"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, barcode, "auto-contribution failed"),
        }

        Ok(Some(ResolvedProduct::from_api(api_product)))
    }

    /// Name search over the bundled dataset and the crowd-sourced store,
    /// sorted by trust score descending. A store failure degrades to
    /// dataset-only results.
    pub async fn search_food_by_name(&self, name: &str) -> Vec<FoodHit> {
        let mut hits: Vec<FoodHit> = self
            .dataset
            .search(name)
            .into_iter()
            .cloned()
            .map(FoodHit::Local)
            .collect();

        match self.store.search_by_name(name, 20).await {
            Ok(products) => hits.extend(products.into_iter().map(FoodHit::Shared)),
            Err(e) => warn!(error = %e, name, "shared store name search failed"),
        }

        hits.sort_by(|a, b| {
            b.trust_score()
                .partial_cmp(&a.trust_score())
                .unwrap_or(Ordering::Equal)
        });
        hits
    }

    /// Submit a manually entered product to the crowd-sourced store.
    pub async fn save_manual_entry(
        &self,
        product: NewSharedProduct,
    ) -> Result<SharedProduct, SharedStoreError> {
        self.store.submit_product(&product).await
    }

    pub async fn verify_product(&self, product_id: &str) -> Result<(), SharedStoreError> {
        self.store.record_action(product_id, ProductAction::Verify).await
    }

    pub async fn report_product(&self, product_id: &str) -> Result<(), SharedStoreError> {
        self.store.record_action(product_id, ProductAction::Report).await
    }
}

fn new_product_from_api(product: &ApiProduct) -> NewSharedProduct {
    NewSharedProduct {
        barcode: Some(product.barcode.clone()),
        name: product.name.clone(),
        brand: product.brand.clone(),
        nutrition: product.nutrition,
        category: None,
        package_size: parse_package_grams(product.package_size.as_deref()),
        image_url: product.image_url.clone(),
        description: None,
    }
}

/// Best-effort "250 g" / "250g" → grams; anything else is dropped.
fn parse_package_grams(quantity: Option<&str>) -> Option<f64> {
    let q = quantity?.trim().to_lowercase();
    let q = q.strip_suffix("g").map(str::trim)?.to_string();
    q.parse().ok()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use super::*;

    struct FakeStore {
        products: Mutex<Vec<SharedProduct>>,
        puts: AtomicUsize,
        fail: bool,
    }

    impl FakeStore {
        fn empty() -> Self {
            Self {
                products: Mutex::new(Vec::new()),
                puts: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn with(products: Vec<SharedProduct>) -> Self {
            Self {
                products: Mutex::new(products),
                puts: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::empty()
            }
        }
    }

    #[async_trait]
    impl SharedProductStore for FakeStore {
        async fn find_by_barcode(
            &self,
            barcode: &str,
        ) -> Result<Option<SharedProduct>, SharedStoreError> {
            if self.fail {
                return Err(SharedStoreError::AuthenticationFailed("store down".into()));
            }
            Ok(self
                .products
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.barcode.as_deref() == Some(barcode))
                .cloned())
        }

        async fn search_by_name(
            &self,
            prefix: &str,
            _limit: u32,
        ) -> Result<Vec<SharedProduct>, SharedStoreError> {
            if self.fail {
                return Err(SharedStoreError::AuthenticationFailed("store down".into()));
            }
            Ok(self
                .products
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.name.starts_with(prefix))
                .cloned()
                .collect())
        }

        async fn put_barcode_product(
            &self,
            product: &NewSharedProduct,
        ) -> Result<bool, SharedStoreError> {
            self.puts.fetch_add(1, AtomicOrdering::SeqCst);
            let mut products = self.products.lock().unwrap();
            if products
                .iter()
                .any(|p| p.barcode == product.barcode)
            {
                return Ok(false);
            }
            products.push(shared(
                product.barcode.clone().unwrap_or_default().as_str(),
                &product.name,
                0,
                0,
                false,
            ));
            Ok(true)
        }

        async fn submit_product(
            &self,
            product: &NewSharedProduct,
        ) -> Result<SharedProduct, SharedStoreError> {
            let created = shared("", &product.name, 0, 0, false);
            self.products.lock().unwrap().push(created.clone());
            Ok(created)
        }

        async fn record_action(
            &self,
            _product_id: &str,
            _action: ProductAction,
        ) -> Result<(), SharedStoreError> {
            Err(SharedStoreError::AlreadyActioned)
        }
    }

    struct FakeApi {
        product: Option<ApiProduct>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BarcodeApi for FakeApi {
        async fn fetch_product(
            &self,
            _barcode: &str,
        ) -> Result<Option<ApiProduct>, BarcodeApiError> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(self.product.clone())
        }
    }

    fn shared(barcode: &str, name: &str, vc: u32, rc: u32, verified: bool) -> SharedProduct {
        SharedProduct {
            id: format!("doc-{name}"),
            barcode: if barcode.is_empty() {
                None
            } else {
                Some(barcode.to_string())
            },
            name: name.to_string(),
            brand: None,
            nutrition: NutritionInfo::EMPTY,
            category: None,
            package_size: None,
            image_url: None,
            description: None,
            contributor_id: "anon".to_string(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
            verification_count: vc,
            report_count: rc,
            is_verified: verified,
        }
    }

    fn api_product(barcode: &str) -> ApiProduct {
        ApiProduct {
            barcode: barcode.to_string(),
            name: "Choco Bar".to_string(),
            brand: Some("ChocoCo".to_string()),
            package_size: Some("50 g".to_string()),
            image_url: None,
            nutrition: NutritionInfo {
                calories: 546.0,
                serving_size: 100.0,
                ..NutritionInfo::EMPTY
            },
        }
    }

    fn service(store: Arc<FakeStore>, api: Arc<FakeApi>) -> IntegratedSearch {
        IntegratedSearch::new(Arc::new(LocalFoodDataset::empty()), store, api)
    }

    #[tokio::test]
    async fn store_hit_short_circuits_the_api() {
        let store = Arc::new(FakeStore::with(vec![shared(
            "4901777018888",
            "Green Tea",
            3,
            0,
            true,
        )]));
        let api = Arc::new(FakeApi {
            product: Some(api_product("4901777018888")),
            calls: AtomicUsize::new(0),
        });
        let svc = service(store.clone(), api.clone());

        let hit = svc
            .search_product_by_barcode("4901777018888")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.source, ProductSource::Shared);
        assert_eq!(hit.name, "Green Tea");
        assert!(hit.description.contains("highly trusted"));
        assert_eq!(api.calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn api_hit_is_contributed_back_at_most_once() {
        let store = Arc::new(FakeStore::empty());
        let api = Arc::new(FakeApi {
            product: Some(api_product("4901777018888")),
            calls: AtomicUsize::new(0),
        });
        let svc = service(store.clone(), api.clone());

        let first = svc
            .search_product_by_barcode("4901777018888")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.source, ProductSource::OpenData);

        // The contribution landed, so the second resolution is served by
        // the store and never reaches the catalog again.
        let second = svc
            .search_product_by_barcode("4901777018888")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.source, ProductSource::Shared);
        assert_eq!(store.puts.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(api.calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn both_sources_missing_resolves_to_none() {
        let store = Arc::new(FakeStore::empty());
        let api = Arc::new(FakeApi {
            product: None,
            calls: AtomicUsize::new(0),
        });
        let svc = service(store, api);
        assert!(svc
            .search_product_by_barcode("12345678")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn store_failure_degrades_to_open_data() {
        let store = Arc::new(FakeStore::failing());
        let api = Arc::new(FakeApi {
            product: Some(api_product("12345678")),
            calls: AtomicUsize::new(0),
        });
        let svc = service(store, api);
        let hit = svc
            .search_product_by_barcode("12345678")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.source, ProductSource::OpenData);
    }

    #[tokio::test]
    async fn name_search_merges_and_ranks_by_trust() {
        let dataset_raw = r#"[
            {"name": "Rice", "nutrition": {"calories": 168.0, "protein": 2.5, "fat": 0.3, "carbohydrates": 37.1, "sugar": 0.1, "serving_size": 100.0}}
        ]"#;
        let foods: Vec<LocalFood> = serde_json::from_str(dataset_raw).unwrap();
        let dataset = Arc::new(LocalFoodDataset::from_foods(foods));
        let store = Arc::new(FakeStore::with(vec![
            shared("", "Rice Crackers", 0, 2, false),
            shared("", "Rice Bowl", 4, 0, true),
        ]));
        let api = Arc::new(FakeApi {
            product: None,
            calls: AtomicUsize::new(0),
        });
        let svc = IntegratedSearch::new(dataset, store, api);

        let hits = svc.search_food_by_name("Rice").await;
        assert_eq!(hits.len(), 3);
        // Bundled item first (1.0), then verified shared, then reported.
        assert!(matches!(hits[0], FoodHit::Local(_)));
        assert!(matches!(&hits[1], FoodHit::Shared(p) if p.name == "Rice Bowl"));
        assert!(matches!(&hits[2], FoodHit::Shared(p) if p.name == "Rice Crackers"));
    }

    #[tokio::test]
    async fn name_search_survives_store_failure() {
        let svc = service(Arc::new(FakeStore::failing()), Arc::new(FakeApi {
            product: None,
            calls: AtomicUsize::new(0),
        }));
        assert!(svc.search_food_by_name("rice").await.is_empty());
    }

    #[test]
    fn package_size_parses_gram_quantities() {
        assert_eq!(parse_package_grams(Some("250 g")), Some(250.0));
        assert_eq!(parse_package_grams(Some("250g")), Some(250.0));
        assert_eq!(parse_package_grams(Some("1 L")), None);
        assert_eq!(parse_package_grams(None), None);
    }
}
