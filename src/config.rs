use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SharedStoreConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub shared_store: SharedStoreConfig,
    pub barcode_api_url: String,
    pub standard_foods_path: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let shared_store = SharedStoreConfig {
            base_url: std::env::var("SHARED_STORE_URL")?,
            api_key: std::env::var("SHARED_STORE_API_KEY")?,
        };
        let barcode_api_url = std::env::var("BARCODE_API_URL")
            .unwrap_or_else(|_| "https://world.openfoodfacts.org".into());
        let standard_foods_path = std::env::var("STANDARD_FOODS_PATH")
            .unwrap_or_else(|_| "assets/standard_foods.json".into());
        Ok(Self {
            database_url,
            shared_store,
            barcode_api_url,
            standard_foods_path,
        })
    }
}
