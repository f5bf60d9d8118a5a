use serde::Deserialize;
use tracing::{info, warn};

use crate::nutrition::NutritionInfo;

const MAX_RESULTS: usize = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct LocalFood {
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub nutrition: NutritionInfo,
}

/// The bundled standard-foods dataset, loaded once at startup.
pub struct LocalFoodDataset {
    foods: Vec<LocalFood>,
}

impl LocalFoodDataset {
    /// Load the JSON bundle. A missing or malformed file is not fatal:
    /// the dataset comes up empty and search simply finds nothing local.
    pub fn load(path: &str) -> Self {
        let foods = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Vec<LocalFood>>(&raw) {
                Ok(foods) => foods,
                Err(e) => {
                    warn!(error = %e, path, "standard foods bundle is malformed; using empty dataset");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(error = %e, path, "standard foods bundle not readable; using empty dataset");
                Vec::new()
            }
        };
        info!(count = foods.len(), path, "standard foods dataset loaded");
        Self { foods }
    }

    pub fn empty() -> Self {
        Self { foods: Vec::new() }
    }

    pub fn from_foods(foods: Vec<LocalFood>) -> Self {
        Self { foods }
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }

    /// Normalized substring search, capped at 50 results.
    pub fn search(&self, query: &str) -> Vec<&LocalFood> {
        let needle = normalize_name(query);
        if needle.is_empty() {
            return Vec::new();
        }
        self.foods
            .iter()
            .filter(|f| normalize_name(&f.name).contains(&needle))
            .take(MAX_RESULTS)
            .collect()
    }
}

/// Canonical form of a food name, used both for dataset search and for
/// FoodMaster keying so that create-time and search-time matching agree:
/// lowercase, full-width ASCII folded to half-width, whitespace and
/// parentheses stripped, hiragana folded to katakana.
pub fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        // Full-width ASCII block, U+FF01..=U+FF5E, maps straight onto
        // U+0021..=U+007E. Full-width parens land on ASCII parens here.
        let ch = match ch {
            '\u{ff01}'..='\u{ff5e}' => {
                char::from_u32(ch as u32 - 0xfee0).unwrap_or(ch)
            }
            // Hiragana to katakana is a fixed offset of 0x60.
            '\u{3041}'..='\u{3096}' => char::from_u32(ch as u32 + 0x60).unwrap_or(ch),
            c => c,
        };
        if ch.is_whitespace() || matches!(ch, '(' | ')') {
            continue;
        }
        for lower in ch.to_lowercase() {
            out.push(lower);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> LocalFoodDataset {
        let raw = r#"[
            {"name": "白米(炊飯)", "nutrition": {"calories": 168.0, "protein": 2.5, "fat": 0.3, "carbohydrates": 37.1, "sugar": 0.1, "serving_size": 100.0}},
            {"name": "りんご", "nutrition": {"calories": 56.0, "protein": 0.2, "fat": 0.3, "carbohydrates": 15.5, "sugar": 14.3, "serving_size": 100.0}},
            {"name": "Apple Pie", "nutrition": {"calories": 237.0, "protein": 2.0, "fat": 11.0, "carbohydrates": 34.0, "sugar": 16.0, "serving_size": 100.0}}
        ]"#;
        LocalFoodDataset {
            foods: serde_json::from_str(raw).unwrap(),
        }
    }

    #[test]
    fn normalize_folds_fullwidth_and_case() {
        assert_eq!(normalize_name("Ａｐｐｌｅ Ｐｉｅ"), "applepie");
        assert_eq!(normalize_name("Apple  PIE"), "applepie");
    }

    #[test]
    fn normalize_folds_hiragana_to_katakana() {
        assert_eq!(normalize_name("りんご"), normalize_name("リンゴ"));
    }

    #[test]
    fn normalize_strips_parens_and_ideographic_space() {
        assert_eq!(normalize_name("白米(炊飯)"), normalize_name("白米\u{3000}（炊飯）"));
    }

    #[test]
    fn search_matches_across_scripts() {
        let ds = dataset();
        let hits = ds.search("リンゴ");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "りんご");
    }

    #[test]
    fn search_is_substring_containment() {
        let ds = dataset();
        let hits = ds.search("pie");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Apple Pie");
    }

    #[test]
    fn search_empty_query_finds_nothing() {
        assert!(dataset().search("   ").is_empty());
    }

    #[test]
    fn search_caps_results() {
        let foods: Vec<LocalFood> = (0..80)
            .map(|i| LocalFood {
                name: format!("food {i}"),
                brand: None,
                category: None,
                nutrition: crate::nutrition::NutritionInfo::EMPTY,
            })
            .collect();
        let ds = LocalFoodDataset { foods };
        assert_eq!(ds.search("food").len(), MAX_RESULTS);
    }

    #[test]
    fn load_missing_file_yields_empty_dataset() {
        let ds = LocalFoodDataset::load("/nonexistent/standard_foods.json");
        assert!(ds.is_empty());
    }
}
