use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Nutrient vector for a food, expressed against a gram basis.
///
/// `serving_size` is the number of grams the other fields describe. It is
/// never zero except for [`NutritionInfo::EMPTY`], the additive identity
/// used as the starting point of daily aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionInfo {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrates: f64,
    pub sugar: f64,
    pub serving_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calcium: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iron: Option<f64>,
}

impl NutritionInfo {
    pub const EMPTY: NutritionInfo = NutritionInfo {
        calories: 0.0,
        protein: 0.0,
        fat: 0.0,
        carbohydrates: 0.0,
        sugar: 0.0,
        serving_size: 0.0,
        fiber: None,
        sodium: None,
        calcium: None,
        iron: None,
    };

    /// Rescale every field to a new gram basis. Absent optionals stay absent.
    pub fn scaled(&self, grams: f64) -> NutritionInfo {
        if self.serving_size <= 0.0 {
            return NutritionInfo::EMPTY;
        }
        let factor = grams / self.serving_size;
        NutritionInfo {
            calories: self.calories * factor,
            protein: self.protein * factor,
            fat: self.fat * factor,
            carbohydrates: self.carbohydrates * factor,
            sugar: self.sugar * factor,
            serving_size: grams,
            fiber: self.fiber.map(|v| v * factor),
            sodium: self.sodium.map(|v| v * factor),
            calcium: self.calcium.map(|v| v * factor),
            iron: self.iron.map(|v| v * factor),
        }
    }

    pub fn per_100g(&self) -> NutritionInfo {
        self.scaled(100.0)
    }
}

fn add_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x + y),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

impl Add for NutritionInfo {
    type Output = NutritionInfo;

    fn add(self, rhs: NutritionInfo) -> NutritionInfo {
        NutritionInfo {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            fat: self.fat + rhs.fat,
            carbohydrates: self.carbohydrates + rhs.carbohydrates,
            sugar: self.sugar + rhs.sugar,
            serving_size: self.serving_size + rhs.serving_size,
            fiber: add_opt(self.fiber, rhs.fiber),
            sodium: add_opt(self.sodium, rhs.sodium),
            calcium: add_opt(self.calcium, rhs.calcium),
            iron: add_opt(self.iron, rhs.iron),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rice() -> NutritionInfo {
        NutritionInfo {
            calories: 168.0,
            protein: 2.5,
            fat: 0.3,
            carbohydrates: 37.1,
            sugar: 0.1,
            serving_size: 100.0,
            fiber: Some(0.3),
            sodium: Some(1.0),
            calcium: None,
            iron: None,
        }
    }

    #[test]
    fn scaled_is_linear_across_basis_chains() {
        let n = rice();
        let direct = n.scaled(150.0);
        let chained = n.scaled(60.0).scaled(150.0);
        assert!((direct.calories - chained.calories).abs() < 1e-9);
        assert!((direct.protein - chained.protein).abs() < 1e-9);
        assert!((direct.fiber.unwrap() - chained.fiber.unwrap()).abs() < 1e-9);
        assert_eq!(direct.serving_size, 150.0);
    }

    #[test]
    fn scaled_keeps_absent_optionals_absent() {
        let scaled = rice().scaled(250.0);
        assert!(scaled.calcium.is_none());
        assert!(scaled.iron.is_none());
        assert!(scaled.fiber.is_some());
    }

    #[test]
    fn scaling_empty_stays_empty() {
        assert_eq!(NutritionInfo::EMPTY.scaled(100.0), NutritionInfo::EMPTY);
    }

    #[test]
    fn empty_is_additive_identity() {
        let n = rice();
        assert_eq!(NutritionInfo::EMPTY + n, n);
        assert_eq!(n + NutritionInfo::EMPTY, n);
    }

    #[test]
    fn add_absorbs_missing_optionals() {
        let with_fiber = rice();
        let without = NutritionInfo {
            fiber: None,
            sodium: None,
            ..rice()
        };
        let sum = with_fiber + without;
        assert_eq!(sum.fiber, Some(0.3));
        assert_eq!(sum.sodium, Some(1.0));
        assert!(sum.calcium.is_none());
        assert_eq!(sum.calories, 336.0);
        assert_eq!(sum.serving_size, 200.0);
    }

    #[test]
    fn per_100g_normalizes_other_bases() {
        let soup = NutritionInfo {
            calories: 40.0,
            serving_size: 200.0,
            ..NutritionInfo::EMPTY
        };
        assert_eq!(soup.per_100g().calories, 20.0);
        assert_eq!(soup.per_100g().serving_size, 100.0);
    }
}
