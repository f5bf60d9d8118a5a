use anyhow::Context;
use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::dates::day_bounds;
use crate::foods::repo::{self, DayRecord, FoodMaster, FoodRecord, MealType};
use crate::nutrition::NutritionInfo;
use crate::search::dataset::normalize_name;

/// Input to the save pipeline. `nutrition` may be on any gram basis;
/// the master is normalized to 100 g at creation.
#[derive(Debug, Clone)]
pub struct NewFoodRecord {
    pub name: String,
    pub nutrition: NutritionInfo,
    pub serving_multiplier: f64,
    pub meal_type: MealType,
    pub eaten_at: OffsetDateTime,
    pub category: Option<String>,
    pub photo_url: Option<String>,
}

/// Build the canonical per-100g master row for a first-seen food name.
fn build_master(input: &NewFoodRecord) -> FoodMaster {
    let per_100g = input.nutrition.per_100g();
    FoodMaster {
        id: Uuid::new_v4(),
        name: input.name.clone(),
        name_key: normalize_name(&input.name),
        calories: per_100g.calories,
        protein: per_100g.protein,
        fat: per_100g.fat,
        carbohydrates: per_100g.carbohydrates,
        sugar: per_100g.sugar,
        fiber: per_100g.fiber.unwrap_or(0.0),
        sodium: per_100g.sodium.unwrap_or(0.0),
        category: input.category.clone(),
        photo_url: input.photo_url.clone(),
        created_at: OffsetDateTime::now_utc(),
    }
}

/// What was actually eaten: the master profile scaled to
/// `100 g * serving_multiplier`.
pub fn actual_nutrition(master: &FoodMaster, serving_multiplier: f64) -> NutritionInfo {
    master.nutrition_info().scaled(100.0 * serving_multiplier)
}

/// Snapshot the master into a record row. Later master edits must not
/// reach back into rows built here.
fn build_record(master: &FoodMaster, input: &NewFoodRecord) -> FoodRecord {
    let actual = actual_nutrition(master, input.serving_multiplier);
    FoodRecord {
        id: Uuid::new_v4(),
        master_id: master.id,
        eaten_at: input.eaten_at,
        meal_type: input.meal_type.as_str().to_string(),
        serving_multiplier: input.serving_multiplier,
        actual_calories: actual.calories,
        actual_protein: actual.protein,
        actual_fat: actual.fat,
        actual_carbohydrates: actual.carbohydrates,
        actual_sugar: actual.sugar,
        actual_fiber: actual.fiber.unwrap_or(0.0),
        actual_sodium: actual.sodium.unwrap_or(0.0),
        created_at: OffsetDateTime::now_utc(),
    }
}

/// Find-or-create the master for this name, then persist the scaled
/// record — one transaction, all-or-nothing.
pub async fn save_food_record(db: &PgPool, input: NewFoodRecord) -> anyhow::Result<FoodRecord> {
    anyhow::ensure!(!input.name.trim().is_empty(), "food name must not be empty");
    anyhow::ensure!(
        input.serving_multiplier > 0.0,
        "serving multiplier must be positive"
    );

    let mut tx = db.begin().await.context("begin tx")?;

    let master = match repo::find_master_by_key_tx(&mut tx, &normalize_name(&input.name)).await? {
        Some(mut existing) => {
            // A later save may carry the photo the first one lacked.
            if existing.photo_url.is_none() {
                if let Some(ref url) = input.photo_url {
                    if repo::backfill_master_photo_tx(&mut tx, existing.id, url).await? {
                        existing.photo_url = Some(url.clone());
                    }
                }
            }
            existing
        }
        None => {
            let master = repo::insert_master_tx(&mut tx, &build_master(&input)).await?;
            info!(master_id = %master.id, name = %master.name, "created food master");
            master
        }
    };

    let record = build_record(&master, &input);
    repo::insert_record_tx(&mut tx, &record).await?;
    tx.commit().await.context("commit tx")?;

    Ok(record)
}

/// Amount-based entry: 1.0 multiplier = 100 g of master.
pub async fn save_food_item(
    db: &PgPool,
    name: String,
    nutrition: NutritionInfo,
    amount_grams: f64,
    meal_type: MealType,
    eaten_at: OffsetDateTime,
    category: Option<String>,
    photo_url: Option<String>,
) -> anyhow::Result<FoodRecord> {
    anyhow::ensure!(amount_grams > 0.0, "amount must be positive");
    save_food_record(
        db,
        NewFoodRecord {
            name,
            nutrition,
            serving_multiplier: amount_grams / 100.0,
            meal_type,
            eaten_at,
            category,
            photo_url,
        },
    )
    .await
}

/// Log a resolved product. The master name folds the brand in so that
/// "Meiji Milk" and a homemade "Milk" stay distinct foods.
pub async fn save_barcode_product(
    db: &PgPool,
    name: String,
    brand: Option<String>,
    nutrition: NutritionInfo,
    amount_grams: f64,
    meal_type: MealType,
    eaten_at: OffsetDateTime,
    image_url: Option<String>,
) -> anyhow::Result<FoodRecord> {
    let name = match brand {
        Some(ref b) if !b.trim().is_empty() => format!("{} {}", b.trim(), name),
        _ => name,
    };
    save_food_item(db, name, nutrition, amount_grams, meal_type, eaten_at, None, image_url).await
}

pub async fn save_multiple_food_entries(
    db: &PgPool,
    entries: Vec<NewFoodRecord>,
) -> anyhow::Result<Vec<FoodRecord>> {
    let mut saved = Vec::with_capacity(entries.len());
    for entry in entries {
        saved.push(save_food_record(db, entry).await?);
    }
    Ok(saved)
}

pub async fn records_for_day(db: &PgPool, day: Date) -> anyhow::Result<Vec<DayRecord>> {
    let (from, to) = day_bounds(day);
    repo::list_records_between(db, from, to).await
}

fn record_nutrition(record: &DayRecord) -> NutritionInfo {
    NutritionInfo {
        calories: record.actual_calories,
        protein: record.actual_protein,
        fat: record.actual_fat,
        carbohydrates: record.actual_carbohydrates,
        sugar: record.actual_sugar,
        serving_size: 100.0 * record.serving_multiplier,
        fiber: Some(record.actual_fiber),
        sodium: Some(record.actual_sodium),
        calcium: None,
        iron: None,
    }
}

/// Field-wise sum of a day's records, starting from the empty sentinel.
pub fn total_from_records(records: &[DayRecord]) -> NutritionInfo {
    records
        .iter()
        .fold(NutritionInfo::EMPTY, |acc, r| acc + record_nutrition(r))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn input(name: &str, nutrition: NutritionInfo, multiplier: f64) -> NewFoodRecord {
        NewFoodRecord {
            name: name.to_string(),
            nutrition,
            serving_multiplier: multiplier,
            meal_type: MealType::Lunch,
            eaten_at: datetime!(2024-05-01 12:30 UTC),
            category: None,
            photo_url: None,
        }
    }

    fn rice_per_100g() -> NutritionInfo {
        NutritionInfo {
            calories: 252.0,
            protein: 3.8,
            fat: 0.5,
            carbohydrates: 55.7,
            sugar: 0.2,
            serving_size: 100.0,
            fiber: Some(0.5),
            sodium: Some(2.0),
            calcium: None,
            iron: None,
        }
    }

    #[test]
    fn actual_nutrition_scales_the_master() {
        let master = build_master(&input("Rice", rice_per_100g(), 1.5));
        let actual = actual_nutrition(&master, 1.5);
        assert!((actual.calories - 378.0).abs() < 1e-9);
        assert!((actual.protein - 5.7).abs() < 1e-9);
        assert_eq!(actual.serving_size, 150.0);
    }

    #[test]
    fn master_is_normalized_to_100g_basis() {
        let half_basis = NutritionInfo {
            calories: 80.0,
            protein: 4.0,
            serving_size: 50.0,
            ..NutritionInfo::EMPTY
        };
        let master = build_master(&input("Soup", half_basis, 1.0));
        assert_eq!(master.calories, 160.0);
        assert_eq!(master.protein, 8.0);
        assert_eq!(master.fiber, 0.0);
    }

    #[test]
    fn master_keying_tolerates_spelling_variants() {
        let a = build_master(&input("Rice ", rice_per_100g(), 1.0));
        let b = build_master(&input("rice", rice_per_100g(), 1.0));
        assert_eq!(a.name_key, b.name_key);
        // Display name keeps the spelling as entered.
        assert_eq!(a.name, "Rice ");
    }

    #[test]
    fn records_keep_their_snapshot_when_the_master_changes() {
        let mut master = build_master(&input("Rice", rice_per_100g(), 1.0));
        let record = build_record(&master, &input("Rice", rice_per_100g(), 1.5));
        assert!((record.actual_calories - 378.0).abs() < 1e-9);

        master.photo_url = Some("https://img.example/rice.jpg".to_string());
        master.calories = 999.0;
        assert!((record.actual_calories - 378.0).abs() < 1e-9);
    }

    #[test]
    fn record_meal_type_is_stored_as_string() {
        let master = build_master(&input("Rice", rice_per_100g(), 1.0));
        let record = build_record(&master, &input("Rice", rice_per_100g(), 1.0));
        assert_eq!(record.meal_type, "lunch");
    }

    #[test]
    fn day_total_folds_records_from_the_empty_sentinel() {
        let master = build_master(&input("Rice", rice_per_100g(), 1.0));
        let day_record = |multiplier: f64| {
            let r = build_record(&master, &input("Rice", rice_per_100g(), multiplier));
            DayRecord {
                id: r.id,
                master_id: r.master_id,
                name: master.name.clone(),
                photo_url: None,
                eaten_at: r.eaten_at,
                meal_type: r.meal_type.clone(),
                serving_multiplier: r.serving_multiplier,
                actual_calories: r.actual_calories,
                actual_protein: r.actual_protein,
                actual_fat: r.actual_fat,
                actual_carbohydrates: r.actual_carbohydrates,
                actual_sugar: r.actual_sugar,
                actual_fiber: r.actual_fiber,
                actual_sodium: r.actual_sodium,
            }
        };

        assert_eq!(total_from_records(&[]), NutritionInfo::EMPTY);

        let total = total_from_records(&[day_record(1.0), day_record(0.5)]);
        assert!((total.calories - 378.0).abs() < 1e-9);
        assert!((total.fiber.unwrap() - 0.75).abs() < 1e-9);
        assert_eq!(total.serving_size, 150.0);
    }
}
