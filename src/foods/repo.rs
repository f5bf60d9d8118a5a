use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::nutrition::NutritionInfo;

/// Meal slot of a record, stored as its lowercase string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

/// Canonical per-100g nutrient profile for a named food.
/// One row per `name_key`; only a missing photo is ever backfilled.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FoodMaster {
    pub id: Uuid,
    pub name: String,
    pub name_key: String,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrates: f64,
    pub sugar: f64,
    pub fiber: f64,
    pub sodium: f64,
    pub category: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: OffsetDateTime,
}

impl FoodMaster {
    pub fn nutrition_info(&self) -> NutritionInfo {
        NutritionInfo {
            calories: self.calories,
            protein: self.protein,
            fat: self.fat,
            carbohydrates: self.carbohydrates,
            sugar: self.sugar,
            serving_size: 100.0,
            fiber: Some(self.fiber),
            sodium: Some(self.sodium),
            calcium: None,
            iron: None,
        }
    }
}

/// One logged consumption event. The actual_* columns are denormalized
/// from the master at creation time and are never recomputed afterwards.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FoodRecord {
    pub id: Uuid,
    pub master_id: Uuid,
    pub eaten_at: OffsetDateTime,
    pub meal_type: String,
    pub serving_multiplier: f64,
    pub actual_calories: f64,
    pub actual_protein: f64,
    pub actual_fat: f64,
    pub actual_carbohydrates: f64,
    pub actual_sugar: f64,
    pub actual_fiber: f64,
    pub actual_sodium: f64,
    pub created_at: OffsetDateTime,
}

/// A record joined with its master's display fields for day listings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DayRecord {
    pub id: Uuid,
    pub master_id: Uuid,
    pub name: String,
    pub photo_url: Option<String>,
    pub eaten_at: OffsetDateTime,
    pub meal_type: String,
    pub serving_multiplier: f64,
    pub actual_calories: f64,
    pub actual_protein: f64,
    pub actual_fat: f64,
    pub actual_carbohydrates: f64,
    pub actual_sugar: f64,
    pub actual_fiber: f64,
    pub actual_sodium: f64,
}

const MASTER_COLUMNS: &str = "id, name, name_key, calories, protein, fat, carbohydrates, sugar, \
                              fiber, sodium, category, photo_url, created_at";

pub async fn find_master_by_key_tx(
    tx: &mut Transaction<'_, Postgres>,
    name_key: &str,
) -> anyhow::Result<Option<FoodMaster>> {
    let master = sqlx::query_as::<_, FoodMaster>(&format!(
        "SELECT {MASTER_COLUMNS} FROM food_masters WHERE name_key = $1"
    ))
    .bind(name_key)
    .fetch_optional(&mut **tx)
    .await
    .context("find food master by key")?;
    Ok(master)
}

pub async fn find_master(db: &PgPool, id: Uuid) -> anyhow::Result<Option<FoodMaster>> {
    let master = sqlx::query_as::<_, FoodMaster>(&format!(
        "SELECT {MASTER_COLUMNS} FROM food_masters WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find food master")?;
    Ok(master)
}

/// Insert a master; on a concurrent duplicate key the existing row wins.
pub async fn insert_master_tx(
    tx: &mut Transaction<'_, Postgres>,
    master: &FoodMaster,
) -> anyhow::Result<FoodMaster> {
    let inserted = sqlx::query_as::<_, FoodMaster>(&format!(
        r#"
        INSERT INTO food_masters
            (id, name, name_key, calories, protein, fat, carbohydrates, sugar,
             fiber, sodium, category, photo_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (name_key) DO NOTHING
        RETURNING {MASTER_COLUMNS}
        "#
    ))
    .bind(master.id)
    .bind(&master.name)
    .bind(&master.name_key)
    .bind(master.calories)
    .bind(master.protein)
    .bind(master.fat)
    .bind(master.carbohydrates)
    .bind(master.sugar)
    .bind(master.fiber)
    .bind(master.sodium)
    .bind(&master.category)
    .bind(&master.photo_url)
    .fetch_optional(&mut **tx)
    .await
    .context("insert food master")?;

    match inserted {
        Some(m) => Ok(m),
        None => find_master_by_key_tx(tx, &master.name_key)
            .await?
            .context("master vanished after conflicting insert"),
    }
}

/// Attach a photo only when the master has none yet.
pub async fn backfill_master_photo_tx(
    tx: &mut Transaction<'_, Postgres>,
    master_id: Uuid,
    photo_url: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE food_masters SET photo_url = $2 WHERE id = $1 AND photo_url IS NULL",
    )
    .bind(master_id)
    .bind(photo_url)
    .execute(&mut **tx)
    .await
    .context("backfill master photo")?;
    Ok(result.rows_affected() > 0)
}

pub async fn insert_record_tx(
    tx: &mut Transaction<'_, Postgres>,
    record: &FoodRecord,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO food_records
            (id, master_id, eaten_at, meal_type, serving_multiplier,
             actual_calories, actual_protein, actual_fat, actual_carbohydrates,
             actual_sugar, actual_fiber, actual_sodium)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(record.id)
    .bind(record.master_id)
    .bind(record.eaten_at)
    .bind(&record.meal_type)
    .bind(record.serving_multiplier)
    .bind(record.actual_calories)
    .bind(record.actual_protein)
    .bind(record.actual_fat)
    .bind(record.actual_carbohydrates)
    .bind(record.actual_sugar)
    .bind(record.actual_fiber)
    .bind(record.actual_sodium)
    .execute(&mut **tx)
    .await
    .context("insert food record")?;
    Ok(())
}

pub async fn list_records_between(
    db: &PgPool,
    from: OffsetDateTime,
    to: OffsetDateTime,
) -> anyhow::Result<Vec<DayRecord>> {
    let rows = sqlx::query_as::<_, DayRecord>(
        r#"
        SELECT r.id, r.master_id, m.name, m.photo_url, r.eaten_at, r.meal_type,
               r.serving_multiplier, r.actual_calories, r.actual_protein,
               r.actual_fat, r.actual_carbohydrates, r.actual_sugar,
               r.actual_fiber, r.actual_sodium
          FROM food_records r
          JOIN food_masters m ON m.id = r.master_id
         WHERE r.eaten_at >= $1 AND r.eaten_at < $2
         ORDER BY r.eaten_at ASC
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await
    .context("list food records")?;
    Ok(rows)
}

pub async fn delete_record(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM food_records WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete food record")?;
    Ok(result.rows_affected() > 0)
}

pub async fn insert_favorite(db: &PgPool, master_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO favorite_foods (master_id) VALUES ($1) ON CONFLICT (master_id) DO NOTHING",
    )
    .bind(master_id)
    .execute(db)
    .await
    .context("insert favorite")?;
    Ok(())
}

pub async fn delete_favorite(db: &PgPool, master_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM favorite_foods WHERE master_id = $1")
        .bind(master_id)
        .execute(db)
        .await
        .context("delete favorite")?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_favorites(db: &PgPool) -> anyhow::Result<Vec<FoodMaster>> {
    let rows = sqlx::query_as::<_, FoodMaster>(
        r#"
        SELECT m.id, m.name, m.name_key, m.calories, m.protein, m.fat,
               m.carbohydrates, m.sugar, m.fiber, m.sodium, m.category,
               m.photo_url, m.created_at
          FROM favorite_foods f
          JOIN food_masters m ON m.id = f.master_id
         ORDER BY f.created_at DESC
        "#,
    )
    .fetch_all(db)
    .await
    .context("list favorites")?;
    Ok(rows)
}
