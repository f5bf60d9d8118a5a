use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Per-day body snapshot. After the startup normalization pass there is
/// at most one row per calendar day, dated at midnight UTC.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BodyComposition {
    pub id: Uuid,
    pub recorded_at: OffsetDateTime,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub age: i32,
    pub gender: String,
    pub body_fat_pct: f64,
    pub muscle_mass_kg: f64,
    pub basal_metabolic_rate: f64,
    pub activity_level: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailyCalories {
    pub day: Date,
    pub consumed: f64,
    pub burned: f64,
    pub updated_at: OffsetDateTime,
}

const BODY_COLUMNS: &str = "id, recorded_at, height_cm, weight_kg, age, gender, body_fat_pct, \
                            muscle_mass_kg, basal_metabolic_rate, activity_level, created_at";

pub async fn find_by_recorded_at_tx(
    tx: &mut Transaction<'_, Postgres>,
    recorded_at: OffsetDateTime,
) -> anyhow::Result<Option<BodyComposition>> {
    let row = sqlx::query_as::<_, BodyComposition>(&format!(
        "SELECT {BODY_COLUMNS} FROM body_compositions WHERE recorded_at = $1"
    ))
    .bind(recorded_at)
    .fetch_optional(&mut **tx)
    .await
    .context("find body composition by date")?;
    Ok(row)
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    row: &BodyComposition,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO body_compositions
            (id, recorded_at, height_cm, weight_kg, age, gender, body_fat_pct,
             muscle_mass_kg, basal_metabolic_rate, activity_level)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(row.id)
    .bind(row.recorded_at)
    .bind(row.height_cm)
    .bind(row.weight_kg)
    .bind(row.age)
    .bind(&row.gender)
    .bind(row.body_fat_pct)
    .bind(row.muscle_mass_kg)
    .bind(row.basal_metabolic_rate)
    .bind(&row.activity_level)
    .execute(&mut **tx)
    .await
    .context("insert body composition")?;
    Ok(())
}

pub async fn update_values_tx(
    tx: &mut Transaction<'_, Postgres>,
    row: &BodyComposition,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE body_compositions
           SET height_cm = $2, weight_kg = $3, age = $4, gender = $5,
               body_fat_pct = $6, muscle_mass_kg = $7, basal_metabolic_rate = $8,
               activity_level = $9
         WHERE id = $1
        "#,
    )
    .bind(row.id)
    .bind(row.height_cm)
    .bind(row.weight_kg)
    .bind(row.age)
    .bind(&row.gender)
    .bind(row.body_fat_pct)
    .bind(row.muscle_mass_kg)
    .bind(row.basal_metabolic_rate)
    .bind(&row.activity_level)
    .execute(&mut **tx)
    .await
    .context("update body composition")?;
    Ok(())
}

pub async fn list_between(
    db: &PgPool,
    from: OffsetDateTime,
    to: OffsetDateTime,
) -> anyhow::Result<Vec<BodyComposition>> {
    let rows = sqlx::query_as::<_, BodyComposition>(&format!(
        r#"
        SELECT {BODY_COLUMNS}
          FROM body_compositions
         WHERE recorded_at >= $1 AND recorded_at < $2
         ORDER BY recorded_at ASC
        "#
    ))
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await
    .context("list body compositions")?;
    Ok(rows)
}

pub async fn latest(db: &PgPool) -> anyhow::Result<Option<BodyComposition>> {
    let row = sqlx::query_as::<_, BodyComposition>(&format!(
        "SELECT {BODY_COLUMNS} FROM body_compositions ORDER BY recorded_at DESC LIMIT 1"
    ))
    .fetch_optional(db)
    .await
    .context("latest body composition")?;
    Ok(row)
}

/// Id and date of every row, oldest first, for the normalization pass.
pub async fn list_recorded_dates(db: &PgPool) -> anyhow::Result<Vec<(Uuid, OffsetDateTime)>> {
    let rows = sqlx::query_as::<_, (Uuid, OffsetDateTime)>(
        "SELECT id, recorded_at FROM body_compositions ORDER BY recorded_at ASC",
    )
    .fetch_all(db)
    .await
    .context("list body composition dates")?;
    Ok(rows)
}

pub async fn set_recorded_at_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    recorded_at: OffsetDateTime,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE body_compositions SET recorded_at = $2 WHERE id = $1")
        .bind(id)
        .bind(recorded_at)
        .execute(&mut **tx)
        .await
        .context("set body composition date")?;
    Ok(())
}

pub async fn delete_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM body_compositions WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await
        .context("delete body composition")?;
    Ok(())
}

pub async fn upsert_daily_calories(
    db: &PgPool,
    day: Date,
    consumed: f64,
    burned: f64,
) -> anyhow::Result<DailyCalories> {
    let row = sqlx::query_as::<_, DailyCalories>(
        r#"
        INSERT INTO daily_calories (day, consumed, burned, updated_at)
        VALUES ($1, $2, $3, now())
        ON CONFLICT (day) DO UPDATE
            SET consumed = EXCLUDED.consumed,
                burned = EXCLUDED.burned,
                updated_at = now()
        RETURNING day, consumed, burned, updated_at
        "#,
    )
    .bind(day)
    .bind(consumed)
    .bind(burned)
    .fetch_one(db)
    .await
    .context("upsert daily calories")?;
    Ok(row)
}

pub async fn list_daily_calories(
    db: &PgPool,
    from: Date,
    to: Date,
) -> anyhow::Result<Vec<DailyCalories>> {
    let rows = sqlx::query_as::<_, DailyCalories>(
        r#"
        SELECT day, consumed, burned, updated_at
          FROM daily_calories
         WHERE day >= $1 AND day <= $2
         ORDER BY day ASC
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await
    .context("list daily calories")?;
    Ok(rows)
}
