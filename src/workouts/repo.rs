use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WorkoutEntry {
    pub id: Uuid,
    pub exercise: String,
    pub sets: i32,
    pub reps: i32,
    pub weight_kg: Option<f64>,
    pub performed_at: OffsetDateTime,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
}

pub async fn insert(db: &PgPool, entry: &WorkoutEntry) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO workout_entries (id, exercise, sets, reps, weight_kg, performed_at, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(entry.id)
    .bind(&entry.exercise)
    .bind(entry.sets)
    .bind(entry.reps)
    .bind(entry.weight_kg)
    .bind(entry.performed_at)
    .bind(&entry.notes)
    .execute(db)
    .await
    .context("insert workout entry")?;
    Ok(())
}

pub async fn list_between(
    db: &PgPool,
    from: OffsetDateTime,
    to: OffsetDateTime,
) -> anyhow::Result<Vec<WorkoutEntry>> {
    let rows = sqlx::query_as::<_, WorkoutEntry>(
        r#"
        SELECT id, exercise, sets, reps, weight_kg, performed_at, notes, created_at
          FROM workout_entries
         WHERE performed_at >= $1 AND performed_at < $2
         ORDER BY performed_at ASC
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await
    .context("list workout entries")?;
    Ok(rows)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM workout_entries WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete workout entry")?;
    Ok(result.rows_affected() > 0)
}
