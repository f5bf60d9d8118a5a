use std::collections::BTreeMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::body::repo::{self, BodyComposition};
use crate::dates::day_start;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// Revised Harris-Benedict resting energy expenditure, kcal/day.
pub fn harris_benedict_bmr(gender: Gender, weight_kg: f64, height_cm: f64, age: u32) -> f64 {
    let age = f64::from(age);
    match gender {
        Gender::Male => 88.362 + 13.397 * weight_kg + 4.799 * height_cm - 5.677 * age,
        Gender::Female => 447.593 + 9.247 * weight_kg + 3.098 * height_cm - 4.330 * age,
    }
}

#[derive(Debug, Clone)]
pub struct NewBodyComposition {
    pub recorded_at: OffsetDateTime,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub age: u32,
    pub gender: Gender,
    pub body_fat_pct: f64,
    pub muscle_mass_kg: f64,
    pub basal_metabolic_rate: Option<f64>,
    pub activity_level: Option<String>,
}

/// Input ranges enforced at the boundary.
pub fn validate(input: &NewBodyComposition) -> Result<(), String> {
    if !(100.0..=250.0).contains(&input.height_cm) {
        return Err("height must be within 100-250 cm".into());
    }
    if !(20.0..=300.0).contains(&input.weight_kg) {
        return Err("weight must be within 20-300 kg".into());
    }
    if !(10..=120).contains(&input.age) {
        return Err("age must be within 10-120".into());
    }
    if !(3.0..=60.0).contains(&input.body_fat_pct) {
        return Err("body fat must be within 3-60 %".into());
    }
    if input.muscle_mass_kg < 0.0 {
        return Err("muscle mass must not be negative".into());
    }
    Ok(())
}

/// Save the day's snapshot. The date is normalized to midnight UTC and a
/// same-day row is overwritten rather than duplicated.
pub async fn save_body_composition(
    db: &PgPool,
    input: NewBodyComposition,
) -> anyhow::Result<BodyComposition> {
    validate(&input).map_err(|e| anyhow::anyhow!(e))?;

    let day = day_start(input.recorded_at);
    let bmr = input.basal_metabolic_rate.unwrap_or_else(|| {
        harris_benedict_bmr(input.gender, input.weight_kg, input.height_cm, input.age)
    });

    let mut tx = db.begin().await.context("begin tx")?;
    let row = match repo::find_by_recorded_at_tx(&mut tx, day).await? {
        Some(existing) => {
            let updated = BodyComposition {
                height_cm: input.height_cm,
                weight_kg: input.weight_kg,
                age: input.age as i32,
                gender: input.gender.as_str().to_string(),
                body_fat_pct: input.body_fat_pct,
                muscle_mass_kg: input.muscle_mass_kg,
                basal_metabolic_rate: bmr,
                activity_level: input.activity_level.clone(),
                ..existing
            };
            repo::update_values_tx(&mut tx, &updated).await?;
            updated
        }
        None => {
            let row = BodyComposition {
                id: Uuid::new_v4(),
                recorded_at: day,
                height_cm: input.height_cm,
                weight_kg: input.weight_kg,
                age: input.age as i32,
                gender: input.gender.as_str().to_string(),
                body_fat_pct: input.body_fat_pct,
                muscle_mass_kg: input.muscle_mass_kg,
                basal_metabolic_rate: bmr,
                activity_level: input.activity_level.clone(),
                created_at: OffsetDateTime::now_utc(),
            };
            repo::insert_tx(&mut tx, &row).await?;
            row
        }
    };
    tx.commit().await.context("commit tx")?;
    Ok(row)
}

#[derive(Debug, Default, PartialEq)]
pub struct NormalizationPlan {
    /// Rows whose recorded_at moves to their day's midnight.
    pub updates: Vec<(Uuid, OffsetDateTime)>,
    /// Same-day duplicates losing to a chronologically later row.
    pub deletes: Vec<Uuid>,
}

impl NormalizationPlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Decide, per calendar day, which row survives and where it moves.
/// The chronologically latest row of a day wins; everything else goes.
pub fn plan_normalization(rows: &[(Uuid, OffsetDateTime)]) -> NormalizationPlan {
    let mut by_day: BTreeMap<Date, (Uuid, OffsetDateTime)> = BTreeMap::new();
    let mut plan = NormalizationPlan::default();

    for &(id, recorded_at) in rows {
        let day = day_start(recorded_at).date();
        match by_day.get(&day) {
            Some(&(kept_id, kept_at)) => {
                if recorded_at > kept_at {
                    plan.deletes.push(kept_id);
                    by_day.insert(day, (id, recorded_at));
                } else {
                    plan.deletes.push(id);
                }
            }
            None => {
                by_day.insert(day, (id, recorded_at));
            }
        }
    }

    for (day, (id, recorded_at)) in by_day {
        let midnight = day.midnight().assume_utc();
        if recorded_at != midnight {
            plan.updates.push((id, midnight));
        }
    }

    plan
}

/// One-shot startup pass: collapse same-day duplicates and pin every row
/// to midnight. Safe to run repeatedly; a clean table is a no-op.
pub async fn normalize_recorded_dates(db: &PgPool) -> anyhow::Result<u64> {
    let rows = repo::list_recorded_dates(db).await?;
    let plan = plan_normalization(&rows);
    if plan.is_empty() {
        return Ok(0);
    }

    let mut tx = db.begin().await.context("begin tx")?;
    for &id in &plan.deletes {
        repo::delete_tx(&mut tx, id).await?;
    }
    for &(id, at) in &plan.updates {
        repo::set_recorded_at_tx(&mut tx, id, at).await?;
    }
    tx.commit().await.context("commit tx")?;

    let changed = (plan.deletes.len() + plan.updates.len()) as u64;
    info!(
        deleted = plan.deletes.len(),
        updated = plan.updates.len(),
        "normalized body composition dates"
    );
    Ok(changed)
}
