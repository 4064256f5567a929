use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{
    Measurement, MeasurementRow, NewMeasurement, NewProfile, Profile, ProfileRow, ProfileUpdate,
};
use crate::db::utc_day_bounds;

/// Person cards and their append-only measurement log.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, profile_id: Uuid) -> anyhow::Result<Option<Profile>>;

    async fn create_profile(&self, new: NewProfile) -> anyhow::Result<Profile>;

    /// Applies the given fields; `None` when the card does not exist.
    async fn update_profile(
        &self,
        profile_id: Uuid,
        update: ProfileUpdate,
    ) -> anyhow::Result<Option<Profile>>;

    /// Most recent measurement taken on or before `on_or_before` (UTC calendar date).
    async fn get_latest_measurement(
        &self,
        profile_id: Uuid,
        on_or_before: Date,
    ) -> anyhow::Result<Option<Measurement>>;

    async fn append_measurement(
        &self,
        profile_id: Uuid,
        new: NewMeasurement,
    ) -> anyhow::Result<Measurement>;

    /// Replaces the card blacklist.
    async fn set_exclusions(
        &self,
        profile_id: Uuid,
        product_ids: &[i64],
        category_ids: &[i64],
    ) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgProfileStore {
    db: PgPool,
}

impl PgProfileStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_profile(&self, profile_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, gender, age, height_cm, hand_cm, activity
              FROM profiles
             WHERE id = $1
            "#,
        )
        .bind(profile_id)
        .fetch_optional(&self.db)
        .await
        .context("select profile")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let excluded_products: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT product_id
              FROM profile_excluded_products
             WHERE profile_id = $1
             ORDER BY product_id
            "#,
        )
        .bind(profile_id)
        .fetch_all(&self.db)
        .await
        .context("select excluded products")?;

        let excluded_categories: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT category_id
              FROM profile_excluded_categories
             WHERE profile_id = $1
             ORDER BY category_id
            "#,
        )
        .bind(profile_id)
        .fetch_all(&self.db)
        .await
        .context("select excluded categories")?;

        row.into_profile(excluded_products, excluded_categories)
            .map(Some)
    }

    async fn create_profile(&self, new: NewProfile) -> anyhow::Result<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO profiles (id, gender, age, height_cm, hand_cm, activity)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, gender, age, height_cm, hand_cm, activity
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.gender.to_string())
        .bind(i32::try_from(new.age).context("age out of range")?)
        .bind(new.height_cm)
        .bind(new.hand_cm)
        .bind(new.activity.as_str())
        .fetch_one(&self.db)
        .await
        .context("insert profile")?;

        row.into_profile(Vec::new(), Vec::new())
    }

    async fn update_profile(
        &self,
        profile_id: Uuid,
        update: ProfileUpdate,
    ) -> anyhow::Result<Option<Profile>> {
        let age = update
            .age
            .map(i32::try_from)
            .transpose()
            .context("age out of range")?;
        let updated = sqlx::query(
            r#"
            UPDATE profiles
               SET gender = COALESCE($2, gender),
                   age = COALESCE($3, age),
                   height_cm = COALESCE($4, height_cm),
                   hand_cm = COALESCE($5, hand_cm),
                   activity = COALESCE($6, activity)
             WHERE id = $1
            "#,
        )
        .bind(profile_id)
        .bind(update.gender.map(|g| g.to_string()))
        .bind(age)
        .bind(update.height_cm)
        .bind(update.hand_cm)
        .bind(update.activity.map(|a| a.as_str()))
        .execute(&self.db)
        .await
        .context("update profile")?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_profile(profile_id).await
    }

    async fn get_latest_measurement(
        &self,
        profile_id: Uuid,
        on_or_before: Date,
    ) -> anyhow::Result<Option<Measurement>> {
        let (_, day_end) = utc_day_bounds(on_or_before);
        let row = sqlx::query_as::<_, MeasurementRow>(
            r#"
            SELECT id, profile_id, weight_kg, hand_cm, chest_cm, waist_cm, hips_cm, taken_at
              FROM measurements
             WHERE profile_id = $1
               AND taken_at < $2
             ORDER BY taken_at DESC
             LIMIT 1
            "#,
        )
        .bind(profile_id)
        .bind(day_end)
        .fetch_optional(&self.db)
        .await
        .context("select latest measurement")?;

        Ok(row.map(Measurement::from))
    }

    async fn append_measurement(
        &self,
        profile_id: Uuid,
        new: NewMeasurement,
    ) -> anyhow::Result<Measurement> {
        let row = sqlx::query_as::<_, MeasurementRow>(
            r#"
            INSERT INTO measurements
                   (id, profile_id, weight_kg, hand_cm, chest_cm, waist_cm, hips_cm, taken_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, profile_id, weight_kg, hand_cm, chest_cm, waist_cm, hips_cm, taken_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(profile_id)
        .bind(new.weight_kg)
        .bind(new.hand_cm)
        .bind(new.chest_cm)
        .bind(new.waist_cm)
        .bind(new.hips_cm)
        .bind(new.taken_at.unwrap_or_else(OffsetDateTime::now_utc))
        .fetch_one(&self.db)
        .await
        .context("insert measurement")?;

        Ok(row.into())
    }

    async fn set_exclusions(
        &self,
        profile_id: Uuid,
        product_ids: &[i64],
        category_ids: &[i64],
    ) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin exclusions tx")?;
        replace_exclusions_tx(&mut tx, profile_id, product_ids, category_ids).await?;
        tx.commit().await.context("commit exclusions tx")?;
        Ok(())
    }
}

async fn replace_exclusions_tx(
    tx: &mut Transaction<'_, Postgres>,
    profile_id: Uuid,
    product_ids: &[i64],
    category_ids: &[i64],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM profile_excluded_products WHERE profile_id = $1")
        .bind(profile_id)
        .execute(&mut **tx)
        .await
        .context("clear excluded products")?;
    sqlx::query("DELETE FROM profile_excluded_categories WHERE profile_id = $1")
        .bind(profile_id)
        .execute(&mut **tx)
        .await
        .context("clear excluded categories")?;

    sqlx::query(
        r#"
        INSERT INTO profile_excluded_products (profile_id, product_id)
        SELECT $1, UNNEST($2::BIGINT[])
        "#,
    )
    .bind(profile_id)
    .bind(product_ids)
    .execute(&mut **tx)
    .await
    .context("insert excluded products")?;

    sqlx::query(
        r#"
        INSERT INTO profile_excluded_categories (profile_id, category_id)
        SELECT $1, UNNEST($2::BIGINT[])
        "#,
    )
    .bind(profile_id)
    .bind(category_ids)
    .execute(&mut **tx)
    .await
    .context("insert excluded categories")?;

    Ok(())
}
