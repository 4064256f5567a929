use std::collections::HashMap;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{
    ConsumedItem, ConsumptionEvent, EventPayload, EventRow, NewRecipe, PortionLine,
    RecipeLineRow, RecipeVersion, RecipeVersionRow,
};
use crate::catalog::repo_types::{ProductRecord, ProductRow};
use crate::db::utc_day_bounds;

/// Eating log plus the versioned recipes it references.
#[async_trait]
pub trait ConsumptionLog: Send + Sync {
    /// Events of one UTC calendar day, oldest first, with product data embedded.
    async fn list_events(&self, profile_id: Uuid, date: Date)
        -> anyhow::Result<Vec<ConsumptionEvent>>;

    async fn record_event(
        &self,
        profile_id: Uuid,
        payload: EventPayload,
        eaten_at: OffsetDateTime,
    ) -> anyhow::Result<Uuid>;

    /// Returns false when the profile has no such event.
    async fn delete_event(&self, profile_id: Uuid, event_id: Uuid) -> anyhow::Result<bool>;

    async fn current_recipe(&self, recipe_id: Uuid) -> anyhow::Result<Option<RecipeVersion>>;

    /// Stores version 1 of a new logical recipe.
    async fn create_recipe(&self, profile_id: Uuid, new: &NewRecipe)
        -> anyhow::Result<RecipeVersion>;

    /// Retires the current version and stores the next one. `None` when the recipe
    /// has no current version.
    async fn revise_recipe(
        &self,
        recipe_id: Uuid,
        new: &NewRecipe,
    ) -> anyhow::Result<Option<RecipeVersion>>;
}

#[derive(Clone)]
pub struct PgConsumptionLog {
    db: PgPool,
}

impl PgConsumptionLog {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn load_products(&self, ids: &[i64]) -> anyhow::Result<HashMap<i64, ProductRecord>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, title, proteins, fats, carbohydrates, calories, water,
                   category_id, category_title, protein_share, fat_share, carbohydrate_share
              FROM catalog_products
             WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await
        .context("select consumed products")?;

        Ok(rows
            .into_iter()
            .map(|r| (r.id, ProductRecord::from(r)))
            .collect())
    }

    async fn load_recipe_versions(
        &self,
        version_ids: &[Uuid],
    ) -> anyhow::Result<HashMap<Uuid, RecipeVersion>> {
        let versions = sqlx::query_as::<_, RecipeVersionRow>(
            r#"
            SELECT id, recipe_id, version, profile_id, title, description, is_current
              FROM recipe_versions
             WHERE id = ANY($1)
            "#,
        )
        .bind(version_ids)
        .fetch_all(&self.db)
        .await
        .context("select recipe versions")?;

        let lines = sqlx::query_as::<_, RecipeLineRow>(
            r#"
            SELECT recipe_version_id, product_id, weight_g
              FROM recipe_lines
             WHERE recipe_version_id = ANY($1)
             ORDER BY recipe_version_id, position
            "#,
        )
        .bind(version_ids)
        .fetch_all(&self.db)
        .await
        .context("select recipe lines")?;

        let product_ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
        let products = self.load_products(&product_ids).await?;

        let mut by_version: HashMap<Uuid, Vec<PortionLine>> = HashMap::new();
        for line in lines {
            let product = products
                .get(&line.product_id)
                .cloned()
                .ok_or_else(|| anyhow!("recipe line references missing product {}", line.product_id))?;
            by_version
                .entry(line.recipe_version_id)
                .or_default()
                .push(PortionLine {
                    product,
                    weight_g: line.weight_g,
                });
        }

        Ok(versions
            .into_iter()
            .map(|v| {
                let lines = by_version.remove(&v.id).unwrap_or_default();
                let recipe = RecipeVersion {
                    version_id: v.id,
                    recipe_id: v.recipe_id,
                    version: v.version,
                    profile_id: v.profile_id,
                    title: v.title,
                    description: v.description,
                    is_current: v.is_current,
                    lines,
                };
                (v.id, recipe)
            })
            .collect())
    }

    async fn load_recipe_version(&self, version_id: Uuid) -> anyhow::Result<RecipeVersion> {
        self.load_recipe_versions(&[version_id])
            .await?
            .remove(&version_id)
            .ok_or_else(|| anyhow!("recipe version {version_id} vanished after insert"))
    }
}

/// Insert a recipe version and its ordered lines within a transaction.
async fn insert_recipe_version_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    version: i32,
    profile_id: Uuid,
    new: &NewRecipe,
) -> anyhow::Result<Uuid> {
    let version_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO recipe_versions (id, recipe_id, version, profile_id, title, description, is_current)
        VALUES ($1, $2, $3, $4, $5, $6, TRUE)
        "#,
    )
    .bind(version_id)
    .bind(recipe_id)
    .bind(version)
    .bind(profile_id)
    .bind(&new.title)
    .bind(&new.description)
    .execute(&mut **tx)
    .await
    .context("insert recipe version")?;

    let positions: Vec<i32> = (0..new.lines.len()).map(|i| i as i32).collect();
    let product_ids: Vec<i64> = new.lines.iter().map(|l| l.product_id).collect();
    let weights: Vec<f64> = new.lines.iter().map(|l| l.weight_g).collect();
    sqlx::query(
        r#"
        INSERT INTO recipe_lines (recipe_version_id, position, product_id, weight_g)
        SELECT $1, position, product_id, weight_g
          FROM UNNEST($2::INT[], $3::BIGINT[], $4::DOUBLE PRECISION[])
               AS lines(position, product_id, weight_g)
        "#,
    )
    .bind(version_id)
    .bind(&positions)
    .bind(&product_ids)
    .bind(&weights)
    .execute(&mut **tx)
    .await
    .context("insert recipe lines")?;

    Ok(version_id)
}

#[async_trait]
impl ConsumptionLog for PgConsumptionLog {
    async fn list_events(
        &self,
        profile_id: Uuid,
        date: Date,
    ) -> anyhow::Result<Vec<ConsumptionEvent>> {
        let (day_start, day_end) = utc_day_bounds(date);
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, profile_id, eaten_at, product_id, weight_g, recipe_version_id, water_ml
              FROM consumption_events
             WHERE profile_id = $1
               AND eaten_at >= $2
               AND eaten_at < $3
             ORDER BY eaten_at, id
            "#,
        )
        .bind(profile_id)
        .bind(day_start)
        .bind(day_end)
        .fetch_all(&self.db)
        .await
        .context("select consumption events")?;

        let product_ids: Vec<i64> = rows.iter().filter_map(|r| r.product_id).collect();
        let version_ids: Vec<Uuid> = rows.iter().filter_map(|r| r.recipe_version_id).collect();
        let products = self.load_products(&product_ids).await?;
        let recipes = self.load_recipe_versions(&version_ids).await?;

        rows.into_iter()
            .map(|r| -> anyhow::Result<ConsumptionEvent> {
                let item = match (r.product_id, r.weight_g, r.recipe_version_id, r.water_ml) {
                    (Some(product_id), Some(weight_g), None, None) => {
                        let product = products
                            .get(&product_id)
                            .cloned()
                            .ok_or_else(|| anyhow!("event {} references missing product {product_id}", r.id))?;
                        ConsumedItem::Portion(PortionLine { product, weight_g })
                    }
                    (None, None, Some(version_id), None) => {
                        let recipe = recipes
                            .get(&version_id)
                            .cloned()
                            .ok_or_else(|| anyhow!("event {} references missing recipe {version_id}", r.id))?;
                        ConsumedItem::Recipe(recipe)
                    }
                    (None, None, None, Some(volume_ml)) => ConsumedItem::Water { volume_ml },
                    _ => return Err(anyhow!("event {} has an inconsistent payload", r.id)),
                };
                Ok(ConsumptionEvent {
                    id: r.id,
                    profile_id: r.profile_id,
                    eaten_at: r.eaten_at,
                    item,
                })
            })
            .collect()
    }

    async fn record_event(
        &self,
        profile_id: Uuid,
        payload: EventPayload,
        eaten_at: OffsetDateTime,
    ) -> anyhow::Result<Uuid> {
        let (product_id, weight_g, recipe_version_id, water_ml) = match payload {
            EventPayload::Portion(p) => (Some(p.product_id), Some(p.weight_g), None, None),
            EventPayload::RecipeVersion(id) => (None, None, Some(id), None),
            EventPayload::Water(volume) => (None, None, None, Some(volume)),
        };
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO consumption_events
                   (id, profile_id, eaten_at, product_id, weight_g, recipe_version_id, water_ml)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(profile_id)
        .bind(eaten_at)
        .bind(product_id)
        .bind(weight_g)
        .bind(recipe_version_id)
        .bind(water_ml)
        .execute(&self.db)
        .await
        .context("insert consumption event")?;
        Ok(id)
    }

    async fn delete_event(&self, profile_id: Uuid, event_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM consumption_events WHERE id = $1 AND profile_id = $2")
            .bind(event_id)
            .bind(profile_id)
            .execute(&self.db)
            .await
            .context("delete consumption event")?;
        Ok(result.rows_affected() > 0)
    }

    async fn current_recipe(&self, recipe_id: Uuid) -> anyhow::Result<Option<RecipeVersion>> {
        let version_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM recipe_versions WHERE recipe_id = $1 AND is_current",
        )
        .bind(recipe_id)
        .fetch_optional(&self.db)
        .await
        .context("select current recipe version")?;

        match version_id {
            Some(id) => Ok(self.load_recipe_versions(&[id]).await?.remove(&id)),
            None => Ok(None),
        }
    }

    async fn create_recipe(
        &self,
        profile_id: Uuid,
        new: &NewRecipe,
    ) -> anyhow::Result<RecipeVersion> {
        let mut tx = self.db.begin().await.context("begin recipe tx")?;
        let version_id = insert_recipe_version_tx(&mut tx, Uuid::new_v4(), 1, profile_id, new).await?;
        tx.commit().await.context("commit recipe tx")?;
        self.load_recipe_version(version_id).await
    }

    async fn revise_recipe(
        &self,
        recipe_id: Uuid,
        new: &NewRecipe,
    ) -> anyhow::Result<Option<RecipeVersion>> {
        let mut tx = self.db.begin().await.context("begin recipe revision tx")?;
        // Serialises revisions of one recipe, so the UPDATE below always sees the
        // version committed by a concurrent reviser.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await
            .context("lock recipe for revision")?;
        let retired: Option<(i32, Uuid)> = sqlx::query_as(
            r#"
            UPDATE recipe_versions
               SET is_current = FALSE
             WHERE recipe_id = $1 AND is_current
            RETURNING version, profile_id
            "#,
        )
        .bind(recipe_id)
        .fetch_optional(&mut *tx)
        .await
        .context("retire current recipe version")?;

        let Some((version, profile_id)) = retired else {
            tx.rollback().await.context("rollback recipe revision tx")?;
            return Ok(None);
        };

        let version_id =
            insert_recipe_version_tx(&mut tx, recipe_id, version + 1, profile_id, new).await?;
        tx.commit().await.context("commit recipe revision tx")?;
        self.load_recipe_version(version_id).await.map(Some)
    }
}
