use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{Exclusions, MacroProportions, MacroWeight, ProductRecord, ProductRow};

/// Read-only product catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get(&self, product_id: i64) -> anyhow::Result<Option<ProductRecord>>;

    /// Categorised products nearest to `primary`: the `limit` closest by primary
    /// distance, re-ordered by distance to `secondary`. Ties break by id.
    async fn rank_by_macro_distance(
        &self,
        primary: MacroWeight,
        secondary: MacroWeight,
        exclusions: &Exclusions,
        limit: usize,
    ) -> anyhow::Result<Vec<ProductRecord>>;

    /// First categorised product (by id) whose three shares all lie within
    /// `target ± tolerance`.
    async fn filter_by_proportion_range(
        &self,
        target: &MacroProportions,
        tolerance: f64,
        exclusions: &Exclusions,
    ) -> anyhow::Result<Option<ProductRecord>>;

    /// Case-insensitive title lookup for user-facing search.
    async fn search_by_title(&self, query: &str, limit: usize)
        -> anyhow::Result<Vec<ProductRecord>>;
}

const PRODUCT_COLUMNS: &str = r#"
    id, title, proteins, fats, carbohydrates, calories, water,
    category_id, category_title, protein_share, fat_share, carbohydrate_share
"#;

#[derive(Clone)]
pub struct PgCatalogStore {
    db: PgPool,
}

impl PgCatalogStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn get(&self, product_id: i64) -> anyhow::Result<Option<ProductRecord>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM catalog_products WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(product_id)
            .fetch_optional(&self.db)
            .await
            .context("select product")?;
        Ok(row.map(ProductRecord::from))
    }

    async fn rank_by_macro_distance(
        &self,
        primary: MacroWeight,
        secondary: MacroWeight,
        exclusions: &Exclusions,
        limit: usize,
    ) -> anyhow::Result<Vec<ProductRecord>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
              FROM (
                    SELECT {PRODUCT_COLUMNS}, ABS({primary_col} - $1) AS primary_distance
                      FROM catalog_products
                     WHERE category_id IS NOT NULL
                       AND NOT (id = ANY($3))
                       AND NOT (category_id = ANY($4))
                     ORDER BY primary_distance, id
                     LIMIT $5
                   ) nearest
             ORDER BY ABS({secondary_col} - $2), primary_distance, id
            "#,
            primary_col = primary.nutrient.share_column(),
            secondary_col = secondary.nutrient.share_column(),
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(primary.value)
            .bind(secondary.value)
            .bind(&exclusions.product_ids[..])
            .bind(&exclusions.category_ids[..])
            .bind(i64::try_from(limit)?)
            .fetch_all(&self.db)
            .await
            .context("rank products by macro distance")?;
        Ok(rows.into_iter().map(ProductRecord::from).collect())
    }

    async fn filter_by_proportion_range(
        &self,
        target: &MacroProportions,
        tolerance: f64,
        exclusions: &Exclusions,
    ) -> anyhow::Result<Option<ProductRecord>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
              FROM catalog_products
             WHERE category_id IS NOT NULL
               AND protein_share BETWEEN $1 - $4 AND $1 + $4
               AND fat_share BETWEEN $2 - $4 AND $2 + $4
               AND carbohydrate_share BETWEEN $3 - $4 AND $3 + $4
               AND NOT (id = ANY($5))
               AND NOT (category_id = ANY($6))
             ORDER BY id
             LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(target.proteins)
            .bind(target.fats)
            .bind(target.carbohydrates)
            .bind(tolerance)
            .bind(&exclusions.product_ids[..])
            .bind(&exclusions.category_ids[..])
            .fetch_optional(&self.db)
            .await
            .context("filter products by proportion window")?;
        Ok(row.map(ProductRecord::from))
    }

    async fn search_by_title(
        &self,
        query: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<ProductRecord>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
              FROM catalog_products
             WHERE title ILIKE '%' || $1 || '%'
             ORDER BY id
             LIMIT $2
            "#
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(escape_like(query))
            .bind(i64::try_from(limit)?)
            .fetch_all(&self.db)
            .await
            .context("search products by title")?;
        Ok(rows.into_iter().map(ProductRecord::from).collect())
    }
}
