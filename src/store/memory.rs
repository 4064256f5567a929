//! In-process implementation of every store trait. Products are indexed by id so scans
//! run in id order, matching the tie-breaks of the SQL adapters.

use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::catalog::repo::CatalogStore;
use crate::db::utc_day_bounds;
use crate::catalog::repo_types::{Exclusions, MacroProportions, MacroWeight, ProductRecord};
use crate::intake::repo::ConsumptionLog;
use crate::intake::repo_types::{
    ConsumedItem, ConsumptionEvent, EventPayload, NewPortion, NewRecipe, PortionLine,
    RecipeVersion,
};
use crate::profiles::repo::ProfileStore;
use crate::profiles::repo_types::{
    Measurement, NewMeasurement, NewProfile, Profile, ProfileUpdate,
};

#[derive(Debug, Clone)]
struct StoredRecipe {
    version_id: Uuid,
    recipe_id: Uuid,
    version: i32,
    profile_id: Uuid,
    title: String,
    description: Option<String>,
    is_current: bool,
    lines: Vec<NewPortion>,
}

#[derive(Debug, Clone)]
struct StoredEvent {
    id: Uuid,
    profile_id: Uuid,
    eaten_at: OffsetDateTime,
    payload: EventPayload,
}

#[derive(Debug, Default)]
struct Inner {
    profiles: HashMap<Uuid, Profile>,
    measurements: Vec<Measurement>,
    products: BTreeMap<i64, ProductRecord>,
    recipes: HashMap<Uuid, StoredRecipe>,
    events: Vec<StoredEvent>,
}

impl Inner {
    fn product(&self, id: i64) -> anyhow::Result<ProductRecord> {
        self.products
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("missing product {id}"))
    }

    fn resolve_recipe(&self, stored: &StoredRecipe) -> anyhow::Result<RecipeVersion> {
        let lines = stored
            .lines
            .iter()
            .map(|l| -> anyhow::Result<PortionLine> {
                Ok(PortionLine {
                    product: self.product(l.product_id)?,
                    weight_g: l.weight_g,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(RecipeVersion {
            version_id: stored.version_id,
            recipe_id: stored.recipe_id,
            version: stored.version,
            profile_id: stored.profile_id,
            title: stored.title.clone(),
            description: stored.description.clone(),
            is_current: stored.is_current,
            lines,
        })
    }

    fn resolve_event(&self, stored: &StoredEvent) -> anyhow::Result<ConsumptionEvent> {
        let item = match stored.payload {
            EventPayload::Portion(p) => ConsumedItem::Portion(PortionLine {
                product: self.product(p.product_id)?,
                weight_g: p.weight_g,
            }),
            EventPayload::RecipeVersion(version_id) => {
                let recipe = self
                    .recipes
                    .get(&version_id)
                    .ok_or_else(|| anyhow!("missing recipe version {version_id}"))?;
                ConsumedItem::Recipe(self.resolve_recipe(recipe)?)
            }
            EventPayload::Water(volume_ml) => ConsumedItem::Water { volume_ml },
        };
        Ok(ConsumptionEvent {
            id: stored.id,
            profile_id: stored.profile_id,
            eaten_at: stored.eaten_at,
            item,
        })
    }

    fn insert_recipe(
        &mut self,
        recipe_id: Uuid,
        version: i32,
        profile_id: Uuid,
        new: &NewRecipe,
    ) -> anyhow::Result<RecipeVersion> {
        let stored = StoredRecipe {
            version_id: Uuid::new_v4(),
            recipe_id,
            version,
            profile_id,
            title: new.title.clone(),
            description: new.description.clone(),
            is_current: true,
            lines: new.lines.clone(),
        };
        let resolved = self.resolve_recipe(&stored)?;
        self.recipes.insert(stored.version_id, stored);
        Ok(resolved)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads catalog products from a JSON array, replacing products with the same id.
    pub async fn seed_catalog(&self, json: &[u8]) -> anyhow::Result<usize> {
        let products: Vec<ProductRecord> =
            serde_json::from_slice(json).context("parse catalog seed")?;
        let count = products.len();
        let mut inner = self.inner.write().await;
        for product in products {
            inner.products.insert(product.id, product);
        }
        Ok(count)
    }

    #[cfg(test)]
    pub async fn insert_profile(&self, profile: Profile) {
        self.inner.write().await.profiles.insert(profile.id, profile);
    }

    #[cfg(test)]
    pub async fn insert_product(&self, product: ProductRecord) {
        self.inner.write().await.products.insert(product.id, product);
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, profile_id: Uuid) -> anyhow::Result<Option<Profile>> {
        Ok(self.inner.read().await.profiles.get(&profile_id).cloned())
    }

    async fn create_profile(&self, new: NewProfile) -> anyhow::Result<Profile> {
        let profile = Profile {
            id: Uuid::new_v4(),
            gender: new.gender,
            age: new.age,
            height_cm: new.height_cm,
            hand_cm: new.hand_cm,
            activity: new.activity,
            excluded_products: Vec::new(),
            excluded_categories: Vec::new(),
        };
        self.inner
            .write()
            .await
            .profiles
            .insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn update_profile(
        &self,
        profile_id: Uuid,
        update: ProfileUpdate,
    ) -> anyhow::Result<Option<Profile>> {
        let mut inner = self.inner.write().await;
        Ok(inner.profiles.get_mut(&profile_id).map(|profile| {
            update.apply(profile);
            profile.clone()
        }))
    }

    async fn get_latest_measurement(
        &self,
        profile_id: Uuid,
        on_or_before: Date,
    ) -> anyhow::Result<Option<Measurement>> {
        let (_, day_end) = utc_day_bounds(on_or_before);
        let inner = self.inner.read().await;
        Ok(inner
            .measurements
            .iter()
            .filter(|m| m.profile_id == profile_id && m.taken_at < day_end)
            .max_by_key(|m| m.taken_at)
            .cloned())
    }

    async fn append_measurement(
        &self,
        profile_id: Uuid,
        new: NewMeasurement,
    ) -> anyhow::Result<Measurement> {
        let measurement = Measurement {
            id: Uuid::new_v4(),
            profile_id,
            weight_kg: new.weight_kg,
            hand_cm: new.hand_cm,
            chest_cm: new.chest_cm,
            waist_cm: new.waist_cm,
            hips_cm: new.hips_cm,
            taken_at: new.taken_at.unwrap_or_else(OffsetDateTime::now_utc),
        };
        self.inner.write().await.measurements.push(measurement.clone());
        Ok(measurement)
    }

    async fn set_exclusions(
        &self,
        profile_id: Uuid,
        product_ids: &[i64],
        category_ids: &[i64],
    ) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        let profile = inner
            .profiles
            .get_mut(&profile_id)
            .ok_or_else(|| anyhow!("missing profile {profile_id}"))?;
        profile.excluded_products = product_ids.to_vec();
        profile.excluded_categories = category_ids.to_vec();
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get(&self, product_id: i64) -> anyhow::Result<Option<ProductRecord>> {
        Ok(self.inner.read().await.products.get(&product_id).cloned())
    }

    async fn rank_by_macro_distance(
        &self,
        primary: MacroWeight,
        secondary: MacroWeight,
        exclusions: &Exclusions,
        limit: usize,
    ) -> anyhow::Result<Vec<ProductRecord>> {
        let inner = self.inner.read().await;
        let mut nearest: Vec<(f64, &ProductRecord)> = inner
            .products
            .values()
            .filter(|p| p.category.is_some() && !exclusions.excludes(p))
            .map(|p| (primary.distance(&p.macro_shares()), p))
            .collect();
        nearest.sort_by(|a, b| a.0.total_cmp(&b.0));
        nearest.truncate(limit);
        nearest.sort_by(|a, b| {
            secondary
                .distance(&a.1.macro_shares())
                .total_cmp(&secondary.distance(&b.1.macro_shares()))
        });
        Ok(nearest.into_iter().map(|(_, p)| p.clone()).collect())
    }

    async fn filter_by_proportion_range(
        &self,
        target: &MacroProportions,
        tolerance: f64,
        exclusions: &Exclusions,
    ) -> anyhow::Result<Option<ProductRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .values()
            .find(|p| {
                p.category.is_some()
                    && !exclusions.excludes(p)
                    && p.macro_shares().within(target, tolerance)
            })
            .cloned())
    }

    async fn search_by_title(
        &self,
        query: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<ProductRecord>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .values()
            .filter(|p| p.title.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ConsumptionLog for MemoryStore {
    async fn list_events(
        &self,
        profile_id: Uuid,
        date: Date,
    ) -> anyhow::Result<Vec<ConsumptionEvent>> {
        let (start, end) = utc_day_bounds(date);
        let inner = self.inner.read().await;
        let mut day: Vec<&StoredEvent> = inner
            .events
            .iter()
            .filter(|e| e.profile_id == profile_id && (start..end).contains(&e.eaten_at))
            .collect();
        day.sort_by_key(|e| (e.eaten_at, e.id));
        day.into_iter().map(|e| inner.resolve_event(e)).collect()
    }

    async fn record_event(
        &self,
        profile_id: Uuid,
        payload: EventPayload,
        eaten_at: OffsetDateTime,
    ) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        self.inner.write().await.events.push(StoredEvent {
            id,
            profile_id,
            eaten_at,
            payload,
        });
        Ok(id)
    }

    async fn delete_event(&self, profile_id: Uuid, event_id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.events.len();
        inner
            .events
            .retain(|e| !(e.id == event_id && e.profile_id == profile_id));
        Ok(inner.events.len() < before)
    }

    async fn current_recipe(&self, recipe_id: Uuid) -> anyhow::Result<Option<RecipeVersion>> {
        let inner = self.inner.read().await;
        inner
            .recipes
            .values()
            .find(|r| r.recipe_id == recipe_id && r.is_current)
            .map(|r| inner.resolve_recipe(r))
            .transpose()
    }

    async fn create_recipe(
        &self,
        profile_id: Uuid,
        new: &NewRecipe,
    ) -> anyhow::Result<RecipeVersion> {
        self.inner
            .write()
            .await
            .insert_recipe(Uuid::new_v4(), 1, profile_id, new)
    }

    async fn revise_recipe(
        &self,
        recipe_id: Uuid,
        new: &NewRecipe,
    ) -> anyhow::Result<Option<RecipeVersion>> {
        let mut inner = self.inner.write().await;
        for line in &new.lines {
            inner.product(line.product_id)?;
        }
        let Some(current) = inner
            .recipes
            .values_mut()
            .find(|r| r.recipe_id == recipe_id && r.is_current)
        else {
            return Ok(None);
        };
        current.is_current = false;
        let (version, profile_id) = (current.version, current.profile_id);
        inner
            .insert_recipe(recipe_id, version + 1, profile_id, new)
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::repo_types::{ActivityLevel, Gender};

    #[tokio::test]
    async fn demo_catalog_seeds_the_store() {
        let store = MemoryStore::new();
        let count = store
            .seed_catalog(include_bytes!("../../demos/catalog.json"))
            .await
            .unwrap();
        assert_eq!(count, 12);

        let honey = store.get(12).await.unwrap().unwrap();
        assert!(honey.category.is_none());
        assert!(honey.shares.is_none());
        let hits = store.search_by_title("bread", 20).await.unwrap();
        assert_eq!(hits.iter().map(|p| p.id).collect::<Vec<_>>(), vec![7]);
    }

    #[tokio::test]
    async fn malformed_seed_is_rejected() {
        let store = MemoryStore::new();
        let err = store.seed_catalog(br#"[{"id": 1}]"#).await.unwrap_err();
        assert!(err.to_string().contains("parse catalog seed"));
        assert!(store.get(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn updating_an_unknown_profile_finds_nothing() {
        let store = MemoryStore::new();
        let created = store
            .create_profile(NewProfile {
                gender: Gender::Female,
                age: 25,
                height_cm: 160.0,
                hand_cm: 16.0,
                activity: ActivityLevel::LightPhysical,
            })
            .await
            .unwrap();
        assert_eq!(store.get_profile(created.id).await.unwrap().unwrap().age, 25);

        let update = ProfileUpdate {
            age: Some(26),
            ..ProfileUpdate::default()
        };
        assert!(store
            .update_profile(Uuid::new_v4(), update.clone())
            .await
            .unwrap()
            .is_none());
        let updated = store.update_profile(created.id, update).await.unwrap().unwrap();
        assert_eq!(updated.age, 26);
        assert_eq!(updated.activity, ActivityLevel::LightPhysical);
    }
}
