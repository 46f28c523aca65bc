//! In-memory tenant-scoped entity store.

use std::sync::Arc;

use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};

use crate::entities::model::{CreateEntity, Entity, UpdateEntity};
use crate::error::AppError;

/// Resource name reported in not-found details.
pub const RESOURCE: &str = "Entity";

/// Concurrent store keyed by (tenant, id).
///
/// Names are unique per tenant, case-insensitively. Uniqueness is enforced by
/// `names`, a (tenant, lowercased name) → id index claimed through `entry()`
/// before the entity map is touched. No guard on one map is ever held while
/// locking the other.
#[derive(Clone, Default)]
pub struct EntityStore {
    inner: Arc<DashMap<(String, String), Entity>>,
    names: Arc<DashMap<(String, String), String>>,
}

fn name_key(tenant: &str, name: &str) -> (String, String) {
    (tenant.to_string(), name.to_lowercase())
}

fn name_conflict(name: &str) -> AppError {
    AppError::conflict(format!("Entity named '{}' already exists", name))
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self, tenant: &str) -> Vec<Entity> {
        let mut items: Vec<Entity> = self
            .inner
            .iter()
            .filter(|e| e.key().0 == tenant)
            .map(|e| e.value().clone())
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        items
    }

    pub fn get(&self, tenant: &str, id: &str) -> Result<Entity, AppError> {
        self.inner
            .get(&(tenant.to_string(), id.to_string()))
            .map(|e| e.value().clone())
            .ok_or_else(|| AppError::not_found(RESOURCE, id))
    }

    /// Reserve `name` for `id`. Succeeds if the name is free or already `id`'s.
    fn claim_name(&self, tenant: &str, name: &str, id: &str) -> Result<(), AppError> {
        match self.names.entry(name_key(tenant, name)) {
            Entry::Occupied(owner) if owner.get() != id => Err(name_conflict(name)),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(id.to_string());
                Ok(())
            }
        }
    }

    fn release_name(&self, tenant: &str, name: &str, id: &str) {
        self.names.remove_if(&name_key(tenant, name), |_, owner| owner == id);
    }

    pub fn create(&self, tenant: &str, input: CreateEntity) -> Result<Entity, AppError> {
        input.validate()?;
        let name = input.name.trim().to_string();
        let id = format!("entity-{}", uuid::Uuid::new_v4().simple());
        self.claim_name(tenant, &name, &id)?;

        let now = Utc::now();
        let entity = Entity {
            id,
            tenant_id: tenant.to_string(),
            name,
            description: input.description,
            created_at: now,
            updated_at: now,
        };
        self.inner
            .insert((tenant.to_string(), entity.id.clone()), entity.clone());
        Ok(entity)
    }

    pub fn update(&self, tenant: &str, id: &str, input: UpdateEntity) -> Result<Entity, AppError> {
        input.validate()?;
        let name = input.name.map(|n| n.trim().to_string());
        if let Some(name) = &name {
            self.claim_name(tenant, name, id)?;
        }

        let (updated, previous_name) = {
            let Some(mut entry) = self.inner.get_mut(&(tenant.to_string(), id.to_string())) else {
                if let Some(name) = &name {
                    self.release_name(tenant, name, id);
                }
                return Err(AppError::not_found(RESOURCE, id));
            };
            let entity = entry.value_mut();
            let previous_name = match name {
                Some(name) => Some(std::mem::replace(&mut entity.name, name)),
                None => None,
            };
            if input.description.is_some() {
                entity.description = input.description;
            }
            entity.updated_at = Utc::now();
            (entity.clone(), previous_name)
        };

        if let Some(previous) = previous_name {
            if previous.to_lowercase() != updated.name.to_lowercase() {
                self.release_name(tenant, &previous, id);
            }
        }
        Ok(updated)
    }

    pub fn delete(&self, tenant: &str, id: &str) -> Result<(), AppError> {
        let (_, removed) = self
            .inner
            .remove(&(tenant.to_string(), id.to_string()))
            .ok_or_else(|| AppError::not_found(RESOURCE, id))?;
        self.release_name(tenant, &removed.name, id);
        Ok(())
    }
}
