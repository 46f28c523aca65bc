//! Tenant-scoped entity CRUD.
//!
//! # Responsibilities
//! - Expose list/get/create/update/delete under `/api/entities`
//! - Validate input and raise typed errors (validation, not found, conflict)
//!
//! # Design Decisions
//! - Storage is an in-memory `DashMap`; persistence is out of scope
//! - Every route requires a tenant via the `Tenant` extractor

pub mod handlers;
pub mod model;
pub mod store;

use axum::{routing::get, Router};

use crate::observability::StructuredLogger;

pub use model::{CreateEntity, Entity, UpdateEntity};
pub use store::EntityStore;

#[derive(Clone)]
pub struct EntitiesState {
    pub store: EntityStore,
    pub logger: StructuredLogger,
}

pub fn setup_entities_router(state: EntitiesState) -> Router {
    Router::new()
        .route(
            "/api/entities",
            get(handlers::list_entities).post(handlers::create_entity),
        )
        .route(
            "/api/entities/{id}",
            get(handlers::get_entity)
                .patch(handlers::update_entity)
                .delete(handlers::delete_entity),
        )
        .with_state(state)
}
