//! Route handlers for `/api/entities`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::entities::model::{CreateEntity, Entity, UpdateEntity};
use crate::entities::EntitiesState;
use crate::error::AppError;
use crate::http::extract::ApiJson;
use crate::observability::logger::{log_execution, LogContext};
use crate::observability::CorrelationId;
use crate::tenancy::Tenant;

fn op_context(tenant: &Tenant, correlation_id: &CorrelationId) -> LogContext {
    LogContext::new()
        .with("tenantId", tenant.0.slug.as_str())
        .with("correlationId", correlation_id.as_str())
}

pub async fn list_entities(
    State(state): State<EntitiesState>,
    tenant: Tenant,
) -> Json<Vec<Entity>> {
    Json(state.store.list(&tenant.0.slug))
}

pub async fn get_entity(
    State(state): State<EntitiesState>,
    tenant: Tenant,
    Path(id): Path<String>,
) -> Result<Json<Entity>, AppError> {
    state.store.get(&tenant.0.slug, &id).map(Json)
}

pub async fn create_entity(
    State(state): State<EntitiesState>,
    correlation_id: CorrelationId,
    tenant: Tenant,
    ApiJson(input): ApiJson<CreateEntity>,
) -> Result<(StatusCode, Json<Entity>), AppError> {
    let context = op_context(&tenant, &correlation_id);
    let entity = log_execution(&state.logger, "entities.create", context, async {
        state.store.create(&tenant.0.slug, input)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

pub async fn update_entity(
    State(state): State<EntitiesState>,
    correlation_id: CorrelationId,
    tenant: Tenant,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateEntity>,
) -> Result<Json<Entity>, AppError> {
    let context = op_context(&tenant, &correlation_id).with("entityId", id.as_str());
    log_execution(&state.logger, "entities.update", context, async {
        state.store.update(&tenant.0.slug, &id, input)
    })
    .await
    .map(Json)
}

pub async fn delete_entity(
    State(state): State<EntitiesState>,
    correlation_id: CorrelationId,
    tenant: Tenant,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let context = op_context(&tenant, &correlation_id).with("entityId", id.as_str());
    log_execution(&state.logger, "entities.delete", context, async {
        state.store.delete(&tenant.0.slug, &id)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
