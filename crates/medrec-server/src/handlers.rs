use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use medrec_api::{ApiError, PageEnvelope};
use medrec_core::Validate;
use medrec_db_postgres::TenantPool;
use medrec_storage::{
    ChildResource, EncounterScoped, PageRequest, PatientScoped, Resource, SearchQuery,
    TenantContext,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::extract::{ApiJson, ApiPath, QueryPairs, Tenant};
use crate::state::{ChildState, ResourceState};

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    pub status: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "MedRec Server",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz(State(tenants): State<TenantPool>) -> impl IntoResponse {
    match tenants.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "ready" })),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                }),
            )
        }
    }
}

// ==================== CRUD and search ====================

pub async fn create_resource<R: Resource + Validate>(
    State(state): State<ResourceState<R>>,
    Tenant(ctx): Tenant,
    ApiJson(resource): ApiJson<R>,
) -> Result<(StatusCode, Json<R>), ApiError> {
    let created = state.service.create(&ctx, resource).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn read_resource<R: Resource + Validate>(
    State(state): State<ResourceState<R>>,
    Tenant(ctx): Tenant,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<R>, ApiError> {
    Ok(Json(state.service.get(&ctx, id).await?))
}

pub async fn read_resource_by_fhir_id<R: Resource + Validate>(
    State(state): State<ResourceState<R>>,
    Tenant(ctx): Tenant,
    ApiPath(fhir_id): ApiPath<String>,
) -> Result<Json<R>, ApiError> {
    Ok(Json(state.service.get_by_fhir_id(&ctx, &fhir_id).await?))
}

pub async fn update_resource<R: Resource + Validate>(
    State(state): State<ResourceState<R>>,
    Tenant(ctx): Tenant,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(resource): ApiJson<R>,
) -> Result<Json<R>, ApiError> {
    Ok(Json(state.service.update(&ctx, id, resource).await?))
}

pub async fn delete_resource<R: Resource + Validate>(
    State(state): State<ResourceState<R>>,
    Tenant(ctx): Tenant,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn search_resource<R: Resource + Validate>(
    State(state): State<ResourceState<R>>,
    Tenant(ctx): Tenant,
    query: QueryPairs,
) -> Result<Json<PageEnvelope<R>>, ApiError> {
    let (page, parsed) = parse_search::<R>(&state, &query)?;
    run_search(&state, &ctx, parsed, page).await
}

/// `GET /patients/{id}/<resources>`
pub async fn search_patient_compartment<R: PatientScoped + Validate>(
    State(state): State<ResourceState<R>>,
    Tenant(ctx): Tenant,
    ApiPath(patient_id): ApiPath<Uuid>,
    query: QueryPairs,
) -> Result<Json<PageEnvelope<R>>, ApiError> {
    let (page, parsed) = parse_search::<R>(&state, &query)?;
    let parsed = parsed.with_filter(R::patient_filter(patient_id));
    run_search(&state, &ctx, parsed, page).await
}

/// `GET /encounters/{id}/<resources>`
pub async fn search_encounter_compartment<R: EncounterScoped + Validate>(
    State(state): State<ResourceState<R>>,
    Tenant(ctx): Tenant,
    ApiPath(encounter_id): ApiPath<Uuid>,
    query: QueryPairs,
) -> Result<Json<PageEnvelope<R>>, ApiError> {
    let (page, parsed) = parse_search::<R>(&state, &query)?;
    let parsed = parsed.with_filter(R::encounter_filter(encounter_id));
    run_search(&state, &ctx, parsed, page).await
}

fn parse_search<R: Resource>(
    state: &ResourceState<R>,
    query: &QueryPairs,
) -> Result<(PageRequest, SearchQuery<R::Filter>), ApiError> {
    let page = state.settings.page_request(query)?;
    let parsed = SearchQuery::<R::Filter>::parse(query.iter())?;
    Ok((page, parsed))
}

async fn run_search<R: Resource + Validate>(
    state: &ResourceState<R>,
    ctx: &TenantContext,
    query: SearchQuery<R::Filter>,
    page: PageRequest,
) -> Result<Json<PageEnvelope<R>>, ApiError> {
    if !query.ignored.is_empty() {
        tracing::debug!(
            resource_type = R::RESOURCE_TYPE,
            ignored = ?query.ignored,
            "ignoring unsupported search parameters"
        );
    }
    let result = state.service.search(ctx, &query.filters, page).await?;
    Ok(Json(PageEnvelope::with_ignored(result, query.ignored)))
}

// ==================== Child collections ====================

pub async fn list_children<C: ChildResource + Validate>(
    State(state): State<ChildState<C>>,
    Tenant(ctx): Tenant,
    ApiPath(parent_id): ApiPath<Uuid>,
) -> Result<Json<Vec<C>>, ApiError> {
    Ok(Json(state.service.list(&ctx, parent_id).await?))
}

pub async fn add_child<C: ChildResource + Validate>(
    State(state): State<ChildState<C>>,
    Tenant(ctx): Tenant,
    ApiPath(parent_id): ApiPath<Uuid>,
    ApiJson(child): ApiJson<C>,
) -> Result<(StatusCode, Json<C>), ApiError> {
    let created = state.service.add(&ctx, parent_id, child).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn remove_child<C: ChildResource + Validate>(
    State(state): State<ChildState<C>>,
    Tenant(ctx): Tenant,
    ApiPath((parent_id, child_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.service.remove(&ctx, parent_id, child_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
