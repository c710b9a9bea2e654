//! Route handlers for the resource API.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::server::AppState;
use crate::http::RequestContext;
use crate::records::{
    AnalysisResult, BusinessProfile, BusinessProfileInput, Consultation, NewAnalysis,
    NewConsultation,
};

type Created<T> = Result<(StatusCode, Json<T>), ApiError>;

fn parse_id(raw: &str, what: &'static str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(what))
}

fn log_sanitized(ctx: &RequestContext, route: &'static str) {
    if ctx.body_was_sanitized() {
        tracing::info!(route, agent = ctx.is_agent_request, "Stored sanitized input");
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route")
}

pub async fn create_consultation(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<NewConsultation>, JsonRejection>,
) -> Created<Consultation> {
    let Json(input) = payload?;
    let record = input.validate()?.into_record(ctx.is_agent_request);
    log_sanitized(&ctx, "consultations");
    let record = state.store.consultations.insert(record);
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_consultations(State(state): State<AppState>) -> Json<Vec<Consultation>> {
    Json(state.store.consultations.list())
}

pub async fn get_consultation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Consultation>, ApiError> {
    let id = parse_id(&id, "Consultation")?;
    state
        .store
        .consultations
        .get(&id)
        .map(Json)
        .ok_or(ApiError::NotFound("Consultation"))
}

pub async fn delete_consultation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, "Consultation")?;
    state
        .store
        .consultations
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(ApiError::NotFound("Consultation"))
}

pub async fn create_business_profile(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<BusinessProfileInput>, JsonRejection>,
) -> Created<BusinessProfile> {
    let Json(input) = payload?;
    let record = input.validate()?.into_record(ctx.is_agent_request);
    log_sanitized(&ctx, "business_profiles");
    let record = state.store.business_profiles.insert(record);
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_business_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BusinessProfile>, ApiError> {
    let id = parse_id(&id, "Business profile")?;
    state
        .store
        .business_profiles
        .get(&id)
        .map(Json)
        .ok_or(ApiError::NotFound("Business profile"))
}

pub async fn update_business_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<BusinessProfileInput>, JsonRejection>,
) -> Result<Json<BusinessProfile>, ApiError> {
    let id = parse_id(&id, "Business profile")?;
    let Json(input) = payload?;
    let input = input.validate()?;
    state
        .store
        .business_profiles
        .update(&id, |profile| input.apply_to(profile))
        .map(Json)
        .ok_or(ApiError::NotFound("Business profile"))
}

pub async fn list_profile_analyses(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AnalysisResult>>, ApiError> {
    let id = parse_id(&id, "Business profile")?;
    if !state.store.business_profiles.contains(&id) {
        return Err(ApiError::NotFound("Business profile"));
    }
    Ok(Json(state.store.analyses_for(&id)))
}

pub async fn create_analysis(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<NewAnalysis>, JsonRejection>,
) -> Created<AnalysisResult> {
    let Json(input) = payload?;
    let input = input.validate()?;
    if !state.store.business_profiles.contains(&input.business_profile_id) {
        return Err(ApiError::NotFound("Business profile"));
    }
    let record = input.into_record(ctx.is_agent_request);
    log_sanitized(&ctx, "analyses");
    let record = state.store.analyses.insert(record);
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let id = parse_id(&id, "Analysis")?;
    state
        .store
        .analyses
        .get(&id)
        .map(Json)
        .ok_or(ApiError::NotFound("Analysis"))
}
