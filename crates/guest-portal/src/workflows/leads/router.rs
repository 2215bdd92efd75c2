use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use super::domain::{LeadId, Sale};
use super::identity::{Identity, IdentityError, IdentityProvider};
use super::service::{LeadPipelineService, LeadServiceError};
use super::store::RecordStore;

type SharedService<S, I> = Arc<LeadPipelineService<S, I>>;

/// Router builder exposing lead scoring and lifecycle endpoints.
pub fn lead_router<S, I>(service: SharedService<S, I>) -> Router
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    Router::new()
        .route("/api/v1/leads/score", post(score_handler::<S, I>))
        .route(
            "/api/v1/leads",
            get(list_handler::<S, I>).post(submit_handler::<S, I>),
        )
        .route(
            "/api/v1/leads/:lead_id",
            get(fetch_handler::<S, I>).put(save_handler::<S, I>),
        )
        .route("/api/v1/leads/:lead_id/sale", post(sale_handler::<S, I>))
        .with_state(service)
}

pub(crate) async fn score_handler<S, I>(
    State(service): State<SharedService<S, I>>,
    Json(raw): Json<Value>,
) -> Response
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    (StatusCode::OK, Json(service.assess(&raw))).into_response()
}

pub(crate) async fn list_handler<S, I>(
    State(service): State<SharedService<S, I>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    let result = authenticate(&service, &headers).and_then(|identity| service.list(&identity));
    match result {
        Ok(leads) => (StatusCode::OK, Json(json!({ "leads": leads }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<S, I>(
    State(service): State<SharedService<S, I>>,
    headers: HeaderMap,
    Json(raw): Json<Value>,
) -> Response
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    let result =
        authenticate(&service, &headers).and_then(|identity| service.submit(&identity, raw));
    match result {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn fetch_handler<S, I>(
    State(service): State<SharedService<S, I>>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
) -> Response
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    let id = LeadId(lead_id);
    let result = authenticate(&service, &headers).and_then(|identity| service.get(&identity, &id));
    match result {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn save_handler<S, I>(
    State(service): State<SharedService<S, I>>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
    Json(raw): Json<Value>,
) -> Response
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    let id = LeadId(lead_id);
    let result =
        authenticate(&service, &headers).and_then(|identity| service.save(&identity, &id, raw));
    match result {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn sale_handler<S, I>(
    State(service): State<SharedService<S, I>>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
    Json(sale): Json<Sale>,
) -> Response
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    let id = LeadId(lead_id);
    let result = authenticate(&service, &headers)
        .and_then(|identity| service.record_sale(&identity, &id, sale));
    match result {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

fn authenticate<S, I>(
    service: &LeadPipelineService<S, I>,
    headers: &HeaderMap,
) -> Result<Identity, LeadServiceError>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    service.authenticate(bearer_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

pub(crate) fn error_response(error: LeadServiceError) -> Response {
    let status = match &error {
        LeadServiceError::Identity(IdentityError::Missing | IdentityError::Rejected) => {
            StatusCode::UNAUTHORIZED
        }
        LeadServiceError::Identity(IdentityError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        LeadServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        LeadServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
        LeadServiceError::InvalidRecord
        | LeadServiceError::EmptySale
        | LeadServiceError::SoldWithoutSale(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LeadServiceError::Store(_) | LeadServiceError::Encode(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}
