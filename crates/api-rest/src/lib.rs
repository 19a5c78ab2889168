//! # API REST
//!
//! Edge relay for the valuation system.
//!
//! Handles:
//! - HTTP endpoints with axum (`/api/predict` plus the insights, chat and image-edit shapes)
//! - Permissive CORS and the JSON not-found / error envelopes
//! - The OpenAPI document
//!
//! The provider credential stays inside the [`ModelGateway`] held by [`RelayState`]; clients
//! only ever talk to this relay. Uses `api-shared` for request and response bodies.

#![warn(rust_2018_idioms)]

pub mod cors;

use api_shared::{
    ChatReq, ChatRes, EditImageReq, EditImageRes, ErrorRes, HealthRes, HealthService,
    InsightsReq, InsightsRes,
};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::de::DeserializeOwned;
use std::fmt::Display;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use valuation_core::{
    AreaUnit, BuyerSellerAdvice, Condition, Coordinates, GroundingLink, Impact, InfluencingFactor,
    MarketTrend, ModelGateway, PredictionResult, PropertyDetails, PropertyType,
};

/// Default request body limit; large enough for an inline photo.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Application state for the relay
///
/// Holds the model gateway shared by every request handler. The gateway is stateless, so
/// handlers never coordinate with each other.
#[derive(Clone)]
pub struct RelayState {
    gateway: ModelGateway,
}

impl RelayState {
    pub fn new(gateway: ModelGateway) -> Self {
        Self { gateway }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, predict, insights, chat, edit_image),
    components(schemas(
        HealthRes,
        ErrorRes,
        PropertyDetails,
        PropertyType,
        AreaUnit,
        Condition,
        PredictionResult,
        InfluencingFactor,
        Impact,
        MarketTrend,
        BuyerSellerAdvice,
        GroundingLink,
        InsightsReq,
        InsightsRes,
        ChatReq,
        ChatRes,
        EditImageReq,
        EditImageRes,
    ))
)]
pub struct ApiDoc;

/// Build the relay router.
///
/// Every route answers unknown methods with the JSON 404 envelope, and the CORS middleware
/// wraps routes and fallback alike so preflight requests never reach a handler.
pub fn router(state: RelayState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health).fallback(not_found))
        .route("/api/predict", post(predict).fallback(not_found))
        .route("/api/insights", post(insights).fallback(not_found))
        .route("/api/chat", post(chat).fallback(not_found))
        .route("/api/edit-image", post(edit_image).fallback(not_found))
        .route("/api-docs/openapi.json", get(openapi).fallback(not_found))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(axum::middleware::from_fn(cors::cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Failure of a relay handler, rendered as `500 {"error": "Internal Server Error", "details"}`.
#[derive(Debug)]
pub struct ApiError(String);

impl ApiError {
    fn internal(context: &str, err: impl Display) -> Self {
        tracing::error!("{context}: {err}");
        Self(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorRes::internal(self.0)),
        )
            .into_response()
    }
}

async fn not_found() -> (StatusCode, Json<ErrorRes>) {
    (StatusCode::NOT_FOUND, Json(ErrorRes::not_found()))
}

/// Parse a JSON body by hand so malformed input lands in the 500 envelope.
fn parse_body<T: DeserializeOwned>(
    context: &str,
    body: Result<Bytes, BytesRejection>,
) -> Result<T, ApiError> {
    let body = body.map_err(|e| ApiError::internal(context, e))?;
    serde_json::from_slice(&body).map_err(|e| ApiError::internal(context, e))
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the relay
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<RelayState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/api/predict",
    request_body = PropertyDetails,
    responses(
        (status = 200, description = "Raw valuation JSON from the model", body = PredictionResult),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Forward property details to the model and return its valuation text verbatim
///
/// The `image` field of the body, if present, is ignored.
///
/// # Errors
/// Returns `500 Internal Server Error` if:
/// - the body is not valid `PropertyDetails` JSON,
/// - the details fail validation, or
/// - the model call fails or returns no text.
#[axum::debug_handler]
async fn predict(
    State(state): State<RelayState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let details: PropertyDetails = parse_body("Predict request", body)?;
    let details = details.without_image();

    let text = state
        .gateway
        .relay_valuation(&details)
        .await
        .map_err(|e| ApiError::internal("Predict error", e))?;

    Ok(([(CONTENT_TYPE, "application/json")], text).into_response())
}

#[utoipa::path(
    post,
    path = "/api/insights",
    request_body = InsightsReq,
    responses(
        (status = 200, description = "Grounded location insights", body = InsightsRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Search/maps grounded narrative about a location
///
/// The coordinates are used as a retrieval hint only when both are supplied.
#[axum::debug_handler]
async fn insights(
    State(state): State<RelayState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<InsightsRes>, ApiError> {
    let req: InsightsReq = parse_body("Insights request", body)?;
    let coords = req.lat.zip(req.lng).map(|(lat, lng)| Coordinates::new(lat, lng));

    let insights = state
        .gateway
        .deep_insights(&req.location, coords)
        .await
        .map_err(|e| ApiError::internal("Insights error", e))?;

    Ok(Json(InsightsRes {
        text: insights.text,
        links: insights.links,
    }))
}

#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatReq,
    responses(
        (status = 200, description = "Consultant reply", body = ChatRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// One consultant reply, grounded in the supplied valuation when present
#[axum::debug_handler]
async fn chat(
    State(state): State<RelayState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ChatRes>, ApiError> {
    let req: ChatReq = parse_body("Chat request", body)?;

    let reply = state
        .gateway
        .chat(&req.message, req.context.as_ref())
        .await
        .map_err(|e| ApiError::internal("Chat error", e))?;

    Ok(Json(ChatRes { reply }))
}

#[utoipa::path(
    post,
    path = "/api/edit-image",
    request_body = EditImageReq,
    responses(
        (status = 200, description = "Edited image as a data URI", body = EditImageRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn edit_image(
    State(state): State<RelayState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<EditImageRes>, ApiError> {
    let req: EditImageReq = parse_body("Edit image request", body)?;

    let image = state
        .gateway
        .edit_image(&req.image, &req.instruction, req.property_type.as_deref())
        .await
        .map_err(|e| ApiError::internal("Edit image error", e))?;

    Ok(Json(EditImageRes { image }))
}
