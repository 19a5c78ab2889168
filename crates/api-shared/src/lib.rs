//! # API Shared
//!
//! Wire types shared by the valuation relay and its clients.
//!
//! Contains:
//! - Request and response bodies for every relay endpoint
//! - The error envelope returned on failures
//! - Shared services like `HealthService`
//!
//! The bodies of `/api/predict` are the core types themselves
//! ([`PropertyDetails`] in, [`PredictionResult`] JSON out) and are re-exported here.

pub mod health;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use health::HealthService;
pub use valuation_core::{GroundingLink, PredictionResult, PropertyDetails};

/// Error message used for every unexpected failure.
pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";
/// Error message for unknown paths and methods.
pub const NOT_FOUND: &str = "Not Found";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of every non-2xx relay response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorRes {
    pub fn internal(details: impl Into<String>) -> Self {
        Self {
            error: INTERNAL_SERVER_ERROR.into(),
            details: Some(details.into()),
        }
    }

    pub fn not_found() -> Self {
        Self {
            error: NOT_FOUND.into(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InsightsReq {
    pub location: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InsightsRes {
    pub text: String,
    pub links: Vec<GroundingLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatReq {
    pub message: String,
    /// Valuation to ground the reply in, if one exists.
    #[serde(default)]
    pub context: Option<PredictionResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatRes {
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditImageReq {
    /// Data URI or bare base64 PNG.
    pub image: String,
    pub instruction: String,
    #[serde(default)]
    pub property_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EditImageRes {
    /// Edited image as a data URI.
    pub image: String,
}
