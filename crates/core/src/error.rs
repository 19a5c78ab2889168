//! Error taxonomy for the valuation core.
//!
//! Transport problems and malformed provider output are captured by [`GatewayError`]. Each
//! gateway operation wraps it in its own error so callers can apply the right policy: chat
//! failures become a fallback reply, image-edit failures are shown to the user, valuation and
//! grounding failures abort the wizard submission.

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),
    #[error("model provider unreachable: {0}")]
    Network(reqwest::Error),
    #[error("model provider returned status {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("failed to decode model provider response: {0}")]
    Decode(serde_json::Error),
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, thiserror::Error)]
pub enum ValuationError {
    #[error("invalid property details: {0}")]
    InvalidDetails(#[source] ValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("valuation engine returned no text")]
    EmptyResponse,
    #[error("valuation engine returned malformed JSON: {0}")]
    Malformed(serde_json::Error),
    #[error("valuation engine returned an inconsistent result: {0}")]
    Invalid(#[source] ValidationError),
}

pub type ValuationResult<T> = std::result::Result<T, ValuationError>;

#[derive(Debug, thiserror::Error)]
pub enum InsightsError {
    #[error("location is required for grounded insights")]
    MissingLocation,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub type InsightsResult<T> = std::result::Result<T, InsightsError>;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("assistant returned no text")]
    EmptyReply,
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;

#[derive(Debug, thiserror::Error)]
pub enum ImageEditError {
    #[error("edit instruction cannot be empty")]
    EmptyInstruction,
    #[error("image is not valid base64 data: {0}")]
    InvalidImage(base64::DecodeError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("model response contained no image")]
    NoImage,
}

pub type ImageEditResult<T> = std::result::Result<T, ImageEditError>;

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoder unreachable: {0}")]
    Network(reqwest::Error),
    #[error("geocoder returned status {0}")]
    Status(u16),
    #[error("geocoder returned malformed coordinates: {0}")]
    Malformed(String),
}

pub type GeocodeResult<T> = std::result::Result<T, GeocodeError>;

/// Failures of a wizard submission. Any of these leaves the wizard on its last step.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("a valuation is already in progress")]
    InFlight,
    #[error("submission is only possible from the condition step")]
    NotReady,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Valuation(#[from] ValuationError),
    #[error("grounded insights failed: {0}")]
    Insights(#[from] InsightsError),
}

pub type SubmitResult<T> = std::result::Result<T, SubmitError>;
