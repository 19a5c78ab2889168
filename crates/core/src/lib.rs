//! # Valuation Core
//!
//! Core logic for the property valuation system.
//!
//! This crate holds the domain types and everything that talks to the outside world on the
//! client side:
//! - Property details and valuation results, with their invariants
//! - The model gateway (valuation, grounded insights, chat, image edit)
//! - Forward and reverse geocoding
//! - State machines for the form wizard, dashboard live feed, media editor, chat and the
//!   application controller
//!
//! **No server concerns**: HTTP routing, CORS and response envelopes belong in `api-rest`.

pub mod app;
pub mod chat;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod gateway;
pub mod geocoding;
pub mod media;
pub mod prediction;
pub mod property;
pub mod validation;
pub mod wizard;

pub use app::{AppView, ValuationApp};
pub use chat::{ChatMessage, ChatRole, ChatSession};
pub use config::{core_config_from_lookup, runtime_settings_from_lookup, CoreConfig, RuntimeSettings};
pub use dashboard::{
    spawn_live_feed, LiveFeed, LiveFeedConfig, LiveQuote, MarketScenario, TimeFilter,
};
pub use error::{
    ChatError, GatewayError, GeocodeError, ImageEditError, InsightsError, SubmitError,
    ValidationError, ValuationError,
};
pub use gateway::{DeepInsights, GeminiClient, ModelClient, ModelGateway};
pub use geocoding::{Geocoder, NominatimClient};
pub use media::{ImageHistory, MediaEditor};
pub use prediction::{
    BuyerSellerAdvice, GroundingLink, Impact, InfluencingFactor, MarketTrend, PredictionResult,
};
pub use property::{AreaUnit, Condition, Coordinates, PropertyDetails, PropertyType};
pub use wizard::{PredictionWizard, WizardStep};
