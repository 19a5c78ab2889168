//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the gateway, the
//! geocoder and the dashboard simulation. Nothing in this crate reads process-wide environment
//! variables during request handling; binaries hand [`core_config_from_lookup`] a lookup
//! function instead.

use crate::constants::{
    DEFAULT_API_BASE, DEFAULT_GEOCODER_BASE, DEFAULT_LIVE_TICK, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_TEXT_MODEL,
};
use crate::dashboard::LiveFeedConfig;
use crate::error::{ValidationError, ValidationResult};
use chrono::Datelike;
use std::time::Duration;

/// Settings that need no model credential: geocoder endpoint, outbound timeout, live-feed
/// period and the year treated as "present".
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    geocoder_base: String,
    request_timeout: Duration,
    live_tick: Duration,
    present_year: i32,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            geocoder_base: DEFAULT_GEOCODER_BASE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            live_tick: DEFAULT_LIVE_TICK,
            present_year: default_present_year(),
        }
    }
}

impl RuntimeSettings {
    pub fn with_geocoder_base(mut self, base: impl Into<String>) -> Self {
        self.geocoder_base = normalise_base_url(&base.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_live_tick(mut self, tick: Duration) -> Self {
        self.live_tick = tick;
        self
    }

    pub fn with_present_year(mut self, year: i32) -> Self {
        self.present_year = year;
        self
    }

    pub fn geocoder_base(&self) -> &str {
        &self.geocoder_base
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn live_tick(&self) -> Duration {
        self.live_tick
    }

    /// The year treated as "present" by prompts and the live-price simulation.
    pub fn present_year(&self) -> i32 {
        self.present_year
    }

    /// Live-feed timing for these settings.
    pub fn live_feed_config(&self) -> LiveFeedConfig {
        LiveFeedConfig::new(self.present_year).with_tick(self.live_tick)
    }
}

/// Core configuration resolved at startup.
#[derive(Clone)]
pub struct CoreConfig {
    api_key: String,
    api_base: String,
    text_model: String,
    image_model: String,
    settings: RuntimeSettings,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("settings", &self.settings)
            .finish()
    }
}

impl CoreConfig {
    /// Create a `CoreConfig` with default endpoints, models and settings.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidInput` if `api_key` is empty.
    pub fn new(api_key: impl Into<String>) -> ValidationResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ValidationError::InvalidInput(
                "model provider API key cannot be empty".into(),
            ));
        }

        Ok(Self {
            api_key,
            api_base: DEFAULT_API_BASE.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_TEXT_MODEL.to_string(),
            settings: RuntimeSettings::default(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = normalise_base_url(&api_base.into());
        self
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    pub fn with_settings(mut self, settings: RuntimeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn request_timeout(&self) -> Duration {
        self.settings.request_timeout
    }

    pub fn present_year(&self) -> i32 {
        self.settings.present_year
    }
}

fn normalise_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a positive number of seconds from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `default`.
fn duration_secs_from_env_value(
    name: &str,
    value: Option<String>,
    default: Duration,
) -> ValidationResult<Duration> {
    let Some(value) = non_empty(value) else {
        return Ok(default);
    };

    let secs = value.parse::<u64>().map_err(|_| {
        ValidationError::InvalidInput(format!("{name} must be a whole number of seconds"))
    })?;
    if secs == 0 {
        return Err(ValidationError::InvalidInput(format!(
            "{name} must be greater than zero"
        )));
    }

    Ok(Duration::from_secs(secs))
}

/// Calendar year (UTC) used when no present-year override is configured.
fn default_present_year() -> i32 {
    chrono::Utc::now().year()
}

/// Parse the present year override from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `None` and the current year is used.
fn present_year_from_env_value(value: Option<String>) -> ValidationResult<Option<i32>> {
    non_empty(value)
        .map(|v| {
            v.parse::<i32>()
                .ok()
                .filter(|year| (1900..=2200).contains(year))
                .ok_or_else(|| {
                    ValidationError::InvalidInput(format!(
                        "VALUATION_PRESENT_YEAR is not a plausible year: {v}"
                    ))
                })
        })
        .transpose()
}

/// Resolve the credential-free [`RuntimeSettings`] from an environment-style lookup.
///
/// Recognised keys: `NOMINATIM_BASE_URL`, `REQUEST_TIMEOUT_SECS`, `LIVE_TICK_SECS` and
/// `VALUATION_PRESENT_YEAR`.
///
/// # Errors
///
/// Returns `ValidationError::InvalidInput` if a numeric value cannot be parsed.
pub fn runtime_settings_from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
) -> ValidationResult<RuntimeSettings> {
    let mut settings = RuntimeSettings::default()
        .with_request_timeout(duration_secs_from_env_value(
            "REQUEST_TIMEOUT_SECS",
            lookup("REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT,
        )?)
        .with_live_tick(duration_secs_from_env_value(
            "LIVE_TICK_SECS",
            lookup("LIVE_TICK_SECS"),
            DEFAULT_LIVE_TICK,
        )?);

    if let Some(base) = non_empty(lookup("NOMINATIM_BASE_URL")) {
        settings = settings.with_geocoder_base(base);
    }
    if let Some(year) = present_year_from_env_value(lookup("VALUATION_PRESENT_YEAR"))? {
        settings = settings.with_present_year(year);
    }

    Ok(settings)
}

/// Resolve a [`CoreConfig`] from an environment-style lookup.
///
/// Recognised keys: `GEMINI_API_KEY` (falls back to `API_KEY`), `GEMINI_API_BASE`,
/// `VALUATION_MODEL`, `VALUATION_IMAGE_MODEL`, plus everything
/// [`runtime_settings_from_lookup`] reads.
///
/// # Errors
///
/// Returns `ValidationError::InvalidInput` if no API key is available or a numeric value
/// cannot be parsed.
pub fn core_config_from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
) -> ValidationResult<CoreConfig> {
    let api_key = non_empty(lookup("GEMINI_API_KEY"))
        .or_else(|| non_empty(lookup("API_KEY")))
        .ok_or_else(|| {
            ValidationError::InvalidInput("GEMINI_API_KEY (or API_KEY) must be set".into())
        })?;

    let mut cfg = CoreConfig::new(api_key)?.with_settings(runtime_settings_from_lookup(&lookup)?);

    if let Some(base) = non_empty(lookup("GEMINI_API_BASE")) {
        cfg = cfg.with_api_base(base);
    }
    if let Some(model) = non_empty(lookup("VALUATION_MODEL")) {
        cfg = cfg.with_image_model(model.clone()).with_text_model(model);
    }
    if let Some(model) = non_empty(lookup("VALUATION_IMAGE_MODEL")) {
        cfg = cfg.with_image_model(model);
    }

    Ok(cfg)
}
