//! Constants used throughout the valuation core crate.
//!
//! Provider endpoints, model defaults and the fixed texts shown by the client components live
//! here so that the relay, the CLI and the tests agree on them.

use std::time::Duration;

/// Default base URL of the generative model REST API.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used for valuation, grounding and chat unless overridden.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2-flash";

/// Default base URL of the Nominatim-compatible geocoder.
pub const DEFAULT_GEOCODER_BASE: &str = "https://nominatim.openstreetmap.org";

/// User agent sent to the geocoder (Nominatim rejects anonymous clients).
pub const GEOCODER_USER_AGENT: &str = "valuation-core/0.1 (property valuation client)";

/// Timeout applied to every outbound call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Period of the dashboard live-price simulation.
pub const DEFAULT_LIVE_TICK: Duration = Duration::from_secs(60);

/// How long the dashboard shows its "updating" state before applying a tick.
pub const LIVE_REFRESH_DELAY: Duration = Duration::from_secs(1);

/// Half-width of the multiplicative jitter applied on each live tick (±0.3%).
pub const LIVE_JITTER: f64 = 0.003;

/// Mime type assumed for images that carry no data-URI prefix.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// First message of every chat transcript.
pub const CHAT_GREETING: &str = "Welcome! I am Consultant PS. I can help you decode market trends or analyze your property valuation. How can I assist you today?";

/// Reply appended to the transcript when the assistant cannot be reached.
pub const CHAT_FALLBACK_REPLY: &str =
    "My neural link is flickering. Please try again in a moment.";

/// Default map pin for a fresh form (Bengaluru city centre).
pub const DEFAULT_LATITUDE: f64 = 12.9716;
pub const DEFAULT_LONGITUDE: f64 = 77.5946;

/// Forward geocoding is skipped for queries shorter than this.
pub const MIN_GEOCODE_QUERY_LEN: usize = 3;

/// Number of comma-separated segments kept from a reverse-geocoded address.
pub const ADDRESS_SEGMENTS: usize = 3;

/// Upper bound on provider error bodies kept in error messages.
pub const MAX_ERROR_BODY_CHARS: usize = 512;
