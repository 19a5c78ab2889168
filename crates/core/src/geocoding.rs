//! Forward and reverse geocoding against a Nominatim-compatible service.
//!
//! The form wizard uses this to autofill the address from a map pin and to move the pin to a
//! typed address. Failures are never fatal for the caller; see
//! [`PredictionWizard::pin_location`](crate::wizard::PredictionWizard::pin_location).

use crate::config::RuntimeSettings;
use crate::constants::{ADDRESS_SEGMENTS, GEOCODER_USER_AGENT, MIN_GEOCODE_QUERY_LEN};
use crate::error::{GatewayError, GatewayResult, GeocodeError, GeocodeResult};
use crate::property::Coordinates;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Short address for a coordinate pair, if the service knows one.
    async fn reverse(&self, coords: Coordinates) -> GeocodeResult<Option<String>>;

    /// Coordinates of the best match for a free-text query.
    async fn forward(&self, query: &str) -> GeocodeResult<Option<Coordinates>>;
}

/// Keep the first three comma-separated segments of a display name.
pub fn shorten_display_name(display_name: &str) -> String {
    let parts: Vec<&str> = display_name.split(',').collect();
    if parts.len() > ADDRESS_SEGMENTS {
        parts[..ADDRESS_SEGMENTS].join(",")
    } else {
        display_name.to_string()
    }
}

#[derive(Deserialize)]
struct ReversePlace {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct SearchPlace {
    lat: String,
    lon: String,
}

pub struct NominatimClient {
    http: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    /// # Errors
    ///
    /// Returns `GatewayError::ClientBuild` if the HTTP client cannot be created.
    pub fn new(settings: &RuntimeSettings) -> GatewayResult<Self> {
        Self::with_base_url(settings.geocoder_base(), settings.request_timeout())
    }

    /// # Errors
    ///
    /// Returns `GatewayError::ClientBuild` if the HTTP client cannot be created.
    fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(GEOCODER_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(GatewayError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> GeocodeResult<T> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, path))
            .header("Accept-Language", "en")
            .query(query)
            .send()
            .await
            .map_err(GeocodeError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        response.json::<T>().await.map_err(GeocodeError::Network)
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn reverse(&self, coords: Coordinates) -> GeocodeResult<Option<String>> {
        let place: ReversePlace = self
            .get_json(
                "reverse",
                &[
                    ("format", "jsonv2".to_string()),
                    ("lat", coords.latitude.to_string()),
                    ("lon", coords.longitude.to_string()),
                ],
            )
            .await?;

        Ok(place
            .display_name
            .filter(|name| !name.trim().is_empty())
            .map(|name| shorten_display_name(&name)))
    }

    async fn forward(&self, query: &str) -> GeocodeResult<Option<Coordinates>> {
        let query = query.trim();
        if query.chars().count() < MIN_GEOCODE_QUERY_LEN {
            return Ok(None);
        }

        let places: Vec<SearchPlace> = self
            .get_json(
                "search",
                &[
                    ("format", "json".to_string()),
                    ("q", query.to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        places.first().map(parse_place).transpose()
    }
}

fn parse_place(place: &SearchPlace) -> GeocodeResult<Coordinates> {
    let parse = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|_| GeocodeError::Malformed(value.to_string()))
    };
    Ok(Coordinates::new(parse(&place.lat)?, parse(&place.lon)?))
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory [`Geocoder`] for wizard tests.

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct FakeGeocoder {
        pub(crate) address: Option<String>,
        pub(crate) coords: Option<Coordinates>,
        pub(crate) fail: bool,
        pub(crate) forward_queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn reverse(&self, _coords: Coordinates) -> GeocodeResult<Option<String>> {
            if self.fail {
                return Err(GeocodeError::Status(503));
            }
            Ok(self.address.clone())
        }

        async fn forward(&self, query: &str) -> GeocodeResult<Option<Coordinates>> {
            self.forward_queries.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(GeocodeError::Status(503));
            }
            Ok(self.coords)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_display_names_keep_three_segments() {
        assert_eq!(
            shorten_display_name("80 Feet Road, Koramangala, Bengaluru, Karnataka, 560034, India"),
            "80 Feet Road, Koramangala, Bengaluru"
        );
    }

    #[test]
    fn short_display_names_are_untouched() {
        assert_eq!(shorten_display_name("Koramangala, Bengaluru"), "Koramangala, Bengaluru");
        assert_eq!(shorten_display_name("A, B, C"), "A, B, C");
    }

    #[test]
    fn search_places_parse_string_coordinates() {
        let place: SearchPlace =
            serde_json::from_str(r#"{"lat": "12.9352", "lon": "77.6245", "name": "x"}"#).unwrap();
        assert_eq!(parse_place(&place).unwrap(), Coordinates::new(12.9352, 77.6245));

        let bad = SearchPlace {
            lat: "north".into(),
            lon: "1".into(),
        };
        assert!(matches!(parse_place(&bad), Err(GeocodeError::Malformed(v)) if v == "north"));
    }

    #[tokio::test]
    async fn short_queries_skip_the_network() {
        let settings = RuntimeSettings::default().with_geocoder_base("http://127.0.0.1:9");
        let client = NominatimClient::new(&settings).unwrap();
        assert_eq!(client.forward(" ab ").await.unwrap(), None);
    }
}
