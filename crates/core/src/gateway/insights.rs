//! Search/maps grounded insights.

use super::wire::{
    GenerateContentRequest, GenerateContentResponse, LatLng, RetrievalConfig, Tool, ToolConfig,
};
use super::ModelGateway;
use crate::error::{InsightsError, InsightsResult};
use crate::prediction::GroundingLink;
use crate::property::Coordinates;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const WEB_FALLBACK_TITLE: &str = "Web Result";
const MAPS_FALLBACK_TITLE: &str = "Location Insight";

/// Narrative plus the citations the provider grounded it on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeepInsights {
    pub text: String,
    pub links: Vec<GroundingLink>,
}

/// Collect `{title, uri}` pairs from web and maps grounding chunks.
///
/// Chunks without a URI are dropped, blank titles get a source-specific fallback, and
/// repeated URIs keep their first occurrence.
pub fn extract_grounding_links(response: &GenerateContentResponse) -> Vec<GroundingLink> {
    let mut seen = HashSet::new();

    response
        .grounding_chunks()
        .iter()
        .filter_map(|chunk| {
            if let Some(web) = &chunk.web {
                Some((web, WEB_FALLBACK_TITLE))
            } else {
                chunk.maps.as_ref().map(|maps| (maps, MAPS_FALLBACK_TITLE))
            }
        })
        .filter_map(|(source, fallback)| {
            let uri = source.uri.as_deref()?.trim();
            if uri.is_empty() {
                return None;
            }
            let title = source
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(fallback);
            Some(GroundingLink {
                title: title.to_string(),
                uri: uri.to_string(),
            })
        })
        .filter(|link| seen.insert(link.uri.clone()))
        .collect()
}

fn insights_prompt(location: &str) -> String {
    format!(
        "Analyze the infrastructure and real estate scenario for {location}. \
         Find specific metro projects, schools, or industrial growth."
    )
}

impl ModelGateway {
    /// Grounded narrative about the surroundings of `location`.
    ///
    /// Coordinates are forwarded as a retrieval hint only when supplied.
    ///
    /// # Errors
    ///
    /// Returns `InsightsError::MissingLocation` for a blank location, or
    /// `InsightsError::Gateway` if the provider call fails.
    pub async fn deep_insights(
        &self,
        location: &str,
        coords: Option<Coordinates>,
    ) -> InsightsResult<DeepInsights> {
        let location = location.trim();
        if location.is_empty() {
            return Err(InsightsError::MissingLocation);
        }

        let request = GenerateContentRequest {
            tools: vec![Tool::google_maps(), Tool::google_search()],
            tool_config: Some(ToolConfig {
                retrieval_config: RetrievalConfig {
                    lat_lng: coords.map(|c| LatLng {
                        latitude: c.latitude,
                        longitude: c.longitude,
                    }),
                },
            }),
            ..GenerateContentRequest::from_text(insights_prompt(location))
        };

        let response = self.call_text_model(&request).await?;
        let links = extract_grounding_links(&response);
        tracing::info!(%location, citations = links.len(), "grounded insights received");

        Ok(DeepInsights {
            text: response.text().unwrap_or_default(),
            links,
        })
    }
}
