//! Valuation call shape.

use super::wire::{GenerateContentRequest, GenerationConfig};
use super::ModelGateway;
use crate::error::{ValuationError, ValuationResult};
use crate::prediction::PredictionResult;
use crate::property::{PropertyDetails, PropertyType};
use serde_json::{json, Value};

fn coordinate_label(value: Option<f64>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| format!("{v:.6}"))
}

fn type_heuristic(property_type: PropertyType) -> &'static str {
    if property_type.is_land() {
        return "Focus on circle rates, zoning, and road width.";
    }
    match property_type {
        PropertyType::Apartment => {
            "Consider floor number, parking, and super-built-up versus carpet area."
        }
        PropertyType::IndividualHouse => "Value the land and the construction separately.",
        _ => "Consider frontage, visibility, and rental yield.",
    }
}

/// Role-play prompt for the schema-constrained valuation call.
pub fn valuation_prompt(details: &PropertyDetails, present_year: i32) -> String {
    format!(
        r#"Act as a "Real-Time Real Estate Strategist" for the Indian market.
Location: "{location}" (Lat: {lat}, Lng: {lng}).
Property Type: {ty}
Size: {size} {unit}
Age: {age} years
Condition: {condition}
Amenities: {amenities}.

VALUATION NUANCES FOR THIS PROPERTY TYPE:
- {heuristic}

TASK:
1. Calculate a precise valuation in rupees (₹) using current circle rates and market sentiment.
2. Analyse the past (3 years), the present ({present_year}) and the future (3 years). Label each trend period with its year.
3. For every trend point provide a 'high' and 'low' bound around the price.
4. Give "buyerSellerAdvice" with deep reasoning.
5. "nearbyInsights": a narrative market brief.
6. "confidenceScore" is a fraction between 0 and 1.

RESPONSE FORMAT: strictly JSON."#,
        location = details.location,
        lat = coordinate_label(details.lat),
        lng = coordinate_label(details.lng),
        ty = details.property_type,
        size = details.size,
        unit = details.unit,
        age = details.age,
        condition = details.condition,
        amenities = details.amenities_label(),
        heuristic = type_heuristic(details.property_type),
    )
}

/// Prompt used by the edge relay; it embeds every submitted field.
pub fn relay_prompt(details: &PropertyDetails, present_year: i32) -> String {
    format!(
        r#"Act as a "Real-Time Real Estate Strategist" for the Indian market.
Location: "{location}" (Lat: {lat}, Lng: {lng}).
Property Type: {ty}
Size: {size} {unit}
Age: {age} years
Condition: {condition}
Amenities: {amenities}.

Provide a detailed valuation in JSON format with:
- predictedPrice: estimated price in ₹
- priceRange: [min, max]
- confidenceScore: 0-1
- marketTrends: array from {from} to {to} with period, price, high and low
- buyerSellerAdvice: strategic recommendations"#,
        location = details.location,
        lat = coordinate_label(details.lat),
        lng = coordinate_label(details.lng),
        ty = details.property_type,
        size = details.size,
        unit = details.unit,
        age = details.age,
        condition = details.condition,
        amenities = details.amenities_label(),
        from = present_year - 3,
        to = present_year + 3,
    )
}

/// Response schema matching [`PredictionResult`] without grounding links.
pub fn valuation_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "predictedPrice": { "type": "NUMBER" },
            "priceRange": { "type": "ARRAY", "items": { "type": "NUMBER" } },
            "confidenceScore": { "type": "NUMBER" },
            "influencingFactors": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "factor": { "type": "STRING" },
                        "impact": { "type": "STRING", "enum": ["positive", "negative", "neutral"] },
                        "description": { "type": "STRING" }
                    },
                    "required": ["factor", "impact", "description"]
                }
            },
            "marketTrends": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "period": { "type": "STRING" },
                        "price": { "type": "NUMBER" },
                        "high": { "type": "NUMBER" },
                        "low": { "type": "NUMBER" }
                    },
                    "required": ["period", "price", "high", "low"]
                }
            },
            "nearbyInsights": { "type": "STRING" },
            "buyerSellerAdvice": {
                "type": "OBJECT",
                "properties": {
                    "buyerAction": { "type": "STRING" },
                    "sellerAction": { "type": "STRING" },
                    "reasoning": { "type": "STRING" }
                },
                "required": ["buyerAction", "sellerAction", "reasoning"]
            }
        },
        "required": [
            "predictedPrice", "priceRange", "confidenceScore", "influencingFactors",
            "marketTrends", "nearbyInsights", "buyerSellerAdvice"
        ]
    })
}

/// Parse and validate the text of a valuation response.
pub(crate) fn parse_valuation(text: &str) -> ValuationResult<PredictionResult> {
    let mut result: PredictionResult =
        serde_json::from_str(text.trim()).map_err(ValuationError::Malformed)?;
    // Grounding links come from the insights call, never from the valuation model.
    result.grounding_links.clear();
    result.validate().map_err(ValuationError::Invalid)?;
    Ok(result)
}

impl ModelGateway {
    /// Ask the model for a typed, validated valuation.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `ValuationError::InvalidDetails` if `details` fail validation (no call is made),
    /// - `ValuationError::Gateway` if the provider call fails,
    /// - `ValuationError::EmptyResponse`, `Malformed` or `Invalid` if the text is missing, does
    ///   not parse, or breaks a result invariant.
    pub async fn predict_price(&self, details: &PropertyDetails) -> ValuationResult<PredictionResult> {
        details.validate().map_err(ValuationError::InvalidDetails)?;

        let request = GenerateContentRequest {
            generation_config: Some(GenerationConfig::json(Some(valuation_response_schema()))),
            ..GenerateContentRequest::from_text(valuation_prompt(details, self.present_year))
        };

        let response = self.call_text_model(&request).await?;
        let text = response.text().ok_or(ValuationError::EmptyResponse)?;
        let result = parse_valuation(&text)?;

        tracing::info!(
            location = %details.location,
            price = result.predicted_price,
            confidence = result.confidence_score,
            "valuation received"
        );
        Ok(result)
    }

    /// Structured-completion call used by the edge relay.
    ///
    /// The model's text is returned verbatim; it is not parsed or validated.
    ///
    /// # Errors
    ///
    /// Returns `ValuationError::InvalidDetails`, `ValuationError::Gateway` or
    /// `ValuationError::EmptyResponse`.
    pub async fn relay_valuation(&self, details: &PropertyDetails) -> ValuationResult<String> {
        details.validate().map_err(ValuationError::InvalidDetails)?;

        let request = GenerateContentRequest {
            generation_config: Some(GenerationConfig::json(None)),
            ..GenerateContentRequest::from_text(relay_prompt(details, self.present_year))
        };

        let response = self.call_text_model(&request).await?;
        response.text().ok_or(ValuationError::EmptyResponse)
    }
}
