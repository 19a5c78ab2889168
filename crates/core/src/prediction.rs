//! Valuation results returned by the model.
//!
//! A [`PredictionResult`] is created once per successful valuation and is read-only afterwards.
//! The dashboard's live-price simulation works on its own display copy
//! (see [`crate::dashboard::LiveQuote`]).

use crate::error::{ValidationError, ValidationResult};
use crate::validation::validate_positive_amount;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InfluencingFactor {
    pub factor: String,
    pub impact: Impact,
    pub description: String,
}

/// One point of the past/present/future price trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarketTrend {
    pub period: String,
    pub price: f64,
    pub high: f64,
    pub low: f64,
}

impl MarketTrend {
    /// `low <= price <= high`, all finite.
    pub fn is_banded(&self) -> bool {
        [self.low, self.price, self.high].iter().all(|v| v.is_finite())
            && self.low <= self.price
            && self.price <= self.high
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuyerSellerAdvice {
    pub buyer_action: String,
    pub seller_action: String,
    pub reasoning: String,
}

/// Citation returned by search/maps grounding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GroundingLink {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub predicted_price: f64,
    /// `(low, high)`, serialised as a two-element array.
    #[schema(value_type = Vec<f64>)]
    pub price_range: (f64, f64),
    pub confidence_score: f64,
    pub influencing_factors: Vec<InfluencingFactor>,
    pub market_trends: Vec<MarketTrend>,
    pub nearby_insights: String,
    pub buyer_seller_advice: BuyerSellerAdvice,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grounding_links: Vec<GroundingLink>,
}

impl PredictionResult {
    /// Check every invariant of a valuation.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidInput` if:
    /// - the predicted price or either end of the range is not a positive amount,
    /// - the range is inverted,
    /// - the confidence score lies outside `[0, 1]`,
    /// - any trend point violates `low <= price <= high`.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_positive_amount("predictedPrice", self.predicted_price)?;

        let (low, high) = self.price_range;
        validate_positive_amount("priceRange low", low)?;
        validate_positive_amount("priceRange high", high)?;
        if low > high {
            return Err(ValidationError::InvalidInput(format!(
                "priceRange is inverted: {low} > {high}"
            )));
        }

        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(ValidationError::InvalidInput(format!(
                "confidenceScore must lie in [0, 1], got {}",
                self.confidence_score
            )));
        }

        if let Some(point) = self.market_trends.iter().find(|t| !t.is_banded()) {
            return Err(ValidationError::InvalidInput(format!(
                "market trend '{}' violates low <= price <= high ({} / {} / {})",
                point.period, point.low, point.price, point.high
            )));
        }

        Ok(())
    }

    /// Attach grounding citations to a fresh valuation.
    pub fn with_grounding_links(mut self, links: Vec<GroundingLink>) -> Self {
        self.grounding_links = links;
        self
    }

    /// `period: ₹price` pairs in trend order, comma separated.
    pub fn trend_summary(&self) -> String {
        self.market_trends
            .iter()
            .map(|t| format!("{}: ₹{}", t.period, t.price))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn sample_result() -> PredictionResult {
        PredictionResult {
            predicted_price: 9_500_000.0,
            price_range: (9_000_000.0, 10_200_000.0),
            confidence_score: 0.82,
            influencing_factors: vec![InfluencingFactor {
                factor: "Metro Access".into(),
                impact: Impact::Positive,
                description: "Purple line within walking distance".into(),
            }],
            market_trends: vec![
                MarketTrend {
                    period: "2023".into(),
                    price: 8_100_000.0,
                    high: 8_400_000.0,
                    low: 7_900_000.0,
                },
                MarketTrend {
                    period: "2024".into(),
                    price: 8_800_000.0,
                    high: 9_100_000.0,
                    low: 8_500_000.0,
                },
                MarketTrend {
                    period: "2025".into(),
                    price: 9_500_000.0,
                    high: 9_900_000.0,
                    low: 9_100_000.0,
                },
                MarketTrend {
                    period: "2026".into(),
                    price: 10_100_000.0,
                    high: 10_700_000.0,
                    low: 9_600_000.0,
                },
            ],
            nearby_insights: "Koramangala remains a premium micro-market.".into(),
            buyer_seller_advice: BuyerSellerAdvice {
                buyer_action: "Buy".into(),
                seller_action: "Hold".into(),
                reasoning: "Infrastructure upgrades support appreciation.".into(),
            },
            grounding_links: vec![],
        }
    }
}
