//! Consultant chat call shape.

use super::wire::{Content, GenerateContentRequest};
use super::ModelGateway;
use crate::error::{ChatError, ChatResult};
use crate::prediction::PredictionResult;

const PERSONA: &str = "You are \"Consultant PS\", a world-class AI Real Estate Analyst.
Your goal is to provide strategic, data-driven advice on property investment, valuation, and market trends.
Always use a professional, insightful, and helpful tone.
If the user asks about a specific price or ROI, give detailed reasoning.";

/// System instruction for the assistant, grounded in `context` when a valuation exists.
pub fn system_instruction(context: Option<&PredictionResult>) -> String {
    match context {
        Some(result) => format!(
            "{PERSONA}

CURRENT PROPERTY CONTEXT:
- Analyzed Valuation: ₹{price}
- Location Sentiment: {insights}
- Strategic Advice: {reasoning}
- Market Growth: {trends}

Refer to these numbers in your response to provide personalized consultation.",
            price = result.predicted_price,
            insights = result.nearby_insights,
            reasoning = result.buyer_seller_advice.reasoning,
            trends = result.trend_summary(),
        ),
        None => format!(
            "{PERSONA}
Currently, no specific property has been analyzed yet. You can provide general market advice or guide the user on how to use the valuation engine to get a precise quote."
        ),
    }
}

impl ModelGateway {
    /// One consultant reply to `message`.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::EmptyMessage` for a blank message, `ChatError::Gateway` if the call
    /// fails, or `ChatError::EmptyReply` if the model returned no text.
    pub async fn chat(
        &self,
        message: &str,
        context: Option<&PredictionResult>,
    ) -> ChatResult<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let request = GenerateContentRequest {
            system_instruction: Some(Content::system(system_instruction(context))),
            ..GenerateContentRequest::from_text(message)
        };

        let response = self.call_text_model(&request).await?;
        response
            .text()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ChatError::EmptyReply)
    }
}
