//! Top-level application state.
//!
//! [`ValuationApp`] owns the one canonical [`PredictionResult`] and the details it was computed
//! from. Every other component reads from it; nothing mutates it except a successful
//! [`ValuationApp::submit`].

use crate::chat::{ChatMessage, ChatSession};
use crate::dashboard::{spawn_live_feed, LiveFeed, LiveFeedConfig, LiveQuote, MarketScenario};
use crate::error::{SubmitError, SubmitResult};
use crate::gateway::ModelGateway;
use crate::media::MediaEditor;
use crate::prediction::PredictionResult;
use crate::property::{PropertyDetails, PropertyType};
use crate::wizard::{InFlightGuard, PredictionWizard};
use std::time::Duration;

/// Progress lines cycled while a valuation is running.
pub const LOADING_MESSAGES: [&str; 5] = [
    "Locking Precise Coordinates...",
    "Scanning Geospatial Nodes...",
    "Querying RERA & Circle Rates...",
    "Analyzing Infrastructure Delta...",
    "Finalizing PS's Valuation Model...",
];

/// How long each loading message stays up.
pub const LOADING_MESSAGE_PERIOD: Duration = Duration::from_millis(1500);

pub fn loading_message(step: usize) -> &'static str {
    LOADING_MESSAGES[step % LOADING_MESSAGES.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    Dashboard,
    Predict,
    Insights,
    Visualizer,
    About,
}

impl AppView {
    /// Views that only make sense once a valuation exists.
    pub fn needs_prediction(&self) -> bool {
        matches!(self, AppView::Dashboard | AppView::Visualizer)
    }
}

#[derive(Debug)]
pub struct ValuationApp {
    view: AppView,
    wizard: PredictionWizard,
    prediction: Option<PredictionResult>,
    current_details: Option<PropertyDetails>,
    loading: bool,
    error: Option<String>,
    chat: ChatSession,
    scenario: Option<MarketScenario>,
}

impl Default for ValuationApp {
    fn default() -> Self {
        Self::new()
    }
}

impl ValuationApp {
    pub fn new() -> Self {
        Self {
            view: AppView::Predict,
            wizard: PredictionWizard::new(),
            prediction: None,
            current_details: None,
            loading: false,
            error: None,
            chat: ChatSession::new(),
            scenario: None,
        }
    }

    pub fn view(&self) -> AppView {
        self.view
    }

    pub fn wizard(&self) -> &PredictionWizard {
        &self.wizard
    }

    pub fn wizard_mut(&mut self) -> &mut PredictionWizard {
        &mut self.wizard
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        self.prediction.as_ref()
    }

    pub fn current_details(&self) -> Option<&PropertyDetails> {
        self.current_details.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn chat_messages(&self) -> &[ChatMessage] {
        self.chat.messages()
    }

    /// Switch views. Returns `false` (and stays put) for a view that needs a valuation
    /// before one exists.
    pub fn navigate(&mut self, view: AppView) -> bool {
        if view.needs_prediction() && self.prediction.is_none() {
            return false;
        }
        self.view = view;
        true
    }

    /// Submit the wizard and, on success, replace the canonical result and open the dashboard.
    ///
    /// On failure the error banner is set and the previous result (if any) is kept.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::InFlight` while another submission is running, or the wizard's
    /// submission error.
    pub async fn submit(&mut self, gateway: &ModelGateway) -> SubmitResult<&PredictionResult> {
        if self.loading {
            return Err(SubmitError::InFlight);
        }

        self.error = None;
        let in_flight = InFlightGuard::raise(&mut self.loading);
        let outcome = self.wizard.submit(gateway).await;
        drop(in_flight);

        match outcome {
            Ok(result) => {
                tracing::info!(
                    price = result.predicted_price,
                    citations = result.grounding_links.len(),
                    "valuation ready"
                );
                self.view = AppView::Dashboard;
                self.scenario = None;
                self.current_details = Some(self.wizard.draft().clone());
                Ok(&*self.prediction.insert(result))
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Image for the visualizer: the uploaded photo, else a stock photo for the property type.
    pub fn visualizer_image(&self) -> String {
        let details = self.current_details.as_ref();
        if let Some(image) = details.and_then(|d| d.image.as_ref()) {
            return image.clone();
        }
        details
            .map(|d| d.property_type)
            .unwrap_or(PropertyType::Apartment)
            .placeholder_image_url()
            .to_string()
    }

    /// Media editor seeded with the uploaded photo, once a valuation exists.
    ///
    /// Returns `None` without a valuation or without an uploaded photo; the stock placeholder
    /// is a remote URL, not image data the model can edit.
    pub fn open_media_editor(&mut self) -> Option<MediaEditor> {
        self.prediction.as_ref()?;
        let details = self.current_details.as_ref()?;
        let photo = details.image.clone()?;
        let editor = MediaEditor::new(photo, details.property_type);
        self.view = AppView::Visualizer;
        Some(editor)
    }

    /// Chat with the current valuation (if any) as context.
    pub async fn send_chat(&mut self, gateway: &ModelGateway, input: &str) -> Option<&ChatMessage> {
        self.chat.send(gateway, input, self.prediction.as_ref()).await
    }

    /// Start the live-price simulation for the current valuation.
    pub fn live_feed(&self, config: LiveFeedConfig) -> Option<LiveFeed> {
        self.prediction
            .as_ref()
            .map(|result| spawn_live_feed(result, config))
    }

    pub fn scenario(&self) -> Option<MarketScenario> {
        self.scenario
    }

    /// Pick a what-if scenario; picking the active one switches it off. Returns the scenario
    /// now active.
    pub fn toggle_scenario(&mut self, scenario: MarketScenario) -> Option<MarketScenario> {
        self.scenario = MarketScenario::toggle(self.scenario, scenario);
        self.scenario
    }

    /// Uplift of the active scenario, measured on the canonical predicted price.
    pub fn scenario_delta(&self) -> f64 {
        match (self.scenario, self.prediction.as_ref()) {
            (Some(scenario), Some(result)) => scenario.delta(result.predicted_price),
            _ => 0.0,
        }
    }

    /// Headline price for the dashboard: the live quote plus any scenario uplift.
    pub fn displayed_price(&self, quote: &LiveQuote) -> f64 {
        quote.predicted_price + self.scenario_delta()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{
        gateway, provider_error, response, stalled_gateway, text_response, ScriptedClient,
    };
    use crate::prediction::fixtures::sample_result;
    use crate::property::{AreaUnit, Condition};
    use serde_json::json;
    use std::sync::Arc;

    fn ready_app(location: &str) -> ValuationApp {
        let mut app = ValuationApp::new();
        let wizard = app.wizard_mut();
        wizard.set_location(location);
        wizard.next().unwrap();
        wizard.next().unwrap();
        app
    }

    fn valuation_then_grounding() -> Arc<ScriptedClient> {
        ScriptedClient::new([
            text_response(&serde_json::to_string(&sample_result()).unwrap()),
            response(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "Koramangala has strong demand."}]},
                    "groundingMetadata": {"groundingChunks": [
                        {"maps": {"title": "Forum Mall", "uri": "https://maps.example/forum"}}
                    ]}
                }]
            })),
        ])
    }

    #[tokio::test]
    async fn koramangala_submission_moves_to_dashboard() {
        let client = valuation_then_grounding();
        let mut app = ValuationApp::new();
        let wizard = app.wizard_mut();
        wizard.set_location("Koramangala");
        wizard.next().unwrap();
        wizard.set_size(1200.0, AreaUnit::SquareFeet);
        wizard.set_property_type(PropertyType::Apartment);
        wizard.toggle_amenity("Metro Access");
        wizard.next().unwrap();
        wizard.set_age(5);
        wizard.set_condition(Condition::Good);
        assert_eq!(app.view(), AppView::Predict);

        let result = app.submit(&gateway(client.clone())).await.unwrap();
        assert_eq!(result.grounding_links[0].title, "Forum Mall");
        assert!(result.validate().is_ok());

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        let prompt = calls[0].1.prompt_text();
        for needle in [
            "\"Koramangala\"",
            "Property Type: Apartment",
            "Size: 1200 sqft",
            "Age: 5 years",
            "Condition: Good",
            "Amenities: Metro Access.",
        ] {
            assert!(prompt.contains(needle), "prompt is missing {needle}");
        }
        assert!(calls[0].1.tools.is_empty());
        assert!(calls[1].1.prompt_text().contains("Koramangala"));
        assert_eq!(calls[1].1.tools.len(), 2);

        assert_eq!(app.view(), AppView::Dashboard);
        assert!(!app.is_loading());
        assert!(app.error().is_none());
        assert_eq!(app.current_details().unwrap().location, "Koramangala");
    }

    #[tokio::test]
    async fn failed_submission_sets_banner_and_exposes_nothing() {
        let client = ScriptedClient::new([provider_error()]);
        let mut app = ready_app("Indiranagar");

        assert!(app.submit(&gateway(client)).await.is_err());
        assert!(app.prediction().is_none());
        assert_eq!(app.view(), AppView::Predict);
        assert!(!app.is_loading());
        assert!(app.error().unwrap().contains("503"));

        app.dismiss_error();
        assert!(app.error().is_none());
    }

    #[tokio::test]
    async fn result_views_are_gated_until_a_valuation_exists() {
        let mut app = ready_app("Koramangala");
        assert!(!app.navigate(AppView::Dashboard));
        assert!(!app.navigate(AppView::Visualizer));
        assert!(app.open_media_editor().is_none());
        assert!(app.navigate(AppView::About));
        assert!(app.navigate(AppView::Insights));

        app.submit(&gateway(valuation_then_grounding())).await.unwrap();
        assert!(app.navigate(AppView::Visualizer));
    }

    #[tokio::test]
    async fn visualizer_prefers_uploaded_photo() {
        let mut app = ready_app("Whitefield");
        assert_eq!(
            app.visualizer_image(),
            PropertyType::Apartment.placeholder_image_url()
        );

        app.wizard_mut().set_property_type(PropertyType::EmptyLand);
        app.submit(&gateway(valuation_then_grounding())).await.unwrap();
        assert_eq!(
            app.visualizer_image(),
            PropertyType::EmptyLand.placeholder_image_url()
        );

        let mut app = ready_app("Whitefield");
        app.wizard_mut()
            .set_photo(Some("data:image/png;base64,AA==".into()));
        app.submit(&gateway(valuation_then_grounding())).await.unwrap();
        let editor = app.open_media_editor().unwrap();
        assert_eq!(editor.current_image(), "data:image/png;base64,AA==");
        assert_eq!(app.view(), AppView::Visualizer);
    }

    #[tokio::test]
    async fn media_editor_needs_an_uploaded_photo() {
        let mut app = ready_app("Whitefield");
        app.submit(&gateway(valuation_then_grounding())).await.unwrap();

        assert!(app.visualizer_image().starts_with("https://"));
        assert!(app.open_media_editor().is_none());
        assert_eq!(app.view(), AppView::Dashboard);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_submission_clears_loading() {
        let mut app = ready_app("Koramangala");

        let abandoned =
            tokio::time::timeout(Duration::from_secs(5), app.submit(&stalled_gateway())).await;
        assert!(abandoned.is_err());
        assert!(!app.is_loading());
        assert!(!app.wizard().is_submitting());
        assert!(app.prediction().is_none());

        app.submit(&gateway(valuation_then_grounding())).await.unwrap();
        assert_eq!(app.view(), AppView::Dashboard);
    }

    #[tokio::test]
    async fn scenarios_lift_the_displayed_price() {
        let mut app = ready_app("Koramangala");
        app.submit(&gateway(valuation_then_grounding())).await.unwrap();
        let quote = LiveQuote::from_result(app.prediction().unwrap());
        let base = app.displayed_price(&quote);
        assert_eq!(base, 9_500_000.0);

        for scenario in MarketScenario::ALL {
            assert_eq!(app.toggle_scenario(scenario), Some(scenario));
            assert_eq!(
                app.displayed_price(&quote),
                base + 9_500_000.0 * scenario.uplift()
            );
            assert_eq!(app.toggle_scenario(scenario), None);
            assert_eq!(app.displayed_price(&quote), base);
        }

        app.toggle_scenario(MarketScenario::CommercialHubShift);
        app.toggle_scenario(MarketScenario::InfraCorridor);
        assert_eq!(app.scenario(), Some(MarketScenario::InfraCorridor));
        assert_eq!(app.scenario_delta(), 9_500_000.0 * 0.25);
    }

    #[tokio::test(start_paused = true)]
    async fn live_feed_follows_the_canonical_result() {
        let mut app = ready_app("Koramangala");
        assert!(app.live_feed(LiveFeedConfig::new(2025)).is_none());

        app.submit(&gateway(valuation_then_grounding())).await.unwrap();
        let feed = app.live_feed(LiveFeedConfig::new(2025)).unwrap();
        assert_eq!(feed.latest().predicted_price, 9_500_000.0);
    }

    #[tokio::test]
    async fn chat_uses_the_canonical_result_as_context() {
        let client = valuation_then_grounding();
        let mut app = ready_app("Koramangala");
        app.submit(&gateway(client.clone())).await.unwrap();

        let chat_client = ScriptedClient::new([text_response("Hold.")]);
        let reply = app
            .send_chat(&gateway(chat_client.clone()), "Sell now?")
            .await
            .unwrap();
        assert_eq!(reply.text, "Hold.");
        assert_eq!(app.chat_messages().len(), 3);

        let (_, request) = &chat_client.calls()[0];
        let instruction = request.system_instruction.as_ref().unwrap().text();
        assert!(instruction.contains("₹9500000"));
    }

    #[test]
    fn loading_messages_cycle() {
        assert_eq!(loading_message(0), LOADING_MESSAGES[0]);
        assert_eq!(loading_message(6), LOADING_MESSAGES[1]);
    }
}
