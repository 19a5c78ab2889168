//! Three-step property form.
//!
//! ```text
//! Location --next--> Attributes --next--> Condition --submit--> Submitted
//!    ^                   |                    |                    |
//!    +-------back--------+--------back--------+--------back--------+
//! ```
//!
//! Leaving `Location` requires a non-empty location. `submit` runs the valuation call and, only
//! once that succeeds, the grounding call; the two are combined into one result before it is
//! handed back, so no caller ever sees a half-populated valuation. Any failure returns the
//! wizard to `Condition`.

use crate::error::{SubmitError, SubmitResult, ValidationError, ValidationResult};
use crate::gateway::ModelGateway;
use crate::geocoding::Geocoder;
use crate::prediction::PredictionResult;
use crate::property::{AreaUnit, Condition, Coordinates, PropertyDetails, PropertyType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Location,
    Attributes,
    Condition,
    Submitted,
}

impl WizardStep {
    /// 1-based position for progress indicators; `Submitted` reports the last step.
    pub fn number(&self) -> u8 {
        match self {
            WizardStep::Location => 1,
            WizardStep::Attributes => 2,
            WizardStep::Condition | WizardStep::Submitted => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PredictionWizard {
    step: WizardStep,
    draft: PropertyDetails,
    submitting: bool,
}

impl Default for PredictionWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionWizard {
    pub fn new() -> Self {
        Self::with_draft(PropertyDetails::default())
    }

    /// Start from pre-filled details (for example from CLI flags).
    pub fn with_draft(draft: PropertyDetails) -> Self {
        Self {
            step: WizardStep::Location,
            draft,
            submitting: false,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &PropertyDetails {
        &self.draft
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.draft.location = location.into();
    }

    pub fn set_coordinates(&mut self, coords: Coordinates) {
        self.draft.set_coordinates(coords);
    }

    pub fn set_size(&mut self, size: f64, unit: AreaUnit) {
        self.draft.size = size;
        self.draft.unit = unit;
    }

    pub fn set_property_type(&mut self, property_type: PropertyType) {
        self.draft.property_type = property_type;
    }

    pub fn set_age(&mut self, age: u32) {
        self.draft.age = age;
    }

    pub fn set_condition(&mut self, condition: Condition) {
        self.draft.condition = condition;
    }

    /// Add the amenity if absent, remove it if present. Returns whether it is now selected.
    pub fn toggle_amenity(&mut self, amenity: &str) -> bool {
        let amenity = amenity.trim();
        if amenity.is_empty() {
            return false;
        }
        if self.draft.amenities.remove(amenity) {
            false
        } else {
            self.draft.amenities.insert(amenity.to_string());
            true
        }
    }

    /// Attach a photo as a data URI; `None` removes it.
    pub fn set_photo(&mut self, data_uri: Option<String>) {
        self.draft.image = data_uri;
    }

    /// Whether the forward button is enabled on the current step.
    pub fn can_advance(&self) -> bool {
        match self.step {
            WizardStep::Location => !self.draft.location.trim().is_empty(),
            WizardStep::Attributes => true,
            WizardStep::Condition | WizardStep::Submitted => false,
        }
    }

    /// Move forward one step.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidInput` if the location is empty on the first step or
    /// there is no further step (submission goes through [`submit`](Self::submit)).
    pub fn next(&mut self) -> ValidationResult<WizardStep> {
        self.step = match self.step {
            WizardStep::Location if self.can_advance() => WizardStep::Attributes,
            WizardStep::Location => {
                return Err(ValidationError::InvalidInput(
                    "location cannot be empty".into(),
                ))
            }
            WizardStep::Attributes => WizardStep::Condition,
            WizardStep::Condition | WizardStep::Submitted => {
                return Err(ValidationError::InvalidInput(
                    "no further step; submit the form instead".into(),
                ))
            }
        };
        Ok(self.step)
    }

    /// Move back one step; a no-op on the first step.
    pub fn back(&mut self) -> WizardStep {
        self.step = match self.step {
            WizardStep::Location | WizardStep::Attributes => WizardStep::Location,
            WizardStep::Condition => WizardStep::Attributes,
            WizardStep::Submitted => WizardStep::Condition,
        };
        self.step
    }

    /// Move the pin to the typed location. Returns whether the coordinates changed.
    ///
    /// Geocoding failures are logged and otherwise ignored.
    pub async fn pin_location(&mut self, geocoder: &dyn Geocoder) -> bool {
        match geocoder.forward(&self.draft.location).await {
            Ok(Some(coords)) => {
                self.draft.set_coordinates(coords);
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("forward geocoding failed: {e}");
                false
            }
        }
    }

    /// Drop the pin at `coords` and autofill the location from the geocoder.
    ///
    /// The pin always moves; the location only changes when an address comes back. Returns
    /// whether the location was filled.
    pub async fn drop_pin(&mut self, geocoder: &dyn Geocoder, coords: Coordinates) -> bool {
        self.draft.set_coordinates(coords);
        match geocoder.reverse(coords).await {
            Ok(Some(address)) => {
                self.draft.location = address;
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("reverse geocoding failed: {e}");
                false
            }
        }
    }

    /// Submit the form: valuation first, then grounded insights.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `SubmitError::InFlight` if a submission is already running,
    /// - `SubmitError::NotReady` unless the wizard is on the condition step,
    /// - `SubmitError::Validation`, `Valuation` or `Insights` on the corresponding failure;
    ///   the wizard is then back on the condition step.
    pub async fn submit(&mut self, gateway: &ModelGateway) -> SubmitResult<PredictionResult> {
        if self.submitting {
            return Err(SubmitError::InFlight);
        }
        if self.step != WizardStep::Condition {
            return Err(SubmitError::NotReady);
        }

        let in_flight = InFlightGuard::raise(&mut self.submitting);
        let outcome = run_submission(&self.draft, gateway).await;
        drop(in_flight);

        match outcome {
            Ok(result) => {
                self.step = WizardStep::Submitted;
                Ok(result)
            }
            Err(e) => {
                tracing::warn!("valuation submission failed: {e}");
                self.step = WizardStep::Condition;
                Err(e)
            }
        }
    }
}

async fn run_submission(
    draft: &PropertyDetails,
    gateway: &ModelGateway,
) -> SubmitResult<PredictionResult> {
    draft.validate()?;

    let valuation = gateway.predict_price(draft).await?;
    let insights = gateway
        .deep_insights(&draft.location, draft.coordinates())
        .await?;

    Ok(valuation.with_grounding_links(insights.links))
}

/// Holds an in-flight flag raised until dropped, so a cancelled submission future still
/// clears it.
pub(crate) struct InFlightGuard<'a>(&'a mut bool);

impl<'a> InFlightGuard<'a> {
    pub(crate) fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayResult;
    use crate::gateway::testing::{
        gateway, provider_error, response, stalled_gateway, text_response, ScriptedClient,
    };
    use crate::gateway::wire::GenerateContentResponse;
    use crate::geocoding::testing::FakeGeocoder;
    use crate::prediction::fixtures::sample_result;
    use serde_json::json;
    use std::time::Duration;

    fn valuation_ok() -> GatewayResult<GenerateContentResponse> {
        text_response(&serde_json::to_string(&sample_result()).unwrap())
    }

    fn insights_ok() -> GatewayResult<GenerateContentResponse> {
        response(json!({
            "candidates": [{
                "content": {"parts": [{"text": "brief"}]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"title": "Metro", "uri": "https://metro.example"}}
                ]}
            }]
        }))
    }

    fn wizard_at_condition() -> PredictionWizard {
        let mut wizard = PredictionWizard::new();
        wizard.set_location("Koramangala");
        wizard.next().unwrap();
        wizard.next().unwrap();
        wizard
    }

    #[test]
    fn empty_location_blocks_first_step() {
        let mut wizard = PredictionWizard::new();
        assert!(!wizard.can_advance());
        assert!(wizard.next().is_err());
        assert_eq!(wizard.step(), WizardStep::Location);

        wizard.set_location("   ");
        assert!(wizard.next().is_err());

        wizard.set_location("HSR Layout");
        assert_eq!(wizard.next().unwrap(), WizardStep::Attributes);
    }

    #[test]
    fn back_is_always_allowed_and_stops_at_location() {
        let mut wizard = wizard_at_condition();
        assert_eq!(wizard.back(), WizardStep::Attributes);
        assert_eq!(wizard.back(), WizardStep::Location);
        assert_eq!(wizard.back(), WizardStep::Location);
    }

    #[test]
    fn cannot_step_past_condition() {
        let mut wizard = wizard_at_condition();
        assert!(!wizard.can_advance());
        assert!(wizard.next().is_err());
        assert_eq!(wizard.step().number(), 3);
    }

    #[test]
    fn amenities_toggle_as_a_set() {
        let mut wizard = PredictionWizard::new();
        assert!(wizard.toggle_amenity("Gym"));
        assert!(wizard.toggle_amenity("Metro Access"));
        assert!(!wizard.toggle_amenity("Gym"));
        assert!(!wizard.toggle_amenity("  "));
        assert_eq!(wizard.draft().amenities_label(), "Metro Access");
    }

    #[tokio::test]
    async fn pin_location_moves_coordinates() {
        let geocoder = FakeGeocoder {
            coords: Some(Coordinates::new(12.93, 77.62)),
            ..FakeGeocoder::default()
        };
        let mut wizard = PredictionWizard::new();
        wizard.set_location("Koramangala");
        assert!(wizard.pin_location(&geocoder).await);
        assert_eq!(wizard.draft().coordinates(), Some(Coordinates::new(12.93, 77.62)));
    }

    #[tokio::test]
    async fn geocoding_failures_are_swallowed() {
        let geocoder = FakeGeocoder {
            fail: true,
            ..FakeGeocoder::default()
        };
        let mut wizard = PredictionWizard::new();
        wizard.set_location("Koramangala");
        let before = wizard.draft().clone();

        assert!(!wizard.pin_location(&geocoder).await);
        assert_eq!(wizard.draft(), &before);

        assert!(!wizard.drop_pin(&geocoder, Coordinates::new(1.0, 2.0)).await);
        assert_eq!(wizard.draft().location, "Koramangala");
        assert_eq!(wizard.draft().coordinates(), Some(Coordinates::new(1.0, 2.0)));
    }

    #[tokio::test]
    async fn drop_pin_autofills_location() {
        let geocoder = FakeGeocoder {
            address: Some("80 Feet Road, Koramangala, Bengaluru".into()),
            ..FakeGeocoder::default()
        };
        let mut wizard = PredictionWizard::new();
        assert!(wizard.drop_pin(&geocoder, Coordinates::new(12.93, 77.62)).await);
        assert_eq!(wizard.draft().location, "80 Feet Road, Koramangala, Bengaluru");
        assert!(wizard.can_advance());
    }

    #[tokio::test]
    async fn submit_runs_valuation_then_grounding_and_combines() {
        let client = ScriptedClient::new([valuation_ok(), insights_ok()]);
        let mut wizard = wizard_at_condition();

        let result = wizard.submit(&gateway(client.clone())).await.unwrap();
        assert_eq!(wizard.step(), WizardStep::Submitted);
        assert!(!wizard.is_submitting());
        assert_eq!(result.grounding_links.len(), 1);
        assert_eq!(result.predicted_price, sample_result().predicted_price);

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].1.generation_config.is_some());
        assert!(!calls[1].1.tools.is_empty());
    }

    #[tokio::test]
    async fn valuation_failure_skips_grounding_and_returns_to_condition() {
        let client = ScriptedClient::new([provider_error(), insights_ok()]);
        let mut wizard = wizard_at_condition();

        let err = wizard.submit(&gateway(client.clone())).await.unwrap_err();
        assert!(matches!(err, SubmitError::Valuation(_)));
        assert_eq!(wizard.step(), WizardStep::Condition);
        assert!(!wizard.is_submitting());
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn grounding_failure_discards_the_valuation() {
        let client = ScriptedClient::new([valuation_ok(), provider_error()]);
        let mut wizard = wizard_at_condition();

        let err = wizard.submit(&gateway(client)).await.unwrap_err();
        assert!(matches!(err, SubmitError::Insights(_)));
        assert_eq!(wizard.step(), WizardStep::Condition);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_submission_can_be_retried() {
        let mut wizard = wizard_at_condition();

        let abandoned =
            tokio::time::timeout(Duration::from_secs(5), wizard.submit(&stalled_gateway())).await;
        assert!(abandoned.is_err());
        assert!(!wizard.is_submitting());
        assert_eq!(wizard.step(), WizardStep::Condition);

        let client = ScriptedClient::new([valuation_ok(), insights_ok()]);
        assert!(wizard.submit(&gateway(client)).await.is_ok());
        assert_eq!(wizard.step(), WizardStep::Submitted);
    }

    #[tokio::test]
    async fn submit_is_only_reachable_from_condition() {
        let client = ScriptedClient::new([]);
        let mut wizard = PredictionWizard::new();
        wizard.set_location("Koramangala");
        let err = wizard.submit(&gateway(client.clone())).await.unwrap_err();
        assert!(matches!(err, SubmitError::NotReady));
        assert!(client.calls().is_empty());
    }
}
