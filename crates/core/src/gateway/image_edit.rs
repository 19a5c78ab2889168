//! Image edit call shape and data-URI helpers.

use super::wire::{GenerateContentRequest, Part};
use super::ModelGateway;
use crate::constants::DEFAULT_IMAGE_MIME;
use crate::error::{ImageEditError, ImageEditResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Split a data URI into its mime type and base64 payload.
///
/// Anything without a `data:` prefix is treated as a bare base64 PNG.
pub fn split_data_uri(image: &str) -> (&str, &str) {
    let trimmed = image.trim();
    let Some(rest) = trimmed.strip_prefix("data:") else {
        return (DEFAULT_IMAGE_MIME, trimmed);
    };
    let Some((header, data)) = rest.split_once(',') else {
        return (DEFAULT_IMAGE_MIME, trimmed);
    };

    let mime = header.split(';').next().unwrap_or_default().trim();
    let mime = if mime.is_empty() { DEFAULT_IMAGE_MIME } else { mime };
    (mime, data)
}

/// Wrap a base64 payload as a data URI.
pub fn to_data_uri(mime_type: &str, data: &str) -> String {
    let mime = if mime_type.trim().is_empty() {
        DEFAULT_IMAGE_MIME
    } else {
        mime_type.trim()
    };
    format!("data:{mime};base64,{data}")
}

fn edit_prompt(instruction: &str, property_type: &str) -> String {
    format!(
        "You are an architectural visualizer. Edit this {property_type} photo: \"{instruction}\". \
         Improve visual appeal or show renovations relevant to a {property_type}. \
         Keep the context of the property type consistent."
    )
}

impl ModelGateway {
    /// Apply a free-text `instruction` to `image` (a data URI) and return the edited data URI.
    ///
    /// `property_type` defaults to "Property" when not given.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `ImageEditError::EmptyInstruction` for a blank instruction,
    /// - `ImageEditError::InvalidImage` if the payload is not valid base64,
    /// - `ImageEditError::Gateway` if the call fails,
    /// - `ImageEditError::NoImage` if the response holds no image part.
    pub async fn edit_image(
        &self,
        image: &str,
        instruction: &str,
        property_type: Option<&str>,
    ) -> ImageEditResult<String> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(ImageEditError::EmptyInstruction);
        }

        let (mime_type, data) = split_data_uri(image);
        BASE64
            .decode(data.as_bytes())
            .map_err(ImageEditError::InvalidImage)?;

        let property_type = property_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Property");

        let request = GenerateContentRequest::from_parts(vec![
            Part::inline(mime_type, data),
            Part::text(edit_prompt(instruction, property_type)),
        ]);

        let response = self.call_image_model(&request).await?;
        let inline = response.first_inline_data().ok_or(ImageEditError::NoImage)?;
        tracing::info!(%property_type, mime = %inline.mime_type, "image edit received");

        Ok(to_data_uri(&inline.mime_type, &inline.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{gateway, response, text_response, ScriptedClient};
    use serde_json::json;

    const PNG_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn split_handles_prefixed_and_bare_payloads() {
        assert_eq!(split_data_uri(PNG_URI), ("image/png", "iVBORw0KGgo="));
        assert_eq!(
            split_data_uri("data:image/jpeg;base64,/9j/"),
            ("image/jpeg", "/9j/")
        );
        assert_eq!(split_data_uri("iVBORw0KGgo="), ("image/png", "iVBORw0KGgo="));
        assert_eq!(split_data_uri("data:;base64,AA=="), ("image/png", "AA=="));
    }

    #[test]
    fn data_uri_round_trip_defaults_mime() {
        assert_eq!(to_data_uri("", "AA=="), "data:image/png;base64,AA==");
        assert_eq!(to_data_uri("image/webp", "AA=="), "data:image/webp;base64,AA==");
    }

    #[tokio::test]
    async fn edit_sends_stripped_image_and_wraps_first_image_part() {
        let client = ScriptedClient::new([response(json!({
            "candidates": [{"content": {"parts": [
                {"text": "Here is the renovated kitchen."},
                {"inlineData": {"mimeType": "image/png", "data": "RURJVEVE"}},
                {"inlineData": {"mimeType": "image/png", "data": "U0VDT05E"}}
            ]}}]
        }))]);

        let edited = gateway(client.clone())
            .edit_image(PNG_URI, "add a skylight", Some("Individual House"))
            .await
            .unwrap();
        assert_eq!(edited, "data:image/png;base64,RURJVEVE");

        let (model, request) = &client.calls()[0];
        assert_eq!(model, "image-model");
        let parts = &request.contents[0].parts;
        let inline = parts[0].inline_data.as_ref().unwrap();
        assert_eq!(inline.data, "iVBORw0KGgo=");
        assert_eq!(inline.mime_type, "image/png");
        let prompt = parts[1].text.as_deref().unwrap();
        assert!(prompt.contains("add a skylight"));
        assert!(prompt.contains("Individual House"));
    }

    #[tokio::test]
    async fn text_only_response_is_an_error() {
        let client = ScriptedClient::new([text_response("I cannot edit this image.")]);
        let err = gateway(client)
            .edit_image(PNG_URI, "paint it blue", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ImageEditError::NoImage));
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_provider() {
        let client = ScriptedClient::new([]);
        let gw = gateway(client.clone());

        let err = gw.edit_image("data:image/png;base64,@@@", "x", None).await.unwrap_err();
        assert!(matches!(err, ImageEditError::InvalidImage(_)));

        let err = gw.edit_image(PNG_URI, "   ", None).await.unwrap_err();
        assert!(matches!(err, ImageEditError::EmptyInstruction));

        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn default_property_label_is_used() {
        let client = ScriptedClient::new([response(json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/jpeg", "data": "AA=="}}
            ]}}]
        }))]);
        let edited = gateway(client.clone())
            .edit_image(PNG_URI, "declutter", None)
            .await
            .unwrap();
        assert_eq!(edited, "data:image/jpeg;base64,AA==");
        let (_, request) = &client.calls()[0];
        assert!(request.contents[0].parts[1]
            .text
            .as_deref()
            .unwrap()
            .contains("Edit this Property photo"));
    }
}
