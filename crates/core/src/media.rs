//! AI image editing with a linear undo history.

use crate::error::{ImageEditError, ImageEditResult};
use crate::gateway::ModelGateway;
use crate::property::PropertyType;

/// Ordered list of image data URIs. Never empty: the initial image cannot be undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHistory {
    entries: Vec<String>,
}

impl ImageHistory {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: vec![initial.into()],
        }
    }

    pub fn current(&self) -> &str {
        // `entries` always holds at least the initial image.
        &self.entries[self.entries.len() - 1]
    }

    pub fn initial(&self) -> &str {
        &self.entries[0]
    }

    pub fn push(&mut self, image: impl Into<String>) {
        self.entries.push(image.into());
    }

    pub fn can_undo(&self) -> bool {
        self.entries.len() > 1
    }

    /// Drop the latest edit. Returns `false` (and changes nothing) at the initial image.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.entries.pop();
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
pub struct MediaEditor {
    history: ImageHistory,
    property_type: PropertyType,
    editing: bool,
}

impl MediaEditor {
    pub fn new(initial_image: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            history: ImageHistory::new(initial_image),
            property_type,
            editing: false,
        }
    }

    pub fn current_image(&self) -> &str {
        self.history.current()
    }

    pub fn history(&self) -> &ImageHistory {
        &self.history
    }

    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Edit the current image with `instruction` and push the result onto the history.
    ///
    /// On failure the history is unchanged.
    ///
    /// # Errors
    ///
    /// Returns whatever [`ModelGateway::edit_image`] returns.
    pub async fn apply_edit(
        &mut self,
        gateway: &ModelGateway,
        instruction: &str,
    ) -> ImageEditResult<&str> {
        if instruction.trim().is_empty() {
            return Err(ImageEditError::EmptyInstruction);
        }

        self.editing = true;
        let edited = gateway
            .edit_image(
                self.history.current(),
                instruction,
                Some(self.property_type.label()),
            )
            .await;
        self.editing = false;

        self.history.push(edited?);
        Ok(self.history.current())
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo()
    }
}
