// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire models for interactive-callback payloads.
//!
//! The platform delivers element clicks as a form-encoded POST whose single
//! `payload` field holds a JSON document. Only the fields the engine needs
//! are modeled; everything else in the document is ignored.

use serde::Deserialize;

/// The form body of an interactive callback: one `payload` field of JSON.
#[derive(Debug, Deserialize)]
pub struct InteractionForm {
    pub payload: String,
}

/// The JSON document inside the `payload` form field.
#[derive(Debug, Deserialize)]
pub struct InteractivePayload {
    /// Shared-secret verification token supplied by the platform.
    #[serde(default)]
    pub token: String,
    /// Correlation token the outgoing message was registered under.
    pub callback_id: String,
    #[serde(default)]
    pub actions: Vec<PayloadAction>,
}

impl InteractivePayload {
    /// The answer value of the first action, if one is usable.
    pub fn first_answer(&self) -> Option<&str> {
        self.actions.first().and_then(PayloadAction::answer_value)
    }
}

/// A single element interaction inside a payload.
#[derive(Debug, Deserialize)]
pub struct PayloadAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
}

impl PayloadAction {
    /// Where the answer lives depends on the element type: buttons carry it
    /// in `value`, dropdowns in `selected_options[0].value`.
    pub fn answer_value(&self) -> Option<&str> {
        match self.kind.as_str() {
            "button" => self.value.as_deref(),
            "select" => self.selected_options.first().map(|o| o.value.as_str()),
            _ => None,
        }
    }
}

/// One selected entry of a dropdown element.
#[derive(Debug, Deserialize)]
pub struct SelectedOption {
    pub value: String,
}
