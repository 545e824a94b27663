use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

pub const BLANK_MESSAGE: &str = "can't be blank";

/// Validation messages keyed by attribute name.
///
/// Serializes as a plain object, e.g. `{"title": ["can't be blank"]}`.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Error)]
#[serde(transparent)]
#[error("Validation failed: {}", full_messages(.0).join(", "))]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

fn full_messages(errors: &BTreeMap<&'static str, Vec<String>>) -> Vec<String> {
    errors
        .iter()
        .flat_map(|(attribute, messages)| {
            messages
                .iter()
                .map(move |message| format!("{attribute} {message}"))
        })
        .collect()
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, attribute: &'static str, message: impl Into<String>) {
        self.0.entry(attribute).or_default().push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn on(&self, attribute: &str) -> &[String] {
        self.0.get(attribute).map(Vec::as_slice).unwrap_or_default()
    }

    /// Messages prefixed with their attribute, in attribute order.
    #[must_use]
    pub fn full_messages(&self) -> Vec<String> {
        full_messages(&self.0)
    }

    /// `Ok(())` when nothing was recorded, otherwise the errors themselves.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}
