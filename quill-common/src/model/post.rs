use crate::model::{
    Id,
    validation::{BLANK_MESSAGE, ValidationErrors},
};
use serde::{Deserialize, Serialize};
use time::{UtcDateTime, format_description::well_known::Rfc3339};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub fields: PostFields,
    pub created_at: UtcDateTime,
}

impl Post {
    #[must_use]
    pub fn title(&self) -> &str {
        &self.fields.title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.fields.content
    }

    /// `created_at` as RFC 3339, for display.
    #[must_use]
    pub fn created_at_rfc3339(&self) -> String {
        self.created_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.created_at.to_string())
    }
}

/// The attributes of a post that clients may edit.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostFields {
    pub title: String,
    pub content: String,
}

impl PostFields {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.title.trim().is_empty() {
            errors.add("title", BLANK_MESSAGE);
        }
        if self.content.trim().is_empty() {
            errors.add("content", BLANK_MESSAGE);
        }

        errors.into_result()
    }

    /// Overwrites the attributes that were submitted, keeping the rest.
    #[must_use]
    pub fn merge(self, params: PostParams) -> Self {
        Self {
            title: params.title.unwrap_or(self.title),
            content: params.content.unwrap_or(self.content),
        }
    }
}

impl From<PostParams> for PostFields {
    fn from(value: PostParams) -> Self {
        Self::default().merge(value)
    }
}

/// Permitted post parameters from a request.
///
/// Only `title` and `content` exist here; anything else a client sends is
/// dropped while deserializing.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct PostParams {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl PostParams {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}
