//! Draft state for the node edit modal.
//!
//! The editor works on a copy of the node's editable fields. Nothing reaches
//! the store until the draft passes validation and is submitted through the
//! engine; cancelling simply drops the draft.

#[cfg(test)]
#[path = "editor_test.rs"]
mod editor_test;

use crate::consts::TITLE_MAX_CHARS;
use crate::doc::{EntityId, IdeaNode};
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEditor {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    tags: Vec<String>,
}

impl NodeEditor {
    /// Start editing `node`.
    #[must_use]
    pub fn open(node: &IdeaNode) -> Self {
        Self {
            id: node.id,
            title: node.title.clone(),
            description: node.description.clone(),
            tags: node.tags.clone(),
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Add a tag from the tag input. Surrounding whitespace is trimmed;
    /// empty input and tags already present are ignored. Returns whether
    /// the tag was added.
    pub fn add_tag(&mut self, raw: &str) -> bool {
        let tag = raw.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_owned());
        true
    }

    /// Remove a tag chip. Returns whether it was present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    /// Check the draft can be submitted.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyTitle`] for a blank title and
    /// [`ValidationError::TitleTooLong`] past the title length limit.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let len = self.title.chars().count();
        if len > TITLE_MAX_CHARS {
            return Err(ValidationError::TitleTooLong { len, max: TITLE_MAX_CHARS });
        }
        Ok(())
    }

    /// Copy the draft onto `node`, leaving position and identity untouched.
    pub fn apply_to(&self, node: &mut IdeaNode) {
        node.title.clone_from(&self.title);
        node.description.clone_from(&self.description);
        node.tags.clone_from(&self.tags);
    }
}
