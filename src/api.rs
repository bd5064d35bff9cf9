//! Remote store seams.
//!
//! The session talks to the backing store only through these traits, so
//! tests substitute in-memory stores and the HTTP client lives in
//! [`crate::http`].

use serde::{Deserialize, Serialize};

use crate::doc::{ContainerId, EntityId, IdeaNode, NewIdeaNode, NewStickyNote, StickyNote, UserId};
use crate::error::ApiError;

/// A board: the named container that nodes and notes belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: ContainerId,
    pub name: String,
    pub user_id: UserId,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Create payload for a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContainer {
    pub name: String,
    pub user_id: UserId,
}

/// Who is acting on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    /// Privileged actors may list every board, not just their own.
    pub privileged: bool,
}

/// Node and note persistence.
#[async_trait::async_trait]
pub trait EntityApi: Send + Sync {
    /// All idea nodes in a board.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails or the body is malformed.
    async fn list_nodes(&self, container: ContainerId) -> Result<Vec<IdeaNode>, ApiError>;

    /// All sticky notes in a board.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails or the body is malformed.
    async fn list_notes(&self, container: ContainerId) -> Result<Vec<StickyNote>, ApiError>;

    /// Create a node; the store assigns the id.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the store rejects the record.
    async fn create_node(&self, draft: &NewIdeaNode) -> Result<IdeaNode, ApiError>;

    /// Create a note; the store assigns the id.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the store rejects the record.
    async fn create_note(&self, draft: &NewStickyNote) -> Result<StickyNote, ApiError>;

    /// Replace a stored node with `node`. Only success matters; any
    /// response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the store rejects the update.
    async fn update_node(&self, node: &IdeaNode) -> Result<(), ApiError>;

    /// Replace a stored note with `note`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the store rejects the update.
    async fn update_note(&self, note: &StickyNote) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns an [`ApiError`] if the store rejects the delete.
    async fn delete_node(&self, id: EntityId) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns an [`ApiError`] if the store rejects the delete.
    async fn delete_note(&self, id: EntityId) -> Result<(), ApiError>;
}

/// Board (container) management.
#[async_trait::async_trait]
pub trait ContainerApi: Send + Sync {
    /// Boards visible to `actor`: every board for a privileged actor, the
    /// actor's own otherwise.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails or the body is malformed.
    async fn list_containers(&self, actor: Actor) -> Result<Vec<Container>, ApiError>;

    /// # Errors
    ///
    /// Returns an [`ApiError`] if the board does not exist or the request fails.
    async fn get_container(&self, id: ContainerId) -> Result<Container, ApiError>;

    /// # Errors
    ///
    /// Returns an [`ApiError`] if the store rejects the board.
    async fn create_container(&self, draft: &NewContainer) -> Result<Container, ApiError>;

    /// # Errors
    ///
    /// Returns an [`ApiError`] if the store rejects the rename.
    async fn rename_container(&self, id: ContainerId, name: &str) -> Result<Container, ApiError>;

    /// # Errors
    ///
    /// Returns an [`ApiError`] if the store rejects the delete.
    async fn delete_container(&self, id: ContainerId) -> Result<(), ApiError>;
}
