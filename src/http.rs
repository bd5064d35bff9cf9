//! HTTP client for the board store.
//!
//! Thin `reqwest` wrapper over the store's REST endpoints. Response
//! decoding is split out into [`parse_body`] so it can be tested without a
//! server.

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::api::{Actor, Container, ContainerApi, EntityApi, NewContainer};
use crate::config::HttpTimeouts;
use crate::doc::{ContainerId, EntityId, IdeaNode, NewIdeaNode, NewStickyNote, StickyNote};
use crate::error::ApiError;

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpStore {
    http: reqwest::Client,
    base: String,
}

impl HttpStore {
    /// Build a client for the store rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the TLS backend or client
    /// cannot be initialized.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(timeouts.connect_secs));
        if let Some(secs) = timeouts.request_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base: base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let text = self.send(self.http.get(self.url(path))).await?;
        parse_body(&text)
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let text = self.send(self.http.post(self.url(path)).json(body)).await?;
        parse_body(&text)
    }

    async fn put<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let text = self.send(self.http.put(self.url(path)).json(body)).await?;
        parse_body(&text)
    }

    /// PUT whose response body, possibly empty, is not needed.
    async fn put_unit<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        self.send(self.http.put(self.url(path)).json(body)).await.map(|_| ())
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(self.http.delete(self.url(path))).await.map(|_| ())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Request(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| ApiError::Request(e.to_string()))?;
        debug!(status = status.as_u16(), bytes = text.len(), "store responded");
        if !status.is_success() {
            return Err(ApiError::Status { status: status.as_u16(), body: text });
        }
        Ok(text)
    }
}

// =============================================================================
// PATHS
// =============================================================================

fn nodes_in(container: ContainerId) -> String {
    format!("/ideas/file/{container}")
}

fn notes_in(container: ContainerId) -> String {
    format!("/notes/file/{container}")
}

fn node_path(id: EntityId) -> String {
    format!("/ideas/{id}")
}

fn note_path(id: EntityId) -> String {
    format!("/notes/{id}")
}

fn containers_for(actor: Actor) -> String {
    if actor.privileged { "/files".to_owned() } else { format!("/files/user/{}", actor.user_id) }
}

fn container_path(id: ContainerId) -> String {
    format!("/files/{id}")
}

#[derive(Serialize)]
struct RenameBody<'a> {
    name: &'a str,
}

// =============================================================================
// TRAIT IMPLS
// =============================================================================

#[async_trait::async_trait]
impl EntityApi for HttpStore {
    async fn list_nodes(&self, container: ContainerId) -> Result<Vec<IdeaNode>, ApiError> {
        self.get(&nodes_in(container)).await
    }

    async fn list_notes(&self, container: ContainerId) -> Result<Vec<StickyNote>, ApiError> {
        self.get(&notes_in(container)).await
    }

    async fn create_node(&self, draft: &NewIdeaNode) -> Result<IdeaNode, ApiError> {
        self.post("/ideas", draft).await
    }

    async fn create_note(&self, draft: &NewStickyNote) -> Result<StickyNote, ApiError> {
        self.post("/notes", draft).await
    }

    async fn update_node(&self, node: &IdeaNode) -> Result<(), ApiError> {
        self.put_unit(&node_path(node.id), node).await
    }

    async fn update_note(&self, note: &StickyNote) -> Result<(), ApiError> {
        self.put_unit(&note_path(note.id), note).await
    }

    async fn delete_node(&self, id: EntityId) -> Result<(), ApiError> {
        self.delete(&node_path(id)).await
    }

    async fn delete_note(&self, id: EntityId) -> Result<(), ApiError> {
        self.delete(&note_path(id)).await
    }
}

#[async_trait::async_trait]
impl ContainerApi for HttpStore {
    async fn list_containers(&self, actor: Actor) -> Result<Vec<Container>, ApiError> {
        self.get(&containers_for(actor)).await
    }

    async fn get_container(&self, id: ContainerId) -> Result<Container, ApiError> {
        self.get(&container_path(id)).await
    }

    async fn create_container(&self, draft: &NewContainer) -> Result<Container, ApiError> {
        self.post("/files", draft).await
    }

    async fn rename_container(&self, id: ContainerId, name: &str) -> Result<Container, ApiError> {
        self.put(&container_path(id), &RenameBody { name }).await
    }

    async fn delete_container(&self, id: ContainerId) -> Result<(), ApiError> {
        self.delete(&container_path(id)).await
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Decode a JSON response body.
///
/// # Errors
///
/// Returns [`ApiError::Parse`] if the body does not match `T`.
pub fn parse_body<T: DeserializeOwned>(json: &str) -> Result<T, ApiError> {
    serde_json::from_str(json).map_err(|e| ApiError::Parse(e.to_string()))
}
