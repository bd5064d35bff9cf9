//! Sync layer: runs the engine's remote work and applies the results.
//!
//! DESIGN
//! ======
//! `BoardSession` owns an [`EngineCore`] and executes the [`Action`]s it
//! returns. Every remote call is spawned as a Tokio task that reports back
//! over an unbounded channel; outcomes are applied only on the owner's
//! thread through [`BoardSession::pump`], [`BoardSession::next_outcome`] or
//! [`BoardSession::settle`], so the engine is never touched concurrently.
//! Event methods spawn tasks and must be called within a Tokio runtime.
//!
//! Each outcome is tagged with the board generation it was issued under.
//! Opening another board bumps the generation, and late outcomes from the
//! previous board are dropped.
//!
//! ERROR HANDLING
//! ==============
//! Creates are applied when the store returns the record. Deletes are
//! applied only after the store confirms. Position and content edits are
//! optimistic; a failed edit is reported as a [`Notice`] and the local
//! change is kept or reverted according to [`RollbackPolicy`]. Nothing is
//! retried.
//!
//! Updates send the whole record, so the store holds whatever the last
//! successful update sent. The session keeps that record per entity as the
//! revert target. A failed update reverts only once no other update for the
//! same entity is still in flight, and then to the store's record rather
//! than to the snapshot taken when the failed update was issued.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{Actor, Container, ContainerApi, EntityApi, NewContainer};
use crate::camera::Point;
use crate::config::{BoardConfig, RollbackPolicy};
use crate::consts::DEFAULT_BOARD_NAME;
use crate::doc::{ContainerId, Entity, EntityId, EntityKind, EntityRef};
use crate::engine::{Action, BoardContext, EngineCore};
use crate::error::{ApiError, ErrorCode, LoadError, MutationError, ValidationError};
use crate::http::HttpStore;
use crate::input::{InputSubscription, Key, KeyFocus, LongPressToken, PointerSource, PointerTarget, Tool};
use crate::render::Scene;

// =============================================================================
// TYPES
// =============================================================================

/// Asks the user to confirm a delete. Returning `false` cancels it.
pub trait DeletePrompt {
    fn confirm(&self, target: EntityRef) -> bool;
}

impl<F: Fn(EntityRef) -> bool> DeletePrompt for F {
    fn confirm(&self, target: EntityRef) -> bool {
        self(target)
    }
}

/// Progress of the initial fetch for the open board.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(LoadError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    /// Error code for failures.
    pub code: Option<&'static str>,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Info, message: message.into(), code: None }
    }

    fn error<E: ErrorCode + std::fmt::Display>(err: &E) -> Self {
        Self { kind: NoticeKind::Error, message: err.to_string(), code: Some(err.error_code()) }
    }
}

enum SyncOutcome {
    Created(Result<Entity, MutationError>),
    Updated { seq: u64, sent: Entity, announce: Option<String>, result: Result<(), MutationError> },
    Deleted { target: EntityRef, result: Result<(), MutationError> },
    LongPress(LongPressToken),
}

struct Tagged {
    generation: u64,
    outcome: SyncOutcome,
}

// =============================================================================
// SESSION
// =============================================================================

pub struct BoardSession {
    engine: EngineCore,
    entities: Arc<dyn EntityApi>,
    containers: Arc<dyn ContainerApi>,
    prompt: Box<dyn DeletePrompt>,
    actor: Actor,
    rollback: RollbackPolicy,
    container: Option<Container>,
    known: Vec<Container>,
    load: LoadState,
    generation: u64,
    tx: mpsc::UnboundedSender<Tagged>,
    rx: mpsc::UnboundedReceiver<Tagged>,
    in_flight: usize,
    notices: Vec<Notice>,
    dirty: bool,
    long_press: Option<(LongPressToken, JoinHandle<()>)>,
    update_seq: u64,
    /// Updates in flight per entity.
    pending_updates: HashMap<EntityRef, usize>,
    /// Last record the store is known to hold, with the update that sent it.
    stored: HashMap<EntityRef, (u64, Entity)>,
}

impl BoardSession {
    pub fn new(
        entities: Arc<dyn EntityApi>,
        containers: Arc<dyn ContainerApi>,
        prompt: impl DeletePrompt + 'static,
        actor: Actor,
        config: &BoardConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            engine: EngineCore::with_thresholds(config.thresholds),
            entities,
            containers,
            prompt: Box::new(prompt),
            actor,
            rollback: config.rollback,
            container: None,
            known: Vec::new(),
            load: LoadState::Idle,
            generation: 0,
            tx,
            rx,
            in_flight: 0,
            notices: Vec::new(),
            dirty: false,
            long_press: None,
            update_seq: 0,
            pending_updates: HashMap::new(),
            stored: HashMap::new(),
        }
    }

    /// Session backed by the HTTP store at `config.api_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the HTTP client cannot be built.
    pub fn connect(config: &BoardConfig, actor: Actor, prompt: impl DeletePrompt + 'static) -> Result<Self, ApiError> {
        let store = Arc::new(HttpStore::new(&config.api_url, config.timeouts)?);
        Ok(Self::new(store.clone(), store, prompt, actor, config))
    }

    // --- Accessors ---

    #[must_use]
    pub fn engine(&self) -> &EngineCore {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut EngineCore {
        &mut self.engine
    }

    #[must_use]
    pub fn actor(&self) -> Actor {
        self.actor
    }

    #[must_use]
    pub fn container(&self) -> Option<&Container> {
        self.container.as_ref()
    }

    #[must_use]
    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    /// Remote calls issued and not yet applied.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    #[must_use]
    pub fn scene(&self) -> Scene {
        self.engine.scene()
    }

    /// Whether anything changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // --- Loading ---

    /// Open a board: reset the view and fetch its nodes and notes.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Fetch`] if either list fails. The board stays
    /// empty in [`LoadState::Failed`] until the next `open`.
    pub async fn open(&mut self, container: ContainerId) -> Result<(), LoadError> {
        self.generation += 1;
        self.cancel_timer();
        self.forget_updates();
        self.engine.open_container(BoardContext { container_id: container, owner_id: self.actor.user_id });
        self.container = self.known.iter().find(|c| c.id == container).cloned();
        self.load = LoadState::Loading;
        self.dirty = true;

        let fetched = tokio::try_join!(self.entities.list_nodes(container), self.entities.list_notes(container));
        match fetched {
            Ok((nodes, notes)) => {
                info!(container, nodes = nodes.len(), notes = notes.len(), "board loaded");
                self.engine.load_snapshot(nodes, notes);
                self.load = LoadState::Ready;
                Ok(())
            }
            Err(source) => {
                let err = LoadError::Fetch { container, source };
                warn!(error = %err, "board load failed");
                self.notices.push(Notice::error(&err));
                self.load = LoadState::Failed(err.clone());
                Err(err)
            }
        }
    }

    // --- Boards ---

    /// Boards visible to the acting user.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Container`] if the store call fails.
    pub async fn list_containers(&mut self) -> Result<Vec<Container>, MutationError> {
        let list = self
            .containers
            .list_containers(self.actor)
            .await
            .map_err(|source| MutationError::Container { op: "list", source })?;
        self.known.clone_from(&list);
        Ok(list)
    }

    /// The user's first board, creating a default one when they have none.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Container`] if listing or creating fails.
    pub async fn ensure_container(&mut self) -> Result<Container, MutationError> {
        let owner = self.actor.user_id;
        let list = self.list_containers().await?;
        match list.into_iter().find(|c| c.user_id == owner) {
            Some(first) => Ok(first),
            None => self.create_container(DEFAULT_BOARD_NAME).await,
        }
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyContainerName`] (wrapped) for a blank
    /// name, or [`MutationError::Container`] if the store rejects it.
    pub async fn create_container(&mut self, name: &str) -> Result<Container, MutationError> {
        let name = self.board_name(name)?;
        let draft = NewContainer { name: name.to_owned(), user_id: self.actor.user_id };
        let result = self.containers.create_container(&draft).await;
        let created = result.map_err(|source| self.container_failed("create", source))?;
        info!(container = created.id, name = %created.name, "board created");
        self.known.push(created.clone());
        self.notices.push(Notice::info(format!("Created board \"{}\"", created.name)));
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyContainerName`] (wrapped) for a blank
    /// name, or [`MutationError::Container`] if the store rejects it.
    pub async fn rename_container(&mut self, id: ContainerId, name: &str) -> Result<Container, MutationError> {
        let name = self.board_name(name)?;
        let result = self.containers.rename_container(id, name).await;
        let renamed = result.map_err(|source| self.container_failed("rename", source))?;
        info!(container = id, name = %renamed.name, "board renamed");
        if let Some(known) = self.known.iter_mut().find(|c| c.id == id) {
            known.clone_from(&renamed);
        }
        if self.container.as_ref().is_some_and(|c| c.id == id) {
            self.container = Some(renamed.clone());
        }
        self.notices.push(Notice::info(format!("Renamed board to \"{}\"", renamed.name)));
        Ok(renamed)
    }

    /// Delete a board. Deleting the open board closes it.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Container`] if the store rejects it.
    pub async fn delete_container(&mut self, id: ContainerId) -> Result<(), MutationError> {
        let result = self.containers.delete_container(id).await;
        result.map_err(|source| self.container_failed("delete", source))?;
        info!(container = id, "board deleted");
        self.known.retain(|c| c.id != id);
        if self.engine.context().is_some_and(|ctx| ctx.container_id == id) {
            self.generation += 1;
            self.cancel_timer();
            self.forget_updates();
            self.engine.close_container();
            self.container = None;
            self.load = LoadState::Idle;
            self.dirty = true;
        }
        self.notices.push(Notice::info("Board deleted"));
        Ok(())
    }

    /// Fetch one board's metadata and remember it.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Container`] if the store call fails.
    pub async fn fetch_container(&mut self, id: ContainerId) -> Result<Container, MutationError> {
        let result = self.containers.get_container(id).await;
        let fetched = result.map_err(|source| self.container_failed("fetch", source))?;
        match self.known.iter_mut().find(|c| c.id == id) {
            Some(known) => known.clone_from(&fetched),
            None => self.known.push(fetched.clone()),
        }
        if self.engine.context().is_some_and(|ctx| ctx.container_id == id) {
            self.container = Some(fetched.clone());
        }
        Ok(fetched)
    }

    /// Switch to `container` and load it.
    ///
    /// # Errors
    ///
    /// Returns the load failure, as [`BoardSession::open`].
    pub async fn switch_container(&mut self, container: Container) -> Result<(), LoadError> {
        let id = container.id;
        if !self.known.iter().any(|c| c.id == id) {
            self.known.push(container);
        }
        self.open(id).await
    }

    // --- Events ---

    pub fn subscribe(&mut self) -> InputSubscription {
        self.engine.subscribe()
    }

    pub fn pointer_down(&mut self, target: PointerTarget, source: PointerSource, screen: Point, now_ms: u64) {
        let actions = self.engine.on_pointer_down(target, source, screen, now_ms);
        self.dispatch(actions);
    }

    pub fn pointer_move(&mut self, screen: Point) {
        let actions = self.engine.on_pointer_move(screen);
        self.dispatch(actions);
    }

    pub fn pointer_up(&mut self, screen: Point, now_ms: u64) {
        let actions = self.engine.on_pointer_up(screen, now_ms);
        self.dispatch(actions);
    }

    pub fn pointer_cancel(&mut self, now_ms: u64) {
        let actions = self.engine.on_pointer_cancel(now_ms);
        self.dispatch(actions);
    }

    pub fn key_down(&mut self, key: &Key, focus: KeyFocus) {
        let actions = self.engine.on_key_down(key, focus);
        self.dispatch(actions);
    }

    pub fn press_tool(&mut self, tool: Tool) {
        let actions = self.engine.press_tool(tool);
        self.dispatch(actions);
    }

    pub fn toggle_tag(&mut self, tag: &str) {
        let actions = self.engine.toggle_tag(tag);
        self.dispatch(actions);
    }

    /// Quick-note button.
    pub fn quick_note(&mut self) {
        let actions = self.engine.create_note_scattered(&mut rand::rng());
        self.dispatch(actions);
    }

    pub fn set_note_text(&mut self, id: EntityId, text: impl Into<String>) {
        let actions = self.engine.set_note_text(id, text);
        self.dispatch(actions);
    }

    pub fn open_editor(&mut self, id: EntityId) {
        let actions = self.engine.open_editor(id);
        self.dispatch(actions);
    }

    pub fn cancel_editor(&mut self) {
        let actions = self.engine.cancel_editor();
        self.dispatch(actions);
    }

    /// Save the node editor draft.
    ///
    /// # Errors
    ///
    /// Returns the draft's [`ValidationError`]; the editor stays open and
    /// nothing is sent.
    pub fn submit_editor(&mut self) -> Result<(), ValidationError> {
        let actions = match self.engine.submit_editor() {
            Ok(actions) => actions,
            Err(err) => {
                self.notices.push(Notice::error(&err));
                return Err(err);
            }
        };
        for action in actions {
            match action {
                Action::PersistNode { node, previous } => {
                    self.persist(Entity::Node(node), Entity::Node(previous), Some("Idea updated".to_owned()));
                }
                other => self.dispatch(vec![other]),
            }
        }
        Ok(())
    }

    /// Tear down for unmount: stop the timer, detach keys, and commit any
    /// drag in progress.
    pub fn dispose(&mut self) {
        self.cancel_timer();
        let actions = self.engine.dispose();
        self.dispatch(actions);
    }

    // --- Outcomes ---

    /// Apply every outcome that has already arrived. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(tagged) = self.rx.try_recv() {
            self.apply(tagged);
            applied += 1;
        }
        applied
    }

    /// Wait for and apply the next outcome. Returns `false` when nothing is
    /// outstanding.
    pub async fn next_outcome(&mut self) -> bool {
        if self.in_flight == 0 && self.long_press.is_none() {
            return false;
        }
        match self.rx.recv().await {
            Some(tagged) => {
                self.apply(tagged);
                true
            }
            None => false,
        }
    }

    /// Wait until every issued remote call has been applied. Armed
    /// long-press timers are not waited for.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            if !self.next_outcome().await {
                break;
            }
        }
    }

    // --- Internals ---

    fn dispatch(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::RenderNeeded | Action::OpenEditor(_) => self.dirty = true,
                Action::CreateNode(draft) => {
                    let api = Arc::clone(&self.entities);
                    self.spawn(async move {
                        let result = api
                            .create_node(&draft)
                            .await
                            .map(Entity::Node)
                            .map_err(|source| MutationError::Create { kind: EntityKind::Node, source });
                        SyncOutcome::Created(result)
                    });
                }
                Action::CreateNote(draft) => {
                    let api = Arc::clone(&self.entities);
                    self.spawn(async move {
                        let result = api
                            .create_note(&draft)
                            .await
                            .map(Entity::Note)
                            .map_err(|source| MutationError::Create { kind: EntityKind::Note, source });
                        SyncOutcome::Created(result)
                    });
                }
                Action::PersistNode { node, previous } => {
                    self.persist(Entity::Node(node), Entity::Node(previous), None);
                }
                Action::PersistNote { note, previous } => {
                    self.persist(Entity::Note(note), Entity::Note(previous), None);
                }
                Action::ConfirmDelete(target) => self.request_delete(target),
                Action::ArmLongPress { token, delay_ms } => self.arm_timer(token, delay_ms),
                Action::CancelLongPress(token) => {
                    if self.long_press.as_ref().is_some_and(|(armed, _)| *armed == token) {
                        self.cancel_timer();
                    }
                }
            }
        }
    }

    /// Send `current` as an update. `previous` is the record before the
    /// local change; it seeds the store's record the first time an entity
    /// is updated.
    fn persist(&mut self, current: Entity, previous: Entity, announce: Option<String>) {
        let target = current.entity_ref();
        self.update_seq += 1;
        let seq = self.update_seq;
        self.stored.entry(target).or_insert((0, previous));
        *self.pending_updates.entry(target).or_default() += 1;

        let api = Arc::clone(&self.entities);
        self.spawn(async move {
            let sent = match &current {
                Entity::Node(node) => api.update_node(node).await,
                Entity::Note(note) => api.update_note(note).await,
            };
            let result = sent.map_err(|source| MutationError::Update { target, source });
            SyncOutcome::Updated { seq, sent: current, announce, result }
        });
    }

    /// Count one update for `target` as finished. Returns how many are
    /// still in flight.
    fn finish_update(&mut self, target: EntityRef) -> usize {
        let Some(count) = self.pending_updates.get_mut(&target) else {
            return 0;
        };
        *count = count.saturating_sub(1);
        let left = *count;
        if left == 0 {
            self.pending_updates.remove(&target);
        }
        left
    }

    fn forget_updates(&mut self) {
        self.pending_updates.clear();
        self.stored.clear();
    }

    fn request_delete(&mut self, target: EntityRef) {
        if !self.prompt.confirm(target) {
            debug!(entity = %target, "delete declined");
            return;
        }
        let api = Arc::clone(&self.entities);
        self.spawn(async move {
            let sent = match target.kind {
                EntityKind::Node => api.delete_node(target.id).await,
                EntityKind::Note => api.delete_note(target.id).await,
            };
            let result = sent.map_err(|source| MutationError::Delete { target, source });
            SyncOutcome::Deleted { target, result }
        });
    }

    fn spawn<F>(&mut self, work: F)
    where
        F: Future<Output = SyncOutcome> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let outcome = work.await;
            if tx.send(Tagged { generation, outcome }).is_err() {
                debug!("session closed before outcome was delivered");
            }
        });
    }

    fn arm_timer(&mut self, token: LongPressToken, delay_ms: u64) {
        self.cancel_timer();
        let tx = self.tx.clone();
        let generation = self.generation;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            if tx.send(Tagged { generation, outcome: SyncOutcome::LongPress(token) }).is_err() {
                debug!("session closed before long-press fired");
            }
        });
        self.long_press = Some((token, handle));
    }

    fn cancel_timer(&mut self) {
        if let Some((_, handle)) = self.long_press.take() {
            handle.abort();
        }
    }

    fn apply(&mut self, tagged: Tagged) {
        let Tagged { generation, outcome } = tagged;
        if let SyncOutcome::LongPress(token) = outcome {
            if self.long_press.as_ref().is_some_and(|(armed, _)| *armed == token) {
                self.long_press = None;
            }
            if generation == self.generation {
                let actions = self.engine.on_long_press_elapsed(token);
                self.dispatch(actions);
            }
            return;
        }

        self.in_flight = self.in_flight.saturating_sub(1);
        if generation != self.generation {
            debug!(generation, current = self.generation, "outcome from a closed board dropped");
            return;
        }
        match outcome {
            SyncOutcome::Created(Ok(entity)) => {
                info!(entity = %entity.entity_ref(), "entity created");
                self.stored.insert(entity.entity_ref(), (0, entity.clone()));
                let actions = self.engine.apply_created(entity);
                self.dispatch(actions);
            }
            SyncOutcome::Updated { seq, sent, announce, result: Ok(()) } => {
                let target = sent.entity_ref();
                debug!(entity = %target, seq, "entity saved");
                self.finish_update(target);
                if self.stored.get(&target).is_none_or(|(at, _)| *at < seq) {
                    self.stored.insert(target, (seq, sent));
                }
                if let Some(message) = announce {
                    self.notices.push(Notice::info(message));
                }
            }
            SyncOutcome::Deleted { target, result: Ok(()) } => {
                info!(entity = %target, "entity deleted");
                self.stored.remove(&target);
                let actions = self.engine.apply_deleted(target);
                self.dispatch(actions);
                self.notices.push(Notice::info(format!("Deleted {target}")));
            }
            SyncOutcome::Updated { sent, result: Err(err), .. } => {
                let target = sent.entity_ref();
                let left = self.finish_update(target);
                warn!(error = %err, rollback = ?self.rollback, in_flight = left, "update failed");
                if self.rollback == RollbackPolicy::Revert && left == 0 {
                    if let Some(record) = self.stored.get(&target).map(|(_, e)| e.clone()) {
                        let actions = self.engine.restore(record);
                        self.dispatch(actions);
                    }
                }
                self.notices.push(Notice::error(&err));
            }
            SyncOutcome::Created(Err(err)) | SyncOutcome::Deleted { result: Err(err), .. } => {
                warn!(error = %err, "mutation failed");
                self.notices.push(Notice::error(&err));
            }
            SyncOutcome::LongPress(_) => {}
        }
        self.dirty = true;
    }

    fn board_name<'a>(&mut self, name: &'a str) -> Result<&'a str, ValidationError> {
        non_empty_name(name).inspect_err(|err| self.notices.push(Notice::error(err)))
    }

    fn container_failed(&mut self, op: &'static str, source: ApiError) -> MutationError {
        let err = MutationError::Container { op, source };
        warn!(error = %err, "board operation failed");
        self.notices.push(Notice::error(&err));
        err
    }
}

fn non_empty_name(name: &str) -> Result<&str, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() { Err(ValidationError::EmptyContainerName) } else { Ok(trimmed) }
}
