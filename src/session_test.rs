use std::collections::HashSet;
use std::sync::Mutex;

use super::*;
use crate::doc::{IdeaNode, NewIdeaNode, NewStickyNote, NodeType, StickyNote};
use crate::input::GestureThresholds;

// =========================================================================
// MockStore
// =========================================================================

#[derive(Default)]
struct MockStore {
    nodes: Mutex<Vec<IdeaNode>>,
    notes: Mutex<Vec<StickyNote>>,
    containers: Mutex<Vec<Container>>,
    failing: Mutex<HashSet<&'static str>>,
    failing_once: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<&'static str>>,
    next_id: Mutex<i64>,
}

impl MockStore {
    fn seeded() -> Arc<Self> {
        let store = Self::default();
        *store.next_id.lock().unwrap() = 100;
        store.nodes.lock().unwrap().extend([node(1, 1, 50.0, 50.0), node(3, 2, 0.0, 0.0)]);
        store.notes.lock().unwrap().extend([note(2, 1, 200.0, 200.0), note(4, 2, 10.0, 10.0)]);
        store.containers.lock().unwrap().extend([board(1, "Roadmap", 7), board(2, "Retro", 7), board(5, "Other", 8)]);
        Arc::new(store)
    }

    fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    fn fail_once(&self, op: &'static str) {
        self.failing_once.lock().unwrap().insert(op);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, op: &'static str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(op);
        if self.failing.lock().unwrap().contains(op) || self.failing_once.lock().unwrap().remove(op) {
            return Err(ApiError::Status { status: 500, body: "boom".into() });
        }
        Ok(())
    }

    fn issue_id(&self) -> i64 {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        *next
    }

    fn stored_node(&self, id: EntityId) -> Option<IdeaNode> {
        self.nodes.lock().unwrap().iter().find(|n| n.id == id).cloned()
    }

    fn stored_note(&self, id: EntityId) -> Option<StickyNote> {
        self.notes.lock().unwrap().iter().find(|n| n.id == id).cloned()
    }
}

#[async_trait::async_trait]
impl EntityApi for MockStore {
    async fn list_nodes(&self, container: ContainerId) -> Result<Vec<IdeaNode>, ApiError> {
        self.check("list_nodes")?;
        Ok(self.nodes.lock().unwrap().iter().filter(|n| n.container_id == container).cloned().collect())
    }

    async fn list_notes(&self, container: ContainerId) -> Result<Vec<StickyNote>, ApiError> {
        self.check("list_notes")?;
        Ok(self.notes.lock().unwrap().iter().filter(|n| n.container_id == container).cloned().collect())
    }

    async fn create_node(&self, draft: &NewIdeaNode) -> Result<IdeaNode, ApiError> {
        self.check("create_node")?;
        let created = IdeaNode {
            id: self.issue_id(),
            container_id: draft.container_id,
            owner_id: draft.owner_id,
            node_type: draft.node_type,
            title: draft.title.clone(),
            description: draft.description.clone(),
            tags: draft.tags.clone(),
            x: draft.x,
            y: draft.y,
            related_idea_ids: Vec::new(),
            created_at: Some(draft.created_at.clone()),
            updated_at: Some(draft.updated_at.clone()),
        };
        self.nodes.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn create_note(&self, draft: &NewStickyNote) -> Result<StickyNote, ApiError> {
        self.check("create_note")?;
        let created = StickyNote {
            id: self.issue_id(),
            container_id: draft.container_id,
            owner_id: draft.owner_id,
            text: draft.text.clone(),
            x: draft.x,
            y: draft.y,
        };
        self.notes.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_node(&self, node: &IdeaNode) -> Result<(), ApiError> {
        self.check("update_node")?;
        let mut nodes = self.nodes.lock().unwrap();
        if let Some(slot) = nodes.iter_mut().find(|n| n.id == node.id) {
            *slot = node.clone();
        }
        Ok(())
    }

    async fn update_note(&self, note: &StickyNote) -> Result<(), ApiError> {
        self.check("update_note")?;
        let mut notes = self.notes.lock().unwrap();
        if let Some(slot) = notes.iter_mut().find(|n| n.id == note.id) {
            *slot = note.clone();
        }
        Ok(())
    }

    async fn delete_node(&self, id: EntityId) -> Result<(), ApiError> {
        self.check("delete_node")?;
        self.nodes.lock().unwrap().retain(|n| n.id != id);
        Ok(())
    }

    async fn delete_note(&self, id: EntityId) -> Result<(), ApiError> {
        self.check("delete_note")?;
        self.notes.lock().unwrap().retain(|n| n.id != id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ContainerApi for MockStore {
    async fn list_containers(&self, actor: Actor) -> Result<Vec<Container>, ApiError> {
        self.check("list_containers")?;
        let all = self.containers.lock().unwrap();
        Ok(all.iter().filter(|c| actor.privileged || c.user_id == actor.user_id).cloned().collect())
    }

    async fn get_container(&self, id: ContainerId) -> Result<Container, ApiError> {
        self.check("get_container")?;
        self.containers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(ApiError::Status { status: 404, body: String::new() })
    }

    async fn create_container(&self, draft: &NewContainer) -> Result<Container, ApiError> {
        self.check("create_container")?;
        let created = board(self.issue_id(), &draft.name, draft.user_id);
        self.containers.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn rename_container(&self, id: ContainerId, name: &str) -> Result<Container, ApiError> {
        self.check("rename_container")?;
        let mut all = self.containers.lock().unwrap();
        let slot = all
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ApiError::Status { status: 404, body: String::new() })?;
        slot.name = name.to_owned();
        Ok(slot.clone())
    }

    async fn delete_container(&self, id: ContainerId) -> Result<(), ApiError> {
        self.check("delete_container")?;
        self.containers.lock().unwrap().retain(|c| c.id != id);
        Ok(())
    }
}

// =========================================================================
// Fixtures
// =========================================================================

fn node(id: EntityId, container: ContainerId, x: f64, y: f64) -> IdeaNode {
    IdeaNode {
        id,
        container_id: container,
        owner_id: 7,
        node_type: NodeType::Idea,
        title: format!("n{id}"),
        description: String::new(),
        tags: Vec::new(),
        x,
        y,
        related_idea_ids: Vec::new(),
        created_at: None,
        updated_at: None,
    }
}

fn note(id: EntityId, container: ContainerId, x: f64, y: f64) -> StickyNote {
    StickyNote { id, container_id: container, owner_id: 7, text: format!("s{id}"), x, y }
}

fn board(id: ContainerId, name: &str, user_id: i64) -> Container {
    Container { id, name: name.to_owned(), user_id, created_at: None, updated_at: None }
}

fn config(rollback: RollbackPolicy) -> BoardConfig {
    BoardConfig {
        rollback,
        thresholds: GestureThresholds { long_press_ms: 20, ..GestureThresholds::default() },
        ..BoardConfig::default()
    }
}

const ACTOR: Actor = Actor { user_id: 7, privileged: false };

fn session(store: &Arc<MockStore>, confirm: bool) -> BoardSession {
    BoardSession::new(store.clone(), store.clone(), move |_: EntityRef| confirm, ACTOR, &config(RollbackPolicy::Keep))
}

fn reverting_session(store: &Arc<MockStore>) -> BoardSession {
    BoardSession::new(store.clone(), store.clone(), |_: EntityRef| true, ACTOR, &config(RollbackPolicy::Revert))
}

async fn opened(store: &Arc<MockStore>) -> BoardSession {
    let mut s = session(store, true);
    s.open(1).await.unwrap();
    s
}

fn on_node(id: EntityId) -> PointerTarget {
    PointerTarget::Entity(EntityRef::node(id))
}

fn on_note(id: EntityId) -> PointerTarget {
    PointerTarget::Entity(EntityRef::note(id))
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn drag_node_1(s: &mut BoardSession) {
    s.pointer_down(on_node(1), PointerSource::Mouse, pt(60.0, 60.0), 0);
    s.pointer_move(pt(100.0, 60.0));
    s.pointer_up(pt(100.0, 60.0), 100);
}

fn select_node_1(s: &mut BoardSession) {
    s.pointer_down(on_node(1), PointerSource::Mouse, pt(55.0, 55.0), 0);
    s.pointer_up(pt(55.0, 55.0), 50);
}

fn error_codes(s: &mut BoardSession) -> Vec<&'static str> {
    s.take_notices().into_iter().filter_map(|n| n.code).collect()
}

// =========================================================================
// Loading
// =========================================================================

#[tokio::test]
async fn open_loads_only_that_board() {
    let store = MockStore::seeded();
    let s = opened(&store).await;
    assert_eq!(s.load_state(), &LoadState::Ready);
    let nodes: Vec<_> = s.engine().doc.nodes().iter().map(|n| n.id).collect();
    let notes: Vec<_> = s.engine().doc.notes().iter().map(|n| n.id).collect();
    assert_eq!(nodes, vec![1]);
    assert_eq!(notes, vec![2]);
    assert_eq!(s.scene().nodes.len(), 1);
}

#[tokio::test]
async fn open_failure_is_terminal_until_reopen() {
    let store = MockStore::seeded();
    store.fail("list_notes");
    let mut s = session(&store, true);
    let err = s.open(1).await.unwrap_err();
    assert!(matches!(err, LoadError::Fetch { container: 1, .. }));
    assert!(matches!(s.load_state(), LoadState::Failed(_)));
    assert!(s.engine().doc.is_empty());
    assert_eq!(error_codes(&mut s), vec!["E_LOAD"]);

    store.failing.lock().unwrap().clear();
    s.open(1).await.unwrap();
    assert_eq!(s.load_state(), &LoadState::Ready);
}

#[tokio::test]
async fn switching_boards_resets_view() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    s.press_tool(Tool::Pan);
    s.pointer_down(PointerTarget::Board, PointerSource::Mouse, pt(0.0, 0.0), 0);
    s.pointer_move(pt(40.0, 40.0));
    s.pointer_up(pt(40.0, 40.0), 10);
    assert_eq!(s.engine().viewport().offset, pt(40.0, 40.0));

    s.switch_container(board(2, "Retro", 7)).await.unwrap();
    assert_eq!(s.engine().viewport().offset, Point::default());
    assert_eq!(s.container().map(|c| c.name.as_str()), Some("Retro"));
    assert_eq!(s.engine().doc.nodes().iter().map(|n| n.id).collect::<Vec<_>>(), vec![3]);
}

// =========================================================================
// Create
// =========================================================================

#[tokio::test]
async fn create_appends_store_record_and_reverts_tool() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    s.press_tool(Tool::CreateNode);
    s.pointer_down(PointerTarget::Board, PointerSource::Mouse, pt(300.0, 120.0), 0);
    assert_eq!(s.in_flight(), 1);
    assert_eq!(s.engine().doc.nodes().len(), 1);

    s.settle().await;
    assert_eq!(s.in_flight(), 0);
    assert_eq!(s.engine().tool(), Tool::Select);
    let created = s.engine().doc.node(101).expect("created node");
    assert_eq!(created.position(), pt(300.0, 120.0));
    assert_eq!(created.container_id, 1);
    assert!(store.stored_node(101).is_some());
}

#[tokio::test]
async fn failed_create_keeps_tool_and_reports() {
    let store = MockStore::seeded();
    store.fail("create_note");
    let mut s = opened(&store).await;
    s.press_tool(Tool::CreateNote);
    s.pointer_down(PointerTarget::Board, PointerSource::Mouse, pt(10.0, 10.0), 0);
    s.settle().await;
    assert_eq!(s.engine().tool(), Tool::CreateNote);
    assert_eq!(s.engine().doc.notes().len(), 1);
    assert_eq!(error_codes(&mut s), vec!["E_CREATE"]);
}

#[tokio::test]
async fn quick_note_lands_near_origin() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    s.quick_note();
    s.settle().await;
    let added = s.engine().doc.notes().last().cloned().expect("note");
    assert_ne!(added.id, 2);
    assert!(added.x >= 0.0 && added.x < 200.0);
    assert!(added.y >= 0.0 && added.y < 200.0);
}

#[tokio::test]
async fn outcomes_from_previous_board_are_dropped() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    s.quick_note();
    s.open(2).await.unwrap();
    s.settle().await;
    assert_eq!(s.in_flight(), 0);
    assert_eq!(s.engine().doc.notes().iter().map(|n| n.id).collect::<Vec<_>>(), vec![4]);
}

// =========================================================================
// Update
// =========================================================================

#[tokio::test]
async fn drag_commit_reaches_store() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    drag_node_1(&mut s);
    s.settle().await;
    assert_eq!(store.stored_node(1).map(|n| n.position()), Some(pt(90.0, 50.0)));
    assert!(s.take_notices().is_empty());
}

#[tokio::test]
async fn plain_tap_does_not_write() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    select_node_1(&mut s);
    s.settle().await;
    assert!(!store.calls().contains(&"update_node"));
    assert_eq!(s.engine().selection().node, Some(1));
}

#[tokio::test]
async fn failed_update_keeps_local_change_by_default() {
    let store = MockStore::seeded();
    store.fail("update_node");
    let mut s = opened(&store).await;
    drag_node_1(&mut s);
    s.settle().await;
    assert_eq!(s.engine().doc.position(EntityRef::node(1)), Some(pt(90.0, 50.0)));
    assert_eq!(store.stored_node(1).map(|n| n.position()), Some(pt(50.0, 50.0)));
    assert_eq!(error_codes(&mut s), vec!["E_UPDATE"]);
}

#[tokio::test]
async fn failed_update_reverts_under_revert_policy() {
    let store = MockStore::seeded();
    store.fail("update_node");
    let mut s = reverting_session(&store);
    s.open(1).await.unwrap();
    drag_node_1(&mut s);
    s.settle().await;
    assert_eq!(s.engine().doc.position(EntityRef::node(1)), Some(pt(50.0, 50.0)));
}

#[tokio::test]
async fn repeated_failed_drags_revert_to_stored_position() {
    let store = MockStore::seeded();
    store.fail("update_node");
    let mut s = reverting_session(&store);
    s.open(1).await.unwrap();
    drag_node_1(&mut s);
    s.pointer_down(on_node(1), PointerSource::Mouse, pt(100.0, 60.0), 1_000);
    s.pointer_move(pt(140.0, 60.0));
    s.pointer_up(pt(140.0, 60.0), 1_100);
    assert_eq!(s.engine().doc.position(EntityRef::node(1)), Some(pt(130.0, 50.0)));

    s.settle().await;
    assert_eq!(s.engine().doc.position(EntityRef::node(1)), Some(pt(50.0, 50.0)));
    assert_eq!(error_codes(&mut s), vec!["E_UPDATE", "E_UPDATE"]);
}

#[tokio::test]
async fn failure_followed_by_success_keeps_saved_state() {
    let store = MockStore::seeded();
    store.fail_once("update_node");
    let mut s = reverting_session(&store);
    s.open(1).await.unwrap();
    drag_node_1(&mut s);
    s.pointer_down(on_node(1), PointerSource::Mouse, pt(100.0, 60.0), 1_000);
    s.pointer_move(pt(140.0, 60.0));
    s.pointer_up(pt(140.0, 60.0), 1_100);

    s.settle().await;
    assert_eq!(s.engine().doc.position(EntityRef::node(1)), Some(pt(130.0, 50.0)));
    assert_eq!(store.stored_node(1).map(|n| n.position()), Some(pt(130.0, 50.0)));
}

#[tokio::test]
async fn failed_text_edit_keeps_saved_drag() {
    let store = MockStore::seeded();
    let mut s = reverting_session(&store);
    s.open(1).await.unwrap();
    s.pointer_down(on_note(2), PointerSource::Mouse, pt(210.0, 210.0), 0);
    s.pointer_move(pt(250.0, 210.0));
    s.pointer_up(pt(250.0, 210.0), 100);
    s.settle().await;

    store.fail("update_note");
    s.set_note_text(2, "changed");
    s.settle().await;

    let local = s.engine().doc.note(2).cloned().unwrap();
    assert_eq!(local.text, "s2");
    assert_eq!((local.x, local.y), (240.0, 200.0));
    let saved = store.stored_note(2).unwrap();
    assert_eq!((saved.x, saved.y, saved.text.as_str()), (240.0, 200.0, "s2"));
}

#[tokio::test]
async fn editor_submit_saves_and_announces() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    s.open_editor(1);
    if let Some(editor) = s.engine_mut().editor_mut() {
        editor.set_title("Launch");
        editor.add_tag("q3");
    }
    s.submit_editor().unwrap();
    s.settle().await;
    let saved = store.stored_node(1).unwrap();
    assert_eq!(saved.title, "Launch");
    assert_eq!(saved.tags, vec!["q3"]);
    let notices = s.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Info);
}

#[tokio::test]
async fn invalid_editor_draft_sends_nothing() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    s.open_editor(1);
    if let Some(editor) = s.engine_mut().editor_mut() {
        editor.set_title("");
    }
    assert_eq!(s.submit_editor(), Err(ValidationError::EmptyTitle));
    assert_eq!(s.in_flight(), 0);
    assert!(s.engine().editor().is_some());
    assert_eq!(error_codes(&mut s), vec!["E_EMPTY_TITLE"]);
}

#[tokio::test]
async fn note_text_edit_reaches_store() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    s.set_note_text(2, "buy milk");
    s.settle().await;
    let stored = store.notes.lock().unwrap().iter().find(|n| n.id == 2).cloned().unwrap();
    assert_eq!(stored.text, "buy milk");
}

// =========================================================================
// Delete
// =========================================================================

#[tokio::test]
async fn delete_applies_only_after_success() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    let _keys = s.subscribe();
    select_node_1(&mut s);
    s.key_down(&Key("Delete".into()), KeyFocus::Board);
    assert_eq!(s.in_flight(), 1);
    assert!(s.engine().doc.contains(EntityRef::node(1)));

    s.settle().await;
    assert!(!s.engine().doc.contains(EntityRef::node(1)));
    assert!(s.engine().selection().is_empty());
    assert!(store.stored_node(1).is_none());
    assert!(s.take_notices().iter().any(|n| n.kind == NoticeKind::Info));
}

#[tokio::test]
async fn failed_delete_leaves_entity_and_selection() {
    let store = MockStore::seeded();
    store.fail("delete_node");
    let mut s = opened(&store).await;
    let _keys = s.subscribe();
    select_node_1(&mut s);
    s.key_down(&Key("Delete".into()), KeyFocus::Board);
    s.settle().await;
    assert!(s.engine().doc.contains(EntityRef::node(1)));
    assert_eq!(s.engine().selection().node, Some(1));
    assert_eq!(error_codes(&mut s), vec!["E_DELETE"]);
}

#[tokio::test]
async fn declined_prompt_sends_nothing() {
    let store = MockStore::seeded();
    let mut s = session(&store, false);
    s.open(1).await.unwrap();
    let _keys = s.subscribe();
    select_node_1(&mut s);
    s.key_down(&Key("Delete".into()), KeyFocus::Board);
    assert_eq!(s.in_flight(), 0);
    assert!(!store.calls().contains(&"delete_node"));
}

#[tokio::test]
async fn prompt_sees_each_requested_entity() {
    let store = MockStore::seeded();
    let asked = Arc::new(Mutex::new(Vec::new()));
    let seen = asked.clone();
    let prompt = move |target: EntityRef| {
        seen.lock().unwrap().push(target);
        false
    };
    let mut s = BoardSession::new(store.clone(), store.clone(), prompt, ACTOR, &config(RollbackPolicy::Keep));
    s.open(1).await.unwrap();
    let _keys = s.subscribe();
    s.engine_mut().ui.selection = crate::input::Selection { node: Some(1), note: Some(2) };
    s.key_down(&Key("Backspace".into()), KeyFocus::Board);
    assert_eq!(*asked.lock().unwrap(), vec![EntityRef::node(1), EntityRef::note(2)]);
}

#[tokio::test]
async fn long_press_deletes_after_timer() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    s.pointer_down(on_node(1), PointerSource::Touch, pt(55.0, 55.0), 0);
    assert!(s.next_outcome().await);
    assert_eq!(s.in_flight(), 1);
    s.settle().await;
    assert!(!s.engine().doc.contains(EntityRef::node(1)));
    s.pointer_up(pt(55.0, 55.0), 1_000);
    assert!(s.engine().selection().is_empty());
    assert_eq!(store.calls().iter().filter(|c| **c == "delete_node").count(), 1);
}

#[tokio::test]
async fn released_press_disarms_timer() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    s.pointer_down(on_node(1), PointerSource::Touch, pt(55.0, 55.0), 0);
    s.pointer_up(pt(55.0, 55.0), 10);
    assert!(!s.next_outcome().await);
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(s.pump(), 0);
    assert!(s.engine().doc.contains(EntityRef::node(1)));
    assert_eq!(s.engine().selection().node, Some(1));
}

// =========================================================================
// Boards
// =========================================================================

#[tokio::test]
async fn lists_only_own_boards_unless_privileged() {
    let store = MockStore::seeded();
    let mut s = session(&store, true);
    assert_eq!(s.list_containers().await.unwrap().len(), 2);

    let mut admin = BoardSession::new(
        store.clone(),
        store.clone(),
        |_: EntityRef| true,
        Actor { user_id: 1, privileged: true },
        &BoardConfig::default(),
    );
    assert_eq!(admin.list_containers().await.unwrap().len(), 3);
}

#[tokio::test]
async fn ensure_container_creates_default_board() {
    let store = Arc::new(MockStore::default());
    let mut s = session(&store, true);
    let created = s.ensure_container().await.unwrap();
    assert_eq!(created.name, DEFAULT_BOARD_NAME);
    assert_eq!(created.user_id, 7);

    let again = s.ensure_container().await.unwrap();
    assert_eq!(again.id, created.id);
    assert_eq!(store.calls().iter().filter(|c| **c == "create_container").count(), 1);
}

#[tokio::test]
async fn privileged_home_board_is_their_own() {
    let store = MockStore::seeded();
    let admin = Actor { user_id: 8, privileged: true };
    let mut s = BoardSession::new(store.clone(), store.clone(), |_: EntityRef| true, admin, &BoardConfig::default());
    let home = s.ensure_container().await.unwrap();
    assert_eq!((home.id, home.user_id), (5, 8));

    let newcomer = Actor { user_id: 9, privileged: true };
    let mut s = BoardSession::new(store.clone(), store.clone(), |_: EntityRef| true, newcomer, &BoardConfig::default());
    let created = s.ensure_container().await.unwrap();
    assert_eq!(created.user_id, 9);
    assert_eq!(created.name, DEFAULT_BOARD_NAME);
}

#[tokio::test]
async fn blank_board_name_is_rejected_locally() {
    let store = MockStore::seeded();
    let mut s = session(&store, true);
    let err = s.rename_container(1, "   ").await.unwrap_err();
    assert_eq!(err, MutationError::Validation(ValidationError::EmptyContainerName));
    assert!(matches!(s.create_container("").await, Err(MutationError::Validation(_))));
    assert!(store.calls().is_empty());
    assert_eq!(error_codes(&mut s), vec!["E_EMPTY_BOARD_NAME", "E_EMPTY_BOARD_NAME"]);
}

#[tokio::test]
async fn rename_updates_open_board() {
    let store = MockStore::seeded();
    let mut s = session(&store, true);
    s.list_containers().await.unwrap();
    s.open(1).await.unwrap();
    let renamed = s.rename_container(1, "  Q3 Roadmap ").await.unwrap();
    assert_eq!(renamed.name, "Q3 Roadmap");
    assert_eq!(s.container().map(|c| c.name.as_str()), Some("Q3 Roadmap"));
}

#[tokio::test]
async fn fetch_fills_in_open_board() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    assert!(s.container().is_none());

    let board = s.fetch_container(1).await.unwrap();
    assert_eq!(board.name, "Roadmap");
    assert_eq!(s.container().map(|c| c.id), Some(1));

    let err = s.fetch_container(99).await.unwrap_err();
    assert!(matches!(err, MutationError::Container { op: "fetch", source: ApiError::Status { status: 404, .. } }));
}

#[tokio::test]
async fn failed_board_op_reports() {
    let store = MockStore::seeded();
    store.fail("create_container");
    let mut s = session(&store, true);
    let err = s.create_container("New").await.unwrap_err();
    assert!(matches!(err, MutationError::Container { op: "create", .. }));
    assert_eq!(error_codes(&mut s), vec!["E_BOARD"]);
}

#[tokio::test]
async fn deleting_open_board_closes_it() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    s.delete_container(1).await.unwrap();
    assert_eq!(s.load_state(), &LoadState::Idle);
    assert!(s.engine().context().is_none());
    assert!(s.engine().doc.is_empty());
    assert!(s.container().is_none());
}

#[tokio::test]
async fn deleting_other_board_keeps_view() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    s.delete_container(2).await.unwrap();
    assert_eq!(s.load_state(), &LoadState::Ready);
    assert!(s.engine().doc.contains(EntityRef::node(1)));
}

// =========================================================================
// Outcome plumbing
// =========================================================================

#[tokio::test]
async fn next_outcome_returns_false_when_idle() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    assert!(!s.next_outcome().await);
    assert_eq!(s.pump(), 0);
}

#[tokio::test]
async fn dirty_flag_tracks_changes() {
    let store = MockStore::seeded();
    let mut s = opened(&store).await;
    assert!(s.take_dirty());
    assert!(!s.take_dirty());
    s.toggle_tag("x");
    assert!(s.take_dirty());
}
