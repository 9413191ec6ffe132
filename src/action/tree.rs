use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::agent::StatusCode;
use crate::web_request::WebRequestRecord;

/// Payload of one record nested under an action.
#[derive(Clone, Debug, PartialEq)]
pub enum AttachmentValue {
    Event,
    IntValue(i64),
    DoubleValue(f64),
    StringValue(String),
    Error { code: i32 },
    Exception { message: String, stack: Option<String> },
    WebRequest(WebRequestRecord),
    VisitEnd,
}

/// Immutable record owned by exactly one action.
#[derive(Clone, Debug, PartialEq)]
pub struct Attachment {
    pub(crate) seq: u64,
    pub(crate) name: String,
    pub(crate) recorded_at_ms: i64,
    pub(crate) value: AttachmentValue,
}

/// Child position inside an open action: either a still-open action id or a
/// subtree that was already closed in place.
#[derive(Debug)]
enum ChildSlot {
    Open(u64),
    Closed(ClosedAction),
}

#[derive(Debug)]
struct OpenAction {
    name: String,
    parent: Option<u64>,
    started: Instant,
    start_wall_ms: i64,
    children: Vec<ChildSlot>,
    attachments: Vec<Attachment>,
}

/// A finished action subtree. Once built it is immutable and safe to share
/// across threads without further synchronization.
#[derive(Clone, Debug, PartialEq)]
pub struct ClosedAction {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) start_wall_ms: i64,
    pub(crate) duration: Duration,
    pub(crate) attachments: Vec<Attachment>,
    pub(crate) children: Vec<ClosedAction>,
}

impl ClosedAction {
    /// Single-node tree wrapping one attachment, used for action-less
    /// (standalone) error, exception, and visit-end reporting.
    pub(crate) fn standalone(id: u64, name: String, wall_ms: i64, value: AttachmentValue) -> Self {
        Self {
            id,
            name: name.clone(),
            start_wall_ms: wall_ms,
            duration: Duration::ZERO,
            attachments: vec![Attachment {
                seq: 0,
                name,
                recorded_at_ms: wall_ms,
                value,
            }],
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn children(&self) -> &[ClosedAction] {
        &self.children
    }
}

impl Attachment {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &AttachmentValue {
        &self.value
    }
}

/// Why a table operation could not be applied to the given action id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AttachError {
    /// The action was already closed.
    Ended,
    /// The id never belonged to an action in this table.
    NotFound,
}

impl AttachError {
    pub fn status(self) -> StatusCode {
        match self {
            AttachError::Ended => StatusCode::ActionEnded,
            AttachError::NotFound => StatusCode::ActionNotFound,
        }
    }
}

/// Owner of all open actions, keyed by tag id.
///
/// Callers hold opaque ids, never references into the table, so application
/// threads cannot alias action state. All mutation happens under the
/// agent's table mutex; the sequence counter assigned here gives attachments
/// a deterministic total order even under concurrent reporting.
#[derive(Default)]
pub(crate) struct ActionTable {
    open: HashMap<u64, OpenAction>,
    closed: HashSet<u64>,
    /// Enter order of open actions; the last entry is the current action.
    order: Vec<u64>,
    next_seq: u64,
}

impl ActionTable {
    pub fn enter(&mut self, id: u64, name: String, parent: Option<u64>) -> Result<(), AttachError> {
        if let Some(parent_id) = parent {
            if self.closed.contains(&parent_id) {
                return Err(AttachError::Ended);
            }
            let Some(parent_node) = self.open.get_mut(&parent_id) else {
                return Err(AttachError::NotFound);
            };
            parent_node.children.push(ChildSlot::Open(id));
        }
        self.open.insert(
            id,
            OpenAction {
                name,
                parent,
                started: Instant::now(),
                start_wall_ms: chrono::Utc::now().timestamp_millis(),
                children: Vec::new(),
                attachments: Vec::new(),
            },
        );
        self.order.push(id);
        Ok(())
    }

    pub fn attach(
        &mut self,
        id: u64,
        name: String,
        value: AttachmentValue,
        wall_ms: i64,
    ) -> Result<(), AttachError> {
        if self.closed.contains(&id) {
            return Err(AttachError::Ended);
        }
        let Some(node) = self.open.get_mut(&id) else {
            return Err(AttachError::NotFound);
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        node.attachments.push(Attachment {
            seq,
            name,
            recorded_at_ms: wall_ms,
            value,
        });
        Ok(())
    }

    /// Closes `id`, force-closing open descendants first (deepest-first).
    ///
    /// Returns the finished subtree when `id` was a root action; a closed
    /// child stays embedded in its parent and is handed over only when the
    /// root closes, so the transmitted tree is always a whole PurePath.
    pub fn close(&mut self, id: u64, now: Instant) -> Result<Option<ClosedAction>, AttachError> {
        if self.closed.contains(&id) {
            return Err(AttachError::Ended);
        }
        let Some(node) = self.open.get(&id) else {
            return Err(AttachError::NotFound);
        };
        let parent = node.parent;
        let tree = self.close_subtree(id, now);
        match parent.and_then(|pid| self.open.get_mut(&pid)) {
            Some(parent_node) => {
                for slot in parent_node.children.iter_mut() {
                    if matches!(slot, ChildSlot::Open(child) if *child == id) {
                        *slot = ChildSlot::Closed(tree);
                        return Ok(None);
                    }
                }
                // The parent no longer references the child; treat the
                // subtree as a root so it is not lost.
                Ok(Some(tree))
            }
            None => Ok(Some(tree)),
        }
    }

    fn close_subtree(&mut self, id: u64, now: Instant) -> ClosedAction {
        let node = self
            .open
            .remove(&id)
            .expect("close_subtree called for an id that is not open");
        self.closed.insert(id);
        self.order.retain(|open_id| *open_id != id);

        let children = node
            .children
            .into_iter()
            .map(|slot| match slot {
                ChildSlot::Closed(closed) => closed,
                ChildSlot::Open(child_id) => self.close_subtree(child_id, now),
            })
            .collect();

        ClosedAction {
            id,
            name: node.name,
            start_wall_ms: node.start_wall_ms,
            duration: now.saturating_duration_since(node.started),
            attachments: node.attachments,
            children,
        }
    }

    /// Most recently entered action that is still open.
    pub fn current(&self) -> Option<u64> {
        self.order.last().copied()
    }

    #[cfg(test)]
    pub fn is_open(&self, id: u64) -> bool {
        self.open.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enter(table: &mut ActionTable, id: u64, name: &str, parent: Option<u64>) {
        table.enter(id, name.to_string(), parent).expect("enter");
    }

    #[test]
    fn leaving_a_root_returns_the_whole_tree() {
        let mut table = ActionTable::default();
        enter(&mut table, 1, "Login", None);
        enter(&mut table, 2, "Validate", Some(1));

        let child = table.close(2, Instant::now()).expect("close child");
        assert!(child.is_none(), "child must fold into its parent");

        let root = table
            .close(1, Instant::now())
            .expect("close root")
            .expect("root yields a tree");
        assert_eq!(root.name(), "Login");
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.children()[0].name(), "Validate");
        assert!(root.duration() >= root.children()[0].duration());
    }

    #[test]
    fn closing_a_parent_force_closes_open_descendants() {
        let mut table = ActionTable::default();
        enter(&mut table, 1, "root", None);
        enter(&mut table, 2, "child", Some(1));
        enter(&mut table, 3, "grandchild", Some(2));

        let now = Instant::now();
        let root = table.close(1, now).expect("close").expect("tree");
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.children()[0].children().len(), 1);
        // Every node in the enqueued subtree is closed.
        assert!(!table.is_open(1));
        assert!(!table.is_open(2));
        assert!(!table.is_open(3));
        // Intervals nest: each child started later and ended no later.
        let child = &root.children()[0];
        let grandchild = &child.children()[0];
        assert!(root.duration() >= child.duration());
        assert!(child.duration() >= grandchild.duration());
    }

    #[test]
    fn double_close_reports_action_ended() {
        let mut table = ActionTable::default();
        enter(&mut table, 1, "once", None);
        assert!(table.close(1, Instant::now()).is_ok());
        assert_eq!(table.close(1, Instant::now()), Err(AttachError::Ended));
    }

    #[test]
    fn unknown_ids_report_action_not_found() {
        let mut table = ActionTable::default();
        assert_eq!(table.close(99, Instant::now()), Err(AttachError::NotFound));
        assert_eq!(
            table.attach(99, "x".into(), AttachmentValue::Event, 0),
            Err(AttachError::NotFound)
        );
    }

    #[test]
    fn attachments_on_closed_actions_are_rejected() {
        let mut table = ActionTable::default();
        enter(&mut table, 1, "root", None);
        enter(&mut table, 2, "child", Some(1));
        table.close(2, Instant::now()).expect("close child");

        assert_eq!(
            table.attach(2, "late".into(), AttachmentValue::Event, 0),
            Err(AttachError::Ended)
        );
        // The parent is still open and accepts attachments.
        assert!(table
            .attach(1, "ok".into(), AttachmentValue::IntValue(1), 0)
            .is_ok());
    }

    #[test]
    fn entering_under_a_closed_parent_fails() {
        let mut table = ActionTable::default();
        enter(&mut table, 1, "root", None);
        table.close(1, Instant::now()).expect("close");
        assert_eq!(
            table.enter(2, "late child".into(), Some(1)),
            Err(AttachError::Ended)
        );
    }

    #[test]
    fn attachment_sequence_numbers_are_strictly_increasing() {
        let mut table = ActionTable::default();
        enter(&mut table, 1, "root", None);
        enter(&mut table, 2, "child", Some(1));
        table
            .attach(1, "a".into(), AttachmentValue::Event, 0)
            .unwrap();
        table
            .attach(2, "b".into(), AttachmentValue::Event, 0)
            .unwrap();
        table
            .attach(1, "c".into(), AttachmentValue::Event, 0)
            .unwrap();

        let root = table.close(1, Instant::now()).unwrap().unwrap();
        let seqs: Vec<u64> = root.attachments().iter().map(|a| a.seq).collect();
        assert_eq!(seqs, vec![0, 2]);
        assert_eq!(root.children()[0].attachments()[0].seq, 1);
    }

    #[test]
    fn current_action_tracks_enter_and_close_order() {
        let mut table = ActionTable::default();
        assert_eq!(table.current(), None);
        enter(&mut table, 1, "a", None);
        enter(&mut table, 2, "b", Some(1));
        assert_eq!(table.current(), Some(2));
        table.close(2, Instant::now()).unwrap();
        assert_eq!(table.current(), Some(1));
        table.close(1, Instant::now()).unwrap();
        assert_eq!(table.current(), None);
    }
}
