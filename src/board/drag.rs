//! Drag-and-drop resolution: turns a drop gesture into a move request.

use boardsync_common::IssueStatus;

use super::cache::BoardCache;

/// What the pointer was over when the drag ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// An empty stretch of a column.
    Column(IssueStatus),
    /// Another issue card; the drop lands in that card's column.
    Issue(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragEnd {
    pub active_id: String,
    pub over: Option<DropTarget>,
    /// Position in the target column, if the UI reported one.
    pub index: Option<usize>,
}

/// Tracks the card currently being dragged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragState {
    dragged: Option<String>,
}

impl DragState {
    pub fn start(&mut self, issue_id: impl Into<String>) {
        self.dragged = Some(issue_id.into());
    }

    /// Clear the drag and return the id that was being dragged.
    pub fn end(&mut self) -> Option<String> {
        self.dragged.take()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragged.is_some()
    }

    pub fn dragged_id(&self) -> Option<&str> {
        self.dragged.as_deref()
    }
}

/// Column a drop target stands for. `None` if it names an issue that is not
/// cached.
pub fn resolve_target(cache: &BoardCache, target: &DropTarget) -> Option<IssueStatus> {
    match target {
        DropTarget::Column(status) => Some(*status),
        DropTarget::Issue(id) => cache.status_of(id),
    }
}

/// Status and index a drag-end should move the active issue to.
///
/// The index is the reported one when present, else the position of the
/// issue dropped on, else the end of the column.
pub fn resolve_drop(cache: &BoardCache, drag: &DragEnd) -> Option<(IssueStatus, usize)> {
    let over = drag.over.as_ref()?;
    if !cache.contains(&drag.active_id) {
        return None;
    }
    let status = resolve_target(cache, over)?;

    let column = cache.column(status);
    let index = drag.index.unwrap_or_else(|| match over {
        DropTarget::Issue(id) => column
            .iter()
            .position(|i| &i.id == id)
            .unwrap_or(column.len()),
        DropTarget::Column(_) => column.len(),
    });
    Some((status, index))
}
