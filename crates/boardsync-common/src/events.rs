use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Issue, IssueStatus};

pub const ISSUE_CREATED: &str = "issue:created";
pub const ISSUE_UPDATED: &str = "issue:updated";
pub const ISSUE_MOVED: &str = "issue:moved";
pub const ISSUE_DELETED: &str = "issue:deleted";

/// A real-time notification about an issue on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BoardEvent {
    IssueCreated {
        issue: Issue,
    },
    IssueUpdated {
        issue: Issue,
    },
    IssueMoved {
        issue: Issue,
        from_status: IssueStatus,
        to_status: IssueStatus,
        position: Option<usize>,
    },
    IssueDeleted {
        issue_id: String,
        project_id: String,
    },
}

#[derive(Debug, Error)]
#[error("Malformed '{event}' payload: {source}")]
pub struct EventDecodeError {
    pub event: String,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Deserialize)]
struct IssuePayload {
    issue: Issue,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovedPayload {
    issue: Issue,
    from_status: IssueStatus,
    to_status: IssueStatus,
    #[serde(default)]
    position: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeletedPayload {
    issue_id: String,
    project_id: String,
}

impl BoardEvent {
    /// Decode a named socket event. Names this board does not react to
    /// (comments, presence, notifications) decode to `None`.
    pub fn decode(
        event: &str,
        payload: serde_json::Value,
    ) -> Result<Option<BoardEvent>, EventDecodeError> {
        let wrap = |source| EventDecodeError {
            event: event.to_string(),
            source,
        };
        let decoded = match event {
            ISSUE_CREATED => {
                let p: IssuePayload = serde_json::from_value(payload).map_err(wrap)?;
                BoardEvent::IssueCreated { issue: p.issue }
            }
            ISSUE_UPDATED => {
                let p: IssuePayload = serde_json::from_value(payload).map_err(wrap)?;
                BoardEvent::IssueUpdated { issue: p.issue }
            }
            ISSUE_MOVED => {
                let p: MovedPayload = serde_json::from_value(payload).map_err(wrap)?;
                BoardEvent::IssueMoved {
                    issue: p.issue,
                    from_status: p.from_status,
                    to_status: p.to_status,
                    position: p.position,
                }
            }
            ISSUE_DELETED => {
                let p: DeletedPayload = serde_json::from_value(payload).map_err(wrap)?;
                BoardEvent::IssueDeleted {
                    issue_id: p.issue_id,
                    project_id: p.project_id,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(decoded))
    }

    pub fn project_id(&self) -> &str {
        match self {
            BoardEvent::IssueCreated { issue }
            | BoardEvent::IssueUpdated { issue }
            | BoardEvent::IssueMoved { issue, .. } => &issue.project_id,
            BoardEvent::IssueDeleted { project_id, .. } => project_id,
        }
    }

    pub fn issue_id(&self) -> &str {
        match self {
            BoardEvent::IssueCreated { issue }
            | BoardEvent::IssueUpdated { issue }
            | BoardEvent::IssueMoved { issue, .. } => &issue.id,
            BoardEvent::IssueDeleted { issue_id, .. } => issue_id,
        }
    }
}
