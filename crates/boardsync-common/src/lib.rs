//! Shared domain types for boardsync: issues, statuses, patches and the
//! real-time board event vocabulary.

pub mod events;
pub mod models;

pub use events::{BoardEvent, EventDecodeError};
pub use models::{Issue, IssuePatch, IssueStatus, IssueType, Label, NewIssue, Priority};
