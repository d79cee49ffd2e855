use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Board column an issue lives in. Declaration order is display order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Backlog,
    Todo,
    InProgress,
    InReview,
    Done,
    Cancelled,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 6] = [
        Self::Backlog,
        Self::Todo,
        Self::InProgress,
        Self::InReview,
        Self::Done,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::InReview => "in_review",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    /// Column heading shown on the board.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Backlog => "Backlog",
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::InReview => "In Review",
            Self::Done => "Done",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Position of this status in [`IssueStatus::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backlog" => Ok(Self::Backlog),
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "in_review" => Ok(Self::InReview),
            "done" => Ok(Self::Done),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Lowest,
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lowest => "lowest",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lowest" => Ok(Self::Lowest),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Epic,
    Story,
    Bug,
    Task,
    Subtask,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Story => "story",
            Self::Bug => "bug",
            Self::Task => "task",
            Self::Subtask => "subtask",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "epic" => Ok(Self::Epic),
            "story" => Ok(Self::Story),
            "bug" => Ok(Self::Bug),
            "task" => Ok(Self::Task),
            "subtask" => Ok(Self::Subtask),
            _ => Err(format!("Invalid issue type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// An issue as the board sees it.
///
/// Only `id`, `status` and `order` matter to board synchronization; the rest
/// is carried through untouched for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub key: String,
    pub project_id: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: IssueStatus,
    pub priority: Priority,
    /// Intra-column ordering key. Missing keys sort as `0`.
    #[serde(default)]
    pub order: Option<f64>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub epic_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default, rename = "estimate")]
    pub story_points: Option<f64>,
    #[serde(default)]
    pub due_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    pub fn sort_key(&self) -> f64 {
        self.order.unwrap_or(0.0)
    }

    pub fn has_label(&self, label_id: &str) -> bool {
        self.labels.iter().any(|l| l.id == label_id)
    }
}

/// A partial set of issue fields.
///
/// `None` leaves a field alone. For nullable fields `Some(None)` clears the
/// value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub issue_type: Option<IssueType>,
    pub status: Option<IssueStatus>,
    pub priority: Option<Priority>,
    pub order: Option<f64>,
    pub assignee_id: Option<Option<String>>,
    pub epic_id: Option<Option<String>>,
    pub labels: Option<Vec<Label>>,
    pub story_points: Option<Option<f64>>,
    pub due_date: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl IssuePatch {
    pub fn status(status: IssueStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Every field of `issue`, including status and ordering key.
    pub fn from_issue(issue: &Issue) -> Self {
        Self {
            status: Some(issue.status),
            order: issue.order,
            ..Self::descriptive(issue)
        }
    }

    /// The descriptive fields of `issue`, leaving status and ordering key
    /// untouched.
    pub fn descriptive(issue: &Issue) -> Self {
        Self {
            title: Some(issue.title.clone()),
            description: Some(issue.description.clone()),
            issue_type: Some(issue.issue_type),
            status: None,
            priority: Some(issue.priority),
            order: None,
            assignee_id: Some(issue.assignee_id.clone()),
            epic_id: Some(issue.epic_id.clone()),
            labels: Some(issue.labels.clone()),
            story_points: Some(issue.story_points),
            due_date: Some(issue.due_date.clone()),
            updated_at: Some(issue.updated_at),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_assignee(mut self, assignee_id: Option<String>) -> Self {
        self.assignee_id = Some(assignee_id);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the set fields into `issue`.
    pub fn apply(&self, issue: &mut Issue) {
        if let Some(title) = &self.title {
            issue.title = title.clone();
        }
        if let Some(description) = &self.description {
            issue.description = description.clone();
        }
        if let Some(issue_type) = self.issue_type {
            issue.issue_type = issue_type;
        }
        if let Some(status) = self.status {
            issue.status = status;
        }
        if let Some(priority) = self.priority {
            issue.priority = priority;
        }
        if let Some(order) = self.order {
            issue.order = Some(order);
        }
        if let Some(assignee_id) = &self.assignee_id {
            issue.assignee_id = assignee_id.clone();
        }
        if let Some(epic_id) = &self.epic_id {
            issue.epic_id = epic_id.clone();
        }
        if let Some(labels) = &self.labels {
            issue.labels = labels.clone();
        }
        if let Some(points) = self.story_points {
            issue.story_points = points;
        }
        if let Some(due_date) = &self.due_date {
            issue.due_date = due_date.clone();
        }
        if let Some(updated_at) = self.updated_at {
            issue.updated_at = updated_at;
        }
    }
}

/// Payload for creating an issue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIssue {
    pub project_id: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epic_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(rename = "estimate", skip_serializing_if = "Option::is_none")]
    pub story_points: Option<f64>,
}

impl NewIssue {
    pub fn new(project_id: impl Into<String>, issue_type: IssueType, title: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            issue_type,
            title: title.into(),
            description: None,
            status: None,
            priority: None,
            assignee_id: None,
            epic_id: None,
            parent_id: None,
            label_ids: Vec::new(),
            due_date: None,
            story_points: None,
        }
    }
}
