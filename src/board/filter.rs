use std::collections::HashSet;

use boardsync_common::{Issue, IssueType, Priority};

/// View-level board filters.
///
/// Criteria are ANDed together; a multi-valued criterion matches when any of
/// its values does. Empty criteria impose no restriction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardFilters {
    pub search: String,
    pub assignee_ids: HashSet<String>,
    pub priorities: HashSet<Priority>,
    pub types: HashSet<IssueType>,
    pub label_ids: HashSet<String>,
    pub epic_id: Option<String>,
}

impl BoardFilters {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_assignees<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assignee_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priorities(mut self, priorities: impl IntoIterator<Item = Priority>) -> Self {
        self.priorities = priorities.into_iter().collect();
        self
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = IssueType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    pub fn with_labels<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_epic(mut self, epic_id: impl Into<String>) -> Self {
        self.epic_id = Some(epic_id.into());
        self
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether any criterion restricts the board.
    pub fn is_active(&self) -> bool {
        *self != Self::default()
    }

    pub fn matches(&self, issue: &Issue) -> bool {
        if !self.search.is_empty() {
            let needle = self.search.to_lowercase();
            if !issue.title.to_lowercase().contains(&needle)
                && !issue.key.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        if !self.assignee_ids.is_empty() {
            match &issue.assignee_id {
                Some(id) if self.assignee_ids.contains(id) => {}
                _ => return false,
            }
        }

        if !self.priorities.is_empty() && !self.priorities.contains(&issue.priority) {
            return false;
        }

        if !self.types.is_empty() && !self.types.contains(&issue.issue_type) {
            return false;
        }

        if !self.label_ids.is_empty() && !self.label_ids.iter().any(|id| issue.has_label(id)) {
            return false;
        }

        if let Some(epic_id) = &self.epic_id
            && issue.epic_id.as_ref() != Some(epic_id)
        {
            return false;
        }

        true
    }

    pub fn apply<'a>(&'a self, issues: impl IntoIterator<Item = &'a Issue>) -> impl Iterator<Item = &'a Issue> {
        issues.into_iter().filter(move |issue| self.matches(issue))
    }
}
