//! Fixtures and a scriptable gateway double shared by the board tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use boardsync_common::{Issue, IssuePatch, IssueStatus, IssueType, NewIssue, Priority};
use chrono::{TimeZone, Utc};
use tokio::sync::oneshot;

use crate::errors::GatewayError;
use crate::gateway::IssueGateway;

pub fn issue(id: &str, status: IssueStatus, order: Option<f64>) -> Issue {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Issue {
        id: id.to_string(),
        key: format!("WEB-{}", id),
        project_id: "P-1".to_string(),
        issue_type: IssueType::Task,
        title: format!("Issue {}", id),
        description: None,
        status,
        priority: Priority::Medium,
        order,
        assignee_id: None,
        epic_id: None,
        parent_id: None,
        labels: vec![],
        story_points: None,
        due_date: None,
        created_at: at,
        updated_at: at,
    }
}

/// What a scripted status update should do when it is called.
pub enum Reply {
    Ok,
    Fail(GatewayError),
    /// Wait for the test to release the call.
    Wait(oneshot::Receiver<Result<(), GatewayError>>),
}

/// Gateway double. Status updates pop scripted replies in call order;
/// unscripted calls succeed.
#[derive(Default)]
pub struct MockGateway {
    pub issues: Mutex<Vec<Issue>>,
    replies: Mutex<VecDeque<Reply>>,
    status_calls: AtomicUsize,
    pub fail_writes: Mutex<Option<GatewayError>>,
    pub deleted: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn with_issues(issues: Vec<Issue>) -> Self {
        Self {
            issues: Mutex::new(issues),
            ..Default::default()
        }
    }

    pub fn script(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Script a reply the test resolves later through the returned sender.
    pub fn hold(&self) -> oneshot::Sender<Result<(), GatewayError>> {
        let (tx, rx) = oneshot::channel();
        self.script(Reply::Wait(rx));
        tx
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn stored(&self, id: &str) -> Option<Issue> {
        self.issues.lock().unwrap().iter().find(|i| i.id == id).cloned()
    }

    fn write_failure(&self) -> Option<GatewayError> {
        self.fail_writes.lock().unwrap().take()
    }
}

#[async_trait]
impl IssueGateway for MockGateway {
    async fn fetch_project_issues(&self, project_id: &str) -> Result<Vec<Issue>, GatewayError> {
        Ok(self
            .issues
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn update_issue_status(&self, id: &str, status: IssueStatus) -> Result<Issue, GatewayError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Ok);
        match reply {
            Reply::Ok => {}
            Reply::Fail(e) => return Err(e),
            Reply::Wait(rx) => {
                rx.await.map_err(|_| GatewayError::Network("test sender dropped".into()))??;
            }
        }
        let mut updated = self.stored(id).unwrap_or_else(|| issue(id, status, None));
        updated.status = status;
        Ok(updated)
    }

    async fn update_issue_fields(&self, id: &str, patch: &IssuePatch) -> Result<Issue, GatewayError> {
        if let Some(e) = self.write_failure() {
            return Err(e);
        }
        let mut issues = self.issues.lock().unwrap();
        let stored = issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| GatewayError::rejected(404, "NOT_FOUND", "Issue not found"))?;
        patch.apply(stored);
        Ok(stored.clone())
    }

    async fn create_issue(&self, new: &NewIssue) -> Result<Issue, GatewayError> {
        if let Some(e) = self.write_failure() {
            return Err(e);
        }
        let mut issues = self.issues.lock().unwrap();
        let id = format!("N-{}", issues.len() + 1);
        let mut created = issue(&id, new.status.unwrap_or(IssueStatus::Backlog), None);
        created.project_id = new.project_id.clone();
        created.title = new.title.clone();
        created.issue_type = new.issue_type;
        issues.push(created.clone());
        Ok(created)
    }

    async fn delete_issue(&self, id: &str) -> Result<(), GatewayError> {
        if let Some(e) = self.write_failure() {
            return Err(e);
        }
        self.issues.lock().unwrap().retain(|i| i.id != id);
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

/// Tally of issues per status, handy for assertions.
pub fn counts(cache: &crate::board::BoardCache) -> HashMap<IssueStatus, usize> {
    cache.columns().map(|(s, issues)| (s, issues.len())).collect()
}
