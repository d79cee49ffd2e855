use std::sync::Arc;
use std::time::Duration;

use boardsync_common::{BoardEvent, EventDecodeError, Issue, IssuePatch, IssueStatus, NewIssue};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cache::BoardView;
use super::coordinator::{MoveCoordinator, MoveOutcome};
use super::drag::{DragEnd, DragState, resolve_drop};
use super::events;
use super::filter::BoardFilters;
use super::notify::{CREATE_FAILED, DELETE_FAILED, DELETED, Notification, Notifier, UPDATE_FAILED};
use super::shared::SharedBoard;
use crate::config::SyncConfig;
use crate::errors::GatewayError;
use crate::gateway::{HttpGateway, IssueGateway};

/// One open project board: cache, pending moves, filters and drag state.
pub struct BoardSync {
    project_id: String,
    board: SharedBoard,
    gateway: Arc<dyn IssueGateway>,
    coordinator: MoveCoordinator,
    notifier: Notifier,
    filters: BoardFilters,
    drag: DragState,
}

impl BoardSync {
    pub fn new(project_id: impl Into<String>, gateway: Arc<dyn IssueGateway>, timeout: Duration) -> Self {
        let board = SharedBoard::default();
        let notifier = Notifier::default();
        let coordinator = MoveCoordinator::new(board.clone(), gateway.clone(), notifier.clone(), timeout);
        Self {
            project_id: project_id.into(),
            board,
            gateway,
            coordinator,
            notifier,
            filters: BoardFilters::default(),
            drag: DragState::default(),
        }
    }

    /// Board backed by the HTTP gateway described in `config`.
    pub fn from_config(project_id: impl Into<String>, config: &SyncConfig) -> Result<Self, GatewayError> {
        let gateway = HttpGateway::new(&config.api)?;
        Ok(Self::new(project_id, Arc::new(gateway), config.api.timeout()))
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn board(&self) -> &SharedBoard {
        &self.board
    }

    pub fn coordinator(&self) -> &MoveCoordinator {
        &self.coordinator
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// Replace the cache with the project's issues from the gateway.
    pub async fn reload(&self) -> Result<usize, GatewayError> {
        let issues = self.gateway.fetch_project_issues(&self.project_id).await?;
        // Moves still in flight stay visible on top of the fetched state.
        let count = self.board.with(|cache| {
            cache.load(issues);
            self.coordinator.reapply_pending(cache);
            cache.len()
        });
        info!(project_id = %self.project_id, count, "board loaded");
        Ok(count)
    }

    pub async fn create_issue(&self, new: NewIssue) -> Result<Issue, GatewayError> {
        match self.gateway.create_issue(&new).await {
            Ok(created) => {
                if created.project_id == self.project_id {
                    self.board.with(|cache| cache.insert(created.clone()));
                }
                self.notifier
                    .notify(Notification::success(format!("{} created successfully!", created.key)));
                Ok(created)
            }
            Err(e) => {
                warn!(project_id = %new.project_id, error = %e, "create failed");
                self.notifier.notify(Notification::error(CREATE_FAILED));
                Err(e)
            }
        }
    }

    /// Update descriptive fields and merge the server's record. An empty
    /// patch for a cached issue sends nothing.
    pub async fn update_issue(&self, id: &str, patch: &IssuePatch) -> Result<Issue, GatewayError> {
        if patch.is_empty()
            && let Some(cached) = self.board.read(|cache| cache.get(id).cloned())
        {
            debug!(issue_id = id, "empty update skipped");
            return Ok(cached);
        }
        match self.gateway.update_issue_fields(id, patch).await {
            Ok(updated) => {
                self.board.with(|cache| {
                    let merge = match self.coordinator.pending_target(id) {
                        Some(_) => IssuePatch::descriptive(&updated),
                        None => IssuePatch::from_issue(&updated),
                    };
                    cache.patch(id, &merge);
                });
                debug!(issue_id = id, "issue updated");
                Ok(updated)
            }
            Err(e) => {
                warn!(issue_id = id, error = %e, "update failed");
                self.notifier.notify(Notification::error(UPDATE_FAILED));
                Err(e)
            }
        }
    }

    pub async fn delete_issue(&self, id: &str) -> Result<(), GatewayError> {
        match self.gateway.delete_issue(id).await {
            Ok(()) => {
                self.board.with(|cache| cache.remove(id));
                self.notifier.notify(Notification::success(DELETED));
                Ok(())
            }
            Err(e) => {
                warn!(issue_id = id, error = %e, "delete failed");
                self.notifier.notify(Notification::error(DELETE_FAILED));
                Err(e)
            }
        }
    }

    pub async fn move_issue(&self, id: &str, target: IssueStatus, index: usize) -> MoveOutcome {
        self.coordinator.move_issue(id, target, index).await
    }

    pub fn drag_start(&mut self, issue_id: &str) {
        self.drag.start(issue_id);
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    /// End the current drag and start the resulting move. The cache already
    /// shows the move when this returns; the handle resolves once the
    /// gateway answers.
    pub fn drag_end(&mut self, end: &DragEnd) -> Option<JoinHandle<MoveOutcome>> {
        self.drag.end();
        let (status, index) = self.board.read(|cache| resolve_drop(cache, end))?;
        self.coordinator.spawn_move(&end.active_id, status, index)
    }

    /// [`drag_end`](Self::drag_end), waiting for the outcome.
    pub async fn drop_issue(&mut self, end: &DragEnd) -> Option<MoveOutcome> {
        self.drag.end();
        let (status, index) = self.board.read(|cache| resolve_drop(cache, end))?;
        Some(self.coordinator.move_issue(&end.active_id, status, index).await)
    }

    /// Apply a real-time event. Events for other projects are ignored.
    pub fn apply_event(&self, event: &BoardEvent) -> bool {
        if event.project_id() != self.project_id {
            debug!(project_id = event.project_id(), issue_id = event.issue_id(), "event for other project ignored");
            return false;
        }
        let applied = self
            .board
            .with(|cache| events::apply(cache, event, |id| self.coordinator.pending_target(id)));
        if applied && let BoardEvent::IssueCreated { issue } = event {
            self.notifier
                .notify(Notification::info(format!("New issue created: {}", issue.key)));
        }
        applied
    }

    /// Decode and apply a named socket message.
    pub fn handle_socket_message(
        &self,
        name: &str,
        payload: serde_json::Value,
    ) -> Result<bool, EventDecodeError> {
        match BoardEvent::decode(name, payload)? {
            Some(event) => Ok(self.apply_event(&event)),
            None => {
                debug!(event = name, "socket event ignored");
                Ok(false)
            }
        }
    }

    /// Apply events until the sender side closes. Returns how many changed
    /// the board.
    pub async fn run_events(&self, mut rx: mpsc::Receiver<BoardEvent>) -> usize {
        let mut applied = 0;
        while let Some(event) = rx.recv().await {
            if self.apply_event(&event) {
                applied += 1;
            }
        }
        debug!(applied, "event stream closed");
        applied
    }

    /// The board as it should be rendered with the current filters.
    pub fn view(&self) -> BoardView {
        self.board.read(|cache| cache.view(&self.filters))
    }

    pub fn filters(&self) -> &BoardFilters {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut BoardFilters {
        &mut self.filters
    }

    pub fn set_filters(&mut self, filters: BoardFilters) {
        self.filters = filters;
    }

    pub fn reset_filters(&mut self) {
        self.filters.reset();
    }
}
