//! Optimistic "move issue to column" orchestration.
//!
//! A move is applied to the cache first, then confirmed with the gateway.
//! Each in-flight move is a [`PendingMutation`] keyed by issue id. A newer
//! move on the same issue replaces the entry, and only the call that matches
//! the current entry may confirm or roll back.
//!
//! ```text
//! Idle ──begin_move──> Optimistic ──ok────> Confirmed
//!                          │      └─error──> RolledBack (snapshot restored, toast)
//!                          └─newer move──> Optimistic (older call resolves as Superseded)
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use boardsync_common::{Issue, IssuePatch, IssueStatus};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cache::BoardCache;
use super::notify::{Notification, Notifier, STATUS_UPDATE_FAILED};
use super::shared::SharedBoard;
use crate::errors::GatewayError;
use crate::gateway::IssueGateway;

/// An optimistic move that has not been confirmed yet.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub seq: u64,
    pub snapshot: Issue,
    pub target: IssueStatus,
    /// Requested position in the target column.
    pub index: usize,
}

/// Identifies one started move; handed to [`MoveCoordinator::settle`].
#[derive(Debug)]
pub struct MoveTicket {
    issue_id: String,
    seq: u64,
    target: IssueStatus,
}

impl MoveTicket {
    pub fn issue_id(&self) -> &str {
        &self.issue_id
    }

    pub fn target(&self) -> IssueStatus {
        self.target
    }
}

#[derive(Debug)]
pub enum MoveStart {
    /// Already in the target column; nothing was sent.
    Unchanged,
    /// Not in the cache (deleted or reloaded away); nothing was sent.
    Missing,
    Started(MoveTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Unchanged,
    Missing,
    Confirmed,
    RolledBack,
    /// A newer move on the same issue took over; the cache was left alone.
    Superseded,
}

struct Inner {
    board: SharedBoard,
    gateway: Arc<dyn IssueGateway>,
    notifier: Notifier,
    timeout: Duration,
    pending: Mutex<HashMap<String, PendingMutation>>,
    next_seq: AtomicU64,
}

#[derive(Clone)]
pub struct MoveCoordinator {
    inner: Arc<Inner>,
}

impl MoveCoordinator {
    pub fn new(
        board: SharedBoard,
        gateway: Arc<dyn IssueGateway>,
        notifier: Notifier,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                board,
                gateway,
                notifier,
                timeout,
                pending: Mutex::new(HashMap::new()),
                next_seq: AtomicU64::new(1),
            }),
        }
    }

    // Lock order is always board, then pending.
    fn pending(&self) -> MutexGuard<'_, HashMap<String, PendingMutation>> {
        self.inner.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Target status of the in-flight move for `issue_id`, if any.
    pub fn pending_target(&self, issue_id: &str) -> Option<IssueStatus> {
        self.pending().get(issue_id).map(|p| p.target)
    }

    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    /// Apply the move to the cache and record it as pending. Synchronous:
    /// the board shows the new column before any request is sent.
    pub fn begin_move(&self, issue_id: &str, target: IssueStatus, index: usize) -> MoveStart {
        self.inner.board.with(|cache| {
            let Some(current) = cache.get(issue_id) else {
                debug!(issue_id, "move for uncached issue ignored");
                return MoveStart::Missing;
            };
            if current.status == target {
                debug!(issue_id, status = %target, "move to same column ignored");
                return MoveStart::Unchanged;
            }

            let snapshot = current.clone();
            cache.reorder(issue_id, target, index);

            let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
            let previous = self.pending().insert(
                issue_id.to_string(),
                PendingMutation {
                    seq,
                    snapshot,
                    target,
                    index,
                },
            );
            if let Some(previous) = previous {
                debug!(issue_id, superseded = previous.seq, seq, "move supersedes in-flight move");
            }

            MoveStart::Started(MoveTicket {
                issue_id: issue_id.to_string(),
                seq,
                target,
            })
        })
    }

    /// Put every in-flight move back on top of freshly loaded server state.
    ///
    /// Call with the lock from [`SharedBoard::with`] held, right after
    /// [`BoardCache::load`]. The fetched record becomes the rollback
    /// snapshot. Returns how many moves were re-applied.
    pub fn reapply_pending(&self, cache: &mut BoardCache) -> usize {
        let mut pending = self.pending();
        let mut reapplied = 0;
        for (id, mutation) in pending.iter_mut() {
            let Some(fetched) = cache.get(id) else {
                debug!(issue_id = %id, "pending move for issue missing after reload");
                continue;
            };
            mutation.snapshot = fetched.clone();
            if fetched.status != mutation.target {
                cache.reorder(id, mutation.target, mutation.index);
                reapplied += 1;
            }
        }
        if reapplied > 0 {
            debug!(reapplied, "pending moves re-applied after reload");
        }
        reapplied
    }

    /// Send the status update for `ticket` and reconcile the cache with the
    /// result.
    pub async fn settle(&self, ticket: MoveTicket) -> MoveOutcome {
        let call = self
            .inner
            .gateway
            .update_issue_status(&ticket.issue_id, ticket.target);
        let result = match tokio::time::timeout(self.inner.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                after: self.inner.timeout,
            }),
        };
        self.resolve(&ticket, result)
    }

    fn resolve(&self, ticket: &MoveTicket, result: Result<Issue, GatewayError>) -> MoveOutcome {
        let id = ticket.issue_id.as_str();
        let outcome = self.inner.board.with(|cache| {
            let mutation = match self.pending().entry(ticket.issue_id.clone()) {
                Entry::Occupied(entry) if entry.get().seq == ticket.seq => entry.remove(),
                _ => {
                    debug!(issue_id = id, seq = ticket.seq, ok = result.is_ok(), "stale move resolution ignored");
                    return MoveOutcome::Superseded;
                }
            };

            match &result {
                Ok(confirmed) => {
                    cache.patch(id, &IssuePatch::descriptive(confirmed));
                    info!(issue_id = id, status = %ticket.target, "move confirmed");
                    MoveOutcome::Confirmed
                }
                Err(e) => {
                    let from = mutation.snapshot.status;
                    if !cache.restore(mutation.snapshot) {
                        debug!(issue_id = id, "rolled-back issue no longer cached");
                    }
                    warn!(issue_id = id, from = %from, to = %ticket.target, error = %e, "move rolled back");
                    MoveOutcome::RolledBack
                }
            }
        });

        if outcome == MoveOutcome::RolledBack {
            self.inner
                .notifier
                .notify(Notification::error(STATUS_UPDATE_FAILED));
        }
        outcome
    }

    /// Move `issue_id` and wait for the gateway to confirm or reject it.
    pub async fn move_issue(&self, issue_id: &str, target: IssueStatus, index: usize) -> MoveOutcome {
        match self.begin_move(issue_id, target, index) {
            MoveStart::Unchanged => MoveOutcome::Unchanged,
            MoveStart::Missing => MoveOutcome::Missing,
            MoveStart::Started(ticket) => self.settle(ticket).await,
        }
    }

    /// Like [`move_issue`](Self::move_issue), but settles on a background
    /// task. Returns `None` when the move was a no-op.
    pub fn spawn_move(
        &self,
        issue_id: &str,
        target: IssueStatus,
        index: usize,
    ) -> Option<JoinHandle<MoveOutcome>> {
        match self.begin_move(issue_id, target, index) {
            MoveStart::Started(ticket) => {
                let this = self.clone();
                Some(tokio::spawn(async move { this.settle(ticket).await }))
            }
            MoveStart::Unchanged | MoveStart::Missing => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::testing::{MockGateway, Reply, counts, issue};
    use boardsync_common::Priority;

    struct Fixture {
        board: SharedBoard,
        gateway: Arc<MockGateway>,
        coordinator: MoveCoordinator,
        notifier: Notifier,
    }

    fn fixture(issues: Vec<Issue>) -> Fixture {
        fixture_with_timeout(issues, Duration::from_secs(30))
    }

    fn fixture_with_timeout(issues: Vec<Issue>, timeout: Duration) -> Fixture {
        let board = SharedBoard::default();
        board.with(|cache| cache.load(issues.clone()));
        let gateway = Arc::new(MockGateway::with_issues(issues));
        let notifier = Notifier::default();
        let coordinator = MoveCoordinator::new(board.clone(), gateway.clone(), notifier.clone(), timeout);
        Fixture {
            board,
            gateway,
            coordinator,
            notifier,
        }
    }

    async fn wait_for_calls(gateway: &MockGateway, n: usize) {
        while gateway.status_calls() < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_move_to_same_column_sends_nothing() {
        let f = fixture(vec![issue("I-1", IssueStatus::Todo, Some(1.0))]);
        let before = f.board.snapshot();

        let outcome = f.coordinator.move_issue("I-1", IssueStatus::Todo, 5).await;

        assert_eq!(outcome, MoveOutcome::Unchanged);
        assert_eq!(f.gateway.status_calls(), 0);
        assert_eq!(f.board.snapshot(), before);
        assert_eq!(f.coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_move_of_uncached_issue_is_silent() {
        let f = fixture(vec![]);
        let mut rx = f.notifier.subscribe();

        let outcome = f.coordinator.move_issue("ghost", IssueStatus::Done, 0).await;

        assert_eq!(outcome, MoveOutcome::Missing);
        assert_eq!(f.gateway.status_calls(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_optimistic_state_is_visible_before_resolution() {
        let f = fixture(vec![issue("I-1", IssueStatus::Todo, Some(1.0))]);
        let _release = f.gateway.hold();

        let MoveStart::Started(ticket) = f.coordinator.begin_move("I-1", IssueStatus::Done, 0) else {
            panic!("Expected Started");
        };

        f.board.read(|cache| {
            assert!(cache.column(IssueStatus::Todo).is_empty());
            let done = cache.column(IssueStatus::Done);
            assert_eq!(done.len(), 1);
            assert_eq!(done[0].id, "I-1");
            assert_eq!(done[0].status, IssueStatus::Done);
        });
        assert_eq!(f.gateway.status_calls(), 0);
        assert_eq!(f.coordinator.pending_target("I-1"), Some(IssueStatus::Done));
        assert_eq!(ticket.target(), IssueStatus::Done);
    }

    #[tokio::test]
    async fn test_confirmed_move_keeps_optimistic_state() {
        let f = fixture(vec![issue("I-1", IssueStatus::Todo, Some(1.0))]);

        let outcome = f.coordinator.move_issue("I-1", IssueStatus::InProgress, 0).await;

        assert_eq!(outcome, MoveOutcome::Confirmed);
        assert_eq!(f.gateway.status_calls(), 1);
        assert_eq!(f.board.read(|c| c.status_of("I-1")), Some(IssueStatus::InProgress));
        assert_eq!(f.coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_rejection_restores_exact_snapshot() {
        let mut original = issue("I-1", IssueStatus::Todo, Some(1.0));
        original.priority = Priority::High;
        let f = fixture(vec![original.clone(), issue("I-2", IssueStatus::Todo, Some(2.0))]);
        let mut rx = f.notifier.subscribe();
        f.gateway
            .script(Reply::Fail(GatewayError::rejected(403, "FORBIDDEN", "Permission denied")));

        let outcome = f.coordinator.move_issue("I-1", IssueStatus::InProgress, 0).await;

        assert_eq!(outcome, MoveOutcome::RolledBack);
        f.board.read(|cache| {
            assert_eq!(cache.get("I-1"), Some(&original));
            let todo: Vec<_> = cache.column(IssueStatus::Todo).iter().map(|i| i.id.as_str()).collect();
            assert_eq!(todo, vec!["I-1", "I-2"]);
            assert!(cache.column(IssueStatus::InProgress).is_empty());
        });
        let note = rx.try_recv().unwrap();
        assert_eq!(note, Notification::error(STATUS_UPDATE_FAILED));
        assert!(!note.message.contains("Permission denied"));
    }

    #[tokio::test]
    async fn test_network_failure_rolls_back_like_rejection() {
        let f = fixture(vec![issue("I-1", IssueStatus::Backlog, None)]);
        let mut rx = f.notifier.subscribe();
        f.gateway
            .script(Reply::Fail(GatewayError::Network("connection refused".into())));

        let outcome = f.coordinator.move_issue("I-1", IssueStatus::Done, 0).await;

        assert_eq!(outcome, MoveOutcome::RolledBack);
        assert_eq!(f.board.read(|c| c.status_of("I-1")), Some(IssueStatus::Backlog));
        assert_eq!(rx.try_recv().unwrap().message, STATUS_UPDATE_FAILED);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let f = fixture_with_timeout(
            vec![issue("I-1", IssueStatus::Todo, None)],
            Duration::from_millis(50),
        );
        let _never = f.gateway.hold();

        let outcome = f.coordinator.move_issue("I-1", IssueStatus::Done, 0).await;

        assert_eq!(outcome, MoveOutcome::RolledBack);
        assert_eq!(f.board.read(|c| c.status_of("I-1")), Some(IssueStatus::Todo));
    }

    #[tokio::test]
    async fn test_last_move_wins_when_older_call_fails_late() {
        let f = fixture(vec![issue("A", IssueStatus::Todo, Some(1.0))]);
        let release_first = f.gateway.hold();
        f.gateway
            .script(Reply::Fail(GatewayError::Network("reset".into())));

        let first = f.coordinator.spawn_move("A", IssueStatus::InProgress, 0).unwrap();
        wait_for_calls(&f.gateway, 1).await;

        let second = f.coordinator.move_issue("A", IssueStatus::Done, 0).await;
        assert_eq!(second, MoveOutcome::RolledBack);
        assert_eq!(f.board.read(|c| c.status_of("A")), Some(IssueStatus::InProgress));

        release_first
            .send(Err(GatewayError::Network("timeout".into())))
            .unwrap();
        assert_eq!(first.await.unwrap(), MoveOutcome::Superseded);
        assert_eq!(f.board.read(|c| c.status_of("A")), Some(IssueStatus::InProgress));
        assert_eq!(f.coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_last_move_wins_when_older_call_succeeds_late() {
        let f = fixture(vec![issue("A", IssueStatus::Todo, Some(1.0))]);
        let release_first = f.gateway.hold();
        f.gateway
            .script(Reply::Fail(GatewayError::rejected(409, "CONFLICT", "stale")));

        let first = f.coordinator.spawn_move("A", IssueStatus::InProgress, 0).unwrap();
        wait_for_calls(&f.gateway, 1).await;
        f.coordinator.move_issue("A", IssueStatus::Done, 0).await;

        release_first.send(Ok(())).unwrap();
        assert_eq!(first.await.unwrap(), MoveOutcome::Superseded);
        assert_eq!(f.board.read(|c| c.status_of("A")), Some(IssueStatus::InProgress));
    }

    #[tokio::test]
    async fn test_stale_failure_does_not_clobber_newer_pending_move() {
        let f = fixture(vec![issue("A", IssueStatus::Todo, Some(1.0))]);
        let release_first = f.gateway.hold();
        let release_second = f.gateway.hold();
        let mut rx = f.notifier.subscribe();

        let first = f.coordinator.spawn_move("A", IssueStatus::InProgress, 0).unwrap();
        wait_for_calls(&f.gateway, 1).await;
        let second = f.coordinator.spawn_move("A", IssueStatus::Done, 0).unwrap();
        wait_for_calls(&f.gateway, 2).await;

        release_first
            .send(Err(GatewayError::Network("reset".into())))
            .unwrap();
        assert_eq!(first.await.unwrap(), MoveOutcome::Superseded);
        assert_eq!(f.board.read(|c| c.status_of("A")), Some(IssueStatus::Done));
        assert_eq!(f.coordinator.pending_target("A"), Some(IssueStatus::Done));
        assert!(rx.try_recv().is_err());

        release_second.send(Ok(())).unwrap();
        assert_eq!(second.await.unwrap(), MoveOutcome::Confirmed);
        assert_eq!(f.board.read(|c| c.status_of("A")), Some(IssueStatus::Done));
    }

    #[tokio::test]
    async fn test_moves_on_different_issues_resolve_independently() {
        let f = fixture(vec![
            issue("A", IssueStatus::Todo, Some(1.0)),
            issue("B", IssueStatus::Todo, Some(2.0)),
        ]);
        let release_a = f.gateway.hold();

        let a = f.coordinator.spawn_move("A", IssueStatus::Done, 0).unwrap();
        wait_for_calls(&f.gateway, 1).await;
        f.gateway
            .script(Reply::Fail(GatewayError::Network("down".into())));
        let b = f.coordinator.move_issue("B", IssueStatus::InReview, 0).await;
        assert_eq!(b, MoveOutcome::RolledBack);

        release_a.send(Ok(())).unwrap();
        assert_eq!(a.await.unwrap(), MoveOutcome::Confirmed);

        let tally = f.board.read(counts);
        assert_eq!(tally[&IssueStatus::Done], 1);
        assert_eq!(tally[&IssueStatus::Todo], 1);
        assert_eq!(tally[&IssueStatus::InReview], 0);
    }

    #[tokio::test]
    async fn test_rollback_after_delete_does_not_resurrect() {
        let f = fixture(vec![issue("A", IssueStatus::Todo, None)]);
        let release = f.gateway.hold();

        let handle = f.coordinator.spawn_move("A", IssueStatus::Done, 0).unwrap();
        wait_for_calls(&f.gateway, 1).await;
        f.board.with(|cache| cache.remove("A"));

        release
            .send(Err(GatewayError::Network("reset".into())))
            .unwrap();
        assert_eq!(handle.await.unwrap(), MoveOutcome::RolledBack);
        assert!(f.board.read(|c| c.is_empty()));
    }
}
