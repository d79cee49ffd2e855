//! Applies real-time [`BoardEvent`]s to the board cache.

use boardsync_common::{BoardEvent, Issue, IssuePatch, IssueStatus};
use tracing::debug;

use super::cache::BoardCache;

/// Apply `event` to `cache`. Returns whether the cache changed.
///
/// `pending_target` reports the target status of an unconfirmed local move.
/// Records for such an issue keep that status so a late echo cannot undo the
/// optimistic state.
pub fn apply<F>(cache: &mut BoardCache, event: &BoardEvent, pending_target: F) -> bool
where
    F: Fn(&str) -> Option<IssueStatus>,
{
    match event {
        BoardEvent::IssueCreated { issue } => {
            let mut issue = issue.clone();
            if let Some(target) = pending_target(&issue.id) {
                issue.status = target;
            }
            debug!(issue_id = %issue.id, status = %issue.status, "remote create");
            cache.insert(issue);
            true
        }
        BoardEvent::IssueUpdated { issue } => {
            let patch = match pending_target(&issue.id) {
                Some(_) => IssuePatch::descriptive(issue),
                None => IssuePatch::from_issue(issue),
            };
            debug!(issue_id = %issue.id, "remote update");
            cache.patch(&issue.id, &patch)
        }
        BoardEvent::IssueMoved {
            issue,
            from_status,
            to_status,
            position,
        } => {
            debug!(issue_id = %issue.id, from = %from_status, to = %to_status, ?position, "remote move");
            if pending_target(&issue.id).is_some() {
                return cache.patch(&issue.id, &IssuePatch::descriptive(issue));
            }
            match position {
                Some(index) if cache.reorder(&issue.id, *to_status, *index) => {
                    cache.patch(&issue.id, &IssuePatch::descriptive(issue))
                }
                Some(_) => insert_moved(cache, issue, *to_status),
                None => {
                    let patch = IssuePatch {
                        status: Some(*to_status),
                        ..IssuePatch::from_issue(issue)
                    };
                    cache.patch(&issue.id, &patch) || insert_moved(cache, issue, *to_status)
                }
            }
        }
        BoardEvent::IssueDeleted { issue_id, .. } => {
            debug!(issue_id = %issue_id, "remote delete");
            cache.remove(issue_id).is_some()
        }
    }
}

// A move for an issue this board has not seen yet.
fn insert_moved(cache: &mut BoardCache, issue: &Issue, to_status: IssueStatus) -> bool {
    let mut issue = issue.clone();
    issue.status = to_status;
    cache.insert(issue);
    true
}
