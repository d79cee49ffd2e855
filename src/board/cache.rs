//! Status-partitioned, ordered in-memory issue cache the board renders from.
//!
//! Every issue id lives in exactly one bucket, and every bucket is kept
//! sorted by `(ordering key, id)`.

use std::cmp::Ordering;
use std::collections::HashMap;

use boardsync_common::{Issue, IssuePatch, IssueStatus};
use serde::Serialize;
use tracing::debug;

use super::filter::BoardFilters;

/// One rendered column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnView {
    pub status: IssueStatus,
    pub title: &'static str,
    pub issues: Vec<Issue>,
}

/// The filtered board, one column per status in display order.
#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub columns: Vec<ColumnView>,
}

impl BoardView {
    pub fn column(&self, status: IssueStatus) -> &ColumnView {
        &self.columns[status.index()]
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(|c| c.issues.len()).sum()
    }
}

fn compare(a: &Issue, b: &Issue) -> Ordering {
    a.sort_key()
        .total_cmp(&b.sort_key())
        .then_with(|| a.id.cmp(&b.id))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardCache {
    buckets: [Vec<Issue>; 6],
}

impl BoardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole cache with `issues`.
    pub fn load(&mut self, issues: Vec<Issue>) {
        // Later duplicates win, so each id lands in one bucket.
        let mut latest: HashMap<String, Issue> = HashMap::with_capacity(issues.len());
        for issue in issues {
            latest.insert(issue.id.clone(), issue);
        }

        let mut buckets: [Vec<Issue>; 6] = Default::default();
        for issue in latest.into_values() {
            buckets[issue.status.index()].push(issue);
        }
        for bucket in &mut buckets {
            bucket.sort_by(compare);
        }
        self.buckets = buckets;
        debug!(count = self.len(), "board cache loaded");
    }

    /// Add `issue` to its bucket. Without an ordering key it goes last.
    pub fn insert(&mut self, mut issue: Issue) {
        self.take(&issue.id);
        let bucket = &mut self.buckets[issue.status.index()];
        if issue.order.is_none() {
            let next = bucket.last().map(|last| last.sort_key() + 1.0).unwrap_or(0.0);
            issue.order = Some(next);
            bucket.push(issue);
        } else {
            place_sorted(bucket, issue);
        }
    }

    /// Merge `patch` into the record for `id`. A status change moves the
    /// record to the end of its new bucket. Returns `false` if `id` is not
    /// cached.
    pub fn patch(&mut self, id: &str, patch: &IssuePatch) -> bool {
        let Some((status, index)) = self.locate(id) else {
            debug!(issue_id = id, "patch for uncached issue ignored");
            return false;
        };

        let moves = patch.status.is_some_and(|s| s != status);
        if !moves {
            let bucket = &mut self.buckets[status.index()];
            patch.apply(&mut bucket[index]);
            if patch.order.is_some() {
                let issue = bucket.remove(index);
                place_sorted(bucket, issue);
            }
            return true;
        }

        let mut issue = self.buckets[status.index()].remove(index);
        patch.apply(&mut issue);
        let bucket = &mut self.buckets[issue.status.index()];
        if patch.order.is_some() {
            place_sorted(bucket, issue);
        } else {
            let last = bucket.last().map(|l| l.sort_key());
            match last {
                Some(last) if issue.sort_key() <= last => issue.order = Some(last + 1.0),
                _ => {}
            }
            bucket.push(issue);
        }
        true
    }

    /// Delete `id` from whichever bucket holds it.
    pub fn remove(&mut self, id: &str) -> Option<Issue> {
        self.take(id)
    }

    /// Move `id` into `target` at `index` (clamped to the bucket length),
    /// updating its status and ordering key. Returns `false` if `id` is not
    /// cached.
    pub fn reorder(&mut self, id: &str, target: IssueStatus, index: usize) -> bool {
        let Some(mut issue) = self.take(id) else {
            debug!(issue_id = id, "reorder for uncached issue ignored");
            return false;
        };
        issue.status = target;

        let bucket = &mut self.buckets[target.index()];
        let index = index.min(bucket.len());
        let prev = index.checked_sub(1).map(|i| bucket[i].sort_key());
        let next = bucket.get(index).map(|i| i.sort_key());

        let order = match (prev, next) {
            (None, None) => issue.sort_key(),
            (Some(p), None) => p + 1.0,
            (None, Some(n)) => n - 1.0,
            (Some(p), Some(n)) => p + (n - p) / 2.0,
        };
        issue.order = Some(order);
        bucket.insert(index, issue);

        if !is_sorted(bucket) {
            renumber(bucket);
        }
        true
    }

    /// Put `snapshot` back exactly as it was, if its id is still cached.
    pub fn restore(&mut self, snapshot: Issue) -> bool {
        if self.take(&snapshot.id).is_none() {
            return false;
        }
        let bucket = &mut self.buckets[snapshot.status.index()];
        place_sorted(bucket, snapshot);
        true
    }

    pub fn get(&self, id: &str) -> Option<&Issue> {
        self.locate(id)
            .map(|(status, index)| &self.buckets[status.index()][index])
    }

    pub fn status_of(&self, id: &str) -> Option<IssueStatus> {
        self.locate(id).map(|(status, _)| status)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.locate(id).is_some()
    }

    pub fn column(&self, status: IssueStatus) -> &[Issue] {
        &self.buckets[status.index()]
    }

    /// All buckets in display order, empty ones included.
    pub fn columns(&self) -> impl Iterator<Item = (IssueStatus, &[Issue])> {
        IssueStatus::ALL
            .into_iter()
            .map(move |status| (status, self.column(status)))
    }

    /// Every cached issue, column by column.
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.buckets.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }

    /// Derive the visible board for `filters` without touching the cache.
    pub fn view(&self, filters: &BoardFilters) -> BoardView {
        let columns = self
            .columns()
            .map(|(status, issues)| ColumnView {
                status,
                title: status.title(),
                issues: issues
                    .iter()
                    .filter(|issue| filters.matches(issue))
                    .cloned()
                    .collect(),
            })
            .collect();
        BoardView { columns }
    }

    fn locate(&self, id: &str) -> Option<(IssueStatus, usize)> {
        IssueStatus::ALL.into_iter().find_map(|status| {
            self.buckets[status.index()]
                .iter()
                .position(|i| i.id == id)
                .map(|index| (status, index))
        })
    }

    fn take(&mut self, id: &str) -> Option<Issue> {
        let (status, index) = self.locate(id)?;
        Some(self.buckets[status.index()].remove(index))
    }
}

fn place_sorted(bucket: &mut Vec<Issue>, issue: Issue) {
    let index = bucket.partition_point(|i| compare(i, &issue) == Ordering::Less);
    bucket.insert(index, issue);
}

fn is_sorted(bucket: &[Issue]) -> bool {
    bucket
        .windows(2)
        .all(|w| compare(&w[0], &w[1]) == Ordering::Less)
}

fn renumber(bucket: &mut [Issue]) {
    for (i, issue) in bucket.iter_mut().enumerate() {
        issue.order = Some((i + 1) as f64);
    }
}
