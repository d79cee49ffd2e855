//! Optimistic board synchronization.
//!
//! ## Overview
//!
//! The board keeps a local, status-partitioned copy of a project's issues and
//! renders from it. Moves are applied to the copy immediately and confirmed
//! with the backend afterwards; a failed confirmation puts the issue back
//! exactly where it was and raises a notification.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐  drag_end / move  ┌──────────────────────────────────────────┐
//! │   View   │ ────────────────> │  sync.rs  (BoardSync)                    │
//! │          │ <──── view() ──── │    ├─ drag.rs         (resolve_drop)     │
//! └──────────┘                   │    ├─ coordinator.rs  (MoveCoordinator)  │
//!      ^                         │    │        │ IssueGateway (async)       │
//!      │ Notification            │    │        v                            │
//!      └──── notify.rs <──────── │    ├─ shared.rs  (SharedBoard)           │
//!                                │    │        └─ cache.rs  (BoardCache)    │
//!   socket ── BoardEvent ──────> │    └─ events.rs  (apply)                 │
//!                                └──────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module    | Responsibility                                          |
//! |-----------|---------------------------------------------------------|
//! | `filter`  | `BoardFilters`, applied per view and never cached       |
//! | `notify`  | `Notifier` broadcast of user-visible messages           |
//! | `shared`  | `SharedBoard`, a thin `Arc<Mutex<BoardCache>>`         |

pub mod cache;
pub mod coordinator;
pub mod drag;
pub mod events;
pub mod filter;
pub mod notify;
pub mod shared;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{BoardCache, BoardView, ColumnView};
pub use coordinator::{MoveCoordinator, MoveOutcome, MoveStart, MoveTicket, PendingMutation};
pub use drag::{DragEnd, DragState, DropTarget};
pub use filter::BoardFilters;
pub use notify::{Notification, NotificationLevel, Notifier};
pub use shared::SharedBoard;
pub use sync::BoardSync;
