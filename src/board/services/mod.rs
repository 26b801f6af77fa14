//! Board synchronization services.
//!
//! Registries own the working set through a shared [`BoardStore`]; the drag
//! controller and the session facade build on them.

mod config;
mod drag;
mod error;
mod optimistic;
mod session;
mod statuses;
mod store;
mod tasks;
mod view;

pub use config::BoardConfig;
pub(crate) use optimistic::within;
pub use drag::{DragGesture, DragPhase, DragReorderController, DropTarget};
pub use error::{BoardSyncError, BoardSyncResult, FailureKind};
pub use session::BoardSession;
pub use statuses::StatusRegistry;
pub use store::{BoardSignal, BoardStore};
pub use tasks::{MoveOutcome, TaskRegistry};
pub use view::{BoardColumn, BoardFilter, BoardSnapshot, BoardView};
