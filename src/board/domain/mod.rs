//! Domain model for the task board.
//!
//! Tasks, status columns, ranks and the working-set collections live here,
//! free of any I/O. Services in [`crate::board::services`] own the mutable
//! copies; this module only defines what a valid board looks like.

mod collections;
mod error;
mod ids;
mod position;
mod status;
mod task;

pub use collections::{StatusSet, TaskSet, compare_status_rank, compare_task_rank};
pub use error::{BoardValidationError, ParsePriorityError};
pub use ids::{MemberId, ProjectId, StatusId, TaskId};
pub(crate) use ids::uuid_id;
pub use position::{Placement, Position, PositionSpacing, append, place};
pub use status::{NewStatus, Status, StatusColor, StatusData, StatusPatch};
pub use task::{NewTask, Priority, Task, TaskData, TaskPatch};
pub(crate) use task::Retain;
