//! In-memory board server integration tests.
//!
//! Tests are organized into modules by functionality:
//! - `board_session_tests`: Loading, snapshots and signals
//! - `concurrent_move_tests`: Overlapping moves on one board
//! - `generation_tests`: Prompt to task materialization

mod in_memory {
    pub mod helpers;

    mod board_session_tests;
    mod concurrent_move_tests;
    mod generation_tests;
}
