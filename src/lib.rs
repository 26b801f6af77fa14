//! Trellis: task board synchronization engine.
//!
//! This crate keeps a client-side board of tasks and status columns in step
//! with a remote project server. Moves, edits and deletes show up locally
//! before the server answers; failed moves roll back exactly, stale
//! responses are discarded, and AI-proposed task batches are materialized in
//! a single request.
//!
//! # Architecture
//!
//! Trellis follows hexagonal architecture principles:
//!
//! - **Domain**: Pure board and batch types with no I/O
//! - **Ports**: Abstract gateway traits for the remote server
//! - **Adapters**: An in-memory server implementing the ports
//! - **Services**: Registries, the drag controller and the materializer
//!
//! # Modules
//!
//! - [`board`]: Tasks, status columns, ranking and optimistic moves
//! - [`generation`]: Generation batches and their acceptance

pub mod board;
pub mod generation;
