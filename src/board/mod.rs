//! Board synchronization for one project at a time.
//!
//! Keeps a local working set of tasks and status columns consistent with the
//! remote server while showing moves, edits and deletes before the server
//! confirms them. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Registries, the drag controller and the session in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
