//! Port contracts for board synchronization.
//!
//! Ports define the remote collaborator the registries talk to, independent
//! of how requests are framed on the wire.

pub mod gateway;

pub use gateway::{BoardGateway, EntityKind, GatewayError, GatewayResult, MoveTaskRequest};
