//! In-memory server standing in for the remote board API.

mod server;

pub(crate) use server::ServerState;
pub use server::{GatewayOperation, InMemoryBoardServer, MoveAck};
