//! Port contracts for the generation context.

pub mod gateway;

pub use gateway::GenerationGateway;
