//! Adapter implementations for generation ports.

pub mod memory;
