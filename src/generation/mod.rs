//! AI-proposed task batches.
//!
//! A prompt yields a pending batch of proposals. Accepting a selection turns
//! it into real tasks on the server in one request, after which the board is
//! reloaded.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
