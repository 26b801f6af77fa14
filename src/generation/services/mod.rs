//! Turning accepted proposals into board tasks.

mod error;
mod materializer;

pub use error::{GenerationError, GenerationResult};
pub use materializer::GenerationMaterializer;
