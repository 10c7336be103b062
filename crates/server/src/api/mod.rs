// HTTP API routes
//
// Each submodule handles one endpoint group with its own AppState.

pub mod common;
pub mod generate;
pub mod health;

// Re-export common types
pub use common::ErrorResponse;
