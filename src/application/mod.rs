// src/application/mod.rs
//
// Application Layer
//
// ARCHITECTURE:
// - Boundary between callers (CLI, future viewer) and services
// - Translates between DTOs and domain records
// - Owns the bootstrap wiring (AppState)

pub mod commands;
pub mod dto;
pub mod error_handling;
pub mod state;

pub use commands::*;
pub use dto::*;
pub use error_handling::{CommandResult, ErrorResponse, ErrorType};
pub use state::{AppState, Capabilities};
