//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate state transitions, storage and remote collaborators into
//!   use-case level APIs.
//! - Keep the CLI (or any other view layer) decoupled from storage details.

pub mod session_service;
pub mod snapshot;
pub mod submission_service;
pub mod vote_service;
