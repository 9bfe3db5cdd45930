//! Memora API Library Crate
//!
//! This library contains all the logic for the Memora web service: the
//! application state, the in-memory collaborator implementations, the API
//! handlers, the due-reminder scheduler, and routing. The `api` binary is a
//! thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod router;
pub mod scheduler;
pub mod state;
