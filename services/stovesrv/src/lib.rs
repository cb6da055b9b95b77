//! Duepi EVO stove service
//!
//! Polls a pellet stove through the `duepi-evo` client, publishes the latest
//! snapshot, and exposes status and control over HTTP and the command line.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod entities;
pub mod error;
pub mod poller;
pub mod service;

pub use api::{create_router, AppState};
pub use config::StoveSrvConfig;
pub use error::{Result, StoveSrvError};
pub use poller::{PollPhase, PollState, StoveCoordinator};
