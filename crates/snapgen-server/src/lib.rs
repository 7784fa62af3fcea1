//! Snapgen Server - webhook surface for the snapshot pipeline
//!
//! Accepts GitHub push webhooks on `POST /payload`, acknowledges them right
//! away and runs the snapshot pipeline in the background. Rendered
//! snapshots and their indexes are served back as static files.

#![warn(unreachable_pub)]

pub mod cli;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use routes::{acknowledgement, routes};
pub use server::{replay, serve};
pub use state::{process_event, AppState, EventReport, EventStatus};
pub use telemetry::LogFormat;
