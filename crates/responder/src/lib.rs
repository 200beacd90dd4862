//! HTTP API server for the incident response engine.
//!
//! Exposes the engine's external interface:
//! - `GET /events` - filtered, bounded event listing
//! - `POST /events` - ingest an event through diagnosis and tiering
//! - `POST /actions/{id}/approve` - approve a pending remediation
//! - `POST /actions/{id}/reject` - reject a pending remediation
//! - `GET /actions/pending` - actions awaiting approval
//! - `GET /stats` - aggregate statistics
//! - `GET /health` - liveness probe

pub mod api;

pub use api::{api_router, ApiError};
