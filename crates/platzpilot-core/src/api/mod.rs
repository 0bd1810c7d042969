//! REST API client module for the PlatzPilot server.
//!
//! This module provides the `ApiClient` for fetching the current library
//! dataset and server health, and the `LibraryGateway` trait that the data
//! synchronizer consumes so tests can substitute a fake transport.
//!
//! The client owns timeout and retry behavior; it performs no caching.

pub mod client;
pub mod error;

pub use client::{ApiClient, ApiResponse, HealthStatus, LibraryGateway, ResponseMetadata};
pub use error::ApiError;
