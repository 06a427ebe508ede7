//! # Management API
//!
//! HTTP plumbing shared by the expanders and the operation tracker.

pub mod client;
pub mod types;

pub use client::{ArmClient, DEFAULT_API_VERSION, DEFAULT_BASE_URL};
pub use types::{ApiError, ApiResponse, ArmList, ArmResource};
