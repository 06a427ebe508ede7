//! # Core Application Logic
//!
//! Navigation and background-operation logic. It knows nothing about any
//! specific UI technology; the display only snapshots the [`navigator`]
//! view and listens on the [`bus`].
//!
//! ```text
//!                 ┌──────────────────────────┐
//!   key press ──► │        Navigator         │ ──► Expander × N (concurrent)
//!                 │  history · view · status │
//!                 └────────────┬─────────────┘
//!                              │ publish
//!                              ▼
//!                 ┌──────────────────────────┐
//!                 │         EventBus         │ ◄── Tracker (202 polling)
//!                 └────────────┬─────────────┘
//!                              ▼
//!                      status bar, logs
//! ```
//!
//! ## Modules
//!
//! - [`bus`]: topic pub/sub with bounded, lossy subscriber inboxes
//! - [`status`]: `StatusEvent` and its send/update/done lifecycle
//! - [`node`]: `TreeNode` and `Content`
//! - [`history`]: the `Page` stack behind "go back"
//! - [`expander`]: the `Expander` trait every collaborator implements
//! - [`navigator`]: fan-out, deadline, commit, back and refresh
//! - [`tracker`]: follows accepted (202) operations to completion
//! - [`config`]: settings and their override order

pub mod bus;
pub mod config;
pub mod expander;
pub mod history;
pub mod navigator;
pub mod node;
pub mod status;
pub mod tracker;
