//! # TUI Components
//!
//! ## Component Architecture
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! Display components that receive all data as struct fields:
//! - `NodeList`: the filter-visible items with the selection
//! - `ContentPane`: primary content of the current view
//! - `StatusBar`: newest live status event
//!
//! Their scroll and selection offsets live in small state structs owned by
//! `TuiState` and lent to the component for one render pass.
//!
//! ### Stateful Components (Event-Driven)
//!
//! - `FilterInput`: one-line editor, emits `FilterEvent`s
//!
//! ```text
//! components/
//! ├── mod.rs           (this file)
//! ├── node_list.rs     (left pane)
//! ├── content_pane.rs  (right pane)
//! ├── status_bar.rs    (bottom line)
//! └── filter_input.rs  (filter editor)
//! ```

pub mod content_pane;
pub mod filter_input;
pub mod node_list;
pub mod status_bar;

pub use content_pane::{ContentPane, ContentPaneState};
pub use filter_input::{FilterEvent, FilterInput};
pub use node_list::NodeList;
pub use status_bar::{StatusBar, StatusBarState};
