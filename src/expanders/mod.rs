//! # Stock Expanders
//!
//! The collaborators the navigator fans out to. Both apply to
//! subscriptions and resource groups, so a typical expansion runs them
//! side by side: one lists the children, the other fetches the node's
//! own JSON for the content pane.
//!
//! ```text
//! Root ──► Subscription ──► ResourceGroup ──► Resource
//!  │            │                 │               │
//!  └ ChildList  ├ ChildList       ├ ChildList     └ Resource
//!               └ Resource        └ Resource
//! ```

mod child_list;
mod resource;

use std::sync::Arc;

pub use child_list::ChildListExpander;
pub use resource::ResourceExpander;

use crate::api::ArmClient;
use crate::core::expander::Expander;
use crate::core::node::{NodeKind, TreeNode};

pub const ROOT_ID: &str = "root";

/// The node the navigator loads on startup.
pub fn root_node() -> TreeNode {
    TreeNode::new(ROOT_ID, "Subscriptions").with_kind(NodeKind::Root)
}

pub fn default_expanders(client: &ArmClient) -> Vec<Arc<dyn Expander>> {
    vec![
        Arc::new(ChildListExpander::new(client.clone())),
        Arc::new(ResourceExpander::new(client.clone())),
    ]
}
