use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::node::{Content, TreeNode};
use crate::api::ApiError;

/// Errors an expander reports back to the navigator.
/// All of them are recoverable: the navigator turns them into status messages.
#[derive(Debug)]
pub enum ExpanderError {
    /// The API call behind the expansion failed.
    Api(ApiError),
    /// The API answered but the payload could not be turned into nodes.
    Parse(String),
    /// The expander does not support the requested action on this node.
    Unsupported(String),
}

impl fmt::Display for ExpanderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpanderError::Api(e) => write!(f, "{e}"),
            ExpanderError::Parse(msg) => write!(f, "parse error: {msg}"),
            ExpanderError::Unsupported(msg) => write!(f, "unsupported: {msg}"),
        }
    }
}

impl std::error::Error for ExpanderError {}

impl From<ApiError> for ExpanderError {
    fn from(e: ApiError) -> Self {
        ExpanderError::Api(e)
    }
}

/// What one expander produced for a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    pub nodes: Vec<TreeNode>,
    /// At most one expander may supply this for a given node.
    pub content: Option<Content>,
}

impl Expansion {
    pub fn nodes(nodes: Vec<TreeNode>) -> Self {
        Self {
            nodes,
            content: None,
        }
    }

    pub fn content(content: Content) -> Self {
        Self {
            nodes: Vec::new(),
            content: Some(content),
        }
    }
}

/// One expander task's report on the navigator's result channel.
pub struct ExpanderResult {
    pub expander: Arc<dyn Expander>,
    pub outcome: Result<Expansion, ExpanderError>,
}

impl ExpanderResult {
    pub fn source(&self) -> &str {
        self.expander.name()
    }
}

/// A collaborator that turns one node into children and/or primary content.
#[async_trait]
pub trait Expander: Send + Sync {
    /// Short name used in status messages and logs.
    fn name(&self) -> &str;

    /// Cheap predicate. Must not do I/O.
    fn applies_to(&self, node: &TreeNode) -> bool;

    /// The real, possibly slow, fetch. Runs concurrently with other
    /// expanders and may be abandoned if the navigator's deadline passes.
    async fn expand(&self, node: &TreeNode) -> Result<Expansion, ExpanderError>;

    /// Deletes the resource behind a node this expander produced.
    async fn delete(&self, node: &TreeNode) -> Result<(), ExpanderError> {
        Err(ExpanderError::Unsupported(format!(
            "{} cannot delete {}",
            self.name(),
            node.display
        )))
    }
}
