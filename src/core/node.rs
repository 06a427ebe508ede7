//! Tree nodes and the content shown for an expanded node.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::core::expander::Expander;

/// Where a node sits in the management hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Root,
    Subscription,
    ResourceGroup,
    Resource,
}

/// One navigable resource.
///
/// `id` must be unique within any displayed set of nodes; the navigator
/// rejects a set that breaks this. `expander` points back at the
/// collaborator that produced the node so actions like delete can be
/// routed to it.
#[derive(Clone, Default)]
pub struct TreeNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub display: String,
    pub kind: NodeKind,
    pub expand_url: Option<String>,
    pub delete_url: Option<String>,
    pub status_indicator: String,
    pub metadata: BTreeMap<String, String>,
    pub expander: Option<Arc<dyn Expander>>,
}

impl TreeNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            display: name.clone(),
            name,
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_expand_url(mut self, url: impl Into<String>) -> Self {
        self.expand_url = Some(url.into());
        self
    }

    pub fn with_delete_url(mut self, url: impl Into<String>) -> Self {
        self.delete_url = Some(url.into());
        self
    }

    pub fn with_status(mut self, indicator: impl Into<String>) -> Self {
        self.status_indicator = indicator.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn expander_name(&self) -> Option<&str> {
        self.expander.as_deref().map(|e| e.name())
    }

    /// Case-insensitive substring match on the display text. An empty filter matches everything.
    pub fn matches_filter(&self, filter: &str) -> bool {
        filter.is_empty() || self.display.to_lowercase().contains(&filter.to_lowercase())
    }
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("id", &self.id)
            .field("parent_id", &self.parent_id)
            .field("name", &self.name)
            .field("display", &self.display)
            .field("kind", &self.kind)
            .field("expand_url", &self.expand_url)
            .field("delete_url", &self.delete_url)
            .field("status_indicator", &self.status_indicator)
            .field("metadata", &self.metadata)
            .field("expander", &self.expander_name())
            .finish()
    }
}

// Expanders are compared by name; trait objects carry no equality of their own.
impl PartialEq for TreeNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.parent_id == other.parent_id
            && self.name == other.name
            && self.display == other.display
            && self.kind == other.kind
            && self.expand_url == other.expand_url
            && self.delete_url == other.delete_url
            && self.status_indicator == other.status_indicator
            && self.metadata == other.metadata
            && self.expander_name() == other.expander_name()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Yaml,
    Xml,
    #[default]
    Text,
    Terraform,
}

impl ContentType {
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::Json => "JSON",
            ContentType::Yaml => "YAML",
            ContentType::Xml => "XML",
            ContentType::Text => "Text",
            ContentType::Terraform => "Terraform",
        }
    }
}

/// The primary detail payload shown for an expanded node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content {
    pub text: String,
    pub content_type: ContentType,
}

impl Content {
    pub fn new(text: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            text: text.into(),
            content_type,
        }
    }

    pub fn json(text: impl Into<String>) -> Self {
        Self::new(text, ContentType::Json)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text, ContentType::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_copies_name_into_display() {
        let node = TreeNode::new("/subscriptions/1", "prod");
        assert_eq!(node.display, "prod");
        assert_eq!(node.kind, NodeKind::Root);
        assert!(node.expander.is_none());
    }

    #[test]
    fn test_matches_filter_is_case_insensitive() {
        let node = TreeNode::new("id", "Storage-Account");
        assert!(node.matches_filter(""));
        assert!(node.matches_filter("storage"));
        assert!(node.matches_filter("ACCOUNT"));
        assert!(!node.matches_filter("vault"));
    }

    #[test]
    fn test_equality_covers_metadata() {
        let a = TreeNode::new("id", "n").with_metadata("location", "westeurope");
        let b = TreeNode::new("id", "n").with_metadata("location", "eastus");
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }
}
