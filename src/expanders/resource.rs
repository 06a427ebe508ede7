use async_trait::async_trait;
use log::debug;

use crate::api::ArmClient;
use crate::core::expander::{Expander, ExpanderError, Expansion};
use crate::core::node::{Content, NodeKind, TreeNode};

/// Fetches a node's own JSON for the content pane.
pub struct ResourceExpander {
    client: ArmClient,
}

impl ResourceExpander {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Expander for ResourceExpander {
    fn name(&self) -> &str {
        "resource"
    }

    fn applies_to(&self, node: &TreeNode) -> bool {
        node.kind != NodeKind::Root && node.expand_url.is_some()
    }

    async fn expand(&self, node: &TreeNode) -> Result<Expansion, ExpanderError> {
        let url = node
            .expand_url
            .as_deref()
            .ok_or_else(|| ExpanderError::Unsupported(format!("{} has no URL", node.id)))?;
        let value: serde_json::Value = self.client.get_json(url).await?;
        let pretty = serde_json::to_string_pretty(&value)
            .map_err(|e| ExpanderError::Parse(e.to_string()))?;
        debug!("Fetched {} bytes of JSON for {}", pretty.len(), node.id);
        Ok(Expansion::content(Content::json(pretty)))
    }
}
