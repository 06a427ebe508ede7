use async_trait::async_trait;
use log::{debug, info, warn};

use crate::api::{ArmClient, ArmList, ArmResource};
use crate::core::expander::{Expander, ExpanderError, Expansion};
use crate::core::node::{NodeKind, TreeNode};

/// Upper bound on `nextLink` pages followed for one list.
const MAX_PAGES: usize = 50;

/// Lists the children of the root, a subscription or a resource group.
pub struct ChildListExpander {
    client: ArmClient,
}

impl ChildListExpander {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    async fn list_all(&self, first: &str) -> Result<Vec<ArmResource>, ExpanderError> {
        let mut items = Vec::new();
        let mut next = Some(first.to_string());
        let mut pages = 0;

        while let Some(url) = next.take() {
            if pages == MAX_PAGES {
                warn!("Stopped listing {} after {} pages", first, MAX_PAGES);
                break;
            }
            let page: ArmList = self.client.get_json(&url).await?;
            pages += 1;
            debug!("Page {} of {}: {} item(s)", pages, first, page.value.len());
            items.extend(page.value);
            next = page.next_link.filter(|l| !l.is_empty());
        }
        Ok(items)
    }
}

/// List path for a parent, and the kind of node the list holds.
fn list_target(node: &TreeNode) -> Option<(String, NodeKind)> {
    match node.kind {
        NodeKind::Root => Some(("/subscriptions".to_string(), NodeKind::Subscription)),
        NodeKind::Subscription => Some((
            format!("{}/resourceGroups", node.id.trim_end_matches('/')),
            NodeKind::ResourceGroup,
        )),
        NodeKind::ResourceGroup => Some((
            format!("{}/resources", node.id.trim_end_matches('/')),
            NodeKind::Resource,
        )),
        NodeKind::Resource => None,
    }
}

/// One-character marker shown in front of a node's name.
fn status_glyph(state: Option<&str>) -> &'static str {
    match state.map(str::to_ascii_lowercase).as_deref() {
        Some("deleting") => "✗",
        Some("failed") => "!",
        Some("creating" | "updating" | "accepted" | "provisioning") => "…",
        Some("disabled" | "warned" | "pastdue") => "-",
        _ => "",
    }
}

fn to_node(resource: ArmResource, kind: NodeKind) -> TreeNode {
    let glyph = status_glyph(resource.provisioning_state());
    let mut node = TreeNode::new(resource.id.clone(), resource.label())
        .with_kind(kind)
        .with_expand_url(resource.id.clone())
        .with_status(glyph);
    // Subscriptions are never deleted from here.
    if kind != NodeKind::Subscription {
        node = node.with_delete_url(resource.id.clone());
    }
    if let Some(resource_type) = resource.resource_type {
        node = node.with_metadata("type", resource_type);
    }
    if let Some(location) = resource.location {
        node = node.with_metadata("location", location);
    }
    node
}

#[async_trait]
impl Expander for ChildListExpander {
    fn name(&self) -> &str {
        "children"
    }

    fn applies_to(&self, node: &TreeNode) -> bool {
        list_target(node).is_some()
    }

    async fn expand(&self, node: &TreeNode) -> Result<Expansion, ExpanderError> {
        let (path, kind) = list_target(node)
            .ok_or_else(|| ExpanderError::Unsupported(format!("{} has no children", node.id)))?;
        let mut resources = self.list_all(&path).await?;
        resources.sort_by_key(|r| r.label().to_lowercase());
        info!("Listed {} child(ren) of {}", resources.len(), node.id);

        Ok(Expansion::nodes(
            resources.into_iter().map(|r| to_node(r, kind)).collect(),
        ))
    }

    async fn delete(&self, node: &TreeNode) -> Result<(), ExpanderError> {
        let url = node
            .delete_url
            .as_deref()
            .ok_or_else(|| ExpanderError::Unsupported(format!("{} cannot be deleted", node.display)))?;
        let response = self.client.delete(url).await?;
        info!("DELETE {} returned {}", url, response.status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_target_per_kind() {
        let root = TreeNode::new("root", "Subscriptions");
        assert_eq!(
            list_target(&root),
            Some(("/subscriptions".to_string(), NodeKind::Subscription))
        );

        let sub = TreeNode::new("/subscriptions/1", "prod").with_kind(NodeKind::Subscription);
        assert_eq!(
            list_target(&sub),
            Some(("/subscriptions/1/resourceGroups".to_string(), NodeKind::ResourceGroup))
        );

        let vm = TreeNode::new("/subscriptions/1/x/vm", "vm").with_kind(NodeKind::Resource);
        assert_eq!(list_target(&vm), None);
    }

    #[test]
    fn test_status_glyph() {
        assert_eq!(status_glyph(Some("Succeeded")), "");
        assert_eq!(status_glyph(Some("Deleting")), "✗");
        assert_eq!(status_glyph(Some("Failed")), "!");
        assert_eq!(status_glyph(Some("Updating")), "…");
        assert_eq!(status_glyph(None), "");
    }

    #[test]
    fn test_subscription_node_is_not_deletable() {
        let sub = ArmResource {
            id: "/subscriptions/1".into(),
            display_name: Some("Prod".into()),
            ..Default::default()
        };
        let node = to_node(sub, NodeKind::Subscription);
        assert_eq!(node.display, "Prod");
        assert_eq!(node.expand_url.as_deref(), Some("/subscriptions/1"));
        assert!(node.delete_url.is_none());
    }

    #[test]
    fn test_resource_node_carries_metadata() {
        let vm = ArmResource {
            id: "/subscriptions/1/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm".into(),
            name: Some("vm".into()),
            resource_type: Some("Microsoft.Compute/virtualMachines".into()),
            location: Some("westeurope".into()),
            ..Default::default()
        };
        let node = to_node(vm, NodeKind::Resource);
        assert_eq!(node.metadata["type"], "Microsoft.Compute/virtualMachines");
        assert_eq!(node.metadata["location"], "westeurope");
        assert!(node.delete_url.is_some());
    }
}
