//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::api::{ApiError, ApiResponse};
use crate::core::expander::{Expander, ExpanderError, Expansion};
use crate::core::node::{Content, TreeNode};
use crate::core::tracker::Poller;

/// `n` nodes with IDs and names `"{prefix}-0"`, `"{prefix}-1"`, ...
pub fn children(prefix: &str, n: usize) -> Vec<TreeNode> {
    (0..n)
        .map(|i| {
            let id = format!("{prefix}-{i}");
            TreeNode::new(id.clone(), id)
        })
        .collect()
}

/// An expander whose answers are fixed up front.
///
/// Without per-node scripts it answers every node with the same
/// expansion. Once any `*_for` script is added, nodes without a script
/// get an empty expansion.
pub struct ScriptedExpander {
    name: String,
    default: Expansion,
    per_node: HashMap<String, Expansion>,
    error: Option<String>,
    delay: Option<Duration>,
    panics: bool,
    only: Option<String>,
    deletions: Arc<Mutex<Vec<String>>>,
}

impl ScriptedExpander {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default: Expansion::default(),
            per_node: HashMap::new(),
            error: None,
            delay: None,
            panics: false,
            only: None,
            deletions: Arc::default(),
        }
    }

    pub fn with_nodes(mut self, nodes: Vec<TreeNode>) -> Self {
        self.default.nodes = nodes;
        self
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.default.content = Some(content);
        self
    }

    pub fn with_nodes_for(mut self, node_id: &str, nodes: Vec<TreeNode>) -> Self {
        self.per_node.entry(node_id.to_string()).or_default().nodes = nodes;
        self
    }

    pub fn with_content_for(mut self, node_id: &str, content: Content) -> Self {
        self.per_node.entry(node_id.to_string()).or_default().content = Some(content);
        self
    }

    pub fn with_error(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }

    /// Sleeps on tokio time before answering, so paused-clock tests control it.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Panics inside `expand`, as a buggy expander task would.
    pub fn with_panic(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn applying_to(mut self, node_id: &str) -> Self {
        self.only = Some(node_id.to_string());
        self
    }

    /// IDs passed to `delete`, in call order.
    pub fn deletions(&self) -> Arc<Mutex<Vec<String>>> {
        self.deletions.clone()
    }
}

#[async_trait]
impl Expander for ScriptedExpander {
    fn name(&self) -> &str {
        &self.name
    }

    fn applies_to(&self, node: &TreeNode) -> bool {
        self.only.as_deref().is_none_or(|id| id == node.id)
    }

    async fn expand(&self, node: &TreeNode) -> Result<Expansion, ExpanderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panics {
            panic!("expander {} blew up on {}", self.name, node.id);
        }
        if let Some(message) = &self.error {
            return Err(ExpanderError::Api(ApiError::Api {
                status: 500,
                message: message.clone(),
            }));
        }
        if self.per_node.is_empty() {
            return Ok(self.default.clone());
        }
        Ok(self.per_node.get(&node.id).cloned().unwrap_or_default())
    }

    async fn delete(&self, node: &TreeNode) -> Result<(), ExpanderError> {
        self.deletions.lock().unwrap().push(node.id.clone());
        Ok(())
    }
}

/// A poller that replays a fixed list of results, one per call.
pub struct ScriptedPoller {
    script: Mutex<VecDeque<Result<ApiResponse, ApiError>>>,
    calls: AtomicUsize,
}

impl ScriptedPoller {
    pub fn new(script: Vec<Result<ApiResponse, ApiError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Poller for ScriptedPoller {
    async fn poll(&self, _uri: &str) -> Result<ApiResponse, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("script exhausted".into())))
    }
}

/// A captured response with no headers.
pub fn response(method: &str, uri: &str, status: u16, body: &str) -> ApiResponse {
    ApiResponse {
        method: method.to_string(),
        uri: uri.to_string(),
        status,
        headers: HeaderMap::new(),
        body: body.to_string(),
    }
}

impl ApiResponse {
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
        self
    }
}
