//! # Navigation History
//!
//! LIFO of [`Page`]s. A page is pushed immediately before an expansion
//! commits and popped on back-navigation, so popping always yields the
//! exact view that was on screen before the expansion.

use crate::core::node::{Content, TreeNode};

/// One frame of navigation history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Display order is significant.
    pub items: Vec<TreeNode>,
    pub content: Content,
    pub title: String,
    pub selection: usize,
    pub filter: String,
    /// The node whose expansion produced this frame.
    pub expanded_node: Option<TreeNode>,
}

#[derive(Debug, Default)]
pub struct History {
    pages: Vec<Page>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// `None` means there is nothing to go back to.
    pub fn pop(&mut self) -> Option<Page> {
        self.pages.pop()
    }

    pub fn peek(&self) -> Option<&Page> {
        self.pages.last()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str) -> Page {
        Page {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_pop_empty_returns_none() {
        let mut history = History::new();
        assert!(history.pop().is_none());
        assert!(history.is_empty());
    }

    #[test]
    fn test_pop_is_lifo() {
        let mut history = History::new();
        history.push(page("root"));
        history.push(page("subscription"));
        history.push(page("group"));

        assert_eq!(history.len(), 3);
        assert_eq!(history.peek().map(|p| p.title.as_str()), Some("group"));
        assert_eq!(history.pop().unwrap().title, "group");
        assert_eq!(history.pop().unwrap().title, "subscription");
        assert_eq!(history.pop().unwrap().title, "root");
        assert!(history.pop().is_none());
    }

    #[test]
    fn test_popped_page_is_unchanged() {
        let mut history = History::new();
        let original = Page {
            items: vec![TreeNode::new("a", "A"), TreeNode::new("b", "B")],
            content: Content::json("{\"x\":1}"),
            title: "root".into(),
            selection: 1,
            filter: "b".into(),
            expanded_node: Some(TreeNode::new("root", "Root")),
        };
        history.push(original.clone());
        assert_eq!(history.pop(), Some(original));
    }

    #[test]
    fn test_clear() {
        let mut history = History::new();
        history.push(page("a"));
        history.clear();
        assert!(history.is_empty());
    }
}
