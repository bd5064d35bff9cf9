//! Tag filter and free-text node search.
//!
//! Both are pure views over the node collection: they never mutate the
//! store and never apply to sticky notes, which carry no tags.

#[cfg(test)]
#[path = "filter_test.rs"]
mod filter_test;

use std::collections::HashSet;

use crate::doc::IdeaNode;

/// The set of tags the user has switched on in the filter bar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    selected: HashSet<String>,
}

impl TagFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `tag` to the selection, or remove it if already present.
    /// Returns whether the tag is selected afterwards.
    pub fn toggle(&mut self, tag: &str) -> bool {
        if self.selected.remove(tag) {
            false
        } else {
            self.selected.insert(tag.to_owned());
            true
        }
    }

    #[must_use]
    pub fn is_selected(&self, tag: &str) -> bool {
        self.selected.contains(tag)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    #[must_use]
    pub fn selected(&self) -> &HashSet<String> {
        &self.selected
    }

    /// Whether `node` passes the filter.
    #[must_use]
    pub fn matches(&self, node: &IdeaNode) -> bool {
        self.selected.is_empty() || node.has_any_tag(&self.selected)
    }

    /// Nodes whose tags intersect the selection, or every node when nothing is selected.
    #[must_use]
    pub fn apply<'a>(&self, nodes: &'a [IdeaNode]) -> Vec<&'a IdeaNode> {
        nodes.iter().filter(|n| self.matches(n)).collect()
    }
}

/// Node list search: a case-insensitive text query over title and
/// description, narrowed further by a tag filter.
#[derive(Debug, Clone, Default)]
pub struct NodeQuery {
    pub text: String,
    pub tags: TagFilter,
}

impl NodeQuery {
    #[must_use]
    pub fn matches(&self, node: &IdeaNode) -> bool {
        let text_ok = if self.text.is_empty() {
            true
        } else {
            let needle = self.text.to_lowercase();
            node.title.to_lowercase().contains(&needle) || node.description.to_lowercase().contains(&needle)
        };
        text_ok && self.tags.matches(node)
    }

    #[must_use]
    pub fn apply<'a>(&self, nodes: &'a [IdeaNode]) -> Vec<&'a IdeaNode> {
        nodes.iter().filter(|n| self.matches(n)).collect()
    }
}
