//! Cluster members and balanceable nodes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Tag holding the node's ingest (DTSC) address.
pub const DTSC_TAG: &str = "dtsc";
/// Tag naming the node's role.
pub const NODE_TAG: &str = "node";
/// Role value for nodes that serve media. Anything else is ignored.
pub const MEDIA_NODE: &str = "media";

/// A cluster member as reported by the membership provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl Member {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: HashMap::new(),
        }
    }

    /// Builder-style tag setter.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// True for members that take part in load balancing.
    pub fn is_media_node(&self) -> bool {
        self.tags.get(NODE_TAG).map(String::as_str) == Some(MEDIA_NODE)
    }
}

/// A node eligible for selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    pub name: String,
    pub dtsc: String,
}

impl From<&Member> for Node {
    fn from(member: &Member) -> Self {
        Self {
            name: member.name.clone(),
            dtsc: member.tags.get(DTSC_TAG).cloned().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_node_tag() {
        assert!(Member::new("a").with_tag("node", "media").is_media_node());
        assert!(!Member::new("b").with_tag("node", "testing").is_media_node());
        assert!(!Member::new("c").is_media_node());
    }

    #[test]
    fn test_node_from_member() {
        let member = Member::new("a")
            .with_tag("node", "media")
            .with_tag("dtsc", "dtsc://a.example.com");
        let node = Node::from(&member);
        assert_eq!(node.name, "a");
        assert_eq!(node.dtsc, "dtsc://a.example.com");

        assert_eq!(Node::from(&Member::new("b")).dtsc, "");
    }
}
