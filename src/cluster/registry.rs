//! Node registry.
//!
//! # Responsibilities
//! - Hold the set of nodes currently eligible for balancing
//! - Replace that set wholesale on every membership update
//! - Hand out copies, never the map itself

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard};

use crate::cluster::member::{Member, Node};

/// Lock-protected map of node name -> Node.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: RwLock<HashMap<String, Node>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the node set with the media nodes in `members`.
    ///
    /// Returns the number of nodes kept.
    pub fn update_members(&self, members: &[Member]) -> usize {
        let latest: HashMap<String, Node> = members
            .iter()
            .filter(|m| m.is_media_node())
            .map(|m| (m.name.clone(), Node::from(m)))
            .collect();
        let count = latest.len();

        // Poisoning is harmless: the map is only ever swapped whole.
        let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
        *nodes = latest;

        tracing::debug!(
            members = members.len(),
            nodes = count,
            "Node registry updated"
        );
        count
    }

    /// Copy of every registered node.
    pub fn snapshot(&self) -> Vec<Node> {
        self.read().values().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<Node> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` over the nodes under the shared lock.
    pub(crate) fn with_nodes<T>(&self, f: impl FnOnce(&HashMap<String, Node>) -> T) -> T {
        f(&self.read())
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Node>> {
        self.nodes.read().unwrap_or_else(|e| e.into_inner())
    }
}
