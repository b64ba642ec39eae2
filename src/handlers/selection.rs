//! Selection state
//!
//! Only one kind of entity can be selected at a time; selecting edges drops any node selection
//! and vice versa. Selection is view state and never enters the undo history.

use serde::{Deserialize, Serialize};

use crate::value_objects::{EdgeId, NodeId};

/// Current selection of the editor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "ids", rename_all = "lowercase")]
pub enum Selection {
    #[default]
    None,
    Node(Vec<NodeId>),
    Edge(Vec<EdgeId>),
}

impl Selection {
    /// Node selection with duplicates removed, order preserved
    pub fn nodes(ids: impl IntoIterator<Item = NodeId>) -> Self {
        let ids = dedup(ids);
        if ids.is_empty() {
            Selection::None
        } else {
            Selection::Node(ids)
        }
    }

    /// Edge selection with duplicates removed, order preserved
    pub fn edges(ids: impl IntoIterator<Item = EdgeId>) -> Self {
        let ids = dedup(ids);
        if ids.is_empty() {
            Selection::None
        } else {
            Selection::Edge(ids)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::None)
    }

    pub fn len(&self) -> usize {
        match self {
            Selection::None => 0,
            Selection::Node(ids) => ids.len(),
            Selection::Edge(ids) => ids.len(),
        }
    }

    pub fn node_ids(&self) -> &[NodeId] {
        match self {
            Selection::Node(ids) => ids,
            _ => &[],
        }
    }

    pub fn edge_ids(&self) -> &[EdgeId] {
        match self {
            Selection::Edge(ids) => ids,
            _ => &[],
        }
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_ids().contains(&id)
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edge_ids().contains(&id)
    }

    /// Copy without `id`; `None` when the node was not selected
    pub(crate) fn without_node(&self, id: NodeId) -> Option<Selection> {
        if !self.contains_node(id) {
            return None;
        }
        Some(Selection::nodes(self.node_ids().iter().copied().filter(|n| *n != id)))
    }

    /// Copy without `id`; `None` when the edge was not selected
    pub(crate) fn without_edge(&self, id: EdgeId) -> Option<Selection> {
        if !self.contains_edge(id) {
            return None;
        }
        Some(Selection::edges(self.edge_ids().iter().copied().filter(|e| *e != id)))
    }
}

fn dedup<T: PartialEq>(ids: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
