use serde::{Deserialize, Serialize};

use crate::node::{Node, NodeId};

/// `Vec`-backed slab allocator for [`Node`]s. Freed slots are recycled via an
/// internal free list rather than left as holes, so `num_nodes` and `size_of`
/// stay accurate without a compaction pass.
#[derive(Serialize, Deserialize)]
pub(crate) struct Arena<V> {
    slots: Vec<Option<Node<V>>>,
    free: Vec<NodeId>,
}

impl<V> Arena<V> {
    pub fn new() -> Self {
        Self {
            slots: vec![Some(Node::root())],
            free: Vec::new(),
        }
    }

    pub fn node(&self, id: NodeId) -> &Node<V> {
        self.slots[id.0 as usize]
            .as_ref()
            .expect("dangling NodeId: arena slot was freed")
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node<V> {
        self.slots[id.0 as usize]
            .as_mut()
            .expect("dangling NodeId: arena slot was freed")
    }

    pub fn alloc(&mut self, node: Node<V>) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.slots[id.0 as usize] = Some(node);
            id
        } else {
            let id = NodeId(self.slots.len() as u32);
            self.slots.push(Some(node));
            id
        }
    }

    pub fn free(&mut self, id: NodeId) {
        self.slots[id.0 as usize] = None;
        self.free.push(id);
    }

    /// Live node count, including the root.
    pub fn live_slots(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Bytes held by every live node record (root included), used by
    /// `Trie::size_of`.
    pub fn bytes_used(&self) -> usize {
        self.live_slots() * std::mem::size_of::<Node<V>>()
    }

    /// Children of `parent` in ascending byte order.
    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.node(parent).child;
        while let Some(id) = cur {
            out.push(id);
            cur = self.node(id).sibling;
        }
        out
    }

    /// Pushes `parent`'s children onto `stack` in descending byte order, so
    /// that popping the stack yields them in ascending (lexicographic)
    /// order.
    pub fn push_children_rev(&self, parent: NodeId, prefix: &[u8], stack: &mut Vec<(NodeId, Vec<u8>)>) {
        for id in self.children(parent).into_iter().rev() {
            let mut key = prefix.to_vec();
            key.push(self.node(id).byte);
            stack.push((id, key));
        }
    }

    /// Recomputes the number of `has_value` nodes from scratch; used after
    /// deserializing to cross-check the restored `size` counter.
    pub fn count_values(&self) -> usize {
        self.slots
            .iter()
            .filter_map(|s| s.as_ref())
            .filter(|n| n.has_value)
            .count()
    }
}
