use std::cell::{Cell, RefCell};
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::error::{Error, Result};
use crate::iter::{ItemIter, KeyIter, SuffixIter, ValueIter};
use crate::neighbors::NeighborIter;
use crate::node::{Node, NodeId, ROOT};
use crate::pairs::PairsIter;

#[derive(Serialize, Deserialize)]
pub(crate) struct Inner<V> {
    pub(crate) arena: Arena<V>,
    pub(crate) size: usize,
    pub(crate) generation: u64,
}

/// An in-memory byte-keyed trie supporting exact lookup, prefix queries,
/// key-ordered iteration, and Hamming-distance neighbor/pairs search.
///
/// All operations take `&self`: mutation goes through an internal
/// [`RefCell`], which is what lets an iterator detect a structural change
/// made through a sibling handle to the same trie at runtime (see
/// [`Trie::iter_keys`]) rather than have the borrow checker simply refuse to
/// compile the scenario.
pub struct Trie<V> {
    pub(crate) inner: RefCell<Inner<V>>,
    pub(crate) pairs_locked: Cell<bool>,
}

impl<V> Default for Trie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Trie<V> {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(Inner {
                arena: Arena::new(),
                size: 0,
                generation: 0,
            }),
            pairs_locked: Cell::new(false),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.inner.borrow().generation
    }

    /// Binds `value` to `key`, returning the previous value if the key was
    /// already present. The new value is bound before the old one is
    /// dropped; `size`/`generation` only change when the key is new.
    pub fn insert(&self, key: &[u8], value: V) -> Option<V> {
        let mut inner = self.inner.borrow_mut();
        let mut cur = ROOT;
        for &b in key {
            let (id, created) = child_or_insert(&mut inner.arena, cur, b);
            if created {
                inner.generation += 1;
            }
            cur = id;
        }
        let node = inner.arena.node_mut(cur);
        let prev = node.value.take();
        node.value = Some(value);
        if !node.has_value {
            node.has_value = true;
            inner.size += 1;
        }
        prev
    }

    /// True iff `key` terminates a stored key.
    pub fn has_value(&self, key: &[u8]) -> bool {
        let inner = self.inner.borrow();
        match find_path(&inner, key) {
            Some(path) => inner.arena.node(*path.last().unwrap()).has_value,
            None => false,
        }
    }

    /// True iff `prefix` names a node in the trie at all, with or without a
    /// bound value. The empty prefix is always present (the root).
    pub fn has_node(&self, prefix: &[u8]) -> bool {
        find_path(&self.inner.borrow(), prefix).is_some()
    }

    /// Removes `key`, pruning any ancestor left with no children and no
    /// bound value. Returns the removed value, or `Error::NotFound`.
    pub fn delete(&self, key: &[u8]) -> Result<V> {
        let mut inner = self.inner.borrow_mut();
        let path = find_path(&inner, key).ok_or(Error::NotFound)?;
        let terminal = *path.last().unwrap();
        if !inner.arena.node(terminal).has_value {
            return Err(Error::NotFound);
        }
        let value = inner
            .arena
            .node_mut(terminal)
            .value
            .take()
            .expect("has_value implies a bound value");
        inner.arena.node_mut(terminal).has_value = false;
        inner.size -= 1;

        let mut i = path.len() - 1;
        while i > 0 {
            let node_id = path[i];
            let node = inner.arena.node(node_id);
            if node.child.is_some() || node.has_value {
                break;
            }
            let parent_id = path[i - 1];
            unlink_child(&mut inner.arena, parent_id, node_id);
            inner.arena.free(node_id);
            inner.generation += 1;
            i -= 1;
        }

        Ok(value)
    }

    pub fn pop(&self, key: &[u8]) -> Result<V> {
        self.delete(key)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of non-root nodes currently allocated.
    pub fn num_nodes(&self) -> usize {
        self.inner.borrow().arena.live_slots() - 1
    }

    /// Approximate heap footprint: per-node struct size times live node
    /// count, plus the `Trie` struct itself.
    pub fn size_of(&self) -> usize {
        std::mem::size_of::<Self>() + self.inner.borrow().arena.bytes_used()
    }

    pub fn iter_keys(&self) -> KeyIter<'_, V> {
        KeyIter::new(self)
    }

    pub fn iter_values(&self) -> ValueIter<'_, V> {
        ValueIter::new(self)
    }

    pub fn iter_items(&self) -> ItemIter<'_, V> {
        ItemIter::new(self)
    }
}

impl<V: Clone> Trie<V> {
    pub fn get(&self, key: &[u8]) -> Option<V> {
        let inner = self.inner.borrow();
        let path = find_path(&inner, key)?;
        let node = inner.arena.node(*path.last().unwrap());
        if node.has_value {
            node.value.clone()
        } else {
            None
        }
    }

    pub fn get_or(&self, key: &[u8], default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    pub fn longest_prefix(&self, key: &[u8]) -> Option<(Vec<u8>, V)> {
        let inner = self.inner.borrow();
        let mut cur = ROOT;
        let mut best: Option<(usize, NodeId)> = inner.arena.node(ROOT).has_value.then_some((0, ROOT));
        for (i, &b) in key.iter().enumerate() {
            match find_child(&inner.arena, cur, b) {
                Some(id) => {
                    cur = id;
                    if inner.arena.node(id).has_value {
                        best = Some((i + 1, id));
                    }
                }
                None => break,
            }
        }
        let (len, id) = best?;
        let value = inner
            .arena
            .node(id)
            .value
            .clone()
            .expect("best tracks only has_value nodes");
        Some((key[..len].to_vec(), value))
    }

    pub fn suffixes(&self, prefix: &[u8]) -> Result<SuffixIter<'_, V>> {
        self.has_node(prefix)
            .then(|| SuffixIter::new(self, prefix.to_vec()))
            .ok_or(Error::NotFound)
    }

    pub fn setdefault(&self, key: &[u8], default: V) -> V {
        if let Some(v) = self.get(key) {
            return v;
        }
        self.insert(key, default.clone());
        default
    }

    pub fn pop_or(&self, key: &[u8], default: V) -> V {
        self.delete(key).unwrap_or(default)
    }

    /// Removes and returns an arbitrary `(key, value)` pair. The choice of
    /// which pair is lexicographically-first, for determinism, but any
    /// deterministic policy would satisfy the contract.
    pub fn popitem(&self) -> Result<(Vec<u8>, V)> {
        let key = {
            let inner = self.inner.borrow();
            first_key(&inner.arena).ok_or(Error::NotFound)?
        };
        let value = self.delete(&key)?;
        Ok((key, value))
    }

    pub fn neighbors(&self, query: &[u8], max_hd: u32) -> Result<NeighborIter<'_, V>> {
        if max_hd < 1 {
            return Err(Error::BadArgument {
                reason: format!("max_hd must be >= 1, got {max_hd}"),
            });
        }
        if !self.has_value(query) {
            return Err(Error::BadArgument {
                reason: "query key is not stored in the trie".to_string(),
            });
        }
        Ok(NeighborIter::new(self, query.to_vec(), max_hd))
    }

    /// `max_hd` is checked eagerly; `key_len` is a `usize` so it cannot be
    /// negative.
    pub fn pairs(&self, key_len: usize, max_hd: u32) -> Result<PairsIter<'_, V>> {
        if max_hd < 1 {
            return Err(Error::BadArgument {
                reason: format!("max_hd must be >= 1, got {max_hd}"),
            });
        }
        Ok(PairsIter::new(self, key_len, max_hd))
    }
}

impl<V: Serialize> Serialize for Trie<V> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.inner.borrow().serialize(serializer)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Trie<V> {
    /// `generation` resets to 0 on restore: a freshly restored trie has no
    /// live iterators to invalidate. `size` is recomputed from the
    /// deserialized topology rather than trusted, as a consistency check.
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let mut inner = Inner::<V>::deserialize(deserializer)?;
        inner.generation = 0;
        inner.size = inner.arena.count_values();
        Ok(Self {
            inner: RefCell::new(inner),
            pairs_locked: Cell::new(false),
        })
    }
}

pub(crate) fn find_child<V>(arena: &Arena<V>, parent: NodeId, byte: u8) -> Option<NodeId> {
    let mut cur = arena.node(parent).child;
    while let Some(id) = cur {
        let n = arena.node(id);
        match n.byte.cmp(&byte) {
            Ordering::Equal => return Some(id),
            Ordering::Greater => return None,
            Ordering::Less => cur = n.sibling,
        }
    }
    None
}

fn child_or_insert<V>(arena: &mut Arena<V>, parent: NodeId, byte: u8) -> (NodeId, bool) {
    let mut prev: Option<NodeId> = None;
    let mut cur = arena.node(parent).child;
    while let Some(id) = cur {
        let n = arena.node(id);
        match n.byte.cmp(&byte) {
            Ordering::Equal => return (id, false),
            Ordering::Greater => break,
            Ordering::Less => {
                prev = Some(id);
                cur = n.sibling;
            }
        }
    }
    let new_id = arena.alloc(Node::new(byte));
    arena.node_mut(new_id).sibling = cur;
    match prev {
        Some(p) => arena.node_mut(p).sibling = Some(new_id),
        None => arena.node_mut(parent).child = Some(new_id),
    }
    (new_id, true)
}

fn unlink_child<V>(arena: &mut Arena<V>, parent: NodeId, child: NodeId) {
    let first = arena.node(parent).child;
    if first == Some(child) {
        let next = arena.node(child).sibling;
        arena.node_mut(parent).child = next;
        return;
    }
    let mut cur = first;
    while let Some(id) = cur {
        let next = arena.node(id).sibling;
        if next == Some(child) {
            let after = arena.node(child).sibling;
            arena.node_mut(id).sibling = after;
            return;
        }
        cur = next;
    }
    unreachable!("child not found among its parent's siblings");
}

pub(crate) fn find_path<V>(inner: &Inner<V>, key: &[u8]) -> Option<Vec<NodeId>> {
    let mut path = vec![ROOT];
    let mut cur = ROOT;
    for &b in key {
        let id = find_child(&inner.arena, cur, b)?;
        path.push(id);
        cur = id;
    }
    Some(path)
}

/// Lexicographically-first stored key, depth-first, root included.
fn first_key<V>(arena: &Arena<V>) -> Option<Vec<u8>> {
    if arena.node(ROOT).has_value {
        return Some(Vec::new());
    }
    let mut stack: Vec<(NodeId, Vec<u8>)> = Vec::new();
    arena.push_children_rev(ROOT, &[], &mut stack);
    while let Some((id, prefix)) = stack.pop() {
        if arena.node(id).has_value {
            return Some(prefix);
        }
        arena.push_children_rev(id, &prefix, &mut stack);
    }
    None
}
