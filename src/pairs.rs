use crate::arena::Arena;
use crate::error::{Error, Result};
use crate::node::NodeId;
use crate::trie::Trie;

/// One level of the dual cursor. `Shared` is the "still matching a common
/// prefix" state: both cursors sit on the same node, and sibling pairs
/// `(a, b)` with `b >= a` are enumerated so each unordered split is visited
/// once (`a == b` recurses deeper on the shared prefix; `a < b` is the
/// first point of divergence). `Diverged` is the state after that first
/// mismatch: the two cursors now range independently over their own
/// subtrees, so no ordering constraint applies (the node identities already
/// keep the two keys distinct).
enum Frame {
    Shared {
        node: NodeId,
        depth: usize,
        prefix: Vec<u8>,
        a: NodeId,
        b: NodeId,
    },
    Diverged {
        node_a: NodeId,
        node_b: NodeId,
        depth: usize,
        hd: u32,
        key_a: Vec<u8>,
        key_b: Vec<u8>,
        a: NodeId,
        b: NodeId,
    },
}

fn shared_start<V>(arena: &Arena<V>, node: NodeId, depth: usize, prefix: Vec<u8>) -> Option<Frame> {
    let a = arena.node(node).child?;
    Some(Frame::Shared { node, depth, prefix, a, b: a })
}

fn diverged_start<V>(
    arena: &Arena<V>,
    node_a: NodeId,
    node_b: NodeId,
    depth: usize,
    hd: u32,
    key_a: Vec<u8>,
    key_b: Vec<u8>,
) -> Option<Frame> {
    let a = arena.node(node_a).child?;
    let b = arena.node(node_b).child?;
    Some(Frame::Diverged { node_a, node_b, depth, hd, key_a, key_b, a, b })
}

fn shared_next_state<V>(arena: &Arena<V>, a: NodeId, b: NodeId) -> Option<(NodeId, NodeId)> {
    if let Some(s) = arena.node(b).sibling {
        return Some((a, s));
    }
    let next_a = arena.node(a).sibling?;
    Some((next_a, next_a))
}

fn diverged_next_state<V>(arena: &Arena<V>, a: NodeId, b: NodeId, node_b: NodeId) -> Option<(NodeId, NodeId)> {
    if let Some(s) = arena.node(b).sibling {
        return Some((a, s));
    }
    let next_a = arena.node(a).sibling?;
    let first_b = arena
        .node(node_b)
        .child
        .expect("node_b had at least one child when this Diverged frame was built");
    Some((next_a, first_b))
}

/// Enumerates every unordered pair of distinct stored keys of length
/// `key_len` whose Hamming distance falls in `[1, max_hd]`, without a
/// Θ(n²) product over stored keys: two keys sharing a trie prefix are
/// explored together, and a branch is abandoned the moment its accumulated
/// mismatch count exceeds `max_hd`.
///
/// At most one pairs enumerator may be *dirty* (advanced at least once) per
/// trie at a time, because a dirty enumerator marks the nodes it visits so
/// `Drop` can reset them in one pass; a second dirty enumerator would step
/// on the same marks. Advancing a second one while the first is dirty
/// yields `Error::ConcurrentUse`. A clean enumerator (never advanced)
/// imposes no restriction; the lock is only taken on first advance.
pub struct PairsIter<'a, V> {
    trie: &'a Trie<V>,
    key_len: usize,
    max_hd: u32,
    stack: Vec<Frame>,
    touched: Vec<NodeId>,
    dirty: bool,
    done: bool,
}

impl<'a, V> PairsIter<'a, V> {
    pub(crate) fn new(trie: &'a Trie<V>, key_len: usize, max_hd: u32) -> Self {
        Self {
            trie,
            key_len,
            max_hd,
            stack: Vec::new(),
            touched: Vec::new(),
            dirty: false,
            done: false,
        }
    }

    fn touch(&mut self, inner: &crate::trie::Inner<V>, id: NodeId) {
        let node = inner.arena.node(id);
        if !node.mark.get() {
            node.mark.set(true);
            self.touched.push(id);
        }
    }
}

impl<'a, V: Clone> Iterator for PairsIter<'a, V> {
    type Item = Result<(u32, Vec<u8>, V, Vec<u8>, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if !self.dirty {
            if self.trie.pairs_locked.get() {
                self.done = true;
                return Some(Err(Error::ConcurrentUse));
            }
            self.trie.pairs_locked.set(true);
            self.dirty = true;
            let inner = self.trie.inner.borrow();
            if let Some(fr) = shared_start(&inner.arena, crate::node::ROOT, 0, Vec::new()) {
                self.stack.push(fr);
            }
        }

        let inner = self.trie.inner.borrow();
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Shared { node, depth, prefix, a, b } => {
                    if let Some((na, nb)) = shared_next_state(&inner.arena, a, b) {
                        self.stack.push(Frame::Shared {
                            node,
                            depth,
                            prefix: prefix.clone(),
                            a: na,
                            b: nb,
                        });
                    }
                    self.touch(&inner, a);
                    self.touch(&inner, b);
                    let child_depth = depth + 1;

                    if a == b {
                        if child_depth < self.key_len {
                            let mut child_prefix = prefix;
                            child_prefix.push(inner.arena.node(a).byte);
                            if let Some(fr) = shared_start(&inner.arena, a, child_depth, child_prefix) {
                                self.stack.push(fr);
                            }
                        }
                        // child_depth == key_len here means both cursors rode the
                        // same single path to full length: one key, not a pair.
                        continue;
                    }

                    let hd = 1;
                    if hd > self.max_hd {
                        continue;
                    }
                    let mut key_a = prefix.clone();
                    key_a.push(inner.arena.node(a).byte);
                    let mut key_b = prefix;
                    key_b.push(inner.arena.node(b).byte);

                    if child_depth == self.key_len {
                        if inner.arena.node(a).has_value && inner.arena.node(b).has_value {
                            let va = inner.arena.node(a).value.clone().expect("has_value implies bound value");
                            let vb = inner.arena.node(b).value.clone().expect("has_value implies bound value");
                            return Some(Ok((hd, key_a, va, key_b, vb)));
                        }
                    } else if let Some(fr) = diverged_start(&inner.arena, a, b, child_depth, hd, key_a, key_b) {
                        self.stack.push(fr);
                    }
                }
                Frame::Diverged { node_a, node_b, depth, hd, key_a, key_b, a, b } => {
                    if let Some((na, nb)) = diverged_next_state(&inner.arena, a, b, node_b) {
                        self.stack.push(Frame::Diverged {
                            node_a,
                            node_b,
                            depth,
                            hd,
                            key_a: key_a.clone(),
                            key_b: key_b.clone(),
                            a: na,
                            b: nb,
                        });
                    }
                    self.touch(&inner, a);
                    self.touch(&inner, b);

                    let byte_a = inner.arena.node(a).byte;
                    let byte_b = inner.arena.node(b).byte;
                    let new_hd = hd + u32::from(byte_a != byte_b);
                    if new_hd > self.max_hd {
                        continue;
                    }
                    let child_depth = depth + 1;
                    let mut next_key_a = key_a;
                    next_key_a.push(byte_a);
                    let mut next_key_b = key_b;
                    next_key_b.push(byte_b);

                    if child_depth == self.key_len {
                        if new_hd >= 1 && inner.arena.node(a).has_value && inner.arena.node(b).has_value {
                            let va = inner.arena.node(a).value.clone().expect("has_value implies bound value");
                            let vb = inner.arena.node(b).value.clone().expect("has_value implies bound value");
                            return Some(Ok((new_hd, next_key_a, va, next_key_b, vb)));
                        }
                    } else if let Some(fr) =
                        diverged_start(&inner.arena, a, b, child_depth, new_hd, next_key_a, next_key_b)
                    {
                        self.stack.push(fr);
                    }
                }
            }
        }

        self.finish();
        None
    }
}

impl<'a, V> PairsIter<'a, V> {
    fn finish(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        self.reset_marks();
    }

    fn reset_marks(&mut self) {
        if !self.dirty {
            return;
        }
        let inner = self.trie.inner.borrow();
        for id in self.touched.drain(..) {
            inner.arena.node(id).mark.set(false);
        }
        self.trie.pairs_locked.set(false);
        self.dirty = false;
    }
}

impl<'a, V> Drop for PairsIter<'a, V> {
    fn drop(&mut self) {
        self.reset_marks();
    }
}

#[cfg(test)]
mod tests {
    use crate::trie::Trie;
    use std::collections::HashSet;

    fn all_length3_over_abc() -> Trie<u32> {
        let t = Trie::new();
        let alphabet = [b'A', b'B', b'C'];
        let mut n = 0u32;
        for &x in &alphabet {
            for &y in &alphabet {
                for &z in &alphabet {
                    t.insert(&[x, y, z], n);
                    n += 1;
                }
            }
        }
        t
    }

    #[test]
    fn counts_match_known_scenario() {
        let t = all_length3_over_abc();
        assert_eq!(t.pairs(3, 1).unwrap().count(), 81);
        assert_eq!(t.pairs(3, 2).unwrap().count(), 243);
        assert_eq!(t.pairs(3, 3).unwrap().count(), 351);
    }

    #[test]
    fn each_pair_emitted_once() {
        let t = all_length3_over_abc();
        let mut seen = HashSet::new();
        for item in t.pairs(3, 3).unwrap() {
            let (_, k1, _, k2, _) = item.unwrap();
            let pair = if k1 < k2 { (k1, k2) } else { (k2, k1) };
            assert!(seen.insert(pair), "pair emitted twice");
        }
    }

    #[test]
    fn second_dirty_enumerator_is_rejected() {
        let t = Trie::new();
        t.insert(b"hello", 1);
        t.insert(b"h3llo", 2);
        let mut i1 = t.pairs(5, 1).unwrap();
        let mut i2 = t.pairs(5, 1).unwrap();
        assert!(i1.next().unwrap().is_ok());
        assert!(i2.next().unwrap().is_err());
    }

    #[test]
    fn dropping_unlocks_for_the_next_enumerator() {
        let t = all_length3_over_abc();
        {
            let mut i1 = t.pairs(3, 1).unwrap();
            i1.next();
        }
        let i2 = t.pairs(3, 1).unwrap();
        assert_eq!(i2.count(), 81);
    }
}
