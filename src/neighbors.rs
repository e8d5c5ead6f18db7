use crate::error::{Error, Result};
use crate::node::{NodeId, ROOT};
use crate::trie::Trie;

/// Bounded-DFS Hamming-neighbor search. Tracks a running mismatch count as
/// it descends; a branch is pruned the moment that count exceeds `max_hd`,
/// so the search cost tracks the size of the matching neighborhood rather
/// than the whole trie.
pub struct NeighborIter<'a, V> {
    trie: &'a Trie<V>,
    query: Vec<u8>,
    max_hd: u32,
    captured_generation: u64,
    stack: Vec<(NodeId, usize, u32, Vec<u8>)>,
    done: bool,
}

impl<'a, V> NeighborIter<'a, V> {
    pub(crate) fn new(trie: &'a Trie<V>, query: Vec<u8>, max_hd: u32) -> Self {
        Self {
            captured_generation: trie.generation(),
            stack: vec![(ROOT, 0, 0, Vec::new())],
            trie,
            query,
            max_hd,
            done: false,
        }
    }
}

impl<'a, V: Clone> Iterator for NeighborIter<'a, V> {
    type Item = Result<(u32, Vec<u8>, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.trie.generation() != self.captured_generation {
            self.done = true;
            return Some(Err(Error::StructuralChange));
        }
        let inner = self.trie.inner.borrow();
        while let Some((node, depth, hd, key)) = self.stack.pop() {
            if depth == self.query.len() {
                if hd >= 1 && inner.arena.node(node).has_value {
                    let value = inner
                        .arena
                        .node(node)
                        .value
                        .clone()
                        .expect("has_value implies a bound value");
                    return Some(Ok((hd, key, value)));
                }
                continue;
            }
            let want = self.query[depth];
            for child in inner.arena.children(node).into_iter().rev() {
                let byte = inner.arena.node(child).byte;
                let new_hd = hd + u32::from(byte != want);
                if new_hd <= self.max_hd {
                    let mut child_key = key.clone();
                    child_key.push(byte);
                    self.stack.push((child, depth + 1, new_hd, child_key));
                }
            }
        }
        None
    }
}
