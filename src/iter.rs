use crate::error::{Error, Result};
use crate::node::{NodeId, ROOT};
use crate::trie::{find_path, Trie};

/// Shared depth-first cursor backing [`KeyIter`], [`ValueIter`],
/// [`ItemIter`], and [`SuffixIter`]. Captures `generation` at construction
/// and re-checks it on every step; a mismatch fuses the cursor (it returns
/// `Some(Err(StructuralChange))` exactly once, then `None` forever).
///
/// The stack holds `(node, path-bytes-from-the-cursor's-start)` pairs and is
/// only ever pushed to in descending-byte order, so popping yields
/// ascending (lexicographic) order, the same explicit-stack DFS idiom used
/// throughout this crate rather than true recursion, since the cursor must
/// suspend between items.
struct DfsCursor<'a, V> {
    trie: &'a Trie<V>,
    captured_generation: u64,
    stack: Vec<(NodeId, Vec<u8>)>,
    done: bool,
}

impl<'a, V> DfsCursor<'a, V> {
    fn new(trie: &'a Trie<V>, start: NodeId, start_prefix: Vec<u8>) -> Self {
        Self {
            captured_generation: trie.generation(),
            trie,
            stack: vec![(start, start_prefix)],
            done: false,
        }
    }

    fn step(&mut self) -> Option<Result<(NodeId, Vec<u8>)>> {
        if self.done {
            return None;
        }
        if self.trie.generation() != self.captured_generation {
            self.done = true;
            return Some(Err(Error::StructuralChange));
        }
        let inner = self.trie.inner.borrow();
        loop {
            let (id, prefix) = self.stack.pop()?;
            inner.arena.push_children_rev(id, &prefix, &mut self.stack);
            if inner.arena.node(id).has_value {
                return Some(Ok((id, prefix)));
            }
        }
    }
}

pub struct KeyIter<'a, V>(DfsCursor<'a, V>);

impl<'a, V> KeyIter<'a, V> {
    pub(crate) fn new(trie: &'a Trie<V>) -> Self {
        Self(DfsCursor::new(trie, ROOT, Vec::new()))
    }
}

impl<'a, V> Iterator for KeyIter<'a, V> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.step().map(|r| r.map(|(_, key)| key))
    }
}

pub struct ValueIter<'a, V>(DfsCursor<'a, V>);

impl<'a, V> ValueIter<'a, V> {
    pub(crate) fn new(trie: &'a Trie<V>) -> Self {
        Self(DfsCursor::new(trie, ROOT, Vec::new()))
    }
}

impl<'a, V: Clone> Iterator for ValueIter<'a, V> {
    type Item = Result<V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.step().map(|r| {
            r.map(|(id, _)| {
                let inner = self.0.trie.inner.borrow();
                inner
                    .arena
                    .node(id)
                    .value
                    .clone()
                    .expect("has_value implies a bound value")
            })
        })
    }
}

pub struct ItemIter<'a, V>(DfsCursor<'a, V>);

impl<'a, V> ItemIter<'a, V> {
    pub(crate) fn new(trie: &'a Trie<V>) -> Self {
        Self(DfsCursor::new(trie, ROOT, Vec::new()))
    }
}

impl<'a, V: Clone> Iterator for ItemIter<'a, V> {
    type Item = Result<(Vec<u8>, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.step().map(|r| {
            r.map(|(id, key)| {
                let inner = self.0.trie.inner.borrow();
                let value = inner
                    .arena
                    .node(id)
                    .value
                    .clone()
                    .expect("has_value implies a bound value");
                (key, value)
            })
        })
    }
}

/// Lazy `(suffix, value)` enumeration of every stored key under a prefix,
/// in trie DFS order. If the prefix node itself has a bound value, it is
/// yielded first with the empty suffix.
pub struct SuffixIter<'a, V>(DfsCursor<'a, V>);

impl<'a, V> SuffixIter<'a, V> {
    /// `prefix` must already be known to name a node (callers go through
    /// `Trie::suffixes`, which checks this).
    pub(crate) fn new(trie: &'a Trie<V>, prefix: Vec<u8>) -> Self {
        let node = {
            let inner = trie.inner.borrow();
            *find_path(&inner, &prefix)
                .expect("Trie::suffixes already verified the prefix exists")
                .last()
                .unwrap()
        };
        Self(DfsCursor::new(trie, node, Vec::new()))
    }
}

impl<'a, V: Clone> Iterator for SuffixIter<'a, V> {
    type Item = Result<(Vec<u8>, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.step().map(|r| {
            r.map(|(id, suffix)| {
                let inner = self.0.trie.inner.borrow();
                let value = inner
                    .arena
                    .node(id)
                    .value
                    .clone()
                    .expect("has_value implies a bound value");
                (suffix, value)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::trie::Trie;
    use crate::error::Error;

    #[test]
    fn keys_come_back_lexicographic() {
        let t = Trie::new();
        t.insert(b"b", 2);
        t.insert(b"a", 1);
        t.insert(b"ab", 3);
        let keys: Vec<Vec<u8>> = t.iter_keys().collect::<Result<_, _>>().unwrap();
        assert_eq!(keys, vec![b"a".to_vec(), b"ab".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn mutation_between_steps_invalidates() {
        let t = Trie::new();
        t.insert(b"a", 1);
        t.insert(b"b", 2);
        t.insert(b"c", 3);
        let mut it = t.iter_keys();
        assert!(it.next().unwrap().is_ok());
        t.insert(b"d", 4);
        assert_eq!(it.next(), Some(Err(Error::StructuralChange)));
        assert_eq!(it.next(), None);
    }

    #[test]
    fn reinsert_then_delete_still_trips_guard_on_generation_not_node_count() {
        let t = Trie::new();
        t.insert(b"a", 1);
        t.insert(b"b", 2);
        let nodes_before = t.num_nodes();
        let mut it = t.iter_keys();
        t.insert(b"c", 3);
        t.delete(b"c").unwrap();
        assert_eq!(t.num_nodes(), nodes_before);
        assert_eq!(it.next(), Some(Err(Error::StructuralChange)));
    }

    #[test]
    fn suffixes_anchor_at_prefix() {
        let t = Trie::new();
        t.insert(b"foo", 1);
        t.insert(b"foobar", 2);
        t.insert(b"fizz", 3);
        let got: Vec<(Vec<u8>, i32)> = t.suffixes(b"foo").unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(got, vec![(Vec::new(), 1), (b"bar".to_vec(), 2)]);
    }
}
