//! An in-memory associative container mapping byte-string keys to owned
//! values, with exact lookup, prefix queries, key-ordered iteration, and
//! approximate (Hamming-distance) neighbor and pairs search.
//!
//! The trie itself ([`Trie`]) is the only public type most callers need;
//! its iterator and enumerator types are returned by its methods and
//! rarely named directly.

mod arena;
mod iter;
mod neighbors;
mod node;
mod pairs;
mod trie;

pub mod error;

pub use error::{Error, Result};
pub use iter::{ItemIter, KeyIter, SuffixIter, ValueIter};
pub use neighbors::NeighborIter;
pub use pairs::PairsIter;
pub use trie::Trie;
