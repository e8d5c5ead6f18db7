#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("key not found")]
    NotFound,

    #[error("bad argument: {reason}")]
    BadArgument {
        reason: String,
    },

    #[error("iterator advanced after the trie was structurally modified")]
    StructuralChange,

    #[error("a pairs enumerator is already active on this trie")]
    ConcurrentUse,
}

pub type Result<T> = std::result::Result<T, Error>;
