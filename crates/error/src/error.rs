pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the granite storage crates.
///
/// Callers are expected to match on the variant; the `Display` form is for
/// logs and test output. Programmer errors (out-of-range indexes, protocol
/// misuse) panic instead of returning a variant.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// A caller handed over an argument the storage layer cannot honor,
    /// such as a write larger than a page.
    InvalidInput(String),
    /// The database file could not be opened, locked, resized, read, or
    /// written.
    Io(String),
    /// Every frame in the buffer pool is pinned; no page can be created or
    /// brought in until one is unpinned.
    PoolExhausted,
    /// The operation needs the page to be resident in the buffer pool.
    PageNotResident(u32),
    /// The page cannot be deleted while it is still pinned.
    PagePinned(u32),
}

impl std::error::Error for Error {}
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Error::Io(msg) => write!(f, "io error: {msg}"),
            Error::PoolExhausted => write!(f, "buffer pool exhausted: every frame is pinned"),
            Error::PageNotResident(page_id) => {
                write!(f, "page {page_id} is not resident in the buffer pool")
            }
            Error::PagePinned(page_id) => {
                write!(f, "cannot delete page {page_id} while it is pinned")
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        // A poisoned latch means another thread panicked mid-operation;
        // there is nothing sound left to recover.
        panic!("{e}")
    }
}
