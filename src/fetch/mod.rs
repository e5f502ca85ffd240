pub mod quotes;

pub use quotes::{Quote, QuoteFetcher};

/// Default concurrency guard applied when issuing ticker requests.
pub const QUOTE_CONCURRENCY_LIMIT: usize = 5;

#[inline]
pub fn ensure_concurrency_limit(limit: usize) -> usize {
    limit.max(1)
}
