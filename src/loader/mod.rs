pub mod cache;
pub mod fetch;
pub mod sample_loader;

pub use cache::{CacheEntry, SampleCache};
pub use fetch::{Fetch, SourceFetcher};
