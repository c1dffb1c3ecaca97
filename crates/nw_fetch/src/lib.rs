pub mod extract;
pub mod feed;
pub mod scheduler;
pub mod strategy;

pub use extract::ContentExtractor;
pub use feed::FeedParser;
pub use scheduler::{CandidateImporter, FetchScheduler};
pub use strategy::{FetchDispatcher, FetchStrategy};

pub mod prelude {
    pub use crate::scheduler::{CandidateImporter, FetchScheduler};
    pub use crate::strategy::{FetchDispatcher, FetchStrategy};
    pub use nw_core::{Candidate, Error, FetchMethod, Result, Source};
}
