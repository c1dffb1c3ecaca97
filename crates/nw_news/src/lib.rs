pub mod categories;
pub mod news;
pub mod sources;

pub use categories::{CategoryService, NewCategory};
pub use news::NewsService;
pub use sources::{NewSource, SourceService};

pub mod prelude {
    pub use crate::categories::CategoryService;
    pub use crate::news::NewsService;
    pub use crate::sources::SourceService;
    pub use nw_core::{Article, Candidate, Category, Error, Result, Source};
}
