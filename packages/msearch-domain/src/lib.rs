pub mod criteria;
pub mod hashtag;
pub mod item_type;
pub mod pagination;
pub mod parse;
pub mod query;
pub mod route;
pub mod validate;

mod error;

pub use error::{Error, Result};
pub use item_type::{ItemType, Lexicon};
pub use pagination::{Page, PageLimits};
pub use parse::{SearchParams, parse};
pub use query::{GeoFilter, Query, RawFilters, SortMode};
pub use route::{Route, route};
pub use validate::{AuthorResolution, validate};
