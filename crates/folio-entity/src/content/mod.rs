//! Content directory entities.

pub mod model;

pub use model::{ContentInfo, ContentType, SubContents};
