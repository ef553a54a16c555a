pub mod cache;
pub mod tree;

pub use cache::{CacheError, CategoryCache, CategorySnapshot};
pub use tree::build_category_tree;
