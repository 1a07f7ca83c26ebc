mod cache;

pub use cache::{AnalysisCache, CacheError};
