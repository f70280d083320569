pub mod clean;
pub mod config;
pub mod merge;
pub mod patterns;

pub use clean::{clean_text_value, recursively_clean};
pub use config::{CleanerConfig, SelectionConfig};
pub use merge::{merge_json_to_txt, MergeObserver, MergeReport, ResponseMerger, TracingObserver};
pub use patterns::{CleaningPatterns, DEFAULT_PATTERNS};
