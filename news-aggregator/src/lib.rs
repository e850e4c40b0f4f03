pub mod types;
pub mod config;
pub mod fetcher;
pub mod parser;
pub mod traits;
pub mod reader;
pub mod extractor;
pub mod image;
pub mod filter;
pub mod store;
pub mod aggregator;
pub mod scheduler;
pub mod utils;
pub mod web;

pub use types::*;
pub use config::Config;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use reader::HttpFeedReader;
pub use extractor::HttpArticleExtractor;
pub use filter::ContentFilter;
pub use store::{ArticleStore, InsertOutcome, StagedBatch};
pub use aggregator::{NewsAggregator, RunReport, SkipReason};
pub use scheduler::Scheduler;
pub use traits::{ArticleExtractor, FeedReader};
