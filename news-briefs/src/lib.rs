pub mod types;
pub mod config;
pub mod traits;
pub mod utils;
pub mod parser;
pub mod sources;
pub mod fetcher;
pub mod normalizer;
pub mod similarity;
pub mod grouping;
pub mod reducer;
pub mod enhancer;
pub mod pipeline;

pub use types::*;
pub use config::{BriefsConfig, FetchConfig, NormalizeConfig, SimilarityConfig, SortOrder};
pub use traits::{CandidatePairs, FeedClient, FetchObserver};
pub use parser::FeedParser;
pub use sources::HttpFeedClient;
pub use fetcher::{FeedFetcher, LoggingObserver, NoopObserver};
pub use normalizer::EntryNormalizer;
pub use similarity::{quick_ratio, sequence_ratio, SimilarityScorer};
pub use grouping::{AllPairs, SimilarityGrouper, UnionFind};
pub use reducer::ClusterReducer;
pub use enhancer::ContentEnhancer;
pub use pipeline::{Pipeline, PipelineRun, RunReport, Stage};
