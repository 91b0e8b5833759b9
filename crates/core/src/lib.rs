pub mod aggregator;
pub mod config;
pub mod known_ids;
pub mod queries;
pub mod report;
pub mod searcher;
pub mod similarity;
pub mod stage;
pub mod store;
pub mod testing;

pub use aggregator::{
    AggregateError, AggregateOutcome, Aggregator, IncompleteQuery, QueryFailure, ResultEvent,
    ResultSet, RunConfig, RunStats,
};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, SanitizedConfig, SearcherBackend,
};
pub use known_ids::KnownIdsError;
pub use queries::QueryFileError;
pub use searcher::{
    SearchError, SearchRequest, VideoCandidate, VideoSearcher, YouTubeApiSearcher, YtDlpSearcher,
};
pub use stage::{ExclusionSet, QuerySpec, ScoredResult, SearchStage};
pub use store::{ResultStore, StoreError, TextResultStore};
