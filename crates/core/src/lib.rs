pub mod cache;
pub mod catalog;
pub mod duplicates;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod symptoms;
pub mod text;
pub mod traits;
pub mod vectorizer;

pub use cache::{CacheKey, CacheStatus, ResultCache};
pub use catalog::{
    discover_catalog_files, load_catalog, load_catalog_or_sample, read_catalog, CatalogSource,
    Corpus,
};
pub use duplicates::{
    similarity_ratio, DuplicateGroup, DuplicateGrouper, DuplicateGroups, GroupingStrategy,
};
pub use error::{CatalogError, SearchError};
pub use models::{
    confidence_from_score, CatalogSummary, Document, DuplicateSummary, EngineConfig, Health,
    MemberSummary, Recommendation, SearchAnalytics, SearchFilters, SearchHit, SearchRequest,
    SearchType, SortBy, NOT_SPECIFIED,
};
pub use orchestrator::SearchEngine;
pub use symptoms::{SymptomTagIndex, SymptomTaxonomy};
pub use text::{EnglishLemmatizer, NoopLemmatizer, TextNormalizer};
pub use traits::{Lemmatizer, SymptomMatcher, VectorIndex};
pub use vectorizer::{ScoredDocument, TfidfConfig, TfidfIndex};
