use crate::vectorizer::ScoredDocument;
use crate::SearchError;

pub trait Lemmatizer: Send + Sync {
    fn lemmatize(&self, token: &str) -> Result<String, SearchError>;
}

pub trait VectorIndex: Send + Sync {
    fn feature_count(&self) -> usize;

    fn search(
        &self,
        cleaned_query: &str,
        top_k: usize,
        min_score: f64,
    ) -> Result<Vec<ScoredDocument>, SearchError>;

    fn similar_to(
        &self,
        document_id: usize,
        top_k: usize,
        min_score: f64,
    ) -> Result<Vec<ScoredDocument>, SearchError>;
}

/// Ranks catalogue documents by the symptoms named in a raw query.
pub trait SymptomMatcher: Send + Sync {
    fn mapping_count(&self) -> usize;

    /// False when no document carries a symptom tag.
    fn is_built(&self) -> bool;

    fn search(
        &self,
        raw_query: &str,
        top_k: usize,
        min_score: f64,
    ) -> Result<Vec<ScoredDocument>, SearchError>;
}
