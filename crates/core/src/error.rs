use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv decode error: {0}")]
    Csv(#[from] csv::Error),

    #[error("no catalog file found in {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("empty vocabulary: {0}")]
    EmptyVocabulary(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("invalid index config: {0}")]
    InvalidIndexConfig(String),

    #[error("index not available: {0}")]
    NotReady(String),

    #[error("unknown document id {0}")]
    UnknownDocument(usize),

    #[error("lemmatizer failed on {token:?}: {details}")]
    Lemmatizer { token: String, details: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
