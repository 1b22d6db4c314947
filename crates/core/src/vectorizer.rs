use crate::catalog::Corpus;
use crate::error::SearchError;
use crate::models::Document;
use crate::text::{is_stopword, TextNormalizer};
use crate::traits::VectorIndex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TfidfConfig {
    pub ngram_range: (usize, usize),
    pub max_features: usize,
    pub min_df: usize,
    pub max_df: f64,
    pub sublinear_tf: bool,
    /// Corpora smaller than this keep every term regardless of `min_df`/`max_df`.
    pub prune_min_documents: usize,
}

impl TfidfConfig {
    pub fn catalog() -> Self {
        Self {
            ngram_range: (1, 3),
            max_features: 10_000,
            min_df: 2,
            max_df: 0.8,
            sublinear_tf: true,
            prune_min_documents: 100,
        }
    }

    pub fn symptom_tags() -> Self {
        Self {
            ngram_range: (1, 2),
            max_features: 1_000,
            min_df: 1,
            max_df: 1.0,
            sublinear_tf: false,
            prune_min_documents: 0,
        }
    }

    fn validate(&self) -> Result<(), SearchError> {
        let (low, high) = self.ngram_range;
        if low == 0 || low > high {
            return Err(SearchError::InvalidIndexConfig(format!(
                "invalid ngram range ({low}, {high})"
            )));
        }
        if self.max_features == 0 {
            return Err(SearchError::InvalidIndexConfig(
                "max_features must be positive".to_string(),
            ));
        }
        if !(self.max_df > 0.0 && self.max_df <= 1.0) {
            return Err(SearchError::InvalidIndexConfig(format!(
                "max_df must be in (0, 1], got {}",
                self.max_df
            )));
        }
        Ok(())
    }
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self::catalog()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDocument {
    pub id: usize,
    pub score: f64,
}

/// Sparse weight vector keyed by vocabulary term id, sorted by term id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    entries: Vec<(usize, f64)>,
}

impl TermVector {
    fn from_counts(counts: HashMap<usize, usize>, idf: &[f64], sublinear_tf: bool) -> Self {
        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(term, count)| {
                let tf = if sublinear_tf {
                    1.0 + (count as f64).ln()
                } else {
                    count as f64
                };
                (term, tf * idf[term])
            })
            .collect();
        entries.sort_unstable_by_key(|(term, _)| *term);

        let norm = entries.iter().map(|(_, weight)| weight * weight).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, weight) in &mut entries {
                *weight /= norm;
            }
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn weight(&self, term: usize) -> Option<f64> {
        self.entries
            .binary_search_by_key(&term, |(id, _)| *id)
            .ok()
            .map(|position| self.entries[position].1)
    }

    /// Cosine similarity of two unit vectors, clamped to `[0, 1]`.
    pub fn cosine(&self, other: &TermVector) -> f64 {
        let (mut left, mut right) = (0, 0);
        let mut dot = 0.0;
        while left < self.entries.len() && right < other.entries.len() {
            let (left_term, left_weight) = self.entries[left];
            let (right_term, right_weight) = other.entries[right];
            match left_term.cmp(&right_term) {
                Ordering::Less => left += 1,
                Ordering::Greater => right += 1,
                Ordering::Equal => {
                    dot += left_weight * right_weight;
                    left += 1;
                    right += 1;
                }
            }
        }
        dot.clamp(0.0, 1.0)
    }
}

/// Word tokens of two or more characters with stopwords removed, expanded
/// into n-grams.
pub fn analyze(text: &str, ngram_range: (usize, usize)) -> Vec<String> {
    let words: Vec<&str> = text
        .split(|character: char| !(character.is_alphanumeric() || character == '_'))
        .filter(|word| word.chars().count() >= 2)
        .filter(|word| !is_stopword(word))
        .collect();

    let (low, high) = ngram_range;
    let mut grams = Vec::new();
    for size in low..=high {
        if size > words.len() {
            break;
        }
        grams.extend(words.windows(size).map(|window| window.join(" ")));
    }
    grams
}

pub fn catalog_text(document: &Document, normalizer: &TextNormalizer) -> String {
    [
        normalizer.clean(&document.name),
        normalizer.clean_optional(document.composition.as_deref()),
        normalizer.clean_optional(document.marketed_by.as_deref()),
        normalizer.clean_optional(document.packaging_type.as_deref()),
    ]
    .join(" ")
}

#[derive(Debug, Clone)]
pub struct TfidfIndex {
    config: TfidfConfig,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    documents: Vec<TermVector>,
}

impl TfidfIndex {
    pub fn build(
        corpus: &Corpus,
        normalizer: &TextNormalizer,
        config: TfidfConfig,
    ) -> Result<Self, SearchError> {
        let texts: Vec<String> = corpus
            .documents()
            .iter()
            .map(|document| catalog_text(document, normalizer))
            .collect();
        Self::fit(&texts, config)
    }

    pub fn fit<S: AsRef<str>>(texts: &[S], config: TfidfConfig) -> Result<Self, SearchError> {
        config.validate()?;

        let analyzed: Vec<HashMap<String, usize>> = texts
            .iter()
            .map(|text| {
                let mut counts = HashMap::new();
                for gram in analyze(text.as_ref(), config.ngram_range) {
                    *counts.entry(gram).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        let mut corpus_frequency: HashMap<&str, usize> = HashMap::new();
        for counts in &analyzed {
            for (term, count) in counts {
                *document_frequency.entry(term.as_str()).or_insert(0) += 1;
                *corpus_frequency.entry(term.as_str()).or_insert(0) += count;
            }
        }

        if document_frequency.is_empty() {
            return Err(SearchError::EmptyVocabulary(
                "documents contain only stop words".to_string(),
            ));
        }

        let document_count = texts.len();
        if document_count >= config.prune_min_documents {
            let max_count = config.max_df * document_count as f64;
            if max_count < config.min_df as f64 {
                return Err(SearchError::InvalidIndexConfig(format!(
                    "max_df {} keeps fewer documents than min_df {}",
                    config.max_df, config.min_df
                )));
            }
            document_frequency
                .retain(|_, frequency| *frequency >= config.min_df && (*frequency as f64) <= max_count);
            if document_frequency.is_empty() {
                return Err(SearchError::EmptyVocabulary(
                    "no terms remain after document-frequency pruning".to_string(),
                ));
            }
        }

        let mut ranked: Vec<&str> = document_frequency.keys().copied().collect();
        ranked.sort_unstable_by(|left, right| {
            corpus_frequency[right]
                .cmp(&corpus_frequency[left])
                .then_with(|| left.cmp(right))
        });
        ranked.truncate(config.max_features);
        ranked.sort_unstable();

        let vocabulary: HashMap<String, usize> = ranked
            .iter()
            .enumerate()
            .map(|(id, term)| ((*term).to_string(), id))
            .collect();

        let idf: Vec<f64> = ranked
            .iter()
            .map(|term| {
                let frequency = document_frequency[term] as f64;
                ((1.0 + document_count as f64) / (1.0 + frequency)).ln() + 1.0
            })
            .collect();

        let documents = analyzed
            .into_iter()
            .map(|counts| {
                let known = counts
                    .into_iter()
                    .filter_map(|(term, count)| vocabulary.get(&term).map(|id| (*id, count)))
                    .collect();
                TermVector::from_counts(known, &idf, config.sublinear_tf)
            })
            .collect();

        Ok(Self {
            config,
            vocabulary,
            idf,
            documents,
        })
    }

    pub fn transform(&self, text: &str) -> TermVector {
        let mut counts = HashMap::new();
        for gram in analyze(text, self.config.ngram_range) {
            if let Some(id) = self.vocabulary.get(&gram) {
                *counts.entry(*id).or_insert(0) += 1;
            }
        }
        TermVector::from_counts(counts, &self.idf, self.config.sublinear_tf)
    }

    pub fn rank(&self, query: &TermVector, top_k: usize, min_score: f64) -> Vec<ScoredDocument> {
        if query.is_empty() || top_k == 0 {
            return Vec::new();
        }
        let scores = self
            .documents
            .iter()
            .enumerate()
            .map(|(id, vector)| ScoredDocument {
                id,
                score: query.cosine(vector),
            });
        top_scores(scores, top_k, min_score)
    }

    pub fn term_id(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }
}

fn top_scores(
    scores: impl Iterator<Item = ScoredDocument>,
    top_k: usize,
    min_score: f64,
) -> Vec<ScoredDocument> {
    let mut kept: Vec<ScoredDocument> = scores.filter(|scored| scored.score > min_score).collect();
    kept.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then_with(|| left.id.cmp(&right.id))
    });
    kept.truncate(top_k);
    kept
}

impl VectorIndex for TfidfIndex {
    fn feature_count(&self) -> usize {
        self.vocabulary.len()
    }

    fn search(
        &self,
        cleaned_query: &str,
        top_k: usize,
        min_score: f64,
    ) -> Result<Vec<ScoredDocument>, SearchError> {
        Ok(self.rank(&self.transform(cleaned_query), top_k, min_score))
    }

    fn similar_to(
        &self,
        document_id: usize,
        top_k: usize,
        min_score: f64,
    ) -> Result<Vec<ScoredDocument>, SearchError> {
        let target = self
            .documents
            .get(document_id)
            .ok_or(SearchError::UnknownDocument(document_id))?;

        let scores = self
            .documents
            .iter()
            .enumerate()
            .filter(|(id, _)| *id != document_id)
            .map(|(id, vector)| ScoredDocument {
                id,
                score: target.cosine(vector),
            });
        Ok(top_scores(scores, top_k, min_score))
    }
}
