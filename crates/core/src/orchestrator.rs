use crate::cache::{CacheKey, ResultCache};
use crate::catalog::Corpus;
use crate::duplicates::{DuplicateGrouper, DuplicateGroups};
use crate::models::{
    confidence_from_score, Document, DuplicateSummary, EngineConfig, Health, MemberSummary,
    Recommendation, SearchAnalytics, SearchFilters, SearchHit, SearchType, SortBy,
};
use crate::symptoms::{SymptomTagIndex, SymptomTaxonomy};
use crate::text::TextNormalizer;
use crate::traits::{SymptomMatcher, VectorIndex};
use crate::vectorizer::{ScoredDocument, TfidfIndex};
use crate::SearchError;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

pub const KNOWN_BRANDS: [&str; 6] = ["crocin", "dolo", "combiflam", "augmentin", "azee", "pantocid"];

const SYMPTOM_BOOST: u8 = 20;
const COMBINED_BOOST: f64 = 1.2;
const NAME_MATCH_FACTOR: f64 = 1.5;
const COMPOSITION_WORD_FACTOR: f64 = 1.2;
const BRAND_FACTOR: f64 = 1.3;
const MAX_MULTIPLIER: f64 = 1.8;

/// Answers catalogue queries over indexes built once from a [`Corpus`].
///
/// All index state is read-only after construction; the result cache is the
/// only state touched per query, so an engine can be shared by reference
/// across threads.
pub struct SearchEngine<V = TfidfIndex, S = SymptomTagIndex>
where
    V: VectorIndex,
    S: SymptomMatcher,
{
    corpus: Corpus,
    normalizer: TextNormalizer,
    vector: Option<V>,
    symptoms: S,
    duplicates: DuplicateGroups,
    cache: ResultCache,
    config: EngineConfig,
    built_at: DateTime<Utc>,
}

impl SearchEngine {
    /// Builds every index over `corpus`. A failed index build is logged and
    /// leaves that search path returning nothing.
    pub fn build(corpus: Corpus, config: EngineConfig) -> Result<Self, SearchError> {
        let normalizer = TextNormalizer::new()?;

        let vector = match TfidfIndex::build(&corpus, &normalizer, config.vector) {
            Ok(index) => Some(index),
            Err(error) => {
                warn!(%error, "vector index build failed, free-text search disabled");
                None
            }
        };

        let taxonomy = SymptomTaxonomy::default();
        let symptoms = match SymptomTagIndex::build(&corpus, taxonomy.clone(), config.symptom) {
            Ok(index) => index,
            Err(error) => {
                warn!(%error, "symptom index build failed, symptom search disabled");
                SymptomTagIndex::unbuilt(taxonomy)
            }
        };

        Self::with_indexes(corpus, normalizer, vector, symptoms, config)
    }
}

impl<V, S> SearchEngine<V, S>
where
    V: VectorIndex,
    S: SymptomMatcher,
{
    pub fn with_indexes(
        corpus: Corpus,
        normalizer: TextNormalizer,
        vector: Option<V>,
        symptoms: S,
        config: EngineConfig,
    ) -> Result<Self, SearchError> {
        let duplicates = if config.detect_duplicates {
            DuplicateGrouper::new(config.duplicate_strategy_threshold)?.build(&corpus)
        } else {
            info!("duplicate detection skipped");
            DuplicateGroups::default()
        };

        let engine = Self {
            cache: ResultCache::new(config.cache_capacity),
            corpus,
            normalizer,
            vector,
            symptoms,
            duplicates,
            config,
            built_at: Utc::now(),
        };

        info!(
            documents = engine.corpus.len(),
            tfidf_features = engine.feature_count(),
            symptom_mappings = engine.symptoms.mapping_count(),
            duplicate_groups = engine.duplicates.len(),
            "search engine ready"
        );
        Ok(engine)
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn search(&self, query: &str, filters: &SearchFilters) -> Vec<SearchHit> {
        match self.try_search(query, filters) {
            Ok(hits) => hits,
            Err(error) => {
                warn!(%error, query, "search failed, returning no results");
                Vec::new()
            }
        }
    }

    pub fn try_search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let key = CacheKey::new(self.normalizer.normalize_query(query), filters.clone());
        let (hits, status) = self
            .cache
            .get_or_compute(key, || self.rank(query, filters))?;
        debug!(query, ?status, results = hits.len(), "search answered");
        Ok(hits.as_ref().clone())
    }

    pub fn recommendations(&self, document_id: usize) -> Vec<Recommendation> {
        match self.try_recommendations(document_id) {
            Ok(recommendations) => recommendations,
            Err(error) => {
                warn!(%error, document_id, "recommendations failed, returning none");
                Vec::new()
            }
        }
    }

    pub fn try_recommendations(
        &self,
        document_id: usize,
    ) -> Result<Vec<Recommendation>, SearchError> {
        if self.corpus.get(document_id).is_none() {
            return Err(SearchError::UnknownDocument(document_id));
        }

        let similar = self.vector_index()?.similar_to(
            document_id,
            self.config.recommendation_limit,
            self.config.recommendation_min_score,
        )?;

        Ok(similar
            .into_iter()
            .filter(|scored| scored.id != document_id)
            .filter_map(|scored| {
                self.corpus
                    .get(scored.id)
                    .map(|document| Recommendation::new(document, confidence_from_score(scored.score)))
            })
            .collect())
    }

    pub fn analytics(&self) -> SearchAnalytics {
        SearchAnalytics {
            total_medicines: self.corpus.len(),
            duplicate_groups: self.duplicates.len(),
            cached_queries: self.cache.len(),
            symptom_mappings: self.symptoms.mapping_count(),
            tfidf_features: self.feature_count(),
            built_at: self.built_at,
            catalog: self.corpus.summary(),
        }
    }

    /// Largest duplicate groups first, ties by representative id.
    pub fn duplicates(&self, limit: usize) -> Vec<DuplicateSummary> {
        let mut groups: Vec<_> = self.duplicates.groups().iter().collect();
        groups.sort_by(|left, right| {
            right
                .members
                .len()
                .cmp(&left.members.len())
                .then_with(|| left.representative.cmp(&right.representative))
        });

        groups
            .into_iter()
            .take(limit)
            .filter_map(|group| {
                let representative = self.corpus.get(group.representative).map(member_summary)?;
                let members: Vec<MemberSummary> = group
                    .members
                    .iter()
                    .filter_map(|id| self.corpus.get(*id).map(member_summary))
                    .collect();
                Some(DuplicateSummary {
                    representative,
                    member_count: members.len(),
                    members,
                })
            })
            .collect()
    }

    pub fn suggestions(&self, fragment: &str) -> Vec<String> {
        let fragment = fragment.trim().to_lowercase();
        if fragment.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        self.corpus
            .documents()
            .iter()
            .filter(|document| document.name.to_lowercase().contains(&fragment))
            .filter(|document| seen.insert(document.name.as_str()))
            .take(self.config.suggestion_limit)
            .map(|document| document.name.clone())
            .collect()
    }

    pub fn health(&self) -> Health {
        let mut features = Vec::new();
        if self.vector.is_some() {
            features.push("tfidf_search".to_string());
        }
        if self.symptoms.is_built() {
            features.push("symptom_search".to_string());
        }
        if self.config.detect_duplicates {
            features.push("duplicate_detection".to_string());
        }
        if self.cache.is_enabled() {
            features.push("result_cache".to_string());
        }
        features.push("recommendations".to_string());
        features.push("suggestions".to_string());

        Health {
            success: true,
            medicines_loaded: self.corpus.len(),
            features,
        }
    }

    fn feature_count(&self) -> usize {
        self.vector.as_ref().map_or(0, VectorIndex::feature_count)
    }

    fn vector_index(&self) -> Result<&V, SearchError> {
        self.vector
            .as_ref()
            .ok_or_else(|| SearchError::NotReady("vector index".to_string()))
    }

    fn rank(&self, query: &str, filters: &SearchFilters) -> Result<Vec<SearchHit>, SearchError> {
        let symptom_hits = self
            .symptoms
            .search(
                query,
                self.config.candidate_pool / 2,
                self.config.symptom_min_score,
            )
            .unwrap_or_else(|error| {
                warn!(%error, "symptom search failed, continuing without it");
                Vec::new()
            });

        let cleaned = self.normalizer.clean(query);
        let vector_hits = if cleaned.is_empty() {
            Vec::new()
        } else {
            self.vector_index()
                .and_then(|index| {
                    index.search(
                        &cleaned,
                        self.config.candidate_pool,
                        self.config.tfidf_min_score,
                    )
                })
                .unwrap_or_else(|error| {
                    warn!(%error, "vector search failed, continuing without it");
                    Vec::new()
                })
        };

        debug!(
            symptom_candidates = symptom_hits.len(),
            vector_candidates = vector_hits.len(),
            "candidates retrieved"
        );

        let mut candidates = fuse(&symptom_hits, &vector_hits);
        for candidate in &mut candidates {
            if let Some(document) = self.corpus.get(candidate.id) {
                let boosted = f64::from(candidate.confidence) * rerank_multiplier(query, document);
                candidate.confidence = boosted.round().min(100.0) as u8;
            }
        }
        candidates.sort_by(|left, right| right.confidence.cmp(&left.confidence));

        let mut hits: Vec<SearchHit> = self
            .collapse_duplicates(candidates)
            .into_iter()
            .filter_map(|candidate| {
                self.corpus
                    .get(candidate.id)
                    .map(|document| SearchHit::new(document, candidate.confidence, candidate.search_type))
            })
            .filter(|hit| matches_filters(&hit.document, filters))
            .collect();

        sort_hits(&mut hits, filters.sort_by);
        hits.truncate(self.config.result_limit);
        Ok(hits)
    }

    /// Keeps the first result of each duplicate group, moved onto the
    /// group's representative.
    fn collapse_duplicates(&self, ranked: Vec<Candidate>) -> Vec<Candidate> {
        let mut emitted = HashSet::new();
        ranked
            .into_iter()
            .filter_map(|candidate| match self.duplicates.representative_of(candidate.id) {
                None => Some(candidate),
                Some(representative) if emitted.insert(representative) => Some(Candidate {
                    id: representative,
                    ..candidate
                }),
                Some(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    id: usize,
    confidence: u8,
    search_type: SearchType,
}

fn fuse(symptom_hits: &[ScoredDocument], vector_hits: &[ScoredDocument]) -> Vec<Candidate> {
    let mut merged: Vec<Candidate> = symptom_hits
        .iter()
        .map(|hit| Candidate {
            id: hit.id,
            confidence: confidence_from_score(hit.score)
                .saturating_add(SYMPTOM_BOOST)
                .min(100),
            search_type: SearchType::Symptom,
        })
        .collect();
    let mut position: HashMap<usize, usize> = merged
        .iter()
        .enumerate()
        .map(|(index, candidate)| (candidate.id, index))
        .collect();

    for hit in vector_hits {
        let confidence = confidence_from_score(hit.score);
        match position.get(&hit.id) {
            Some(&index) => {
                let entry = &mut merged[index];
                let averaged = (f64::from(entry.confidence) + f64::from(confidence)) / 2.0;
                entry.confidence = (averaged * COMBINED_BOOST).trunc().min(100.0) as u8;
                entry.search_type = SearchType::Combined;
            }
            None => {
                position.insert(hit.id, merged.len());
                merged.push(Candidate {
                    id: hit.id,
                    confidence,
                    search_type: SearchType::Tfidf,
                });
            }
        }
    }

    merged
}

fn rerank_multiplier(query: &str, document: &Document) -> f64 {
    let query = query.to_lowercase();
    let name = document.name.to_lowercase();
    let composition = document.composition_text().to_lowercase();

    let mut multiplier = 1.0;
    if name.contains(&query) {
        multiplier *= NAME_MATCH_FACTOR;
    }
    for word in query.split_whitespace() {
        if word.chars().count() > 3 && composition.contains(word) {
            multiplier *= COMPOSITION_WORD_FACTOR;
        }
    }
    for brand in KNOWN_BRANDS {
        if query.contains(brand) && name.contains(brand) {
            multiplier *= BRAND_FACTOR;
        }
    }
    f64::min(multiplier, MAX_MULTIPLIER)
}

fn matches_filters(document: &Document, filters: &SearchFilters) -> bool {
    let packaging_ok = filters
        .packaging()
        .map_or(true, |wanted| document.packaging_type.as_deref() == Some(wanted));
    let manufacturer_ok = filters
        .manufacturer()
        .map_or(true, |wanted| document.marketed_by.as_deref() == Some(wanted));
    packaging_ok && manufacturer_ok
}

fn sort_hits(hits: &mut [SearchHit], sort_by: SortBy) {
    match sort_by {
        SortBy::Relevance => {}
        SortBy::Name => hits.sort_by(|left, right| left.document.name.cmp(&right.document.name)),
        SortBy::Manufacturer => hits.sort_by(|left, right| {
            left.document
                .marketed_by_text()
                .cmp(right.document.marketed_by_text())
        }),
        SortBy::Packaging => hits.sort_by(|left, right| {
            left.document
                .packaging_text()
                .cmp(right.document.packaging_text())
        }),
        SortBy::Confidence => hits.sort_by(|left, right| right.confidence.cmp(&left.confidence)),
    }
}

fn member_summary(document: &Document) -> MemberSummary {
    MemberSummary {
        id: document.id,
        medicine_name: document.name.clone(),
        salt_composition: document.composition.clone(),
        marketed_by: document.marketed_by.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingIndex {
        inner: TfidfIndex,
        calls: Arc<AtomicUsize>,
    }

    impl VectorIndex for CountingIndex {
        fn feature_count(&self) -> usize {
            self.inner.feature_count()
        }

        fn search(
            &self,
            cleaned_query: &str,
            top_k: usize,
            min_score: f64,
        ) -> Result<Vec<ScoredDocument>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.search(cleaned_query, top_k, min_score)
        }

        fn similar_to(
            &self,
            document_id: usize,
            top_k: usize,
            min_score: f64,
        ) -> Result<Vec<ScoredDocument>, SearchError> {
            self.inner.similar_to(document_id, top_k, min_score)
        }
    }

    struct FailingIndex;

    impl VectorIndex for FailingIndex {
        fn feature_count(&self) -> usize {
            0
        }

        fn search(&self, _: &str, _: usize, _: f64) -> Result<Vec<ScoredDocument>, SearchError> {
            Err(SearchError::EmptyVocabulary("transform failed".to_string()))
        }

        fn similar_to(&self, _: usize, _: usize, _: f64) -> Result<Vec<ScoredDocument>, SearchError> {
            Err(SearchError::EmptyVocabulary("transform failed".to_string()))
        }
    }

    fn without_duplicates() -> EngineConfig {
        EngineConfig {
            detect_duplicates: false,
            ..EngineConfig::default()
        }
    }

    fn sample_engine(config: EngineConfig) -> SearchEngine {
        SearchEngine::build(Corpus::sample(), config).expect("sample engine builds")
    }

    fn engine_with<V: VectorIndex>(vector: Option<V>, config: EngineConfig) -> SearchEngine<V> {
        let corpus = Corpus::sample();
        let normalizer = TextNormalizer::new().expect("normalizer builds");
        let symptoms = SymptomTagIndex::build(&corpus, SymptomTaxonomy::default(), config.symptom)
            .expect("symptom index builds");
        SearchEngine::with_indexes(corpus, normalizer, vector, symptoms, config)
            .expect("engine builds")
    }

    fn counting_engine(config: EngineConfig) -> (SearchEngine<CountingIndex>, Arc<AtomicUsize>) {
        let corpus = Corpus::sample();
        let normalizer = TextNormalizer::new().expect("normalizer builds");
        let inner = TfidfIndex::build(&corpus, &normalizer, config.vector).expect("index builds");
        let calls = Arc::new(AtomicUsize::new(0));
        let index = CountingIndex {
            inner,
            calls: Arc::clone(&calls),
        };
        (engine_with(Some(index), config), calls)
    }

    fn names(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|hit| hit.document.name.as_str()).collect()
    }

    #[test]
    fn blank_queries_return_nothing() {
        let engine = sample_engine(EngineConfig::default());
        assert!(engine.search("", &SearchFilters::default()).is_empty());
        assert!(engine.search("   \t ", &SearchFilters::default()).is_empty());
        assert_eq!(engine.analytics().cached_queries, 0);
    }

    #[test]
    fn symptom_query_returns_every_mapped_document() {
        let engine = sample_engine(without_duplicates());
        let hits = engine.search("headache", &SearchFilters::default());

        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|hit| hit.search_type == SearchType::Symptom));
        assert_eq!(
            names(&hits),
            vec![
                "Paracetamol 500mg Tablet 10 tablets",
                "Crocin 650mg Tablet 15 tablets",
                "Aceper Tablet 10 tablets"
            ]
        );
        assert!(hits[0].confidence >= hits[2].confidence);
        assert!(hits[1].confidence >= hits[2].confidence);
    }

    #[test]
    fn ingredient_query_matches_only_its_document() {
        let engine = sample_engine(without_duplicates());
        let hits = engine.search("phenylpropanolamine", &SearchFilters::default());

        assert_eq!(names(&hits), vec!["Aceper Tablet 10 tablets"]);
        assert_eq!(hits[0].search_type, SearchType::Tfidf);
        assert_eq!(hits[0].ingredients_count, 3);
        assert_eq!(hits[0].dosage, None);
    }

    #[test]
    fn derived_fields_are_reported() {
        let engine = sample_engine(without_duplicates());
        let hits = engine.search("headache", &SearchFilters::default());

        for hit in &hits {
            let expected = if hit.document.name.starts_with("Aceper") { 3 } else { 1 };
            assert_eq!(hit.ingredients_count, expected);
        }
        assert_eq!(hits[0].dosage.as_deref(), Some("500mg"));
    }

    #[test]
    fn manufacturer_filter_keeps_exact_matches() {
        let engine = sample_engine(without_duplicates());
        let filters = SearchFilters {
            manufacturer: Some("GSK Pharmaceuticals".to_string()),
            ..SearchFilters::default()
        };
        let hits = engine.search("paracetamol", &filters);

        assert!(!hits.is_empty());
        assert!(hits
            .iter()
            .all(|hit| hit.document.marketed_by.as_deref() == Some("GSK Pharmaceuticals")));
    }

    #[test]
    fn packaging_filter_and_name_sort() {
        let engine = sample_engine(without_duplicates());
        let filters = SearchFilters {
            packaging_type: Some("strip or blister pack".to_string()),
            sort_by: SortBy::Name,
            ..SearchFilters::default()
        };
        let hits = engine.search("headache", &filters);
        assert_eq!(
            names(&hits),
            vec![
                "Aceper Tablet 10 tablets",
                "Crocin 650mg Tablet 15 tablets",
                "Paracetamol 500mg Tablet 10 tablets"
            ]
        );

        let bottles = SearchFilters {
            packaging_type: Some("bottle".to_string()),
            ..SearchFilters::default()
        };
        assert!(engine.search("headache", &bottles).is_empty());
    }

    #[test]
    fn manufacturer_packaging_and_confidence_sorts() {
        let engine = sample_engine(without_duplicates());
        let sorted = |sort_by| {
            let filters = SearchFilters {
                sort_by,
                ..SearchFilters::default()
            };
            engine.search("headache", &filters)
        };

        let by_manufacturer = sorted(SortBy::Manufacturer);
        let manufacturers: Vec<&str> = by_manufacturer
            .iter()
            .map(|hit| hit.document.marketed_by_text())
            .collect();
        assert_eq!(
            manufacturers,
            vec!["3A Pharmaceuticals", "GSK Pharmaceuticals", "Generic Pharma Ltd"]
        );

        let relevance = sorted(SortBy::Relevance);
        let by_packaging = sorted(SortBy::Packaging);
        assert_eq!(names(&by_packaging), names(&relevance));

        let by_confidence = sorted(SortBy::Confidence);
        assert_eq!(by_confidence.len(), 3);
        assert!(by_confidence
            .windows(2)
            .all(|pair| pair[0].confidence >= pair[1].confidence));
    }

    #[test]
    fn duplicates_collapse_to_their_representative() {
        let engine = sample_engine(EngineConfig::default());
        let hits = engine.search("headache", &SearchFilters::default());

        assert_eq!(
            names(&hits),
            vec!["Paracetamol 500mg Tablet 10 tablets", "Aceper Tablet 10 tablets"]
        );
        let ids: HashSet<usize> = hits.iter().map(SearchHit::id).collect();
        assert_eq!(ids.len(), hits.len());
    }

    #[test]
    fn collapsed_result_keeps_the_encountered_confidence() {
        let engine = sample_engine(EngineConfig::default());
        let hits = engine.search("crocin", &SearchFilters::default());

        assert_eq!(hits[0].document.name, "Paracetamol 500mg Tablet 10 tablets");
        assert_eq!(hits[0].search_type, SearchType::Tfidf);
        assert!(hits.iter().all(|hit| hit.document.name != "Crocin 650mg Tablet 15 tablets"));
    }

    #[test]
    fn word_order_variants_share_one_ranking_pass() {
        let (engine, calls) = counting_engine(EngineConfig::default());
        let first = engine.search("fever headache", &SearchFilters::default());
        let second = engine.search("Headache  fever", &SearchFilters::default());

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.analytics().cached_queries, 1);

        let filtered = SearchFilters {
            sort_by: SortBy::Confidence,
            ..SearchFilters::default()
        };
        engine.search("fever headache", &filtered);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn disabled_cache_ranks_every_time() {
        let (engine, calls) = counting_engine(EngineConfig {
            cache_capacity: 0,
            ..EngineConfig::default()
        });
        engine.search("paracetamol", &SearchFilters::default());
        engine.search("paracetamol", &SearchFilters::default());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_identical_queries_rank_once() {
        let (engine, calls) = counting_engine(EngineConfig::default());
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| engine.search("paracetamol", &SearchFilters::default()));
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn confidences_stay_within_bounds() {
        let engine = sample_engine(without_duplicates());
        for query in ["crocin", "paracetamol tablet", "fever headache pain", "cetirizine cold"] {
            for hit in engine.search(query, &SearchFilters::default()) {
                assert!(hit.confidence <= 100, "{query}: {}", hit.confidence);
            }
        }
    }

    #[test]
    fn failing_vector_index_degrades_to_symptom_results() {
        let engine = engine_with(Some(FailingIndex), without_duplicates());
        assert_eq!(engine.search("headache", &SearchFilters::default()).len(), 3);
        assert!(engine.search("phenylpropanolamine", &SearchFilters::default()).is_empty());
    }

    #[test]
    fn missing_vector_index_is_reported_not_fatal() {
        let engine = engine_with(None::<TfidfIndex>, without_duplicates());
        assert!(matches!(
            engine.try_recommendations(0),
            Err(SearchError::NotReady(_))
        ));
        assert!(engine.recommendations(0).is_empty());
        assert_eq!(engine.analytics().tfidf_features, 0);
        assert!(!engine.health().features.contains(&"tfidf_search".to_string()));
    }

    #[test]
    fn untagged_catalogue_omits_symptom_search() {
        let untagged = |name: &str, composition: &str| Document {
            name: name.to_string(),
            composition: Some(composition.to_string()),
            ..Document::default()
        };
        let corpus = Corpus::new(vec![
            untagged("Vitamin C Tablet", "Ascorbic Acid (500mg)"),
            untagged("Zinc Syrup", "Zinc Sulphate (20mg)"),
        ]);
        let engine =
            SearchEngine::build(corpus, without_duplicates()).expect("untagged engine builds");

        let features = engine.health().features;
        assert!(!features.contains(&"symptom_search".to_string()));
        assert!(features.contains(&"tfidf_search".to_string()));
        assert_eq!(engine.analytics().symptom_mappings, 20);
        assert!(engine.search("fever", &SearchFilters::default()).is_empty());

        let tagged = sample_engine(without_duplicates());
        assert!(tagged.health().features.contains(&"symptom_search".to_string()));
    }

    #[test]
    fn recommendations_never_include_the_source_document() {
        let engine = sample_engine(without_duplicates());
        for document in engine.corpus().documents() {
            let recommendations = engine.recommendations(document.id);
            assert!(recommendations.len() <= 5);
            assert!(recommendations
                .iter()
                .all(|recommendation| recommendation.document.id != document.id));
            assert!(recommendations
                .iter()
                .all(|recommendation| recommendation.similarity <= 100));
        }
    }

    #[test]
    fn unknown_document_has_no_recommendations() {
        let engine = sample_engine(EngineConfig::default());
        assert!(matches!(
            engine.try_recommendations(99),
            Err(SearchError::UnknownDocument(99))
        ));
        assert!(engine.recommendations(99).is_empty());
    }

    #[test]
    fn suggestions_match_anywhere_in_the_name() {
        let engine = sample_engine(EngineConfig::default());
        assert_eq!(
            engine.suggestions("CET"),
            vec!["Paracetamol 500mg Tablet 10 tablets".to_string()]
        );
        assert_eq!(engine.suggestions("tablet").len(), 3);
        assert!(engine.suggestions("  ").is_empty());
    }

    #[test]
    fn duplicates_report_members() {
        let engine = sample_engine(EngineConfig::default());
        let groups = engine.duplicates(10);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].representative.medicine_name, "Paracetamol 500mg Tablet 10 tablets");
        assert_eq!(groups[0].member_count, 2);
        assert!(engine.duplicates(0).is_empty());

        let skipped = sample_engine(without_duplicates());
        assert!(skipped.duplicates(10).is_empty());
        assert!(!skipped.health().features.contains(&"duplicate_detection".to_string()));
    }

    #[test]
    fn analytics_describe_the_engine() {
        let engine = sample_engine(EngineConfig::default());
        engine.search("fever", &SearchFilters::default());
        let analytics = engine.analytics();

        assert_eq!(analytics.total_medicines, 3);
        assert_eq!(analytics.duplicate_groups, 1);
        assert_eq!(analytics.cached_queries, 1);
        assert_eq!(analytics.symptom_mappings, 20);
        assert!(analytics.tfidf_features > 0);
        assert_eq!(analytics.catalog.unique_manufacturers, 3);

        let health = engine.health();
        assert!(health.success);
        assert_eq!(health.medicines_loaded, 3);
    }

    #[test]
    fn rerank_multiplier_is_capped() {
        let document = Document {
            name: "Crocin Advance Tablet".to_string(),
            composition: Some("Paracetamol (500mg)".to_string()),
            ..Document::default()
        };
        assert_eq!(rerank_multiplier("crocin", &document), MAX_MULTIPLIER);
        assert!((rerank_multiplier("paracetamol", &document) - 1.2).abs() < 1e-12);
        assert_eq!(rerank_multiplier("zinc", &document), 1.0);
    }

    #[test]
    fn fusion_boosts_symptoms_and_combines_overlaps() {
        let symptom = [ScoredDocument { id: 4, score: 0.5 }];
        let vector = [
            ScoredDocument { id: 4, score: 0.4 },
            ScoredDocument { id: 7, score: 0.3 },
        ];
        let fused = fuse(&symptom, &vector);

        assert_eq!(
            fused,
            vec![
                Candidate {
                    id: 4,
                    confidence: 66,
                    search_type: SearchType::Combined
                },
                Candidate {
                    id: 7,
                    confidence: 30,
                    search_type: SearchType::Tfidf
                },
            ]
        );
    }
}
