use crate::error::SearchError;
use crate::vectorizer::TfidfConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const NOT_SPECIFIED: &str = "Not specified";

/// One catalogue record. `id` is the record's position in the loaded corpus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Document {
    pub id: usize,
    #[serde(rename = "medicine_name", default)]
    pub name: String,
    #[serde(rename = "salt_composition", default)]
    pub composition: Option<String>,
    #[serde(rename = "packagingType", default)]
    pub packaging_type: Option<String>,
    #[serde(default)]
    pub pack: Option<String>,
    #[serde(default)]
    pub marketed_by: Option<String>,
    #[serde(default)]
    pub manufactured_by: Option<String>,
    #[serde(default)]
    pub gst: Option<f64>,
}

impl Document {
    pub fn composition_text(&self) -> &str {
        self.composition.as_deref().unwrap_or_default()
    }

    pub fn marketed_by_text(&self) -> &str {
        self.marketed_by.as_deref().unwrap_or_default()
    }

    pub fn packaging_text(&self) -> &str {
        self.packaging_type.as_deref().unwrap_or_default()
    }

    pub fn has_composition(&self) -> bool {
        match self.composition.as_deref().map(str::trim) {
            None | Some("") => false,
            Some(value) => !value.eq_ignore_ascii_case(NOT_SPECIFIED),
        }
    }

    /// First `<digits>mg` run in the name, e.g. `"500mg"`.
    pub fn dosage(&self) -> Option<String> {
        let mut run_start = None;
        for (index, character) in self.name.char_indices() {
            if character.is_ascii_digit() {
                run_start.get_or_insert(index);
                continue;
            }
            if let Some(start) = run_start.take() {
                if self.name[index..].starts_with("mg") {
                    return Some(format!("{}mg", &self.name[start..index]));
                }
            }
        }
        None
    }

    pub fn ingredients_count(&self) -> usize {
        match self.composition.as_deref() {
            Some(composition) if composition != NOT_SPECIFIED => {
                composition.matches('+').count() + 1
            }
            _ => 1,
        }
    }
}

pub fn confidence_from_score(score: f64) -> u8 {
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Symptom,
    Tfidf,
    Combined,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Relevance,
    Name,
    Manufacturer,
    Packaging,
    Confidence,
}

impl FromStr for SortBy {
    type Err = SearchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "" | "relevance" => Ok(Self::Relevance),
            "name" => Ok(Self::Name),
            "manufacturer" => Ok(Self::Manufacturer),
            "packaging" => Ok(Self::Packaging),
            "confidence" => Ok(Self::Confidence),
            other => Err(SearchError::InvalidRequest(format!(
                "unknown sort directive: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct SearchFilters {
    #[serde(rename = "packagingType", default)]
    pub packaging_type: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(rename = "sortBy", default)]
    pub sort_by: SortBy,
}

impl SearchFilters {
    pub fn packaging(&self) -> Option<&str> {
        self.packaging_type.as_deref().filter(|value| !value.is_empty())
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.manufacturer.as_deref().filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub filters: SearchFilters,
}

impl SearchRequest {
    pub fn from_json(raw: &str) -> Result<Self, SearchError> {
        serde_json::from_str(raw).map_err(|error| SearchError::InvalidRequest(error.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    #[serde(flatten)]
    pub document: Document,
    pub confidence: u8,
    pub search_type: SearchType,
    pub dosage: Option<String>,
    pub ingredients_count: usize,
}

impl SearchHit {
    pub fn new(document: &Document, confidence: u8, search_type: SearchType) -> Self {
        Self {
            document: document.clone(),
            confidence,
            search_type,
            dosage: document.dosage(),
            ingredients_count: document.ingredients_count(),
        }
    }

    pub fn id(&self) -> usize {
        self.document.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    #[serde(flatten)]
    pub document: Document,
    pub similarity: u8,
    pub dosage: Option<String>,
    pub ingredients_count: usize,
}

impl Recommendation {
    pub fn new(document: &Document, similarity: u8) -> Self {
        Self {
            document: document.clone(),
            similarity,
            dosage: document.dosage(),
            ingredients_count: document.ingredients_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CatalogSummary {
    pub unique_manufacturers: usize,
    pub packaging_types: usize,
    pub top_manufacturers: Vec<(String, usize)>,
    pub packaging_distribution: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchAnalytics {
    pub total_medicines: usize,
    pub duplicate_groups: usize,
    pub cached_queries: usize,
    pub symptom_mappings: usize,
    pub tfidf_features: usize,
    pub built_at: DateTime<Utc>,
    pub catalog: CatalogSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberSummary {
    pub id: usize,
    pub medicine_name: String,
    pub salt_composition: Option<String>,
    pub marketed_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DuplicateSummary {
    pub representative: MemberSummary,
    pub member_count: usize,
    pub members: Vec<MemberSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub success: bool,
    pub medicines_loaded: usize,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub result_limit: usize,
    pub candidate_pool: usize,
    pub tfidf_min_score: f64,
    pub symptom_min_score: f64,
    pub recommendation_limit: usize,
    pub recommendation_min_score: f64,
    pub suggestion_limit: usize,
    /// Zero disables result caching.
    pub cache_capacity: usize,
    pub detect_duplicates: bool,
    pub duplicate_strategy_threshold: usize,
    pub vector: TfidfConfig,
    pub symptom: TfidfConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            result_limit: 10,
            candidate_pool: 20,
            tfidf_min_score: 0.05,
            symptom_min_score: 0.1,
            recommendation_limit: 5,
            recommendation_min_score: 0.2,
            suggestion_limit: 10,
            cache_capacity: 1_024,
            detect_duplicates: true,
            duplicate_strategy_threshold: 10_000,
            vector: TfidfConfig::catalog(),
            symptom: TfidfConfig::symptom_tags(),
        }
    }
}
