use crate::error::CatalogError;
use crate::models::{CatalogSummary, Document};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const TOP_COUNTS: usize = 10;

/// Ordered, immutable set of catalogue documents. A document's id is its
/// position.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    pub fn new(records: Vec<Document>) -> Self {
        let documents = records
            .into_iter()
            .enumerate()
            .map(|(id, document)| Document { id, ..document })
            .collect();
        Self { documents }
    }

    pub fn sample() -> Self {
        let record = |name: &str, composition: &str, pack: &str, company: &str| Document {
            name: name.to_string(),
            composition: Some(composition.to_string()),
            packaging_type: Some("strip or blister pack".to_string()),
            pack: Some(pack.to_string()),
            marketed_by: Some(company.to_string()),
            manufactured_by: Some(company.to_string()),
            gst: Some(12.0),
            ..Document::default()
        };

        Self::new(vec![
            record(
                "Paracetamol 500mg Tablet 10 tablets",
                "Paracetamol (500mg)",
                "10 tablets",
                "Generic Pharma Ltd",
            ),
            record(
                "Aceper Tablet 10 tablets",
                "Paracetamol (500mg) + Phenylpropanolamine (25mg) + Cetirizine (10mg)",
                "10 tablets",
                "3A Pharmaceuticals",
            ),
            record(
                "Crocin 650mg Tablet 15 tablets",
                "Paracetamol (650mg)",
                "15 tablets",
                "GSK Pharmaceuticals",
            ),
        ])
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, id: usize) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn summary(&self) -> CatalogSummary {
        let manufacturers = value_counts(self.documents.iter().map(Document::marketed_by_text));
        let packaging = value_counts(self.documents.iter().map(Document::packaging_text));

        CatalogSummary {
            unique_manufacturers: manufacturers.len(),
            packaging_types: packaging.len(),
            top_manufacturers: manufacturers.into_iter().take(TOP_COUNTS).collect(),
            packaging_distribution: packaging.into_iter().take(TOP_COUNTS).collect(),
        }
    }
}

fn value_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values.filter(|value| !value.is_empty()) {
        *counts.entry(value).or_insert(0) += 1;
    }
    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(value, count)| (value.to_string(), count))
        .collect();
    counts.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
    counts
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(default)]
    medicine_name: Option<String>,
    #[serde(default)]
    salt_composition: Option<String>,
    #[serde(rename = "packagingType", default)]
    packaging_type: Option<String>,
    #[serde(default)]
    pack: Option<String>,
    #[serde(default)]
    marketed_by: Option<String>,
    #[serde(default)]
    gst: Option<String>,
    #[serde(default)]
    manufactured_by: Option<String>,
}

impl CatalogRow {
    fn into_document(self) -> Document {
        Document {
            id: 0,
            name: present(self.medicine_name).unwrap_or_default(),
            composition: present(self.salt_composition),
            packaging_type: present(self.packaging_type),
            pack: present(self.pack),
            marketed_by: present(self.marketed_by),
            manufactured_by: present(self.manufactured_by),
            gst: present(self.gst).and_then(|value| value.parse().ok()),
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    File(PathBuf),
    Sample,
}

pub fn read_catalog<R: Read>(reader: R) -> Result<Corpus, CatalogError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in csv_reader.deserialize::<CatalogRow>() {
        records.push(row?.into_document());
    }

    if records.is_empty() {
        return Err(CatalogError::InvalidArgument(
            "catalog has no records".to_string(),
        ));
    }

    Ok(Corpus::new(records))
}

pub fn discover_catalog_files(folder: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .map(|entry| entry.path().to_path_buf())
        .collect();

    files.sort_unstable();
    files
}

pub fn load_catalog(path: &Path) -> Result<(Corpus, PathBuf), CatalogError> {
    let file_path = if path.is_dir() {
        discover_catalog_files(path)
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(path.display().to_string()))?
    } else {
        path.to_path_buf()
    };

    let corpus = read_catalog(File::open(&file_path)?)?;
    Ok((corpus, file_path))
}

/// Tries each candidate in order and falls back to [`Corpus::sample`] when
/// none loads.
pub fn load_catalog_or_sample(candidates: &[PathBuf]) -> (Corpus, CatalogSource) {
    for candidate in candidates {
        match load_catalog(candidate) {
            Ok((corpus, path)) => {
                info!(path = %path.display(), documents = corpus.len(), "catalog loaded");
                return (corpus, CatalogSource::File(path));
            }
            Err(error) => {
                warn!(path = %candidate.display(), %error, "catalog candidate failed to load");
            }
        }
    }

    warn!("no catalog could be loaded, using built-in sample catalog");
    (Corpus::sample(), CatalogSource::Sample)
}
