use crate::catalog::Corpus;
use crate::error::SearchError;
use crate::models::Document;
use crate::traits::SymptomMatcher;
use crate::vectorizer::{ScoredDocument, TfidfConfig, TfidfIndex};
use tracing::info;

const STANDARD_TAXONOMY: [(&str, &[&str]); 20] = [
    ("headache", &["paracetamol", "ibuprofen", "aspirin", "diclofenac"]),
    ("fever", &["paracetamol", "ibuprofen", "aspirin", "acetaminophen"]),
    ("pain", &["paracetamol", "ibuprofen", "diclofenac", "tramadol", "ketorolac"]),
    ("cold", &["cetirizine", "phenylephrine", "pseudoephedrine", "loratadine"]),
    ("cough", &["dextromethorphan", "guaifenesin", "codeine"]),
    ("allergy", &["cetirizine", "loratadine", "fexofenadine", "diphenhydramine"]),
    ("acidity", &["pantoprazole", "omeprazole", "ranitidine", "esomeprazole"]),
    ("diabetes", &["metformin", "glimepiride", "insulin", "gliclazide"]),
    ("hypertension", &["amlodipine", "losartan", "atenolol", "ramipril"]),
    ("infection", &["amoxicillin", "azithromycin", "ceftriaxone", "ciprofloxacin"]),
    ("inflammation", &["ibuprofen", "diclofenac", "prednisolone", "dexamethasone"]),
    ("nausea", &["ondansetron", "domperidone", "metoclopramide"]),
    ("diarrhea", &["loperamide", "ofloxacin", "norfloxacin"]),
    ("constipation", &["lactulose", "bisacodyl", "docusate"]),
    ("anxiety", &["alprazolam", "lorazepam", "diazepam"]),
    ("depression", &["sertraline", "fluoxetine", "amitriptyline"]),
    ("insomnia", &["zolpidem", "melatonin", "diphenhydramine"]),
    ("asthma", &["salbutamol", "montelukast", "budesonide"]),
    ("arthritis", &["diclofenac", "ibuprofen", "methotrexate"]),
    ("migraine", &["sumatriptan", "rizatriptan", "paracetamol"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomTaxonomy {
    entries: Vec<(String, Vec<String>)>,
}

impl SymptomTaxonomy {
    pub fn new(entries: Vec<(String, Vec<String>)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(symptom, keywords)| {
                (
                    symptom.to_lowercase(),
                    keywords.into_iter().map(|keyword| keyword.to_lowercase()).collect(),
                )
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn symptoms(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(symptom, _)| symptom.as_str())
    }

    /// Symptoms whose ingredient keywords occur in the document's name or
    /// composition.
    pub fn tags_for(&self, document: &Document) -> Vec<&str> {
        let name = document.name.to_lowercase();
        let composition = document.composition_text().to_lowercase();
        self.entries
            .iter()
            .filter(|(_, keywords)| {
                keywords
                    .iter()
                    .any(|keyword| composition.contains(keyword) || name.contains(keyword))
            })
            .map(|(symptom, _)| symptom.as_str())
            .collect()
    }

    pub fn mentioned_in(&self, raw_query: &str) -> Vec<&str> {
        let lowered = raw_query.to_lowercase();
        self.symptoms()
            .filter(|symptom| lowered.contains(symptom))
            .collect()
    }
}

impl Default for SymptomTaxonomy {
    fn default() -> Self {
        Self::new(
            STANDARD_TAXONOMY
                .iter()
                .map(|(symptom, keywords)| {
                    (
                        (*symptom).to_string(),
                        keywords.iter().map(|keyword| (*keyword).to_string()).collect(),
                    )
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct SymptomTagIndex {
    taxonomy: SymptomTaxonomy,
    tags: Vec<String>,
    index: Option<TfidfIndex>,
}

impl SymptomTagIndex {
    pub fn build(
        corpus: &Corpus,
        taxonomy: SymptomTaxonomy,
        config: TfidfConfig,
    ) -> Result<Self, SearchError> {
        let tags: Vec<String> = corpus
            .documents()
            .iter()
            .map(|document| taxonomy.tags_for(document).join(" "))
            .collect();

        let tagged = tags.iter().filter(|tag| !tag.is_empty()).count();
        let index = if tagged == 0 {
            info!("no document maps to a symptom, symptom index left unbuilt");
            None
        } else {
            Some(TfidfIndex::fit(&tags, config)?)
        };

        info!(tagged, documents = corpus.len(), "symptom index built");
        Ok(Self {
            taxonomy,
            tags,
            index,
        })
    }

    /// Index that never matches, used when building fails.
    pub fn unbuilt(taxonomy: SymptomTaxonomy) -> Self {
        Self {
            taxonomy,
            tags: Vec::new(),
            index: None,
        }
    }

    pub fn tag_text(&self, document_id: usize) -> Option<&str> {
        self.tags.get(document_id).map(String::as_str)
    }
}

impl SymptomMatcher for SymptomTagIndex {
    fn mapping_count(&self) -> usize {
        self.taxonomy.len()
    }

    fn is_built(&self) -> bool {
        self.index.is_some()
    }

    fn search(
        &self,
        raw_query: &str,
        top_k: usize,
        min_score: f64,
    ) -> Result<Vec<ScoredDocument>, SearchError> {
        let Some(index) = &self.index else {
            return Ok(Vec::new());
        };

        let symptoms = self.taxonomy.mentioned_in(raw_query);
        if symptoms.is_empty() {
            return Ok(Vec::new());
        }

        let query = index.transform(&symptoms.join(" "));
        Ok(index.rank(&query, top_k, min_score))
    }
}
