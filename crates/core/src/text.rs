use crate::error::SearchError;
use crate::traits::Lemmatizer;
use regex::Regex;
use std::sync::Arc;
use tracing::warn;

/// Dosage and form units kept even though they look like noise words.
pub const MEDICAL_TERMS: [&str; 7] = ["mg", "tablet", "capsule", "injection", "syrup", "ml", "gm"];

const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will",
    "just", "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren",
    "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn",
    "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token) && !MEDICAL_TERMS.contains(&token)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLemmatizer;

impl Lemmatizer for NoopLemmatizer {
    fn lemmatize(&self, token: &str) -> Result<String, SearchError> {
        Ok(token.to_string())
    }
}

/// Rule-based English noun lemmatizer: folds regular plurals to the singular.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnglishLemmatizer;

impl EnglishLemmatizer {
    const IRREGULAR: [(&'static str, &'static str); 6] = [
        ("children", "child"),
        ("feet", "foot"),
        ("teeth", "tooth"),
        ("men", "man"),
        ("women", "woman"),
        ("mice", "mouse"),
    ];

    const KEEP_SUFFIXES: [&'static str; 4] = ["ss", "us", "is", "ous"];

    const SINGULAR: [&'static str; 7] = [
        "diabetes", "rabies", "herpes", "measles", "mumps", "scabies", "species",
    ];
}

impl Lemmatizer for EnglishLemmatizer {
    fn lemmatize(&self, token: &str) -> Result<String, SearchError> {
        if let Some((_, lemma)) = Self::IRREGULAR.iter().find(|(plural, _)| *plural == token) {
            return Ok((*lemma).to_string());
        }

        let alphabetic = token.chars().all(|character| character.is_alphabetic());
        if !alphabetic
            || token.chars().count() <= 3
            || !token.ends_with('s')
            || Self::SINGULAR.contains(&token)
            || Self::KEEP_SUFFIXES.iter().any(|suffix| token.ends_with(suffix))
        {
            return Ok(token.to_string());
        }

        let lemma = if let Some(stem) = token.strip_suffix("ies") {
            format!("{stem}y")
        } else if ["ches", "shes", "xes", "zes", "sses"]
            .iter()
            .any(|suffix| token.ends_with(suffix))
        {
            token[..token.len() - 2].to_string()
        } else {
            token[..token.len() - 1].to_string()
        };

        Ok(lemma)
    }
}

#[derive(Clone)]
pub struct TextNormalizer {
    disallowed: Regex,
    token: Regex,
    connectives: Regex,
    lemmatizer: Arc<dyn Lemmatizer>,
}

impl TextNormalizer {
    pub fn new() -> Result<Self, SearchError> {
        Self::with_lemmatizer(Arc::new(EnglishLemmatizer))
    }

    pub fn with_lemmatizer(lemmatizer: Arc<dyn Lemmatizer>) -> Result<Self, SearchError> {
        Ok(Self {
            disallowed: Regex::new(r"[^\w\s+\-()]")?,
            token: Regex::new(r"\w+(?:-\w+)*|[+()\-]")?,
            connectives: Regex::new(r"\b(?:medicine|tablet|capsule|for|the|a|an)\b")?,
            lemmatizer,
        })
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let stripped = self.disallowed.replace_all(&lowered, " ");
        self.token
            .find_iter(&stripped)
            .map(|found| found.as_str().to_string())
            .collect()
    }

    pub fn clean(&self, text: &str) -> String {
        let tokens: Vec<String> = self
            .tokenize(text)
            .into_iter()
            .filter(|token| !is_stopword(token))
            .collect();

        let lemmas = tokens
            .iter()
            .map(|token| self.lemmatizer.lemmatize(token))
            .collect::<Result<Vec<_>, _>>();

        match lemmas {
            Ok(lemmas) => lemmas.join(" "),
            Err(error) => {
                warn!(%error, "lemmatization failed, keeping raw tokens");
                tokens.join(" ")
            }
        }
    }

    pub fn clean_optional(&self, text: Option<&str>) -> String {
        text.map(|value| self.clean(value)).unwrap_or_default()
    }

    /// Cache-key form of a query: connective words removed, remaining words
    /// sorted so word-order variants collapse to one key.
    pub fn normalize_query(&self, query: &str) -> String {
        let lowered = query.trim().to_lowercase();
        let stripped = self.connectives.replace_all(&lowered, " ");
        let mut words: Vec<&str> = stripped.split_whitespace().collect();
        words.sort_unstable();
        words.join(" ")
    }
}

impl std::fmt::Debug for TextNormalizer {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("TextNormalizer").finish_non_exhaustive()
    }
}
