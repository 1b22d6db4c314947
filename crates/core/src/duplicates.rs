use crate::catalog::Corpus;
use crate::error::SearchError;
use crate::models::Document;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

pub const NAME_SIMILARITY_THRESHOLD: f64 = 0.8;
pub const COMPOSITION_SIMILARITY_THRESHOLD: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub representative: usize,
    /// Sorted ascending; includes the representative.
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingStrategy {
    Fast,
    Comprehensive,
}

#[derive(Debug, Clone, Default)]
pub struct DuplicateGroups {
    groups: Vec<DuplicateGroup>,
    representative_of: HashMap<usize, usize>,
}

impl DuplicateGroups {
    pub fn from_groups(groups: Vec<DuplicateGroup>) -> Self {
        let representative_of = groups
            .iter()
            .flat_map(|group| {
                group
                    .members
                    .iter()
                    .map(move |member| (*member, group.representative))
            })
            .collect();
        Self {
            groups,
            representative_of,
        }
    }

    pub fn representative_of(&self, document_id: usize) -> Option<usize> {
        self.representative_of.get(&document_id).copied()
    }

    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

pub struct DuplicateGrouper {
    unit_words: Regex,
    strategy_threshold: usize,
}

impl DuplicateGrouper {
    pub fn new(strategy_threshold: usize) -> Result<Self, SearchError> {
        Ok(Self {
            unit_words: Regex::new(r"\b(?:tablet|capsule|injection|syrup|ml|mg|gm)\b")?,
            strategy_threshold,
        })
    }

    pub fn strategy_for(&self, document_count: usize) -> GroupingStrategy {
        if document_count > self.strategy_threshold {
            GroupingStrategy::Fast
        } else {
            GroupingStrategy::Comprehensive
        }
    }

    pub fn build(&self, corpus: &Corpus) -> DuplicateGroups {
        self.build_with(corpus, self.strategy_for(corpus.len()))
    }

    pub fn build_with(&self, corpus: &Corpus, strategy: GroupingStrategy) -> DuplicateGroups {
        let groups = match strategy {
            GroupingStrategy::Fast => self.fast_groups(corpus),
            GroupingStrategy::Comprehensive => self.comprehensive_groups(corpus),
        };
        info!(
            ?strategy,
            documents = corpus.len(),
            groups = groups.len(),
            "duplicate groups identified"
        );
        DuplicateGroups::from_groups(groups)
    }

    pub fn normalize_name(&self, name: &str) -> String {
        let lowered = name.to_lowercase();
        let without_units = self.unit_words.replace_all(&lowered, "");
        let stripped: String = without_units
            .chars()
            .filter(|character| !character.is_ascii_digit())
            .filter(|character| {
                character.is_alphanumeric() || *character == '_' || character.is_whitespace()
            })
            .collect();
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Sorted alphabetic runs of the composition; empty when unspecified.
    pub fn normalize_composition(&self, document: &Document) -> String {
        if !document.has_composition() {
            return String::new();
        }
        let lowered = document.composition_text().to_lowercase();
        let mut ingredients: Vec<&str> = lowered
            .split(|character: char| !(character.is_ascii_alphabetic() || character.is_whitespace()))
            .map(str::trim)
            .filter(|run| !run.is_empty())
            .collect();
        ingredients.sort_unstable();
        ingredients.join(" ")
    }

    fn fast_groups(&self, corpus: &Corpus) -> Vec<DuplicateGroup> {
        let mut components = UnionFind::new(corpus.len());
        let mut first_by_name: HashMap<String, usize> = HashMap::new();
        let mut first_by_composition: HashMap<String, usize> = HashMap::new();

        for document in corpus.documents() {
            let name_key = self.normalize_name(&document.name);
            if !name_key.is_empty() {
                let first = *first_by_name.entry(name_key).or_insert(document.id);
                components.union(first, document.id);
            }

            let composition_key = self.normalize_composition(document);
            if !composition_key.is_empty() {
                let first = *first_by_composition
                    .entry(composition_key)
                    .or_insert(document.id);
                components.union(first, document.id);
            }
        }

        let mut members_by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for id in 0..corpus.len() {
            members_by_root.entry(components.find(id)).or_default().push(id);
        }

        members_by_root
            .into_values()
            .filter(|members| members.len() > 1)
            .map(|members| make_group(corpus, members))
            .collect()
    }

    fn comprehensive_groups(&self, corpus: &Corpus) -> Vec<DuplicateGroup> {
        let names: Vec<String> = corpus
            .documents()
            .iter()
            .map(|document| self.normalize_name(&document.name))
            .collect();
        let compositions: Vec<String> = corpus
            .documents()
            .iter()
            .map(|document| self.normalize_composition(document))
            .collect();

        let mut processed = vec![false; corpus.len()];
        let mut groups = Vec::new();

        for seed in 0..corpus.len() {
            if processed[seed] {
                continue;
            }
            processed[seed] = true;

            let mut members = vec![seed];
            for candidate in seed + 1..corpus.len() {
                if processed[candidate] {
                    continue;
                }
                let duplicate = exceeds(&names[seed], &names[candidate], NAME_SIMILARITY_THRESHOLD)
                    || exceeds(
                        &compositions[seed],
                        &compositions[candidate],
                        COMPOSITION_SIMILARITY_THRESHOLD,
                    );
                if duplicate {
                    members.push(candidate);
                    processed[candidate] = true;
                }
            }

            if members.len() > 1 {
                groups.push(make_group(corpus, members));
            }
        }

        groups
    }
}

/// Representative is the longest raw name, first one on ties.
fn make_group(corpus: &Corpus, members: Vec<usize>) -> DuplicateGroup {
    let name_length = |id: usize| {
        corpus
            .get(id)
            .map(|document| document.name.chars().count())
            .unwrap_or_default()
    };
    let representative = members
        .iter()
        .copied()
        .fold(members[0], |best, id| {
            if name_length(id) > name_length(best) {
                id
            } else {
                best
            }
        });
    DuplicateGroup {
        representative,
        members,
    }
}

fn exceeds(left: &str, right: &str, threshold: f64) -> bool {
    if left.is_empty() || right.is_empty() {
        return false;
    }
    quick_ratio(left, right) > threshold && similarity_ratio(left, right) > threshold
}

/// Gestalt pattern-matching ratio `2 * M / T`, where `M` counts characters
/// in recursively found longest common blocks and `T` is the combined length.
pub fn similarity_ratio(left: &str, right: &str) -> f64 {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();
    let total = left.len() + right.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&left, &right) as f64 / total as f64
}

fn quick_ratio(left: &str, right: &str) -> f64 {
    let mut available: HashMap<char, usize> = HashMap::new();
    for character in right.chars() {
        *available.entry(character).or_insert(0) += 1;
    }
    let mut shared = 0;
    for character in left.chars() {
        if let Some(count) = available.get_mut(&character) {
            if *count > 0 {
                *count -= 1;
                shared += 1;
            }
        }
    }
    let total = left.chars().count() + right.chars().count();
    if total == 0 {
        return 1.0;
    }
    2.0 * shared as f64 / total as f64
}

fn matching_characters(left: &[char], right: &[char]) -> usize {
    let mut pending = vec![(0, left.len(), 0, right.len())];
    let mut matched = 0;
    while let Some((left_low, left_high, right_low, right_high)) = pending.pop() {
        let (left_start, right_start, size) =
            longest_match(left, right, left_low, left_high, right_low, right_high);
        if size == 0 {
            continue;
        }
        matched += size;
        pending.push((left_low, left_start, right_low, right_start));
        pending.push((left_start + size, left_high, right_start + size, right_high));
    }
    matched
}

/// Longest common block within the given ranges; earliest in `left`, then
/// earliest in `right`, on ties.
fn longest_match(
    left: &[char],
    right: &[char],
    left_low: usize,
    left_high: usize,
    right_low: usize,
    right_high: usize,
) -> (usize, usize, usize) {
    let mut best = (left_low, right_low, 0);
    let width = right_high.saturating_sub(right_low) + 1;
    let mut previous = vec![0usize; width];
    for i in left_low..left_high {
        let mut current = vec![0usize; width];
        for j in right_low..right_high {
            if left[i] == right[j] {
                let offset = j - right_low + 1;
                let length = previous[offset - 1] + 1;
                current[offset] = length;
                if length > best.2 {
                    best = (i + 1 - length, j + 1 - length, length);
                }
            }
        }
        previous = current;
    }
    best
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    /// The smaller root becomes the parent.
    fn union(&mut self, left: usize, right: usize) {
        let (left, right) = (self.find(left), self.find(right));
        if left < right {
            self.parent[right] = left;
        } else if right < left {
            self.parent[left] = right;
        }
    }
}
