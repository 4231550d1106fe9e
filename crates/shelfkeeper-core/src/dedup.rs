use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DuplicateConfig;
use crate::models::BookRecord;
use crate::normalize::{isbn_match_key, normalize, normalized_isbn_of, title_similarity, tokens};

/// How strongly a pair of records looks like the same book.
///
/// Variants are declared weakest first so `Ord` ranks `Exact` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Same title with an author-token overlap, or a near-identical title.
    Possible,
    /// Same normalized title and author.
    Probable,
    /// Same non-empty normalized ISBN.
    Exact,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Possible => write!(f, "possible"),
            Self::Probable => write!(f, "probable"),
            Self::Exact => write!(f, "exact"),
        }
    }
}

/// One existing record that may duplicate the candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateMatch<'a> {
    pub record: &'a BookRecord,
    pub confidence: Confidence,
}

/// A cluster of records in the library that describe the same book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub canonical: String,
    pub duplicates: Vec<String>,
    pub confidence: Confidence,
}

#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    title_similarity_threshold: f64,
    min_fuzzy_title_len: usize,
    include_deleted: bool,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self {
            title_similarity_threshold: 0.8,
            min_fuzzy_title_len: 5,
            include_deleted: false,
        }
    }
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DuplicateConfig) -> Self {
        Self::new()
            .with_title_threshold(config.title_similarity_threshold)
            .with_min_fuzzy_title_len(config.min_fuzzy_title_len)
            .include_deleted(config.include_deleted)
    }

    pub fn with_title_threshold(mut self, threshold: f64) -> Self {
        self.title_similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Titles shorter than this (in characters) never match on similarity alone.
    pub fn with_min_fuzzy_title_len(mut self, len: usize) -> Self {
        self.min_fuzzy_title_len = len;
        self
    }

    /// Also consider soft-deleted records, e.g. to offer a restore instead of a re-add.
    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    /// Existing records that may duplicate `candidate`, strongest first.
    ///
    /// Ties keep the most recently updated record first; records with no
    /// update timestamp go last. A record never matches itself by `id`.
    pub fn find_duplicates<'a>(
        &self,
        candidate: &BookRecord,
        existing: &'a [BookRecord],
    ) -> Vec<DuplicateMatch<'a>> {
        let probe = MatchKeys::from(candidate);
        if probe.isbn.is_none() && probe.title.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<DuplicateMatch<'a>> = existing
            .iter()
            .filter(|record| record.id != candidate.id)
            .filter(|record| self.include_deleted || record.is_active())
            .filter_map(|record| {
                self.classify(&probe, &MatchKeys::from(record))
                    .map(|confidence| DuplicateMatch { record, confidence })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then_with(|| newest_first(a.record, b.record))
        });

        debug!(
            candidate = %candidate.id,
            pool = existing.len(),
            matches = matches.len(),
            "duplicate lookup finished"
        );
        matches
    }

    /// Cluster the library into groups linked by exact or probable matches.
    ///
    /// The canonical record of a group is the one with the most complete
    /// metadata, earliest in input on ties. Groups are ordered by canonical id.
    pub fn find_groups(&self, books: &[BookRecord]) -> Vec<DuplicateGroup> {
        let pool: Vec<&BookRecord> = books
            .iter()
            .filter(|record| self.include_deleted || record.is_active())
            .collect();
        let keys: Vec<MatchKeys> = pool.iter().map(|record| MatchKeys::from(*record)).collect();

        let mut dsu = DisjointSet::new(pool.len());
        let mut links: Vec<(usize, Confidence)> = Vec::new();
        for i in 0..keys.len() {
            for j in (i + 1)..keys.len() {
                if pool[i].id == pool[j].id {
                    continue;
                }
                match self.classify(&keys[i], &keys[j]) {
                    Some(confidence) if confidence >= Confidence::Probable => {
                        dsu.union(i, j);
                        links.push((i, confidence));
                    }
                    _ => {}
                }
            }
        }

        let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
        for idx in 0..pool.len() {
            let root = dsu.find(idx);
            components.entry(root).or_default().push(idx);
        }

        let mut strongest: HashMap<usize, Confidence> = HashMap::new();
        for (idx, confidence) in links {
            let root = dsu.find(idx);
            let entry = strongest.entry(root).or_insert(confidence);
            *entry = (*entry).max(confidence);
        }

        let mut groups: Vec<DuplicateGroup> = components
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(root, members)| {
                let canonical_idx = choose_canonical_index(&members, &pool);
                DuplicateGroup {
                    canonical: pool[canonical_idx].id.clone(),
                    duplicates: members
                        .iter()
                        .filter(|idx| **idx != canonical_idx)
                        .map(|idx| pool[*idx].id.clone())
                        .collect(),
                    confidence: strongest
                        .get(&root)
                        .copied()
                        .unwrap_or(Confidence::Probable),
                }
            })
            .collect();

        groups.sort_by(|a, b| a.canonical.cmp(&b.canonical));
        debug!(books = books.len(), groups = groups.len(), "duplicate scan finished");
        groups
    }

    fn classify(&self, probe: &MatchKeys, other: &MatchKeys) -> Option<Confidence> {
        if let (Some(left), Some(right)) = (&probe.isbn, &other.isbn)
            && left == right
        {
            return Some(Confidence::Exact);
        }

        if probe.title.is_empty() || other.title.is_empty() {
            return None;
        }

        let same_title = probe.title == other.title;
        if same_title && !probe.author.is_empty() && probe.author == other.author {
            return Some(Confidence::Probable);
        }
        if same_title && !probe.author_tokens.is_disjoint(&other.author_tokens) {
            return Some(Confidence::Possible);
        }
        if self.similar_titles(&probe.title, &other.title) {
            return Some(Confidence::Possible);
        }

        None
    }

    /// Identical titles always qualify; the length floor only gates near misses.
    fn similar_titles(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        if a.chars().count() < self.min_fuzzy_title_len
            || b.chars().count() < self.min_fuzzy_title_len
        {
            return false;
        }
        title_similarity(a, b) >= self.title_similarity_threshold
    }
}

/// Convenience wrapper using the default detector settings.
pub fn find_duplicates<'a>(
    candidate: &BookRecord,
    existing: &'a [BookRecord],
) -> Vec<DuplicateMatch<'a>> {
    DuplicateDetector::default().find_duplicates(candidate, existing)
}

struct MatchKeys {
    title: String,
    author: String,
    author_tokens: HashSet<String>,
    isbn: Option<String>,
}

impl From<&BookRecord> for MatchKeys {
    fn from(record: &BookRecord) -> Self {
        Self {
            title: normalize(&record.title),
            author: normalize(&record.author),
            author_tokens: tokens(&record.author).into_iter().collect(),
            isbn: normalized_isbn_of(record.isbn.as_deref()).map(|isbn| isbn_match_key(&isbn)),
        }
    }
}

fn newest_first(a: &BookRecord, b: &BookRecord) -> Ordering {
    match (a.updated_at, b.updated_at) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn choose_canonical_index(indexes: &[usize], pool: &[&BookRecord]) -> usize {
    let mut best_idx = indexes[0];
    let mut best_score = metadata_completeness_score(pool[best_idx]);

    for idx in indexes.iter().copied().skip(1) {
        let score = metadata_completeness_score(pool[idx]);
        if score > best_score {
            best_score = score;
            best_idx = idx;
        }
    }

    best_idx
}

fn metadata_completeness_score(record: &BookRecord) -> usize {
    let mut score = 0usize;

    if normalized_isbn_of(record.isbn.as_deref()).is_some() {
        score += 2;
    }
    if record.has_cover() {
        score += 2;
    }
    score += record.publisher.iter().count();
    score += record.published_date.iter().count();
    score += record.physical_format.iter().count();
    score += record.page_count.iter().count();
    score += record.series_id.iter().count();
    score += record.rating.iter().count();
    score += record.notes.iter().count();
    if !record.genres.is_empty() {
        score += 1;
    }
    if !record.reads.is_empty() {
        score += 1;
    }
    if !record.images.is_empty() {
        score += 1;
    }

    score
}

#[derive(Debug, Clone)]
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, left: usize, right: usize) {
        let left_root = self.find(left);
        let right_root = self.find(right);
        if left_root == right_root {
            return;
        }

        match self.rank[left_root].cmp(&self.rank[right_root]) {
            Ordering::Less => self.parent[left_root] = right_root,
            Ordering::Greater => self.parent[right_root] = left_root,
            Ordering::Equal => {
                self.parent[right_root] = left_root;
                self.rank[left_root] += 1;
            }
        }
    }
}
