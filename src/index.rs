use std::collections::HashMap;

use crate::error::EngineError;

/// English stop-words excluded from the vocabulary.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "cannot", "could", "did", "do", "does", "doing", "down", "during", "each",
    "else", "ever", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her",
    "here", "hers", "herself", "him", "himself", "his", "how", "however", "i", "if", "in", "into",
    "is", "it", "its", "itself", "just", "like", "me", "more", "most", "my", "myself", "no", "nor",
    "not", "now", "of", "off", "on", "once", "only", "or", "other", "ought", "our", "ours",
    "ourselves", "out", "over", "own", "same", "she", "should", "so", "some", "such", "than",
    "that", "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they",
    "this", "those", "through", "to", "too", "under", "until", "up", "upon", "very", "was", "we",
    "were", "what", "when", "where", "whether", "which", "while", "who", "whom", "whose", "why",
    "will", "with", "would", "you", "your", "yours", "yourself", "yourselves",
];

/// Term-weighted vector space over a chunk corpus.
///
/// TF-IDF weighting with smoothed IDF and L2-normalized rows, so cosine
/// similarity reduces to a dot product. Built wholesale; never mutated.
/// Section-scoped queries build a fresh, smaller index over the filtered
/// subset instead of touching this one, which keeps concurrent queries
/// safe without locking.
#[derive(Debug)]
pub struct TfidfIndex {
    /// Term to column, columns assigned in alphabetical term order.
    term_columns: HashMap<String, usize>,
    /// Smoothed inverse document frequency per column.
    idf: Vec<f32>,
    /// One L2-normalized weight row per document.
    rows: Vec<Vec<f32>>,
}

impl TfidfIndex {
    /// Build an index over the given document texts.
    ///
    /// The vocabulary is capped at `max_features` terms; when the cap is
    /// exceeded, the least frequent terms are dropped first, ties broken
    /// alphabetically so identical input always builds an identical index.
    pub fn build(texts: &[&str], max_features: usize) -> Result<Self, EngineError> {
        if texts.is_empty() {
            return Err(EngineError::EmptyCorpus);
        }

        let docs: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t)).collect();

        // Corpus-wide term frequency, for the vocabulary cap
        let mut totals: HashMap<&str, usize> = HashMap::new();
        for doc in &docs {
            for term in doc {
                *totals.entry(term).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = totals.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(max_features);

        let mut vocabulary: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        vocabulary.sort_unstable();

        let term_columns: HashMap<String, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(col, term)| (term.to_string(), col))
            .collect();

        // Document frequency per column
        let mut df = vec![0usize; vocabulary.len()];
        for doc in &docs {
            let mut seen = vec![false; vocabulary.len()];
            for term in doc {
                if let Some(&col) = term_columns.get(term.as_str()) {
                    if !seen[col] {
                        seen[col] = true;
                        df[col] += 1;
                    }
                }
            }
        }

        let n_docs = docs.len() as f32;
        let idf: Vec<f32> = df
            .iter()
            .map(|&df| ((1.0 + n_docs) / (1.0 + df as f32)).ln() + 1.0)
            .collect();

        let rows: Vec<Vec<f32>> = docs
            .iter()
            .map(|doc| weigh(doc, &term_columns, &idf))
            .collect();

        Ok(TfidfIndex {
            term_columns,
            idf,
            rows,
        })
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cosine similarity of the query against every indexed document, in
    /// row order. A query with no known terms scores zero everywhere.
    pub fn score(&self, query: &str) -> Vec<f32> {
        let query_vec = weigh(&tokenize(query), &self.term_columns, &self.idf);
        self.rows
            .iter()
            .map(|row| row.iter().zip(&query_vec).map(|(a, b)| a * b).sum())
            .collect()
    }
}

/// Lowercase alphanumeric tokens of length >= 2, stop-words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .filter(|token| !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// TF-IDF weight vector for one token list, L2-normalized.
fn weigh(tokens: &[String], term_columns: &HashMap<String, usize>, idf: &[f32]) -> Vec<f32> {
    let mut vector = vec![0.0f32; idf.len()];
    for token in tokens {
        if let Some(&col) = term_columns.get(token.as_str()) {
            vector[col] += 1.0;
        }
    }
    for (col, weight) in vector.iter_mut().enumerate() {
        *weight *= idf[col];
    }

    let norm: f32 = vector.iter().map(|w| w * w).sum::<f32>().sqrt();
    if norm > 0.0 {
        for weight in &mut vector {
            *weight /= norm;
        }
    }
    vector
}
