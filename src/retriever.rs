use log::{debug, warn};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use crate::chunking::Chunk;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::index::TfidfIndex;

/// Returned by `context_for_query` when nothing relevant exists. Callers
/// match on this exact value to decide whether to show a not-found message.
pub const NO_RESULTS_SENTINEL: &str = "No relevant information found in the CV.";

const TRUNCATION_NOTE: &str =
    "\n\n[Note: Additional relevant information may be available in the CV]";

/// Number of candidates handed to the context assembler.
const CONTEXT_TOP_K: usize = 10;

/// A chunk paired with its relevance to a query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub similarity: f32,
}

/// Pluggable dense-retrieval backend, tried ahead of the lexical index
/// when installed.
///
/// Implementations must return one similarity in `[0, 1]` per candidate,
/// aligned with the input slice and comparable to the lexical threshold.
/// A failing backend degrades to lexical scoring; it never fails a query.
pub trait DenseBackend: Send + Sync {
    fn score(&self, query: &str, candidates: &[&Chunk]) -> anyhow::Result<Vec<f32>>;
}

/// Ranks chunks against queries and assembles bounded context strings.
///
/// The chunk corpus and its index are built once and never mutated, so a
/// shared `Retriever` serves concurrent queries without locking. Scoped
/// (section-filtered) queries build a fresh local index per call.
pub struct Retriever {
    chunks: Vec<Chunk>,
    index: TfidfIndex,
    config: EngineConfig,
    dense: Option<Box<dyn DenseBackend>>,
}

// Manual impl: the boxed backend has no Debug bound
impl fmt::Debug for Retriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retriever")
            .field("chunks", &self.chunks.len())
            .field("index", &self.index)
            .field("config", &self.config)
            .field("dense", &self.dense.is_some())
            .finish()
    }
}

impl Retriever {
    /// Index the chunk corpus. Fails with `EmptyCorpus` when there is
    /// nothing to index.
    pub fn new(chunks: Vec<Chunk>, config: EngineConfig) -> Result<Self, EngineError> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let index = TfidfIndex::build(&texts, config.max_features)?;
        debug!("Built search index with {} chunks", index.len());

        Ok(Retriever {
            chunks,
            index,
            config,
            dense: None,
        })
    }

    /// Install a dense-retrieval backend, tried ahead of lexical scoring.
    pub fn with_dense_backend(mut self, backend: Box<dyn DenseBackend>) -> Self {
        self.dense = Some(backend);
        self
    }

    /// Search for the chunks most relevant to `query`.
    ///
    /// With a `section` filter that matches at least one chunk
    /// (case-insensitively), candidates are restricted to that section and
    /// scored on a fresh scoped index so unrelated high-frequency terms
    /// elsewhere in the corpus cannot drown them out. A filter matching
    /// nothing falls back to the full corpus; stale section names from a UI
    /// are not an error.
    ///
    /// Results come back ordered by descending similarity, ties broken by
    /// ascending chunk id, with everything at or below the relevance
    /// threshold discarded. An empty result is the normal "nothing
    /// relevant" outcome.
    pub fn search(&self, query: &str, section: Option<&str>, top_k: usize) -> Vec<SearchResult> {
        let (pool, scoped) = self.candidate_pool(section);

        // Strategies in rank order; a failed strategy logs and yields to
        // the next, so a query never surfaces an internal error.
        if let Some(backend) = &self.dense {
            let candidates: Vec<&Chunk> = pool.iter().map(|&i| &self.chunks[i]).collect();
            match backend.score(query, &candidates) {
                Ok(scores) if scores.len() == pool.len() => {
                    return self.rank(&pool, &scores, top_k);
                }
                Ok(scores) => warn!(
                    "Dense backend returned {} scores for {} candidates, falling back to lexical",
                    scores.len(),
                    pool.len()
                ),
                Err(e) => warn!("Dense backend failed, falling back to lexical: {e}"),
            }
        }

        if scoped {
            match self.scoped_scores(query, &pool) {
                Ok(scores) => return self.rank(&pool, &scores, top_k),
                Err(e) => warn!("Scoped index failed, falling back to global index: {e}"),
            }
        }

        match self.global_scores(query, &pool) {
            Ok(scores) => self.rank(&pool, &scores, top_k),
            Err(e) => {
                // Degrade to the unranked head of the pool rather than
                // failing the caller's question outright
                warn!("Scoring failed, returning unranked chunks: {e}");
                pool.iter()
                    .take(top_k)
                    .map(|&i| SearchResult {
                        chunk: self.chunks[i].clone(),
                        similarity: 0.0,
                    })
                    .collect()
            }
        }
    }

    /// All content for a section, chunks joined by blank lines. Empty
    /// string when the section is unknown; the caller decides how to
    /// report that.
    pub fn section_content(&self, section: &str) -> String {
        let parts: Vec<&str> = self
            .chunks
            .iter()
            .filter(|c| c.section.eq_ignore_ascii_case(section))
            .map(|c| c.content.as_str())
            .collect();
        parts.join("\n\n")
    }

    /// Sorted list of distinct section names present in the corpus.
    pub fn section_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for chunk in &self.chunks {
            if !names.contains(&chunk.section) {
                names.push(chunk.section.clone());
            }
        }
        names.sort();
        names
    }

    /// Assemble relevant context for a query, bounded by `max_length`
    /// characters and grouped by section, for downstream generation.
    ///
    /// The first chunk is always included even when it alone exceeds the
    /// budget; relevant material must never produce an empty context. If
    /// later chunks were cut, a fixed trailing note says so. No results at
    /// all yields the `NO_RESULTS_SENTINEL` string.
    pub fn context_for_query(
        &self,
        query: &str,
        section: Option<&str>,
        max_length: usize,
    ) -> String {
        let results = self.search(query, section, CONTEXT_TOP_K);
        if results.is_empty() {
            return NO_RESULTS_SENTINEL.to_string();
        }

        let mut context = String::new();
        let mut current_len = 0usize;
        let mut truncated = false;

        for result in &results {
            let part = format!("\n## {}\n{}", result.chunk.section, result.chunk.content);
            let part_len = part.chars().count();

            if !context.is_empty() && current_len + part_len > max_length {
                truncated = true;
                break;
            }
            context.push_str(&part);
            current_len += part_len;
        }

        if truncated {
            context.push_str(TRUNCATION_NOTE);
        }
        context
    }

    /// Resolve the candidate pool for an optional section filter. Returns
    /// chunk positions and whether the pool is actually section-scoped.
    fn candidate_pool(&self, section: Option<&str>) -> (Vec<usize>, bool) {
        if let Some(name) = section {
            let filtered: Vec<usize> = self
                .chunks
                .iter()
                .enumerate()
                .filter(|(_, c)| c.section.eq_ignore_ascii_case(name))
                .map(|(i, _)| i)
                .collect();

            if filtered.is_empty() {
                warn!("No chunks found for section '{name}', searching the full corpus");
            } else {
                return (filtered, true);
            }
        }
        ((0..self.chunks.len()).collect(), false)
    }

    /// Score on a fresh index over just the pool, local to this call.
    fn scoped_scores(&self, query: &str, pool: &[usize]) -> Result<Vec<f32>, EngineError> {
        let texts: Vec<&str> = pool.iter().map(|&i| self.chunks[i].content.as_str()).collect();
        let scoped = TfidfIndex::build(&texts, self.config.max_features)?;
        Ok(scoped.score(query))
    }

    /// Score on the prebuilt corpus index, restricted to the pool.
    fn global_scores(&self, query: &str, pool: &[usize]) -> Result<Vec<f32>, EngineError> {
        let all = self.index.score(query);
        Ok(pool.iter().map(|&i| all[i]).collect())
    }

    /// Threshold, order, and cut a scored pool into final results.
    fn rank(&self, pool: &[usize], scores: &[f32], top_k: usize) -> Vec<SearchResult> {
        let mut scored: Vec<(usize, f32)> = pool
            .iter()
            .zip(scores)
            .filter(|(_, &s)| s.is_finite() && s > self.config.similarity_threshold)
            .map(|(&i, &s)| (i, s))
            .collect();

        // Descending similarity, ties broken by first-seen chunk order for
        // deterministic output
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.chunks[a.0].id.cmp(&self.chunks[b.0].id))
        });
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(i, similarity)| SearchResult {
                chunk: self.chunks[i].clone(),
                similarity,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::chunk_sections;
    use crate::loader::parse_sections;

    const CV: &str = "\
# Jane Doe
Berlin, Germany

## Summary
Backend engineer with a decade of experience building distributed systems \
and data pipelines for fintech companies.

## Skills
Programming languages: Rust, Python, SQL, TypeScript.
Tooling: Kubernetes, Terraform, PostgreSQL.

## Experience
Acme Corp, staff engineer. Led the billing platform rewrite in Rust. \
Migrated settlement batch jobs from Python to a streaming pipeline.
";

    fn retriever() -> Retriever {
        let sections = parse_sections(CV);
        let chunks = chunk_sections(&sections, 500, 50);
        Retriever::new(chunks, EngineConfig::default()).unwrap()
    }

    #[test]
    fn retriever_has_debug_output() {
        let rendered = format!("{:?}", retriever());
        assert!(rendered.contains("Retriever"));
        assert!(rendered.contains("dense: false"));
    }

    #[test]
    fn empty_corpus_fails_construction() {
        let err = Retriever::new(Vec::new(), EngineConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::EmptyCorpus));
    }

    #[test]
    fn search_respects_top_k_ordering_and_threshold() {
        let retriever = retriever();
        let results = retriever.search("programming languages", None, 2);

        assert!(!results.is_empty());
        assert!(results.len() <= 2);
        for pair in results.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
        assert!(results.iter().all(|r| r.similarity > 0.1));
        assert_eq!(results[0].chunk.section, "Skills");
    }

    #[test]
    fn unknown_section_matches_unfiltered_search() {
        let retriever = retriever();
        let plain = retriever.search("billing platform", None, 5);
        let stale = retriever.search("billing platform", Some("Hobbies"), 5);

        let ids = |rs: &[SearchResult]| rs.iter().map(|r| r.chunk.id).collect::<Vec<_>>();
        assert_eq!(ids(&plain), ids(&stale));
    }

    #[test]
    fn section_filter_is_case_insensitive() {
        let retriever = retriever();
        let results = retriever.search("Rust", Some("skills"), 5);
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.chunk.section == "Skills"));
    }

    #[test]
    fn no_lexical_overlap_returns_empty() {
        let retriever = retriever();
        let results = retriever.search("quantum chromodynamics lattice", None, 5);
        assert!(results.is_empty());
    }

    #[test]
    fn section_content_joins_chunks() {
        let retriever = retriever();
        let content = retriever.section_content("Skills");
        assert!(content.contains("Rust"));
        assert_eq!(retriever.section_content("Hobbies"), "");
    }

    #[test]
    fn section_names_are_sorted() {
        let retriever = retriever();
        assert_eq!(
            retriever.section_names(),
            ["Experience", "Jane Doe", "Skills", "Summary"]
        );
    }

    #[test]
    fn context_returns_sentinel_when_nothing_matches() {
        let retriever = retriever();
        let context = retriever.context_for_query("quantum chromodynamics lattice", None, 2000);
        assert_eq!(context, NO_RESULTS_SENTINEL);
    }

    #[test]
    fn context_groups_results_by_section() {
        let retriever = retriever();
        let context = retriever.context_for_query("programming languages", None, 2000);
        assert!(context.starts_with("\n## Skills\n"));
        assert!(!context.contains(TRUNCATION_NOTE));
    }

    #[test]
    fn tight_budget_still_includes_first_chunk() {
        let retriever = retriever();
        let context = retriever.context_for_query("engineer experience pipeline", None, 10);
        assert_ne!(context, NO_RESULTS_SENTINEL);
        assert!(context.starts_with("\n## "));
    }

    #[test]
    fn truncated_context_carries_the_note() {
        let retriever = retriever();
        let query = "rust python engineer pipeline";
        let budget = 120;

        let context = retriever.context_for_query(query, None, budget);

        // Never overshoots by more than one chunk plus the fixed note
        let results = retriever.search(query, None, 10);
        let longest_part = results
            .iter()
            .map(|r| format!("\n## {}\n{}", r.chunk.section, r.chunk.content).chars().count())
            .max()
            .unwrap_or(0);
        assert!(context.chars().count() <= budget + longest_part + TRUNCATION_NOTE.len());

        let full = retriever.context_for_query(query, None, 10_000);
        if full.chars().count() > budget && results.len() > 1 {
            assert!(context.ends_with(TRUNCATION_NOTE));
        }
    }

    struct FixedBackend {
        scores: Vec<f32>,
    }

    impl DenseBackend for FixedBackend {
        fn score(&self, _query: &str, _candidates: &[&Chunk]) -> anyhow::Result<Vec<f32>> {
            Ok(self.scores.clone())
        }
    }

    struct FailingBackend;

    impl DenseBackend for FailingBackend {
        fn score(&self, _query: &str, _candidates: &[&Chunk]) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("embedding provider unavailable")
        }
    }

    #[test]
    fn dense_backend_is_consulted_first() {
        let sections = parse_sections(CV);
        let chunks = chunk_sections(&sections, 500, 50);
        let n = chunks.len();

        // Highest dense score on the last chunk, which plain lexical
        // scoring would not pick for this query
        let mut scores = vec![0.2f32; n];
        scores[n - 1] = 0.9;

        let retriever = Retriever::new(chunks, EngineConfig::default())
            .unwrap()
            .with_dense_backend(Box::new(FixedBackend { scores }));

        let results = retriever.search("programming languages", None, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, n - 1);
        assert!((results[0].similarity - 0.9).abs() < 1e-6);
    }

    #[test]
    fn failing_dense_backend_degrades_to_lexical() {
        let sections = parse_sections(CV);
        let chunks = chunk_sections(&sections, 500, 50);
        let retriever = Retriever::new(chunks, EngineConfig::default())
            .unwrap()
            .with_dense_backend(Box::new(FailingBackend));

        let results = retriever.search("programming languages", None, 5);
        assert!(!results.is_empty());
        assert_eq!(results[0].chunk.section, "Skills");
    }
}
