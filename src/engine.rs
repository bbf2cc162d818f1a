use log::info;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use crate::chunking::chunk_sections;
use crate::config::EngineConfig;
use crate::document::Document;
use crate::error::EngineError;
use crate::loader::{parse_sections, structured_sections, StructuredSection};
use crate::retriever::{DenseBackend, Retriever, SearchResult};

/// The retrieval core: loads a CV once, then answers section listings,
/// similarity searches, and context requests from immutable state.
///
/// Construction runs the whole Document → Sections → Chunks → Index chain;
/// a failure anywhere aborts it, so an engine that exists can always serve
/// queries. Reloading means building a fresh engine and swapping it in
/// whole.
pub struct RetrievalEngine {
    sections: Vec<StructuredSection>,
    retriever: Retriever,
    config: EngineConfig,
}

// Manual impl: the retriever's boxed backend has no Debug bound
impl fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("sections", &self.sections.len())
            .field("retriever", &self.retriever)
            .field("config", &self.config)
            .finish()
    }
}

impl RetrievalEngine {
    /// Initialize the engine from a CV file.
    pub fn from_file<P: AsRef<Path>>(path: P, config: EngineConfig) -> Result<Self, EngineError> {
        let document = Document::from_file(path)?;
        Self::from_text(&document.content, config)
    }

    /// Initialize the engine from already-loaded document text.
    pub fn from_text(content: &str, config: EngineConfig) -> Result<Self, EngineError> {
        let parsed = parse_sections(content);
        let chunks = chunk_sections(&parsed, config.chunk_size, config.chunk_overlap);
        info!(
            "Parsed {} sections into {} chunks",
            parsed.len(),
            chunks.len()
        );

        let sections = structured_sections(&parsed, config.excerpt_length);
        let retriever = Retriever::new(chunks, config.clone())?;

        Ok(RetrievalEngine {
            sections,
            retriever,
            config,
        })
    }

    /// Install a dense-retrieval backend behind the same search contract.
    pub fn with_dense_backend(mut self, backend: Box<dyn DenseBackend>) -> Self {
        self.retriever = self.retriever.with_dense_backend(backend);
        self
    }

    /// Ordered sections with excerpts and icons, the document's own title
    /// section excluded.
    pub fn sections(&self) -> &[StructuredSection] {
        &self.sections
    }

    /// Full content of one section; empty string when the title is unknown.
    pub fn section_content(&self, title: &str) -> String {
        self.retriever.section_content(title)
    }

    /// Sorted names of every section present in the indexed corpus,
    /// including the document's own title section.
    pub fn section_names(&self) -> Vec<String> {
        self.retriever.section_names()
    }

    /// Top-k chunks relevant to `query`, optionally scoped to a section.
    pub fn search(&self, query: &str, section: Option<&str>, top_k: usize) -> Vec<SearchResult> {
        self.retriever.search(query, section, top_k)
    }

    /// Bounded context string for `query`, using the configured budget.
    pub fn context(&self, query: &str, section: Option<&str>) -> String {
        self.retriever
            .context_for_query(query, section, self.config.context_length)
    }

    /// Bounded context string for `query` with an explicit budget.
    pub fn context_with_budget(
        &self,
        query: &str,
        section: Option<&str>,
        max_length: usize,
    ) -> String {
        self.retriever.context_for_query(query, section, max_length)
    }

    /// Run an interactive question loop against the loaded CV.
    pub fn run_query_loop(&self) -> anyhow::Result<()> {
        let titles: Vec<&str> = self.sections.iter().map(|s| s.title.as_str()).collect();
        println!("Loaded CV sections: {}", titles.join(", "));
        println!("Ask a question, type 'sections' to list sections, or 'exit' to quit.");

        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut buffer = String::new();

        loop {
            print!("\nYour question: ");
            stdout.flush()?;

            buffer.clear();
            if stdin.read_line(&mut buffer)? == 0 {
                break;
            }

            let question = buffer.trim();
            if question.is_empty() {
                continue;
            }
            if question.eq_ignore_ascii_case("exit") {
                info!("Goodbye!");
                break;
            }
            if question.eq_ignore_ascii_case("sections") {
                println!("Available CV sections: {}", self.section_names().join(", "));
                continue;
            }

            println!("{}", self.context(question, None));
        }

        Ok(())
    }
}
