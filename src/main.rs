use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::info;

use cv_retrieval::config::EngineConfig;
use cv_retrieval::engine::RetrievalEngine;

/// Ask questions about a CV from the command line, answered by lexical
/// retrieval over the document's sections.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CV document (markdown, plain text, or PDF)
    #[arg(index = 1)]
    cv_path: String,

    /// Ask a single question and exit instead of entering the query loop
    #[arg(long)]
    question: Option<String>,

    /// Restrict the search to one CV section (e.g. 'Experience', 'Skills')
    #[arg(long)]
    section: Option<String>,

    /// Number of chunks to retrieve for a one-shot question
    #[arg(long, default_value_t = 5)]
    top_k: usize,

    /// List the CV's sections with excerpts and exit
    #[arg(long)]
    sections: bool,

    /// Emit machine-readable JSON instead of plain text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let config = EngineConfig::from_env();
    info!("Loading CV from {}", args.cv_path);

    let engine = RetrievalEngine::from_file(&args.cv_path, config)
        .with_context(|| format!("Failed to initialize retrieval engine for {}", args.cv_path))?;

    if args.sections {
        if args.json {
            println!("{}", serde_json::to_string_pretty(engine.sections())?);
        } else {
            for section in engine.sections() {
                println!("{} [{}]\n  {}", section.title, section.icon, section.excerpt);
            }
        }
        return Ok(());
    }

    if let Some(question) = args.question {
        let section = args.section.as_deref();

        if args.json {
            let results = engine.search(&question, section, args.top_k);
            println!("{}", serde_json::to_string_pretty(&results)?);
        } else {
            println!("{}", engine.context(&question, section));
        }
        return Ok(());
    }

    engine.run_query_loop()
}
