use serde::{Deserialize, Serialize};

use crate::loader::Section;

/// Provenance carried with every chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub section_title: String,
    pub level: u8,
}

/// A bounded passage of section text, the unit of indexing and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Globally unique, strictly increasing across the whole document.
    pub id: usize,
    /// Non-empty passage text.
    pub content: String,
    /// Title of the owning section.
    pub section: String,
    pub metadata: ChunkMetadata,
}

/// Break each section's content into bounded, overlapping chunks.
///
/// Content is split into sentence-like units on `.`, `!`, `?` runs and the
/// units are accumulated greedily. When appending the next unit would push
/// a non-empty buffer past `chunk_size` characters, the buffer is closed as
/// a chunk and the next buffer is seeded with the closed buffer's last
/// `overlap` characters. A single sentence longer than `chunk_size` is kept
/// intact and becomes an over-length chunk; search correctness matters more
/// than uniform sizing. Output order is stable for identical input.
pub fn chunk_sections(sections: &[Section], chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for section in sections {
        let sentences = section
            .content
            .split(|c: char| matches!(c, '.' | '!' | '?'))
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut current = String::new();
        for sentence in sentences {
            if current.is_empty() {
                current = sentence.to_string();
                continue;
            }

            let candidate_len = current.chars().count() + 1 + sentence.chars().count();
            if candidate_len > chunk_size {
                push_chunk(&mut chunks, &current, section);

                // Seed the next buffer with trailing context from the
                // closed chunk so cross-boundary meaning survives
                let seeded = format!("{} {}", tail_chars(&current, overlap), sentence);
                current = seeded;
            } else {
                current.push(' ');
                current.push_str(sentence);
            }
        }

        if !current.trim().is_empty() {
            push_chunk(&mut chunks, &current, section);
        }
    }

    chunks
}

fn push_chunk(chunks: &mut Vec<Chunk>, content: &str, section: &Section) {
    chunks.push(Chunk {
        id: chunks.len(),
        content: content.trim().to_string(),
        section: section.title.clone(),
        metadata: ChunkMetadata {
            section_title: section.title.clone(),
            level: section.level,
        },
    });
}

/// Last `n` characters of `s`, on a char boundary.
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
