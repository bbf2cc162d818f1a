use serde::{Deserialize, Serialize};

/// A titled block of the source document delimited by headings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Trimmed heading text. Unique per document: a later heading with the
    /// same title replaces the earlier section's content in place.
    pub title: String,
    /// Newline-joined text of every block between this heading and the
    /// next heading of level 1 or 2.
    pub content: String,
    /// Heading level, 1 or 2.
    pub level: u8,
}

/// A section shaped for the API listing: content plus a short excerpt and
/// a display icon tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredSection {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub icon: String,
}

/// Parse markdown-ish text into ordered sections.
///
/// A level-1 or level-2 heading closes the currently open section and opens
/// a new one. Every other block (paragraph line, list item, deeper heading)
/// appends its rendered text to the open section, one line per block.
/// Sections that accumulate no content are dropped. A duplicate title
/// overwrites the earlier section's content, keeping its original position.
pub fn parse_sections(content: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<(String, u8, Vec<String>)> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some((level, text)) = parse_heading(trimmed) {
            if level <= 2 {
                flush_section(&mut sections, current.take());
                if !text.is_empty() {
                    current = Some((text, level, Vec::new()));
                }
                continue;
            }
            // Deeper headings don't open sections; their text belongs to
            // the open section's content.
            if let Some((_, _, buffer)) = current.as_mut() {
                if !text.is_empty() {
                    buffer.push(text);
                }
            }
            continue;
        }

        if let Some((_, _, buffer)) = current.as_mut() {
            let text = strip_inline_markup(strip_list_marker(trimmed));
            if !text.is_empty() {
                buffer.push(text);
            }
        }
    }

    flush_section(&mut sections, current.take());
    sections
}

fn flush_section(sections: &mut Vec<Section>, open: Option<(String, u8, Vec<String>)>) {
    let Some((title, level, buffer)) = open else {
        return;
    };
    if buffer.is_empty() {
        return;
    }
    let content = buffer.join("\n");

    // Last write wins for duplicate titles
    if let Some(existing) = sections.iter_mut().find(|s| s.title == title) {
        existing.content = content;
        existing.level = level;
    } else {
        sections.push(Section {
            title,
            content,
            level,
        });
    }
}

/// Recognize an ATX heading line, returning its level and rendered text.
fn parse_heading(line: &str) -> Option<(u8, String)> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    Some((hashes as u8, strip_inline_markup(rest.trim())))
}

/// Strip a leading bullet or ordered-list marker.
fn strip_list_marker(line: &str) -> &str {
    for marker in ["- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim_start();
        }
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        for marker in [". ", ") "] {
            if let Some(rest) = rest.strip_prefix(marker) {
                return rest.trim_start();
            }
        }
    }
    line
}

/// Reduce inline markdown to its rendered text: emphasis markers and
/// backticks are dropped, links keep only their label.
fn strip_inline_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' | '`' => {}
            '[' => {
                let mut label = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == ']' {
                        closed = true;
                        break;
                    }
                    label.push(next);
                }
                if closed && chars.peek() == Some(&'(') {
                    chars.next();
                    for next in chars.by_ref() {
                        if next == ')' {
                            break;
                        }
                    }
                } else if !closed {
                    out.push('[');
                }
                out.push_str(&label);
            }
            _ => out.push(c),
        }
    }

    out.trim().to_string()
}

/// Derive a short excerpt from section content.
///
/// Content is cut at `max_length` characters, preferring the last sentence
/// end, then the last whitespace boundary, provided the break falls after
/// 70% of the budget; otherwise it is hard-truncated with an ellipsis.
pub fn section_excerpt(content: &str, max_length: usize) -> String {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= max_length {
        return content.to_string();
    }

    let window = &chars[..max_length];
    let cutoff = (max_length as f32 * 0.7) as usize;

    let mut last_period = None;
    let mut last_space = None;
    for (i, c) in window.iter().enumerate() {
        match c {
            '.' => last_period = Some(i),
            ' ' => last_space = Some(i),
            _ => {}
        }
    }

    if let Some(period) = last_period.filter(|&i| i > cutoff) {
        return window[..=period].iter().collect();
    }
    if let Some(space) = last_space.filter(|&i| i > cutoff) {
        let prefix: String = window[..space].iter().collect();
        return format!("{}...", prefix);
    }
    format!("{}...", window.iter().collect::<String>())
}

/// Map a section title to its display icon tag.
pub fn section_icon(title: &str) -> &'static str {
    match title {
        "Summary" => "fas fa-user-circle",
        "Experience" => "fas fa-briefcase",
        "Skills" => "fas fa-code",
        "Certificates" => "fas fa-certificate",
        "Languages" => "fas fa-globe",
        "Memberships" => "fas fa-users",
        "References" => "fas fa-address-book",
        _ => "fas fa-file-alt",
    }
}

/// Shape parsed sections for the API listing.
///
/// A document that opens with a level-1 heading is treated as naming
/// itself; that leading section is metadata, not a topic a user would ask
/// about, and is excluded. A level-1 heading deeper in the document is a
/// real topic and stays.
pub fn structured_sections(sections: &[Section], excerpt_length: usize) -> Vec<StructuredSection> {
    let skip = usize::from(sections.first().is_some_and(|s| s.level == 1));

    sections
        .iter()
        .skip(skip)
        .map(|section| StructuredSection {
            title: section.title.clone(),
            content: section.content.clone(),
            excerpt: section_excerpt(&section.content, excerpt_length),
            icon: section_icon(&section.title).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Jane Doe
Berlin, Germany

## Summary
Experienced backend engineer. Ten years of distributed systems work.

## Skills
- Rust
- Python
- SQL

## Empty Heading

## Experience
### Acme Corp
Built the billing pipeline.
";

    #[test]
    fn parses_sections_in_document_order() {
        let sections = parse_sections(SAMPLE);
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        // "Empty Heading" accumulated nothing and is dropped
        assert_eq!(titles, ["Jane Doe", "Summary", "Skills", "Experience"]);
    }

    #[test]
    fn list_items_become_content_lines() {
        let sections = parse_sections(SAMPLE);
        let skills = sections.iter().find(|s| s.title == "Skills").unwrap();
        assert_eq!(skills.content, "Rust\nPython\nSQL");
    }

    #[test]
    fn deep_headings_join_open_section_content() {
        let sections = parse_sections(SAMPLE);
        let experience = sections.iter().find(|s| s.title == "Experience").unwrap();
        assert_eq!(experience.content, "Acme Corp\nBuilt the billing pipeline.");
        assert_eq!(experience.level, 2);
    }

    #[test]
    fn duplicate_title_overwrites_in_place() {
        let text = "## Skills\nRust\n## Languages\nEnglish\n## Skills\nPython\n";
        let sections = parse_sections(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Skills");
        assert_eq!(sections[0].content, "Python");
        assert_eq!(sections[1].title, "Languages");
    }

    #[test]
    fn inline_markup_is_stripped() {
        let text = "## Summary\n**Senior** engineer at [Acme](https://acme.example), knows `Rust`.\n";
        let sections = parse_sections(text);
        assert_eq!(
            sections[0].content,
            "Senior engineer at Acme, knows Rust."
        );
    }

    #[test]
    fn short_content_is_its_own_excerpt() {
        assert_eq!(section_excerpt("Short text.", 150), "Short text.");
    }

    #[test]
    fn excerpt_prefers_sentence_boundary() {
        let content = "First sentence is here. Second sentence runs much longer than the budget allows for.";
        let excerpt = section_excerpt(content, 30);
        assert_eq!(excerpt, "First sentence is here.");
    }

    #[test]
    fn excerpt_falls_back_to_word_boundary() {
        let content = "no sentence ending anywhere in this stretch of words at all here";
        let excerpt = section_excerpt(content, 30);
        assert!(excerpt.ends_with("..."));
        assert!(excerpt.len() <= 33);
        // Broke on whitespace, not mid-word
        assert!(!excerpt.trim_end_matches("...").ends_with(char::is_whitespace));
    }

    #[test]
    fn excerpt_hard_truncates_unbreakable_text() {
        let content = "a".repeat(200);
        let excerpt = section_excerpt(&content, 150);
        assert_eq!(excerpt.chars().count(), 153);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn structured_listing_skips_document_title() {
        let sections = parse_sections(SAMPLE);
        let structured = structured_sections(&sections, 150);
        let titles: Vec<&str> = structured.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Summary", "Skills", "Experience"]);
        assert!(structured.iter().all(|s| !s.excerpt.is_empty()));
    }

    #[test]
    fn late_level_one_heading_is_a_real_topic() {
        let text = "\
## Summary
Engineer with a systems background.

# Projects
Built an open source scheduler.
";
        let sections = parse_sections(text);
        let structured = structured_sections(&sections, 150);
        let titles: Vec<&str> = structured.iter().map(|s| s.title.as_str()).collect();
        // No leading title section to drop, so everything is listed
        assert_eq!(titles, ["Summary", "Projects"]);
    }

    #[test]
    fn known_and_unknown_icons() {
        assert_eq!(section_icon("Skills"), "fas fa-code");
        assert_eq!(section_icon("Hobbies"), "fas fa-file-alt");
    }
}
