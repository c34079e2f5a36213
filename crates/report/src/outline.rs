//! Outline and structure building
//!
//! Two ways to obtain a report structure: a deterministic fixed template,
//! or a tolerant scan of heading-marked text (`# ` sections, `## `
//! subsections) as returned by an LLM. Also carries the simpler linear
//! outline used by the canvas flow.

use regex_lite::Regex;
use scribe_common::models::{OutlineSection, Paper, Reference, SectionTree};
use uuid::Uuid;

/// Fixed template sections with their subsections
const TEMPLATE: &[(&str, &[&str])] = &[
    ("Abstract", &["Background", "Objectives"]),
    (
        "Introduction",
        &["Context and Motivation", "Problem Statement", "Contributions"],
    ),
    (
        "Literature Review",
        &["Theoretical Foundations", "Prior Approaches", "Research Gaps"],
    ),
    (
        "Methodology",
        &["Study Design", "Data Collection", "Analysis Procedures"],
    ),
    ("Results", &["Primary Findings", "Secondary Findings"]),
    (
        "Discussion",
        &["Interpretation of Findings", "Limitations", "Implications"],
    ),
    ("Conclusion", &["Summary of Contributions", "Future Work"]),
    ("References", &["Cited Works", "Further Reading"]),
];

/// Sections used when heading-marked text yields no sections at all
const FALLBACK_SECTIONS: &[&str] = &["Introduction", "Methods", "Results", "Discussion"];

/// Build the deterministic fixed template tree
pub fn template_tree() -> SectionTree {
    let mut tree = SectionTree::new();
    for (section, subsections) in TEMPLATE {
        if let Some(section_id) = tree.add_child(tree.root, *section) {
            for subsection in *subsections {
                tree.add_child(section_id, *subsection);
            }
        }
    }
    tree
}

/// Build the minimal fallback tree used when no headings are found
pub fn fallback_tree() -> SectionTree {
    let mut tree = SectionTree::new();
    for section in FALLBACK_SECTIONS {
        tree.add_child(tree.root, *section);
    }
    tree
}

/// Build a tree from heading-marked text.
///
/// Lines prefixed `# ` start a section; `## ` lines attach a subsection to
/// the most recently seen section. A `##` line with no prior `#` line is
/// silently discarded, not promoted, so `##`-only input yields a root with
/// zero children. Only fully heading-less input falls back to the fixed
/// 4-node default. Node ids are freshly generated, never derived from
/// titles.
pub fn tree_from_headings(text: &str) -> SectionTree {
    let mut tree = SectionTree::new();
    let mut current_section: Option<Uuid> = None;
    let mut saw_heading = false;

    for line in text.lines() {
        let line = line.trim();
        if let Some(title) = line.strip_prefix("## ") {
            let title = title.trim();
            if title.is_empty() {
                continue;
            }
            saw_heading = true;
            // Subsections before any section are dropped, not promoted
            if let Some(section_id) = current_section {
                tree.add_child(section_id, title);
            }
        } else if let Some(title) = line.strip_prefix("# ") {
            let title = title.trim();
            if title.is_empty() {
                continue;
            }
            saw_heading = true;
            current_section = tree.add_child(tree.root, title);
        }
    }

    if !saw_heading {
        return fallback_tree();
    }
    tree
}

/// Parse a free-text LLM outline response into the linear outline list.
///
/// Each blank-line-separated block becomes a section: the first line
/// (heading markers stripped) is the title, the rest is the content.
/// References are the papers whose title or any author appears in the
/// block's content.
pub fn outline_from_response(response: &str, papers: &[Paper]) -> Vec<OutlineSection> {
    let heading = Regex::new(r"^#+\s*").expect("heading pattern is valid");

    response
        .split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .map(|block| {
            let mut lines = block.lines();
            let title = heading
                .replace(lines.next().unwrap_or_default().trim(), "")
                .to_string();
            let content = lines.collect::<Vec<_>>().join("\n");
            let content_lower = content.to_lowercase();

            let references = papers
                .iter()
                .filter(|paper| {
                    content_lower.contains(&paper.title.to_lowercase())
                        || paper
                            .authors
                            .iter()
                            .any(|author| content_lower.contains(&author.to_lowercase()))
                })
                .map(Reference::from_paper)
                .collect();

            OutlineSection {
                id: Uuid::new_v4(),
                title,
                content,
                references,
            }
        })
        .collect()
}

/// Replace the content of one outline section (the explicit edit action of
/// the canvas flow). Returns false when the section id is unknown.
pub fn update_outline_section(sections: &mut [OutlineSection], id: Uuid, content: String) -> bool {
    match sections.iter_mut().find(|section| section.id == id) {
        Some(section) => {
            section.content = content;
            true
        }
        None => false,
    }
}
