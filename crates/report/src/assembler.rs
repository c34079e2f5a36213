//! Document assembly
//!
//! Walks a completed section tree in document order and renders a
//! typeset LaTeX document plus a companion BibTeX database. In-text
//! citation markers that match a reference are rewritten into
//! `\hyperref` cross-references against per-reference anchors; markers
//! with no match are left as plain text.
//!
//! The bibliography is deduplicated with the same loose matching the
//! reconciler uses: two references merge when any author strings overlap
//! at token level and the years are equal, keeping the first-encountered
//! copy.

use regex_lite::Regex;
use scribe_common::models::{Reference, SectionTree};

/// Rendered outputs of one assembly pass
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    /// Typeset LaTeX source with a trailing References section
    pub latex: String,

    /// BibTeX database, one `@article` entry per unique reference
    pub bibtex: String,
}

/// Union of all nodes' references in document order, merged by author
/// overlap plus exact year, first-encountered copy kept
pub fn unique_references(tree: &SectionTree) -> Vec<Reference> {
    let mut unique: Vec<Reference> = Vec::new();
    for id in tree.document_order() {
        let Some(node) = tree.get(id) else { continue };
        for reference in &node.references {
            let duplicate = unique.iter().any(|kept| {
                kept.year == reference.year
                    && Reference::authors_overlap(&kept.authors, &reference.authors)
            });
            if !duplicate {
                unique.push(reference.clone());
            }
        }
    }
    unique
}

/// Render the tree into LaTeX and BibTeX
pub fn assemble(tree: &SectionTree, title: &str) -> AssembledDocument {
    let unique = unique_references(tree);

    let mut latex = String::new();
    latex.push_str("\\documentclass{article}\n");
    latex.push_str("\\usepackage[utf8]{inputenc}\n");
    latex.push_str("\\usepackage{hyperref}\n");
    latex.push_str(&format!("\\title{{{}}}\n", escape_latex(title)));
    latex.push_str("\\begin{document}\n\\maketitle\n\n");

    for id in tree.document_order() {
        let Some(node) = tree.get(id) else { continue };
        latex.push_str(&format!(
            "{}{{{}}}\n",
            heading_command(node.level),
            escape_latex(&node.title)
        ));
        if let Some(content) = &node.content {
            let body = rewrite_citations(content, &node.references, &unique);
            latex.push_str(&markup_to_latex(&body));
            latex.push_str("\n\n");
        }
    }

    if !unique.is_empty() {
        latex.push_str("\\section*{References}\n");
        for reference in &unique {
            latex.push_str(&format!(
                "\\phantomsection\\label{{ref:{}}}\n{}\n\n",
                reference.id,
                escape_latex(&reference.format_apa())
            ));
        }
    }
    latex.push_str("\\end{document}\n");

    let bibtex = unique.iter().map(bibtex_entry).collect::<Vec<_>>().join("\n");

    AssembledDocument { latex, bibtex }
}

fn heading_command(level: usize) -> &'static str {
    match level {
        1 => "\\section",
        2 => "\\subsection",
        3 => "\\subsubsection",
        _ => "\\paragraph",
    }
}

/// Rewrite `(Author, Year)` markers that match one of the node's
/// references into `\hyperref[ref:<id>]{...}` against the merged copy's
/// anchor. Unmatched markers pass through untouched.
fn rewrite_citations(content: &str, node_references: &[Reference], unique: &[Reference]) -> String {
    let pattern = Regex::new(r"\(([^()]+?),\s*(\d{4})\)").expect("citation pattern is valid");
    pattern
        .replace_all(content, |captures: &regex_lite::Captures| {
            let marker = &captures[0];
            let fragment = leading_author(&captures[1]);
            let year = &captures[2];

            let matched = node_references.iter().find(|reference| {
                reference.year == year && reference.matches_author_fragment(&fragment)
            });
            let Some(matched) = matched else {
                return marker.to_string();
            };

            // Resolve to the kept copy so the anchor exists in the
            // References section
            let canonical = unique
                .iter()
                .find(|kept| {
                    kept.year == matched.year
                        && Reference::authors_overlap(&kept.authors, &matched.authors)
                })
                .unwrap_or(matched);

            format!("\\hyperref[ref:{}]{{{}}}", canonical.id, marker)
        })
        .to_string()
}

/// Leading author name of a citation fragment, mirroring the
/// reconciler's normalization
fn leading_author(fragment: &str) -> String {
    let fragment = fragment.split('&').next().unwrap_or(fragment);
    let fragment = fragment
        .trim()
        .trim_end_matches("et al.")
        .trim_end_matches("et al");
    fragment.trim().trim_end_matches(',').trim().to_string()
}

/// Convert the stored presentation markup into LaTeX equivalents
fn markup_to_latex(content: &str) -> String {
    content
        .replace("<h3>", "\\subsection*{")
        .replace("</h3>", "}")
        .replace("<h4>", "\\subsubsection*{")
        .replace("</h4>", "}")
        .replace("<h5>", "\\paragraph{")
        .replace("</h5>", "}")
        .replace("<strong>", "\\textbf{")
        .replace("</strong>", "}")
        .replace("<em>", "\\textit{")
        .replace("</em>", "}")
        .replace("<p>", "")
        .replace("</p>", "\n")
}

/// Escape LaTeX special characters in plain text
fn escape_latex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '~' => escaped.push_str("\\textasciitilde{}"),
            '^' => escaped.push_str("\\textasciicircum{}"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// One machine-readable entry keyed by the reference id
fn bibtex_entry(reference: &Reference) -> String {
    let mut entry = format!("@article{{{},\n", reference.id);
    entry.push_str(&format!(
        "  author = {{{}}},\n",
        escape_latex(&reference.authors.join(" and "))
    ));
    entry.push_str(&format!("  title = {{{}}},\n", escape_latex(&reference.title)));
    if let Some(journal) = &reference.journal {
        entry.push_str(&format!("  journal = {{{}}},\n", escape_latex(journal)));
    }
    entry.push_str(&format!("  year = {{{}}},\n", reference.year));
    if let Some(doi) = &reference.doi {
        entry.push_str(&format!("  doi = {{{}}},\n", escape_latex(doi)));
    }
    entry.push_str("}\n");
    entry
}
