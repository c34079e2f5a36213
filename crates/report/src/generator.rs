//! Section content generation
//!
//! Issues one or more completion calls per section to produce cited prose
//! plus a machine-readable references block. Truncated output is extended
//! through a bounded continuation loop modeled as a small explicit state
//! machine: attempt counter, accumulated buffer, completion predicate.
//!
//! Completeness detection is deliberately heuristic: the continuation flag
//! must be absent from the last response AND a conclusion-signal substring
//! must appear in the accumulated content. The rest of the pipeline assumes
//! exactly this contract.

use regex_lite::Regex;
use scribe_common::config::GenerationConfig;
use scribe_common::errors::Result;
use scribe_common::llm::CompletionClient;
use scribe_common::models::Paper;
use tracing::debug;

/// Marker the model appends when it judges its own output truncated
pub const CONTINUATION_FLAG: &str = "[CONTINUE]";

/// Line introducing the machine-readable references block
pub const REFERENCES_MARKER: &str = "REFERENCES:";

/// Case-insensitive substrings treated as conclusion signals
const CONCLUSION_SIGNALS: &[&str] = &["conclusion", "in summary", "thus,", "therefore,"];

/// Visible notice appended when the attempt cap is reached without a
/// detected conclusion
const INCOMPLETE_NOTICE: &str =
    "<p><em>Note: this section may be incomplete. Generation stopped before a conclusion was reached.</em></p>";

/// Output of one section's generation
#[derive(Debug, Clone)]
pub struct GeneratedSection {
    /// Accumulated prose, markup-substituted, flag and references stripped
    pub content: String,

    /// Raw references block lines gathered across attempts
    pub references_block: String,

    /// Completion calls used
    pub attempts: usize,

    /// Whether the completion heuristic was satisfied (vs. cap reached)
    pub complete: bool,
}

/// Continuation state: attempt counter, accumulated buffer, and the flag
/// observed on the most recent response
#[derive(Debug, Default)]
struct GenerationState {
    attempts: usize,
    buffer: String,
    references_block: String,
    continuation_requested: bool,
}

impl GenerationState {
    /// Fold one raw completion response into the state: record the
    /// continuation flag, peel off the references block, substitute
    /// markup, and append to the buffer.
    fn absorb(&mut self, raw: &str) {
        self.continuation_requested = raw.contains(CONTINUATION_FLAG);
        let stripped = raw.replace(CONTINUATION_FLAG, "");

        let (prose, references) = split_references(&stripped);
        let references = references.trim();
        if !references.is_empty() {
            if !self.references_block.is_empty() {
                self.references_block.push('\n');
            }
            self.references_block.push_str(references);
        }

        let rendered = render_markup(prose.trim());
        if !rendered.is_empty() {
            if !self.buffer.is_empty() {
                self.buffer.push('\n');
            }
            self.buffer.push_str(&rendered);
        }

        self.attempts += 1;
    }

    /// Flag absent on the last response AND a conclusion signal present in
    /// the accumulated content
    fn is_complete(&self) -> bool {
        !self.continuation_requested && has_conclusion_signal(&self.buffer)
    }

    /// Char-boundary-safe tail of the accumulated buffer, used as the
    /// continuation anchor
    fn anchor(&self, max_chars: usize) -> String {
        let chars: Vec<char> = self.buffer.chars().collect();
        let start = chars.len().saturating_sub(max_chars);
        chars[start..].iter().collect()
    }
}

/// Generates cited prose for one section at a time
pub struct SectionGenerator<'a> {
    client: &'a dyn CompletionClient,
    config: &'a GenerationConfig,
}

impl<'a> SectionGenerator<'a> {
    pub fn new(client: &'a dyn CompletionClient, config: &'a GenerationConfig) -> Self {
        Self { client, config }
    }

    /// Generate content for the section titled `title` (with its parent
    /// section title when generating a subsection), grounded in `corpus`.
    ///
    /// Completion errors propagate to the caller; the orchestrator decides
    /// how a failed section affects the job.
    pub async fn generate(
        &self,
        title: &str,
        parent_title: Option<&str>,
        corpus: &[Paper],
    ) -> Result<GeneratedSection> {
        let mut state = GenerationState::default();

        loop {
            let prompt = if state.attempts == 0 {
                initial_prompt(title, parent_title, corpus)
            } else {
                continuation_prompt(
                    title,
                    &state.anchor(self.config.continuation_anchor_chars),
                    corpus,
                )
            };

            let raw = self.client.complete(&prompt).await?;
            state.absorb(&raw);

            debug!(
                section = %title,
                attempt = state.attempts,
                continuation_requested = state.continuation_requested,
                "Absorbed completion response"
            );

            if state.is_complete() || state.attempts >= self.config.max_attempts {
                break;
            }
        }

        let complete = state.is_complete();
        if !complete {
            if !state.buffer.is_empty() {
                state.buffer.push('\n');
            }
            state.buffer.push_str(INCOMPLETE_NOTICE);
        }

        metrics::histogram!("scribe_section_attempts").record(state.attempts as f64);

        Ok(GeneratedSection {
            content: state.buffer,
            references_block: state.references_block,
            attempts: state.attempts,
            complete,
        })
    }
}

/// Serialize the corpus the way prompts embed it
pub fn serialize_corpus(corpus: &[Paper]) -> String {
    let mut out = String::new();
    for (index, paper) in corpus.iter().enumerate() {
        out.push_str(&format!(
            "PAPER {}:\nTitle: {}\nAuthors: {}\nYear: {}\nAbstract: {}\n",
            index + 1,
            paper.title,
            paper.authors.join(", "),
            paper.year,
            paper.abstract_text.as_deref().unwrap_or("Not available"),
        ));
        if let Some(question) = &paper.research_question {
            out.push_str(&format!("Research Question: {}\n", question));
        }
        if let Some(findings) = &paper.major_findings {
            out.push_str(&format!("Major Findings: {}\n", findings));
        }
        if let Some(suggestions) = &paper.suggestions {
            out.push_str(&format!("Suggestions: {}\n", suggestions));
        }
        out.push_str("---\n");
    }
    out
}

fn instruction_block() -> String {
    format!(
        "INSTRUCTIONS:\n\
        - Write one paragraph per topic, in formal academic prose.\n\
        - Use APA in-text citations: (Smith, 2020) for one author, (Smith & Garcia, 2020) for two, (Smith et al., 2020) for three or more.\n\
        - Include at least one citation in every paragraph.\n\
        - End with a concluding paragraph.\n\
        - After the prose, output a line reading exactly \"{marker}\" followed by one reference per line in the form: Authors (Year). Title. *Journal*. DOI or URL.\n\
        - If your output is cut off before the section is finished, end it with the marker {flag}.",
        marker = REFERENCES_MARKER,
        flag = CONTINUATION_FLAG,
    )
}

fn initial_prompt(title: &str, parent_title: Option<&str>, corpus: &[Paper]) -> String {
    let heading = match parent_title {
        Some(parent) => format!(
            "Write the subsection \"{}\" of the section \"{}\" of an academic report.",
            title, parent
        ),
        None => format!("Write the section \"{}\" of an academic report.", title),
    };
    format!(
        "You are an academic writing assistant.\n{}\n\nSOURCE PAPERS:\n{}\n{}",
        heading,
        serialize_corpus(corpus),
        instruction_block(),
    )
}

fn continuation_prompt(title: &str, anchor: &str, corpus: &[Paper]) -> String {
    format!(
        "You are an academic writing assistant continuing the section \"{}\" of an academic report.\n\
        The text so far ends with:\n...{}\n\n\
        Continue seamlessly from that point without repeating it.\n\n\
        SOURCE PAPERS:\n{}\n{}",
        title,
        anchor,
        serialize_corpus(corpus),
        instruction_block(),
    )
}

fn has_conclusion_signal(content: &str) -> bool {
    let lowered = content.to_lowercase();
    CONCLUSION_SIGNALS.iter().any(|signal| lowered.contains(signal))
}

/// Split raw completion text into prose and the references block, taking
/// everything after the last marker line as references
fn split_references(text: &str) -> (&str, &str) {
    match text.rfind(REFERENCES_MARKER) {
        Some(position) => {
            let prose = &text[..position];
            let references = &text[position + REFERENCES_MARKER.len()..];
            (prose, references)
        }
        None => (text, ""),
    }
}

/// Fixed text-to-markup substitutions: heading markers become heading
/// tags, bold/emphasis markers become inline tags, blank-line-separated
/// chunks become paragraphs
fn render_markup(text: &str) -> String {
    let bold = Regex::new(r"\*\*([^*]+)\*\*").expect("bold pattern is valid");
    let emphasis = Regex::new(r"\*([^*\n]+)\*").expect("emphasis pattern is valid");

    let render_inline = |chunk: &str| -> String {
        let chunk = bold.replace_all(chunk, "<strong>$1</strong>");
        emphasis.replace_all(&chunk, "<em>$1</em>").to_string()
    };

    text.split("\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            if let Some(heading) = chunk.strip_prefix("### ") {
                format!("<h5>{}</h5>", render_inline(heading.trim()))
            } else if let Some(heading) = chunk.strip_prefix("## ") {
                format!("<h4>{}</h4>", render_inline(heading.trim()))
            } else if let Some(heading) = chunk.strip_prefix("# ") {
                format!("<h3>{}</h3>", render_inline(heading.trim()))
            } else {
                format!("<p>{}</p>", render_inline(chunk))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scribe_common::errors::{AppError, Result};
    use std::sync::Mutex;

    /// Completion mock that replays scripted responses and records prompts
    struct ScriptedClient {
        responses: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(String::from).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(AppError::Completion {
                    message: "script exhausted".to_string(),
                });
            }
            Ok(responses.remove(0))
        }
    }

    fn config() -> GenerationConfig {
        GenerationConfig::default()
    }

    fn corpus() -> Vec<Paper> {
        vec![Paper::new(
            "p1",
            "A Study of Things",
            vec!["Smith, J.".to_string()],
            "2020",
        )]
    }

    #[tokio::test]
    async fn test_stops_after_one_attempt_on_conclusion() {
        let client = ScriptedClient::new(vec![
            "Findings are clear (Smith, 2020). Therefore, the evidence holds.\nREFERENCES:\nSmith, J. (2020). A Study of Things. *Nature*.",
        ]);
        let config = config();
        let generator = SectionGenerator::new(&client, &config);
        let generated = generator.generate("Results", None, &corpus()).await.unwrap();

        assert_eq!(generated.attempts, 1);
        assert!(generated.complete);
        assert!(generated.content.contains("Therefore,"));
        assert!(!generated.content.contains(REFERENCES_MARKER));
        assert!(generated.references_block.contains("Smith, J. (2020)"));
    }

    #[tokio::test]
    async fn test_caps_at_three_attempts_and_appends_notice() {
        let client = ScriptedClient::new(vec![
            "Part one (Smith, 2020). [CONTINUE]",
            "Part two (Smith, 2020). [CONTINUE]",
            "Part three (Smith, 2020). [CONTINUE]",
        ]);
        let config = config();
        let generator = SectionGenerator::new(&client, &config);
        let generated = generator.generate("Results", None, &corpus()).await.unwrap();

        assert_eq!(generated.attempts, 3);
        assert!(!generated.complete);
        assert!(generated.content.contains("may be incomplete"));
        assert!(!generated.content.contains(CONTINUATION_FLAG));
    }

    #[tokio::test]
    async fn test_missing_conclusion_signal_keeps_going() {
        // No flag, but no conclusion signal either: the heuristic needs both
        let client = ScriptedClient::new(vec![
            "Opening remarks (Smith, 2020).",
            "More detail (Smith, 2020).",
            "In summary, the field has moved on (Smith, 2020).",
        ]);
        let config = config();
        let generator = SectionGenerator::new(&client, &config);
        let generated = generator.generate("Results", None, &corpus()).await.unwrap();

        assert_eq!(generated.attempts, 3);
        assert!(generated.complete);
        assert!(!generated.content.contains("may be incomplete"));
    }

    #[tokio::test]
    async fn test_flag_overrides_conclusion_signal() {
        let client = ScriptedClient::new(vec![
            "Thus, it seems settled (Smith, 2020). [CONTINUE]",
            "But there was more. In summary, done (Smith, 2020).",
        ]);
        let config = config();
        let generator = SectionGenerator::new(&client, &config);
        let generated = generator.generate("Results", None, &corpus()).await.unwrap();

        assert_eq!(generated.attempts, 2);
        assert!(generated.complete);
    }

    #[tokio::test]
    async fn test_continuation_prompt_carries_anchor_and_corpus() {
        let client = ScriptedClient::new(vec![
            "A first stretch of prose about the study (Smith, 2020). [CONTINUE]",
            "Therefore, we conclude (Smith, 2020).",
        ]);
        let config = config();
        let generator = SectionGenerator::new(&client, &config);
        generator.generate("Results", None, &corpus()).await.unwrap();

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("SOURCE PAPERS"));
        assert!(prompts[1].contains("Continue seamlessly"));
        assert!(prompts[1].contains("prose about the study (Smith, 2020)."));
        assert!(prompts[1].contains("A Study of Things"));
    }

    #[tokio::test]
    async fn test_subsection_prompt_names_parent() {
        let client = ScriptedClient::new(vec!["Therefore, done (Smith, 2020)."]);
        let config = config();
        let generator = SectionGenerator::new(&client, &config);
        generator
            .generate("Background", Some("Introduction"), &corpus())
            .await
            .unwrap();

        let prompts = client.prompts();
        assert!(prompts[0].contains("subsection \"Background\""));
        assert!(prompts[0].contains("section \"Introduction\""));
    }

    #[tokio::test]
    async fn test_completion_error_propagates() {
        let client = ScriptedClient::new(vec![]);
        let config = config();
        let generator = SectionGenerator::new(&client, &config);
        assert!(generator.generate("Results", None, &corpus()).await.is_err());
    }

    #[test]
    fn test_render_markup_substitutions() {
        let rendered = render_markup("# Heading\n\nSome **bold** and *subtle* text.\n\nNext paragraph.");
        assert_eq!(
            rendered,
            "<h3>Heading</h3>\n<p>Some <strong>bold</strong> and <em>subtle</em> text.</p>\n<p>Next paragraph.</p>"
        );
    }

    #[test]
    fn test_split_references_takes_last_marker() {
        let (prose, references) = split_references("Text mentions REFERENCES: once.\nREFERENCES:\nSmith, J. (2020). T.");
        assert!(prose.contains("Text mentions"));
        assert_eq!(references.trim(), "Smith, J. (2020). T.");
    }

    #[test]
    fn test_anchor_is_char_safe() {
        let mut state = GenerationState::default();
        state.buffer = "héllo wörld".repeat(30);
        let anchor = state.anchor(150);
        assert_eq!(anchor.chars().count(), 150);
        assert!(state.buffer.ends_with(&anchor));
    }
}
