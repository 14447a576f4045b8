/*!
 * Prompt composition for chunk, reduction and combine calls.
 *
 * A rendered template is wrapped with a language instruction in front and
 * the user context behind (unless the template places `{context}` itself).
 */

use crate::language_utils::{is_english, language_display_name};
use crate::templates::{PromptTemplate, TemplateVars};

/// Separator between partial summaries when they are joined
pub const PARTIAL_SEPARATOR: &str = "\n\n";

/// Builder for the prompts of one summarization run
#[derive(Debug, Clone)]
pub struct SummaryPromptBuilder {
    template: PromptTemplate,
    language: String,
    context: Option<String>,
}

impl SummaryPromptBuilder {
    /// Create a new prompt builder
    pub fn new(template: PromptTemplate, language: &str) -> Self {
        Self {
            template,
            language: language.to_string(),
            context: None,
        }
    }

    /// Set the user context; blank context is ignored
    pub fn with_context(mut self, context: Option<&str>) -> Self {
        self.context = context
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        self
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Directive placed in front of every prompt
    pub fn language_instruction(&self) -> String {
        if is_english(&self.language) {
            "Do not include any thinking process, reasoning, or meta-commentary. Only provide the final summary.\n\n".to_string()
        } else {
            let name = language_display_name(&self.language);
            format!(
                "CRITICAL: You must write the entire summary in {name}. All content, including headings, \
                 sections, paragraphs, and any text, must be in {name}. Do not use English or any other \
                 language. Only use {name}. Do not include any thinking process, reasoning, or \
                 meta-commentary. Only provide the final summary in {name}.\n\n"
            )
        }
    }

    /// Template rendered over `content` with the language instruction and context
    pub fn summary_prompt(&self, content: &str) -> String {
        let rendered = self.template.render(&TemplateVars {
            content,
            language: &self.language,
            context: self.context.as_deref(),
        });

        let mut prompt = self.language_instruction();
        prompt.push_str(&rendered);
        if let Some(context) = &self.context {
            if !self.template.has_context_placeholder() {
                prompt.push_str(&format!("\n\nAdditional Context:\n{}\n", context));
            }
        }
        prompt
    }

    /// Prompt for chunk `index` (0-based) of `total`
    pub fn chunk_prompt(&self, content: &str, index: usize, total: usize) -> String {
        format!(
            "This is chunk {} of {}. Provide a summary focusing on the key points:\n\n{}",
            index + 1,
            total,
            self.summary_prompt(content)
        )
    }

    /// Prompt that condenses one group of partial summaries during reduction
    pub fn reduce_prompt(&self, partials: &str, index: usize, total: usize) -> String {
        format!(
            "{}The following are summaries of consecutive parts of a text file (group {} of {}). \
             Condense them into one shorter summary that keeps every key point in order.\n\n{}",
            self.language_instruction(),
            index + 1,
            total,
            partials
        )
    }

    /// Prompt that merges the partial summaries into the final summary
    pub fn combine_prompt(&self, partials: &str) -> String {
        if is_english(&self.language) {
            format!(
                "The following are summaries of different parts of a text file. Please combine them into \
                 a single coherent summary. Do not include any thinking process or reasoning - only the \
                 final summary.\n\n{}",
                partials
            )
        } else {
            let name = language_display_name(&self.language);
            format!(
                "CRITICAL: You must write the entire summary in {name}. The following are summaries of \
                 different parts of a text file. Please combine them into a single coherent summary \
                 written entirely in {name}. All headings, sections, and text must be in {name}. Do not \
                 include any thinking process or reasoning - only the final summary in {name}.\n\n{partials}"
            )
        }
    }
}
