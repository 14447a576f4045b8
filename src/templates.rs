/*!
 * Layered prompt templates.
 *
 * Templates are addressed by id. A plain id (`detailed`) names a prompt, a
 * `category:name` id (`blog:technical`) names a template inside a category.
 * Built-in templates are always available; a user JSON file can add new ones
 * or override built-ins with the same id.
 *
 * User file layout:
 * ```json
 * {
 *   "prompts": { "default": "..." },
 *   "categories": { "blog": { "default": "..." } }
 * }
 * ```
 */

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::TemplateError;
use crate::file_utils::FileManager;
use crate::language_utils::language_display_name;

/// Placeholder replaced with the text to summarize
pub const CONTENT_PLACEHOLDER: &str = "{content}";

/// Placeholder replaced with the summary language name
pub const LANGUAGE_PLACEHOLDER: &str = "{language}";

/// Placeholder replaced with the user supplied context
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

const DEFAULT_PROMPT: &str = "Please summarize the following content in a clear and concise manner.
Focus on the main themes, key events, and important information.

Content:
{content}";

const DETAILED_PROMPT: &str = "Provide a detailed summary of the following content with:
1. Overview
2. Key Themes
3. Important Events
4. Main Points

Content:
{content}";

const BRIEF_PROMPT: &str = "Create a brief summary (2-3 sentences) of the following content:

{content}";

const SHORT_DEFAULT: &str = "Create a brief summary (2-3 sentences) of the following content.
Focus on the main point and key information.

Content:
{content}";

const SHORT_CONCISE: &str = "Create a one-sentence summary of the following content:

{content}";

const LONG_DEFAULT: &str = "Provide a detailed summary of the following content with:
1. Overview
2. Key Themes
3. Important Events
4. Main Points
5. Conclusion

Content:
{content}";

const LONG_STRUCTURED: &str = "Create a structured summary with the following sections:
- Executive Summary
- Key Findings
- Detailed Analysis
- Recommendations (if applicable)

Content:
{content}";

const BLOG_DEFAULT: &str = "Write a blog-style article based on the following content.
Include:
- An engaging introduction that hooks the reader
- Well-organized main content sections with clear headings
- A compelling conclusion
- Natural, conversational tone

Content:
{content}";

const BLOG_TECHNICAL: &str = "Write a technical blog post based on the following content.
Include:
- Clear technical explanations
- Code examples or technical details where relevant
- Structured sections with headings
- Practical insights and takeaways

Content:
{content}";

/// Where a resolved template came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSource {
    BuiltIn,
    User,
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::BuiltIn => write!(f, "built-in"),
            Self::User => write!(f, "user"),
        }
    }
}

/// Values substituted into a template
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    pub content: &'a str,
    /// Language code; rendered as its English name
    pub language: &'a str,
    pub context: Option<&'a str>,
}

// @struct: A resolved template
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    // @field: Id the template was resolved from
    pub id: String,

    // @field: Body with placeholders
    pub body: String,

    // @field: Layer that defined it
    pub source: TemplateSource,
}

impl PromptTemplate {
    /// Create a template, checking that it has a content placeholder
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Result<Self, TemplateError> {
        let id = id.into();
        let body = body.into();
        if !body.contains(CONTENT_PLACEHOLDER) {
            return Err(TemplateError::MissingContentPlaceholder(id));
        }
        Ok(Self { id, body, source: TemplateSource::User })
    }

    /// Whether the body places the context itself
    pub fn has_context_placeholder(&self) -> bool {
        self.body.contains(CONTEXT_PLACEHOLDER)
    }

    /// Substitute all placeholders
    ///
    /// Content is substituted last so placeholders inside the content are left alone.
    pub fn render(&self, vars: &TemplateVars) -> String {
        self.body
            .replace(LANGUAGE_PLACEHOLDER, &language_display_name(vars.language))
            .replace(CONTEXT_PLACEHOLDER, vars.context.unwrap_or(""))
            .replace(CONTENT_PLACEHOLDER, vars.content)
    }
}

// @struct: One layer of templates, also the user file format
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TemplateSet {
    // @field: Standalone prompts by name
    #[serde(default)]
    pub prompts: BTreeMap<String, String>,

    // @field: Category name -> template name -> body
    #[serde(default)]
    pub categories: BTreeMap<String, BTreeMap<String, String>>,
}

impl TemplateSet {
    /// The templates shipped with the binary
    pub fn built_in() -> Self {
        let mut set = Self::default();
        set.prompts.insert("default".to_string(), DEFAULT_PROMPT.to_string());
        set.prompts.insert("detailed".to_string(), DETAILED_PROMPT.to_string());
        set.prompts.insert("brief".to_string(), BRIEF_PROMPT.to_string());

        let categories = [
            ("short", [("default", SHORT_DEFAULT), ("concise", SHORT_CONCISE)]),
            ("long", [("default", LONG_DEFAULT), ("structured", LONG_STRUCTURED)]),
            ("blog", [("default", BLOG_DEFAULT), ("technical", BLOG_TECHNICAL)]),
        ];
        for (category, templates) in categories {
            let entry = set.categories.entry(category.to_string()).or_default();
            for (name, body) in templates {
                entry.insert(name.to_string(), body.to_string());
            }
        }
        set
    }

    fn get(&self, id: &TemplateId) -> Option<&String> {
        match id {
            TemplateId::Prompt(name) => self.prompts.get(name),
            TemplateId::Category(category, name) => self.categories.get(category)?.get(name),
        }
    }

    fn insert(&mut self, id: &TemplateId, body: String) {
        match id {
            TemplateId::Prompt(name) => {
                self.prompts.insert(name.clone(), body);
            }
            TemplateId::Category(category, name) => {
                self.categories.entry(category.clone()).or_default().insert(name.clone(), body);
            }
        }
    }
}

/// Parsed template id
#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplateId {
    Prompt(String),
    Category(String, String),
}

impl TemplateId {
    fn parse(id: &str) -> Self {
        match id.split_once(':') {
            Some((category, name)) => {
                let name = if name.is_empty() { "default" } else { name };
                Self::Category(category.trim().to_string(), name.trim().to_string())
            }
            None => Self::Prompt(id.trim().to_string()),
        }
    }
}

/// Build a template id from the CLI selection flags
///
/// `template` wins; inside a `category` it becomes `category:template`, and a
/// template that already contains `:` is taken as is. A bare `format` selects
/// the default template of that category.
pub fn resolve_template_id(
    template: Option<&str>,
    category: Option<&str>,
    format: Option<&str>,
    default_id: &str,
) -> String {
    match (template, category.or(format)) {
        (Some(t), _) if t.contains(':') => t.to_string(),
        (Some(t), Some(c)) => format!("{}:{}", c, t),
        (Some(t), None) => t.to_string(),
        (None, Some(c)) => format!("{}:default", c),
        (None, None) => default_id.to_string(),
    }
}

/// Built-in templates with an optional user layer on top
#[derive(Debug, Clone)]
pub struct TemplateStore {
    built_in: TemplateSet,
    user: TemplateSet,
    user_path: Option<PathBuf>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::built_in()
    }
}

impl TemplateStore {
    /// Store without a user layer
    pub fn built_in() -> Self {
        Self {
            built_in: TemplateSet::built_in(),
            user: TemplateSet::default(),
            user_path: None,
        }
    }

    /// Store with an in-memory user layer
    pub fn with_user_set(user: TemplateSet) -> Self {
        Self { user, ..Self::built_in() }
    }

    /// Load the user layer from `path`; a missing file means no user templates
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let user = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let set: TemplateSet = serde_json::from_str(&content)?;
            debug!(
                "Loaded {} user prompts and {} user categories from {}",
                set.prompts.len(), set.categories.len(), path.display()
            );
            set
        } else {
            TemplateSet::default()
        };

        Ok(Self {
            built_in: TemplateSet::built_in(),
            user,
            user_path: Some(path.to_path_buf()),
        })
    }

    /// Path of the user templates file, if any
    pub fn user_path(&self) -> Option<&Path> {
        self.user_path.as_deref()
    }

    /// Look a template up, user layer first
    pub fn resolve(&self, id: &str) -> Result<PromptTemplate, TemplateError> {
        let parsed = TemplateId::parse(id);

        let (body, source) = if let Some(body) = self.user.get(&parsed) {
            (body, TemplateSource::User)
        } else if let Some(body) = self.built_in.get(&parsed) {
            (body, TemplateSource::BuiltIn)
        } else {
            return Err(TemplateError::NotFound(id.to_string()));
        };

        let mut template = PromptTemplate::new(id, body.clone())?;
        template.source = source;
        Ok(template)
    }

    /// Resolve and render in one step
    pub fn render(&self, id: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
        Ok(self.resolve(id)?.render(vars))
    }

    /// Prompt names of both layers with the layer that wins
    pub fn list_prompts(&self) -> Vec<(String, TemplateSource)> {
        let mut names: BTreeMap<String, TemplateSource> = BTreeMap::new();
        for name in self.built_in.prompts.keys() {
            names.insert(name.clone(), TemplateSource::BuiltIn);
        }
        for name in self.user.prompts.keys() {
            names.insert(name.clone(), TemplateSource::User);
        }
        names.into_iter().collect()
    }

    /// Category names of both layers
    pub fn list_categories(&self) -> Vec<String> {
        let mut names: Vec<String> = self.built_in.categories.keys()
            .chain(self.user.categories.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Template names inside a category with the layer that wins
    pub fn list_templates_in_category(&self, category: &str) -> Vec<(String, TemplateSource)> {
        let mut names: BTreeMap<String, TemplateSource> = BTreeMap::new();
        if let Some(templates) = self.built_in.categories.get(category) {
            for name in templates.keys() {
                names.insert(name.clone(), TemplateSource::BuiltIn);
            }
        }
        if let Some(templates) = self.user.categories.get(category) {
            for name in templates.keys() {
                names.insert(name.clone(), TemplateSource::User);
            }
        }
        names.into_iter().collect()
    }

    /// Add or replace a user template and persist the user file
    pub fn save_template(&mut self, id: &str, body: &str) -> Result<(), TemplateError> {
        PromptTemplate::new(id, body)?;
        self.user.insert(&TemplateId::parse(id), body.to_string());

        if let Some(path) = &self.user_path {
            write_template_file(path, &self.user)?;
            info!("Saved template '{}' to {}", id, path.display());
        }
        Ok(())
    }

    /// Write the built-in templates to `path` as an editable starting point
    ///
    /// Returns false when the file exists and `force` is not set.
    pub fn init_default_templates<P: AsRef<Path>>(path: P, force: bool) -> Result<bool, TemplateError> {
        let path = path.as_ref();
        if path.exists() && !force {
            return Ok(false);
        }
        write_template_file(path, &TemplateSet::built_in())?;
        info!("Wrote default templates to {}", path.display());
        Ok(true)
    }
}

fn write_template_file(path: &Path, set: &TemplateSet) -> Result<(), TemplateError> {
    let content = serde_json::to_string_pretty(set)?;
    FileManager::write_to_file(path, &content)
        .map_err(|e| TemplateError::Io(std::io::Error::other(e.to_string())))
}
