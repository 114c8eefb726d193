//! Per-process classification rules mapping window titles to a project,
//! description, and tags.
//!
//! Rules are written as JSON in the configuration file and compiled once at
//! load time into a validated [`Ruleset`]. Classification itself is a pure
//! lookup over the compiled structure.
//!
//! Matching semantics:
//!
//! - Regex patterns are anchored at the start of the title and are
//!   case-sensitive.
//! - `window_contains` keywords are matched as substrings of the lowercased
//!   title, so they should be written in lowercase.
//! - Sub-rules are tried in declaration order; the first one that resolves a
//!   project wins for project, description, and tags.
//! - The marker value `"_"` in a description or tag stands for the
//!   `window_contains` keyword that matched the title.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Marker value substituting the keyword that matched the title.
const USE_MATCH: &str = "_";

/// Errors raised while compiling a ruleset.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Two rule definitions name the same process.
    #[error("duplicate rule for process {0:?}")]
    DuplicateProcess(String),
    /// A regex in the ruleset failed to parse.
    #[error("invalid pattern {pattern:?} for process {process:?}")]
    Pattern {
        process: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// A project pattern has no capture group to extract the project from.
    #[error("project pattern {pattern:?} for process {process:?} has no capture group")]
    MissingCaptureGroup { process: String, pattern: String },
}

/// Matching fields shared by a process rule and its sub-rules, as written
/// in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleBody {
    /// Static project title, assigned when a `window_contains` keyword
    /// matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Regex tried before `window_contains`; its first capture group yields
    /// the project title directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_pattern: Option<String>,
    /// Static description, or `"_"` for the matched keyword.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Regexes tried before `description`; the first one whose first capture
    /// group matches yields the description. Accepts a single pattern or a
    /// list.
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub description_pattern: Vec<String>,
    /// Keywords looked up in the lowercased window title.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub window_contains: Vec<String>,
    /// Static tags, each optionally `"_"` for the matched keyword.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Rule definition for one process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDef {
    /// Process name this rule applies to (exact match).
    pub process: String,
    #[serde(flatten)]
    pub body: RuleBody,
    /// Remaps resolved project titles, whichever rule body resolved them.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub alias: BTreeMap<String, String>,
    /// Sub-rules tried in order before the fields above.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subprojects: Vec<RuleBody>,
}

/// Accepts either a single pattern string or a list of patterns.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(pattern) => vec![pattern],
        OneOrMany::Many(patterns) => patterns,
    })
}

/// Result of classifying one focus record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Resolved project title, after alias remapping. Never empty.
    pub project: String,
    /// Resolved time entry description.
    pub description: Option<String>,
    /// Resolved tags, deduplicated.
    pub tags: BTreeSet<String>,
}

/// A compiled, validated ruleset ready for classification.
#[derive(Debug, Default)]
pub struct Ruleset {
    rules: HashMap<String, ProcessRule>,
}

#[derive(Debug)]
struct ProcessRule {
    rule: CompiledRule,
    sub_rules: Vec<CompiledRule>,
    aliases: BTreeMap<String, String>,
}

#[derive(Debug)]
struct CompiledRule {
    project: Option<String>,
    project_pattern: Option<Regex>,
    description: Option<TextTemplate>,
    description_patterns: Vec<Regex>,
    window_contains: Vec<String>,
    tags: Vec<TextTemplate>,
}

/// A literal text value, or the `"_"` marker standing in for the keyword
/// that matched the title.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TextTemplate {
    Literal(String),
    MatchedKeyword,
}

impl TextTemplate {
    fn parse(raw: &str) -> Self {
        if raw == USE_MATCH {
            Self::MatchedKeyword
        } else {
            Self::Literal(raw.to_string())
        }
    }

    /// Resolves to text, or `None` when the marker has no keyword to
    /// substitute.
    fn resolve(&self, keyword: Option<&str>) -> Option<String> {
        match self {
            Self::Literal(text) => Some(text.clone()),
            Self::MatchedKeyword => keyword.map(str::to_string),
        }
    }
}

impl Ruleset {
    /// Compiles rule definitions, validating every pattern.
    pub fn compile(defs: &[RuleDef]) -> Result<Self, RuleError> {
        let mut rules = HashMap::with_capacity(defs.len());
        for def in defs {
            if rules.contains_key(&def.process) {
                return Err(RuleError::DuplicateProcess(def.process.clone()));
            }
            let rule = CompiledRule::compile(&def.process, &def.body)?;
            let sub_rules = def
                .subprojects
                .iter()
                .map(|sub| CompiledRule::compile(&def.process, sub))
                .collect::<Result<Vec<_>, _>>()?;
            rules.insert(
                def.process.clone(),
                ProcessRule {
                    rule,
                    sub_rules,
                    aliases: def.alias.clone(),
                },
            );
        }
        tracing::debug!(processes = rules.len(), "compiled classification rules");
        Ok(Self { rules })
    }

    /// True when no process has a rule, so nothing can classify.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolves `process` and `title` to a classification, or `None` when no
    /// rule matches or no project could be determined.
    pub fn classify(&self, process: &str, title: &str) -> Option<Classification> {
        let rule = self.rules.get(process)?;
        let title_lower = title.to_lowercase();

        let (matched, project, keyword) = rule
            .sub_rules
            .iter()
            .find_map(|sub| {
                sub.resolve_project(title, &title_lower)
                    .map(|(project, keyword)| (sub, project, keyword))
            })
            .or_else(|| {
                rule.rule
                    .resolve_project(title, &title_lower)
                    .map(|(project, keyword)| (&rule.rule, project, keyword))
            })?;

        let project = rule.aliases.get(&project).cloned().unwrap_or(project);
        if project.is_empty() {
            return None;
        }

        let description = matched.resolve_description(title, keyword);

        let mut tags: BTreeSet<String> = matched
            .tags
            .iter()
            .filter_map(|tag| tag.resolve(keyword))
            .collect();
        tags.extend(rule.rule.tags.iter().filter_map(|tag| tag.resolve(None)));

        tracing::trace!(process, title, project, "classified record");
        Some(Classification {
            project,
            description,
            tags,
        })
    }
}

impl CompiledRule {
    fn compile(process: &str, body: &RuleBody) -> Result<Self, RuleError> {
        let project_pattern = body
            .project_pattern
            .as_deref()
            .map(|pattern| anchored(process, pattern))
            .transpose()?;
        if let Some(regex) = &project_pattern {
            if regex.captures_len() < 2 {
                return Err(RuleError::MissingCaptureGroup {
                    process: process.to_string(),
                    pattern: body.project_pattern.clone().unwrap_or_default(),
                });
            }
        }
        let description_patterns = body
            .description_pattern
            .iter()
            .map(|pattern| anchored(process, pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            project: body.project.clone(),
            project_pattern,
            description: body.description.as_deref().map(TextTemplate::parse),
            description_patterns,
            window_contains: body.window_contains.clone(),
            tags: body.tags.iter().map(|tag| TextTemplate::parse(tag)).collect(),
        })
    }

    /// Resolves the project this rule body assigns to `title`, along with
    /// the `window_contains` keyword that matched, if any.
    ///
    /// The project pattern is tried first; an empty capture falls through to
    /// the keyword list.
    fn resolve_project(&self, title: &str, title_lower: &str) -> Option<(String, Option<&str>)> {
        if let Some(pattern) = &self.project_pattern {
            if let Some(project) = pattern.captures(title).and_then(|caps| caps.get(1)) {
                if !project.as_str().is_empty() {
                    return Some((project.as_str().to_string(), None));
                }
            }
        }
        let keyword = self
            .window_contains
            .iter()
            .find(|keyword| title_lower.contains(keyword.as_str()))
            .map(String::as_str)?;
        let project = self.project.as_deref().filter(|project| !project.is_empty())?;
        Some((project.to_string(), Some(keyword)))
    }

    /// Patterns lacking a first capture group are skipped rather than
    /// treated as matches.
    fn resolve_description(&self, title: &str, keyword: Option<&str>) -> Option<String> {
        for pattern in &self.description_patterns {
            if let Some(capture) = pattern.captures(title).and_then(|caps| caps.get(1)) {
                return Some(capture.as_str().to_string());
            }
        }
        self.description
            .as_ref()
            .and_then(|template| template.resolve(keyword))
    }
}

/// Compiles `pattern` anchored at the start of the haystack. Rules use
/// match semantics, not search.
fn anchored(process: &str, pattern: &str) -> Result<Regex, RuleError> {
    Regex::new(&format!("^(?:{pattern})")).map_err(|source| RuleError::Pattern {
        process: process.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}
