//! Rule-file loader.
//!
//! A rule source is either a YAML file or a directory whose `*.yaml` /
//! `*.yml` entries are read in lexical order.  Every file holds a sequence
//! of rule records.  Any error aborts the whole load: a malformed rule is
//! never dropped silently.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crawlguard_types::ActionSpec;
use thiserror::Error;
use tracing::{debug, warn};

use crate::rule::{Rule, RuleDocument, RuleError};

/// Fatal configuration errors raised while loading rule sources.
#[derive(Error, Debug)]
pub enum RuleLoadError {
    #[error("failed to read rule source {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse rule file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid rule '{rule_id}' in {path}: {source}")]
    Invalid {
        path: PathBuf,
        rule_id: String,
        source: RuleError,
    },

    #[error("duplicate rule id '{rule_id}' in {path} (first defined in {first})")]
    DuplicateId {
        rule_id: String,
        path: PathBuf,
        first: PathBuf,
    },

    #[error("no rules found in {sources}")]
    NoRules { sources: String },
}

/// Parse the rules held in one YAML document.  `origin` is only used for
/// error context.
pub fn parse_rules(yaml: &str, origin: &Path) -> Result<Vec<Rule>, RuleLoadError> {
    let has_content = yaml
        .lines()
        .map(str::trim)
        .any(|l| !l.is_empty() && !l.starts_with('#') && l != "---");
    if !has_content {
        return Ok(Vec::new());
    }

    let docs: Option<Vec<RuleDocument>> =
        serde_yaml::from_str(yaml).map_err(|source| RuleLoadError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

    docs.unwrap_or_default()
        .into_iter()
        .map(|doc| {
            let rule_id = doc.id.clone();
            let rule = Rule::from_document(doc).map_err(|source| RuleLoadError::Invalid {
                path: origin.to_path_buf(),
                rule_id,
                source,
            })?;
            for action in &rule.enforcement_action {
                if let ActionSpec::Unknown { identifier, .. } = action {
                    warn!(
                        rule_id = %rule.id,
                        action = %identifier,
                        path = %origin.display(),
                        "unknown enforcement action; it will be reported as failed at dispatch"
                    );
                }
            }
            Ok(rule)
        })
        .collect()
}

/// Load every rule from `sources`, in source order.
///
/// Returns an empty vector when the sources hold no rules; callers that
/// expect rules should use
/// [`RulesEngine::from_sources`][crate::rules_engine::RulesEngine::from_sources],
/// which treats that as an error.
///
/// # Errors
///
/// Any unreadable source, YAML error, invalid rule, or duplicate rule id.
pub fn load_rules<P: AsRef<Path>>(sources: &[P]) -> Result<Vec<Rule>, RuleLoadError> {
    let mut rules = Vec::new();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for source in sources {
        for path in expand_source(source.as_ref())? {
            let raw = fs::read_to_string(&path).map_err(|source| RuleLoadError::Io {
                path: path.clone(),
                source,
            })?;
            let parsed = parse_rules(&raw, &path)?;
            debug!(path = %path.display(), count = parsed.len(), "loaded rule file");

            for rule in parsed {
                if let Some(first) = seen.get(&rule.id) {
                    return Err(RuleLoadError::DuplicateId {
                        rule_id: rule.id,
                        path,
                        first: first.clone(),
                    });
                }
                seen.insert(rule.id.clone(), path.clone());
                rules.push(rule);
            }
        }
    }
    Ok(rules)
}

// Resolve a source into the list of files it stands for.
fn expand_source(source: &Path) -> Result<Vec<PathBuf>, RuleLoadError> {
    let io_err = |e| RuleLoadError::Io {
        path: source.to_path_buf(),
        source: e,
    };

    if !source.is_dir() {
        return Ok(vec![source.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(source).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml");
        if path.is_file() && is_yaml {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
