//! Agent catalog: named definitions loaded from markdown files.
//!
//! A definition file is YAML frontmatter between `---` fences followed by a
//! markdown body. The frontmatter names and describes the agent; the body
//! becomes its system prompt verbatim.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConductorError;

/// One named agent: what callers select by name and what the engine gets
/// primed with.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDefinition {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    /// File the definition was loaded from, when it came from disk.
    pub source_path: Option<PathBuf>,
}

/// In-memory catalog keyed by agent name.
#[derive(Debug, Clone, Default)]
pub struct AgentCatalog {
    agents: HashMap<String, AgentDefinition>,
}

#[derive(Debug, Default, Deserialize)]
struct Frontmatter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl AgentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.md` definition in `dir`.
    ///
    /// An absent directory yields an empty catalog; an unreadable directory
    /// or a malformed definition file is an error.
    pub fn load_dir(dir: &Path) -> Result<Self, ConductorError> {
        let mut catalog = Self::new();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(catalog),
            Err(err) => {
                return Err(ConductorError::InvalidConfig {
                    reason: format!("failed to read agents dir {}: {err}", dir.display()),
                });
            }
        };
        for entry in entries {
            let entry = entry.map_err(|err| ConductorError::InvalidConfig {
                reason: format!("failed to read agents dir {}: {err}", dir.display()),
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
                continue;
            }
            let contents =
                fs::read_to_string(&path).map_err(|err| ConductorError::InvalidConfig {
                    reason: format!("failed to read {}: {err}", path.display()),
                })?;
            catalog.insert(parse_definition(&path, &contents)?);
        }
        Ok(catalog)
    }

    /// Register or replace a definition under its name.
    pub fn insert(&mut self, definition: AgentDefinition) {
        self.agents.insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&AgentDefinition> {
        self.agents.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// All agent names, sorted for deterministic listings.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Parse one markdown definition file.
fn parse_definition(path: &Path, contents: &str) -> Result<AgentDefinition, ConductorError> {
    let sanitized = contents.strip_prefix('\u{feff}').unwrap_or(contents);
    let (frontmatter_src, body) = split_frontmatter(sanitized)
        .ok_or_else(|| invalid_definition(path, "missing `---` frontmatter fence"))?;
    let frontmatter: Frontmatter = if frontmatter_src.trim().is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(&frontmatter_src)
            .map_err(|err| invalid_definition(path, &err.to_string()))?
    };

    // The file stem names the agent when the frontmatter does not.
    let fallback_name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("agent")
        .to_string();
    let name = frontmatter
        .name
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or(fallback_name, str::to_string);
    let description = frontmatter
        .description
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    let system_prompt = body.trim();
    if system_prompt.is_empty() {
        return Err(invalid_definition(path, "definition has no instructions body"));
    }

    Ok(AgentDefinition {
        name,
        description,
        system_prompt: system_prompt.to_string(),
        source_path: Some(path.to_path_buf()),
    })
}

fn invalid_definition(path: &Path, detail: &str) -> ConductorError {
    ConductorError::InvalidConfig {
        reason: format!("agent definition {}: {detail}", path.display()),
    }
}

/// Split `contents` into (frontmatter, body) around the `---` fences.
/// Returns `None` when there is no opening fence or no closing fence.
fn split_frontmatter(contents: &str) -> Option<(String, &str)> {
    let trimmed = contents.trim_start_matches(['\n', '\r', ' ', '\t']);
    let rest = strip_leading_newline(trimmed.strip_prefix("---")?);
    let (frontmatter_raw, tail) = match rest.strip_prefix("---") {
        // Empty frontmatter block: the closing fence follows immediately.
        Some(tail) => ("", tail),
        None => {
            let closing = rest.find("\n---")?;
            (&rest[..closing], &rest[closing + "\n---".len()..])
        }
    };
    // CRLF files would otherwise leave stray carriage returns in the YAML.
    let frontmatter = frontmatter_raw.replace('\r', "");
    let body = strip_leading_newline(tail);
    Some((frontmatter, body))
}

fn strip_leading_newline(value: &str) -> &str {
    if let Some(stripped) = value.strip_prefix("\r\n") {
        stripped
    } else if let Some(stripped) = value.strip_prefix('\n') {
        stripped
    } else {
        value
    }
}
