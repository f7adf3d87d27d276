//! The `kite.json` project file.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

pub const PROJECT_FILE_NAME: &str = "kite.json";

/// Boolean options accept `true` as well as `"true"`, `"yes"`, `"on"` or `"1"`.
fn deserialize_bool_or_string<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolOrString::Bool(b)) => Ok(Some(b)),
        Some(BoolOrString::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(Error::custom(format!(
                "invalid boolean value: '{s}'. Expected true, false, 'true', or 'false'"
            ))),
        },
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
    /// Name of the `.kmeta` module `compile` writes.
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub repl: ReplConfig,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReplConfig {
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub embedded: Option<bool>,
    #[serde(default)]
    pub prompt: Option<String>,
}

pub fn parse_project_config(source: &str) -> Result<ProjectConfig> {
    let config = serde_json::from_str(source).context("failed to parse project JSON")?;
    Ok(config)
}

/// Read `path` and make its relative paths relative to the file's directory.
pub fn load_project_config(path: &Path) -> Result<ProjectConfig> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read project file: {}", path.display()))?;
    let mut config = parse_project_config(&source)
        .with_context(|| format!("failed to parse project file: {}", path.display()))?;

    let base = path.parent().unwrap_or(Path::new(""));
    let rebase = |entry: &mut PathBuf| {
        if entry.is_relative() {
            *entry = base.join(&*entry);
        }
    };
    config.sources.iter_mut().for_each(rebase);
    config.classpath.iter_mut().for_each(rebase);
    if let Some(out_dir) = config.out_dir.as_mut() {
        rebase(out_dir);
    }
    Ok(config)
}

/// The project file to use: `explicit` (a file, or a directory holding
/// `kite.json`), else `kite.json` in `cwd` when it exists.
pub fn resolve_project_path(cwd: &Path, explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    let Some(explicit) = explicit else {
        let candidate = cwd.join(PROJECT_FILE_NAME);
        return Ok(candidate.is_file().then_some(candidate));
    };

    let mut candidate = if explicit.is_absolute() {
        explicit.to_path_buf()
    } else {
        cwd.join(explicit)
    };
    if candidate.is_dir() {
        candidate = candidate.join(PROJECT_FILE_NAME);
    }
    if !candidate.is_file() {
        bail!("project file not found at {}", candidate.display());
    }
    Ok(Some(candidate))
}

/// Load the project file `resolve_project_path` picks, or an empty config.
pub fn load_config(cwd: &Path, explicit: Option<&Path>) -> Result<ProjectConfig> {
    match resolve_project_path(cwd, explicit)? {
        Some(path) => load_project_config(&path),
        None => Ok(ProjectConfig::default()),
    }
}
