use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::Deserialize;
use tracing::warn;

use crate::entry::{AuthorKeys, DEFAULT_CREATOR_NAMES, DEFAULT_FAMILY_NAMES, DEFAULT_GIVEN_NAMES};
use crate::store::{write_atomic, FieldKind};

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "authslot";

#[derive(Debug, Clone)]
pub struct Config {
    /// Where the configuration was read from; `None` when running on defaults.
    pub config_path: Option<PathBuf>,
    pub store: Option<PathBuf>,
    pub author: AuthorKeys,
    pub fields: BTreeMap<String, FieldKind>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: None,
            store: None,
            author: AuthorKeys::default(),
            fields: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn field_kind(&self, field: &str) -> Option<FieldKind> {
        self.fields.get(field).copied()
    }
}

// =============================================================================
// File representation
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    store: Option<PathBuf>,
    #[serde(default)]
    author: AuthorSection,
    #[serde(default)]
    fields: BTreeMap<String, FieldKind>,
}

#[derive(Debug, Deserialize)]
struct AuthorSection {
    #[serde(default = "default_creator_names")]
    creator_names: String,
    #[serde(default = "default_family_names")]
    family_names: String,
    #[serde(default = "default_given_names")]
    given_names: String,
}

impl Default for AuthorSection {
    fn default() -> Self {
        Self {
            creator_names: default_creator_names(),
            family_names: default_family_names(),
            given_names: default_given_names(),
        }
    }
}

impl AuthorSection {
    fn into_keys(self) -> Result<AuthorKeys> {
        let keys = AuthorKeys {
            creator_names: self.creator_names.trim().to_string(),
            family_names: self.family_names.trim().to_string(),
            given_names: self.given_names.trim().to_string(),
        };

        let mut seen = HashSet::new();
        for key in keys.all() {
            if key.is_empty() {
                bail!("author key names must not be empty");
            }
            if !seen.insert(key) {
                bail!("author key `{}` is used for more than one name sequence", key);
            }
        }
        Ok(keys)
    }
}

fn default_creator_names() -> String {
    DEFAULT_CREATOR_NAMES.to_string()
}

fn default_family_names() -> String {
    DEFAULT_FAMILY_NAMES.to_string()
}

fn default_given_names() -> String {
    DEFAULT_GIVEN_NAMES.to_string()
}

// =============================================================================
// Locations
// =============================================================================

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

// =============================================================================
// Loading
// =============================================================================

/// Load configuration from `explicit`, or from the default location.
///
/// A missing file at the default location yields defaults; a missing file
/// that was asked for by path is an error.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            let path = expand_tilde(path);
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            path
        }
        None => {
            let path = default_config_path()?;
            if !path.exists() {
                return Ok(Config::default());
            }
            path
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;

    let mut config = parse(&raw)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    config.config_path = Some(path);
    Ok(config)
}

pub fn parse(raw: &str) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw).context("failed to parse configuration as TOML")?;

    warn_unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .context("failed to deserialize configuration")?;

    let author = cfg_file
        .author
        .into_keys()
        .context("invalid [author] section")?;

    if let Some(empty) = cfg_file.fields.keys().find(|field| field.trim().is_empty()) {
        bail!("[fields] contains an empty field identifier `{}`", empty);
    }

    Ok(Config {
        config_path: None,
        store: cfg_file.store.as_deref().map(expand_tilde),
        author,
        fields: cfg_file.fields,
    })
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn warn_unknown_keys(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    let known = HashSet::from(["store", "author", "fields"]);
    for key in table.keys() {
        if !known.contains(key.as_str()) {
            warn!("unknown configuration key `{}`", key);
        }
    }

    if let Some(author) = table.get("author").and_then(toml::Value::as_table) {
        let known = HashSet::from(["creator_names", "family_names", "given_names"]);
        for key in author.keys() {
            if !known.contains(key.as_str()) {
                warn!("unknown author.* key `{}`", key);
            }
        }
    }
}

// =============================================================================
// Init
// =============================================================================

pub fn default_config_toml(store: Option<&Path>) -> String {
    let store_line = match store {
        Some(path) => format!("store = {}\n", toml::Value::String(path.display().to_string())),
        None => "# store = \"~/records/item.json\"\n".to_string(),
    };

    format!(
        "{store_line}
[author]
creator_names = \"{DEFAULT_CREATOR_NAMES}\"
family_names = \"{DEFAULT_FAMILY_NAMES}\"
given_names = \"{DEFAULT_GIVEN_NAMES}\"

# Field kinds: \"list\" for repeated author entries, \"single\" otherwise.
[fields]
"
    )
}

pub fn write_default(path: &Path, store: Option<&Path>, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "configuration file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    write_atomic(path, default_config_toml(store).as_bytes())
        .with_context(|| format!("failed to write configuration to {}", path.display()))
}
