//! Site configuration module.
//!
//! Handles loading, validating, and merging `site.toml`. Stock defaults
//! describe a conventional layout, so a source directory with just
//! `template.html` and `content.json` builds without any config file. A
//! `site.toml` next to them overrides only the keys it names.
//!
//! ## Source Directory Layout
//!
//! ```text
//! src/
//! ├── site.toml          # Optional overrides
//! ├── template.html      # Page template with {{…}} placeholders
//! ├── content.json       # Content document (also edited in place)
//! ├── styles.css         # Static files, copied when present
//! └── assets/            # Asset directories, copied recursively
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [build]
//! template = "template.html"
//! content = "content.json"
//! output_file = "index.html"
//!
//! [assets]
//! dirs = ["assets"]
//! files = ["styles.css", "main.js", "editor.js"]
//! root_files = ["robots.txt", "sitemap.xml", "llms.txt"]
//!
//! [identity]
//! business_type = "LocalBusiness"
//! business_name = ""
//! person_name = ""
//! job_title = ""
//! url = ""
//! locality = ""
//! region = ""
//! country = ""
//! areas_served = []
//! alumni = []
//! works_for = ""
//! knows_about = []
//!
//! [editor]
//! owner = ""                       # Empty: ask on first edit
//! name = ""
//! content_path = "src/content.json"
//! api_base = "https://api.github.com"
//! commit_message = "Update content via editor"
//! storage_prefix = "simple-page-editor"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};
use thiserror::Error;

/// Name of the config file inside the source directory.
pub const CONFIG_FILENAME: &str = "site.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `site.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Input and output file names.
    pub build: BuildConfig,
    /// Static files and directories copied next to the page.
    pub assets: AssetsConfig,
    /// Who the site describes; feeds the structured-data records.
    pub identity: IdentityConfig,
    /// Remote content store used by the edit session.
    pub editor: EditorConfig,
}

impl SiteConfig {
    /// Validate config values are usable before any file is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("build.template", &self.build.template),
            ("build.content", &self.build.content),
            ("build.output_file", &self.build.output_file),
        ] {
            if !is_plain_relative(value) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a relative path inside the directory, got {value:?}"
                )));
            }
        }
        let asset_paths = self
            .assets
            .dirs
            .iter()
            .chain(&self.assets.files)
            .chain(&self.assets.root_files);
        for path in asset_paths {
            if !is_plain_relative(path) {
                return Err(ConfigError::Validation(format!(
                    "asset paths must be relative with no '..', got {path:?}"
                )));
            }
        }
        if self.editor.content_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "editor.content_path must not be empty".into(),
            ));
        }
        let api_base = url::Url::parse(&self.editor.api_base).ok();
        let usable = api_base
            .as_ref()
            .is_some_and(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty()));
        if !usable {
            return Err(ConfigError::Validation(format!(
                "editor.api_base must be an http(s) URL with a host, got {:?}",
                self.editor.api_base
            )));
        }
        Ok(())
    }
}

/// True for a non-empty relative path that never climbs out of its base.
fn is_plain_relative(path: &str) -> bool {
    !path.trim().is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Input and output file names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Page template, relative to the source directory.
    pub template: String,
    /// Content document, relative to the source directory.
    pub content: String,
    /// Rendered page, relative to the output directory.
    pub output_file: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            template: "template.html".to_string(),
            content: "content.json".to_string(),
            output_file: "index.html".to_string(),
        }
    }
}

/// Static files copied into the output directory when they exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    /// Directories under the source directory, copied recursively.
    pub dirs: Vec<String>,
    /// Single files under the source directory.
    pub files: Vec<String>,
    /// Single files under the project root (robots.txt and friends).
    pub root_files: Vec<String>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dirs: vec!["assets".to_string()],
            files: vec![
                "styles.css".to_string(),
                "main.js".to_string(),
                "editor.js".to_string(),
            ],
            root_files: vec![
                "robots.txt".to_string(),
                "sitemap.xml".to_string(),
                "llms.txt".to_string(),
            ],
        }
    }
}

/// Identity of the business and person the page presents.
///
/// Empty values are left out of the generated records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// schema.org type of the organization record (e.g. `MedicalBusiness`).
    pub business_type: String,
    pub business_name: String,
    pub person_name: String,
    pub job_title: String,
    /// Canonical URL of the published site.
    pub url: String,
    pub locality: String,
    pub region: String,
    /// ISO country code for the postal address.
    pub country: String,
    /// Cities served; the first one is used for individual service records.
    pub areas_served: Vec<String>,
    /// Schools the person graduated from.
    pub alumni: Vec<String>,
    /// Organization the person works for.
    pub works_for: String,
    pub knows_about: Vec<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            business_type: "LocalBusiness".to_string(),
            business_name: String::new(),
            person_name: String::new(),
            job_title: String::new(),
            url: String::new(),
            locality: String::new(),
            region: String::new(),
            country: String::new(),
            areas_served: Vec::new(),
            alumni: Vec::new(),
            works_for: String::new(),
            knows_about: Vec::new(),
        }
    }
}

/// Remote content store used by `edit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Repository owner. Empty means "ask the editor".
    pub owner: String,
    /// Repository name. Empty means "ask the editor".
    pub name: String,
    /// Path of the content document inside the repository.
    pub content_path: String,
    /// Base URL of the contents API.
    pub api_base: String,
    /// Commit message used for every publish.
    pub commit_message: String,
    /// Prefix for keys in the editor's local key/value store.
    pub storage_prefix: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            name: String::new(),
            content_path: "src/content.json".to_string(),
            api_base: "https://api.github.com".to_string(),
            commit_message: "Update content via editor".to_string(),
            storage_prefix: "simple-page-editor".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `site.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `site.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `site.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `site.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Simple Page Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Build inputs and output
# ---------------------------------------------------------------------------
[build]
# Page template, relative to the source directory.
template = "template.html"

# Content document, relative to the source directory.
content = "content.json"

# Rendered page, relative to the output directory.
output_file = "index.html"

# ---------------------------------------------------------------------------
# Static assets (copied when present, skipped silently when absent)
# ---------------------------------------------------------------------------
[assets]
# Directories under the source directory, copied recursively.
dirs = ["assets"]

# Files under the source directory.
files = ["styles.css", "main.js", "editor.js"]

# Files under the project root.
root_files = ["robots.txt", "sitemap.xml", "llms.txt"]

# ---------------------------------------------------------------------------
# Identity (structured data for search engines)
# ---------------------------------------------------------------------------
[identity]
# schema.org type of the business record.
business_type = "LocalBusiness"
business_name = ""
person_name = ""
job_title = ""

# Canonical URL of the published site.
url = ""

# Postal address.
locality = ""
region = ""
country = ""

# Cities served. The first one is used for each service record.
areas_served = []

# Schools, employer and topics for the person record.
alumni = []
works_for = ""
knows_about = []

# ---------------------------------------------------------------------------
# Editor (publishing edits back to the hosted repository)
# ---------------------------------------------------------------------------
[editor]
# Repository owner and name. Leave empty to be asked on first edit.
owner = ""
name = ""

# Path of the content document inside the repository.
content_path = "src/content.json"

# Base URL of the contents API.
api_base = "https://api.github.com"

# Commit message used for every publish.
commit_message = "Update content via editor"

# Prefix for keys in the editor's local state file.
storage_prefix = "simple-page-editor"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_build_names() {
        let config = SiteConfig::default();
        assert_eq!(config.build.template, "template.html");
        assert_eq!(config.build.content, "content.json");
        assert_eq!(config.build.output_file, "index.html");
    }

    #[test]
    fn default_config_has_asset_allow_list() {
        let config = SiteConfig::default();
        assert_eq!(config.assets.dirs, vec!["assets"]);
        assert_eq!(config.assets.files, vec!["styles.css", "main.js", "editor.js"]);
        assert_eq!(
            config.assets.root_files,
            vec!["robots.txt", "sitemap.xml", "llms.txt"]
        );
    }

    #[test]
    fn default_editor_is_unconfigured_repository() {
        let config = SiteConfig::default();
        assert!(config.editor.owner.is_empty());
        assert!(config.editor.name.is_empty());
        assert_eq!(config.editor.content_path, "src/content.json");
        assert_eq!(config.editor.api_base, "https://api.github.com");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[identity]
person_name = "Nuno Jorge"
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.identity.person_name, "Nuno Jorge");
        assert_eq!(config.identity.business_type, "LocalBusiness");
        assert_eq!(config.build.template, "template.html");
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.build.content, "content.json");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[editor]
owner = "nuno"
name = "site"
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.editor.owner, "nuno");
        assert_eq!(config.editor.name, "site");
        assert_eq!(config.editor.commit_message, "Update content via editor");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "this is not valid toml [[[").unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str(
            r#"
[build]
templte = "page.html"
"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[colours]\nx = 1\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[assets]
dirs = ["assets"]
files = ["styles.css"]
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[assets]
files = ["site.css"]
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let assets = merged.get("assets").unwrap();
        assert_eq!(assets.get("files").unwrap().as_array().unwrap().len(), 1);
        assert_eq!(
            assets.get("files").unwrap().as_array().unwrap()[0].as_str(),
            Some("site.css")
        );
        assert!(assets.get("dirs").is_some());
    }

    #[test]
    fn merge_toml_arrays_replace_rather_than_append() {
        let base: toml::Value = toml::from_str(r#"list = [1, 2, 3]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"list = [9]"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("list").unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn merge_toml_preserves_base_keys() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("a = 10").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("a").unwrap().as_integer(), Some(10));
        assert_eq!(merged.get("b").unwrap().as_integer(), Some(2));
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_template() {
        let mut config = SiteConfig::default();
        config.build.template = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("build.template"));
    }

    #[test]
    fn validate_rejects_parent_dir_asset() {
        let mut config = SiteConfig::default();
        config.assets.files.push("../secrets.env".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_absolute_output() {
        let mut config = SiteConfig::default();
        config.build.output_file = "/etc/index.html".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_allows_nested_relative_paths() {
        let mut config = SiteConfig::default();
        config.assets.dirs = vec!["static/img".to_string(), "./fonts".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_http_api_base() {
        let mut config = SiteConfig::default();
        config.editor.api_base = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_api_base_needs_a_host() {
        let mut config = SiteConfig::default();
        for bad in ["http://", "https://", "api.github.com", "not a url"] {
            config.editor.api_base = bad.to_string();
            assert!(config.validate().is_err(), "{bad} accepted");
        }
        config.editor.api_base = "http://localhost:8080/api".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            "[editor]\ncontent_path = \"\"\n",
        )
        .unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // stock_config_toml / stock_defaults_value tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.build.template, defaults.build.template);
        assert_eq!(config.assets.files, defaults.assets.files);
        assert_eq!(config.assets.root_files, defaults.assets.root_files);
        assert_eq!(config.identity.business_type, defaults.identity.business_type);
        assert_eq!(config.editor.content_path, defaults.editor.content_path);
        assert_eq!(config.editor.storage_prefix, defaults.editor.storage_prefix);
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in ["[build]", "[assets]", "[identity]", "[editor]"] {
            assert!(content.contains(section), "missing {section}");
        }
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        assert!(val.is_table());
        for key in ["build", "assets", "identity", "editor"] {
            assert!(val.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn resolve_config_with_overlay() {
        let overlay: toml::Value = toml::from_str("[build]\noutput_file = \"home.html\"\n").unwrap();
        let config = resolve_config(stock_defaults_value(), Some(overlay)).unwrap();
        assert_eq!(config.build.output_file, "home.html");
        assert_eq!(config.build.template, "template.html");
    }
}
