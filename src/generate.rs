//! Site build: one template, one content document, one page.
//!
//! ```text
//! src/
//! ├── site.toml          # optional, see config
//! ├── template.html      # {{placeholders}} and {{#each}} blocks
//! ├── content.json       # the content document
//! ├── styles.css         # static files, copied when present
//! └── assets/            # asset directories, copied recursively
//! robots.txt             # root-level files, copied when present
//!
//! dist/
//! ├── index.html
//! ├── styles.css
//! ├── assets/…
//! └── robots.txt
//! ```
//!
//! ## Steps
//!
//! 1. Load `site.toml` (stock defaults when absent).
//! 2. Read the template and the content document.
//! 3. Add derived values under `computed` (see [`derive_computed`]).
//! 4. Parse and render the template.
//! 5. Insert the structured-data blocks before `</head>`.
//! 6. Write the page, then copy the asset allow-list.
//!
//! Every step before the page write is fallible and aborts the build, so a
//! broken template or document never produces a partial site. Optional
//! assets that do not exist are skipped and reported, not treated as errors.

use crate::config::{self, ConfigError, SiteConfig};
use crate::path::{PathError, assign, resolve};
use crate::structured_data;
use crate::template::{Template, TemplateError, is_well_formed_path, text_of};
use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("content document must be a JSON object, found {0}")]
    NotAnObject(&'static str),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("cannot add derived value: {0}")]
    Derived(#[from] PathError),
    #[error("cannot copy assets: {0}")]
    Walk(#[from] walkdir::Error),
}

const WHATSAPP_SEND: &str = "https://api.whatsapp.com/send";

/// What a build wrote, copied, and skipped. Paths are relative to their base.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BuildReport {
    pub output_dir: PathBuf,
    pub page: PathBuf,
    /// Structured-data records injected into the page.
    pub structured_data: usize,
    pub copied: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// What `check` found without writing anything.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CheckReport {
    pub template: PathBuf,
    pub content: PathBuf,
    /// Document paths the template reads, in first-use order.
    pub fields: Vec<String>,
    /// Referenced paths that do not resolve in the content document.
    pub missing: Vec<String>,
    /// Referenced paths with an empty segment (`items..title`).
    pub malformed: Vec<String>,
}

/// Add values computed from the content document under `computed`.
///
/// `computed.whatsapp_url` is the click-to-chat link for
/// `contact.whatsapp_number` with `contact.whatsapp_message` as the
/// prefilled text. It is only added when a number is present. An existing
/// `computed` mapping keeps its other keys.
pub fn derive_computed(content: &mut Value) -> Result<(), GenerateError> {
    let number = text_of(resolve(content, "contact.whatsapp_number"));
    if number.is_empty() {
        return Ok(());
    }
    let message = text_of(resolve(content, "contact.whatsapp_message"));
    let url = format!(
        "{WHATSAPP_SEND}?phone={}&text={}",
        number,
        urlencoding::encode(&message)
    );
    assign(content, "computed.whatsapp_url", Value::String(url))?;
    Ok(())
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "an object",
    }
}

fn read(path: &Path) -> Result<String, GenerateError> {
    fs::read_to_string(path).map_err(|source| GenerateError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and parse the content document. The root must be a mapping.
pub fn load_content(path: &Path) -> Result<Value, GenerateError> {
    let text = read(path)?;
    let content: Value = serde_json::from_str(&text).map_err(|source| GenerateError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if !content.is_object() {
        return Err(GenerateError::NotAnObject(kind_name(&content)));
    }
    Ok(content)
}

/// Render the page HTML from a parsed template and document.
pub fn render_page(template: &Template, content: &Value, config: &SiteConfig) -> String {
    let html = template.render(content);
    let blocks = structured_data::generate(content, &config.identity);
    structured_data::inject(&html, &blocks)
}

/// Build the site from `source` into `output`.
///
/// `root` holds the root-level files (`robots.txt`, …); it is normally the
/// parent of `source`.
pub fn build(source: &Path, root: &Path, output: &Path) -> Result<BuildReport, GenerateError> {
    let config = config::load_config(source)?;

    let template = Template::parse(&read(&source.join(&config.build.template))?)?;
    let mut content = load_content(&source.join(&config.build.content))?;
    derive_computed(&mut content)?;

    let html = render_page(&template, &content, &config);

    fs::create_dir_all(output)?;
    let page = PathBuf::from(&config.build.output_file);
    let page_path = output.join(&page);
    if let Some(parent) = page_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&page_path, html)?;
    info!("wrote {}", page_path.display());

    let mut report = BuildReport {
        output_dir: output.to_path_buf(),
        page,
        structured_data: structured_data::records(&content, &config.identity).len(),
        ..BuildReport::default()
    };

    for dir in &config.assets.dirs {
        copy_dir(source, dir, output, &mut report)?;
    }
    for file in &config.assets.files {
        copy_file(source, file, output, &mut report)?;
    }
    for file in &config.assets.root_files {
        copy_file(root, file, output, &mut report)?;
    }

    Ok(report)
}

fn copy_file(base: &Path, name: &str, output: &Path, report: &mut BuildReport) -> Result<(), GenerateError> {
    let src = base.join(name);
    if !src.is_file() {
        debug!("skipping absent asset {}", src.display());
        report.skipped.push(PathBuf::from(name));
        return Ok(());
    }
    let dst = output.join(name);
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(&src, &dst)?;
    report.copied.push(PathBuf::from(name));
    Ok(())
}

fn copy_dir(base: &Path, name: &str, output: &Path, report: &mut BuildReport) -> Result<(), GenerateError> {
    let src = base.join(name);
    if !src.is_dir() {
        debug!("skipping absent asset directory {}", src.display());
        report.skipped.push(PathBuf::from(name));
        return Ok(());
    }
    for entry in WalkDir::new(&src).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(base).unwrap_or(entry.path());
        let dst = output.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dst)?;
        } else {
            fs::copy(entry.path(), &dst)?;
            report.copied.push(relative.to_path_buf());
        }
    }
    Ok(())
}

/// Validate config, content and template without writing anything.
pub fn check(source: &Path) -> Result<CheckReport, GenerateError> {
    let config = config::load_config(source)?;
    let template_path = PathBuf::from(&config.build.template);
    let content_path = PathBuf::from(&config.build.content);

    let template = Template::parse(&read(&source.join(&template_path))?)?;
    let mut content = load_content(&source.join(&content_path))?;
    derive_computed(&mut content)?;

    let fields = template.field_paths();
    let (malformed, well_formed): (Vec<String>, Vec<String>) =
        fields.iter().cloned().partition(|path| !is_well_formed_path(path));
    let missing = well_formed
        .into_iter()
        .filter(|path| resolve(&content, path).is_none())
        .collect();

    Ok(CheckReport {
        template: template_path,
        content: content_path,
        fields,
        missing,
        malformed,
    })
}
