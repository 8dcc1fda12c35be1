//! Templating environment for one module source tree.
//!
//! Every regular file below the module source directory is a template,
//! addressed by its `/`-separated path relative to that directory so that
//! templates can `include` and `extends` each other.
use std::collections::{BTreeMap, HashMap};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tera::{Context, Tera};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::conditions::undefined_condition_names;
use crate::error::RenderError;
use crate::resources::helpers::fs::sha256_hex;

/// Flat variable mapping handed to every template.
pub type Variables = BTreeMap<String, Value>;

/// Source file-name prefix that publishes as a leading `.`.
pub const DOT_PREFIX: &str = "dot_";

/// Template names that get HTML-style output escaping.
const AUTOESCAPE_SUFFIXES: [&str; 3] = [".html", ".htm", ".xml"];

/// Name a source file is published under: `dot_vimrc` becomes `.vimrc`,
/// anything else is unchanged.
#[must_use]
pub fn published_name(file_name: &OsStr) -> OsString {
    file_name
        .to_str()
        .and_then(|name| name.strip_prefix(DOT_PREFIX))
        .map_or_else(|| file_name.to_os_string(), |rest| OsString::from(format!(".{rest}")))
}

/// Output path of a template, relative to the module output directory.
#[must_use]
pub fn published_path(relative_template: &Path) -> PathBuf {
    match relative_template.file_name() {
        Some(name) => relative_template.with_file_name(published_name(name)),
        None => relative_template.to_path_buf(),
    }
}

/// `"ff0000" | hex_color` renders `#ff0000`.
#[allow(clippy::unnecessary_wraps)] // tera filter signature
fn hex_color(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(Value::String(format!("#{raw}")))
}

/// One template of a module.
#[derive(Debug, Clone)]
pub struct TemplateFile {
    /// Name the template is registered under.
    pub name: String,
    /// Absolute path of the source file.
    pub source_path: PathBuf,
    /// Output path relative to the module output directory.
    pub output_relative: PathBuf,
}

/// A template rendered in memory, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct RenderedPayload {
    /// Output path relative to the module output directory.
    pub output_relative: PathBuf,
    /// Absolute path of the source template.
    pub template_path: PathBuf,
    /// Rendered text.
    pub content: String,
    /// Hex SHA-256 of `content`.
    pub content_hash: String,
}

/// Result of rendering every template of a module.
#[derive(Debug, Default)]
pub struct RenderBatch {
    /// Payloads rendered before the pass ended.
    pub payloads: Vec<RenderedPayload>,
    /// The pass stopped early on a render failure.
    pub aborted: bool,
}

/// Parsed templates of one module.
#[derive(Debug)]
pub struct ModuleTemplates {
    tera: Tera,
    files: Vec<TemplateFile>,
}

impl ModuleTemplates {
    /// Enumerate and parse the module source tree in file-name order.
    ///
    /// Files that are not UTF-8 text or that fail to parse are logged and
    /// left out. A missing source directory yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Walk`] if the tree cannot be enumerated, or
    /// [`RenderError::TemplateSet`] if the parsed templates cannot be linked
    /// together (for example an `extends` parent was left out).
    pub fn load(source_dir: &Path, module: &str) -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.autoescape_on(AUTOESCAPE_SUFFIXES.to_vec());
        tera.register_filter("hex_color", hex_color);

        if !source_dir.is_dir() {
            warn!(module, path = %source_dir.display(), "module source directory not found");
            return Ok(Self {
                tera,
                files: Vec::new(),
            });
        }

        let mut files = Vec::new();
        let mut sources = Vec::new();
        for entry in WalkDir::new(source_dir).sort_by_file_name() {
            let entry = entry.map_err(|source| RenderError::Walk {
                path: source_dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Ok(relative) = path.strip_prefix(source_dir) else {
                continue;
            };
            let Some(name) = template_name(relative) else {
                warn!(module, path = %path.display(), "Skipping template with non UTF-8 name");
                continue;
            };

            let bytes = std::fs::read(path).map_err(|source| RenderError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let Ok(text) = String::from_utf8(bytes) else {
                warn!(module, path = %path.display(), "Skipping non-text template");
                continue;
            };
            if let Err(e) = tera::Template::new(&name, None, &text) {
                warn!(module, template = %name, "Skipping template with syntax error: {}", error_chain(&e));
                continue;
            }

            files.push(TemplateFile {
                output_relative: published_path(relative),
                source_path: path.to_path_buf(),
                name: name.clone(),
            });
            sources.push((name, text));
        }

        tera.add_raw_templates(sources)
            .map_err(|source| RenderError::TemplateSet {
                module: module.to_string(),
                source,
            })?;
        debug!(module, count = files.len(), "templates loaded");

        Ok(Self { tera, files })
    }

    /// Templates in render order.
    #[must_use]
    pub fn files(&self) -> &[TemplateFile] {
        &self.files
    }

    /// Render every template with `variables`.
    ///
    /// Referencing an undefined variable, including as an `if` condition or
    /// an `and`/`or` operand, is logged and stops the pass, as does any other
    /// render failure. Payloads rendered before it are returned with
    /// [`RenderBatch::aborted`] set.
    #[must_use]
    pub fn render(&self, module: &str, variables: &Variables) -> RenderBatch {
        let mut context = Context::new();
        for (key, value) in variables {
            context.insert(key.as_str(), value);
        }
        let known = Value::Object(
            variables
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        );

        let mut batch = RenderBatch::default();
        for file in &self.files {
            let rendered = self.check_truth_tests(&file.name, &known).and_then(|()| {
                self.tera
                    .render(&file.name, &context)
                    .map_err(|e| error_chain(&e))
            });
            match rendered {
                Ok(content) => {
                    batch.payloads.push(RenderedPayload {
                        output_relative: file.output_relative.clone(),
                        template_path: file.source_path.clone(),
                        content_hash: sha256_hex(content.as_bytes()),
                        content,
                    });
                }
                Err(reason) => {
                    warn!(
                        module,
                        path = %file.source_path.display(),
                        "Missing variable: {reason}"
                    );
                    batch.aborted = true;
                    break;
                }
            }
        }
        batch
    }

    /// Fail when a truth test in template `name` uses a name `known` lacks.
    fn check_truth_tests(&self, name: &str, known: &Value) -> Result<(), String> {
        let Ok(template) = self.tera.get_template(name) else {
            return Ok(());
        };
        let undefined = undefined_condition_names(template, known);
        if undefined.is_empty() {
            return Ok(());
        }
        Err(format!(
            "Variable `{}` not found in context while rendering '{name}'",
            undefined.join("`, `")
        ))
    }
}

/// `/`-separated template name for a relative path.
fn template_name(relative: &Path) -> Option<String> {
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

/// Flatten an error and its sources into one line.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}
