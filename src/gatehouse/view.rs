//! Template rendering.
//!
//! Page templates live under the template root as `<dir>/<name>.tmpl` and are
//! registered as `<dir>/<name>`. Files in `partial/` are registered by their
//! stem so pages can include them (`{{> menu}}`); `base.tmpl` is the layout
//! every page wraps itself in with `{{#> base}}`.

use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;

use super::session::Flash;

pub type ViewVars = Map<String, Value>;

const TEMPLATE_EXT: &str = "tmpl";
const PARTIAL_DIR: &str = "partial";

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("failed to read templates: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid template: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),
    #[error("failed to render template: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Turns a template name and its variables into HTML.
pub trait Renderer: Send + Sync {
    /// # Errors
    /// Returns an error if the template is unknown or fails to render.
    fn render(&self, name: &str, vars: &ViewVars) -> Result<String, ViewError>;
}

/// A page to render: template name plus its variables.
#[derive(Clone, Debug)]
pub struct View {
    name: &'static str,
    vars: ViewVars,
}

impl View {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            vars: ViewVars::new(),
        }
    }

    /// Echo submitted form fields back into the page, skipping absent ones.
    #[must_use]
    pub fn repopulate(mut self, fields: &[(&str, Option<&str>)]) -> Self {
        for (key, value) in fields {
            if let Some(value) = value {
                self.vars
                    .insert((*key).to_string(), Value::String((*value).to_string()));
            }
        }
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn vars(&self) -> &ViewVars {
        &self.vars
    }

    pub(super) fn vars_mut(&mut self) -> &mut ViewVars {
        &mut self.vars
    }
}

/// Flash messages as template data: `[{message, class}]`.
#[must_use]
pub fn flashes_value(flashes: &[Flash]) -> Value {
    Value::Array(
        flashes
            .iter()
            .map(|flash| {
                let mut entry = Map::new();
                entry.insert("message".into(), Value::String(flash.message.clone()));
                entry.insert("class".into(), Value::String(flash.level.as_class().into()));
                Value::Object(entry)
            })
            .collect(),
    )
}

pub struct HandlebarsView {
    registry: Handlebars<'static>,
}

impl HandlebarsView {
    /// Load every template under `root` and register the tag helpers.
    ///
    /// # Errors
    /// Returns an error if a template cannot be read or parsed.
    pub fn load(root: &Path, base_uri: &str) -> Result<Self, ViewError> {
        let mut registry = Handlebars::new();
        register_tag_helpers(&mut registry, base_uri);

        for path in template_files(root)? {
            let name = template_name(root, &path);
            let source = fs::read_to_string(&path)?;
            debug!("Registering template {name}");
            registry
                .register_template_string(&name, source)
                .map_err(Box::new)?;
        }

        Ok(Self { registry })
    }
}

impl Renderer for HandlebarsView {
    fn render(&self, name: &str, vars: &ViewVars) -> Result<String, ViewError> {
        Ok(self.registry.render(name, vars)?)
    }
}

fn template_files(root: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == TEMPLATE_EXT) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn template_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    match parts.as_slice() {
        [dir, stem] if dir == PARTIAL_DIR => stem.clone(),
        _ => parts.join("/"),
    }
}

fn register_tag_helpers(registry: &mut Handlebars<'static>, base_uri: &str) {
    let base = base_uri.to_string();
    registry.register_helper(
        "css",
        Box::new(
            move |h: &Helper, _: &Handlebars, _: &Context, _: &mut RenderContext, out: &mut dyn Output| -> HelperResult {
                let href = param_str(h, 0);
                let media = h.param(1).and_then(|v| v.value().as_str()).unwrap_or("all");
                out.write(&format!(
                    r#"<link href="{base}{href}" type="text/css" rel="stylesheet" media="{media}" />"#
                ))?;
                Ok(())
            },
        ),
    );

    let base = base_uri.to_string();
    registry.register_helper(
        "js",
        Box::new(
            move |h: &Helper, _: &Handlebars, _: &Context, _: &mut RenderContext, out: &mut dyn Output| -> HelperResult {
                let src = param_str(h, 0);
                out.write(&format!(r#"<script type="text/javascript" src="{base}{src}"></script>"#))?;
                Ok(())
            },
        ),
    );

    let base = base_uri.to_string();
    registry.register_helper(
        "link",
        Box::new(
            move |h: &Helper, _: &Handlebars, _: &Context, _: &mut RenderContext, out: &mut dyn Output| -> HelperResult {
                let path = param_str(h, 0);
                let label = handlebars::html_escape(param_str(h, 1));
                out.write(&format!(r#"<a href="{base}{path}">{label}</a>"#))?;
                Ok(())
            },
        ),
    );
}

fn param_str<'a>(h: &'a Helper, index: usize) -> &'a str {
    h.param(index)
        .and_then(|v| v.value().as_str())
        .map_or("", |s| s.trim_start_matches('/'))
}
