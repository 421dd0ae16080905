use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use dashmap::DashMap;
use tracing::debug;
use walkdir::WalkDir;

use crate::tpl::engine::{Engine, Template};

#[derive(Clone)]
struct CachedTemplate {
    template: Arc<Template>,
    content_hash: u64,
}

/// Holds compiled templates keyed by name, so callers compile once and
/// render from anywhere. The store is a plain value, not a process-wide
/// global; create as many as you need.
pub struct TemplateStore {
    engine: Engine,
    templates: DashMap<String, CachedTemplate>,
}

impl TemplateStore {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            templates: DashMap::new(),
        }
    }

    /// Compiles `content` and registers it under `name`. Recompiles only
    /// when the content actually changed.
    pub fn insert(&self, name: &str, content: &str) -> Result<Arc<Template>> {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        let new_hash = hasher.finish();

        if let Some(cached) = self.templates.get(name) {
            if cached.content_hash == new_hash {
                return Ok(cached.template.clone());
            }
        }

        let template = Arc::new(
            self.engine
                .compile(content)
                .with_context(|| format!("failed to compile template '{name}'"))?,
        );
        self.templates.insert(
            name.to_string(),
            CachedTemplate {
                template: template.clone(),
                content_hash: new_hash,
            },
        );
        Ok(template)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Template>> {
        self.templates.get(name).map(|c| c.template.clone())
    }

    pub fn remove(&self, name: &str) {
        self.templates.remove(name);
    }

    /// Recursively loads every `.html`/`.xml` file under `dir`. Templates
    /// are named by their extension-less path relative to `dir`, with `/`
    /// separators (`email/welcome.html` registers as `email/welcome`).
    pub fn load_from_path(&self, dir: &Path) -> Result<()> {
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();

            let is_template = path.is_file()
                && path
                    .extension()
                    .map_or(false, |ext| ext == "html" || ext == "xml");
            if !is_template {
                continue;
            }

            let name = template_name(dir, path)?;
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read template file: {}", path.display()))?;
            self.insert(&name, &content)?;
            debug!("loaded template: name={}, file={}", name, path.display());
        }
        Ok(())
    }
}

fn template_name(dir: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(dir)
        .with_context(|| format!("template path outside root: {}", path.display()))?;
    let name = rel
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    Ok(name)
}
