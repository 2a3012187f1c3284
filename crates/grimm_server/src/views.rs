//! Handlebars-backed view rendering.

use grimm_core::{TemplateEngine, ViewError};
use handlebars::Handlebars;
use parking_lot::RwLock;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct HandlebarsViews {
    registry: RwLock<Handlebars<'static>>,
    view_root: RwLock<PathBuf>,
    extension: String,
}

impl HandlebarsViews {
    pub fn new() -> Self {
        Self::with_extension("html")
    }

    pub fn with_extension(extension: impl Into<String>) -> Self {
        Self {
            registry: RwLock::new(Handlebars::new()),
            view_root: RwLock::new(PathBuf::new()),
            extension: extension.into(),
        }
    }

    fn resolve(&self, view: &Path) -> PathBuf {
        let path = if view.is_absolute() {
            view.to_path_buf()
        } else {
            self.view_root.read().join(view)
        };
        if path.extension().is_some() {
            path
        } else {
            path.with_extension(&self.extension)
        }
    }

    fn read(path: &Path) -> Result<String, ViewError> {
        std::fs::read_to_string(path).map_err(|source| ViewError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for HandlebarsViews {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for HandlebarsViews {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn set_view_root(&self, root: &Path) {
        *self.view_root.write() = root.to_path_buf();
    }

    fn register_partial(&self, name: &str, path: &Path) -> Result<(), ViewError> {
        let source = Self::read(path)?;
        self.registry
            .write()
            .register_partial(name, source)
            .map_err(|e| ViewError::Template {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        debug!("Registered partial {} from {}", name, path.display());
        Ok(())
    }

    fn render(&self, view: &Path, data: &Value, cache: bool) -> Result<String, ViewError> {
        let path = self.resolve(view);
        let name = path.to_string_lossy().into_owned();
        let render_error = |e: handlebars::RenderError| ViewError::Render {
            name: name.clone(),
            message: e.to_string(),
        };

        if cache {
            if self.registry.read().has_template(&name) {
                return self.registry.read().render(&name, data).map_err(render_error);
            }
            let source = Self::read(&path)?;
            let mut registry = self.registry.write();
            registry
                .register_template_string(&name, source)
                .map_err(|e| ViewError::Template {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            return registry.render(&name, data).map_err(render_error);
        }

        let source = Self::read(&path)?;
        self.registry
            .read()
            .render_template(&source, data)
            .map_err(render_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn views() -> (HandlebarsViews, TempDir) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("layouts")).unwrap();
        std::fs::create_dir_all(dir.path().join("partials")).unwrap();
        let views = HandlebarsViews::new();
        views.set_view_root(dir.path());
        (views, dir)
    }

    #[test]
    fn test_renders_relative_view_with_partial() {
        let (views, dir) = views();
        std::fs::write(dir.path().join("partials/footer.html"), "<footer>{{title}}</footer>").unwrap();
        std::fs::write(dir.path().join("layouts/front.html"), "<h1>{{title}}</h1>{{> footer}}").unwrap();

        views
            .register_partial("footer", &dir.path().join("partials/footer.html"))
            .unwrap();
        let html = views
            .render(Path::new("layouts/front"), &json!({"title": "Home"}), false)
            .unwrap();

        assert_eq!(html, "<h1>Home</h1><footer>Home</footer>");
    }

    #[test]
    fn test_uncached_render_sees_file_changes() {
        let (views, dir) = views();
        let page = dir.path().join("page.html");
        std::fs::write(&page, "v1").unwrap();
        assert_eq!(views.render(&page, &Value::Null, false).unwrap(), "v1");

        std::fs::write(&page, "v2").unwrap();
        assert_eq!(views.render(&page, &Value::Null, false).unwrap(), "v2");
    }

    #[test]
    fn test_cached_render_keeps_first_compile() {
        let (views, dir) = views();
        let page = dir.path().join("page.html");
        std::fs::write(&page, "v1").unwrap();
        assert_eq!(views.render(&page, &Value::Null, true).unwrap(), "v1");

        std::fs::write(&page, "v2").unwrap();
        assert_eq!(views.render(&page, &Value::Null, true).unwrap(), "v1");
    }

    #[test]
    fn test_missing_view_is_io_error() {
        let (views, _dir) = views();

        let err = views.render(Path::new("nope"), &Value::Null, false).unwrap_err();

        assert!(matches!(err, ViewError::Io { ref path, .. } if path.ends_with("nope.html")));
    }

    #[test]
    fn test_broken_partial_is_template_error() {
        let (views, dir) = views();
        let broken = dir.path().join("partials/broken.html");
        std::fs::write(&broken, "{{#if}}").unwrap();

        let err = views.register_partial("broken", &broken).unwrap_err();

        assert!(matches!(err, ViewError::Template { ref name, .. } if name == "broken"));
    }
}
