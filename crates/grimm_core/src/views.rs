use crate::error::ViewError;
use serde_json::Value;
use std::path::Path;

/// View rendering as seen by the host and bundles.
///
/// Views are addressed by path relative to the view root, without
/// extension; `render("layouts/front", ..)` reads
/// `<view root>/layouts/front.<extension>`. An absolute path is used as is.
pub trait TemplateEngine: Send + Sync {
    /// File extension of view files, without the dot.
    fn extension(&self) -> &str {
        "html"
    }

    fn set_view_root(&self, root: &Path);

    /// Makes `path` available to every view as `{{> name}}`.
    fn register_partial(&self, name: &str, path: &Path) -> Result<(), ViewError>;

    /// Renders `view` with `data`. With `cache` set the compiled template is
    /// kept and reused; otherwise the file is read again on every call.
    fn render(&self, view: &Path, data: &Value, cache: bool) -> Result<String, ViewError>;
}
