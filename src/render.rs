//! Template rendering.
//!
//! Templates are [Handlebars](https://docs.rs/handlebars) files.  The data
//! passed in is the [`RenderSnapshot`], so a template can use:
//!
//! * `nodes` – list of `{ name, external_ip }`, sorted by name
//! * `static_ips` – configured static addresses, in configured order
//! * `all_ips` – node addresses followed by static addresses
//! * `timestamp` – generation time, RFC 3339 UTC
//!
//! Output is not HTML-escaped and unknown variables are an error.

use std::path::Path;

use handlebars::Handlebars;

use crate::error::{Error, Result};
use crate::types::RenderSnapshot;

const TEMPLATE_NAME: &str = "output";

/// Turns a snapshot into the bytes of the output artifact.
pub trait Renderer: Send + Sync {
    fn render(&self, snapshot: &RenderSnapshot) -> Result<Vec<u8>>;
}

pub struct TemplateRenderer {
    registry: Handlebars<'static>,
}

impl TemplateRenderer {
    /// Load and compile the template at `path`.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let mut registry = Self::registry();
        registry
            .register_template_file(TEMPLATE_NAME, path)
            .map_err(|e| anyhow::anyhow!("parse template {}: {}", path.display(), e))?;
        Ok(Self { registry })
    }

    pub fn from_template(template: &str) -> anyhow::Result<Self> {
        let mut registry = Self::registry();
        registry
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| anyhow::anyhow!("parse template: {}", e))?;
        Ok(Self { registry })
    }

    fn registry() -> Handlebars<'static> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, snapshot: &RenderSnapshot) -> Result<Vec<u8>> {
        self.registry
            .render(TEMPLATE_NAME, snapshot)
            .map(String::into_bytes)
            .map_err(|e| Error::Render(e.to_string()))
    }
}
