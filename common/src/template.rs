//! Thin wrapper around the template engine used to render infrastructure
//! definitions from the normalized configuration.

use std::path::{Path, PathBuf};

use minijinja::{path_loader, Environment};
use serde::Serialize;

use crate::error::Error;

pub const TEMPLATE_EXTENSION: &str = "j2";

pub struct TemplateEngine {
    search_path: PathBuf,
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Engine loading `<name>.j2` files from `search_path`.
    pub fn new(search_path: impl AsRef<Path>) -> Self {
        let search_path = search_path.as_ref().to_path_buf();

        let mut env = Environment::new();
        env.set_loader(path_loader(&search_path));

        TemplateEngine { search_path, env }
    }

    pub fn render(&self, template_name: &str, context: impl Serialize) -> Result<String, Error> {
        let file_name = format!("{template_name}.{TEMPLATE_EXTENSION}");

        let template_path = self.search_path.join(&file_name);
        if !template_path.exists() {
            return Err(Error::TemplateNotFound(template_path));
        }

        let template = self.env.get_template(&file_name)?;
        Ok(template.render(context)?)
    }
}
