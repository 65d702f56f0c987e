//! HTML templates.

use std::path::Path;

use minijinja::{Environment, path_loader};
use serde::Serialize;
use tracing::info;

/// A minijinja environment shared by every request.
///
/// Templates are loaded lazily from disk and cached by the environment.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Loads templates from `dir` on first use.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        info!("set jinja template path: {}", dir.display());
        let mut env = Environment::new();
        env.set_loader(path_loader(dir));
        Self { env }
    }

    /// Templates given as `(name, source)` pairs.
    pub fn from_sources<I, N, S>(sources: I) -> Result<Self, minijinja::Error>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let mut env = Environment::new();
        for (name, source) in sources {
            env.add_template_owned(name.into(), source.into())?;
        }
        Ok(Self { env })
    }

    pub fn render(&self, name: &str, context: impl Serialize) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(context)
    }
}
