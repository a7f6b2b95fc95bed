use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::error::{ComposeError, Result};

/// Project name plus the container name prefix derived from it.
///
/// Containers launched for project `myproj` are named `/myproj_<service>`,
/// so everything this tool touches is scoped by that prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectNamespace {
    name: String,
    prefix: String,
}

impl ProjectNamespace {
    /// Builds a namespace from an already chosen project name. The name is
    /// used as given, so `my_proj` owns the containers named `/my_proj_*`.
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(ComposeError::Project(name.to_string()));
        }

        Ok(Self {
            prefix: format!("/{}_", name),
            name: name.to_string(),
        })
    }

    /// Explicit override wins, then the directory holding the compose file,
    /// then the working directory.
    ///
    /// An explicit name is taken verbatim. A name derived from a directory is
    /// normalized the way docker-compose does it (`My-App` becomes `myapp`),
    /// so containers it created for that directory are found.
    pub fn resolve(explicit: Option<&str>, config_path: &Path, cwd: &Path) -> Result<Self> {
        if let Some(name) = explicit.filter(|name| !name.trim().is_empty()) {
            debug!(project = name, "using explicit project name");
            return Self::new(name);
        }

        // a bare file name has an empty parent, which joins back to cwd
        let parent = config_path.parent().unwrap_or_else(|| Path::new(""));
        let dir = cwd.join(parent);
        let dir = dir.canonicalize().unwrap_or(dir);

        let name = dir
            .file_name()
            .or_else(|| cwd.file_name())
            .ok_or_else(|| ComposeError::Project(dir.display().to_string()))?;

        let normalized = normalize(&name.to_string_lossy());
        debug!(project = %normalized, dir = %dir.display(), "derived project name");
        if normalized.is_empty() {
            return Err(ComposeError::Project(dir.display().to_string()));
        }
        Self::new(&normalized)
    }

    /// The project name as used in container names
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `/<project>_`
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Strips the namespace prefix from a container name, if it carries it
    pub fn service_name<'a>(&self, container_name: &'a str) -> Option<&'a str> {
        container_name.strip_prefix(self.prefix.as_str())
    }
}

impl fmt::Display for ProjectNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Lowercase ASCII alphanumerics only, as docker-compose names its projects
fn normalize(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
