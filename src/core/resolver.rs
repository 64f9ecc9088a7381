//! Maps logical script names to files in the scripts directory.

use std::path::{Component, Path, PathBuf};

use glob::Pattern;
use tracing::debug;

use crate::domain::script::known_script;
use crate::domain::{Interpreter, ScriptDescriptor};
use crate::error::{OrchestraError, Result};

/// Resolves scripts against a directory.
///
/// Existence is checked on every call since operators install and remove
/// scripts while the coordinator is running.
#[derive(Debug, Clone)]
pub struct ScriptResolver {
    scripts_dir: PathBuf,
}

impl ScriptResolver {
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
        }
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Resolve a logical name (or literal file name) to an existing script.
    ///
    /// Literal names must be a bare file name inside the scripts directory;
    /// absolute paths and paths with separators or `..` are never resolved.
    pub fn resolve(&self, logical_name: &str) -> Result<ScriptDescriptor> {
        let (file_name, interpreter) = match known_script(logical_name) {
            Some(known) => (known.file_name, known.interpreter),
            None => (logical_name, Interpreter::from_path(Path::new(logical_name))),
        };

        let executable_path = self.scripts_dir.join(file_name);
        if !is_bare_file_name(file_name) || !executable_path.is_file() {
            return Err(OrchestraError::ScriptNotFound {
                name: logical_name.to_string(),
                path: executable_path,
            });
        }

        debug!(logical_name, path = %executable_path.display(), %interpreter, "Resolved script");
        Ok(ScriptDescriptor {
            logical_name: logical_name.to_string(),
            executable_path,
            interpreter,
        })
    }

    /// File names in the scripts directory matching any of `patterns`, sorted.
    ///
    /// A missing directory yields an empty list.
    pub async fn available_scripts(&self, patterns: &[String]) -> Result<Vec<String>> {
        let patterns: Vec<Pattern> = patterns
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();

        if !self.scripts_dir.exists() {
            return Ok(Vec::new());
        }

        let unreadable = |source| OrchestraError::ScriptsDirUnreadable {
            path: self.scripts_dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.scripts_dir)
            .await
            .map_err(unreadable)?;
        let mut scripts = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
            if let Some(name) = entry.file_name().to_str() {
                if patterns.iter().any(|p| p.matches(name)) {
                    scripts.push(name.to_string());
                }
            }
        }

        scripts.sort();
        Ok(scripts)
    }
}

/// Exactly one normal path component
fn is_bare_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn default_patterns() -> Vec<String> {
        vec!["*.sh".to_string(), "*.py".to_string()]
    }

    #[test]
    fn test_resolve_known_script() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("vim_swarm.py"), "print('hi')").unwrap();

        let resolver = ScriptResolver::new(temp.path());
        let script = resolver.resolve("vim-swarm").unwrap();

        assert_eq!(script.logical_name, "vim-swarm");
        assert_eq!(script.executable_path, temp.path().join("vim_swarm.py"));
        assert_eq!(script.interpreter, Interpreter::Python);
    }

    #[test]
    fn test_resolve_literal_filename() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("custom.sh"), "echo hi").unwrap();

        let resolver = ScriptResolver::new(temp.path());
        let script = resolver.resolve("custom.sh").unwrap();
        assert_eq!(script.interpreter, Interpreter::Shell);
    }

    #[test]
    fn test_resolve_missing_script() {
        let temp = TempDir::new().unwrap();
        let resolver = ScriptResolver::new(temp.path());

        let err = resolver.resolve("orchestrator").unwrap_err();
        match err {
            OrchestraError::ScriptNotFound { name, path } => {
                assert_eq!(name, "orchestrator");
                assert_eq!(path, temp.path().join("nvim_orchestrator.py"));
            }
            other => panic!("expected ScriptNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_paths_outside_scripts_dir_are_refused() {
        let temp = TempDir::new().unwrap();
        let scripts = temp.path().join("scripts");
        std::fs::create_dir_all(scripts.join("nested")).unwrap();
        std::fs::write(temp.path().join("x.sh"), "echo outside").unwrap();
        std::fs::write(scripts.join("nested").join("y.sh"), "echo nested").unwrap();

        let resolver = ScriptResolver::new(&scripts);
        let absolute = temp.path().join("x.sh");

        for name in [
            "/bin/echo",
            absolute.to_str().unwrap(),
            "../x.sh",
            "nested/y.sh",
            "./nested",
            "",
        ] {
            let err = resolver.resolve(name).unwrap_err();
            assert!(
                matches!(err, OrchestraError::ScriptNotFound { .. }),
                "{} should not resolve",
                name
            );
        }
    }

    #[test]
    fn test_bare_file_name() {
        assert!(is_bare_file_name("custom.sh"));
        assert!(!is_bare_file_name("/bin/echo"));
        assert!(!is_bare_file_name("../x.sh"));
        assert!(!is_bare_file_name("a/b.sh"));
        assert!(!is_bare_file_name("."));
        assert!(!is_bare_file_name(""));
    }

    #[test]
    fn test_existence_rechecked_each_call() {
        let temp = TempDir::new().unwrap();
        let resolver = ScriptResolver::new(temp.path());
        assert!(resolver.resolve("ultimate-orchestra").is_err());

        let path = temp.path().join("ultimate-orchestra.sh");
        std::fs::write(&path, "echo hi").unwrap();
        assert!(resolver.resolve("ultimate-orchestra").is_ok());

        std::fs::remove_file(&path).unwrap();
        assert!(resolver.resolve("ultimate-orchestra").is_err());
    }

    #[tokio::test]
    async fn test_available_scripts_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        for name in ["vim_swarm.py", "ultimate-orchestra.sh", "README.md", "notes.txt"] {
            std::fs::write(temp.path().join(name), "").unwrap();
        }

        let resolver = ScriptResolver::new(temp.path());
        let scripts = resolver.available_scripts(&default_patterns()).await.unwrap();
        assert_eq!(scripts, vec!["ultimate-orchestra.sh", "vim_swarm.py"]);
    }

    #[tokio::test]
    async fn test_available_scripts_missing_dir() {
        let temp = TempDir::new().unwrap();
        let resolver = ScriptResolver::new(temp.path().join("nope"));
        assert!(resolver.available_scripts(&default_patterns()).await.unwrap().is_empty());
    }
}
