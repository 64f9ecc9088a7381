//! Script descriptors and the table of known orchestra scripts.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How a script is launched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpreter {
    /// Run through `bash`
    Shell,

    /// Run through `python3`
    Python,

    /// Executed directly
    Native,
}

impl Interpreter {
    /// Derive the interpreter from a file extension (`.sh`, `.py`, anything else is native)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("sh") => Self::Shell,
            Some("py") => Self::Python,
            _ => Self::Native,
        }
    }

    /// Program used to launch the script, if any
    pub fn program(&self) -> Option<&'static str> {
        match self {
            Self::Shell => Some("bash"),
            Self::Python => Some("python3"),
            Self::Native => None,
        }
    }
}

impl fmt::Display for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell => write!(f, "shell"),
            Self::Python => write!(f, "python"),
            Self::Native => write!(f, "native"),
        }
    }
}

/// An entry in the known-script table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownScript {
    pub logical_name: &'static str,
    pub file_name: &'static str,
    pub interpreter: Interpreter,
}

/// Broadcast and session management script
pub const ULTIMATE_ORCHESTRA: &str = "ultimate-orchestra";

/// Instance synchronization script
pub const ORCHESTRATOR: &str = "orchestrator";

/// AI integration controller
pub const CLAUDE_CONTROLLER: &str = "claude-controller";

/// Concurrent editing (swarm) script
pub const VIM_SWARM: &str = "vim-swarm";

/// Logical name -> file name -> interpreter.
pub const KNOWN_SCRIPTS: &[KnownScript] = &[
    KnownScript {
        logical_name: ULTIMATE_ORCHESTRA,
        file_name: "ultimate-orchestra.sh",
        interpreter: Interpreter::Shell,
    },
    KnownScript {
        logical_name: ORCHESTRATOR,
        file_name: "nvim_orchestrator.py",
        interpreter: Interpreter::Python,
    },
    KnownScript {
        logical_name: CLAUDE_CONTROLLER,
        file_name: "claude_ai_controller.py",
        interpreter: Interpreter::Python,
    },
    KnownScript {
        logical_name: VIM_SWARM,
        file_name: "vim_swarm.py",
        interpreter: Interpreter::Python,
    },
];

/// Look up a logical name in the known-script table
pub fn known_script(logical_name: &str) -> Option<&'static KnownScript> {
    KNOWN_SCRIPTS.iter().find(|s| s.logical_name == logical_name)
}

/// A script resolved to a concrete file on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptDescriptor {
    /// Name the caller asked for
    pub logical_name: String,

    /// Absolute (or scripts-dir relative) path of the executable
    pub executable_path: PathBuf,

    /// How to launch it
    pub interpreter: Interpreter,
}

impl ScriptDescriptor {
    /// File name component of the executable path
    pub fn file_name(&self) -> String {
        self.executable_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.logical_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpreter_from_extension() {
        assert_eq!(Interpreter::from_path(Path::new("a.sh")), Interpreter::Shell);
        assert_eq!(Interpreter::from_path(Path::new("b.py")), Interpreter::Python);
        assert_eq!(Interpreter::from_path(Path::new("tool")), Interpreter::Native);
        assert_eq!(Interpreter::from_path(Path::new("x.rb")), Interpreter::Native);
    }

    #[test]
    fn test_known_script_table() {
        let script = known_script("orchestrator").unwrap();
        assert_eq!(script.file_name, "nvim_orchestrator.py");
        assert_eq!(script.interpreter, Interpreter::Python);

        assert!(known_script("nvim_orchestrator.py").is_none());
        assert_eq!(KNOWN_SCRIPTS.len(), 4);
    }

    #[test]
    fn test_table_interpreters_match_extensions() {
        for script in KNOWN_SCRIPTS {
            assert_eq!(
                Interpreter::from_path(Path::new(script.file_name)),
                script.interpreter,
                "{} has mismatched interpreter",
                script.logical_name
            );
        }
    }
}
