use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command '{command}' failed with exit code {code}")]
    CommandFailed {
        command: String,
        code: i32,
        output: String,
    },

    #[error("Command '{0}' not found, is it installed?")]
    CommandNotFound(String),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Could not encode configuration: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("This installer must be run as root (sudo)")]
    NotRoot,

    #[error("No network connection: archlinux.org is unreachable")]
    NoNetwork,

    #[error("Required tool '{0}' is missing from the live environment")]
    MissingTool(String),

    #[error("Configuration incomplete: {0} is not set")]
    Incomplete(&'static str),

    #[error("{0}")]
    Target(String),
}

impl InstallerError {
    /// Captured tool output, when the error came from a failed command.
    pub fn output(&self) -> Option<&str> {
        match self {
            InstallerError::CommandFailed { output, .. } if !output.trim().is_empty() => {
                Some(output.trim())
            }
            _ => None,
        }
    }

    /// Whether this error means the run must not start at all.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            InstallerError::NotRoot | InstallerError::NoNetwork | InstallerError::MissingTool(_)
        )
    }
}

/// Why a password was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PasswordError {
    #[error("Password cannot be empty")]
    Empty,

    #[error("Password must be at least 6 characters")]
    TooShort,
}
