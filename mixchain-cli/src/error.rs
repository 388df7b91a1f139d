use std::fmt::{Display, Formatter};

use mixchain_lib::settings::SettingsError;

/// Error type for CLI commands.
#[derive(Debug)]
pub enum RenderError {
    Io(std::io::Error),
    Wav(hound::Error),
    Settings(SettingsError),
    Unsupported(String),
}

impl Display for RenderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Wav(err) => write!(f, "wav error: {}", err),
            Self::Settings(err) => write!(f, "{}", err),
            Self::Unsupported(err) => write!(f, "unsupported: {}", err),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<std::io::Error> for RenderError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<hound::Error> for RenderError {
    fn from(value: hound::Error) -> Self {
        Self::Wav(value)
    }
}

impl From<SettingsError> for RenderError {
    fn from(value: SettingsError) -> Self {
        Self::Settings(value)
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(value: serde_json::Error) -> Self {
        Self::Settings(SettingsError::Parse(value))
    }
}
