use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A body could not be drained while cloning a message
#[derive(Debug, Error)]
pub enum CloneError {
    #[error("failed to read request body: {0}")]
    Request(#[source] io::Error),

    #[error("failed to read response body: {0}")]
    Response(#[source] io::Error),
}

/// Fan-out of one result stopped part way.
///
/// The first `delivered` plugins received the result, the rest did not.
#[derive(Debug, Error)]
#[error("could not copy result for plugin `{plugin}`, {delivered} of {total} plugins received it")]
pub struct DispatchError {
    pub plugin: String,
    pub delivered: usize,
    pub total: usize,
    #[source]
    pub source: CloneError,
}

/// Loading a plugin failed; no broker was built.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("plugins must be loaded from inside a Tokio runtime")]
    NoRuntime,

    #[error("plugin {} not found", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to open plugin module {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("plugin module {} does not export `{symbol}`", .path.display())]
    MissingDeclaration {
        path: PathBuf,
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error(
        "plugin module {} was built for httpfuzz {core_version} with {rustc_version}, host needs httpfuzz {} with {}",
        .path.display(),
        crate::plugin::CORE_VERSION,
        crate::plugin::RUSTC_VERSION
    )]
    Incompatible {
        path: PathBuf,
        rustc_version: String,
        core_version: String,
    },

    #[error("plugin {} failed to initialize: {message}", .path.display())]
    Init { path: PathBuf, message: String },
}

impl LoadError {
    /// Path of the module that failed, if the failure was tied to one
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            LoadError::NoRuntime => None,
            LoadError::NotFound { path }
            | LoadError::Open { path, .. }
            | LoadError::MissingDeclaration { path, .. }
            | LoadError::Incompatible { path, .. }
            | LoadError::Init { path, .. } => Some(path),
        }
    }
}
