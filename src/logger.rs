//! Logging handle shared with plugins.
//!
//! A plugin compiled as its own dynamic library carries its own copy of
//! `tracing`, with its own callsite registry, so events it builds are never
//! seen by the host's subscriber. [`Logger`] therefore carries an emitter
//! closure built on the host side: the plugin only formats the message, the
//! event itself is created by host code against the host's [`Dispatch`].

use std::fmt;
use std::sync::Arc;
use tracing::{dispatcher, Dispatch, Level};

const TARGET: &str = "httpfuzz::plugin";

/// Host-compiled sink: level, plugin name, message
type Emit = dyn Fn(Level, &str, &str) + Send + Sync;

/// Cheap to clone; every clone writes to the same subscriber.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
    emit: Arc<Emit>,
    plugin: Option<Arc<str>>,
}

impl Logger {
    pub fn new(dispatch: Dispatch) -> Self {
        Self {
            emit: emitter(dispatch.clone()),
            dispatch,
            plugin: None,
        }
    }

    /// The subscriber that is the default where this is called
    pub fn current() -> Self {
        Self::new(dispatcher::get_default(|dispatch| dispatch.clone()))
    }

    /// Same subscriber, tagged with a plugin name
    pub fn for_plugin(&self, name: &str) -> Self {
        Self {
            dispatch: self.dispatch.clone(),
            emit: Arc::clone(&self.emit),
            plugin: Some(Arc::from(name)),
        }
    }

    pub fn plugin(&self) -> Option<&str> {
        self.plugin.as_deref()
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `f` with this logger's subscriber as the default.
    ///
    /// Only reaches the host subscriber for code compiled into the host; a
    /// native plugin should use the level methods or [`install`](Self::install).
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }

    /// Make this logger's subscriber the global default of the calling module.
    ///
    /// Returns false if that module already has one.
    pub fn install(&self) -> bool {
        dispatcher::set_global_default(self.dispatch.clone()).is_ok()
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::DEBUG, &message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::INFO, &message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Level::WARN, &message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::ERROR, &message);
    }

    fn log(&self, level: Level, message: &dyn fmt::Display) {
        let plugin = self.plugin().unwrap_or("host");
        (self.emit)(level, plugin, &message.to_string());
    }
}

// Runs in the module that built the `Logger`, whichever module calls it.
fn emitter(dispatch: Dispatch) -> Arc<Emit> {
    Arc::new(move |level: Level, plugin: &str, message: &str| {
        dispatcher::with_default(&dispatch, || match level {
            Level::ERROR => tracing::error!(target: TARGET, plugin, "{message}"),
            Level::WARN => tracing::warn!(target: TARGET, plugin, "{message}"),
            Level::INFO => tracing::info!(target: TARGET, plugin, "{message}"),
            Level::DEBUG => tracing::debug!(target: TARGET, plugin, "{message}"),
            _ => tracing::trace!(target: TARGET, plugin, "{message}"),
        })
    })
}

impl Default for Logger {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}
