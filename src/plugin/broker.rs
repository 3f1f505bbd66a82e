use super::listener::{Listener, Results};
use crate::error::{CloneError, DispatchError};
use crate::logger::Logger;
use crate::result::FuzzResult;
use async_channel::{bounded, Sender};
use futures::FutureExt;
use libloading::Library;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::task::TaskTracker;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info_span, Instrument};

/// A listener's name and the sending side of its delivery channel
struct PluginHandle {
    name: String,
    input: Sender<FuzzResult>,
}

/// A listener that panicked. Its worker stopped; the others kept going.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginFault {
    pub plugin: String,
    pub message: String,
}

/// Hands every result to all loaded plugins.
///
/// Each plugin has its own channel and worker task. Plugins are fed in the
/// order they were loaded; a send waits until the plugin's queue has room, so
/// a slow plugin holds up the plugins after it and, in the end, the producer.
///
/// A send completes once the result is queued, not once the plugin has taken
/// it. With the default capacity of 1 the producer can run one result ahead
/// of each plugin.
///
/// Plugins that panicked or returned are skipped without copying the result.
///
/// Shut down with [`signal_done`](Self::signal_done) after the last
/// [`send_result`](Self::send_result), then [`wait`](Self::wait).
pub struct PluginBroker {
    plugins: Vec<PluginHandle>,
    capacity: usize,
    tracker: TaskTracker,
    faults: Arc<Mutex<Vec<PluginFault>>>,
}

impl PluginBroker {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            plugins: Vec::new(),
            capacity: capacity.max(1),
            tracker: TaskTracker::new(),
            faults: Arc::default(),
        }
    }

    /// Register a listener and start its worker.
    ///
    /// `module` is the library the listener's code came from; it is unloaded
    /// only after the worker dropped the listener.
    pub(crate) fn add(
        &mut self,
        name: String,
        listener: Box<dyn Listener>,
        module: Option<Arc<Library>>,
        logger: Logger,
    ) {
        let (input, results) = bounded(self.capacity);
        self.plugins.push(PluginHandle {
            name: name.clone(),
            input,
        });
        self.run(name, listener, results, module, logger);
    }

    /// No more plugins will be added
    pub(crate) fn seal(&self) {
        self.tracker.close();
    }

    fn run(
        &self,
        name: String,
        mut listener: Box<dyn Listener>,
        results: Results,
        module: Option<Arc<Library>>,
        logger: Logger,
    ) {
        let faults = Arc::clone(&self.faults);
        let span = info_span!("plugin", name = %name);

        self.tracker.spawn(
            async move {
                debug!("listening");
                let listen = AssertUnwindSafe(listener.listen(results))
                    .catch_unwind()
                    .with_subscriber(logger.dispatch().clone());

                match listen.await {
                    Ok(()) => debug!("stopped"),
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        error!(%message, "plugin panicked, no further results delivered");
                        faults
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(PluginFault {
                                plugin: name,
                                message,
                            });
                    }
                }

                // listener code lives in the module
                drop(listener);
                drop(module);
            }
            .instrument(span),
        );
    }

    /// Send a result to every plugin, each getting its own copy.
    ///
    /// `result` keeps its request and response, restored and readable. If a
    /// body cannot be copied the fan-out stops there: earlier plugins have the
    /// result, later ones never see it, and the error says where it stopped.
    ///
    /// Must not be called after [`signal_done`](Self::signal_done).
    pub async fn send_result(&self, result: &mut FuzzResult) -> Result<(), DispatchError> {
        self.fan_out(result, FuzzResult::fork).await
    }

    async fn fan_out<F>(&self, result: &mut FuzzResult, mut fork: F) -> Result<(), DispatchError>
    where
        F: FnMut(&mut FuzzResult) -> Result<FuzzResult, CloneError>,
    {
        for (delivered, plugin) in self.plugins.iter().enumerate() {
            // faulted or finished, reported once when its worker stopped
            if plugin.input.is_closed() {
                continue;
            }

            let copy = fork(result).map_err(|source| DispatchError {
                plugin: plugin.name.clone(),
                delivered,
                total: self.plugins.len(),
                source,
            })?;

            if plugin.input.send(copy).await.is_err() {
                debug!(plugin = %plugin.name, "plugin stopped listening, result dropped");
            }
        }
        Ok(())
    }

    /// Close every plugin's channel. Call once, after the last result was sent.
    pub fn signal_done(&self) {
        for plugin in &self.plugins {
            plugin.input.close();
        }
    }

    /// Wait until every plugin's worker has returned
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }

    /// Signal done, wait for the workers, and report plugins that panicked
    pub async fn shutdown(self) -> Vec<PluginFault> {
        self.signal_done();
        self.wait().await;
        self.faults()
    }

    /// Plugins that panicked so far
    pub fn faults(&self) -> Vec<PluginFault> {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Plugin names in delivery order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|plugin| plugin.name.as_str())
    }
}

impl fmt::Debug for PluginBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginBroker")
            .field("plugins", &self.names().collect::<Vec<_>>())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
