use crate::logger::Logger;
use crate::result::FuzzResult;
use async_trait::async_trait;
use std::sync::Arc;

/// The stream of results handed to a plugin
pub type Results = async_channel::Receiver<FuzzResult>;

/// Implemented by plugins to observe every request/response transaction.
///
/// `listen` runs in its own task for the lifetime of the broker. Every result
/// it receives is its own copy: bodies and headers can be read and changed
/// freely without other plugins noticing.
#[async_trait]
pub trait Listener: Send + 'static {
    /// Consume results until the channel is closed, then return.
    ///
    /// Do not assume the stream is short. A listener that stops reading stalls
    /// the producer once its queue is full. A panic ends this plugin only; the
    /// broker records it as a [`PluginFault`](super::PluginFault).
    async fn listen(&mut self, results: Results);
}

/// Builds a listener, given the host's logger. Called once per load.
pub type Initializer = fn(Logger) -> anyhow::Result<Box<dyn Listener>>;

/// A registered factory, possibly capturing state
pub type Factory = Arc<dyn Fn(Logger) -> anyhow::Result<Box<dyn Listener>> + Send + Sync>;
