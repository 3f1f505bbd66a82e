//! Listeners that ship with the crate.

use crate::logger::Logger;
use crate::plugin::{Listener, Results};
use async_trait::async_trait;

/// Writes one log line per result.
///
/// ```text
/// [result] status=500 POST http://target.local/api/users location=body field="name" payload="%00" elapsed=120ms
/// ```
pub struct LogListener {
    logger: Logger,
}

impl LogListener {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Factory for registering or exporting this listener
    pub fn init(logger: Logger) -> anyhow::Result<Box<dyn Listener>> {
        Ok(Box::new(Self::new(logger)))
    }
}

#[async_trait]
impl Listener for LogListener {
    async fn listen(&mut self, results: Results) {
        let mut seen = 0usize;
        while let Ok(result) = results.recv().await {
            seen += 1;
            self.logger.info(format_args!(
                "[result] status={} {} {} location={} field={:?} payload={:?} elapsed={:?}",
                result.response.status().as_u16(),
                result.request.method(),
                result.request.uri(),
                result.location(),
                result.field_name(),
                result.payload(),
                result.time_elapsed(),
            ));
        }
        self.logger.debug(format_args!("{seen} results observed"));
    }
}
