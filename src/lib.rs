//! Fan-out of captured HTTP fuzzing results to runtime-loaded plugins.
//!
//! ```ignore
//! let broker = load_plugins(Logger::current(), ["./libreflections.so"])?;
//! for mut result in results {
//!     broker.send_result(&mut result).await?;
//! }
//! broker.signal_done();
//! broker.wait().await;
//! ```

pub mod client;
pub mod error;
pub mod listeners;
pub mod logger;
pub mod message;
pub mod plugin;
pub mod result;

pub use client::Client;
pub use error::*;
pub use logger::Logger;
pub use message::*;
pub use plugin::*;
pub use result::*;
