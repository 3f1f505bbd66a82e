//! Build with `cargo build -p result-logger` and pass the resulting
//! `libresult_logger.so` to the host.

use httpfuzz::listeners::LogListener;

httpfuzz::export_plugin!("result-logger", LogListener::init);
