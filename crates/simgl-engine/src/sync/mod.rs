//! Cross-thread startup notification.

mod signal;

pub use signal::{Signal, SignalFuture};
