//! Error reporting for the application boundary.

mod report;

pub use report::{ErrorReport, Frame};
