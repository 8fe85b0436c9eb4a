mod catalog;
mod engine;

pub use catalog::Report;
pub use engine::{ReportEngine, ReportResult};
