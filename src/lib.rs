pub mod args;
pub mod diagnostic;
pub mod domain;
pub mod dump;
pub mod emit;
pub mod extract;
pub mod pipeline;
pub mod stats;
pub mod suffix;
pub mod utils;
pub mod walker;

pub use args::{Args, Metric};
pub use diagnostic::{Diagnostic, Fault};
pub use domain::SuffixList;
pub use pipeline::RunSummary;
pub use stats::Accumulator;
