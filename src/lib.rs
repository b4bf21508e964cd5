pub mod cli;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod extractor;
pub mod knn;
pub mod matcher;
pub mod orchestrator;
pub mod partition;
pub mod report;
pub mod resolver;
pub mod utils;
#[cfg(feature = "opencv")]
pub mod vision;

pub use config::Opts;
pub use descriptor::DescriptorMatrix;
pub use orchestrator::{Orchestrator, SearchConfig};
pub use report::Report;
