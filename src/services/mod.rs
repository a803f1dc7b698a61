pub mod extractor;
pub mod fetchers;
pub mod merge;
pub mod openai_client;
pub mod orchestrator;
pub mod scoring;

pub use fetchers::*;
pub use openai_client::*;
pub use orchestrator::*;
pub use scoring::*;
