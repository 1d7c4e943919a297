pub mod engine;
pub mod merge;
pub mod policy;
pub mod retrieval;
pub mod types;

pub use engine::{run_research, ResearchEngine};
pub use retrieval::Retriever;
pub use types::{ResearchOutput, ResearchTask};
