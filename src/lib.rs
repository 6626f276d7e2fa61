pub mod cli;
pub mod config;
pub mod i18n;
pub mod llm;
pub mod outlet;
pub mod research;
pub mod workflow;

// Re-export commonly used types
pub use config::Config;
pub use llm::{GenerationOptions, LLMClient, TextGenerator};
pub use research::{
    Depth, IterationResult, PromptStrategy, ResearchConfig, ResearchError, ResearchOrchestrator,
    ResearchRun, StopReason,
};
pub use workflow::launch;
