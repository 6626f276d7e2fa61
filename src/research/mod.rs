// 迭代式深度调研
// Configured → Iterating(1..=max_iterations，失败或取消时提前结束) → Summarizing → Completed
// 首轮即失败或在首轮完成前取消则进入 Failed，不产生总结。

pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod types;

pub use error::ResearchError;
pub use orchestrator::{ResearchOrchestrator, ResearchSession, SessionState, StepOutcome};
pub use prompt::{DefaultPromptStrategy, DepthInstructions, PromptStrategy};
pub use types::{Depth, IterationResult, ResearchConfig, ResearchRun, StopReason};
