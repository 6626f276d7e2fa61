use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::llm::{GenerationOptions, TextGenerator};
use crate::research::error::ResearchError;
use crate::research::prompt::{DefaultPromptStrategy, DepthInstructions, PromptStrategy};
use crate::research::types::{IterationResult, ResearchConfig, ResearchRun, StopReason};

/// 总结生成失败时写入的占位前缀
pub const SUMMARY_FAILED_PREFIX: &str = "Summary generation failed";

/// 迭代式调研编排器
///
/// 每轮把上一轮的回答作为上下文继续深挖，结束后再发起一次总结调用。
/// 编排器本身不持有可变状态，多个调研可以共享同一个实例并发执行。
#[derive(Clone)]
pub struct ResearchOrchestrator {
    generator: Arc<dyn TextGenerator>,
    strategy: Arc<dyn PromptStrategy>,
    options: GenerationOptions,
    max_iterations_ceiling: Option<u32>,
}

impl ResearchOrchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>, options: GenerationOptions) -> Self {
        Self {
            generator,
            strategy: Arc::new(DefaultPromptStrategy::default()),
            options,
            max_iterations_ceiling: None,
        }
    }

    /// 按应用配置组装编排器：提示词覆盖、回答语言、迭代上限与生成参数
    pub fn from_config(config: &Config, generator: Arc<dyn TextGenerator>) -> Self {
        let strategy = DefaultPromptStrategy::new(DepthInstructions::from_settings(&config.prompts))
            .with_language(config.research.target_language)
            .with_summary_excerpt_chars(config.research.summary_excerpt_chars);

        Self::new(generator, GenerationOptions::from(&config.llm))
            .with_strategy(strategy)
            .with_max_iterations_ceiling(config.research.max_iterations_ceiling)
    }

    /// 替换提示词构建策略
    pub fn with_strategy(mut self, strategy: impl PromptStrategy + 'static) -> Self {
        self.strategy = Arc::new(strategy);
        self
    }

    /// 0 表示不设上限
    pub fn with_max_iterations_ceiling(mut self, ceiling: u32) -> Self {
        self.max_iterations_ceiling = (ceiling > 0).then_some(ceiling);
        self
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// 校验原始输入后执行完整调研
    pub async fn research_topic(
        &self,
        topic: &str,
        depth: &str,
        max_iterations: i64,
    ) -> Result<ResearchRun, ResearchError> {
        let config = ResearchConfig::parse(topic, depth, max_iterations)?;
        self.research(config).await
    }

    /// 执行完整调研
    pub async fn research(&self, config: ResearchConfig) -> Result<ResearchRun, ResearchError> {
        self.research_until(config, std::future::pending::<()>())
            .await
    }

    /// 执行调研，`cancel` 完成时丢弃进行中的调用并用已完成的迭代提前收尾
    pub async fn research_until<C>(
        &self,
        config: ResearchConfig,
        cancel: C,
    ) -> Result<ResearchRun, ResearchError>
    where
        C: Future<Output = ()>,
    {
        let mut session = self.start(config)?;
        tokio::pin!(cancel);

        loop {
            let outcome = tokio::select! {
                outcome = session.step() => Some(outcome),
                _ = &mut cancel => None,
            };
            match outcome {
                Some(StepOutcome::Continued) => continue,
                Some(StepOutcome::Exhausted) | Some(StepOutcome::Stopped) => break,
                None => {
                    // 取消信号只触发一次，已完成的迭代照常总结
                    session.cancel();
                    return session.finalize().await;
                }
            }
        }

        session.finalize_until(cancel).await
    }

    /// 开始一次调研，返回可逐步推进的会话
    pub fn start(&self, config: ResearchConfig) -> Result<ResearchSession<'_>, ResearchError> {
        config.validate(self.max_iterations_ceiling)?;
        info!(
            topic = %config.topic,
            depth = %config.depth,
            max_iterations = config.max_iterations,
            "🔍 开始深度调研"
        );
        Ok(ResearchSession {
            orchestrator: self,
            config,
            iterations: Vec::new(),
            state: SessionState::Iterating,
            stopped_early: None,
            failure: None,
        })
    }
}

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Iterating,
    Summarizing,
    Completed,
    Failed,
}

/// 单步推进的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// 本轮成功，还有剩余迭代
    Continued,
    /// 迭代次数已用完
    Exhausted,
    /// 因失败或取消而停止迭代
    Stopped,
}

/// 一次调研的运行期状态，独占所有中间结果
pub struct ResearchSession<'a> {
    orchestrator: &'a ResearchOrchestrator,
    config: ResearchConfig,
    iterations: Vec<IterationResult>,
    state: SessionState,
    stopped_early: Option<StopReason>,
    failure: Option<ResearchError>,
}

impl ResearchSession<'_> {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// 已成功完成的迭代
    pub fn iterations(&self) -> &[IterationResult] {
        &self.iterations
    }

    /// 执行下一轮迭代
    pub async fn step(&mut self) -> StepOutcome {
        if self.state != SessionState::Iterating {
            return StepOutcome::Stopped;
        }

        let max_iterations = self.config.max_iterations;
        let index = self.iterations.len() as u32 + 1;
        if index > max_iterations {
            self.state = SessionState::Summarizing;
            return StepOutcome::Exhausted;
        }

        info!("📚 迭代 {}/{} 执行中...", index, max_iterations);
        let prior_response = self.iterations.last().map(|r| r.response_text.as_str());
        let prompt = self.orchestrator.strategy.build_prompt(
            &self.config.topic,
            self.config.depth,
            prior_response,
        );
        debug!(iteration = index, prompt_chars = prompt.chars().count(), "提示词已构建");

        let result = self
            .orchestrator
            .generator
            .generate(&prompt, &self.orchestrator.options)
            .await
            .and_then(|text| {
                if text.trim().is_empty() {
                    Err(anyhow::anyhow!("empty response"))
                } else {
                    Ok(text)
                }
            });

        match result {
            Ok(response_text) => {
                self.iterations.push(IterationResult {
                    index,
                    prompt_used: prompt,
                    response_text,
                    created_at: Utc::now(),
                });
                info!("✓ 迭代 {}/{} 完成", index, max_iterations);

                if index >= max_iterations {
                    self.state = SessionState::Summarizing;
                    StepOutcome::Exhausted
                } else {
                    StepOutcome::Continued
                }
            }
            Err(err) if self.iterations.is_empty() => {
                warn!(iteration = index, "❌ 首轮调用失败，调研终止: {:#}", err);
                self.state = SessionState::Failed;
                self.failure = Some(ResearchError::BackendUnavailable {
                    message: format!("{:#}", err),
                });
                StepOutcome::Stopped
            }
            Err(err) => {
                warn!(
                    iteration = index,
                    completed = self.iterations.len(),
                    requested = max_iterations,
                    "⚠️ 调研降级: 第 {} 轮调用失败，使用已完成的迭代继续总结: {:#}",
                    index,
                    err
                );
                self.state = SessionState::Summarizing;
                self.stopped_early = Some(StopReason::BackendFailure {
                    iteration: index,
                    message: format!("{:#}", err),
                });
                StepOutcome::Stopped
            }
        }
    }

    /// 停止继续迭代，保留已完成的结果
    pub fn cancel(&mut self) {
        if self.state != SessionState::Iterating {
            return;
        }

        let interrupted = self.iterations.len() as u32 + 1;
        if self.iterations.is_empty() {
            warn!("🛑 调研在首轮完成前被取消");
            self.state = SessionState::Failed;
            self.failure = Some(ResearchError::Cancelled);
        } else if interrupted > self.config.max_iterations {
            self.state = SessionState::Summarizing;
        } else {
            warn!(
                completed = self.iterations.len(),
                "🛑 调研被取消，使用已完成的迭代收尾"
            );
            self.state = SessionState::Summarizing;
            self.stopped_early = Some(StopReason::Cancelled {
                iteration: interrupted,
            });
        }
    }

    /// 生成总结并产出最终结果；迭代尚未结束时按取消处理
    pub async fn finalize(self) -> Result<ResearchRun, ResearchError> {
        self.finalize_until(std::future::pending::<()>()).await
    }

    /// 同 [`finalize`](Self::finalize)，`cancel` 完成时放弃进行中的总结调用并写入占位总结
    pub async fn finalize_until<C>(mut self, cancel: C) -> Result<ResearchRun, ResearchError>
    where
        C: Future<Output = ()>,
    {
        if self.state == SessionState::Iterating {
            self.cancel();
        }
        if self.state == SessionState::Failed {
            return Err(self.failure.take().unwrap_or(ResearchError::Cancelled));
        }

        info!("📝 生成最终总结（基于 {} 轮迭代）...", self.iterations.len());
        let summary_prompt = self
            .orchestrator
            .strategy
            .build_summary_prompt(&self.config.topic, &self.iterations);

        let generation = self
            .orchestrator
            .generator
            .generate(&summary_prompt, &self.orchestrator.options);
        let outcome = tokio::select! {
            result = generation => Some(result),
            _ = cancel => None,
        };

        let summary = match outcome {
            Some(Ok(text)) if !text.trim().is_empty() => text,
            Some(Ok(_)) => {
                warn!("⚠️ 总结生成返回空内容");
                format!("{}: empty response", SUMMARY_FAILED_PREFIX)
            }
            Some(Err(err)) => {
                warn!("⚠️ 总结生成失败: {:#}", err);
                format!("{}: {:#}", SUMMARY_FAILED_PREFIX, err)
            }
            None => {
                warn!("🛑 总结生成被取消，使用占位总结");
                format!("{}: cancelled", SUMMARY_FAILED_PREFIX)
            }
        };

        self.state = SessionState::Completed;
        let run = ResearchRun {
            config: self.config,
            iterations: self.iterations,
            summary,
            timestamp: Utc::now(),
            stopped_early: self.stopped_early,
            use_google_search: self.orchestrator.options.google_search,
        };
        info!(
            "✅ 深度调研完成！共执行 {} 轮迭代",
            run.iteration_count()
        );
        Ok(run)
    }
}
