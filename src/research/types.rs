use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::research::error::ResearchError;

/// 调研深度档位，决定提示词使用的指令模板
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Shallow,
    Medium,
    Deep,
}

impl std::fmt::Display for Depth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Depth::Shallow => write!(f, "shallow"),
            Depth::Medium => write!(f, "medium"),
            Depth::Deep => write!(f, "deep"),
        }
    }
}

impl std::str::FromStr for Depth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "shallow" => Ok(Depth::Shallow),
            "medium" => Ok(Depth::Medium),
            "deep" => Ok(Depth::Deep),
            _ => Err(format!(
                "Unknown depth: {} (expected shallow, medium or deep)",
                s
            )),
        }
    }
}

/// 一次调研的输入参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchConfig {
    pub topic: String,
    pub depth: Depth,
    pub max_iterations: u32,
}

impl ResearchConfig {
    /// 从未经校验的原始输入构造配置
    pub fn parse(topic: &str, depth: &str, max_iterations: i64) -> Result<Self, ResearchError> {
        let depth = depth
            .parse::<Depth>()
            .map_err(ResearchError::InvalidConfig)?;
        if max_iterations <= 0 {
            return Err(ResearchError::InvalidConfig(format!(
                "max_iterations must be positive, got {}",
                max_iterations
            )));
        }
        let max_iterations = u32::try_from(max_iterations).map_err(|_| {
            ResearchError::InvalidConfig(format!("max_iterations too large: {}", max_iterations))
        })?;

        let config = Self {
            topic: topic.trim().to_string(),
            depth,
            max_iterations,
        };
        config.validate(None)?;
        Ok(config)
    }

    /// 校验配置；`ceiling` 为可选的迭代次数上限
    pub fn validate(&self, ceiling: Option<u32>) -> Result<(), ResearchError> {
        if self.topic.trim().is_empty() {
            return Err(ResearchError::InvalidConfig(
                "topic must not be blank".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ResearchError::InvalidConfig(
                "max_iterations must be positive, got 0".to_string(),
            ));
        }
        if let Some(ceiling) = ceiling
            && self.max_iterations > ceiling
        {
            return Err(ResearchError::InvalidConfig(format!(
                "max_iterations {} exceeds the configured ceiling {}",
                self.max_iterations, ceiling
            )));
        }
        Ok(())
    }
}

/// 单轮迭代的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    /// 从1开始的序号
    pub index: u32,
    /// 实际发送给模型的完整提示词
    pub prompt_used: String,
    /// 模型返回的原始文本
    pub response_text: String,
    pub created_at: DateTime<Utc>,
}

/// 调研提前结束的原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// 第 `iteration` 轮调用失败
    BackendFailure { iteration: u32, message: String },
    /// 第 `iteration` 轮进行中被取消
    Cancelled { iteration: u32 },
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::BackendFailure { iteration, message } => {
                write!(f, "第 {} 轮调用失败: {}", iteration, message)
            }
            StopReason::Cancelled { iteration } => write!(f, "第 {} 轮进行中被取消", iteration),
        }
    }
}

/// 一次完整调研的结果，整体持久化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRun {
    #[serde(flatten)]
    pub config: ResearchConfig,
    pub iterations: Vec<IterationResult>,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
    /// 迭代未跑满时记录原因
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_early: Option<StopReason>,
    /// 是否启用了Google搜索增强
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub use_google_search: bool,
}

impl ResearchRun {
    /// 迭代次数少于请求次数
    pub fn is_degraded(&self) -> bool {
        self.stopped_early.is_some()
    }

    pub fn iteration_count(&self) -> usize {
        self.iterations.len()
    }

    /// 最后一轮的回答
    pub fn last_response(&self) -> Option<&str> {
        self.iterations.last().map(|r| r.response_text.as_str())
    }
}
