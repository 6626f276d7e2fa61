//! 文本生成能力的抽象，以及基于rig的默认实现

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::LLMConfig;

pub mod client;

pub use client::LLMClient;

/// 单次生成请求的参数
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    /// 模型标识
    pub model: String,
    /// 最大输出tokens
    pub max_tokens: u32,
    pub temperature: f64,
    /// 单次请求的超时时间
    pub timeout: Duration,
    /// 是否启用Google搜索增强（仅Gemini）
    pub google_search: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::from(&LLMConfig::default())
    }
}

impl From<&LLMConfig> for GenerationOptions {
    fn from(config: &LLMConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_seconds),
            google_search: config.google_search,
        }
    }
}

/// 文本生成服务：输入一段提示词，返回一段文本
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;
}
