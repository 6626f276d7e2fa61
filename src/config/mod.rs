use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::i18n::TargetLanguage;
use crate::research::Depth;

/// 默认配置文件名，位于当前工作目录
pub const DEFAULT_CONFIG_FILE: &str = "deep-research.toml";

/// 通用的API KEY环境变量，优先级高于各Provider自己的环境变量
pub const API_KEY_ENV: &str = "DEEP_RESEARCH_API_KEY";

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "moonshot")]
    Moonshot,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    #[default]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
}

impl LLMProvider {
    /// 全部受支持的Provider
    pub const ALL: [LLMProvider; 8] = [
        LLMProvider::OpenAI,
        LLMProvider::Moonshot,
        LLMProvider::DeepSeek,
        LLMProvider::Mistral,
        LLMProvider::OpenRouter,
        LLMProvider::Anthropic,
        LLMProvider::Gemini,
        LLMProvider::Ollama,
    ];

    /// 配置文件与命令行中使用的名称
    pub fn name(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "openai",
            LLMProvider::Moonshot => "moonshot",
            LLMProvider::DeepSeek => "deepseek",
            LLMProvider::Mistral => "mistral",
            LLMProvider::OpenRouter => "openrouter",
            LLMProvider::Anthropic => "anthropic",
            LLMProvider::Gemini => "gemini",
            LLMProvider::Ollama => "ollama",
        }
    }

    /// 该Provider惯用的API KEY环境变量
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LLMProvider::OpenAI => Some("OPENAI_API_KEY"),
            LLMProvider::Moonshot => Some("MOONSHOT_API_KEY"),
            LLMProvider::DeepSeek => Some("DEEPSEEK_API_KEY"),
            LLMProvider::Mistral => Some("MISTRAL_API_KEY"),
            LLMProvider::OpenRouter => Some("OPENROUTER_API_KEY"),
            LLMProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            LLMProvider::Gemini => Some("GOOGLE_API_KEY"),
            LLMProvider::Ollama => None,
        }
    }

    /// 是否必须提供API KEY（本地Ollama不需要）
    pub fn requires_api_key(&self) -> bool {
        self.api_key_env().is_some()
    }
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        LLMProvider::ALL
            .into_iter()
            .find(|provider| provider.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = LLMProvider::ALL.iter().map(|p| p.name()).collect();
                format!("Unknown provider: {} (expected one of: {})", s, known.join(", "))
            })
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// LLM模型配置
    pub llm: LLMConfig,

    /// 调研流程配置
    pub research: ResearchSettings,

    /// 提示词配置
    pub prompts: PromptSettings,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址，为空时使用Provider的官方地址
    pub api_base_url: String,

    /// 模型标识
    pub model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 首次重试间隔（毫秒），之后每次翻倍
    pub retry_delay_ms: u64,

    /// 单次请求超时时间（秒）
    pub timeout_seconds: u64,

    /// 两次请求之间的最小间隔（毫秒）
    pub min_request_interval_ms: u64,

    /// 是否启用Google搜索增强，仅Gemini支持
    pub google_search: bool,
}

/// 调研流程配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ResearchSettings {
    /// 默认调研深度
    pub depth: Depth,

    /// 默认迭代次数
    pub max_iterations: u32,

    /// 迭代次数上限，用于控制调用成本
    pub max_iterations_ceiling: u32,

    /// 结果输出目录
    pub output_dir: PathBuf,

    /// 生成总结时每轮回答保留的最大字符数
    pub summary_excerpt_chars: usize,

    /// 回答使用的语言
    pub target_language: TargetLanguage,
}

/// 各深度档位的指令文本，未配置时使用内置文本
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PromptSettings {
    pub shallow: Option<String>,
    pub medium: Option<String>,
    pub deep: Option<String>,
}

impl Config {
    /// 从TOML文件加载配置，未出现的字段取默认值
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

impl LLMConfig {
    /// 补全API KEY：显式配置 > DEEP_RESEARCH_API_KEY > Provider专属环境变量
    ///
    /// 只在进程启动时调用一次，调研流程本身不会读取环境变量。
    pub fn resolve_api_key(&mut self) {
        if !self.api_key.trim().is_empty() {
            return;
        }

        let from_env = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| {
                self.provider
                    .api_key_env()
                    .and_then(|name| std::env::var(name).ok())
                    .filter(|v| !v.trim().is_empty())
            });

        if let Some(key) = from_env {
            self.api_key = key;
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: String::new(),
            api_base_url: String::new(),
            model: String::from("gemini-2.5-pro"),
            max_tokens: 8192,
            temperature: 0.7,
            retry_attempts: 3,
            retry_delay_ms: 2000,
            timeout_seconds: 60,
            min_request_interval_ms: 3000,
            google_search: false,
        }
    }
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            depth: Depth::Deep,
            max_iterations: 3,
            max_iterations_ceiling: 10,
            output_dir: PathBuf::from("."),
            summary_excerpt_chars: 1000,
            target_language: TargetLanguage::default(),
        }
    }
}
