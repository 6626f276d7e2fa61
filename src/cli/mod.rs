use crate::config::{Config, DEFAULT_CONFIG_FILE, LLMProvider};
use crate::i18n::TargetLanguage;
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;

/// deep-research-rs - 由Rust与AI驱动的迭代式深度调研引擎
#[derive(Parser, Debug)]
#[command(name = "deep-research-rs")]
#[command(
    about = "Iterative deep research on top of large language models: every pass deepens the previous answer, the final pass synthesizes a summary, and the whole run is saved as JSON."
)]
#[command(version)]
pub struct Args {
    /// 调研主题
    pub topic: Option<String>,

    /// 调研深度 (shallow, medium, deep)
    #[arg(short, long)]
    pub depth: Option<String>,

    /// 最大迭代次数
    #[arg(short = 'i', long, allow_negative_numbers = true)]
    pub max_iterations: Option<i64>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 结果输出目录
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// 结果文件路径，指定后忽略输出目录
    #[arg(long)]
    pub output_file: Option<PathBuf>,

    /// 不保存调研结果
    #[arg(long)]
    pub no_save: bool,

    /// 读取并展示已保存的调研结果，不调用模型
    #[arg(long, conflicts_with = "topic")]
    pub show: Option<PathBuf>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// 模型标识
    #[arg(long)]
    pub model: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// 单次请求超时时间（秒）
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// 重试次数
    #[arg(long)]
    pub retry_attempts: Option<u32>,

    /// 启用Google搜索增强（仅gemini）
    #[arg(long)]
    pub google_search: bool,

    /// LLM Provider (openai, moonshot, deepseek, mistral, openrouter, anthropic, gemini, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// 回答语言 (zh, en, ja, ko, de, fr, ru)
    #[arg(long)]
    pub target_language: Option<String>,
}

/// 本次命令要执行的任务
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    Research(ResearchJob),
    Show(PathBuf),
}

/// 一次调研任务的原始参数，深度与迭代次数留给编排器校验
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchJob {
    pub topic: String,
    pub depth: String,
    pub max_iterations: i64,
    /// `None` 表示不保存
    pub destination: Option<Destination>,
}

/// 结果保存位置
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    Directory(PathBuf),
    File(PathBuf),
}

impl Args {
    /// 将CLI参数转换为配置与任务
    pub fn into_config_and_task(self) -> Result<(Config, Task)> {
        let mut config = if let Some(config_path) = &self.config {
            // 如果显式指定了配置文件路径，从该路径加载
            Config::from_file(config_path)
                .with_context(|| format!("无法读取配置文件 {:?}", config_path))?
        } else {
            // 如果没有显式指定配置文件，尝试从默认位置加载
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(DEFAULT_CONFIG_FILE);

            if default_config_path.exists() {
                Config::from_file(&default_config_path).with_context(|| {
                    format!("无法读取默认配置文件 {:?}", default_config_path)
                })?
            } else {
                Config::default()
            }
        };

        // 覆盖LLM配置
        if let Some(provider_str) = &self.llm_provider {
            config.llm.provider = provider_str
                .parse::<LLMProvider>()
                .map_err(anyhow::Error::msg)?;
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }
        if let Some(timeout_seconds) = self.timeout_seconds {
            config.llm.timeout_seconds = timeout_seconds;
        }
        if let Some(retry_attempts) = self.retry_attempts {
            config.llm.retry_attempts = retry_attempts;
        }
        config.llm.google_search = config.llm.google_search || self.google_search;
        config.llm.resolve_api_key();

        // 回答语言
        if let Some(target_language_str) = &self.target_language {
            config.research.target_language = target_language_str
                .parse::<TargetLanguage>()
                .map_err(anyhow::Error::msg)?;
        }
        if let Some(output_dir) = &self.output_dir {
            config.research.output_dir = output_dir.clone();
        }
        config.verbose = config.verbose || self.verbose;

        let task = if let Some(path) = self.show {
            Task::Show(path)
        } else {
            let Some(topic) = self.topic else {
                bail!("缺少调研主题，请提供 <TOPIC> 或使用 --show <FILE> 查看已保存的结果");
            };
            let destination = if self.no_save {
                None
            } else if let Some(file) = self.output_file {
                Some(Destination::File(file))
            } else {
                Some(Destination::Directory(config.research.output_dir.clone()))
            };
            Task::Research(ResearchJob {
                topic,
                depth: self
                    .depth
                    .unwrap_or_else(|| config.research.depth.to_string()),
                max_iterations: self
                    .max_iterations
                    .unwrap_or(i64::from(config.research.max_iterations)),
                destination,
            })
        };

        Ok((config, task))
    }
}
