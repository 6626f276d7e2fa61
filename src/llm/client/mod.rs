//! LLM客户端 - 提供统一的LLM服务接口

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{LLMConfig, LLMProvider};
use crate::llm::{GenerationOptions, TextGenerator};
use crate::research::ResearchError;

mod providers;

use providers::ProviderClient;

/// 调研场景下统一使用的系统提示词
const RESEARCH_PREAMBLE: &str = "You are a meticulous research analyst. Answer with well-structured, factual and thorough content, and say so explicitly when information is uncertain.";

/// LLM客户端 - 负责重试、超时与请求间隔控制
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    client: ProviderClient,
    /// 上一次请求的发出时间，所有克隆共享
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl LLMClient {
    /// 创建新的LLM客户端，凭据缺失时直接失败
    pub fn new(config: LLMConfig) -> Result<Self, ResearchError> {
        if config.provider.requires_api_key() && config.api_key.trim().is_empty() {
            return Err(ResearchError::InvalidConfig(format!(
                "missing API key for provider {}; set it in the config file, pass --llm-api-key, or export {} / {}",
                config.provider,
                crate::config::API_KEY_ENV,
                config.provider.api_key_env().unwrap_or_default()
            )));
        }
        if config.timeout_seconds == 0 {
            return Err(ResearchError::InvalidConfig(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if config.google_search && config.provider != LLMProvider::Gemini {
            return Err(ResearchError::InvalidConfig(format!(
                "google search grounding is only supported by gemini, not {}",
                config.provider
            )));
        }
        let client = ProviderClient::new(&config).map_err(|e| {
            ResearchError::InvalidConfig(format!("failed to initialise {}: {}", config.provider, e))
        })?;
        Ok(Self {
            config,
            client,
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    /// 保证两次请求之间至少间隔 `min_request_interval_ms`
    async fn ensure_request_interval(&self) {
        let min_interval = Duration::from_millis(self.config.min_request_interval_ms);
        let mut last_request = self.last_request.lock().await;
        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < min_interval {
                let wait = min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "⏳ 等待请求间隔");
                tokio::time::sleep(wait).await;
            }
        }
        *last_request = Some(Instant::now());
    }

    /// 通用重试逻辑，失败后等待时间逐次翻倍
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let max_retries = self.config.retry_attempts.max(1);
        let mut delay = Duration::from_millis(self.config.retry_delay_ms);
        let mut retries = 0;

        loop {
            self.ensure_request_interval().await;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    warn!(
                        attempt = retries,
                        max_attempts = max_retries,
                        "❌ 调用模型服务出错: {}",
                        err
                    );
                    if retries >= max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
            }
        }
    }
}

#[async_trait]
impl TextGenerator for LLMClient {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let agent = self.client.create_agent(RESEARCH_PREAMBLE, options)?;

        self.retry_with_backoff(|| async {
            let text = tokio::time::timeout(options.timeout, agent.prompt(prompt))
                .await
                .map_err(|_| anyhow!("请求超时 ({}秒)", options.timeout.as_secs()))??;
            if text.trim().is_empty() {
                bail!("模型返回了空响应");
            }
            Ok(text)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::LLMClient;
    use super::providers::gemini_additional_params;
    use crate::config::{LLMConfig, LLMProvider};
    use crate::research::ResearchError;

    #[test]
    fn test_missing_api_key_is_invalid_config() {
        let config = LLMConfig {
            provider: LLMProvider::Gemini,
            api_key: "  ".to_string(),
            ..Default::default()
        };

        let result = LLMClient::new(config);
        assert!(matches!(result, Err(ResearchError::InvalidConfig(_))));
    }

    #[test]
    fn test_ollama_does_not_need_api_key() {
        let config = LLMConfig {
            provider: LLMProvider::Ollama,
            api_key: String::new(),
            ..Default::default()
        };

        assert!(LLMClient::new(config).is_ok());
    }

    #[test]
    fn test_openai_client_with_custom_base_url() {
        let config = LLMConfig {
            provider: LLMProvider::OpenAI,
            api_key: "test-key".to_string(),
            api_base_url: "http://localhost:8080/v1".to_string(),
            ..Default::default()
        };

        assert!(LLMClient::new(config).is_ok());
    }

    #[test]
    fn test_zero_timeout_is_invalid_config() {
        let config = LLMConfig {
            provider: LLMProvider::Ollama,
            timeout_seconds: 0,
            ..Default::default()
        };

        let result = LLMClient::new(config);
        assert!(matches!(result, Err(ResearchError::InvalidConfig(_))));
    }

    #[test]
    fn test_google_search_requires_gemini() {
        let config = LLMConfig {
            provider: LLMProvider::OpenAI,
            api_key: "test-key".to_string(),
            google_search: true,
            ..Default::default()
        };
        assert!(matches!(
            LLMClient::new(config),
            Err(ResearchError::InvalidConfig(_))
        ));

        let config = LLMConfig {
            provider: LLMProvider::Gemini,
            api_key: "test-key".to_string(),
            google_search: true,
            ..Default::default()
        };
        assert!(LLMClient::new(config).is_ok());
    }

    #[test]
    fn test_gemini_params_carry_google_search_tool() {
        let params = gemini_additional_params(true).unwrap();
        assert!(params["tools"][0]["google_search"].is_object());

        let params = gemini_additional_params(false).unwrap();
        assert!(params.get("tools").is_none());
    }
}
