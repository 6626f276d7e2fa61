//! 提示词构建策略

use crate::config::PromptSettings;
use crate::i18n::TargetLanguage;
use crate::research::types::{Depth, IterationResult};

/// 总结提示词中每轮回答默认保留的字符数
pub const DEFAULT_SUMMARY_EXCERPT_CHARS: usize = 1000;

const SHALLOW_INSTRUCTION: &str = "Keep it brief and cover only the essential information.";
const MEDIUM_INSTRUCTION: &str =
    "Give a moderately detailed analysis and include illustrative examples.";
const DEEP_INSTRUCTION: &str = "Give a very detailed, in-depth analysis that covers multiple perspectives and concrete examples.";

/// 提示词构建能力，替换它即可定制调研风格
///
/// 任何 `Fn(&str, Depth, Option<&str>) -> String` 闭包都自动实现该trait。
pub trait PromptStrategy: Send + Sync {
    /// 构建第N轮迭代的提示词；`prior_response` 为上一轮的回答，首轮为 `None`
    fn build_prompt(&self, topic: &str, depth: Depth, prior_response: Option<&str>) -> String;

    /// 构建最终总结的提示词
    fn build_summary_prompt(&self, topic: &str, iterations: &[IterationResult]) -> String {
        summary_prompt(topic, iterations, DEFAULT_SUMMARY_EXCERPT_CHARS, None)
    }
}

impl<F> PromptStrategy for F
where
    F: Fn(&str, Depth, Option<&str>) -> String + Send + Sync,
{
    fn build_prompt(&self, topic: &str, depth: Depth, prior_response: Option<&str>) -> String {
        self(topic, depth, prior_response)
    }
}

/// 三个深度档位的指令文本
#[derive(Debug, Clone, PartialEq)]
pub struct DepthInstructions {
    pub shallow: String,
    pub medium: String,
    pub deep: String,
}

impl Default for DepthInstructions {
    fn default() -> Self {
        Self {
            shallow: SHALLOW_INSTRUCTION.to_string(),
            medium: MEDIUM_INSTRUCTION.to_string(),
            deep: DEEP_INSTRUCTION.to_string(),
        }
    }
}

impl DepthInstructions {
    /// 用配置覆盖内置文本，空字符串视为未配置
    pub fn from_settings(settings: &PromptSettings) -> Self {
        let pick = |custom: &Option<String>, fallback: &str| {
            custom
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        Self {
            shallow: pick(&settings.shallow, SHALLOW_INSTRUCTION),
            medium: pick(&settings.medium, MEDIUM_INSTRUCTION),
            deep: pick(&settings.deep, DEEP_INSTRUCTION),
        }
    }

    pub fn for_depth(&self, depth: Depth) -> &str {
        match depth {
            Depth::Shallow => &self.shallow,
            Depth::Medium => &self.medium,
            Depth::Deep => &self.deep,
        }
    }
}

/// 默认策略：首轮要求结构化综述，后续轮次基于上一轮回答继续深挖
#[derive(Debug, Clone)]
pub struct DefaultPromptStrategy {
    instructions: DepthInstructions,
    language: Option<TargetLanguage>,
    summary_excerpt_chars: usize,
}

impl Default for DefaultPromptStrategy {
    fn default() -> Self {
        Self {
            instructions: DepthInstructions::default(),
            language: None,
            summary_excerpt_chars: DEFAULT_SUMMARY_EXCERPT_CHARS,
        }
    }
}

impl DefaultPromptStrategy {
    pub fn new(instructions: DepthInstructions) -> Self {
        Self {
            instructions,
            ..Default::default()
        }
    }

    /// 在每个提示词末尾追加回答语言要求
    pub fn with_language(mut self, language: TargetLanguage) -> Self {
        self.language = Some(language);
        self
    }

    /// 0 表示不截断
    pub fn with_summary_excerpt_chars(mut self, chars: usize) -> Self {
        self.summary_excerpt_chars = chars;
        self
    }

    fn initial_prompt(&self, topic: &str, depth: Depth) -> String {
        let mut prompt = String::new();
        prompt.push_str(&format!(
            "Research the following topic. {}\n\n",
            self.instructions.for_depth(depth)
        ));
        prompt.push_str(&format!("Topic: {}\n\n", topic));
        prompt.push_str("Structure the answer as follows:\n");
        prompt.push_str("1. Core concepts and definitions\n");
        prompt.push_str("2. Key characteristics, strengths and weaknesses\n");
        prompt.push_str("3. Real-world applications and case studies\n");
        prompt.push_str("4. Recent trends and outlook\n");
        prompt.push_str("5. References for further study\n\n");
        prompt.push_str("Keep each section clearly separated.\n");
        self.push_language(&mut prompt);
        prompt
    }

    fn follow_up_prompt(&self, topic: &str, depth: Depth, prior_response: &str) -> String {
        let mut prompt = String::new();
        prompt.push_str(&format!(
            "Building on the previous answer, take the analysis deeper. {}\n\n",
            self.instructions.for_depth(depth)
        ));
        prompt.push_str(&format!("Topic: {}\n\n", topic));
        prompt.push_str("Previous answer:\n");
        prompt.push_str(prior_response);
        prompt.push_str("\n\n");
        prompt.push_str("Choose one of the following directions and go into more detail:\n");
        prompt.push_str("1. Expand on the concrete examples or cases mentioned in the previous answer\n");
        prompt.push_str("2. Present opposing views or alternative perspectives\n");
        prompt.push_str("3. Analyze the topic with real data or statistics\n");
        prompt.push_str("4. Forecast future prospects and trends\n\n");
        prompt.push_str("Deliver a deeper analysis along the chosen direction.\n");
        self.push_language(&mut prompt);
        prompt
    }

    fn push_language(&self, prompt: &mut String) {
        if let Some(language) = &self.language {
            prompt.push('\n');
            prompt.push_str(language.prompt_instruction());
            prompt.push('\n');
        }
    }
}

impl PromptStrategy for DefaultPromptStrategy {
    fn build_prompt(&self, topic: &str, depth: Depth, prior_response: Option<&str>) -> String {
        match prior_response {
            None => self.initial_prompt(topic, depth),
            Some(prior) => self.follow_up_prompt(topic, depth, prior),
        }
    }

    fn build_summary_prompt(&self, topic: &str, iterations: &[IterationResult]) -> String {
        summary_prompt(topic, iterations, self.summary_excerpt_chars, self.language)
    }
}

/// 将各轮回答综合为总结提示词
pub fn summary_prompt(
    topic: &str,
    iterations: &[IterationResult],
    excerpt_chars: usize,
    language: Option<TargetLanguage>,
) -> String {
    let mut prompt = String::new();
    prompt.push_str("Synthesize the following research results into a single cohesive summary.\n\n");
    prompt.push_str(&format!("Topic: {}\n", topic));
    prompt.push_str("Research results:\n");
    for iteration in iterations {
        prompt.push_str(&format!(
            "Iteration {}: {}\n",
            iteration.index,
            excerpt(&iteration.response_text, excerpt_chars)
        ));
    }
    prompt.push_str("\nIntegrate the key findings of every iteration into one or two concise paragraphs.\n");
    if let Some(language) = language {
        prompt.push('\n');
        prompt.push_str(language.prompt_instruction());
        prompt.push('\n');
    }
    prompt
}

/// 按字符截断，超出时以 `...` 结尾；`max_chars` 为 0 时原样返回
pub fn excerpt(text: &str, max_chars: usize) -> String {
    if max_chars == 0 || text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str("...");
    cut
}
