use serde::{Deserialize, Serialize};

/// 回答语言
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetLanguage {
    #[serde(rename = "zh")]
    Chinese,
    #[serde(rename = "en")]
    #[default]
    English,
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "ru")]
    Russian,
}

/// 语言代码、本地名称与可接受的别名
struct LanguageEntry {
    language: TargetLanguage,
    code: &'static str,
    native_name: &'static str,
    aliases: &'static [&'static str],
    instruction: &'static str,
}

static LANGUAGES: [LanguageEntry; 7] = [
    LanguageEntry {
        language: TargetLanguage::Chinese,
        code: "zh",
        native_name: "中文",
        aliases: &["chinese", "中文"],
        instruction: "请使用中文回答，确保表达准确、专业、易于理解。",
    },
    LanguageEntry {
        language: TargetLanguage::English,
        code: "en",
        native_name: "English",
        aliases: &["english", "英文"],
        instruction: "Answer in English. Keep the language precise and easy to follow.",
    },
    LanguageEntry {
        language: TargetLanguage::Japanese,
        code: "ja",
        native_name: "日本語",
        aliases: &["japanese", "日本語", "日文"],
        instruction: "日本語で回答してください。正確で分かりやすい表現を使ってください。",
    },
    LanguageEntry {
        language: TargetLanguage::Korean,
        code: "ko",
        native_name: "한국어",
        aliases: &["korean", "한국어", "韩文"],
        instruction: "한국어로 답변해 주세요. 정확하고 이해하기 쉬운 표현을 사용해 주세요.",
    },
    LanguageEntry {
        language: TargetLanguage::German,
        code: "de",
        native_name: "Deutsch",
        aliases: &["german", "deutsch", "德文"],
        instruction: "Antworten Sie auf Deutsch, präzise und leicht verständlich.",
    },
    LanguageEntry {
        language: TargetLanguage::French,
        code: "fr",
        native_name: "Français",
        aliases: &["french", "français", "法文"],
        instruction: "Répondez en français, de manière précise et facile à comprendre.",
    },
    LanguageEntry {
        language: TargetLanguage::Russian,
        code: "ru",
        native_name: "Русский",
        aliases: &["russian", "русский", "俄文"],
        instruction: "Отвечайте на русском языке, точно и понятно.",
    },
];

impl TargetLanguage {
    fn entry(&self) -> &'static LanguageEntry {
        // 表按枚举声明顺序排列
        &LANGUAGES[*self as usize]
    }

    /// 两字母语言代码
    pub fn code(&self) -> &'static str {
        self.entry().code
    }

    /// 语言的本地名称
    pub fn display_name(&self) -> &'static str {
        self.entry().native_name
    }

    /// 追加在每个提示词末尾的回答语言要求
    pub fn prompt_instruction(&self) -> &'static str {
        self.entry().instruction
    }
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for TargetLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        LANGUAGES
            .iter()
            .find(|entry| entry.code == wanted || entry.aliases.contains(&wanted.as_str()))
            .map(|entry| entry.language)
            .ok_or_else(|| format!("Unknown target language: {}", s))
    }
}
