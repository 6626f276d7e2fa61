use std::path::PathBuf;

use thiserror::Error;

/// 调研流程对调用方暴露的错误
#[derive(Debug, Error)]
pub enum ResearchError {
    /// 主题、深度或迭代次数不合法，在任何模型调用之前检出
    #[error("invalid research configuration: {0}")]
    InvalidConfig(String),

    /// 第一轮迭代即调用失败，没有可挽救的部分结果
    #[error("text-generation backend unavailable: {message}")]
    BackendUnavailable { message: String },

    /// 尚未完成任何一轮迭代就被取消
    #[error("research cancelled before any iteration completed")]
    Cancelled,

    /// 结果写盘失败，内存中的调研结果依然有效
    #[error("failed to persist research results to {}: {source}", path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 读取已保存的调研结果失败
    #[error("failed to load research results from {}: {message}", path.display())]
    Load { path: PathBuf, message: String },
}

impl ResearchError {
    /// 出错的阶段，用于提示用户失败发生在哪一步
    pub fn stage(&self) -> &'static str {
        match self {
            ResearchError::InvalidConfig(_) => "validation",
            ResearchError::BackendUnavailable { .. } => "backend",
            ResearchError::Cancelled => "cancellation",
            ResearchError::PersistenceFailure { .. } => "persistence",
            ResearchError::Load { .. } => "load",
        }
    }
}
