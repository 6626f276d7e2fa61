//! 调研结果的持久化与展示

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::info;

use crate::research::{ResearchError, ResearchRun};

/// 文件名中保留的主题最大字符数
const MAX_TOPIC_CHARS: usize = 50;

/// 调研结果输出端
pub trait Outlet {
    async fn save(&self, run: &ResearchRun) -> Result<PathBuf, ResearchError>;
}

/// 将调研结果以JSON写入目录，文件名由主题与完成时间生成
pub struct JsonFileOutlet {
    output_dir: PathBuf,
}

impl JsonFileOutlet {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// 该结果将被写入的路径
    pub fn path_for(&self, run: &ResearchRun) -> PathBuf {
        self.output_dir
            .join(timestamp_to_filename(&run.config.topic, &run.timestamp))
    }
}

impl Outlet for JsonFileOutlet {
    async fn save(&self, run: &ResearchRun) -> Result<PathBuf, ResearchError> {
        save_research_results(run, Some(&self.path_for(run))).await
    }
}

/// 生成结果文件名：`research_<主题>_<YYYYMMDD_HHMMSS_毫秒>.json`
///
/// 主题截取前50个字符，空白替换为下划线，只保留字母数字与下划线。
pub fn timestamp_to_filename(topic: &str, timestamp: &DateTime<Utc>) -> String {
    let safe_topic: String = topic
        .chars()
        .take(MAX_TOPIC_CHARS)
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    let safe_topic = if safe_topic.is_empty() {
        "untitled".to_string()
    } else {
        safe_topic
    };

    format!(
        "research_{}_{}.json",
        safe_topic,
        timestamp.format("%Y%m%d_%H%M%S_%3f")
    )
}

/// 保存调研结果，未指定路径时写入当前目录下的默认文件名
///
/// 先写临时文件再重命名，失败时不会留下半截文件。
pub async fn save_research_results(
    run: &ResearchRun,
    path: Option<&Path>,
) -> Result<PathBuf, ResearchError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(timestamp_to_filename(&run.config.topic, &run.timestamp)),
    };
    let persist_err = |source: std::io::Error| ResearchError::PersistenceFailure {
        path: path.clone(),
        source,
    };

    let content = serde_json::to_string_pretty(run).map_err(|e| persist_err(e.into()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(persist_err)?;
    }

    let tmp_path = temp_path_for(&path);
    fs::write(&tmp_path, content).await.map_err(persist_err)?;
    if let Err(e) = fs::rename(&tmp_path, &path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(persist_err(e));
    }

    info!("💾 调研结果已保存: {}", path.display());
    Ok(path)
}

/// 读取已保存的调研结果
pub async fn load_research_results(path: &Path) -> Result<ResearchRun, ResearchError> {
    let load_err = |message: String| ResearchError::Load {
        path: path.to_path_buf(),
        message,
    };

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| load_err(e.to_string()))?;
    let run: ResearchRun = serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))?;

    info!("📂 已加载调研结果: {}", path.display());
    Ok(run)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "research.json".to_string());
    path.with_file_name(format!(".{}.tmp", file_name))
}

/// 渲染调研摘要
pub fn render_research_summary(run: &ResearchRun) -> String {
    let rule = "=".repeat(60);
    let mut report = String::new();

    report.push('\n');
    report.push_str(&rule);
    report.push('\n');
    report.push_str(&format!("🔬 深度调研结果: {}\n", run.config.topic));
    report.push_str(&rule);
    report.push('\n');
    report.push_str(&format!(
        "📅 完成时间: {}\n",
        run.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    report.push_str(&format!("🔍 调研深度: {}\n", run.config.depth));
    report.push_str(&format!(
        "🌍 Google搜索: {}\n",
        if run.use_google_search { "是" } else { "否" }
    ));
    report.push_str(&format!(
        "🔄 迭代次数: {} / {}\n",
        run.iteration_count(),
        run.config.max_iterations
    ));
    if let Some(reason) = &run.stopped_early {
        report.push_str(&format!("⚠️ 提前结束: {}\n", reason));
    }

    report.push_str("\n📋 最终总结:\n");
    report.push_str(&"-".repeat(40));
    report.push('\n');
    report.push_str(&run.summary);
    report.push('\n');

    report
}

/// 将调研摘要输出到指定的流
pub fn print_research_summary<W: Write>(run: &ResearchRun, out: &mut W) -> std::io::Result<()> {
    out.write_all(render_research_summary(run).as_bytes())?;
    out.flush()
}

// Include tests
#[cfg(test)]
mod tests;
