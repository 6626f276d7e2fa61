use crate::cli::{Destination, ResearchJob, Task};
use crate::config::Config;
use crate::llm::LLMClient;
use crate::outlet::{
    JsonFileOutlet, Outlet, load_research_results, print_research_summary,
    save_research_results,
};
use crate::research::{ResearchConfig, ResearchOrchestrator, ResearchRun};

use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{info, warn};

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: Instant,
    phase_start_times: HashMap<String, Instant>,
    phase_durations: Vec<(String, Duration)>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_start_times: HashMap::new(),
            phase_durations: Vec::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &str) {
        self.phase_start_times
            .insert(phase_name.to_string(), Instant::now());
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &str) -> Option<Duration> {
        let start_time = self.phase_start_times.remove(phase_name)?;
        let duration = start_time.elapsed();
        self.phase_durations
            .push((phase_name.to_string(), duration));
        Some(duration)
    }

    /// 按结束顺序返回各阶段耗时
    pub fn phase_durations(&self) -> &[(String, Duration)] {
        &self.phase_durations
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒",
            self.start_time.elapsed().as_secs_f64()
        );
        for (phase, duration) in &self.phase_durations {
            report.push_str(&format!(", {}: {:.2}秒", phase, duration.as_secs_f64()));
        }
        report
    }
}

/// 时间跟踪常量
pub struct TimingKeys;

impl TimingKeys {
    pub const RESEARCH: &'static str = "research";
    pub const PERSIST: &'static str = "persist";
}

/// 启动命令行工作流
pub async fn launch(config: &Config, task: Task) -> Result<()> {
    match task {
        Task::Show(path) => {
            let run = load_research_results(&path).await?;
            print_research_summary(&run, &mut std::io::stdout().lock())?;
            Ok(())
        }
        Task::Research(job) => {
            info!(
                provider = %config.llm.provider,
                model = %config.llm.model,
                "🌐 回答语言: {}",
                config.research.target_language.display_name()
            );
            let client = LLMClient::new(config.llm.clone())?;
            let orchestrator = ResearchOrchestrator::from_config(config, Arc::new(client));
            execute(&orchestrator, job, interrupt_signal()).await.map(|_| ())
        }
    }
}

/// Ctrl-C 触发的取消信号，第二次 Ctrl-C 直接退出进程
fn interrupt_signal() -> impl Future<Output = ()> {
    cancel_on(async {
        tokio::signal::ctrl_c().await?;
        tokio::spawn(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("🛑 再次收到中断信号，立即退出");
                std::process::exit(130);
            }
        });
        Ok::<(), std::io::Error>(())
    })
}

/// 把系统信号转换为取消future
///
/// `signal` 返回错误（例如无法安装信号处理器）时，返回的future永远不会完成。
pub fn cancel_on<S>(signal: S) -> impl Future<Output = ()>
where
    S: Future<Output = std::io::Result<()>> + Send + 'static,
{
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                warn!("🛑 收到中断信号，停止后续调用并使用已完成的结果收尾（再次按下 Ctrl-C 立即退出）");
                let _ = cancel_tx.send(());
            }
            Err(e) => warn!("⚠️ 无法监听中断信号，Ctrl-C 将不可用: {}", e),
        }
    });

    async move {
        if cancel_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// 执行一次调研：调研 → 保存 → 展示
///
/// 保存失败时仍会展示结果，随后返回持久化错误。
pub async fn execute<C>(
    orchestrator: &ResearchOrchestrator,
    job: ResearchJob,
    cancel: C,
) -> Result<ResearchRun>
where
    C: Future<Output = ()>,
{
    let mut timing = TimingScope::new();
    println!("🚀 深度调研开始: {}", job.topic.trim());

    timing.start_phase(TimingKeys::RESEARCH);
    let config = ResearchConfig::parse(&job.topic, &job.depth, job.max_iterations)?;
    let run = orchestrator.research_until(config, cancel).await?;
    timing.end_phase(TimingKeys::RESEARCH);

    let persisted = match &job.destination {
        Some(destination) => {
            timing.start_phase(TimingKeys::PERSIST);
            let saved = persist(&run, destination).await;
            timing.end_phase(TimingKeys::PERSIST);
            Some(saved)
        }
        None => None,
    };

    print_research_summary(&run, &mut std::io::stdout().lock())?;
    info!("⏱️ {}", timing.generate_timing_report());

    match persisted {
        Some(Ok(path)) => {
            println!("\n🎉 调研完成！完整结果已保存至 {}", path.display());
            Ok(run)
        }
        Some(Err(e)) => {
            eprintln!("❌ 调研结果保存失败，可重新保存而无需重新调研: {}", e);
            Err(e.into())
        }
        None => Ok(run),
    }
}

async fn persist(
    run: &ResearchRun,
    destination: &Destination,
) -> Result<PathBuf, crate::research::ResearchError> {
    match destination {
        Destination::Directory(dir) => JsonFileOutlet::new(dir).save(run).await,
        Destination::File(path) => save_research_results(run, Some(path)).await,
    }
}
