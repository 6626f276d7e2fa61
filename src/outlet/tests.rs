#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use crate::outlet::{
        JsonFileOutlet, Outlet, load_research_results, print_research_summary,
        render_research_summary, save_research_results, timestamp_to_filename,
    };
    use crate::research::{
        Depth, IterationResult, ResearchConfig, ResearchError, ResearchRun, StopReason,
    };

    fn sample_run() -> ResearchRun {
        let created_at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();
        ResearchRun {
            config: ResearchConfig {
                topic: "AI ethics and governance".to_string(),
                depth: Depth::Deep,
                max_iterations: 3,
            },
            iterations: vec![
                IterationResult {
                    index: 1,
                    prompt_used: "first prompt".to_string(),
                    response_text: "R1".to_string(),
                    created_at,
                },
                IterationResult {
                    index: 2,
                    prompt_used: "second prompt with R1".to_string(),
                    response_text: "R2".to_string(),
                    created_at,
                },
            ],
            summary: "Combined view of R1 and R2".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 10, 19, 9, 31, 5).unwrap(),
            stopped_early: Some(StopReason::BackendFailure {
                iteration: 3,
                message: "HTTP 503".to_string(),
            }),
            use_google_search: false,
        }
    }

    #[test]
    fn test_timestamp_to_filename_format() {
        let timestamp = Utc.with_ymd_and_hms(2026, 10, 19, 9, 31, 5).unwrap();
        let name = timestamp_to_filename("AI ethics: risks & fixes!", &timestamp);
        assert_eq!(name, "research_AI_ethics_risks__fixes_20261019_093105_000.json");
    }

    #[test]
    fn test_timestamp_to_filename_truncates_and_keeps_unicode() {
        let timestamp = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let long_topic = "a".repeat(80);
        let name = timestamp_to_filename(&long_topic, &timestamp);
        assert_eq!(name, format!("research_{}_20260102_030405_000.json", "a".repeat(50)));

        let korean = timestamp_to_filename("인공지능 윤리", &timestamp);
        assert_eq!(korean, "research_인공지능_윤리_20260102_030405_000.json");
    }

    #[test]
    fn test_timestamp_to_filename_empty_topic() {
        let timestamp = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let name = timestamp_to_filename("?!", &timestamp);
        assert_eq!(name, "research_untitled_20260102_030405_000.json");
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let run = sample_run();
        let target = temp_dir.path().join("nested").join("run.json");

        let written = save_research_results(&run, Some(&target)).await.unwrap();
        assert_eq!(written, target);
        assert!(target.exists());

        let loaded = load_research_results(&written).await.unwrap();
        assert_eq!(loaded, run);
    }

    #[tokio::test]
    async fn test_saved_file_uses_flat_schema() {
        let temp_dir = TempDir::new().unwrap();
        let run = sample_run();
        let target = temp_dir.path().join("run.json");

        save_research_results(&run, Some(&target)).await.unwrap();
        let content = std::fs::read_to_string(&target).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert_eq!(value["topic"], "AI ethics and governance");
        assert_eq!(value["depth"], "deep");
        assert_eq!(value["max_iterations"], 3);
        assert_eq!(value["iterations"].as_array().unwrap().len(), 2);
        assert_eq!(value["summary"], "Combined view of R1 and R2");
        assert_eq!(value["stopped_early"]["reason"], "backend_failure");
        // 临时文件已被重命名
        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_json_file_outlet_uses_generated_name() {
        let temp_dir = TempDir::new().unwrap();
        let run = sample_run();
        let outlet = JsonFileOutlet::new(temp_dir.path());

        let written = outlet.save(&run).await.unwrap();

        assert_eq!(written.parent().unwrap(), temp_dir.path());
        assert_eq!(
            written.file_name().unwrap().to_string_lossy(),
            "research_AI_ethics_and_governance_20261019_093105_000.json"
        );
        assert_eq!(load_research_results(&written).await.unwrap(), run);
    }

    #[tokio::test]
    async fn test_save_failure_is_persistence_failure() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not_a_dir");
        std::fs::write(&blocker, "file").unwrap();
        let run = sample_run();

        let result = save_research_results(&run, Some(&blocker.join("run.json"))).await;

        match result {
            Err(err @ ResearchError::PersistenceFailure { .. }) => {
                assert_eq!(err.stage(), "persistence");
            }
            other => panic!("expected PersistenceFailure, got {:?}", other),
        }
        // 内存中的结果不受影响
        assert_eq!(run.iterations.len(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_or_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.json");
        assert!(matches!(
            load_research_results(&missing).await,
            Err(ResearchError::Load { .. })
        ));

        let malformed = temp_dir.path().join("bad.json");
        std::fs::write(&malformed, r#"{"topic": "x", "depth": "abyssal"}"#).unwrap();
        assert!(matches!(
            load_research_results(&malformed).await,
            Err(ResearchError::Load { .. })
        ));
    }

    #[test]
    fn test_render_research_summary() {
        let report = render_research_summary(&sample_run());

        assert!(report.contains("AI ethics and governance"));
        assert!(report.contains("deep"));
        assert!(report.contains("2 / 3"));
        assert!(report.contains("HTTP 503"));
        assert!(report.contains("Combined view of R1 and R2"));
        assert!(report.contains("Google搜索: 否"));
    }

    #[tokio::test]
    async fn test_google_search_flag_round_trip_and_render() {
        let temp_dir = TempDir::new().unwrap();
        let mut run = sample_run();
        run.use_google_search = true;

        let path = save_research_results(&run, Some(&temp_dir.path().join("grounded.json")))
            .await
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["use_google_search"], true);

        let loaded = load_research_results(&path).await.unwrap();
        assert!(loaded.use_google_search);
        assert!(render_research_summary(&loaded).contains("Google搜索: 是"));
    }

    #[test]
    fn test_print_research_summary_writes_to_stream() {
        let mut buffer = Vec::new();
        print_research_summary(&sample_run(), &mut buffer).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output, render_research_summary(&sample_run()));
    }
}
