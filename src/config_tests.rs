//! Unit tests for configuration structures and parsing.

#[cfg(test)]
mod config_tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::config::*;
    use crate::error::OptimizerError;

    // ============= Rule Defaults =============

    #[test]
    fn test_rule_defaults() {
        let rules = OptimizationRules::default();

        assert_eq!(rules.budget.max_roas, 8.0);
        assert_eq!(rules.budget.reallocation_threshold, 0.15);
        assert_eq!(rules.budget.max_budget_increase, 0.25);
        assert!(rules.budget.safe_mode);
        assert_eq!(rules.budget.safe_mode_max_reallocation, 500.0);
        assert_eq!(rules.bidding.target_cpa, 45.0);
        assert_eq!(rules.bidding.bid_adjustment_rate, 0.1);
        assert_eq!(rules.performance.ctr_warning_threshold, 0.015);
        assert_eq!(rules.performance.ctr_critical_threshold, 0.01);
        assert_eq!(rules.performance.impression_share_target, 0.3);
    }

    #[test]
    fn test_optimizer_defaults() {
        let opt = OptimizerConfig::default();

        assert_eq!(opt.interval(), Duration::from_secs(900));
        assert_eq!(opt.fetch_timeout(), Duration::from_millis(10_000));
        assert_eq!(opt.action_timeout(), Duration::from_millis(15_000));
        assert_eq!(opt.scheduler, SchedulerKind::Interval);
        assert_eq!(opt.log_path, Some(PathBuf::from("./data/optimizations.jsonl")));
        assert_eq!(opt.history_window, 24);
    }

    // ============= YAML Parsing =============

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let config = AppConfig::from_yaml_str("platforms:\n  - name: google_ads\n").unwrap();

        assert_eq!(config.server.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.platforms[0].kind, PlatformKind::Sandbox);
        assert!(config.platforms[0].metrics.is_none());
        assert_eq!(config.actions.kind, PlatformKind::Sandbox);
        assert_eq!(config.rules.bidding.target_cpa, 45.0);
    }

    #[test]
    fn test_partial_rule_override() {
        let yaml = r#"
optimizer:
  interval_secs: 300
  scheduler: cron
  log_path: null
rules:
  budget:
    safe_mode: false
  bidding:
    target_cpa: 30
platforms:
  - name: google_ads
    kind: http
    base_url: "https://ads.example.com/api"
    api_key: "secret"
actions:
  kind: http
  base_url: "https://ads.example.com/api"
"#;
        let config = AppConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.optimizer.interval_secs, 300);
        assert_eq!(config.optimizer.scheduler, SchedulerKind::Cron);
        assert!(config.optimizer.log_path.is_none());
        assert!(!config.rules.budget.safe_mode);
        // Untouched siblings keep their defaults
        assert_eq!(config.rules.budget.max_roas, 8.0);
        assert_eq!(config.rules.bidding.target_cpa, 30.0);
        assert_eq!(config.rules.bidding.bid_adjustment_rate, 0.1);
        assert_eq!(config.platforms[0].api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_bom_is_stripped() {
        let yaml = "\u{feff}platforms:\n  - name: google_ads\n";
        assert!(AppConfig::from_yaml_str(yaml).is_ok());
    }

    // ============= Validation =============

    fn rejects(yaml: &str) -> String {
        match AppConfig::from_yaml_str(yaml) {
            Err(OptimizerError::Config(msg)) => msg,
            Err(other) => panic!("expected Config error, got {}", other),
            Ok(_) => panic!("expected config to be rejected"),
        }
    }

    #[test]
    fn test_validation_failures() {
        assert!(rejects("platforms: []\n").contains("at least one platform"));
        assert!(rejects("platforms:\n  - name: a\n  - name: a\n").contains("duplicate"));
        assert!(rejects("platforms:\n  - name: a\n    kind: http\n").contains("base_url"));
        assert!(rejects("platforms:\n  - name: a\nactions:\n  kind: http\n").contains("actions.base_url"));
        assert!(rejects("optimizer:\n  interval_secs: 0\nplatforms:\n  - name: a\n").contains("interval_secs"));

        let inverted = r#"
rules:
  performance:
    ctr_warning_threshold: 0.01
    ctr_critical_threshold: 0.02
platforms:
  - name: a
"#;
        assert!(rejects(inverted).contains("ctr_critical_threshold"));
    }

    #[test]
    fn test_missing_platforms_is_config_error() {
        assert!(matches!(
            AppConfig::from_yaml_str("server:\n  bind_addr: 127.0.0.1:8080\n"),
            Err(OptimizerError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "platforms:\n  - name: google_ads\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.platforms.len(), 1);

        assert!(matches!(
            AppConfig::load_from(dir.path().join("missing.yaml")),
            Err(OptimizerError::Config(_))
        ));
    }
}
