//! Tests for TOML configuration parsing.

use super::toml::{TomlConfig, default_config_template};

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [webhook]
            url = "https://example.com/webhook"
        "#;

        let config = TomlConfig::parse(toml).unwrap();
        assert_eq!(
            config.webhook.url.as_deref(),
            Some("https://example.com/webhook")
        );
        assert!(!config.webhook.discord_only);
    }

    #[test]
    fn parse_full_webhook_section() {
        let toml = r#"
            [webhook]
            url = "https://discord.com/api/webhooks/1/abc"
            thread_id = "987"
            bearer = "secret-token"
            username = "Deploy Bot"
            avatar_url = "https://example.com/a.png"
            discord_only = true

            [webhook.headers]
            X-Custom-Header = "custom-value"
            X-Other = "other"
        "#;

        let config = TomlConfig::parse(toml).unwrap();
        let webhook = &config.webhook;

        assert_eq!(webhook.thread_id.as_deref(), Some("987"));
        assert_eq!(webhook.bearer.as_deref(), Some("secret-token"));
        assert_eq!(webhook.username.as_deref(), Some("Deploy Bot"));
        assert_eq!(webhook.avatar_url.as_deref(), Some("https://example.com/a.png"));
        assert!(webhook.discord_only);
        assert_eq!(webhook.headers.len(), 2);
        assert_eq!(
            webhook.headers.get("X-Custom-Header").map(String::as_str),
            Some("custom-value")
        );
    }

    #[test]
    fn parse_retry_section() {
        let toml = r"
            [retry]
            max_attempts = 5
            initial_delay_ms = 250
            max_delay_ms = 10000
            multiplier = 1.5
            jitter_percent = 10
        ";

        let config = TomlConfig::parse(toml).unwrap();
        let retry = &config.retry;

        assert_eq!(retry.max_attempts, Some(5));
        assert_eq!(retry.initial_delay_ms, Some(250));
        assert_eq!(retry.max_delay_ms, Some(10_000));
        assert!(retry.multiplier.is_some_and(|m| (m - 1.5).abs() < f64::EPSILON));
        assert_eq!(retry.jitter_percent, Some(10));
    }

    #[test]
    fn parse_dispatch_section() {
        let toml = r#"
            [dispatch]
            max_concurrent = 4
            request_timeout = 30
            stale_policy = "probe"
            min_send_interval_ms = 200
        "#;

        let config = TomlConfig::parse(toml).unwrap();
        let dispatch = &config.dispatch;

        assert_eq!(dispatch.max_concurrent, Some(4));
        assert_eq!(dispatch.request_timeout, Some(30));
        assert_eq!(dispatch.stale_policy.as_deref(), Some("probe"));
        assert_eq!(dispatch.min_send_interval_ms, Some(200));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = TomlConfig::parse("").unwrap();

        assert!(config.webhook.url.is_none());
        assert!(config.webhook.headers.is_empty());
        assert!(config.retry.max_attempts.is_none());
        assert!(config.dispatch.stale_policy.is_none());
    }
}

mod errors {
    use super::*;

    #[test]
    fn unknown_field_is_rejected() {
        let toml = r#"
            [webhook]
            url = "https://example.com"
            method = "PUT"
        "#;

        assert!(TomlConfig::parse(toml).is_err());
    }

    #[test]
    fn unknown_section_is_rejected() {
        let toml = r"
            [monitor]
            poll_interval = 60
        ";

        assert!(TomlConfig::parse(toml).is_err());
    }

    #[test]
    fn wrong_type_is_rejected() {
        let toml = r#"
            [retry]
            max_attempts = "three"
        "#;

        assert!(TomlConfig::parse(toml).is_err());
    }

    #[test]
    fn jitter_out_of_u8_range_is_rejected() {
        let toml = r"
            [retry]
            jitter_percent = 300
        ";

        assert!(TomlConfig::parse(toml).is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = TomlConfig::load(std::path::Path::new("/nonexistent/webhook-dispatch.toml"))
            .unwrap_err();

        assert!(err.to_string().contains("/nonexistent/webhook-dispatch.toml"));
    }
}

mod template {
    use super::*;

    #[test]
    fn default_template_parses() {
        let config = TomlConfig::parse(&default_config_template()).unwrap();

        assert!(config.webhook.url.is_none());
        assert!(config.retry.max_attempts.is_none());
        assert!(config.dispatch.max_concurrent.is_none());
    }

    #[test]
    fn default_template_mentions_every_section() {
        let template = default_config_template();

        assert!(template.contains("[webhook]"));
        assert!(template.contains("[retry]"));
        assert!(template.contains("[dispatch]"));
        assert!(template.contains("stale_policy"));
    }
}
