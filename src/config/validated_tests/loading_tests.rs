//! Tests for configuration loading and required fields.

use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, tempdir};

use super::*;

mod required_fields {
    use super::*;

    #[test]
    fn missing_url_returns_error() {
        let cli = cli(&["--content", "hi"]);
        let result = ValidatedConfig::from_raw(&cli, None);

        assert!(matches!(
            result,
            Err(ConfigError::MissingRequired { field: "url", .. })
        ));
    }

    #[test]
    fn missing_content_returns_error() {
        let cli = cli(&["--url", "https://example.com"]);
        let result = ValidatedConfig::from_raw(&cli, None);

        assert!(matches!(
            result,
            Err(ConfigError::MissingRequired {
                field: "content",
                ..
            })
        ));
    }

    #[test]
    fn any_message_source_satisfies_content() {
        for extra in [
            &["--content", "hi"][..],
            &["--embed-title", "t"][..],
            &["--embed-description", "d"][..],
            &["--file", "a.txt"][..],
            &["--stdin"][..],
        ] {
            let mut args = vec!["--url", "https://example.com"];
            args.extend(extra);

            assert!(
                ValidatedConfig::from_raw(&cli(&args), None).is_ok(),
                "rejected {extra:?}"
            );
        }
    }

    #[test]
    fn url_from_toml() {
        let cli = cli(&["--content", "hi"]);
        let toml = toml(
            r#"
            [webhook]
            url = "https://example.com/webhook"
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli, Some(&toml)).unwrap();

        assert_eq!(config.endpoint.url().as_str(), "https://example.com/webhook");
    }
}

mod config_load {
    use super::*;

    #[test]
    fn load_from_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [webhook]
            url = "https://example.com/webhook"

            [dispatch]
            max_concurrent = 3
        "#
        )
        .unwrap();

        let cli = cli(&["--config", file.path().to_str().unwrap(), "--content", "hi"]);
        let config = ValidatedConfig::load(&cli).unwrap();

        assert_eq!(config.endpoint.url().as_str(), "https://example.com/webhook");
        assert_eq!(config.engine.max_concurrent, 3);
    }

    #[test]
    fn load_without_config_file() {
        let config = ValidatedConfig::load(&minimal(&[])).unwrap();

        assert_eq!(config.endpoint.url().as_str(), "https://example.com/hook");
    }

    #[test]
    fn load_nonexistent_config_file_returns_error() {
        let cli = minimal(&["--config", "nonexistent_file_12345.toml"]);
        let result = ValidatedConfig::load(&cli);

        assert!(matches!(result, Err(ConfigError::FileRead { .. })));
    }

    #[test]
    fn load_malformed_config_file_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[webhook\nurl = ").unwrap();

        let cli = minimal(&["--config", file.path().to_str().unwrap()]);
        let result = ValidatedConfig::load(&cli);

        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }
}

mod write_config {
    use super::super::super::validated::write_default_config;
    use super::*;

    #[test]
    fn write_default_config_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test-config.toml");

        write_default_config(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("[webhook]"));
        assert!(content.contains("[retry]"));
        assert!(content.contains("[dispatch]"));
    }

    #[test]
    fn written_config_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roundtrip.toml");
        write_default_config(&path).unwrap();

        let cli = minimal(&["--config", path.to_str().unwrap()]);

        assert!(ValidatedConfig::load(&cli).is_ok());
    }

    #[test]
    fn write_default_config_to_invalid_path_returns_error() {
        let path = Path::new("/nonexistent_dir_12345/config.toml");
        let result = write_default_config(path);

        assert!(matches!(result, Err(ConfigError::FileWrite { .. })));
    }
}
