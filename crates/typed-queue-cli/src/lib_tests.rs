//! Tests for the typed-queue-cli library module.

use super::*;
use std::io::Write;

const QUEUE_URL: &str = "https://sqs.us-east-1.amazonaws.com/123456789012/orders";

fn config_file(extension: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(extension)
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

mod parsing_tests {
    use super::*;

    #[test]
    fn test_send_parsing() {
        let cli = Cli::try_parse_from(["typed-queue", "--queue-url", QUEUE_URL, "send", "hello"])
            .unwrap();

        assert_eq!(cli.queue_url.as_deref(), Some(QUEUE_URL));
        match cli.command {
            Commands::Send { value } => assert_eq!(value, "hello"),
            other => panic!("Expected Send command, got {:?}", other),
        }
    }

    #[test]
    fn test_send_many_parsing() {
        let cli = Cli::try_parse_from(["typed-queue", "send-many", "--file", "values.txt"]).unwrap();
        match cli.command {
            Commands::SendMany { file } => assert_eq!(file, Some(PathBuf::from("values.txt"))),
            other => panic!("Expected SendMany command, got {:?}", other),
        }

        let cli = Cli::try_parse_from(["typed-queue", "send-many"]).unwrap();
        match cli.command {
            Commands::SendMany { file } => assert!(file.is_none(), "stdin is the default"),
            other => panic!("Expected SendMany command, got {:?}", other),
        }
    }

    #[test]
    fn test_config_parsing() {
        let cli = Cli::try_parse_from(["typed-queue", "config"]).unwrap();
        match cli.command {
            Commands::Config { format } => assert_eq!(format, ConfigFormat::Yaml),
            other => panic!("Expected Config command, got {:?}", other),
        }

        let cli = Cli::try_parse_from(["typed-queue", "config", "-f", "json"]).unwrap();
        match cli.command {
            Commands::Config { format } => assert_eq!(format, ConfigFormat::Json),
            other => panic!("Expected Config command, got {:?}", other),
        }

        assert!(Cli::try_parse_from(["typed-queue", "config", "-f", "xml"]).is_err());
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::try_parse_from([
            "typed-queue",
            "--log-level",
            "debug",
            "--json-logs",
            "resolve",
            "orders",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(cli.json_logs);
        match cli.command {
            Commands::Resolve { queue_name } => assert_eq!(queue_name, "orders"),
            other => panic!("Expected Resolve command, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_command() {
        assert!(Cli::try_parse_from(["typed-queue"]).is_err());
        assert!(Cli::try_parse_from(["typed-queue", "send"]).is_err());
    }
}

mod configuration_tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.queue.url, None);
        assert_eq!(config.sqs.region, "us-east-1");
        assert_eq!(config.sqs.timeout_seconds, 30);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_load_yaml_file() {
        let file = config_file(
            ".yaml",
            &format!(
                "queue:\n  url: {}\n  batch_limit: 5\nsqs:\n  region: eu-west-1\n  \
                 access_key_id: AKID\n  secret_access_key: secret\nlogging:\n  format: json\n",
                QUEUE_URL
            ),
        );

        let config = load_configuration(Some(file.path())).unwrap();

        assert_eq!(config.queue.url.as_deref(), Some(QUEUE_URL));
        assert_eq!(config.queue.batch_limit, Some(5));
        assert_eq!(config.queue.max_item_size, None);
        assert_eq!(config.sqs.region, "eu-west-1");
        assert_eq!(config.sqs.access_key_id.as_deref(), Some("AKID"));
        assert_eq!(config.sqs.timeout_seconds, 30, "Unset keys keep defaults");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_toml_file() {
        let file = config_file(
            ".toml",
            "[sqs]\nendpoint_url = \"http://localhost:4566\"\ntimeout_seconds = 5\n",
        );

        let config = load_configuration(Some(file.path())).unwrap();

        assert_eq!(
            config.sqs.endpoint_url.as_deref(),
            Some("http://localhost:4566")
        );
        assert_eq!(config.sqs.timeout_seconds, 5);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_configuration(Some(Path::new("/nonexistent/typed-queue.yaml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_load_rejects_invalid_client_config() {
        let file = config_file(".yaml", "sqs:\n  access_key_id: AKID\n");

        let result = load_configuration(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_resolve_queue_config() {
        let mut config = CliConfig::default();
        config.queue.url = Some(QUEUE_URL.to_string());
        config.queue.max_item_size = Some(1024);

        let queue_config = config.resolve_queue_config(None).unwrap();
        assert_eq!(queue_config.endpoint.as_str(), QUEUE_URL);
        assert_eq!(queue_config.max_item_size, Some(1024));
        assert_eq!(queue_config.batch_limit, None);

        let override_url = "http://localhost:4566/000000000000/other";
        let queue_config = config.resolve_queue_config(Some(override_url)).unwrap();
        assert_eq!(queue_config.endpoint.as_str(), override_url);
    }

    #[test]
    fn test_resolve_queue_config_errors() {
        let config = CliConfig::default();
        let err = config.resolve_queue_config(None).unwrap_err();
        assert!(matches!(
            err,
            CliError::Configuration(ConfigError::MissingRequired { ref key }) if key == "queue.url"
        ));
        assert_eq!(err.exit_code(), 1);

        let err = config.resolve_queue_config(Some("not a url")).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument { .. }));
        assert_eq!(err.exit_code(), 3);

        let mut config = CliConfig::default();
        config.queue.url = Some("ftp://example.com/queue".to_string());
        let err = config.resolve_queue_config(None).unwrap_err();
        assert!(matches!(
            err,
            CliError::Configuration(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let mut config = CliConfig::default();
        config.sqs.access_key_id = Some("AKID".to_string());
        config.sqs.secret_access_key = Some("super-secret".to_string());
        config.sqs.session_token = Some("token".to_string());

        let redacted = config.redacted();
        assert_eq!(redacted.sqs.access_key_id.as_deref(), Some("AKID"));
        assert_eq!(redacted.sqs.secret_access_key.as_deref(), Some(REDACTED));
        assert_eq!(redacted.sqs.session_token.as_deref(), Some(REDACTED));

        for format in [ConfigFormat::Yaml, ConfigFormat::Json, ConfigFormat::Toml] {
            let rendered = render_config(&redacted, &format).unwrap();
            assert!(!rendered.contains("super-secret"), "{:?} leaked the secret", format);
            assert!(rendered.contains("us-east-1"));
        }
    }

    #[test]
    fn test_rendered_json_round_trips() {
        let mut config = CliConfig::default();
        config.queue.url = Some(QUEUE_URL.to_string());

        let rendered = render_config(&config, &ConfigFormat::Json).unwrap();
        let parsed: CliConfig = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}

mod error_tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let missing = CliError::Configuration(ConfigError::MissingRequired {
            key: "queue.url".to_string(),
        });
        assert_eq!(missing.exit_code(), 1);

        let invalid_limits = CliError::Queue(QueueError::Configuration(
            ConfigurationError::Invalid {
                message: "batch_limit".to_string(),
            },
        ));
        assert_eq!(invalid_limits.exit_code(), 1);

        let queue = CliError::Queue(QueueError::QueueDoesNotExist {
            queue: QueueEndpoint::new(QUEUE_URL).unwrap(),
        });
        assert_eq!(queue.exit_code(), 2);
        assert_eq!(
            CliError::PartialFailure {
                failed: 1,
                total: 3
            }
            .exit_code(),
            2
        );

        let argument = CliError::InvalidArgument {
            arg: "VALUE".to_string(),
            message: "empty".to_string(),
        };
        assert_eq!(argument.exit_code(), 3);

        let io = CliError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.exit_code(), 4);
    }

    #[test]
    fn test_read_values_skips_blank_lines() {
        let file = config_file(".txt", "first\n\n  \nsecond\nthird\n");

        let values = read_values(Some(file.path())).unwrap();
        assert_eq!(values, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_read_values_missing_file() {
        let err = read_values(Some(Path::new("/nonexistent/values.txt"))).unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }
}
