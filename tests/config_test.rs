//! Configuration Integration Tests
//!
//! YAML files with `${VAR}` expansion and the process environment loader.
//! Tests touching process environment variables run serially.

#[cfg(test)]
mod tests {
    use cloud_disk_e2e::config::{Config, ConfigError, ConfigLoader};
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const ENV_NAMES: [&str; 9] = [
        "BASE_URL",
        "TEST_USER",
        "TEST_PASSWORD",
        "OSS_ACCESS_KEY_ID",
        "OSS_ACCESS_KEY_SECRET",
        "OSS_BUCKET_NAME",
        "OSS_REGION",
        "OSS_ENDPOINT",
        "OSS_PATH_STYLE",
    ];

    fn clear_env() {
        for name in ENV_NAMES {
            std::env::remove_var(name);
        }
    }

    // ========================================================================
    // TEST: YAML
    // ========================================================================

    #[test]
    #[serial]
    fn test_yaml_with_env_expansion() {
        clear_env();
        std::env::set_var("E2E_TEST_SECRET", "hunter2");

        let file = yaml_file(
            r#"
api:
  base_url: "${E2E_TEST_BASE_URL:-http://disk.local:8888}"
  username: tester
  password: "${E2E_TEST_SECRET}"
  list_page_size: 20
storage:
  access_key_id: ak
  access_key_secret: sk
  bucket: disk
  region: oss-cn-beijing
"#,
        );

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.api.base_url(), "http://disk.local:8888");
        assert_eq!(config.api.username, "tester");
        assert_eq!(config.api.password, "hunter2");
        assert_eq!(config.api.list_page_size, 20);
        assert_eq!(config.api.resolve_page_size, 100);

        let storage = config.require_storage().unwrap();
        assert_eq!(storage.endpoint(), "https://oss-cn-beijing.aliyuncs.com");

        std::env::remove_var("E2E_TEST_SECRET");
    }

    /// An unexpanded password placeholder is reported as missing
    #[test]
    #[serial]
    fn test_yaml_unset_password_placeholder() {
        std::env::remove_var("E2E_TEST_SECRET");
        let file = yaml_file(
            r#"
api:
  password: "${E2E_TEST_SECRET}"
"#,
        );

        match Config::load(file.path()) {
            Err(ConfigError::Missing(names)) => assert_eq!(names, vec!["TEST_PASSWORD"]),
            other => panic!("expected missing password, got {:?}", other),
        }
    }

    /// Reading without validation allows a storage-only file
    #[test]
    fn test_yaml_storage_only() {
        let file = yaml_file(
            r#"
api: {}
storage:
  access_key_id: ak
  access_key_secret: sk
  bucket: disk
  region: oss-cn-hangzhou
  endpoint: http://127.0.0.1:9000
  path_style: true
"#,
        );

        let config = ConfigLoader::read(file.path()).unwrap();
        assert!(config.validate().is_err());
        let storage = config.require_storage().unwrap();
        assert_eq!(storage.endpoint(), "http://127.0.0.1:9000");
        assert!(storage.path_style);
    }

    #[test]
    fn test_yaml_parse_error() {
        let file = yaml_file("api: [not, a, mapping");
        assert!(matches!(
            ConfigLoader::read(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/cloud-disk-e2e.yaml"),
            Err(ConfigError::IoError(_))
        ));
    }

    // ========================================================================
    // TEST: Environment
    // ========================================================================

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        std::env::set_var("BASE_URL", "https://disk.example.com/");
        std::env::set_var("TEST_PASSWORD", "pw");

        let config = Config::from_env().unwrap();
        assert_eq!(config.api.base_url(), "https://disk.example.com");
        assert_eq!(config.api.username, "admin");
        assert!(config.storage.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_without_password() {
        clear_env();
        match Config::from_env() {
            Err(ConfigError::Missing(names)) => assert_eq!(names, vec!["TEST_PASSWORD"]),
            other => panic!("expected missing password, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_read_env_partial_storage() {
        clear_env();
        std::env::set_var("OSS_ACCESS_KEY_ID", "ak");
        std::env::set_var("OSS_REGION", "oss-cn-shanghai");

        let config = ConfigLoader::read_env();
        match config.require_storage() {
            Err(err @ ConfigError::Missing(_)) => {
                let message = err.to_string();
                assert!(message.contains("OSS_ACCESS_KEY_SECRET"));
                assert!(message.contains("OSS_BUCKET_NAME"));
                assert!(!message.contains("OSS_REGION"));
            }
            other => panic!("expected missing storage settings, got {:?}", other),
        }

        clear_env();
    }
}
