// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::args::ExecutionMode;
use crate::config::consts::{DEFAULT_DELAY, DEFAULT_THREAD_NAME_PREFIX, MIN_STACK_SIZE};
use crate::errors::ConfigError;
use crate::partition::hardware_concurrency;

/// Engine-wide settings applied to every task a registry creates and every thread an
/// executor spawns.
///
/// Every field is optional in a config file; missing fields take their defaults.
///
/// # Fields
/// * `max_blocks` - Ceiling on blocks per task, below the hardware thread count (optional)
/// * `default_delay` - Initial pacing delay of every block (defaults to 1)
/// * `default_mode` - Initial run mode of every block (`normal` or `background`)
/// * `thread_name_prefix` - Prefix of block thread names (defaults to `parblock`)
/// * `stack_size` - Stack size of block threads in bytes (optional, platform default)
///
/// # Example
/// ```yaml
/// max_blocks: 4
/// default_delay: 10
/// default_mode: normal
/// thread_name_prefix: kernels
/// stack_size: 1048576
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub max_blocks: Option<usize>,
    pub default_delay: u64,
    pub default_mode: ExecutionMode,
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_blocks: None,
            default_delay: DEFAULT_DELAY,
            default_mode: ExecutionMode::Normal,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            stack_size: None,
        }
    }
}

impl EngineConfig {
    /// Blocks per task: the hardware thread count, lowered by `max_blocks` if set.
    pub fn block_limit(&self) -> usize {
        let hardware = hardware_concurrency();
        self.max_blocks.map_or(hardware, |max| max.min(hardware))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig = serde_yaml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_blocks == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_blocks",
                reason: "must allow at least one block".to_string(),
            });
        }
        if self.thread_name_prefix.is_empty() {
            return Err(ConfigError::Invalid {
                field: "thread_name_prefix",
                reason: "must not be empty".to_string(),
            });
        }
        if let Some(stack_size) = self.stack_size {
            if stack_size < MIN_STACK_SIZE {
                return Err(ConfigError::Invalid {
                    field: "stack_size",
                    reason: format!("{} is below the minimum of {} bytes", stack_size, MIN_STACK_SIZE),
                });
            }
        }
        Ok(())
    }
}

/// Load and validate a config file; the format follows the extension
/// (`.yaml`/`.yml` or `.toml`).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let read = || {
        fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    };

    match extension.as_deref() {
        Some("yaml") | Some("yml") => EngineConfig::from_yaml_str(&read()?),
        Some("toml") => EngineConfig::from_toml_str(&read()?),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_basic_yaml_config() {
        let yaml = r#"
max_blocks: 2
default_delay: 5
default_mode: background
thread_name_prefix: sums
"#;

        let cfg = EngineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.max_blocks, Some(2));
        assert_eq!(cfg.default_delay, 5);
        assert_eq!(cfg.default_mode, ExecutionMode::Background);
        assert_eq!(cfg.thread_name_prefix, "sums");
        assert_eq!(cfg.stack_size, None);
        assert!(cfg.block_limit() <= 2);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = EngineConfig::from_yaml_str("{}").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.block_limit(), hardware_concurrency());

        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        struct TestCase {
            name: &'static str,
            yaml: &'static str,
            field: &'static str,
        }

        let cases = vec![
            TestCase { name: "zero blocks", yaml: "max_blocks: 0", field: "max_blocks" },
            TestCase { name: "empty prefix", yaml: "thread_name_prefix: ''", field: "thread_name_prefix" },
            TestCase { name: "tiny stack", yaml: "stack_size: 1024", field: "stack_size" },
        ];

        for case in cases {
            match EngineConfig::from_yaml_str(case.yaml) {
                Err(ConfigError::Invalid { field, .. }) => {
                    assert_eq!(field, case.field, "case '{}'", case.name)
                }
                other => panic!("case '{}': expected invalid config, got {:?}", case.name, other),
            }
        }
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = EngineConfig::from_yaml_str("max_threads: 4").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_load_yaml_and_toml_files() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("engine.yaml");
        std::fs::write(&yaml_path, "max_blocks: 3\ndefault_delay: 7\n").unwrap();
        let cfg = load_config(&yaml_path).unwrap();
        assert_eq!(cfg.max_blocks, Some(3));
        assert_eq!(cfg.default_delay, 7);

        let toml_path = dir.path().join("engine.toml");
        let mut file = std::fs::File::create(&toml_path).unwrap();
        writeln!(file, "default_mode = \"background\"").unwrap();
        writeln!(file, "stack_size = 65536").unwrap();
        let cfg = load_config(&toml_path).unwrap();
        assert_eq!(cfg.default_mode, ExecutionMode::Background);
        assert_eq!(cfg.stack_size, Some(65_536));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("engine.json");
        std::fs::write(&json_path, "{}").unwrap();
        assert!(matches!(
            load_config(&json_path),
            Err(ConfigError::UnsupportedFormat(_))
        ));

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(load_config(&missing), Err(ConfigError::Io { .. })));
    }
}
