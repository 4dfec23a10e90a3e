use std::{fs, path};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("Invalid config value for `{key}`: expected {expected}")]
    InvalidValue { key: String, expected: &'static str },
}

pub trait Configurable {
    fn config(&self) -> &serde_yaml::Value;

    // read configuration from yaml config
    fn load_config(
        config_file_path: impl AsRef<path::Path>,
    ) -> Result<serde_yaml::Value, ConfigError> {
        let content: String = fs::read_to_string(config_file_path)?;
        let config: serde_yaml::Value = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Extract Value from config using dot notation i.e. "cache.ttl"
    fn get_config_value(&self, key: &str) -> Option<&serde_yaml::Value> {
        let keys: Vec<&str> = key.split('.').collect();
        get_value_recursive(self.config(), &keys)
    }

    /// String at `key`, `default` when the key is absent.
    fn get_config_str(
        &self,
        key: &str,
        default: &str,
    ) -> Result<String, ConfigError> {
        match self.get_config_value(key) {
            None | Some(serde_yaml::Value::Null) => Ok(default.to_string()),
            Some(value) => value.as_str().map(str::to_string).ok_or_else(|| {
                ConfigError::InvalidValue {
                    key: key.to_string(),
                    expected: "string",
                }
            }),
        }
    }

    /// Unsigned integer at `key`, `default` when the key is absent.
    fn get_config_u64(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        match self.get_config_value(key) {
            None | Some(serde_yaml::Value::Null) => Ok(default),
            Some(value) => value.as_u64().ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                expected: "unsigned integer",
            }),
        }
    }
}

impl Configurable for serde_yaml::Value {
    fn config(&self) -> &serde_yaml::Value {
        self
    }
}

pub(crate) fn get_value_recursive<'a>(
    config: &'a serde_yaml::Value,
    keys: &[&str],
) -> Option<&'a serde_yaml::Value> {
    if keys.is_empty() || keys[0].is_empty() {
        return None;
    };

    match config {
        serde_yaml::Value::Mapping(map) => {
            let key = keys[0];
            let remaining_keys = &keys[1..];

            let value = map.get(serde_yaml::Value::String(key.to_string()))?;
            if remaining_keys.is_empty() {
                Some(value)
            } else {
                get_value_recursive(value, remaining_keys)
            }
        }
        _ => None,
    }
}
