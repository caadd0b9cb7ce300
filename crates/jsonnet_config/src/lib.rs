use dirs::Dirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;

static CONFIG: OnceLock<ConfigInner> = OnceLock::new();

#[derive(Debug)]
struct ConfigInner {
    config: Config,
    file_path: Option<PathBuf>,
}

struct LoadedConfig {
    config: Config,
    file_path: Option<PathBuf>,
    maybe_error: Option<toml::de::Error>,
}

fn load_config(specified_config_file: Option<PathBuf>) -> LoadedConfig {
    let Some(config_file) = specified_config_file.or_else(Dirs::default_config_file) else {
        return LoadedConfig {
            config: Config::default(),
            file_path: None,
            maybe_error: None,
        };
    };

    let mut maybe_config_err = None;
    let config = match std::fs::read_to_string(&config_file) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_else(|err| {
            maybe_config_err.replace(err);
            Config::default()
        }),
        Err(err) => {
            tracing::debug!(?err, ?config_file, "Config file unavailable, using defaults");
            Config::default()
        }
    };

    LoadedConfig {
        config,
        file_path: Some(config_file),
        maybe_error: maybe_config_err,
    }
}

/// Initializes the global config, returning the parse error of the config file if any.
///
/// Only the first call takes effect, later calls return the config loaded initially.
pub fn load_config_on_startup(
    specified_config_file: Option<PathBuf>,
) -> (&'static Config, Option<toml::de::Error>) {
    let mut maybe_error = None;

    let inner = CONFIG.get_or_init(|| {
        let LoadedConfig {
            config,
            file_path,
            maybe_error: err,
        } = load_config(specified_config_file);
        maybe_error = err;
        ConfigInner { config, file_path }
    });

    (&inner.config, maybe_error)
}

pub fn config_file() -> Option<&'static PathBuf> {
    CONFIG.get().and_then(|inner| inner.file_path.as_ref())
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct LogConfig {
    /// Specify the log file path.
    ///
    /// This path must be an absolute path.
    pub log_file: Option<String>,

    /// Specify the max log level.
    pub max_level: String,

    /// Specify the log target to enable more detailed logging.
    ///
    /// ```toml
    /// [log]
    /// log-target = "jsonnet_server=trace,rpc=debug"
    /// ```
    pub log_target: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            max_level: "debug".into(),
            log_target: "".into(),
        }
    }
}

/// Format of the rendered preview.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            other => Err(format!("unknown output format `{other}`, expected json or yaml")),
        }
    }
}

/// Preview settings, shared by the config file and the editor settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Path of the `jsonnet` executable.
    ///
    /// Optional on Unix-like platforms where `jsonnet` is looked up in `PATH`,
    /// required on Windows.
    pub executable_path: Option<String>,

    /// External string variables passed to the compiler via `--ext-str`.
    ///
    /// # Example
    ///
    /// ```toml
    /// [preview.ext-strs]
    /// env = "prod"
    /// ```
    pub ext_strs: BTreeMap<String, String>,

    /// Library search directories passed to the compiler via `-J`.
    pub lib_paths: Vec<String>,

    /// Format of the rendered output, `json` or `yaml`.
    pub output_format: OutputFormat,

    /// Maximum number of seconds a single compiler run may take, `0` disables the limit.
    pub timeout_secs: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            executable_path: None,
            ext_strs: BTreeMap::new(),
            lib_paths: Vec::new(),
            output_format: OutputFormat::Json,
            timeout_secs: 30,
        }
    }
}

impl PreviewConfig {
    /// Returns a copy of this config overridden by the settings from the editor.
    pub fn with_host_settings(&self, settings: HostSettings) -> Self {
        let HostSettings {
            executable_path,
            ext_strs,
            lib_paths,
            output_format,
            timeout_secs,
        } = settings;

        let executable_path = executable_path
            .filter(|path| !path.trim().is_empty())
            .or_else(|| self.executable_path.clone());

        Self {
            executable_path,
            ext_strs: ext_strs.unwrap_or_else(|| self.ext_strs.clone()),
            lib_paths: lib_paths.unwrap_or_else(|| self.lib_paths.clone()),
            output_format: output_format.unwrap_or(self.output_format),
            timeout_secs: timeout_secs.unwrap_or(self.timeout_secs),
        }
    }
}

/// The `jsonnet` section of the editor's configuration store.
///
/// Every option is optional, an absent option falls back to the config file.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HostSettings {
    pub executable_path: Option<String>,
    pub ext_strs: Option<BTreeMap<String, String>>,
    pub lib_paths: Option<Vec<String>>,
    pub output_format: Option<OutputFormat>,
    pub timeout_secs: Option<u64>,
}

impl HostSettings {
    /// Parses the settings object sent by the editor, `null` means no settings.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            Ok(Self::default())
        } else {
            serde_json::from_value(value)
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// Log configuration.
    pub log: LogConfig,

    /// Preview configuration.
    pub preview: PreviewConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_config() {
        let toml_content = r#"
          [log]
          max-level = "trace"
          log-file = "/tmp/jsonnet-preview.log"

          [preview]
          executable-path = "/usr/local/bin/jsonnet"
          output-format = "yaml"
          lib-paths = ["vendor"]

          [preview.ext-strs]
          env = "prod"
"#;
        let user_config: Config =
            toml::from_str(toml_content).expect("Failed to deserialize config");

        assert_eq!(
            user_config,
            Config {
                log: LogConfig {
                    log_file: Some("/tmp/jsonnet-preview.log".to_string()),
                    max_level: "trace".to_string(),
                    ..Default::default()
                },
                preview: PreviewConfig {
                    executable_path: Some("/usr/local/bin/jsonnet".to_string()),
                    ext_strs: BTreeMap::from([("env".to_string(), "prod".to_string())]),
                    lib_paths: vec!["vendor".to_string()],
                    output_format: OutputFormat::Yaml,
                    ..Default::default()
                },
            }
        );
    }

    #[test]
    fn test_config_serialize() {
        let config = Config::default();
        toml::to_string_pretty(&config).expect("Serialize config is okay");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let toml_content = r#"
          [preview]
          executable = "jsonnet"
"#;
        assert!(toml::from_str::<Config>(toml_content).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("config.toml");
        std::fs::write(&config_file, "[preview]\ntimeout-secs = 5\n").unwrap();

        let loaded = load_config(Some(config_file.clone()));
        assert!(loaded.maybe_error.is_none());
        assert_eq!(loaded.file_path, Some(config_file));
        assert_eq!(loaded.config.preview.timeout_secs, 5);

        let broken_file = dir.path().join("broken.toml");
        std::fs::write(&broken_file, "[preview\n").unwrap();
        let loaded = load_config(Some(broken_file));
        assert!(loaded.maybe_error.is_some());
        assert_eq!(loaded.config, Config::default());
    }

    #[test]
    fn test_host_settings_override_config_file() {
        let file_config = PreviewConfig {
            executable_path: Some("/opt/jsonnet".to_string()),
            lib_paths: vec!["lib".to_string()],
            ..Default::default()
        };

        let settings = HostSettings::from_value(json!({
            "executablePath": "",
            "extStrs": {"FOO": "bar"},
            "outputFormat": "yaml"
        }))
        .unwrap();

        let merged = file_config.with_host_settings(settings);
        assert_eq!(merged.executable_path.as_deref(), Some("/opt/jsonnet"));
        assert_eq!(
            merged.ext_strs,
            BTreeMap::from([("FOO".to_string(), "bar".to_string())])
        );
        assert_eq!(merged.lib_paths, vec!["lib".to_string()]);
        assert_eq!(merged.output_format, OutputFormat::Yaml);
        assert_eq!(merged.timeout_secs, 30);

        assert_eq!(
            HostSettings::from_value(serde_json::Value::Null).unwrap(),
            HostSettings::default()
        );
    }

    #[test]
    fn test_parse_output_format() {
        assert_eq!("YAML".parse::<OutputFormat>(), Ok(OutputFormat::Yaml));
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
