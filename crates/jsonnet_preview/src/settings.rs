//! Resolution of the compiler and its arguments.

use jsonnet_config::{OutputFormat, PreviewConfig};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Name of the compiler looked up in `PATH` when no explicit path is configured.
pub const DEFAULT_EXECUTABLE: &str = "jsonnet";

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Could not find `jsonnet` in PATH, install it or set `jsonnet.executablePath`")]
    ExecutableNotFound,
    #[error("`jsonnet.executablePath` must be set on Windows")]
    ExecutablePathRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    UnixLike,
    WindowsLike,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::WindowsLike
        } else {
            Self::UnixLike
        }
    }
}

/// Resolves the path of the compiler.
///
/// An explicitly configured path is used as is. Otherwise `lookup` probes the
/// search path for [`DEFAULT_EXECUTABLE`] on Unix-like platforms, while on
/// Windows-like platforms the explicit path is mandatory.
pub fn resolve_executable(
    configured: Option<&str>,
    platform: Platform,
    lookup: impl FnOnce(&str) -> Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = configured.map(str::trim).filter(|path| !path.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    match platform {
        Platform::UnixLike => lookup(DEFAULT_EXECUTABLE).ok_or(ConfigError::ExecutableNotFound),
        Platform::WindowsLike => Err(ConfigError::ExecutablePathRequired),
    }
}

/// Everything needed by a single render.
///
/// Recomputed from the current configuration on every render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub executable: PathBuf,
    pub ext_strs: BTreeMap<String, String>,
    pub lib_paths: Vec<String>,
    pub output_format: OutputFormat,
    pub timeout: Option<Duration>,
}

impl RenderConfig {
    /// Resolves the render config for the current platform.
    pub fn resolve(config: &PreviewConfig) -> Result<Self, ConfigError> {
        Self::resolve_with(config, Platform::current(), |name| which::which(name).ok())
    }

    pub fn resolve_with(
        config: &PreviewConfig,
        platform: Platform,
        lookup: impl FnOnce(&str) -> Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let executable = resolve_executable(config.executable_path.as_deref(), platform, lookup)?;

        Ok(Self {
            executable,
            ext_strs: config.ext_strs.clone(),
            lib_paths: config.lib_paths.clone(),
            output_format: config.output_format,
            timeout: (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs)),
        })
    }

    /// Arguments handed to the compiler to compile `source_file`.
    ///
    /// Every value is a separate argument, nothing is interpreted by a shell.
    pub fn args(&self, source_file: &Path) -> Vec<OsString> {
        let mut args = Vec::with_capacity(2 * (self.lib_paths.len() + self.ext_strs.len()) + 1);
        for dir in &self.lib_paths {
            args.push("-J".into());
            args.push(dir.into());
        }
        for (name, value) in &self.ext_strs {
            args.push("--ext-str".into());
            args.push(format!("{name}={value}").into());
        }
        args.push(source_file.into());
        args
    }

    /// Compiler invocation for `source_file`.
    pub fn command(&self, source_file: &Path) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(self.args(source_file));
        cmd
    }

    /// Human readable form of [`Self::command`], used in logs and messages.
    ///
    /// `"<executable>" [-J "DIR"]... [--ext-str NAME="VALUE"]... "<source_file>"`
    pub fn command_line(&self, source_file: &Path) -> String {
        [
            quote(&self.executable.to_string_lossy()),
            lib_path_args(&self.lib_paths),
            ext_str_args(&self.ext_strs),
            quote(&source_file.to_string_lossy()),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Builds the `--ext-str` fragment, one flag-and-quoted-value pair per binding.
///
/// `{FOO: "bar"}` yields `--ext-str FOO="bar"`, no bindings yield an empty string.
pub fn ext_str_args(ext_strs: &BTreeMap<String, String>) -> String {
    ext_strs
        .iter()
        .map(|(name, value)| format!("--ext-str {name}={}", quote(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds the `-J` fragment, one flag per library directory.
pub fn lib_path_args(lib_paths: &[String]) -> String {
    lib_paths
        .iter()
        .map(|dir| format!("-J {}", quote(dir)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Wraps `s` in double quotes, escaping `"` and `\\`.
fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found(_: &str) -> Option<PathBuf> {
        None
    }

    #[test]
    fn test_ext_str_args() {
        let ext_strs = BTreeMap::from([("FOO".to_string(), "bar".to_string())]);
        assert_eq!(ext_str_args(&ext_strs), r#"--ext-str FOO="bar""#);

        let ext_strs = BTreeMap::from([
            ("env".to_string(), "prod".to_string()),
            ("cluster".to_string(), "eu-1".to_string()),
        ]);
        assert_eq!(
            ext_str_args(&ext_strs),
            r#"--ext-str cluster="eu-1" --ext-str env="prod""#
        );

        assert_eq!(ext_str_args(&BTreeMap::new()), "");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote(r#"a"b$c\d"#), r#""a\"b$c\\d""#);
    }

    #[test]
    fn test_args_are_not_shell_words() {
        let render_config = RenderConfig {
            executable: PathBuf::from("jsonnet"),
            ext_strs: BTreeMap::from([
                ("X$(echo hi)".to_string(), "a b".to_string()),
                ("env".to_string(), "`prod`".to_string()),
            ]),
            lib_paths: vec!["my libs".to_string()],
            output_format: OutputFormat::Json,
            timeout: None,
        };

        let args = render_config.args(Path::new("/src/main file.jsonnet"));
        assert_eq!(
            args,
            [
                "-J",
                "my libs",
                "--ext-str",
                "X$(echo hi)=a b",
                "--ext-str",
                "env=`prod`",
                "/src/main file.jsonnet",
            ]
            .map(OsString::from)
        );

        let cmd = render_config.command(Path::new("a.jsonnet"));
        assert_eq!(cmd.as_std().get_program(), "jsonnet");
        assert_eq!(cmd.as_std().get_args().count(), 7);
    }

    #[test]
    fn test_configured_executable_wins() {
        for platform in [Platform::UnixLike, Platform::WindowsLike] {
            let path = resolve_executable(Some("/opt/bin/jsonnet"), platform, |_| {
                panic!("search path must not be probed")
            });
            assert_eq!(path, Ok(PathBuf::from("/opt/bin/jsonnet")));
        }
    }

    #[test]
    fn test_default_executable_on_unix() {
        let found = resolve_executable(None, Platform::UnixLike, |name| {
            assert_eq!(name, DEFAULT_EXECUTABLE);
            Some(PathBuf::from("/usr/bin/jsonnet"))
        });
        assert_eq!(found, Ok(PathBuf::from("/usr/bin/jsonnet")));

        assert_eq!(
            resolve_executable(Some("  "), Platform::UnixLike, not_found),
            Err(ConfigError::ExecutableNotFound)
        );
    }

    #[test]
    fn test_explicit_executable_is_mandatory_on_windows() {
        assert_eq!(
            resolve_executable(None, Platform::WindowsLike, |_| Some(PathBuf::from("x"))),
            Err(ConfigError::ExecutablePathRequired)
        );
    }

    #[test]
    fn test_render_config() {
        let config = PreviewConfig {
            executable_path: Some("/opt/jsonnet".into()),
            ext_strs: BTreeMap::from([("FOO".to_string(), "bar".to_string())]),
            lib_paths: vec!["vendor".to_string()],
            output_format: OutputFormat::Yaml,
            timeout_secs: 0,
        };

        let render_config =
            RenderConfig::resolve_with(&config, Platform::UnixLike, not_found).unwrap();
        assert_eq!(render_config.output_format, OutputFormat::Yaml);
        assert_eq!(render_config.timeout, None);
        assert_eq!(
            render_config.command_line(Path::new("/src/main.jsonnet")),
            r#""/opt/jsonnet" -J "vendor" --ext-str FOO="bar" "/src/main.jsonnet""#
        );

        let render_config = RenderConfig::resolve_with(
            &PreviewConfig {
                executable_path: Some("jsonnet".into()),
                ..Default::default()
            },
            Platform::UnixLike,
            not_found,
        )
        .unwrap();
        assert_eq!(render_config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(
            render_config.command_line(Path::new("a.jsonnet")),
            r#""jsonnet" "a.jsonnet""#
        );
    }
}
