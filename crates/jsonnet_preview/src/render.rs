use crate::html;
use crate::process::{stdout_of, ProcessError};
use crate::settings::{ConfigError, RenderConfig};
use jsonnet_config::{OutputFormat, PreviewConfig};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("compiler output is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to convert the output to YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Formats the JSON text printed by the compiler.
///
/// JSON is pretty-printed with an indentation of 4 spaces.
pub fn format_output(json_text: &str, format: OutputFormat) -> Result<String, RenderError> {
    let value: serde_json::Value = serde_json::from_str(json_text)?;

    match format {
        OutputFormat::Json => {
            let mut buf = Vec::with_capacity(json_text.len());
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
            value.serialize(&mut serializer)?;
            Ok(String::from_utf8_lossy(&buf).into_owned())
        }
        OutputFormat::Yaml => Ok(serde_yaml::to_string(&value)?),
    }
}

/// Compiles `source_file` and returns the formatted output.
///
/// The compiler reads the file from disk, unsaved edits are not visible.
pub async fn compile(config: &RenderConfig, source_file: &Path) -> Result<String, RenderError> {
    let command_line = config.command_line(source_file);

    let now = Instant::now();
    let stdout = stdout_of(config.command(source_file), &command_line, config.timeout).await?;
    tracing::debug!(
        %command_line,
        elapsed_ms = now.elapsed().as_millis(),
        stdout_size = stdout.len(),
        "Compiled jsonnet file"
    );

    format_output(&String::from_utf8_lossy(&stdout), config.output_format)
}

/// Renders `source_file` into a preview document.
///
/// Never fails, a failed render yields the error document.
pub async fn render(config: &RenderConfig, source_file: &Path) -> String {
    match compile(config, source_file).await {
        Ok(output) => html::document(&output),
        Err(err) => {
            tracing::debug!(?err, ?source_file, "Failed to render jsonnet file");
            html::error_document(&err.to_string())
        }
    }
}

/// Resolves the render config from `config` and renders `source_file`.
pub async fn render_file(config: &PreviewConfig, source_file: &Path) -> String {
    match RenderConfig::resolve(config) {
        Ok(render_config) => render(&render_config, source_file).await,
        Err(err) => html::error_document(&RenderError::from(err).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPILED: &str = r#"{"name": "app", "replicas": 3, "ports": [80, 443], "labels": {}}"#;

    const PRETTY: &str = r#"{
    "name": "app",
    "replicas": 3,
    "ports": [
        80,
        443
    ],
    "labels": {}
}"#;

    #[test]
    fn test_format_json() {
        assert_eq!(format_output(COMPILED, OutputFormat::Json).unwrap(), PRETTY);
    }

    #[test]
    fn test_format_yaml() {
        let yaml = format_output(COMPILED, OutputFormat::Yaml).unwrap();
        let decoded: serde_json::Value = serde_yaml::from_str(&yaml).unwrap();
        let expected: serde_json::Value = serde_json::from_str(COMPILED).unwrap();
        assert_eq!(decoded, expected);
        assert!(yaml.contains("name: app"), "{yaml}");
    }

    #[test]
    fn test_format_invalid_json() {
        let err = format_output("{not json", OutputFormat::Json).unwrap_err();
        assert!(matches!(err, RenderError::Json(_)));
    }

    #[cfg(unix)]
    mod with_stub_compiler {
        use super::*;
        use crate::stub::{render_config, stubs};
        use std::time::Duration;

        fn code_block(html: &str) -> &str {
            html.strip_prefix("<body><pre><code>")
                .and_then(|s| s.strip_suffix("</code></pre></body>"))
                .unwrap_or_else(|| panic!("not a success document: {html}"))
        }

        #[tokio::test]
        async fn test_render_json() {
            let config = render_config(&stubs().compiled, OutputFormat::Json);
            let html = render(&config, Path::new("main.jsonnet")).await;
            assert_eq!(code_block(&html), PRETTY);
        }

        #[tokio::test]
        async fn test_render_yaml() {
            let config = render_config(&stubs().compiled, OutputFormat::Yaml);
            let html = render(&config, Path::new("main.jsonnet")).await;
            let decoded: serde_json::Value = serde_yaml::from_str(code_block(&html)).unwrap();
            assert_eq!(decoded, serde_json::from_str::<serde_json::Value>(COMPILED).unwrap());
        }

        #[tokio::test]
        async fn test_render_compiler_failure() {
            let config = render_config(&stubs().boom, OutputFormat::Json);
            let html = render(&config, Path::new("main.jsonnet")).await;
            assert_eq!(html, "<body><i><pre>boom</pre></i></body>");
        }

        #[tokio::test]
        async fn test_render_malformed_output() {
            let config = render_config(&stubs().garbage, OutputFormat::Json);
            let html = render(&config, Path::new("main.jsonnet")).await;
            assert!(html.starts_with("<body><i><pre>compiler output is not valid JSON"));
        }

        #[tokio::test]
        async fn test_render_missing_executable() {
            let config = render_config(
                &stubs().dir.path().join("does-not-exist"),
                OutputFormat::Json,
            );
            let html = render(&config, Path::new("main.jsonnet")).await;
            assert!(html.starts_with("<body><i><pre>failed to spawn"), "{html}");
        }

        #[tokio::test]
        async fn test_render_timeout() {
            let mut config = render_config(&stubs().sleepy, OutputFormat::Json);
            config.timeout = Some(Duration::from_millis(300));
            let html = render(&config, Path::new("main.jsonnet")).await;
            assert!(html.contains("did not finish within"), "{html}");
        }

        #[tokio::test]
        async fn test_arguments_reach_the_compiler() {
            let mut config = render_config(&stubs().echo_args, OutputFormat::Json);
            config.ext_strs.insert("FOO".into(), "bar baz".into());
            config.lib_paths.push("vendor".into());

            let output = compile(&config, Path::new("/src/main file.jsonnet"))
                .await
                .unwrap();
            let value: serde_json::Value = serde_json::from_str(&output).unwrap();
            assert_eq!(
                value,
                serde_json::json!([
                    "-J",
                    "vendor",
                    "--ext-str",
                    "FOO=bar baz",
                    "/src/main file.jsonnet"
                ])
            );
        }

        #[tokio::test]
        async fn test_ext_str_name_is_not_expanded() {
            let mut config = render_config(&stubs().echo_args, OutputFormat::Json);
            config
                .ext_strs
                .insert("X$(echo INJECTED)".into(), "`id` $HOME".into());

            let output = compile(&config, Path::new("main.jsonnet")).await.unwrap();
            let value: serde_json::Value = serde_json::from_str(&output).unwrap();
            assert_eq!(
                value,
                serde_json::json!([
                    "--ext-str",
                    "X$(echo INJECTED)=`id` $HOME",
                    "main.jsonnet"
                ])
            );
        }

        #[tokio::test]
        async fn test_render_file_with_configured_stub() {
            let config = PreviewConfig {
                executable_path: Some(stubs().compiled.display().to_string()),
                ..Default::default()
            };
            let html = render_file(&config, Path::new("main.jsonnet")).await;
            assert_eq!(code_block(&html), PRETTY);
        }
    }
}
