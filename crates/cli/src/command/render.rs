use crate::app::Args;
use anyhow::{anyhow, Result};
use clap::Parser;
use jsonnet_config::{OutputFormat, PreviewConfig};
use jsonnet_preview::{render, RenderConfig};
use std::path::PathBuf;

/// Renders a Jsonnet file with the same settings the preview uses.
#[derive(Parser, Debug, Clone)]
pub struct Render {
    /// Jsonnet file to render.
    input: PathBuf,

    /// Path of the `jsonnet` executable.
    #[clap(long)]
    executable: Option<String>,

    /// External string variable, e.g. `--ext-str env=prod`.
    #[clap(long = "ext-str", value_parser = parse_key_val)]
    ext_strs: Vec<(String, String)>,

    /// Library search directory.
    #[clap(short = 'J', long = "jpath")]
    lib_paths: Vec<String>,

    /// Format of the output, `json` or `yaml`.
    #[clap(long)]
    output_format: Option<OutputFormat>,

    /// Print the HTML document handed to the preview pane.
    #[clap(long)]
    html: bool,
}

impl Render {
    pub async fn run(self, args: Args) -> Result<()> {
        let (config, config_err) = jsonnet_config::load_config_on_startup(args.config_file);
        if let Some(err) = config_err {
            eprintln!("Ignoring the invalid config file: {err}");
        }

        let preview_config = self.preview_config(&config.preview);

        if self.html {
            println!(
                "{}",
                jsonnet_preview::render_file(&preview_config, &self.input).await
            );
            return Ok(());
        }

        let render_config = RenderConfig::resolve(&preview_config)?;
        let output = render::compile(&render_config, &self.input)
            .await
            .map_err(|err| anyhow!("Failed to render {}: {err}", self.input.display()))?;
        println!("{output}");

        Ok(())
    }

    /// Options on the command line take precedence over the config file.
    fn preview_config(&self, base: &PreviewConfig) -> PreviewConfig {
        let mut config = base.clone();
        if let Some(executable) = &self.executable {
            config.executable_path = Some(executable.clone());
        }
        config.ext_strs.extend(self.ext_strs.iter().cloned());
        config.lib_paths.extend(self.lib_paths.iter().cloned());
        if let Some(output_format) = self.output_format {
            config.output_format = output_format;
        }
        config
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty variable name in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
