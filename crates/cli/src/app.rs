use crate::command;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub enum RunCmd {
    /// Start the stdio-based service talking to the editor host.
    #[clap(name = "rpc")]
    Rpc(command::rpc::Rpc),
    /// Render a Jsonnet file once and print the result.
    #[clap(name = "render")]
    Render(command::render::Render),
}

/// Jsonnet previewer CLI arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Enable the logging system.
    #[clap(long)]
    pub log: Option<PathBuf>,

    /// Specify the path of the config file.
    #[clap(long)]
    pub config_file: Option<PathBuf>,
}

impl RunCmd {
    pub async fn run(self, args: Args) -> Result<()> {
        match self {
            Self::Render(render) => render.run(args).await,
            Self::Rpc(rpc) => rpc.run(args).await,
        }
    }
}
