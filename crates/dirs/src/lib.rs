use directories::ProjectDirs;
use std::path::PathBuf;
use std::sync::OnceLock;

pub struct Dirs;

impl Dirs {
    /// Project directory of the jsonnet previewer.
    ///
    /// Returns `None` if no valid home directory can be found, in which
    /// case the config file must be given explicitly.
    pub fn project() -> Option<&'static ProjectDirs> {
        static CELL: OnceLock<Option<ProjectDirs>> = OnceLock::new();

        CELL.get_or_init(|| ProjectDirs::from("org", "jsonnet", "Jsonnet Preview"))
            .as_ref()
    }

    /// Default location of `config.toml`.
    ///
    /// Linux: ~/.config/jsonnetpreview/config.toml
    /// macOS: ~/Library/Application Support/org.jsonnet.Jsonnet-Preview/config.toml
    /// Windows: ~\AppData\Roaming\jsonnet\Jsonnet Preview\config\config.toml
    pub fn default_config_file() -> Option<PathBuf> {
        Self::project().map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
