//! Fake compilers used by the tests.

use crate::settings::RenderConfig;
use jsonnet_config::OutputFormat;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

pub struct Stubs {
    pub dir: tempfile::TempDir,
    /// Prints a fixed object.
    pub compiled: PathBuf,
    /// Fails with `boom` on stderr.
    pub boom: PathBuf,
    /// Prints something that is not JSON.
    pub garbage: PathBuf,
    /// Never finishes in time.
    pub sleepy: PathBuf,
    /// Prints its arguments as a JSON array of strings.
    pub echo_args: PathBuf,
}

/// Scripts are written once and shared, executing a file while another thread
/// still holds it open for writing fails with `ETXTBSY`.
pub fn stubs() -> &'static Stubs {
    static STUBS: OnceLock<Stubs> = OnceLock::new();

    STUBS.get_or_init(|| {
        let dir = tempfile::tempdir().expect("Failed to create stub dir");

        let compiled = write_script(
            dir.path(),
            "compiled",
            r#"printf '%s' '{"name": "app", "replicas": 3, "ports": [80, 443], "labels": {}}'"#,
        );
        let boom = write_script(dir.path(), "boom", "echo boom >&2\nexit 1");
        let garbage = write_script(dir.path(), "garbage", "echo 'local x = ;'");
        let sleepy = write_script(dir.path(), "sleepy", "exec sleep 10");
        let echo_args = write_script(
            dir.path(),
            "echo_args",
            r#"printf '['
sep=''
for arg in "$@"; do
  printf '%s"%s"' "$sep" "$arg"
  sep=','
done
printf ']'"#,
        );

        Stubs {
            dir,
            compiled,
            boom,
            garbage,
            sleepy,
            echo_args,
        }
    })
}

pub fn render_config(executable: &Path, output_format: OutputFormat) -> RenderConfig {
    RenderConfig {
        executable: executable.to_path_buf(),
        ext_strs: BTreeMap::new(),
        lib_paths: Vec::new(),
        output_format,
        timeout: Some(Duration::from_secs(10)),
    }
}

#[cfg(unix)]
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let path = dir.join(name);
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o755)
        .open(&path)
        .expect("Failed to create stub script");
    writeln!(file, "#!/bin/sh\n{body}").expect("Failed to write stub script");
    file.sync_all().expect("Failed to sync stub script");
    path
}

#[cfg(not(unix))]
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(format!("{name}.sh"));
    std::fs::write(&path, body).expect("Failed to write stub script");
    path
}
