//! Evidence files written under a run directory.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::debug;

/// Writes evidence files relative to one run directory.
#[derive(Debug, Clone)]
pub struct Recorder {
    root: PathBuf,
}

impl Recorder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Serialize `value` as pretty-printed JSON with trailing newline.
    pub fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let mut buf = serde_json::to_string_pretty(value)
            .with_context(|| format!("serialize evidence {name}"))?;
        buf.push('\n');
        self.write_bytes(name, buf.as_bytes())
    }

    pub fn write_text(&self, name: &str, contents: &str) -> Result<PathBuf> {
        self.write_bytes(name, contents.as_bytes())
    }

    fn write_bytes(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.resolve(name)?;
        write_durable(&path, contents)?;
        debug!(path = %path.display(), bytes = contents.len(), "evidence written");
        Ok(path)
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let is_plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if name.is_empty() || !is_plain {
            bail!("evidence name must be a plain relative path: {name:?}");
        }
        Ok(self.root.join(relative))
    }
}

/// Write through a synced temp file, then rename over the destination.
fn write_durable(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("evidence path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let file =
        File::create(&tmp_path).with_context(|| format!("create {}", tmp_path.display()))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(contents)
        .with_context(|| format!("write {}", tmp_path.display()))?;
    let file = writer
        .into_inner()
        .map_err(|err| err.into_error())
        .with_context(|| format!("flush {}", tmp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("sync {}", tmp_path.display()))?;
    drop(file);

    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
