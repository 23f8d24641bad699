use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tokio::fs::{create_dir_all, rename, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{Mutex, MutexGuard};

use crate::err::Error;
use crate::models::StudentRecord;

/// Flat-file home of the whole student collection.
///
/// Every mutation rewrites the file in full. Inside one process the cycle lock
/// keeps load and save of concurrent requests from interleaving; separate
/// processes sharing the file still race and the last save wins.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    cycle: Mutex<()>,
}

impl RecordStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            cycle: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Held for the duration of one load-mutate-save cycle.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.cycle.lock().await
    }

    /// Never fails: a missing or unreadable store is an empty one.
    pub async fn load(&self) -> Vec<StudentRecord> {
        let bytes = match read_file(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::debug!("No store at {}, starting empty", self.path.display());
                return Vec::new();
            }
            Err(err) => {
                log::warn!("Could not read {}: {}", self.path.display(), err);
                return Vec::new();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(records) => records,
            Err(err) => {
                log::warn!(
                    "Store {} is malformed, treating as empty: {}",
                    self.path.display(),
                    err
                );
                Vec::new()
            }
        }
    }

    pub async fn save(&self, records: &[StudentRecord]) -> Result<(), Error> {
        let bytes = to_pretty_json(records)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent).await?;
            }
        }

        let tmp = self.tmp_path();
        let mut writer = BufWriter::new(File::create(&tmp).await?);
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        writer.into_inner().sync_all().await?;
        rename(&tmp, &self.path).await?;

        log::debug!("Saved {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

async fn read_file(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path).await?)
        .read_to_end(&mut bytes)
        .await?;
    Ok(bytes)
}

fn to_pretty_json(records: &[StudentRecord]) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    records.serialize(&mut ser)?;
    Ok(bytes)
}
