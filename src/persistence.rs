use std::{
    fs::File,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use tracing::{info, warn};

use crate::{config::Config, store::Resources};

/// Whole-dataset file backing. The file holds one JSON object mapping
/// resource keys to arrays of members.
#[derive(Debug, Clone)]
pub struct Persistence {
    dir: PathBuf,
    path: PathBuf,
}

impl Persistence {
    pub fn new(config: &Config) -> Self {
        Persistence {
            dir: config.dir.clone(),
            path: config.storage_path(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the dataset. A missing, unreadable or corrupt file yields an
    /// empty dataset, which is written back immediately.
    pub fn load(&self) -> Resources {
        match std::fs::read(&self.path) {
            Ok(data) => match decode(&data) {
                Ok(resources) => {
                    info!(path = %self.path.display(), resources = resources.len(), "loaded store");
                    return resources;
                }
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "store file is corrupt, discarding its contents"
                    );
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "store file doesn't exist, creating it");
                if let Err(e) = std::fs::create_dir_all(&self.dir) {
                    warn!(dir = %self.dir.display(), error = %e, "can't create data directory");
                }
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "can't read store file");
            }
        }

        let resources = Resources::new();
        if let Err(e) = self.save(&resources) {
            warn!(error = %e, "can't write empty store");
        }
        resources
    }

    pub fn save(&self, resources: &Resources) -> anyhow::Result<()> {
        self.write(&encode(resources)?)
    }

    /// Atomically replace the file with `data`: write a sibling temporary
    /// file, sync it, then rename over the target.
    pub fn write(&self, data: &[u8]) -> anyhow::Result<()> {
        let tmp = self.tmp_path();
        {
            let mut file =
                File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
            file.write_all(data)
                .with_context(|| format!("write {}", tmp.display()))?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))?;
        Ok(())
    }

    /// Remove the backing file. A file that is already gone is not an error.
    pub fn teardown(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", self.path.display())),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

pub fn encode(resources: &Resources) -> anyhow::Result<Vec<u8>> {
    Ok(serde_json::to_vec(resources)?)
}

pub fn decode(data: &[u8]) -> anyhow::Result<Resources> {
    Ok(serde_json::from_slice(data)?)
}
