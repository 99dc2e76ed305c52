use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::core::{domain::RunArtifact, errors::ArtifactError, language::LanguageStrategy};

#[derive(Clone, Debug)]
pub struct ArtifactManager {
    work_dir: PathBuf,
}

impl ArtifactManager {
    pub fn new<T: AsRef<Path>>(work_dir: T) -> Self {
        Self {
            work_dir: work_dir.as_ref().into(),
        }
    }

    /// Writes `source` into a fresh run directory. The returned guard removes
    /// the directory when released or dropped, including when this call
    /// fails after the directory was created.
    #[tracing::instrument(skip(self, source), fields(language = %strategy.language))]
    pub async fn prepare(
        &self,
        strategy: &LanguageStrategy,
        source: &str,
    ) -> Result<ArtifactGuard, ArtifactError> {
        let dir = self.work_dir.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| ArtifactError::CreateDir {
                path: dir.clone(),
                source,
            })?;

        let guard = ArtifactGuard::new(RunArtifact {
            source_path: dir.join(strategy.source_file),
            binary_path: strategy.binary_file.map(|file| dir.join(file)),
            dir,
        });

        fs::write(&guard.source_path, source)
            .await
            .map_err(|source| ArtifactError::WriteSource {
                path: guard.source_path.clone(),
                source,
            })?;

        tracing::debug!(dir = %guard.dir.display(), "Artifact prepared");
        Ok(guard)
    }

    pub async fn cleanup(artifact: &RunArtifact) -> Result<(), ArtifactError> {
        match fs::remove_dir_all(&artifact.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ArtifactError::Remove {
                path: artifact.dir.clone(),
                source,
            }),
        }
    }
}

#[derive(Debug)]
pub struct ArtifactGuard {
    artifact: RunArtifact,
    released: bool,
}

impl ArtifactGuard {
    fn new(artifact: RunArtifact) -> Self {
        Self {
            artifact,
            released: false,
        }
    }

    pub async fn release(mut self) {
        self.released = true;
        if let Err(e) = ArtifactManager::cleanup(&self.artifact).await {
            tracing::warn!(error = %e, "Failed to clean up artifact");
        }
    }
}

impl Deref for ArtifactGuard {
    type Target = RunArtifact;

    fn deref(&self) -> &RunArtifact {
        &self.artifact
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_dir_all(&self.artifact.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                dir = %self.artifact.dir.display(),
                error = %e,
                "Failed to clean up dropped artifact"
            ),
        }
    }
}
