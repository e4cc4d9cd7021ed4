//! FileBuildOutputStore - ビルドログのファイル保存
//!
//! レイアウト: `<root>/<project id>/<build id>.log.txt`

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::{OutputRef, ProjectId};
use crate::ports::BuildOutputStore;

#[derive(Debug, Clone)]
pub struct FileBuildOutputStore {
    root: PathBuf,
}

impl FileBuildOutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, project_id: ProjectId) -> PathBuf {
        self.root.join(project_id.value().to_string())
    }

    pub fn path_of(&self, output: OutputRef) -> PathBuf {
        self.project_dir(output.project_id)
            .join(format!("{}.log.txt", output.build_id.value()))
    }
}

#[async_trait]
impl BuildOutputStore for FileBuildOutputStore {
    async fn write(&self, output: OutputRef, text: &str) -> io::Result<()> {
        tokio::fs::create_dir_all(self.project_dir(output.project_id)).await?;
        tokio::fs::write(self.path_of(output), text).await
    }

    async fn read(&self, output: OutputRef) -> io::Result<String> {
        tokio::fs::read_to_string(self.path_of(output)).await
    }

    async fn remove_project(&self, project_id: ProjectId) -> io::Result<()> {
        match tokio::fs::remove_dir_all(self.project_dir(project_id)).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
