//! BuildOutputStore port - ビルドログ（巨大テキスト）の out-of-band 保存
//!
//! BuildResult にはログ本文を埋め込まない。(build_id, project_id) で参照する。
//! I/O エラーはそのまま返す。握りつぶして「ログ無し」に落とすのは呼び出し側
//! （coordinator / facade）の方針。

use std::io;

use async_trait::async_trait;

use crate::domain::{OutputRef, ProjectId};

#[async_trait]
pub trait BuildOutputStore: Send + Sync {
    async fn write(&self, output: OutputRef, text: &str) -> io::Result<()>;

    async fn read(&self, output: OutputRef) -> io::Result<String>;

    /// Drop every log of a project. Missing logs are not an error.
    async fn remove_project(&self, project_id: ProjectId) -> io::Result<()>;
}
