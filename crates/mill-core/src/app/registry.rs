//! ExecutorRegistry - BuildToolKind ごとの BuildExecutor 管理
//!
//! # 内部実装
//! - HashMap<BuildToolKind, Arc<dyn BuildExecutor>> で管理
//! - 二重登録は RegistryError::AlreadyRegistered

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::BuildToolKind;
use crate::ports::BuildExecutor;

#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<BuildToolKind, Arc<dyn BuildExecutor>>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Executor for build tool '{0}' is already registered")]
    AlreadyRegistered(BuildToolKind),
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        kind: BuildToolKind,
        executor: Arc<dyn BuildExecutor>,
    ) -> Result<(), RegistryError> {
        if self.executors.contains_key(&kind) {
            return Err(RegistryError::AlreadyRegistered(kind));
        }
        self.executors.insert(kind, executor);
        Ok(())
    }

    pub fn get(&self, kind: BuildToolKind) -> Option<Arc<dyn BuildExecutor>> {
        self.executors.get(&kind).cloned()
    }

    /// Registered kinds in `BuildToolKind::ALL` order.
    pub fn registered_kinds(&self) -> Vec<BuildToolKind> {
        BuildToolKind::ALL
            .into_iter()
            .filter(|kind| self.executors.contains_key(kind))
            .collect()
    }
}
