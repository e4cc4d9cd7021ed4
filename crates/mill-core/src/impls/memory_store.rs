//! InMemoryProjectStore - 開発用・テスト用の正本
//!
//! # 実装詳細
//! - 1 つの `RwLock<StoreState>` で全コレクションを保護（読み取りは並行、書き込みは直列）
//! - project / build result / notifier は別々のマップに持ち、リレーショナルな
//!   ストアと同じく cascade を明示的な順序で実行する
//! - id は登録順の連番（`ProjectId` の昇順 = 登録順）

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{
    BuildId, BuildResult, CheckoutResult, EntityKind, FetchGroup, MillError, NewBuildResult,
    Notifier, NotifierId, NotifierUpdate, Project, ProjectId, ProjectSpec, ProjectState,
};
use crate::ports::{ProjectStore, RemovedProject, StoreCounts};

#[derive(Debug, Clone)]
struct ProjectRow {
    spec: ProjectSpec,
    state: ProjectState,
    checkout_error: Option<String>,
}

#[derive(Debug, Default)]
struct StoreState {
    next_project: u64,
    next_build: u64,
    next_notifier: u64,

    projects: BTreeMap<ProjectId, ProjectRow>,

    /// Build results by id; ids are assigned in append order.
    build_results: BTreeMap<BuildId, BuildResult>,

    checkout_results: HashMap<ProjectId, CheckoutResult>,

    notifiers: BTreeMap<NotifierId, Notifier>,
}

impl StoreState {
    fn row(&self, id: ProjectId) -> Result<&ProjectRow, MillError> {
        self.projects
            .get(&id)
            .ok_or_else(|| MillError::not_found(EntityKind::Project, id))
    }

    fn row_mut(&mut self, id: ProjectId) -> Result<&mut ProjectRow, MillError> {
        self.projects
            .get_mut(&id)
            .ok_or_else(|| MillError::not_found(EntityKind::Project, id))
    }

    fn history(&self, project_id: ProjectId) -> Vec<BuildResult> {
        self.build_results
            .values()
            .filter(|b| b.project_id == project_id)
            .cloned()
            .collect()
    }

    fn notifiers_of(&self, project_id: ProjectId) -> Vec<Notifier> {
        self.notifiers
            .values()
            .filter(|n| n.project_id == project_id)
            .cloned()
            .collect()
    }

    fn find_notifier(&self, project_id: ProjectId, notifier_type: &str) -> Option<NotifierId> {
        self.notifiers
            .values()
            .find(|n| n.project_id == project_id && n.notifier_type == notifier_type)
            .map(|n| n.id)
    }

    fn notifier_not_found(project_id: ProjectId, notifier_type: &str) -> MillError {
        MillError::not_found(EntityKind::Notifier, format!("{project_id}/{notifier_type}"))
    }

    fn duplicate_notifier(project_id: ProjectId, notifier_type: &str) -> MillError {
        MillError::ConfigurationError(format!(
            "{project_id} already has a `{notifier_type}` notifier"
        ))
    }

    fn project(&self, id: ProjectId, group: FetchGroup) -> Result<Project, MillError> {
        let row = self.row(id)?;
        Ok(
            Project::summary(id, row.spec.clone(), row.state)
                .with_checkout_error(row.checkout_error.clone())
                .materialize(
                    group,
                    || self.history(id),
                    || self.notifiers_of(id),
                    || self.checkout_results.get(&id).cloned(),
                ),
        )
    }
}

/// In-memory `ProjectStore`.
///
/// `set_available(false)` makes every operation fail with
/// `StoreUnavailable`, simulating a lost connection.
#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    state: RwLock<StoreState>,
    unavailable: AtomicBool,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), MillError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MillError::StoreUnavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn add_project(&self, spec: ProjectSpec) -> Result<ProjectId, MillError> {
        self.check_available()?;
        let mut state = self.state.write().await;

        state.next_project += 1;
        let id = ProjectId::new(state.next_project);
        state.projects.insert(
            id,
            ProjectRow {
                spec,
                state: ProjectState::New,
                checkout_error: None,
            },
        );
        Ok(id)
    }

    async fn update_project(&self, id: ProjectId, spec: ProjectSpec) -> Result<(), MillError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state.row_mut(id)?.spec = spec;
        Ok(())
    }

    async fn remove_project(&self, id: ProjectId) -> Result<RemovedProject, MillError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state.row(id)?;

        // Cascade order: notifiers, build results, checkout result, project.
        let before = state.notifiers.len();
        state.notifiers.retain(|_, n| n.project_id != id);
        let notifiers = before - state.notifiers.len();

        let before = state.build_results.len();
        state.build_results.retain(|_, b| b.project_id != id);
        let build_results = before - state.build_results.len();

        let checkout_result = state.checkout_results.remove(&id).is_some();

        state.projects.remove(&id);

        debug!(project = %id, notifiers, build_results, checkout_result, "project removed");
        Ok(RemovedProject {
            notifiers,
            build_results,
            checkout_result,
        })
    }

    async fn get_project(&self, id: ProjectId, group: FetchGroup) -> Result<Project, MillError> {
        self.check_available()?;
        let state = self.state.read().await;
        state.project(id, group)
    }

    async fn list_projects(&self, range: Range<usize>) -> Result<Vec<Project>, MillError> {
        self.check_available()?;
        let state = self.state.read().await;
        let take = range.end.saturating_sub(range.start);
        state
            .projects
            .keys()
            .skip(range.start)
            .take(take)
            .map(|id| state.project(*id, FetchGroup::Summary))
            .collect()
    }

    async fn all_projects(&self) -> Result<Vec<Project>, MillError> {
        self.check_available()?;
        let state = self.state.read().await;
        state
            .projects
            .keys()
            .map(|id| state.project(*id, FetchGroup::Summary))
            .collect()
    }

    async fn set_project_state(
        &self,
        id: ProjectId,
        project_state: ProjectState,
    ) -> Result<(), MillError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state.row_mut(id)?.state = project_state;
        Ok(())
    }

    async fn set_checkout_result(
        &self,
        id: ProjectId,
        result: CheckoutResult,
    ) -> Result<(), MillError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let row = state.row_mut(id)?;
        row.checkout_error = if result.success {
            None
        } else {
            Some(result.provider_message.clone())
        };
        state.checkout_results.insert(id, result);
        Ok(())
    }

    async fn append_build_result(&self, new: NewBuildResult) -> Result<BuildResult, MillError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state.row(new.project_id)?;

        state.next_build += 1;
        let result = BuildResult::from_new(BuildId::new(state.next_build), new);
        state.build_results.insert(result.id, result.clone());
        Ok(result)
    }

    async fn get_build_result(&self, id: BuildId) -> Result<BuildResult, MillError> {
        self.check_available()?;
        let state = self.state.read().await;
        state
            .build_results
            .get(&id)
            .cloned()
            .ok_or_else(|| MillError::not_found(EntityKind::BuildResult, id))
    }

    async fn latest_build_result(
        &self,
        project_id: ProjectId,
    ) -> Result<Option<BuildResult>, MillError> {
        self.check_available()?;
        let state = self.state.read().await;
        state.row(project_id)?;
        Ok(state
            .build_results
            .values()
            .rev()
            .find(|b| b.project_id == project_id)
            .cloned())
    }

    async fn list_build_results(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<BuildResult>, MillError> {
        self.check_available()?;
        let state = self.state.read().await;
        state.row(project_id)?;
        Ok(state.history(project_id))
    }

    async fn add_notifier(
        &self,
        project_id: ProjectId,
        notifier_type: &str,
        configuration: BTreeMap<String, String>,
    ) -> Result<Notifier, MillError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state.row(project_id)?;
        if state.find_notifier(project_id, notifier_type).is_some() {
            return Err(StoreState::duplicate_notifier(project_id, notifier_type));
        }

        state.next_notifier += 1;
        let notifier = Notifier {
            id: NotifierId::new(state.next_notifier),
            project_id,
            notifier_type: notifier_type.to_string(),
            configuration,
        };
        state.notifiers.insert(notifier.id, notifier.clone());
        Ok(notifier)
    }

    async fn get_notifier(
        &self,
        project_id: ProjectId,
        notifier_type: &str,
    ) -> Result<Notifier, MillError> {
        self.check_available()?;
        let state = self.state.read().await;
        state.row(project_id)?;
        state
            .find_notifier(project_id, notifier_type)
            .and_then(|id| state.notifiers.get(&id).cloned())
            .ok_or_else(|| StoreState::notifier_not_found(project_id, notifier_type))
    }

    async fn update_notifier(
        &self,
        project_id: ProjectId,
        notifier_type: &str,
        update: NotifierUpdate,
    ) -> Result<Notifier, MillError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state.row(project_id)?;
        let id = state
            .find_notifier(project_id, notifier_type)
            .ok_or_else(|| StoreState::notifier_not_found(project_id, notifier_type))?;

        if let Some(new_type) = &update.notifier_type
            && new_type != notifier_type
            && state.find_notifier(project_id, new_type).is_some()
        {
            return Err(StoreState::duplicate_notifier(project_id, new_type));
        }

        let notifier = state
            .notifiers
            .get_mut(&id)
            .ok_or_else(|| StoreState::notifier_not_found(project_id, notifier_type))?;
        update.apply(notifier);
        Ok(notifier.clone())
    }

    async fn remove_notifier(
        &self,
        project_id: ProjectId,
        notifier_type: &str,
    ) -> Result<(), MillError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state.row(project_id)?;
        let id = state
            .find_notifier(project_id, notifier_type)
            .ok_or_else(|| StoreState::notifier_not_found(project_id, notifier_type))?;
        state.notifiers.remove(&id);
        Ok(())
    }

    async fn counts(&self) -> Result<StoreCounts, MillError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(StoreCounts {
            projects: state.projects.len(),
            build_results: state.build_results.len(),
            checkout_results: state.checkout_results.len(),
            notifiers: state.notifiers.len(),
        })
    }
}
