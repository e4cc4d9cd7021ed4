//! Orchestrator - 外部から呼ばれる API の表面
//!
//! 入力検証と委譲だけを行う。ビジネスロジックは store / queue / resolver 側。

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{
    BuildId, BuildProjectTask, BuildResult, BuildTrigger, CheckoutResult, EntityKind, FetchGroup,
    MillError, Notifier, NotifierUpdate, Project, ProjectId, ProjectSpec, ProjectState, TaskId,
};
use crate::order::BuildOrderResolver;
use crate::ports::{
    BuildOutputStore, CheckoutProvider, Clock, IdGenerator, ProjectStore, RemovedProject,
};
use crate::queue::{BuildQueue, QueueCounts};

pub struct Orchestrator {
    store: Arc<dyn ProjectStore>,
    queue: Arc<dyn BuildQueue>,
    checkout: Arc<dyn CheckoutProvider>,
    output: Arc<dyn BuildOutputStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        queue: Arc<dyn BuildQueue>,
        checkout: Arc<dyn CheckoutProvider>,
        output: Arc<dyn BuildOutputStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            store,
            queue,
            checkout,
            output,
            clock,
            ids,
        }
    }

    // ------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------

    pub async fn add_project(&self, spec: ProjectSpec) -> Result<ProjectId, MillError> {
        validate_spec(&spec)?;
        let id = self.store.add_project(spec).await?;
        info!(project = %id, "project added");
        Ok(id)
    }

    pub async fn update_project(&self, id: ProjectId, spec: ProjectSpec) -> Result<(), MillError> {
        validate_spec(&spec)?;
        self.store.update_project(id, spec).await
    }

    /// Cascading delete. Logs of the project are dropped afterwards, tolerantly.
    ///
    /// A build still running for the project fails to settle once the row is
    /// gone, and drops the log it wrote itself.
    pub async fn remove_project(&self, id: ProjectId) -> Result<RemovedProject, MillError> {
        let removed = self.store.remove_project(id).await?;
        if let Err(e) = self.output.remove_project(id).await {
            warn!(project = %id, error = %e, "could not remove build output");
        }
        info!(project = %id, "project removed");
        Ok(removed)
    }

    pub async fn get_project(&self, id: ProjectId) -> Result<Project, MillError> {
        self.store.get_project(id, FetchGroup::Summary).await
    }

    pub async fn get_project_detailed(&self, id: ProjectId) -> Result<Project, MillError> {
        self.store.get_project(id, FetchGroup::Detailed).await
    }

    pub async fn get_project_with(
        &self,
        id: ProjectId,
        group: FetchGroup,
    ) -> Result<Project, MillError> {
        self.store.get_project(id, group).await
    }

    pub async fn list_projects(&self, range: Range<usize>) -> Result<Vec<Project>, MillError> {
        self.store.list_projects(range).await
    }

    pub async fn all_projects(&self) -> Result<Vec<Project>, MillError> {
        self.store.all_projects().await
    }

    /// Check the project out outside of a build and record the result.
    pub async fn checkout_project(&self, id: ProjectId) -> Result<CheckoutResult, MillError> {
        let project = self.store.get_project(id, FetchGroup::Summary).await?;
        let result = self.checkout.checkout(&project).await;
        self.store.set_checkout_result(id, result.clone()).await?;

        let state = if result.success {
            ProjectState::CheckedOut
        } else {
            ProjectState::Error
        };
        self.store.set_project_state(id, state).await?;
        debug!(project = %id, success = result.success, "checkout recorded");
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Queue / building
    // ------------------------------------------------------------------

    pub async fn is_queued(&self, project_id: ProjectId) -> Result<bool, MillError> {
        Ok(self.queue.is_queued(project_id).await)
    }

    pub async fn build_order(&self) -> Result<Vec<ProjectId>, MillError> {
        let projects = self.store.all_projects().await?;
        BuildOrderResolver::new().resolve(&projects)
    }

    pub async fn enqueue_build(
        &self,
        project_id: ProjectId,
        forced: bool,
    ) -> Result<TaskId, MillError> {
        // NotFound for unknown projects
        self.store
            .get_project(project_id, FetchGroup::Summary)
            .await?;
        Ok(self
            .enqueue(project_id, forced, BuildTrigger::Manual)
            .await)
    }

    /// Enqueue every project in build order. A cycle enqueues nothing.
    pub async fn enqueue_all_builds(&self, forced: bool) -> Result<Vec<TaskId>, MillError> {
        let order = self.build_order().await?;
        let mut task_ids = Vec::with_capacity(order.len());
        for project_id in order {
            task_ids.push(
                self.enqueue(project_id, forced, BuildTrigger::Scheduled)
                    .await,
            );
        }
        info!(count = task_ids.len(), forced, "all projects enqueued");
        Ok(task_ids)
    }

    async fn enqueue(&self, project_id: ProjectId, forced: bool, trigger: BuildTrigger) -> TaskId {
        let task = BuildProjectTask::new(self.ids.generate_task_id(), project_id, self.clock.now())
            .forced(forced)
            .with_trigger(trigger);
        self.queue.enqueue(task).await
    }

    pub async fn queue_counts(&self) -> QueueCounts {
        self.queue.counts().await
    }

    // ------------------------------------------------------------------
    // Build results
    // ------------------------------------------------------------------

    pub async fn get_build_result(&self, id: BuildId) -> Result<BuildResult, MillError> {
        self.store.get_build_result(id).await
    }

    /// `NotFound` both for an unknown project and for one that never built.
    pub async fn latest_build_result(&self, project_id: ProjectId) -> Result<BuildResult, MillError> {
        self.store
            .latest_build_result(project_id)
            .await?
            .ok_or_else(|| {
                MillError::not_found(EntityKind::BuildResult, format!("latest of {project_id}"))
            })
    }

    pub async fn list_build_results(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<BuildResult>, MillError> {
        self.store.list_build_results(project_id).await
    }

    /// Log text of a build. `Ok(None)` when the log cannot be read.
    pub async fn get_build_output(&self, id: BuildId) -> Result<Option<String>, MillError> {
        let result = self.store.get_build_result(id).await?;
        match self.output.read(result.output_ref()).await {
            Ok(text) => Ok(Some(text)),
            Err(e) => {
                warn!(build = %id, error = %e, "could not read build output");
                Ok(None)
            }
        }
    }

    // ------------------------------------------------------------------
    // Notifiers
    // ------------------------------------------------------------------

    pub async fn get_notifier(
        &self,
        project_id: ProjectId,
        notifier_type: &str,
    ) -> Result<Notifier, MillError> {
        self.store.get_notifier(project_id, notifier_type).await
    }

    pub async fn add_notifier(
        &self,
        project_id: ProjectId,
        notifier_type: &str,
        configuration: BTreeMap<String, String>,
    ) -> Result<Notifier, MillError> {
        validate_notifier_type(notifier_type)?;
        self.store
            .add_notifier(project_id, notifier_type, configuration)
            .await
    }

    pub async fn update_notifier(
        &self,
        project_id: ProjectId,
        notifier_type: &str,
        update: NotifierUpdate,
    ) -> Result<Notifier, MillError> {
        if let Some(new_type) = &update.notifier_type {
            validate_notifier_type(new_type)?;
        }
        self.store
            .update_notifier(project_id, notifier_type, update)
            .await
    }

    pub async fn remove_notifier(
        &self,
        project_id: ProjectId,
        notifier_type: &str,
    ) -> Result<(), MillError> {
        self.store.remove_notifier(project_id, notifier_type).await
    }
}

fn validate_spec(spec: &ProjectSpec) -> Result<(), MillError> {
    if spec.name.trim().is_empty() {
        return Err(MillError::ConfigurationError(
            "project name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_notifier_type(notifier_type: &str) -> Result<(), MillError> {
    if notifier_type.trim().is_empty() {
        return Err(MillError::ConfigurationError(
            "notifier type must not be empty".to_string(),
        ));
    }
    Ok(())
}
