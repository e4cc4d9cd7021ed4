//! Project record and its owned associations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::MillError;
use super::fetch::{FetchGroup, Fetched};
use super::ids::{BuildId, NotifierId, ProjectId};
use super::outcome::{BuildOutcome, CheckoutResult};
use super::state::ProjectState;
use super::task::BuildTrigger;

/// Build-tool family of a project.
///
/// Closed set: the coordinator never branches on it, it only uses it to look
/// up the executor registered for the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildToolKind {
    #[serde(rename = "maven-2")]
    Maven2,
    #[serde(rename = "maven-1")]
    Maven1,
    Ant,
    Shell,
}

impl BuildToolKind {
    pub const ALL: [BuildToolKind; 4] = [
        BuildToolKind::Maven2,
        BuildToolKind::Maven1,
        BuildToolKind::Ant,
        BuildToolKind::Shell,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BuildToolKind::Maven2 => "maven-2",
            BuildToolKind::Maven1 => "maven-1",
            BuildToolKind::Ant => "ant",
            BuildToolKind::Shell => "shell",
        }
    }
}

impl std::fmt::Display for BuildToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied project definition (add / update input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSpec {
    pub name: String,
    pub scm_url: String,
    pub build_tool: BuildToolKind,

    #[serde(default)]
    pub build_arguments: String,

    #[serde(default)]
    pub dependencies: Vec<ProjectId>,
}

impl ProjectSpec {
    pub fn new(name: impl Into<String>, build_tool: BuildToolKind) -> Self {
        Self {
            name: name.into(),
            scm_url: String::new(),
            build_tool,
            build_arguments: String::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_scm_url(mut self, url: impl Into<String>) -> Self {
        self.scm_url = url.into();
        self
    }

    pub fn with_build_arguments(mut self, args: impl Into<String>) -> Self {
        self.build_arguments = args.into();
        self
    }

    pub fn depends_on(mut self, project_id: ProjectId) -> Self {
        self.dependencies.push(project_id);
        self
    }
}

/// A project as read from the store, materialized per its `FetchGroup`.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub scm_url: String,
    pub build_tool: BuildToolKind,
    pub build_arguments: String,
    pub dependencies: Vec<ProjectId>,
    pub state: ProjectState,

    /// Provider message of the most recent failed checkout.
    pub checkout_error: Option<String>,

    fetch_group: FetchGroup,
    build_results: Fetched<Vec<BuildResult>>,
    notifiers: Fetched<Vec<Notifier>>,
    checkout_result: Fetched<Option<CheckoutResult>>,
}

impl Project {
    /// A summary view: no association is materialized.
    pub fn summary(id: ProjectId, spec: ProjectSpec, state: ProjectState) -> Self {
        Self {
            id,
            name: spec.name,
            scm_url: spec.scm_url,
            build_tool: spec.build_tool,
            build_arguments: spec.build_arguments,
            dependencies: spec.dependencies,
            state,
            checkout_error: None,
            fetch_group: FetchGroup::Summary,
            build_results: Fetched::NotLoaded,
            notifiers: Fetched::NotLoaded,
            checkout_result: Fetched::NotLoaded,
        }
    }

    pub fn with_checkout_error(mut self, error: Option<String>) -> Self {
        self.checkout_error = error;
        self
    }

    /// Attach associations. Each one is materialized only if `group` includes it.
    pub fn materialize(
        mut self,
        group: FetchGroup,
        build_results: impl FnOnce() -> Vec<BuildResult>,
        notifiers: impl FnOnce() -> Vec<Notifier>,
        checkout_result: impl FnOnce() -> Option<CheckoutResult>,
    ) -> Self {
        self.fetch_group = group;
        self.build_results = Fetched::load_if(group.includes_build_results(), build_results);
        self.notifiers = Fetched::load_if(group.includes_notifiers(), notifiers);
        self.checkout_result = Fetched::load_if(group.includes_checkout_result(), checkout_result);
        self
    }

    pub fn fetch_group(&self) -> FetchGroup {
        self.fetch_group
    }

    /// Build history, oldest first.
    pub fn build_results(&self) -> Result<&[BuildResult], MillError> {
        self.build_results.get("build_results").map(Vec::as_slice)
    }

    pub fn notifiers(&self) -> Result<&[Notifier], MillError> {
        self.notifiers.get("notifiers").map(Vec::as_slice)
    }

    pub fn checkout_result(&self) -> Result<Option<&CheckoutResult>, MillError> {
        self.checkout_result
            .get("checkout_result")
            .map(Option::as_ref)
    }

    /// Back to the definition the caller can edit and pass to `update_project`.
    pub fn to_spec(&self) -> ProjectSpec {
        ProjectSpec {
            name: self.name.clone(),
            scm_url: self.scm_url.clone(),
            build_tool: self.build_tool,
            build_arguments: self.build_arguments.clone(),
            dependencies: self.dependencies.clone(),
        }
    }
}

/// Reference to out-of-band build log text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    pub build_id: BuildId,
    pub project_id: ProjectId,
}

/// One recorded build. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    pub id: BuildId,
    pub project_id: ProjectId,
    pub outcome: BuildOutcome,
    pub exit_code: i32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<BuildTrigger>,

    #[serde(default)]
    pub forced: bool,
}

impl BuildResult {
    pub fn from_new(id: BuildId, new: NewBuildResult) -> Self {
        Self {
            id,
            project_id: new.project_id,
            outcome: new.outcome,
            exit_code: new.exit_code,
            started_at: new.started_at,
            ended_at: new.ended_at,
            error: new.error,
            trigger: new.trigger,
            forced: new.forced,
        }
    }

    pub fn success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn output_ref(&self) -> OutputRef {
        OutputRef {
            build_id: self.id,
            project_id: self.project_id,
        }
    }
}

/// A build result before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBuildResult {
    pub project_id: ProjectId,
    pub outcome: BuildOutcome,
    pub exit_code: i32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub error: Option<String>,
    pub trigger: Option<BuildTrigger>,
    pub forced: bool,
}

/// Per-project notification rule, interpreted by an external transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifier {
    pub id: NotifierId,
    pub project_id: ProjectId,
    pub notifier_type: String,
    pub configuration: BTreeMap<String, String>,
}

impl Notifier {
    pub fn config(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).map(String::as_str)
    }
}

/// Partial update of a notifier: keys not mentioned are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifierUpdate {
    pub notifier_type: Option<String>,
    pub set: BTreeMap<String, String>,
    pub remove: Vec<String>,
}

impl NotifierUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retype(mut self, notifier_type: impl Into<String>) -> Self {
        self.notifier_type = Some(notifier_type.into());
        self
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set.insert(key.into(), value.into());
        self
    }

    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.remove.push(key.into());
        self
    }

    /// Removals first, then sets, so a key both removed and set ends up set.
    pub fn apply(self, notifier: &mut Notifier) {
        if let Some(notifier_type) = self.notifier_type {
            notifier.notifier_type = notifier_type;
        }
        for key in &self.remove {
            notifier.configuration.remove(key);
        }
        notifier.configuration.extend(self.set);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_project() -> Project {
        Project::summary(
            ProjectId::new(1),
            ProjectSpec::new("Yo Yo Project", BuildToolKind::Maven2),
            ProjectState::New,
        )
    }

    #[test]
    fn summary_exposes_scalars_but_not_associations() {
        let project = summary_project();

        assert_eq!(project.name, "Yo Yo Project");
        assert_eq!(project.state, ProjectState::New);
        assert!(project.dependencies.is_empty());
        assert!(matches!(
            project.build_results(),
            Err(MillError::FieldNotLoaded("build_results"))
        ));
        assert!(matches!(
            project.notifiers(),
            Err(MillError::FieldNotLoaded("notifiers"))
        ));
        assert!(matches!(
            project.checkout_result(),
            Err(MillError::FieldNotLoaded("checkout_result"))
        ));
    }

    #[test]
    fn detailed_materialization_loads_everything() {
        let project = summary_project().materialize(
            FetchGroup::Detailed,
            Vec::new,
            Vec::new,
            || Some(CheckoutResult::success(vec!["/foo".into()])),
        );

        assert_eq!(project.fetch_group(), FetchGroup::Detailed);
        assert!(project.build_results().unwrap().is_empty());
        assert!(project.notifiers().unwrap().is_empty());
        let checkout = project.checkout_result().unwrap().unwrap();
        assert_eq!(checkout.checked_out_files, vec!["/foo"]);
    }

    #[test]
    fn with_builds_leaves_checkout_unloaded() {
        let project =
            summary_project().materialize(FetchGroup::WithBuilds, Vec::new, Vec::new, || None);

        assert!(project.build_results().is_ok());
        assert!(project.checkout_result().is_err());
        assert!(project.notifiers().is_err());
    }

    #[test]
    fn notifier_update_preserves_untouched_keys() {
        let mut notifier = Notifier {
            id: NotifierId::new(1),
            project_id: ProjectId::new(1),
            notifier_type: "mail".into(),
            configuration: BTreeMap::from([
                ("address".to_string(), "dev@example.org".to_string()),
                ("foo".to_string(), "bar".to_string()),
            ]),
        };

        NotifierUpdate::new()
            .remove("foo")
            .set("baz", "yay")
            .apply(&mut notifier);

        assert_eq!(notifier.notifier_type, "mail");
        assert_eq!(notifier.config("address"), Some("dev@example.org"));
        assert_eq!(notifier.config("baz"), Some("yay"));
        assert_eq!(notifier.config("foo"), None);
        assert_eq!(notifier.configuration.len(), 2);
    }

    #[test]
    fn build_tool_serializes_as_its_display_name() {
        for kind in BuildToolKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));

            let back: BuildToolKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
        assert_eq!(
            serde_json::from_str::<BuildToolKind>("\"maven-2\"").unwrap(),
            BuildToolKind::Maven2
        );
    }

    #[test]
    fn spec_round_trips_through_project() {
        let spec = ProjectSpec::new("core", BuildToolKind::Ant)
            .with_scm_url("scm:git:/srv/core")
            .with_build_arguments("clean install")
            .depends_on(ProjectId::new(7));
        let project = Project::summary(ProjectId::new(2), spec.clone(), ProjectState::New);
        assert_eq!(project.to_spec(), spec);
    }
}
