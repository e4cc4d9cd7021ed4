//! JSON project manifest.
//!
//! ```json
//! {
//!   "projects": [
//!     { "name": "util", "scm_url": "./util", "build_tool": "shell", "build_arguments": "make" },
//!     { "name": "app", "scm_url": "./app", "build_tool": "maven-2", "depends_on": ["util"],
//!       "notifiers": [{ "type": "log", "configuration": { "on-success": "true" } }] }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use mill_core::app::Orchestrator;
use mill_core::domain::{BuildToolKind, ProjectId, ProjectSpec};

#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub projects: Vec<ManifestProject>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestProject {
    pub name: String,
    pub scm_url: String,
    pub build_tool: BuildToolKind,
    #[serde(default)]
    pub build_arguments: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub notifiers: Vec<ManifestNotifier>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestNotifier {
    #[serde(rename = "type")]
    pub notifier_type: String,
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
}

impl Manifest {
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading manifest {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing manifest {}", path.display()))
    }

    /// Register every project, then wire dependencies by name.
    pub async fn register(&self, orchestrator: &Orchestrator) -> Result<HashMap<String, ProjectId>> {
        let mut ids = HashMap::new();
        for project in &self.projects {
            if ids.contains_key(&project.name) {
                bail!("project `{}` is declared twice", project.name);
            }
            let spec = ProjectSpec::new(&project.name, project.build_tool)
                .with_scm_url(&project.scm_url)
                .with_build_arguments(&project.build_arguments);
            let id = orchestrator.add_project(spec).await?;
            ids.insert(project.name.clone(), id);
        }

        for project in &self.projects {
            let id = ids[&project.name];
            if !project.depends_on.is_empty() {
                let mut spec = orchestrator.get_project(id).await?.to_spec();
                for dependency in &project.depends_on {
                    let Some(dependency_id) = ids.get(dependency) else {
                        bail!("project `{}` depends on unknown project `{dependency}`", project.name);
                    };
                    spec = spec.depends_on(*dependency_id);
                }
                orchestrator.update_project(id, spec).await?;
            }
            for notifier in &project.notifiers {
                orchestrator
                    .add_notifier(id, &notifier.notifier_type, notifier.configuration.clone())
                    .await?;
            }
        }
        Ok(ids)
    }
}
