//! Local collaborators: directory checkout, command executors, log notifier.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use mill_core::domain::{BuildExecution, BuildResult, BuildToolKind, CheckoutResult, Notifier, Project};
use mill_core::ports::{BuildExecutor, CheckoutProvider, NotificationDispatcher};

/// Treats `scm_url` as a local working copy and reports its top-level entries.
pub struct DirectoryCheckout;

#[async_trait]
impl CheckoutProvider for DirectoryCheckout {
    async fn checkout(&self, project: &Project) -> CheckoutResult {
        let mut entries = match tokio::fs::read_dir(&project.scm_url).await {
            Ok(entries) => entries,
            Err(e) => {
                return CheckoutResult::failure(format!("cannot open {}: {e}", project.scm_url));
            }
        };

        let mut files = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => files.push(entry.file_name().to_string_lossy().into_owned()),
                Ok(None) => break,
                Err(e) => {
                    return CheckoutResult::failure(format!("cannot list {}: {e}", project.scm_url));
                }
            }
        }
        files.sort();
        CheckoutResult::success(files)
    }
}

/// Runs the build tool of one `BuildToolKind` in the project's working copy.
pub struct CommandExecutor {
    kind: BuildToolKind,
}

impl CommandExecutor {
    pub fn new(kind: BuildToolKind) -> Self {
        Self { kind }
    }

    fn command(&self, project: &Project) -> Command {
        let args = project.build_arguments.trim();
        let mut command = match self.kind {
            BuildToolKind::Shell => {
                let mut c = Command::new("sh");
                c.arg("-c").arg(args);
                c
            }
            BuildToolKind::Maven2 => tool("mvn", args, "clean install"),
            BuildToolKind::Maven1 => tool("maven", args, "jar:install"),
            BuildToolKind::Ant => tool("ant", args, ""),
        };
        command.current_dir(&project.scm_url).kill_on_drop(true);
        command
    }
}

fn tool(program: &str, args: &str, default_args: &str) -> Command {
    let args = if args.is_empty() { default_args } else { args };
    let mut command = Command::new(program);
    command.args(args.split_whitespace());
    command
}

#[async_trait]
impl BuildExecutor for CommandExecutor {
    async fn execute(&self, project: &Project) -> BuildExecution {
        let output = match self.command(project).output().await {
            Ok(output) => output,
            Err(e) => {
                warn!(project = %project.id, tool = %self.kind, error = %e, "could not start build tool");
                return BuildExecution::failed(-1, format!("could not start {}: {e}", self.kind));
            }
        };

        let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
        log.push_str(&String::from_utf8_lossy(&output.stderr));

        match output.status.code() {
            Some(0) => BuildExecution::succeeded(log),
            Some(code) => BuildExecution::failed(code, log),
            // killed by a signal
            None => BuildExecution::failed(-1, log),
        }
    }
}

/// Writes notifications to the log instead of delivering them.
pub struct LogNotifier;

#[async_trait]
impl NotificationDispatcher for LogNotifier {
    async fn notify(&self, notifier: &Notifier, build_result: &BuildResult) {
        info!(
            project = %build_result.project_id,
            notifier = %notifier.notifier_type,
            build = %build_result.id,
            outcome = ?build_result.outcome,
            "notification"
        );
    }
}
