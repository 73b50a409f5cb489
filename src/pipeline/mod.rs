//! Ordered, resumable, revertible hub clone
//!
//! The engine walks a fixed list of steps. A failing step stops the run and
//! the log records the `--step` flag that resumes from it. A revert walks the
//! same list against a previously written log, with each step replaying only
//! its own group.

pub mod steps;

pub use steps::{Step, StepId};

use crate::action_log::ActionLog;
use crate::api::{HubApi, HubConnector, HubCredentials, TimeoutRetry};
use crate::handlers::ImportOptions;
use crate::ui::Prompter;
use anyhow::{Context, Result};
use colored::Colorize;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything the steps of one run share
pub struct PipelineState<'a> {
    pub from: HubCredentials,
    pub to: HubCredentials,
    pub working_directory: PathBuf,
    pub log: ActionLog,
    /// Present only while reverting
    pub revert_log: Option<ActionLog>,
    pub import: ImportOptions,
    pub connector: &'a dyn HubConnector,
    pub prompter: &'a dyn Prompter,
    pub timeout: TimeoutRetry,
}

impl PipelineState<'_> {
    pub async fn source(&self) -> Result<Arc<dyn HubApi>> {
        self.connector
            .connect(&self.from)
            .await
            .with_context(|| format!("Failed to connect to source hub {}", self.from.hub_id))
    }

    pub async fn destination(&self) -> Result<Arc<dyn HubApi>> {
        self.connector
            .connect(&self.to)
            .await
            .with_context(|| format!("Failed to connect to destination hub {}", self.to.hub_id))
    }

    /// Directory a step keeps its exports in
    pub fn step_dir(&self, id: StepId) -> PathBuf {
        self.working_directory.join(id.dir_name())
    }

    pub fn revert_log(&self) -> Result<&ActionLog> {
        self.revert_log
            .as_ref()
            .context("No revert log loaded")
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Index of the first step to run
    pub start_step: usize,
    /// Run steps marked as limited
    pub accept_limits: bool,
}

pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    /// The hub clone steps in their fixed order
    pub fn hub_clone() -> Self {
        Self::with_steps(StepId::ALL.iter().map(|id| id.step()).collect())
    }

    pub fn with_steps(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Box<dyn Step>] {
        &self.steps
    }

    /// Run every step from `options.start_step`, stopping at the first
    /// failure. Returns whether all attempted steps succeeded.
    pub async fn run(&self, state: &PipelineState<'_>, options: &RunOptions) -> bool {
        let _session = state.log.session();

        for (index, step) in self.steps.iter().enumerate().skip(options.start_step) {
            if step.is_limited() && !options.accept_limits {
                state.log.switch_group(step.name());
                state.log.add_comment(format!(
                    "Skipped {}: pass --accept-snapshot-limits to include it",
                    step.name()
                ));
                println!("{} Skipping {} (limited)", "⚠".yellow(), step.name());
                continue;
            }

            state.log.switch_group(step.name());
            println!("{} {}", "→".cyan(), step.name());
            info!("Running step {} ({})", index, step.name());

            if !settle(step.run(state).await, &state.log, step.name()) {
                state.log.append_line(format!(
                    "Step {} failed. Resume with --step {}",
                    step.name(),
                    index
                ));
                println!(
                    "{} {} failed. Resume with --step {}",
                    "✗".red(),
                    step.name(),
                    index
                );
                return false;
            }
            println!("{} {}", "✓".green(), step.name());
        }
        true
    }

    /// Revert the steps recorded in the log at `revert_log_path`. Nothing is
    /// touched when the log can't be loaded.
    pub async fn revert(
        &self,
        state: &mut PipelineState<'_>,
        revert_log_path: &Path,
        options: &RunOptions,
    ) -> bool {
        let _session = state.log.session();

        match ActionLog::load_from_file(revert_log_path) {
            Ok(loaded) => state.revert_log = Some(loaded),
            Err(e) => {
                state.log.error(format!(
                    "Could not load revert log {}: {:#}",
                    revert_log_path.display(),
                    e
                ));
                println!("{} Could not load revert log: {:#}", "✗".red(), e);
                return false;
            }
        }

        let state: &PipelineState<'_> = state;
        for (index, step) in self.steps.iter().enumerate().skip(options.start_step) {
            if step.is_limited() && !options.accept_limits {
                continue;
            }

            state.log.switch_group(step.name());
            if let Some(revert_log) = &state.revert_log {
                revert_log.switch_group(step.name());
            }
            println!("{} Reverting {}", "→".cyan(), step.name());
            info!("Reverting step {} ({})", index, step.name());

            if !settle(step.revert(state).await, &state.log, step.name()) {
                state.log.append_line(format!(
                    "Revert of {} failed. Resume with --step {}",
                    step.name(),
                    index
                ));
                println!("{} Revert of {} failed", "✗".red(), step.name());
                return false;
            }
            println!("{} Reverted {}", "✓".green(), step.name());
        }
        true
    }
}

/// Errors never cross the step boundary; they become a failed step
fn settle(result: Result<bool>, log: &ActionLog, step: &str) -> bool {
    match result {
        Ok(ok) => ok,
        Err(e) => {
            error!("Step {} failed: {:#}", step, e);
            log.error(format!("{}: {:#}", step, e));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryConnector;
    use crate::ui::ScriptedPrompter;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Clone, Copy)]
    enum Outcome {
        Pass,
        Fail,
        Error,
    }

    struct FakeStep {
        id: StepId,
        outcome: Outcome,
        limited: bool,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeStep {
        fn finish(&self, what: &str) -> Result<bool> {
            self.calls.lock().unwrap().push(format!("{} {}", what, self.id.name()));
            match self.outcome {
                Outcome::Pass => Ok(true),
                Outcome::Fail => Ok(false),
                Outcome::Error => anyhow::bail!("remote exploded"),
            }
        }
    }

    #[async_trait]
    impl Step for FakeStep {
        fn id(&self) -> StepId {
            self.id
        }

        fn is_limited(&self) -> bool {
            self.limited
        }

        async fn run(&self, _state: &PipelineState<'_>) -> Result<bool> {
            self.finish("run")
        }

        async fn revert(&self, _state: &PipelineState<'_>) -> Result<bool> {
            self.finish("revert")
        }
    }

    fn pipeline(outcomes: &[Outcome], calls: &Arc<Mutex<Vec<String>>>) -> Pipeline {
        Pipeline::with_steps(
            StepId::ALL
                .iter()
                .zip(outcomes)
                .map(|(id, outcome)| {
                    Box::new(FakeStep {
                        id: *id,
                        outcome: *outcome,
                        limited: id.is_limited(),
                        calls: calls.clone(),
                    }) as Box<dyn Step>
                })
                .collect(),
        )
    }

    fn state<'a>(
        connector: &'a MemoryConnector,
        prompter: &'a ScriptedPrompter,
        log: ActionLog,
    ) -> PipelineState<'a> {
        let creds = HubCredentials {
            client_id: "c".into(),
            client_secret: "s".into(),
            hub_id: "h".into(),
        };
        PipelineState {
            from: creds.clone(),
            to: creds,
            working_directory: PathBuf::from("unused"),
            log,
            revert_log: None,
            import: ImportOptions::default(),
            connector,
            prompter,
            timeout: TimeoutRetry::default(),
        }
    }

    #[tokio::test]
    async fn test_failure_stops_later_steps_and_logs_resume_hint() {
        use Outcome::*;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline(&[Pass, Pass, Fail, Pass, Pass, Pass, Pass], &calls);
        let connector = MemoryConnector::new();
        let prompter = ScriptedPrompter::default();
        let log = ActionLog::new("clone");

        let run_state = state(&connector, &prompter, log.clone());
        assert!(!pipeline.run(&run_state, &RunOptions::default()).await);
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["run Clone Settings", "run Clone Extensions", "run Clone Schemas"]
        );
        assert!(log.to_string().contains("--step 2"));
    }

    #[tokio::test]
    async fn test_start_step_and_limited_steps() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline(&[Outcome::Pass; 7], &calls);
        let connector = MemoryConnector::new();
        let prompter = ScriptedPrompter::default();

        let options = RunOptions {
            start_step: 4,
            accept_limits: false,
        };
        let run_state = state(&connector, &prompter, ActionLog::new("clone"));
        assert!(pipeline.run(&run_state, &options).await);
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["run Clone Indexes", "run Clone Content"]
        );

        calls.lock().unwrap().clear();
        let options = RunOptions {
            start_step: 6,
            accept_limits: true,
        };
        let run_state = state(&connector, &prompter, ActionLog::new("clone"));
        assert!(pipeline.run(&run_state, &options).await);
        assert_eq!(*calls.lock().unwrap(), vec!["run Clone Events"]);
    }

    #[tokio::test]
    async fn test_step_error_is_a_failed_step() {
        use Outcome::*;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline(&[Error, Pass, Pass, Pass, Pass, Pass, Pass], &calls);
        let connector = MemoryConnector::new();
        let prompter = ScriptedPrompter::default();
        let log = ActionLog::new("clone");

        let run_state = state(&connector, &prompter, log.clone());
        assert!(!pipeline.run(&run_state, &RunOptions::default()).await);
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert!(log.to_string().contains("remote exploded"));
    }

    #[tokio::test]
    async fn test_revert_without_loadable_log_touches_no_step() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline(&[Outcome::Pass; 7], &calls);
        let connector = MemoryConnector::new();
        let prompter = ScriptedPrompter::default();
        let mut state = state(&connector, &prompter, ActionLog::new("revert"));

        let ok = pipeline
            .revert(&mut state, Path::new("/nonexistent/clone.log"), &RunOptions::default())
            .await;

        assert!(!ok);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revert_switches_both_logs_and_stops_on_failure() {
        use Outcome::*;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clone.log");
        std::fs::write(&path, "// clone\nGROUP Clone Schemas\nCREATE dst-1\nSUCCESS\n").unwrap();

        let calls = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline(&[Pass, Fail, Pass, Pass, Pass, Pass, Pass], &calls);
        let connector = MemoryConnector::new();
        let prompter = ScriptedPrompter::default();
        let mut state = state(&connector, &prompter, ActionLog::new("revert"));

        assert!(!pipeline.revert(&mut state, &path, &RunOptions::default()).await);
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["revert Clone Settings", "revert Clone Extensions"]
        );
        let revert_log = state.revert_log.as_ref().unwrap();
        assert_eq!(revert_log.current_group(), "Clone Extensions");
        assert_eq!(revert_log.get_data("CREATE", Some("Clone Schemas")), vec!["dst-1"]);
    }
}
