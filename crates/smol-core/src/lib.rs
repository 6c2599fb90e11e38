//! The SmolAgent control loop.
//!
//! [`AgentLoop`] repeats Observe -> Plan -> Execute -> Verify until it is
//! stopped through an [`AgentHandle`] or the planner answers with `FINISH`.
//! No error ends the loop; failed iterations wait and try again.

pub mod credentials;
pub mod error_handling;
pub mod prompts;
pub mod verify;

pub use credentials::{CredentialSource, StaticCredentials, VaultCredentials};
pub use error_handling::{classify, AgentError, Recovery};
pub use verify::{NoopVerifier, Verifier};

use smol_computer_control::{
    capture, Action, ActionExecutor, Device, RetryConfig, ScreenCapture,
};
use smol_providers::{Planner, StatusUpdate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info};

/// Timing and policy knobs for the loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Pause between iterations, also used after a skipped iteration
    pub poll_interval: Duration,
    /// Pause after an iteration that failed
    pub error_backoff: Duration,
    pub retry: RetryConfig,
    /// Post a status update after each iteration that executed something
    pub sync_status: bool,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            error_backoff: Duration::from_millis(5000),
            retry: RetryConfig::default(),
            sync_status: true,
        }
    }
}

/// Totals for one call to [`AgentLoop::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u32,
    pub actions_executed: u32,
    /// Actions whose retries were exhausted
    pub actions_abandoned: u32,
    /// The planner ended the run with `FINISH`
    pub finished: bool,
}

/// Running flag shared between the loop and its handles.
#[derive(Debug, Default)]
struct RunState {
    running: AtomicBool,
    wake: Notify,
}

impl RunState {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    /// Sleep for `duration`, returning early if the loop is stopped.
    async fn pause(&self, duration: Duration) {
        let woken = self.wake.notified();
        tokio::pin!(woken);
        // Register before checking the flag so a concurrent stop() is not lost.
        woken.as_mut().enable();

        if !self.is_running() {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = woken => {}
        }
    }
}

/// Cloneable remote control for a running [`AgentLoop`].
#[derive(Debug, Clone)]
pub struct AgentHandle {
    state: Arc<RunState>,
}

impl AgentHandle {
    /// Ask the loop to stop.
    ///
    /// Takes effect at the next checkpoint: before the next action, or
    /// immediately if the loop is sleeping. An in-flight planner call or
    /// action attempt is allowed to complete.
    pub fn stop(&self) {
        info!("Stop requested");
        self.state.stop();
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }
}

enum Outcome {
    Continue,
    Finished,
}

pub struct AgentLoop {
    device: Device,
    executor: ActionExecutor,
    planner: Arc<dyn Planner>,
    credentials: Arc<dyn CredentialSource>,
    verifier: Arc<dyn Verifier>,
    screen: Option<Arc<dyn ScreenCapture>>,
    settings: LoopSettings,
    state: Arc<RunState>,
}

impl AgentLoop {
    pub fn new(
        device: Device,
        planner: Arc<dyn Planner>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            executor: ActionExecutor::new(device.clone()),
            device,
            planner,
            credentials,
            verifier: Arc::new(NoopVerifier),
            screen: None,
            settings: LoopSettings::default(),
            state: Arc::new(RunState::default()),
        }
    }

    /// Replace the default executor, e.g. to change swipe length or the
    /// scroll search budget. It should drive the same device as the loop.
    pub fn with_executor(mut self, executor: ActionExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Attach a screen source for status updates.
    pub fn with_screen_capture(mut self, screen: Arc<dyn ScreenCapture>) -> Self {
        self.screen = Some(screen);
        self
    }

    pub fn handle(&self) -> AgentHandle {
        AgentHandle {
            state: self.state.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Start the loop and drive it until it is stopped or finishes.
    pub async fn run(&self, goal: &str) -> RunSummary {
        self.state.running.store(true, Ordering::SeqCst);
        info!("Agent loop started with planner '{}'", self.planner.name());

        let mut summary = RunSummary::default();

        while self.state.is_running() {
            summary.iterations += 1;
            debug!("Iteration {}", summary.iterations);

            let delay = match self.iterate(goal, &mut summary).await {
                Ok(Outcome::Finished) => {
                    self.state.running.store(false, Ordering::SeqCst);
                    summary.finished = true;
                    info!("Planner finished the task");
                    break;
                }
                Ok(Outcome::Continue) => self.settings.poll_interval,
                Err(e) => match classify(&e) {
                    Recovery::Skip => {
                        info!("Skipping iteration: {}", e);
                        self.settings.poll_interval
                    }
                    Recovery::Backoff => {
                        error!("Error in agent loop: {}", e);
                        self.settings.error_backoff
                    }
                },
            };

            self.state.pause(delay).await;
        }

        info!(
            "Agent loop stopped after {} iterations ({} actions executed, {} abandoned)",
            summary.iterations, summary.actions_executed, summary.actions_abandoned
        );
        summary
    }

    async fn iterate(&self, goal: &str, summary: &mut RunSummary) -> Result<Outcome, AgentError> {
        // Observe
        let snapshot = capture(self.device.ui.as_ref())?;

        // Plan
        let credentials = self.credentials.resolve()?;
        let request = prompts::build_plan_request(goal, &snapshot);
        let actions = self.planner.plan(&credentials, &request).await;
        if actions.is_empty() {
            debug!("Planner returned no actions");
        }

        // Execute
        let mut executed: Vec<Action> = Vec::with_capacity(actions.len());
        for action in actions {
            if !self.state.is_running() {
                info!("Stopped before {}", action);
                break;
            }
            if action.is_finish() {
                return Ok(Outcome::Finished);
            }

            let report = self
                .executor
                .execute_with_retry(&action, &self.settings.retry)
                .await;
            if report.succeeded {
                summary.actions_executed += 1;
            } else {
                summary.actions_abandoned += 1;
            }
            executed.push(action);
        }

        // Verify
        self.verifier.verify(&snapshot, &executed).await?;

        if self.settings.sync_status {
            if let Some(last) = executed.last() {
                self.sync(request.ui_tree, last).await;
            }
        }

        Ok(Outcome::Continue)
    }

    async fn sync(&self, ui_tree: String, last: &Action) {
        let screenshot = match &self.screen {
            Some(screen) => screen.capture_base64().await,
            None => None,
        };

        self.planner
            .sync_status(StatusUpdate {
                screenshot,
                ui_tree,
                status: format!("Executing: {}", last.kind()),
                last_action: Some(last.to_string()),
            })
            .await;
    }
}
