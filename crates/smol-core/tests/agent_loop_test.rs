use async_trait::async_trait;
use smol_computer_control::{
    Action, Device, InputEvent, RetryConfig, ScreenCapture, SimulatedDevice, SimulatedNode,
    UiSnapshot,
};
use smol_core::{
    AgentError, AgentLoop, LoopSettings, StaticCredentials, VaultCredentials, Verifier,
};
use smol_providers::{MockPlanner, PlannerCredentials};
use smol_vault::{CredentialStore, FileKeyStore, Vault, API_KEY_ALIAS, ENDPOINT_ALIAS};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

fn screen() -> Arc<SimulatedDevice> {
    Arc::new(SimulatedDevice::new(
        SimulatedNode::new("android.widget.FrameLayout").with_children(vec![
            SimulatedNode::new("android.widget.EditText").focused(),
            SimulatedNode::new("android.widget.Button")
                .with_text("Send")
                .clickable(),
        ]),
    ))
}

fn credentials() -> Arc<StaticCredentials> {
    Arc::new(StaticCredentials(PlannerCredentials {
        endpoint: "https://planner.example/v1/plan".to_string(),
        api_key: "hf_live_token_123".to_string(),
    }))
}

fn agent(device: &Arc<SimulatedDevice>, planner: &Arc<MockPlanner>) -> AgentLoop {
    AgentLoop::new(
        Device::from_host(device.clone()),
        planner.clone(),
        credentials(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_finish_stops_the_loop() {
    let device = screen();
    let planner = Arc::new(MockPlanner::new().with_actions(vec![Action::Finish]));
    let agent = agent(&device, &planner);
    let handle = agent.handle();

    let start = Instant::now();
    let summary = agent.run("open the app").await;

    assert!(summary.finished);
    assert_eq!(summary.iterations, 1);
    assert!(!handle.is_running());
    assert_eq!(planner.requests().len(), 1);
    // Finish ends the iteration without the poll sleep
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_actions_before_finish_are_executed() {
    let device = screen();
    let planner = Arc::new(MockPlanner::new().with_actions(vec![
        Action::Input {
            text: "hello".to_string(),
        },
        Action::TapText {
            text: "Send".to_string(),
        },
        Action::Finish,
        Action::Tap { x: 1.0, y: 1.0 },
    ]));

    let summary = agent(&device, &planner).run("send hello").await;

    assert!(summary.finished);
    assert_eq!(summary.actions_executed, 2);
    let events = device.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], InputEvent::SetText { text, .. } if text == "hello"));
    assert!(matches!(events[1], InputEvent::Click { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_request_carries_goal_and_visible_tree() {
    let device = screen();
    let planner = Arc::new(MockPlanner::new().with_actions(vec![Action::Finish]));

    agent(&device, &planner).run("send hello").await;

    let request = &planner.requests()[0];
    assert_eq!(request.goal, "send hello");
    assert!(request.ui_tree.contains("[Button] Send (Clickable: true)"));
    assert_eq!(planner.endpoints()[0], "https://planner.example/v1/plan");
}

#[tokio::test(start_paused = true)]
async fn test_stop_wakes_a_sleeping_loop() {
    let device = screen();
    let planner = Arc::new(MockPlanner::new());
    let agent = Arc::new(agent(&device, &planner));
    let handle = agent.handle();

    let start = Instant::now();
    let task = {
        let agent = agent.clone();
        tokio::spawn(async move { agent.run("wait").await })
    };

    // Iterations at 0, 2000 and 4000ms
    tokio::time::sleep(Duration::from_millis(4500)).await;
    assert!(handle.is_running());
    handle.stop();

    let summary = task.await.unwrap();
    assert_eq!(summary.iterations, 3);
    assert!(!summary.finished);
    assert!(!agent.is_running());
    assert!(start.elapsed() < Duration::from_millis(6000));
}

#[tokio::test(start_paused = true)]
async fn test_no_active_window_skips_planning() {
    let device = Arc::new(SimulatedDevice::empty());
    let planner = Arc::new(MockPlanner::new().with_actions(vec![Action::Finish]));
    let agent = Arc::new(agent(&device, &planner));
    let handle = agent.handle();

    let task = {
        let agent = agent.clone();
        tokio::spawn(async move { agent.run("anything").await })
    };
    tokio::time::sleep(Duration::from_millis(4500)).await;
    handle.stop();

    let summary = task.await.unwrap();
    // Skips wait the normal poll interval
    assert_eq!(summary.iterations, 3);
    assert!(planner.requests().is_empty());
}

fn open_store(dir: &TempDir) -> CredentialStore {
    let vault = Vault::open(&FileKeyStore::new(dir.path().join("vault.key"))).unwrap();
    CredentialStore::new(dir.path().join("credentials.json"), vault)
}

#[tokio::test(start_paused = true)]
async fn test_missing_credentials_skip_planning() {
    let dir = TempDir::new().unwrap();
    open_store(&dir)
        .put(ENDPOINT_ALIAS, "https://planner.example/v1/plan")
        .unwrap();

    let device = screen();
    let planner = Arc::new(MockPlanner::new().with_actions(vec![Action::Finish]));
    let agent = Arc::new(AgentLoop::new(
        Device::from_host(device.clone()),
        planner.clone(),
        Arc::new(VaultCredentials::new(open_store(&dir))),
    ));

    let task = {
        let agent = agent.clone();
        tokio::spawn(async move { agent.run("anything").await })
    };

    // Iterations at 0 and 2000ms have no API key
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(planner.requests().is_empty());

    // A key saved while the loop runs is used on the next iteration
    open_store(&dir).put(API_KEY_ALIAS, "hf_live_token_123").unwrap();

    let summary = task.await.unwrap();
    assert!(summary.finished);
    assert_eq!(summary.iterations, 3);
    assert_eq!(planner.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unparsable_response_degrades_to_empty_batch() {
    let device = screen();
    let planner = Arc::new(
        MockPlanner::new()
            .with_raw_response(r#"{ "actions": [ { "type": "TELEPORT" } ] }"#)
            .with_raw_response(r#"{ "result": [] }"#)
            .with_actions(vec![Action::Finish]),
    );

    let start = Instant::now();
    let summary = agent(&device, &planner).run("anything").await;

    assert!(summary.finished);
    assert_eq!(summary.iterations, 3);
    assert!(device.events().is_empty());
    // Two empty iterations each wait one poll interval
    assert_eq!(start.elapsed(), Duration::from_millis(4000));
}

#[tokio::test(start_paused = true)]
async fn test_status_sync_after_execution() {
    let device = screen();
    let planner = Arc::new(
        MockPlanner::new()
            .with_actions(vec![
                Action::ScrollForward,
                Action::Tap { x: 10.0, y: 20.0 },
            ])
            .with_actions(vec![])
            .with_actions(vec![Action::Finish]),
    );

    agent(&device, &planner).run("tap").await;

    let updates = planner.status_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].status, "Executing: TAP");
    assert_eq!(updates[0].last_action.as_deref(), Some("TAP (10, 20)"));
    assert!(updates[0].ui_tree.contains("[Button] Send"));
    assert_eq!(updates[0].screenshot, None);
}

struct FixedScreen;

#[async_trait]
impl ScreenCapture for FixedScreen {
    async fn capture_base64(&self) -> Option<String> {
        Some("aGVsbG8=".to_string())
    }
}

#[tokio::test(start_paused = true)]
async fn test_status_sync_includes_screenshot() {
    let device = screen();
    let planner = Arc::new(
        MockPlanner::new()
            .with_actions(vec![Action::ScrollBackward])
            .with_actions(vec![Action::Finish]),
    );

    agent(&device, &planner)
        .with_screen_capture(Arc::new(FixedScreen))
        .run("scroll")
        .await;

    let updates = planner.status_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].status, "Executing: SCROLL_BACKWARD");
    assert_eq!(updates[0].screenshot.as_deref(), Some("aGVsbG8="));
}

#[tokio::test(start_paused = true)]
async fn test_status_sync_can_be_disabled() {
    let device = screen();
    let planner = Arc::new(
        MockPlanner::new()
            .with_actions(vec![Action::Tap { x: 1.0, y: 1.0 }])
            .with_actions(vec![Action::Finish]),
    );

    agent(&device, &planner)
        .with_settings(LoopSettings {
            sync_status: false,
            ..Default::default()
        })
        .run("tap")
        .await;

    assert!(planner.status_updates().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_continue_with_the_batch() {
    let device = screen();
    device.fail_next_inputs(5);
    let planner = Arc::new(
        MockPlanner::new()
            .with_actions(vec![
                Action::Tap { x: 5.0, y: 5.0 },
                Action::Swipe {
                    start_x: 500.0,
                    start_y: 1500.0,
                    end_x: 500.0,
                    end_y: 300.0,
                },
            ])
            .with_actions(vec![Action::Finish]),
    );

    let start = Instant::now();
    let summary = agent(&device, &planner).run("swipe").await;

    assert_eq!(summary.actions_abandoned, 1);
    assert_eq!(summary.actions_executed, 1);
    assert_eq!(device.input_attempts(), 6);
    assert!(matches!(device.events()[0], InputEvent::Swipe { .. }));
    // Four retry delays, then one poll interval
    assert_eq!(start.elapsed(), Duration::from_millis(6000));
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_checked_before_each_action() {
    let device = screen();
    device.fail_next_inputs(100);
    let planner = Arc::new(MockPlanner::new().with_actions(vec![
        Action::Tap { x: 1.0, y: 1.0 },
        Action::Tap { x: 2.0, y: 2.0 },
    ]));
    let agent = Arc::new(agent(&device, &planner).with_settings(LoopSettings {
        retry: RetryConfig::default().with_max_retries(3),
        ..Default::default()
    }));
    let handle = agent.handle();

    let task = {
        let agent = agent.clone();
        tokio::spawn(async move { agent.run("tap twice").await })
    };
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.stop();

    let summary = task.await.unwrap();
    // The first action runs out its retries; the second is never attempted
    assert_eq!(device.input_attempts(), 3);
    assert_eq!(summary.actions_abandoned, 1);
    assert_eq!(summary.iterations, 1);
}

#[derive(Default)]
struct RecordingVerifier {
    calls: Mutex<Vec<Vec<Action>>>,
    fail: bool,
}

#[async_trait]
impl Verifier for RecordingVerifier {
    async fn verify(&self, _before: &UiSnapshot, executed: &[Action]) -> Result<(), AgentError> {
        self.calls.lock().unwrap().push(executed.to_vec());
        if self.fail {
            Err(AgentError::Verification("screen did not change".to_string()))
        } else {
            Ok(())
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_verifier_sees_executed_actions() {
    let device = screen();
    let planner = Arc::new(
        MockPlanner::new()
            .with_actions(vec![Action::ScrollForward])
            .with_actions(vec![Action::Finish]),
    );
    let verifier = Arc::new(RecordingVerifier::default());

    agent(&device, &planner)
        .with_verifier(verifier.clone())
        .run("scroll")
        .await;

    let calls = verifier.calls.lock().unwrap().clone();
    assert_eq!(calls, vec![vec![Action::ScrollForward]]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_verification_backs_off() {
    let device = screen();
    let planner = Arc::new(
        MockPlanner::new()
            .with_actions(vec![Action::ScrollForward])
            .with_actions(vec![Action::Finish]),
    );
    let verifier = Arc::new(RecordingVerifier {
        fail: true,
        ..Default::default()
    });

    let start = Instant::now();
    let summary = agent(&device, &planner)
        .with_verifier(verifier)
        .run("scroll")
        .await;

    assert!(summary.finished);
    assert_eq!(start.elapsed(), Duration::from_millis(5000));
    // No status update for an iteration that failed verification
    assert!(planner.status_updates().is_empty());
}
