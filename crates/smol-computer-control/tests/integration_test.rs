use smol_computer_control::*;
use std::sync::Arc;
use std::time::Duration;

fn list_with_hidden_submit(reveal_at: u32, max_scroll: u32) -> Arc<SimulatedDevice> {
    Arc::new(
        SimulatedDevice::new(
            SimulatedNode::new("android.widget.ScrollView").with_children(vec![
                SimulatedNode::new("android.widget.TextView").with_text("Terms"),
                SimulatedNode::new("android.widget.Button")
                    .with_text("Submit")
                    .clickable()
                    .visible_between(reveal_at, max_scroll),
            ]),
        )
        .with_max_scroll(max_scroll),
    )
}

#[tokio::test(start_paused = true)]
async fn test_submit_revealed_after_second_scroll() {
    let device = list_with_hidden_submit(2, 5);
    let locator = ElementLocator::new(Device::from_host(device.clone()));

    let node = locator
        .locate_with_scroll("Submit", 3)
        .await
        .expect("Submit should be found");

    assert!(node.clickable);
    assert_eq!(node.text.as_deref(), Some("Submit"));
    assert_eq!(device.scroll_calls(), 2);
    assert_eq!(device.backward_scrolls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_scroll_budget_is_two_times_max_attempts() {
    for max_attempts in [1u32, 3, 10] {
        // Plenty of content in both directions, target never appears.
        let device = Arc::new(
            SimulatedDevice::new(SimulatedNode::new("android.widget.ScrollView"))
                .with_max_scroll(100),
        );
        let locator = ElementLocator::new(Device::from_host(device.clone()));

        let result = locator.locate_with_scroll("Missing", max_attempts).await;

        assert!(result.is_none());
        assert_eq!(device.forward_scrolls(), max_attempts as usize);
        assert_eq!(device.backward_scrolls(), max_attempts as usize);
        assert!(device.scroll_calls() <= 2 * max_attempts as usize);
    }
}

#[tokio::test(start_paused = true)]
async fn test_search_stops_when_content_runs_out() {
    let device = Arc::new(
        SimulatedDevice::new(SimulatedNode::new("android.widget.ScrollView")).with_max_scroll(1),
    );
    let locator = ElementLocator::new(Device::from_host(device.clone()));

    assert!(locator.locate_with_scroll("Missing", 10).await.is_none());
    // Forward: one real scroll plus the failing one. Backward: the same.
    assert_eq!(device.forward_scrolls(), 2);
    assert_eq!(device.backward_scrolls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_settle_delay_between_scrolls() {
    let device = list_with_hidden_submit(2, 5);
    let locator = ElementLocator::new(Device::from_host(device.clone()));

    let started = tokio::time::Instant::now();
    assert!(locator.locate_with_scroll("Submit", 3).await.is_some());
    assert_eq!(started.elapsed(), SCROLL_SETTLE_DELAY * 2);
}

#[tokio::test(start_paused = true)]
async fn test_text_tap_is_retried_until_target_found() {
    let device = list_with_hidden_submit(1, 1);
    let executor = ActionExecutor::new(Device::from_host(device.clone()))
        .with_scroll_search(1, Duration::from_millis(10));
    device.fail_next_inputs(1);

    let report = executor
        .execute_with_retry(
            &Action::TapText {
                text: "Submit".to_string(),
            },
            &RetryConfig::default().with_delay(Duration::from_millis(50)),
        )
        .await;

    assert!(report.succeeded);
    assert_eq!(report.attempts, 2);
    assert!(matches!(device.events().as_slice(), [InputEvent::Click { .. }]));
}

#[tokio::test(start_paused = true)]
async fn test_text_tap_clicks_button_not_matching_label() {
    let device = Arc::new(SimulatedDevice::new(
        SimulatedNode::new("android.widget.LinearLayout").with_children(vec![
            SimulatedNode::new("android.widget.TextView").with_text("Submit"),
            SimulatedNode::new("android.widget.Button")
                .with_text("Submit")
                .clickable(),
        ]),
    ));
    let snapshot = capture(device.as_ref()).unwrap();
    let button = &snapshot.root.children[1];
    assert_eq!(button.class_name, "android.widget.Button");

    ActionExecutor::new(Device::from_host(device.clone()))
        .execute(&Action::TapText {
            text: "Submit".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(
        device.events(),
        vec![InputEvent::Click {
            node: button.handle
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_text_tap_ignores_label_only_matches() {
    let device = Arc::new(
        SimulatedDevice::new(
            SimulatedNode::new("android.widget.ScrollView").with_children(vec![
                SimulatedNode::new("android.widget.TextView").with_text("Submit"),
            ]),
        )
        .with_max_scroll(1),
    );

    let err = ActionExecutor::new(Device::from_host(device.clone()))
        .with_scroll_search(2, Duration::from_millis(10))
        .execute(&Action::TapText {
            text: "Submit".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ControlError::TargetNotFound(_)));
    assert!(device.events().is_empty());
}

#[test]
fn test_capture_projection_for_planner() {
    let device = list_with_hidden_submit(2, 5);
    let snapshot = capture(device.as_ref()).unwrap();
    let projection = snapshot.render();

    assert!(projection.contains("[TextView] Terms (Clickable: false)"));
    assert!(!projection.contains("Submit"));
}

#[test]
fn test_fixture_file_round_trip_through_capture() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("screen.json");
    std::fs::write(
        &path,
        r#"{
            "root": {
                "class_name": "android.widget.FrameLayout",
                "children": [
                    { "class_name": "android.widget.EditText", "focused": true },
                    { "class_name": "android.widget.Button", "description": "Search", "clickable": true }
                ]
            }
        }"#,
    )
    .unwrap();

    let device = SimulatedDevice::from_fixture(&path).unwrap();
    assert!(device.focused_input().is_some());

    let snapshot = capture(&device).unwrap();
    assert!(snapshot.render().contains("[Button] Search (Clickable: true)"));

    let missing = SimulatedDevice::from_fixture(&dir.path().join("absent.json"));
    assert!(matches!(missing, Err(ControlError::Fixture(_))));
}

#[tokio::test(start_paused = true)]
async fn test_demo_screen_fixture() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/login_screen.json");
    let device = Arc::new(SimulatedDevice::from_fixture(&path).unwrap());

    let snapshot = capture(device.as_ref()).unwrap();
    let rendered = snapshot.render();
    assert!(rendered.contains("[EditText] Email (Clickable: true)"));
    assert!(rendered.contains("[CheckBox] Remember me"));
    assert!(!rendered.contains("Submit"));

    let executor = ActionExecutor::new(Device::from_host(device.clone()));
    executor
        .execute(&Action::TapText {
            text: "Submit".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(device.forward_scrolls(), 2);
    assert!(matches!(device.events()[0], InputEvent::Click { .. }));
}
