use smol_computer_control::UiSnapshot;
use smol_providers::PlanRequest;

/// Pair the user's goal with the rendered projection of `snapshot`.
pub fn build_plan_request(goal: &str, snapshot: &UiSnapshot) -> PlanRequest {
    PlanRequest::new(goal.trim(), snapshot.render())
}
