use pretty_assertions::assert_eq;
use sorter_core::{
    update, AppState, ApprovalDecision, ApprovalRequest, CandidateClass, ConnectionStatus,
    Effect, Msg, WorkflowError,
};

fn request(product: &str) -> ApprovalRequest {
    ApprovalRequest::new(
        product,
        vec![
            CandidateClass::new("A", 0.92),
            CandidateClass::new("B", 0.05),
            CandidateClass::new("C", 0.03),
        ],
        vec![
            format!("shop/{product}/front.jpg"),
            format!("shop/{product}/back.jpg"),
        ],
    )
}

#[test]
fn default_selection_then_choose_and_submit() {
    engine_logging::initialize_for_tests();
    let (state, _) = update(AppState::new(), Msg::ApprovalRequested(request("boots")));

    let approval = state.view().approval.expect("pending request");
    assert_eq!(approval.product_identifier, "boots");
    let selected: Vec<_> = approval
        .candidates
        .iter()
        .filter(|c| c.selected)
        .map(|c| c.label.as_str())
        .collect();
    assert_eq!(selected, vec!["A"]);
    assert_eq!(approval.candidates[0].confidence_label, "92.000%");
    assert!(approval.can_submit);

    let (state, _) = update(state, Msg::CandidateSelected("B".into()));
    let (state, effects) = update(state, Msg::SubmitClicked);

    assert_eq!(
        effects,
        vec![Effect::SubmitApproval(ApprovalDecision {
            product_identifier: "boots".into(),
            chosen_class: "B".into(),
        })]
    );
    assert!(state.view().approval.is_none());

    // A second submit has nothing left to send.
    let (_state, effects) = update(state, Msg::SubmitClicked);
    assert!(effects.is_empty());
}

#[test]
fn at_most_one_request_is_pending() {
    engine_logging::initialize_for_tests();
    let (state, _) = update(AppState::new(), Msg::ApprovalRequested(request("boots")));
    let (state, _) = update(state, Msg::CandidateSelected("C".into()));
    let (state, _) = update(state, Msg::ApprovalRequested(request("hat")));

    let approval = state.view().approval.expect("pending request");
    assert_eq!(approval.product_identifier, "hat");
    assert!(approval.candidates[0].selected);

    let (_state, effects) = update(state, Msg::SubmitClicked);
    assert_eq!(
        effects,
        vec![Effect::SubmitApproval(ApprovalDecision {
            product_identifier: "hat".into(),
            chosen_class: "A".into(),
        })]
    );
}

#[test]
fn unknown_candidate_is_rejected() {
    engine_logging::initialize_for_tests();
    let (state, _) = update(AppState::new(), Msg::ApprovalRequested(request("boots")));
    let (mut state, effects) = update(state, Msg::CandidateSelected("Z".into()));
    assert!(effects.is_empty());
    assert_eq!(
        state.take_rejection(),
        Some(WorkflowError::UnknownCandidate("Z".into()))
    );
    assert!(state.view().approval.unwrap().candidates[0].selected);
}

#[test]
fn submit_while_disconnected_keeps_request() {
    engine_logging::initialize_for_tests();
    let (state, _) = update(AppState::new(), Msg::ApprovalRequested(request("boots")));
    let (state, _) = update(state, Msg::ConnectionChanged(ConnectionStatus::Closed));
    assert!(!state.view().approval.as_ref().unwrap().can_submit);

    let (mut state, effects) = update(state, Msg::SubmitClicked);
    assert!(effects.is_empty());
    assert_eq!(state.take_rejection(), Some(WorkflowError::Disconnected));
    assert!(state.view().approval.is_some());
}

#[test]
fn submit_gating_follows_actions_enabled() {
    engine_logging::initialize_for_tests();
    let (state, _) = update(AppState::new(), Msg::ApprovalRequested(request("boots")));
    for status in [
        ConnectionStatus::Connecting,
        ConnectionStatus::Open,
        ConnectionStatus::Closed,
    ] {
        let (next, _) = update(state.clone(), Msg::ConnectionChanged(status));
        let view = next.view();
        assert_eq!(
            view.approval.as_ref().unwrap().can_submit,
            view.actions_enabled,
            "{status:?}"
        );
    }
}

#[test]
fn starting_predictions_drops_pending_request() {
    engine_logging::initialize_for_tests();
    let (state, _) = update(AppState::new(), Msg::ApprovalRequested(request("boots")));
    let (state, effects) = update(state, Msg::StartPredictionsClicked);
    assert_eq!(effects, vec![Effect::InitPredictions]);
    assert!(state.view().approval.is_none());
}
