use crate::WorkflowError;

/// At most this many image paths are kept for display.
pub const MAX_DISPLAY_FILES: usize = 3;

/// Decimal places kept when a confidence is shown as a percentage.
pub const CONFIDENCE_DECIMALS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateClass {
    pub label: String,
    /// Fraction in [0, 1].
    pub confidence: f64,
}

impl CandidateClass {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// A product the backend could not settle on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRequest {
    product_identifier: String,
    candidates: Vec<CandidateClass>,
    display_file_paths: Vec<String>,
}

impl ApprovalRequest {
    pub fn new(
        product_identifier: impl Into<String>,
        candidates: Vec<CandidateClass>,
        mut display_file_paths: Vec<String>,
    ) -> Self {
        display_file_paths.truncate(MAX_DISPLAY_FILES);
        Self {
            product_identifier: product_identifier.into(),
            candidates,
            display_file_paths,
        }
    }

    pub fn product_identifier(&self) -> &str {
        &self.product_identifier
    }

    /// Candidates in the order the backend ranked them.
    pub fn candidates(&self) -> &[CandidateClass] {
        &self.candidates
    }

    pub fn display_file_paths(&self) -> &[String] {
        &self.display_file_paths
    }

    fn offers(&self, label: &str) -> bool {
        self.candidates.iter().any(|c| c.label == label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalDecision {
    pub product_identifier: String,
    pub chosen_class: String,
}

/// Holds the single live approval request, if any, and the current choice for it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ApprovalWorkflow {
    #[default]
    NoPendingRequest,
    Pending {
        request: ApprovalRequest,
        selection: Option<String>,
    },
}

impl ApprovalWorkflow {
    /// Install `request`, replacing any unresolved one. Returns the one replaced.
    pub fn receive(&mut self, request: ApprovalRequest) -> Option<ApprovalRequest> {
        let selection = request.candidates.first().map(|c| c.label.clone());
        let previous = std::mem::replace(self, ApprovalWorkflow::Pending { request, selection });
        match previous {
            ApprovalWorkflow::Pending { request, .. } => Some(request),
            ApprovalWorkflow::NoPendingRequest => None,
        }
    }

    pub fn select_candidate(&mut self, label: &str) -> Result<(), WorkflowError> {
        match self {
            ApprovalWorkflow::NoPendingRequest => Err(WorkflowError::NoPendingRequest),
            ApprovalWorkflow::Pending { request, selection } => {
                if !request.offers(label) {
                    return Err(WorkflowError::UnknownCandidate(label.to_string()));
                }
                *selection = Some(label.to_string());
                Ok(())
            }
        }
    }

    /// Turn the current selection into a decision and clear the request
    /// without waiting for the backend to acknowledge it.
    pub fn submit(&mut self) -> Result<ApprovalDecision, WorkflowError> {
        let chosen_class = match self {
            ApprovalWorkflow::NoPendingRequest => return Err(WorkflowError::NoPendingRequest),
            ApprovalWorkflow::Pending {
                selection: None, ..
            } => return Err(WorkflowError::NoSelection),
            ApprovalWorkflow::Pending {
                selection: Some(label),
                ..
            } => label.clone(),
        };
        match std::mem::take(self) {
            ApprovalWorkflow::Pending { request, .. } => Ok(ApprovalDecision {
                product_identifier: request.product_identifier,
                chosen_class,
            }),
            ApprovalWorkflow::NoPendingRequest => Err(WorkflowError::NoPendingRequest),
        }
    }

    pub fn clear(&mut self) {
        *self = ApprovalWorkflow::NoPendingRequest;
    }

    pub fn pending(&self) -> Option<&ApprovalRequest> {
        match self {
            ApprovalWorkflow::Pending { request, .. } => Some(request),
            ApprovalWorkflow::NoPendingRequest => None,
        }
    }

    pub fn selection(&self) -> Option<&str> {
        match self {
            ApprovalWorkflow::Pending { selection, .. } => selection.as_deref(),
            ApprovalWorkflow::NoPendingRequest => None,
        }
    }
}

/// `confidence * 100`, rounded to [`CONFIDENCE_DECIMALS`] places.
pub fn confidence_percent(confidence: f64) -> f64 {
    let scale = 10f64.powi(CONFIDENCE_DECIMALS as i32);
    (confidence * 100.0 * scale).round() / scale
}

pub fn format_confidence(confidence: f64) -> String {
    format!(
        "{:.*}%",
        CONFIDENCE_DECIMALS,
        confidence_percent(confidence)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(product: &str) -> ApprovalRequest {
        ApprovalRequest::new(
            product,
            vec![
                CandidateClass::new("A", 0.92),
                CandidateClass::new("B", 0.05),
                CandidateClass::new("C", 0.03),
            ],
            vec![format!("shop/{product}/1.jpg")],
        )
    }

    #[test]
    fn selection_defaults_to_first_candidate() {
        let mut workflow = ApprovalWorkflow::default();
        assert_eq!(workflow.receive(request("boots")), None);
        assert_eq!(workflow.selection(), Some("A"));
    }

    #[test]
    fn newer_request_replaces_unresolved_one() {
        let mut workflow = ApprovalWorkflow::default();
        workflow.receive(request("boots"));
        workflow.select_candidate("C").unwrap();

        let replaced = workflow.receive(request("hat"));
        assert_eq!(replaced.map(|r| r.product_identifier), Some("boots".into()));
        assert_eq!(workflow.pending().unwrap().product_identifier(), "hat");
        assert_eq!(workflow.selection(), Some("A"));
    }

    #[test]
    fn empty_candidate_list_has_nothing_to_submit() {
        let mut workflow = ApprovalWorkflow::default();
        workflow.receive(ApprovalRequest::new("bare", Vec::new(), Vec::new()));
        assert_eq!(workflow.submit(), Err(WorkflowError::NoSelection));
        assert!(workflow.pending().is_some());
    }

    #[test]
    fn unknown_label_keeps_previous_selection() {
        let mut workflow = ApprovalWorkflow::default();
        workflow.receive(request("boots"));
        assert_eq!(
            workflow.select_candidate("Z"),
            Err(WorkflowError::UnknownCandidate("Z".into()))
        );
        assert_eq!(workflow.selection(), Some("A"));
    }

    #[test]
    fn display_paths_are_capped() {
        let paths = (0..5).map(|i| format!("shop/p/{i}.png")).collect();
        let request = ApprovalRequest::new("p", Vec::new(), paths);
        assert_eq!(request.display_file_paths().len(), MAX_DISPLAY_FILES);
        assert_eq!(request.display_file_paths()[2], "shop/p/2.png");
    }

    #[test]
    fn confidence_rounds_to_three_places() {
        assert_eq!(confidence_percent(0.92), 92.0);
        assert_eq!(confidence_percent(0.12345), 12.345);
        assert_eq!(confidence_percent(0.0123456), 1.235);
        assert_eq!(format_confidence(0.5), "50.000%");
        assert_eq!(format_confidence(0.12345), "12.345%");
    }
}
