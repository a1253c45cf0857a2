use std::sync::Arc;

use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use engine_logging::engine_warn;
use sorter_core::ApprovalView;
use sorter_engine::ImageFetcher;

/// Operator's answer for one approval request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOutcome {
    pub product_identifier: String,
    /// `None` when the prompt was dismissed.
    pub chosen_label: Option<String>,
}

pub fn candidate_items(view: &ApprovalView) -> Vec<String> {
    view.candidates
        .iter()
        .map(|candidate| format!("{:<24} {:>9}", candidate.label, candidate.confidence_label))
        .collect()
}

fn default_index(view: &ApprovalView) -> usize {
    view.candidates
        .iter()
        .position(|candidate| candidate.selected)
        .unwrap_or(0)
}

/// Prints preview details for the request's images, then asks for a class.
pub async fn ask(view: ApprovalView, previews: Option<Arc<dyn ImageFetcher>>) -> PromptOutcome {
    if let Some(fetcher) = previews {
        for path in &view.display_file_paths {
            match fetcher.fetch(path).await {
                Ok(image) => println!(
                    "  {} ({} bytes, {})",
                    image.url,
                    image.bytes.len(),
                    image.content_type.as_deref().unwrap_or("unknown type")
                ),
                Err(err) => println!("  {path}: preview unavailable ({err})"),
            }
        }
    } else {
        for path in &view.display_file_paths {
            println!("  {path}");
        }
    }

    let product_identifier = view.product_identifier.clone();
    let chosen_label = tokio::task::spawn_blocking(move || select_blocking(&view))
        .await
        .unwrap_or_else(|err| {
            engine_warn!("Prompt task failed: {}", err);
            None
        });

    PromptOutcome {
        product_identifier,
        chosen_label,
    }
}

fn select_blocking(view: &ApprovalView) -> Option<String> {
    if view.candidates.is_empty() {
        engine_warn!("Approval request for {} has no candidates", view.product_identifier);
        return None;
    }
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Class for {}", view.product_identifier))
        .items(&candidate_items(view))
        .default(default_index(view))
        .interact_opt();

    match selection {
        Ok(Some(index)) => view.candidates.get(index).map(|c| c.label.clone()),
        Ok(None) => None,
        Err(err) => {
            engine_warn!("Prompt failed: {}", err);
            None
        }
    }
}
