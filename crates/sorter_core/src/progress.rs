/// Counters reported by the backend for one prediction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PredictionProgress {
    pub approved_count: u64,
    pub total_count: u64,
}

impl PredictionProgress {
    pub fn percentage(&self) -> Option<f64> {
        percentage(self.approved_count, self.total_count)
    }
}

/// Completion in [0, 100], or `None` while `total` is zero.
///
/// `None` means "not yet determinable" and must not be shown as 0%.
pub fn percentage(approved: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let approved = approved.min(total);
    Some(approved as f64 / total as f64 * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ProgressDisplay {
    #[default]
    Indeterminate,
    Determinate {
        approved: u64,
        total: u64,
        percent: f64,
    },
}

impl ProgressDisplay {
    pub fn from_progress(progress: Option<PredictionProgress>) -> Self {
        let Some(progress) = progress else {
            return ProgressDisplay::Indeterminate;
        };
        match progress.percentage() {
            Some(percent) => ProgressDisplay::Determinate {
                approved: progress.approved_count,
                total: progress.total_count,
                percent,
            },
            None => ProgressDisplay::Indeterminate,
        }
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            ProgressDisplay::Determinate { percent, .. } => Some(*percent),
            ProgressDisplay::Indeterminate => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ProgressDisplay::Indeterminate => "Waiting for predictions".to_string(),
            ProgressDisplay::Determinate {
                approved,
                total,
                percent,
            } => format!("Completed {approved} out of {total} ({percent:.1}%)"),
        }
    }
}
