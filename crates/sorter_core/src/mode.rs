use std::fmt;
use std::str::FromStr;

/// How much of the classification run the operator confirms by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Every product takes the top-ranked class.
    Automatic,
    /// Only ambiguous products are sent for approval.
    #[default]
    SemiAutomatic,
    /// Every product is sent for approval.
    Manual,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Automatic, Mode::SemiAutomatic, Mode::Manual];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Automatic => "automatic",
            Mode::SemiAutomatic => "semi-automatic",
            Mode::Manual => "manual",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode {0:?} (expected automatic, semi-automatic or manual)")]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{Mode, UnknownMode};

    #[test]
    fn parses_wire_names() {
        assert_eq!("semi-automatic".parse::<Mode>(), Ok(Mode::SemiAutomatic));
        assert_eq!("manual".parse::<Mode>(), Ok(Mode::Manual));
    }

    #[test]
    fn rejects_other_spellings() {
        assert_eq!(
            "Automatic".parse::<Mode>(),
            Err(UnknownMode("Automatic".to_string()))
        );
    }
}
