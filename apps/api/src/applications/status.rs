use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where an application stands in the hiring pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Saved,
    Applied,
    Screening,
    Interviewing,
    Offer,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 8] = [
        ApplicationStatus::Saved,
        ApplicationStatus::Applied,
        ApplicationStatus::Screening,
        ApplicationStatus::Interviewing,
        ApplicationStatus::Offer,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Saved => "saved",
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Screening => "screening",
            ApplicationStatus::Interviewing => "interviewing",
            ApplicationStatus::Offer => "offer",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }

    /// The next step forward in the pipeline, if any.
    fn next(&self) -> Option<ApplicationStatus> {
        match self {
            ApplicationStatus::Saved => Some(ApplicationStatus::Applied),
            ApplicationStatus::Applied => Some(ApplicationStatus::Screening),
            ApplicationStatus::Screening => Some(ApplicationStatus::Interviewing),
            ApplicationStatus::Interviewing => Some(ApplicationStatus::Offer),
            ApplicationStatus::Offer => Some(ApplicationStatus::Accepted),
            _ => None,
        }
    }

    /// Whether `self -> to` is a legal move. Staying put is always allowed.
    pub fn can_transition_to(&self, to: ApplicationStatus) -> bool {
        if *self == to {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        matches!(to, ApplicationStatus::Rejected | ApplicationStatus::Withdrawn)
            || self.next() == Some(to)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| format!("unknown application status '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::ApplicationStatus::*;
    use super::*;

    #[test]
    fn test_forward_path() {
        let path = [Saved, Applied, Screening, Interviewing, Offer, Accepted];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_cannot_skip_or_go_back() {
        assert!(!Saved.can_transition_to(Interviewing));
        assert!(!Offer.can_transition_to(Applied));
        assert!(!Screening.can_transition_to(Saved));
    }

    #[test]
    fn test_exit_from_any_open_status() {
        for status in [Saved, Applied, Screening, Interviewing, Offer] {
            assert!(status.can_transition_to(Rejected));
            assert!(status.can_transition_to(Withdrawn));
        }
    }

    #[test]
    fn test_terminal_statuses_are_final() {
        for status in [Accepted, Rejected, Withdrawn] {
            assert!(status.is_terminal());
            assert!(status.can_transition_to(status));
            assert!(!status.can_transition_to(Saved));
            assert!(!status.can_transition_to(Withdrawn) || status == Withdrawn);
        }
    }

    #[test]
    fn test_parse_round_trips_names() {
        for status in ApplicationStatus::ALL {
            assert_eq!(status.as_str().parse::<ApplicationStatus>(), Ok(status));
        }
        assert_eq!(" Offer ".parse::<ApplicationStatus>(), Ok(Offer));
        assert!("ghosted".parse::<ApplicationStatus>().is_err());
    }
}
