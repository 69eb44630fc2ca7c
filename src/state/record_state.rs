/// Record state definitions for tracking one URL through the processor
///
/// This module defines the states a record passes through during a single call to
/// the record processor, and the failure categories a failed record can end in.
use std::fmt;

/// Category of a failed attempt or record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The page is not a media page at all
    WrongPageKind,

    /// The candidate URL cannot be navigated to
    InvalidUrl,

    /// The page title never appeared
    TitleTimeout,

    /// No known label element appeared
    ContentMissing,

    /// No layout variant resolved its media-type element
    LayoutUnknown,

    /// The fetcher session crashed or hung
    SessionFailure,

    /// The record deadline expired during the attempt
    DeadlineExceeded,
}

impl FailureKind {
    /// Returns true if retrying the same URL cannot change the outcome
    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::WrongPageKind | Self::InvalidUrl)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WrongPageKind => "wrong_page_kind",
            Self::InvalidUrl => "invalid_url",
            Self::TitleTimeout => "title_timeout",
            Self::ContentMissing => "content_missing",
            Self::LayoutUnknown => "layout_unknown",
            Self::SessionFailure => "session_failure",
            Self::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents the current state of a record in the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordState {
    // ===== Active States =====
    /// Not yet attempted
    Idle,

    /// Navigating and detecting the page layout
    Detecting,

    /// Layout detected, pulling field values
    Extracting,

    // ===== Terminal States =====
    /// An attempt produced an error-free record
    Succeeded,

    /// The retry loop ended without an error-free record
    Failed(FailureKind),
}

impl RecordState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns whether the processor may move from this state to `next`
    ///
    /// A failed attempt returns the record to `Detecting` for the next attempt, so
    /// `Failed` is only final once the processor stops retrying.
    pub fn can_transition_to(&self, next: RecordState) -> bool {
        use RecordState::*;
        matches!(
            (*self, next),
            (Idle, Detecting)
                | (Detecting, Extracting)
                | (Detecting, Failed(_))
                | (Extracting, Succeeded)
                | (Extracting, Failed(_))
                | (Failed(_), Detecting)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Detecting => "detecting",
            Self::Extracting => "extracting",
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(kind) => write!(f, "failed({})", kind),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!RecordState::Idle.is_terminal());
        assert!(!RecordState::Detecting.is_terminal());
        assert!(!RecordState::Extracting.is_terminal());

        assert!(RecordState::Succeeded.is_terminal());
        assert!(RecordState::Failed(FailureKind::LayoutUnknown).is_terminal());
    }

    #[test]
    fn test_is_success() {
        assert!(RecordState::Succeeded.is_success());
        assert!(!RecordState::Failed(FailureKind::SessionFailure).is_success());
        assert!(!RecordState::Extracting.is_success());
    }

    #[test]
    fn test_transitions() {
        let failed = RecordState::Failed(FailureKind::ContentMissing);

        assert!(RecordState::Idle.can_transition_to(RecordState::Detecting));
        assert!(RecordState::Detecting.can_transition_to(RecordState::Extracting));
        assert!(RecordState::Detecting.can_transition_to(failed));
        assert!(RecordState::Extracting.can_transition_to(RecordState::Succeeded));
        assert!(failed.can_transition_to(RecordState::Detecting));

        assert!(!RecordState::Idle.can_transition_to(RecordState::Succeeded));
        assert!(!RecordState::Succeeded.can_transition_to(RecordState::Detecting));
        assert!(!RecordState::Detecting.can_transition_to(RecordState::Succeeded));
    }

    #[test]
    fn test_categorical_failures() {
        assert!(FailureKind::WrongPageKind.is_categorical());
        assert!(FailureKind::InvalidUrl.is_categorical());

        assert!(!FailureKind::ContentMissing.is_categorical());
        assert!(!FailureKind::LayoutUnknown.is_categorical());
        assert!(!FailureKind::SessionFailure.is_categorical());
        assert!(!FailureKind::DeadlineExceeded.is_categorical());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", RecordState::Detecting), "detecting");
        assert_eq!(
            format!("{}", RecordState::Failed(FailureKind::TitleTimeout)),
            "failed(title_timeout)"
        );
    }
}
