/// Item state definitions for the run orchestrator
///
/// Transitions:
///
/// ```text
/// Pending ─┬─> Skipped
///          └─> Fetching ─> {Succeeded | CaptchaBlocked | AccessDenied |
///                           RateLimited | HttpError | NetworkError}
///                  ^                 │ (soft blocks, attempts left)
///                  └─────────────────┤
///                                    └─> Recorded
/// ```
use std::fmt;

/// Represents where an item is in the fetch-classify-record cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    // ===== Active States =====
    /// Not yet looked at in this run
    Pending,

    /// A fetch for this item is in flight
    Fetching,

    // ===== Classified Outcomes =====
    /// HTTP 200 without a captcha marker
    Succeeded,

    /// HTTP 200 whose body carries a captcha marker
    CaptchaBlocked,

    /// HTTP 401 or 403
    AccessDenied,

    /// HTTP 429 or 503
    RateLimited,

    /// Any other HTTP status
    HttpError,

    /// Transport failure or other fault while handling the item
    NetworkError,

    // ===== Terminal States =====
    /// Already present in the checkpoint; not fetched again
    Skipped,

    /// Result recorded for this run
    Recorded,
}

impl ItemState {
    /// Returns true if no further processing happens in this run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Skipped | Self::Recorded)
    }

    /// Returns true for the states produced by classifying a fetch
    pub fn is_outcome(&self) -> bool {
        matches!(
            self,
            Self::Succeeded
                | Self::CaptchaBlocked
                | Self::AccessDenied
                | Self::RateLimited
                | Self::HttpError
                | Self::NetworkError
        )
    }

    /// Outcomes that count as an attempt and trigger a backoff wait
    pub fn is_soft_block(&self) -> bool {
        matches!(
            self,
            Self::CaptchaBlocked | Self::AccessDenied | Self::RateLimited
        )
    }

    /// Outcomes followed by the fixed short pause
    pub fn needs_pause(&self) -> bool {
        matches!(self, Self::HttpError | Self::NetworkError)
    }

    /// Fixed note recorded for this outcome, if it has one
    ///
    /// `NetworkError` notes carry the failure description instead.
    pub fn note(&self) -> Option<&'static str> {
        match self {
            Self::CaptchaBlocked => Some("captcha"),
            Self::AccessDenied => Some("access"),
            Self::RateLimited => Some("rate"),
            Self::HttpError => Some("http"),
            _ => None,
        }
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: ItemState) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Skipped | Self::Fetching),
            Self::Fetching => next.is_outcome(),
            s if s.is_soft_block() => matches!(next, Self::Fetching | Self::Recorded),
            s if s.is_outcome() => matches!(next, Self::Recorded),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Succeeded => "succeeded",
            Self::CaptchaBlocked => "captcha_blocked",
            Self::AccessDenied => "access_denied",
            Self::RateLimited => "rate_limited",
            Self::HttpError => "http_error",
            Self::NetworkError => "network_error",
            Self::Skipped => "skipped",
            Self::Recorded => "recorded",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(ItemState::Skipped.is_terminal());
        assert!(ItemState::Recorded.is_terminal());

        assert!(!ItemState::Pending.is_terminal());
        assert!(!ItemState::Fetching.is_terminal());
        assert!(!ItemState::Succeeded.is_terminal());
        assert!(!ItemState::RateLimited.is_terminal());
    }

    #[test]
    fn test_soft_blocks_and_pauses() {
        assert!(ItemState::CaptchaBlocked.is_soft_block());
        assert!(ItemState::AccessDenied.is_soft_block());
        assert!(ItemState::RateLimited.is_soft_block());
        assert!(!ItemState::HttpError.is_soft_block());
        assert!(!ItemState::Succeeded.is_soft_block());

        assert!(ItemState::HttpError.needs_pause());
        assert!(ItemState::NetworkError.needs_pause());
        assert!(!ItemState::RateLimited.needs_pause());
    }

    #[test]
    fn test_notes() {
        assert_eq!(ItemState::CaptchaBlocked.note(), Some("captcha"));
        assert_eq!(ItemState::AccessDenied.note(), Some("access"));
        assert_eq!(ItemState::RateLimited.note(), Some("rate"));
        assert_eq!(ItemState::HttpError.note(), Some("http"));
        assert_eq!(ItemState::Succeeded.note(), None);
        assert_eq!(ItemState::NetworkError.note(), None);
    }

    #[test]
    fn test_transitions() {
        assert!(ItemState::Pending.can_transition_to(ItemState::Skipped));
        assert!(ItemState::Pending.can_transition_to(ItemState::Fetching));
        assert!(ItemState::Fetching.can_transition_to(ItemState::CaptchaBlocked));
        assert!(ItemState::RateLimited.can_transition_to(ItemState::Fetching));
        assert!(ItemState::RateLimited.can_transition_to(ItemState::Recorded));
        assert!(ItemState::HttpError.can_transition_to(ItemState::Recorded));

        assert!(!ItemState::Pending.can_transition_to(ItemState::Recorded));
        assert!(!ItemState::HttpError.can_transition_to(ItemState::Fetching));
        assert!(!ItemState::Succeeded.can_transition_to(ItemState::Fetching));
        assert!(!ItemState::Skipped.can_transition_to(ItemState::Fetching));
        assert!(!ItemState::Recorded.can_transition_to(ItemState::Pending));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ItemState::CaptchaBlocked), "captcha_blocked");
        assert_eq!(format!("{}", ItemState::Skipped), "skipped");
    }
}
