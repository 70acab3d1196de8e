use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::distance_actor::DistanceStatus;
use crate::domain::{CompletionRecord, DeliveryMethod, OrderDraft, PriceBreakdown};
use crate::services::SubmissionReceipt;

/// Phase of the order session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SessionState {
    Drafting,
    Submitting,
    Cooldown {
        record: CompletionRecord,
        #[serde(with = "millis")]
        remaining: Duration,
        new_order_available: bool,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Drafting => "drafting",
            SessionState::Submitting => "submitting",
            SessionState::Cooldown { .. } => "cooldown",
        }
    }
}

/// Snapshot of everything the form renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub state: SessionState,
    pub draft: OrderDraft,
    pub distance: DistanceStatus,
    pub breakdown: PriceBreakdown,
    pub blocker: Option<SubmitBlocker>,
}

impl SessionView {
    pub fn can_submit(&self) -> bool {
        self.blocker.is_none()
    }
}

/// Countdown value published once per second during cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub remaining: Duration,
    pub new_order_available: bool,
}

impl Countdown {
    pub fn new(remaining: Duration) -> Self {
        Self { remaining, new_order_available: remaining.is_zero() }
    }
}

/// Returned to the caller of a successful submit.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionConfirmation {
    pub record: CompletionRecord,
    pub receipt: SubmissionReceipt,
}

/// Why the submit button is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmitBlocker {
    SubmissionPending,
    CooldownActive,
    CalculatingDistance,
    DistanceUnresolved,
}

impl fmt::Display for SubmitBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SubmitBlocker::SubmissionPending => "a submission is already in progress",
            SubmitBlocker::CooldownActive => "the last order is still being confirmed",
            SubmitBlocker::CalculatingDistance => "the delivery distance is being calculated",
            SubmitBlocker::DistanceUnresolved => "the delivery address has not been resolved",
        };
        f.write_str(reason)
    }
}

/// Decides whether the form may be submitted.
///
/// Submitting with an unknown delivery fee is never allowed, and neither is a
/// second submission while one is pending.
pub fn submit_blocker(state: &SessionState, draft: &OrderDraft, distance: DistanceStatus) -> Option<SubmitBlocker> {
    match state {
        SessionState::Submitting => return Some(SubmitBlocker::SubmissionPending),
        SessionState::Cooldown { .. } => return Some(SubmitBlocker::CooldownActive),
        SessionState::Drafting => {}
    }
    if distance.is_calculating() {
        return Some(SubmitBlocker::CalculatingDistance);
    }
    if draft.delivery_method == DeliveryMethod::Delivered && distance.miles().is_none() {
        return Some(SubmitBlocker::DistanceUnresolved);
    }
    None
}

/// Time left before a new order may be started.
///
/// A completion timestamp in the future counts as zero elapsed time.
pub fn cooldown_remaining(completed_at: DateTime<Utc>, now: DateTime<Utc>, cooldown: Duration) -> Duration {
    let elapsed = (now - completed_at).to_std().unwrap_or(Duration::ZERO);
    cooldown.saturating_sub(elapsed)
}

mod millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const COOLDOWN: Duration = Duration::from_millis(300_000);

    #[test]
    fn test_remaining_counts_down_from_completion() {
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(cooldown_remaining(t, t, COOLDOWN), COOLDOWN);
        assert_eq!(
            cooldown_remaining(t, t + chrono::Duration::milliseconds(120_500), COOLDOWN),
            Duration::from_millis(179_500)
        );
        assert_eq!(cooldown_remaining(t, t + chrono::Duration::milliseconds(300_000), COOLDOWN), Duration::ZERO);
        assert_eq!(cooldown_remaining(t, t + chrono::Duration::hours(3), COOLDOWN), Duration::ZERO);
        assert_eq!(cooldown_remaining(t, t - chrono::Duration::seconds(5), COOLDOWN), COOLDOWN);
    }

    #[test]
    fn test_submit_disabled_exactly_when_fee_unknown_or_pending() {
        let mut draft = OrderDraft::default();
        let resolved = DistanceStatus::Resolved { miles: 4.2 };

        for distance in [DistanceStatus::Unknown, resolved] {
            assert_eq!(submit_blocker(&SessionState::Drafting, &draft, distance), None);
            assert_eq!(
                submit_blocker(&SessionState::Submitting, &draft, distance),
                Some(SubmitBlocker::SubmissionPending)
            );
        }

        draft.delivery_method = DeliveryMethod::Delivered;
        assert_eq!(
            submit_blocker(&SessionState::Drafting, &draft, DistanceStatus::Unknown),
            Some(SubmitBlocker::DistanceUnresolved)
        );
        assert_eq!(
            submit_blocker(&SessionState::Drafting, &draft, DistanceStatus::Calculating),
            Some(SubmitBlocker::CalculatingDistance)
        );
        assert_eq!(submit_blocker(&SessionState::Drafting, &draft, resolved), None);
    }

    #[test]
    fn test_countdown_unlocks_at_zero() {
        assert!(!Countdown::new(Duration::from_secs(1)).new_order_available);
        assert!(Countdown::new(Duration::ZERO).new_order_available);
    }
}
