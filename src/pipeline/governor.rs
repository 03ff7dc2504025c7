//! Frame governance: submission throttling and duplicate suppression.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Strategy governing how often frames reach the detector and which results
/// are reported. Fixed for the lifetime of a pipeline run; changing it
/// requires a stop and a fresh start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetectionSpeed {
    /// Every frame is submitted and every result reported.
    Unrestricted,
    /// At most one submission per timeout interval. Purely time based: the
    /// window reopens when the timer fires, whether or not a result arrived.
    ThrottledByTimer,
    /// Every frame is submitted, but a result identical to the previously
    /// emitted one is dropped.
    #[default]
    SuppressDuplicates,
}

/// Mutable governance state scoped to one pipeline run.
///
/// Owned by the tick worker; only the throttle flag is shared, with the reset
/// timer tasks. Rebuilt on every start so runs never see stale state.
#[derive(Debug)]
pub struct GovernorState {
    last_emitted: Option<Vec<Option<String>>>,
    throttle_active: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
}

impl GovernorState {
    pub fn new() -> Self {
        Self::with_cancel(Arc::new(AtomicBool::new(false)))
    }

    /// Build state whose timers observe an externally owned cancellation
    /// flag. The pipeline sets the flag on stop so that in-flight timers
    /// become no-ops instead of mutating torn-down state.
    pub fn with_cancel(cancelled: Arc<AtomicBool>) -> Self {
        Self {
            last_emitted: None,
            throttle_active: Arc::new(AtomicBool::new(false)),
            cancelled,
        }
    }
}

impl Default for GovernorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-frame submit/accept decisions for one pipeline run.
#[derive(Debug, Clone, Copy)]
pub struct FrameGovernor {
    speed: DetectionSpeed,
    timeout: Duration,
}

impl FrameGovernor {
    pub fn new(speed: DetectionSpeed, timeout: Duration) -> Self {
        Self { speed, timeout }
    }

    /// Decide whether the current frame goes to the detector. Under
    /// [`DetectionSpeed::ThrottledByTimer`] a positive decision arms the
    /// throttle; follow up with [`FrameGovernor::schedule_reset`].
    pub fn should_submit(&self, state: &GovernorState) -> bool {
        match self.speed {
            DetectionSpeed::Unrestricted | DetectionSpeed::SuppressDuplicates => true,
            DetectionSpeed::ThrottledByTimer => {
                if state.throttle_active.load(Ordering::Acquire) {
                    false
                } else {
                    state.throttle_active.store(true, Ordering::Release);
                    true
                }
            }
        }
    }

    /// Arm the reset timer after a submission under the timer policy.
    ///
    /// The reset fires purely on time, independent of any detector result,
    /// and does nothing once the run has been cancelled.
    pub fn schedule_reset(&self, state: &GovernorState) {
        if self.speed != DetectionSpeed::ThrottledByTimer {
            return;
        }

        let throttle_active = Arc::clone(&state.throttle_active);
        let cancelled = Arc::clone(&state.cancelled);
        let timeout = self.timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if !cancelled.load(Ordering::Acquire) {
                throttle_active.store(false, Ordering::Release);
            }
        });
    }

    /// Decide whether a detector result batch is emitted. `signatures` are
    /// the raw values of every detected object, in detector order.
    pub fn on_result(&self, state: &mut GovernorState, signatures: &[Option<String>]) -> bool {
        if self.speed != DetectionSpeed::SuppressDuplicates {
            return true;
        }

        if state.last_emitted.as_deref() == Some(signatures) {
            trace!("result identical to last emitted, dropping");
            metrics::counter!("duplicates_dropped_total").increment(1);
            return false;
        }

        // An empty detection never overwrites a remembered signature, so a
        // code reappearing after a no-detection gap still counts as a
        // duplicate.
        if !signatures.is_empty() {
            state.last_emitted = Some(signatures.to_vec());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sig(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn unrestricted_always_submits_and_accepts() {
        let governor = FrameGovernor::new(DetectionSpeed::Unrestricted, Duration::from_millis(250));
        let mut state = GovernorState::new();

        for _ in 0..3 {
            assert!(governor.should_submit(&state));
            assert!(governor.on_result(&mut state, &sig(&["A"])));
        }
    }

    #[test]
    fn duplicates_rejected_until_sequence_changes() {
        let governor =
            FrameGovernor::new(DetectionSpeed::SuppressDuplicates, Duration::from_millis(250));
        let mut state = GovernorState::new();

        assert!(governor.should_submit(&state));
        assert!(governor.on_result(&mut state, &sig(&["A"])));
        assert!(!governor.on_result(&mut state, &sig(&["A"])));
        assert!(!governor.on_result(&mut state, &sig(&["A"])));
        assert!(governor.on_result(&mut state, &sig(&["B"])));
        assert!(!governor.on_result(&mut state, &sig(&["B"])));
    }

    #[test]
    fn sequence_equality_is_order_and_length_sensitive() {
        let governor =
            FrameGovernor::new(DetectionSpeed::SuppressDuplicates, Duration::from_millis(250));
        let mut state = GovernorState::new();

        assert!(governor.on_result(&mut state, &sig(&["A", "B"])));
        assert!(governor.on_result(&mut state, &sig(&["B", "A"])));
        assert!(governor.on_result(&mut state, &sig(&["B"])));
        assert!(!governor.on_result(&mut state, &sig(&["B"])));
    }

    #[test]
    fn empty_result_never_overwrites_remembered_signature() {
        let governor =
            FrameGovernor::new(DetectionSpeed::SuppressDuplicates, Duration::from_millis(250));
        let mut state = GovernorState::new();

        // [A, A, empty, A]: the empty batch passes the gate but leaves the
        // remembered signature alone, so the reappearing code is still a
        // duplicate.
        assert!(governor.on_result(&mut state, &sig(&["A"])));
        assert!(!governor.on_result(&mut state, &sig(&["A"])));
        assert!(governor.on_result(&mut state, &[]));
        assert!(!governor.on_result(&mut state, &sig(&["A"])));
    }

    #[test]
    fn missing_raw_values_participate_in_signatures() {
        let governor =
            FrameGovernor::new(DetectionSpeed::SuppressDuplicates, Duration::from_millis(250));
        let mut state = GovernorState::new();

        assert!(governor.on_result(&mut state, &[None]));
        assert!(!governor.on_result(&mut state, &[None]));
        assert!(governor.on_result(&mut state, &[None, None]));
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_blocks_until_timer_resets() {
        let timeout = Duration::from_millis(250);
        let governor = FrameGovernor::new(DetectionSpeed::ThrottledByTimer, timeout);
        let state = GovernorState::new();

        assert!(governor.should_submit(&state));
        governor.schedule_reset(&state);

        // Inside the window every frame is refused
        assert!(!governor.should_submit(&state));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!governor.should_submit(&state));

        // Once the timer fires the next frame is admitted immediately, with
        // no detector result ever having arrived
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(governor.should_submit(&state));
        assert!(!governor.should_submit(&state));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_leaves_throttle_untouched() {
        let timeout = Duration::from_millis(250);
        let governor = FrameGovernor::new(DetectionSpeed::ThrottledByTimer, timeout);
        let cancelled = Arc::new(AtomicBool::new(false));
        let state = GovernorState::with_cancel(Arc::clone(&cancelled));

        assert!(governor.should_submit(&state));
        governor.schedule_reset(&state);
        cancelled.store(true, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(
            state.throttle_active.load(Ordering::SeqCst),
            "cancelled timer must not mutate state"
        );
    }

    #[test]
    fn throttle_policy_accepts_every_result() {
        let governor =
            FrameGovernor::new(DetectionSpeed::ThrottledByTimer, Duration::from_millis(250));
        let mut state = GovernorState::new();

        assert!(governor.on_result(&mut state, &sig(&["A"])));
        assert!(governor.on_result(&mut state, &sig(&["A"])));
    }
}
