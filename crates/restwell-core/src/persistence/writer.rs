//! Coalescing snapshot writer.
//!
//! Transitions mark the session dirty; the first mark opens a window and
//! every mark inside it rides along with a single write when the window
//! closes. Delaying a write never reorders in-memory state, it only delays
//! durability.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::session::SessionState;
use crate::storage::PreferenceStore;

#[derive(Debug, Clone)]
pub struct DebouncedWriter {
    window: Duration,
    /// When the pending write becomes due.
    flush_at: Option<DateTime<Utc>>,
    writes: u64,
}

impl DebouncedWriter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            flush_at: None,
            writes: 0,
        }
    }

    /// Note a state change. The earliest pending deadline wins.
    pub fn mark_dirty(&mut self, now: DateTime<Utc>) {
        if self.flush_at.is_none() {
            self.flush_at = Some(now + self.window);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.flush_at.is_some()
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.flush_at.is_some_and(|at| at <= now)
    }

    pub fn time_until_flush(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.flush_at
            .map(|at| if at > now { at - now } else { Duration::zero() })
    }

    /// Number of writes issued so far.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Write if the window has closed. Returns whether a write was issued.
    pub fn flush_if_due(
        &mut self,
        prefs: &dyn PreferenceStore,
        state: &SessionState,
        synced_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.flush(prefs, state, synced_at, now);
        true
    }

    /// Write now regardless of the window. Failures are logged and dropped;
    /// the next transition tries again.
    pub fn flush(
        &mut self,
        prefs: &dyn PreferenceStore,
        state: &SessionState,
        synced_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        self.flush_at = None;
        self.writes += 1;
        if let Err(e) = super::write(prefs, state, synced_at, now) {
            warn!(error = %e, "session snapshot write failed");
        }
    }

    /// Forget any pending write.
    pub fn discard(&mut self) {
        self.flush_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 18, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn burst_is_coalesced_into_one_deadline() {
        let mut writer = DebouncedWriter::new(Duration::seconds(1));
        writer.mark_dirty(at(0));
        writer.mark_dirty(at(0) + Duration::milliseconds(400));
        writer.mark_dirty(at(0) + Duration::milliseconds(900));
        assert!(!writer.is_due(at(0) + Duration::milliseconds(999)));
        assert!(writer.is_due(at(1)));
        assert_eq!(writer.time_until_flush(at(0)), Some(Duration::seconds(1)));
    }

    #[test]
    fn clean_writer_is_never_due() {
        let writer = DebouncedWriter::new(Duration::seconds(1));
        assert!(!writer.is_dirty());
        assert!(!writer.is_due(at(100)));
        assert_eq!(writer.time_until_flush(at(0)), None);
    }

    #[test]
    fn discard_drops_pending_write() {
        let mut writer = DebouncedWriter::new(Duration::seconds(1));
        writer.mark_dirty(at(0));
        writer.discard();
        assert!(!writer.is_due(at(5)));
    }
}
