use tracing::debug;

use crate::entry::AuthorKeys;
use crate::merge::{apply_selection, MergeError, MergeOutcome};
use crate::relay::{PendingRequest, ScratchRelay};
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// A field asked for an author; the search dialog is open.
    Requested,
    /// A selection has been captured and awaits confirmation.
    Confirmed,
}

/// Drives one author lookup at a time from trigger to merge.
#[derive(Debug)]
pub struct AuthorSearchSession {
    relay: ScratchRelay,
    phase: Phase,
}

impl Default for AuthorSearchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorSearchSession {
    pub fn new() -> Self {
        Self {
            relay: ScratchRelay::new(),
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending(&self) -> &PendingRequest {
        self.relay.pending()
    }

    pub fn trigger(&mut self, field_id: &str, is_list_field: bool) {
        debug!(field = field_id, is_list_field, "author search requested");
        self.relay.begin_request(field_id, is_list_field);
        self.phase = Phase::Requested;
    }

    /// Record the dialog's selection. Later selections replace earlier ones.
    pub fn select(&mut self, payload_json: &str) {
        self.relay.capture_payload(payload_json);
        if self.phase == Phase::Requested {
            self.phase = Phase::Confirmed;
        }
    }

    /// Dialog closed without confirming.
    pub fn dismiss(&mut self) {
        debug!(field = %self.relay.pending().field_id, "author search dismissed");
        self.relay.cancel();
        self.phase = Phase::Idle;
    }

    /// Drain the relay and merge the selection into `store`.
    ///
    /// Returns `Ok(None)` only when no request was triggered since the last
    /// confirm or dismiss. A triggered request is always merged, even with an
    /// empty field or payload. The relay is empty afterwards whether or not
    /// the merge succeeded.
    pub fn confirm(
        &mut self,
        store: &mut dyn RecordStore,
        keys: &AuthorKeys,
    ) -> Result<Option<MergeOutcome>, MergeError> {
        let was_idle = self.phase == Phase::Idle;
        let request = self.relay.drain();
        self.phase = Phase::Idle;

        if was_idle {
            return Ok(None);
        }

        apply_selection(
            store,
            keys,
            &request.field_id,
            request.is_list_field,
            &request.payload,
        )
        .map(Some)
    }
}
