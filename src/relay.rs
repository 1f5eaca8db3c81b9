use std::mem;

/// One pending author lookup: which field asked for it, whether that field is
/// a list, and the serialized selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingRequest {
    pub field_id: String,
    pub is_list_field: bool,
    pub payload: String,
}

/// Single-slot buffer between the trigger and the merge. A new request
/// replaces whatever was pending.
#[derive(Debug, Default)]
pub struct ScratchRelay {
    pending: PendingRequest,
}

impl ScratchRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_request(&mut self, field_id: impl Into<String>, is_list_field: bool) {
        self.pending = PendingRequest {
            field_id: field_id.into(),
            is_list_field,
            payload: String::new(),
        };
    }

    pub fn capture_payload(&mut self, json: impl Into<String>) {
        self.pending.payload = json.into();
    }

    /// Take the pending request, leaving the relay empty.
    pub fn drain(&mut self) -> PendingRequest {
        mem::take(&mut self.pending)
    }

    pub fn cancel(&mut self) {
        self.pending = PendingRequest::default();
    }

    pub fn pending(&self) -> &PendingRequest {
        &self.pending
    }
}
