use serde::{Deserialize, Serialize};

/// Per-call envelope written ahead of every body
///
/// The client fills one in for each request. The server reads into a fresh
/// value, then reuses it for the response with `error` set on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Target in `"Service.Method"` form
    pub service_method: String,
    /// Caller-assigned sequence number, unique per outstanding call
    pub seq: u64,
    /// Empty on success, otherwise the reason the call failed
    pub error: String,
}

impl Header {
    /// Header for an outgoing request
    pub fn request(service_method: impl Into<String>, seq: u64) -> Self {
        Self {
            service_method: service_method.into(),
            seq,
            error: String::new(),
        }
    }

    /// Whether this header reports a failed call
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }

    /// Mark the call as failed
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = error.into();
    }

    /// Zero every field so the value can be reused for the next read
    pub fn reset(&mut self) {
        self.service_method.clear();
        self.seq = 0;
        self.error.clear();
    }

    /// Split `service_method` at its last `.`
    ///
    /// Returns `None` unless both the service and the method are non-empty.
    pub fn split_service_method(&self) -> Option<(&str, &str)> {
        let (service, method) = self.service_method.rsplit_once('.')?;
        if service.is_empty() || method.is_empty() {
            return None;
        }
        Some((service, method))
    }
}
