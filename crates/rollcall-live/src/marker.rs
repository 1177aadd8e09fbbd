//! Submitting a scanned session id, at most once at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rollcall_client::AttendanceApi;
use rollcall_protocol::{Credential, MarkReceipt, SessionId};

use crate::MarkError;

/// Sends marks to the issuer with a single-flight gate.
///
/// While one [`mark`](Self::mark) is pending, any other call on this marker
/// (or its clones) fails fast with [`MarkError::InFlight`] without touching
/// the network. The gate reopens when the pending call finishes, however it
/// finishes, including when its future is dropped.
pub struct AttendanceMarker<A: AttendanceApi> {
    api: Arc<A>,
    credential: Credential,
    in_flight: Arc<AtomicBool>,
}

impl<A: AttendanceApi> Clone for AttendanceMarker<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            credential: self.credential.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<A: AttendanceApi> AttendanceMarker<A> {
    pub fn new(api: Arc<A>, credential: Credential) -> Self {
        Self {
            api,
            credential,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Marks the credential's owner present for `session_id`.
    pub async fn mark(&self, session_id: &SessionId) -> Result<MarkReceipt, MarkError> {
        let Some(_flight) = FlightGuard::try_acquire(&self.in_flight) else {
            tracing::debug!(%session_id, "mark already in flight, refusing");
            return Err(MarkError::InFlight);
        };

        let result = self
            .api
            .mark_attendance(&self.credential, session_id)
            .await
            .map_err(MarkError::from);

        match &result {
            Ok(receipt) => tracing::info!(
                %session_id,
                student = %receipt.record.student,
                "attendance marked"
            ),
            Err(e) => tracing::info!(%session_id, error = %e, "mark refused"),
        }
        result
    }

    /// Like [`mark`](Self::mark), starting from raw decoded text.
    ///
    /// Text that cannot be a session id is refused locally as
    /// [`MarkError::SessionNotFound`].
    pub async fn mark_payload(&self, payload: &str) -> Result<MarkReceipt, MarkError> {
        let session_id = SessionId::from_payload(payload).ok_or(MarkError::SessionNotFound)?;
        self.mark(&session_id).await
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// RAII half of the single-flight gate.
struct FlightGuard {
    flag: Arc<AtomicBool>,
}

impl FlightGuard {
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

/// How loudly to show a mark result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    /// Not a failure, just worth knowing ("already marked").
    Info,
    Error,
}

/// A mark result ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn from_result(result: &Result<MarkReceipt, MarkError>) -> Self {
        match result {
            Ok(receipt) => Self {
                severity: Severity::Success,
                message: receipt.message.clone(),
            },
            Err(err) => Self::from_error(err),
        }
    }

    pub fn from_error(err: &MarkError) -> Self {
        let severity = match err {
            MarkError::AlreadyMarked => Severity::Info,
            _ => Severity::Error,
        };
        Self {
            severity,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rollcall_protocol::{
        AttendanceRecord, AttendanceStatus, ClassId, MarkStatus, UserId,
    };

    use super::*;

    fn receipt() -> MarkReceipt {
        MarkReceipt {
            status: MarkStatus::Ok,
            message: "Attendance marked".into(),
            record: AttendanceRecord {
                student: UserId(1),
                session_id: SessionId::new("s"),
                class_id: ClassId(1),
                status: AttendanceStatus::Present,
                marked_at_ms: 0,
            },
        }
    }

    #[test]
    fn test_flight_guard_second_acquire_fails_until_drop() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = FlightGuard::try_acquire(&flag).expect("gate open");
        assert!(FlightGuard::try_acquire(&flag).is_none());

        drop(guard);
        assert!(FlightGuard::try_acquire(&flag).is_some());
    }

    #[test]
    fn test_notice_from_result_severities() {
        assert_eq!(
            Notice::from_result(&Ok(receipt())).severity,
            Severity::Success
        );
        assert_eq!(
            Notice::from_result(&Err(MarkError::AlreadyMarked)).severity,
            Severity::Info
        );
        assert_eq!(
            Notice::from_result(&Err(MarkError::SessionExpired)).severity,
            Severity::Error
        );
    }

    #[test]
    fn test_notice_from_result_uses_receipt_message() {
        assert_eq!(Notice::from_result(&Ok(receipt())).message, "Attendance marked");
    }
}
