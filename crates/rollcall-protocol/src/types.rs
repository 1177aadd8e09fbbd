//! Core protocol types for Rollcall.
//!
//! Every type here is something that crosses the boundary between the
//! attendance screens and the issuer: the session a teacher opens, the
//! record a successful scan creates, and the request/response bodies in
//! between. Field names serialize in camelCase because that is what the
//! issuer's HTTP API speaks.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a class (a course a teacher runs lectures for).
///
/// Newtype over `u64` so a `ClassId` can never be passed where a `UserId`
/// is expected. `#[serde(transparent)]` keeps it a plain number on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u64);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// A unique identifier for a user. Teachers and students share the space;
/// what they may do is decided by their [`Role`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// An opaque session token minted by the issuer.
///
/// Clients never look inside it. The QR payload is the token itself, so
/// decoding a symbol yields a `SessionId` directly (see
/// [`SessionId::from_payload`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Longest payload accepted as a session id.
    pub const MAX_LEN: usize = 128;

    /// Wraps a token string. No validation: the issuer is the authority on
    /// which ids exist.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Interprets a decoded QR payload as a session id.
    ///
    /// Returns `None` for payloads that cannot possibly be a token: empty,
    /// longer than [`Self::MAX_LEN`], or containing anything other than
    /// printable ASCII. Surrounding whitespace is trimmed first, since some
    /// scanners append a newline.
    pub fn from_payload(payload: &str) -> Option<Self> {
        let trimmed = payload.trim();
        if trimmed.is_empty()
            || trimmed.len() > Self::MAX_LEN
            || !trimmed.bytes().all(|b| b.is_ascii_graphic())
        {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    /// The raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The QR payload for this session (identity mapping).
    pub fn to_payload(&self) -> String {
        self.0.clone()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Opens sessions for the classes they teach.
    Teacher,
    /// Marks attendance in the classes they are enrolled in.
    Student,
}

/// An authenticated user: the result of resolving a [`Credential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user: UserId,
    pub role: Role,
}

/// A bearer credential passed explicitly into every collaborator call.
///
/// There is no process-wide "current token": each presenter, marker, and
/// client call carries the credential it acts with.
///
/// `Debug` is hand-written so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    pub fn token(&self) -> &str {
        &self.0
    }

    /// Value for an HTTP `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A time-boxed, class-scoped credential that permits attendance marks.
///
/// Timestamps are milliseconds since the Unix epoch. The issuer guarantees
/// `expires_at_ms > issued_at_ms` (checked by [`Session::validate`] on the
/// client side).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: SessionId,
    pub class_id: ClassId,
    /// The string encoded into the QR symbol. Equal to `session_id`.
    pub payload: String,
    pub issued_at_ms: u64,
    pub expires_at_ms: u64,
    /// Free-text label the teacher gave the lecture, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lecture_timing: Option<String>,
}

impl Session {
    /// `true` once `now_ms` has reached the expiry instant.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }

    /// Milliseconds until expiry, saturating at zero.
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at_ms.saturating_sub(now_ms)
    }

    /// Checks the invariants a well-behaved issuer upholds.
    pub fn validate(&self) -> Result<(), crate::ProtocolError> {
        if self.expires_at_ms <= self.issued_at_ms {
            return Err(crate::ProtocolError::InvertedLifetime(
                self.session_id.clone(),
            ));
        }
        if SessionId::from_payload(&self.payload).as_ref() != Some(&self.session_id) {
            return Err(crate::ProtocolError::PayloadMismatch(
                self.session_id.clone(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Attendance records
// ---------------------------------------------------------------------------

/// The only status this flow ever creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
}

/// Proof that a student was marked present for a session.
///
/// `(student, session_id)` is unique across the ledger. Records are never
/// mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student: UserId,
    pub session_id: SessionId,
    pub class_id: ClassId,
    pub status: AttendanceStatus,
    pub marked_at_ms: u64,
}

// ---------------------------------------------------------------------------
// Requests and replies
// ---------------------------------------------------------------------------

/// Teacher → issuer: open a new session for a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSession {
    pub class_id: ClassId,
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lecture_timing: Option<String>,
}

/// Student → issuer: mark me present for this session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    pub session_id: SessionId,
}

/// Status field of a successful mark reply. Serializes as `"ok"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkStatus {
    Ok,
}

/// Issuer → student: the mark went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReceipt {
    pub status: MarkStatus,
    pub message: String,
    pub record: AttendanceRecord,
}

/// Machine-readable reason an issuer call was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The session's expiry has passed (or it was superseded).
    SessionExpired,
    /// No session with that id exists.
    SessionNotFound,
    /// The student already has a record for this session.
    AlreadyMarked,
    /// Wrong role, not enrolled, not the class's teacher, or bad credential.
    Unauthorized,
    /// The request itself is malformed (e.g. a duration out of range).
    InvalidRequest,
    /// The issuer failed for reasons of its own.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SessionExpired => "session_expired",
            Self::SessionNotFound => "session_not_found",
            Self::AlreadyMarked => "already_marked",
            Self::Unauthorized => "unauthorized",
            Self::InvalidRequest => "invalid_request",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Error body returned by the issuer: `{ "kind": "...", "message": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The issuer's JSON shapes are fixed; these tests pin our serde
    //! attributes to them.

    use super::*;

    fn session(issued: u64, expires: u64) -> Session {
        Session {
            session_id: SessionId::new("9b1c"),
            class_id: ClassId(3),
            payload: "9b1c".into(),
            issued_at_ms: issued,
            expires_at_ms: expires,
            lecture_timing: Some("Monday 9:00 AM".into()),
        }
    }

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_class_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ClassId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_ids_display_with_prefix() {
        assert_eq!(ClassId(7).to_string(), "C-7");
        assert_eq!(UserId(9).to_string(), "U-9");
        assert_eq!(SessionId::new("ab12").to_string(), "ab12");
    }

    #[test]
    fn test_session_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&SessionId::new("ab12")).unwrap();
        assert_eq!(json, "\"ab12\"");
    }

    #[test]
    fn test_session_id_from_payload_trims_whitespace() {
        let id = SessionId::from_payload("  ab12\n").unwrap();
        assert_eq!(id.as_str(), "ab12");
    }

    #[test]
    fn test_session_id_from_payload_rejects_garbage() {
        assert!(SessionId::from_payload("").is_none());
        assert!(SessionId::from_payload("   ").is_none());
        assert!(SessionId::from_payload("has space").is_none());
        assert!(SessionId::from_payload("caf\u{e9}").is_none());
        let long = "a".repeat(SessionId::MAX_LEN + 1);
        assert!(SessionId::from_payload(&long).is_none());
    }

    #[test]
    fn test_session_id_payload_is_identity() {
        let id = SessionId::new("0f9e");
        assert_eq!(SessionId::from_payload(&id.to_payload()), Some(id));
    }

    #[test]
    fn test_credential_debug_hides_token() {
        let cred = Credential::new("super-secret");
        assert_eq!(format!("{cred:?}"), "Credential(***)");
        assert_eq!(cred.bearer(), "Bearer super-secret");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"teacher\"");
        assert_eq!(serde_json::to_string(&Role::Student).unwrap(), "\"student\"");
    }

    // =====================================================================
    // Session
    // =====================================================================

    #[test]
    fn test_session_expiry_is_inclusive_at_boundary() {
        let s = session(0, 60_000);
        assert!(!s.is_expired_at(59_999));
        assert!(s.is_expired_at(60_000));
        assert!(s.is_expired_at(61_000));
    }

    #[test]
    fn test_session_remaining_saturates_at_zero() {
        let s = session(0, 60_000);
        assert_eq!(s.remaining_ms(15_000), 45_000);
        assert_eq!(s.remaining_ms(90_000), 0);
    }

    #[test]
    fn test_session_validate_rejects_inverted_window() {
        let s = session(60_000, 60_000);
        assert!(matches!(
            s.validate(),
            Err(crate::ProtocolError::InvertedLifetime(_))
        ));
    }

    #[test]
    fn test_session_validate_rejects_mismatched_payload() {
        let mut s = session(0, 60_000);
        s.payload = "something-else".into();
        assert!(matches!(
            s.validate(),
            Err(crate::ProtocolError::PayloadMismatch(_))
        ));
    }

    #[test]
    fn test_session_json_shape() {
        let value = serde_json::to_value(session(1, 2)).unwrap();
        assert_eq!(value["sessionId"], "9b1c");
        assert_eq!(value["issuedAtMs"], 1);
        assert_eq!(value["lectureTiming"], "Monday 9:00 AM");
    }

    #[test]
    fn test_session_deserializes_without_lecture_timing() {
        let json = r#"{"sessionId":"x1","classId":1,"payload":"x1","issuedAtMs":0,"expiresAtMs":10}"#;
        let s: Session = serde_json::from_str(json).unwrap();
        assert_eq!(s.lecture_timing, None);
        assert_eq!(s.class_id, ClassId(1));
    }

    // =====================================================================
    // Replies and errors
    // =====================================================================

    #[test]
    fn test_mark_receipt_status_is_ok_string() {
        let receipt = MarkReceipt {
            status: MarkStatus::Ok,
            message: "Attendance marked".into(),
            record: AttendanceRecord {
                student: UserId(5),
                session_id: SessionId::new("s"),
                class_id: ClassId(1),
                status: AttendanceStatus::Present,
                marked_at_ms: 10,
            },
        };
        let value = serde_json::to_value(&receipt).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["record"]["status"], "present");
        assert_eq!(value["record"]["markedAtMs"], 10);
    }

    #[test]
    fn test_api_error_json_shape() {
        let err = ApiError::new(ErrorKind::AlreadyMarked, "already counted");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "already_marked");
        assert_eq!(value["message"], "already counted");
    }

    #[test]
    fn test_api_error_display_includes_kind() {
        let err = ApiError::new(ErrorKind::SessionExpired, "too late");
        assert_eq!(err.to_string(), "session_expired: too late");
    }

    #[test]
    fn test_error_kind_display_matches_serde() {
        for kind in [
            ErrorKind::SessionExpired,
            ErrorKind::SessionNotFound,
            ErrorKind::AlreadyMarked,
            ErrorKind::Unauthorized,
            ErrorKind::InvalidRequest,
            ErrorKind::Internal,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }
}
