//! The session registry: issues sessions and records attendance.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself: it uses plain
//! `HashMap`s. It is owned by one place (the in-process client) and
//! accessed through a mutex there. Every check-then-insert in
//! [`SessionRegistry::mark`] therefore happens under that one lock, which
//! is what makes the `(student, session)` uniqueness hold under concurrent
//! scans.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use rollcall_protocol::{
    AttendanceRecord, AttendanceStatus, ClassId, GenerateSession, Identity, Role, Session,
    SessionId, UserId,
};
use rollcall_tick::SharedClock;

use crate::{RegistryConfig, RegistryError, SessionEntry, SessionState};

const MS_PER_MINUTE: u64 = 60_000;

/// A class as far as attendance is concerned: who teaches it and who may
/// mark themselves present.
#[derive(Debug, Clone)]
struct ClassEntry {
    teacher: UserId,
    students: HashSet<UserId>,
}

/// Issues sessions and keeps the attendance ledger.
///
/// ## Lifecycle
///
/// ```text
/// generate() ──→ [Open] ──(now >= expires_at)──→ expired (derived)
///                   │
///                   └──(generate() again)──→ [Superseded]
///
/// mark(): student ─→ known session ─→ enrolled ─→ not yet marked ─→ not closed ─→ record
/// ```
pub struct SessionRegistry {
    classes: HashMap<ClassId, ClassEntry>,

    /// Every session ever issued. Never pruned while records refer to it.
    sessions: HashMap<SessionId, SessionEntry>,

    /// The current session per class. At most one (key invariant).
    active: HashMap<ClassId, SessionId>,

    /// The ledger, keyed by its uniqueness constraint.
    records: HashMap<(UserId, SessionId), AttendanceRecord>,

    config: RegistryConfig,
    clock: SharedClock,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new(config: RegistryConfig, clock: SharedClock) -> Self {
        Self {
            classes: HashMap::new(),
            sessions: HashMap::new(),
            active: HashMap::new(),
            records: HashMap::new(),
            config: config.validated(),
            clock,
        }
    }

    // =====================================================================
    // Roster (seeded by the surrounding CRUD; minimal here)
    // =====================================================================

    /// Registers a class and its teacher. Re-registering replaces the
    /// teacher and keeps the enrolled students.
    pub fn register_class(&mut self, class_id: ClassId, teacher: UserId) {
        self.classes
            .entry(class_id)
            .and_modify(|c| c.teacher = teacher)
            .or_insert_with(|| ClassEntry {
                teacher,
                students: HashSet::new(),
            });
        tracing::debug!(%class_id, %teacher, "class registered");
    }

    /// Enrolls a student in a class.
    ///
    /// # Errors
    /// [`RegistryError::ClassNotFound`] if the class was never registered.
    pub fn enroll(&mut self, class_id: ClassId, student: UserId) -> Result<(), RegistryError> {
        let class = self
            .classes
            .get_mut(&class_id)
            .ok_or(RegistryError::ClassNotFound(class_id))?;
        class.students.insert(student);
        tracing::debug!(%class_id, %student, "student enrolled");
        Ok(())
    }

    // =====================================================================
    // Issuer
    // =====================================================================

    /// Opens a new session for a class, superseding the current one.
    ///
    /// A `duration_minutes` of 0 means "use the configured default".
    ///
    /// # Errors
    /// - [`RegistryError::InvalidDuration`]: outside configured bounds
    /// - [`RegistryError::ClassNotFound`]: unknown class
    /// - [`RegistryError::Unauthorized`]: caller is not this class's teacher
    pub fn generate(
        &mut self,
        who: &Identity,
        request: &GenerateSession,
    ) -> Result<Session, RegistryError> {
        let minutes = match request.duration_minutes {
            0 => self.config.default_duration_minutes,
            m => m,
        };
        if !(self.config.min_duration_minutes..=self.config.max_duration_minutes).contains(&minutes)
        {
            return Err(RegistryError::InvalidDuration {
                minutes,
                min: self.config.min_duration_minutes,
                max: self.config.max_duration_minutes,
            });
        }

        let class_id = request.class_id;
        let class = self
            .classes
            .get(&class_id)
            .ok_or(RegistryError::ClassNotFound(class_id))?;
        if who.role != Role::Teacher || class.teacher != who.user {
            return Err(RegistryError::Unauthorized(format!(
                "{} does not teach {class_id}",
                who.user
            )));
        }

        let now = self.clock.now_ms();
        let session_id = self.fresh_session_id();
        let session = Session {
            session_id: session_id.clone(),
            class_id,
            payload: session_id.to_payload(),
            issued_at_ms: now,
            expires_at_ms: now + u64::from(minutes) * MS_PER_MINUTE,
            lecture_timing: request.lecture_timing.clone(),
        };

        if let Some(previous) = self.active.insert(class_id, session_id.clone()) {
            if let Some(entry) = self.sessions.get_mut(&previous) {
                entry.state = SessionState::Superseded {
                    at_ms: now,
                    by: session_id.clone(),
                };
                tracing::info!(%class_id, session_id = %previous, "session superseded");
            }
        }

        self.sessions.insert(
            session_id.clone(),
            SessionEntry {
                session: session.clone(),
                state: SessionState::Open,
                created_by: who.user,
            },
        );

        tracing::info!(
            %class_id,
            %session_id,
            minutes,
            expires_at_ms = session.expires_at_ms,
            "session generated"
        );
        Ok(session)
    }

    /// The class's current session, if it has not expired.
    ///
    /// Only the class's teacher and its enrolled students may ask.
    ///
    /// # Errors
    /// - [`RegistryError::ClassNotFound`]: unknown class
    /// - [`RegistryError::Unauthorized`]: caller has no business with it
    pub fn active(
        &self,
        who: &Identity,
        class_id: ClassId,
    ) -> Result<Option<Session>, RegistryError> {
        let class = self
            .classes
            .get(&class_id)
            .ok_or(RegistryError::ClassNotFound(class_id))?;
        if !Self::may_view(class, who) {
            return Err(RegistryError::Unauthorized(format!(
                "{} is not part of {class_id}",
                who.user
            )));
        }

        let now = self.clock.now_ms();
        Ok(self
            .active
            .get(&class_id)
            .and_then(|id| self.sessions.get(id))
            .filter(|entry| !entry.is_closed_at(now))
            .map(|entry| entry.session.clone()))
    }

    // =====================================================================
    // Ledger
    // =====================================================================

    /// Marks the caller present for a session.
    ///
    /// Checks run in a fixed order so the answer is deterministic: a
    /// duplicate is reported as [`RegistryError::AlreadyMarked`] even after
    /// the session has closed, which keeps repeated scans non-alarming.
    ///
    /// # Errors
    /// - [`RegistryError::Unauthorized`]: not a student, or not enrolled
    /// - [`RegistryError::SessionNotFound`]: id was never issued
    /// - [`RegistryError::AlreadyMarked`]: record already exists
    /// - [`RegistryError::SessionExpired`]: expired or superseded
    pub fn mark(
        &mut self,
        who: &Identity,
        session_id: &SessionId,
    ) -> Result<AttendanceRecord, RegistryError> {
        if who.role != Role::Student {
            return Err(RegistryError::Unauthorized(
                "only students can mark attendance".into(),
            ));
        }

        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| RegistryError::SessionNotFound(session_id.clone()))?;
        let class_id = entry.session.class_id;

        let enrolled = self
            .classes
            .get(&class_id)
            .is_some_and(|c| c.students.contains(&who.user));
        if !enrolled {
            return Err(RegistryError::Unauthorized(format!(
                "{} is not enrolled in {class_id}",
                who.user
            )));
        }

        let key = (who.user, session_id.clone());
        if self.records.contains_key(&key) {
            return Err(RegistryError::AlreadyMarked {
                student: who.user,
                session: session_id.clone(),
            });
        }

        let now = self.clock.now_ms();
        if entry.is_closed_at(now) {
            return Err(RegistryError::SessionExpired(session_id.clone()));
        }

        let record = AttendanceRecord {
            student: who.user,
            session_id: session_id.clone(),
            class_id,
            status: AttendanceStatus::Present,
            marked_at_ms: now,
        };
        self.records.insert(key, record.clone());

        tracing::info!(student = %who.user, %session_id, %class_id, "attendance marked");
        Ok(record)
    }

    /// Attendance history for a class, oldest first.
    ///
    /// Students see their own records; the class's teacher sees everyone's.
    ///
    /// # Errors
    /// Same as [`Self::active`].
    pub fn history(
        &self,
        who: &Identity,
        class_id: ClassId,
    ) -> Result<Vec<AttendanceRecord>, RegistryError> {
        let class = self
            .classes
            .get(&class_id)
            .ok_or(RegistryError::ClassNotFound(class_id))?;
        if !Self::may_view(class, who) {
            return Err(RegistryError::Unauthorized(format!(
                "{} is not part of {class_id}",
                who.user
            )));
        }

        let mut records: Vec<AttendanceRecord> = self
            .records
            .values()
            .filter(|r| r.class_id == class_id)
            .filter(|r| who.role == Role::Teacher || r.student == who.user)
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.marked_at_ms, r.student.0));
        Ok(records)
    }

    /// All records against one session.
    pub fn records_for(&self, session_id: &SessionId) -> Vec<&AttendanceRecord> {
        self.records
            .values()
            .filter(|r| &r.session_id == session_id)
            .collect()
    }

    /// Looks up a session by id (any state).
    pub fn get(&self, session_id: &SessionId) -> Option<&SessionEntry> {
        self.sessions.get(session_id)
    }

    /// Total number of attendance records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Total number of sessions ever issued.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn may_view(class: &ClassEntry, who: &Identity) -> bool {
        match who.role {
            Role::Teacher => class.teacher == who.user,
            Role::Student => class.students.contains(&who.user),
        }
    }

    /// A session id no other session has used.
    fn fresh_session_id(&self) -> SessionId {
        loop {
            let id = SessionId::new(generate_token());
            if !self.sessions.contains_key(&id) {
                return id;
            }
        }
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
///
/// Session ids must be unguessable: anyone holding one can mark attendance
/// while it is open, so it must not be derivable from the class or time.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
