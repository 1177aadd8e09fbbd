//! In-process client backed by a [`SessionRegistry`].

use std::sync::Arc;

use rollcall_protocol::{
    AttendanceRecord, ClassId, Credential, GenerateSession, MarkReceipt, MarkStatus, Session,
    SessionId,
};
use rollcall_registry::{Authenticator, SessionRegistry};
use tokio::sync::Mutex;

use crate::{AttendanceApi, ClientError};

/// An [`AttendanceApi`] that calls a registry in the same process.
///
/// The registry sits behind a `tokio::sync::Mutex`, so concurrent marks
/// from many capture loops are serialized and the one-record-per-student
/// rule holds. Cloning shares the same registry.
pub struct LocalApi<A: Authenticator> {
    registry: Arc<Mutex<SessionRegistry>>,
    auth: Arc<A>,
}

impl<A: Authenticator> Clone for LocalApi<A> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            auth: Arc::clone(&self.auth),
        }
    }
}

impl<A: Authenticator> LocalApi<A> {
    pub fn new(registry: SessionRegistry, auth: A) -> Self {
        Self {
            registry: Arc::new(Mutex::new(registry)),
            auth: Arc::new(auth),
        }
    }

    /// Direct access to the registry, for seeding classes and inspecting
    /// records.
    pub fn registry(&self) -> &Arc<Mutex<SessionRegistry>> {
        &self.registry
    }
}

impl<A: Authenticator> AttendanceApi for LocalApi<A> {
    async fn generate_session(
        &self,
        credential: &Credential,
        request: &GenerateSession,
    ) -> Result<Session, ClientError> {
        let who = self.auth.authenticate(credential).await?;
        let session = self.registry.lock().await.generate(&who, request)?;
        Ok(session)
    }

    async fn active_session(
        &self,
        credential: &Credential,
        class_id: ClassId,
    ) -> Result<Option<Session>, ClientError> {
        let who = self.auth.authenticate(credential).await?;
        let session = self.registry.lock().await.active(&who, class_id)?;
        Ok(session)
    }

    async fn mark_attendance(
        &self,
        credential: &Credential,
        session_id: &SessionId,
    ) -> Result<MarkReceipt, ClientError> {
        let who = self.auth.authenticate(credential).await?;
        let record = self.registry.lock().await.mark(&who, session_id)?;
        Ok(MarkReceipt {
            status: MarkStatus::Ok,
            message: "Attendance marked".into(),
            record,
        })
    }

    async fn attendance_history(
        &self,
        credential: &Credential,
        class_id: ClassId,
    ) -> Result<Vec<AttendanceRecord>, ClientError> {
        let who = self.auth.authenticate(credential).await?;
        let records = self.registry.lock().await.history(&who, class_id)?;
        Ok(records)
    }
}
