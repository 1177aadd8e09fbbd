//! Authentication hook for resolving credentials to identities.
//!
//! Issuing tokens is somebody else's job. The registry only needs to know
//! who is behind a [`Credential`], and it asks an [`Authenticator`].

use std::collections::HashMap;

use rollcall_protocol::{Credential, Identity};

use crate::RegistryError;

/// Resolves a client's credential to an [`Identity`].
///
/// The returned future is `Send` because the in-process client calls this
/// from tasks spawned by the presenter and capture-loop actors.
///
/// # Example
///
/// ```rust
/// use rollcall_protocol::{Credential, Identity, Role, UserId};
/// use rollcall_registry::{Authenticator, RegistryError};
///
/// /// Treats the token as a numeric student id. Development only.
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     async fn authenticate(
///         &self,
///         credential: &Credential,
///     ) -> Result<Identity, RegistryError> {
///         let id: u64 = credential.token().parse().map_err(|_| {
///             RegistryError::Unauthorized("token must be a number".into())
///         })?;
///         Ok(Identity { user: UserId(id), role: Role::Student })
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates the credential and returns who it belongs to.
    ///
    /// # Errors
    /// [`RegistryError::Unauthorized`] when the credential is unknown.
    fn authenticate(
        &self,
        credential: &Credential,
    ) -> impl std::future::Future<Output = Result<Identity, RegistryError>> + Send;
}

/// An authenticator backed by a fixed token table.
///
/// Used by the demo and tests, where users are seeded up front.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    tokens: HashMap<String, Identity>,
}

impl StaticAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token for an identity (builder style).
    pub fn with(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }

    /// Synchronous lookup.
    pub fn resolve(&self, credential: &Credential) -> Result<Identity, RegistryError> {
        self.tokens
            .get(credential.token())
            .copied()
            .ok_or_else(|| RegistryError::Unauthorized("unknown credential".into()))
    }
}

impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, credential: &Credential) -> Result<Identity, RegistryError> {
        self.resolve(credential)
    }
}
