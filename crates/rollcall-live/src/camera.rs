//! The camera as an exclusive, scoped resource.
//!
//! A device is wrapped once in a [`SharedCamera`]. Whoever wants frames
//! calls [`SharedCamera::acquire`] and gets a [`CameraLease`]; nobody else
//! can acquire until that lease is dropped. The lease turns the device on
//! when it is created and off when it is dropped, so every exit path
//! (stop, decode, error, task abort) releases the camera.

use std::sync::Arc;

use rollcall_qr::Frame;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::CameraError;

/// A frame source. Implemented by real devices and by test doubles.
pub trait Camera: Send + 'static {
    /// Powers the device on. Called once per lease.
    fn start(&mut self) -> Result<(), CameraError>;

    /// Grabs one still.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Powers the device off. Called once per lease, from `Drop`.
    fn stop(&mut self);
}

/// A camera that at most one capture loop may use at a time.
///
/// Cloning shares the same device.
#[derive(Clone)]
pub struct SharedCamera {
    inner: Arc<Mutex<Box<dyn Camera>>>,
}

impl SharedCamera {
    pub fn new(camera: impl Camera) -> Self {
        let device: Box<dyn Camera> = Box::new(camera);
        Self {
            inner: Arc::new(Mutex::new(device)),
        }
    }

    /// Takes the camera and starts it.
    ///
    /// # Errors
    /// - [`CameraError::Busy`] if another lease is alive
    /// - whatever the device's `start()` returns
    pub fn acquire(&self) -> Result<CameraLease, CameraError> {
        let mut guard = Arc::clone(&self.inner)
            .try_lock_owned()
            .map_err(|_| CameraError::Busy)?;
        guard.start()?;
        tracing::debug!("camera acquired");
        Ok(CameraLease { guard })
    }

    /// Whether a lease is currently held.
    pub fn is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

impl std::fmt::Debug for SharedCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCamera")
            .field("busy", &self.is_busy())
            .finish()
    }
}

/// Exclusive use of a started camera. Stops the device when dropped.
pub struct CameraLease {
    guard: OwnedMutexGuard<Box<dyn Camera>>,
}

impl CameraLease {
    pub fn capture(&mut self) -> Result<Frame, CameraError> {
        self.guard.capture()
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        self.guard.stop();
        tracing::debug!("camera released");
    }
}
