//! A whole lecture in one process.
//!
//! The teacher opens a session and projects it; three students point their
//! cameras at the projector. Two are enrolled and get marked, one is not.
//! Ana then tries again and is told she is already in.
//!
//! ```text
//! cargo run -p classroom [-- qr.png]
//! ```
//!
//! Pass a path to also save the projected symbol as a PNG.

use std::sync::Arc;
use std::time::Duration;

use rollcall::live::{CameraError, CaptureState, PresenterView};
use rollcall::prelude::*;
use tokio::sync::watch;

const CLASS: ClassId = ClassId(101);
const TEACHER: UserId = UserId(1);

const STUDENTS: [(&str, UserId, bool); 3] = [
    ("ana", UserId(100), true),
    ("ben", UserId(101), true),
    ("eve", UserId(102), false),
];

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// A phone camera aimed at the projector: every frame is whatever the
/// presenter is currently showing.
struct ProjectorCamera {
    screen: watch::Receiver<PresenterView>,
}

impl Camera for ProjectorCamera {
    fn start(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let view = self.screen.borrow();
        Ok(match &view.symbol {
            Some(symbol) => symbol.to_frame(),
            None => Frame::blank(320, 240, 255),
        })
    }

    fn stop(&mut self) {}
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

async fn classroom() -> Result<Arc<LocalApi<StaticAuthenticator>>, RollcallError> {
    let mut auth = StaticAuthenticator::new().with(
        "teacher",
        Identity { user: TEACHER, role: Role::Teacher },
    );
    for (name, user, _) in STUDENTS {
        auth = auth.with(name, Identity { user, role: Role::Student });
    }

    let clock: SharedClock = Arc::new(SystemClock);
    let api = Arc::new(LocalApi::new(
        SessionRegistry::new(RegistryConfig::default(), clock),
        auth,
    ));

    let mut registry = api.registry().lock().await;
    registry.register_class(CLASS, TEACHER);
    for (_, user, enrolled) in STUDENTS {
        if enrolled {
            registry.enroll(CLASS, user)?;
        }
    }
    drop(registry);

    Ok(api)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), RollcallError> {
    rollcall::telemetry::init_with("info,rollcall=debug");

    let api = classroom().await?;
    let teacher = Credential::new("teacher");

    let session = api
        .generate_session(
            &teacher,
            &GenerateSession {
                class_id: CLASS,
                duration_minutes: 1,
                lecture_timing: Some("Monday 9:00 AM - 10:00 AM".into()),
            },
        )
        .await?;
    tracing::info!(session = %session.session_id, "session opened");

    let codec = Arc::new(QrCodec::new());
    let presenter = Presenter::new(Arc::clone(&api), teacher.clone(), CLASS)
        .render_with(codec.clone())
        .spawn();

    let mut screen = presenter.subscribe();
    screen
        .wait_for(|view| view.symbol.is_some())
        .await
        .map_err(|_| rollcall::live::PresenterError::Unavailable(CLASS))?;

    let view = presenter.view().await?;
    println!(
        "projecting {} ({}s left)",
        session.session_id,
        view.snapshot.seconds_left.unwrap_or(0)
    );
    if let (Some(path), Some(symbol)) = (std::env::args().nth(1), &view.symbol) {
        std::fs::write(&path, symbol.to_png()?).map_err(rollcall::ConfigError::Io)?;
        println!("saved symbol to {path}");
    }

    for (name, _, _) in STUDENTS {
        let camera = SharedCamera::new(ProjectorCamera {
            screen: presenter.subscribe(),
        });
        let scanner = CaptureLoop::new(
            camera,
            codec.clone(),
            AttendanceMarker::new(Arc::clone(&api), Credential::new(name)),
        )
        .spawn();

        let mut status = scanner.subscribe();
        scanner.start().await?;
        let settled = tokio::time::timeout(
            Duration::from_secs(10),
            status.wait_for(|s| s.state != CaptureState::Scanning && s.notice.is_some()),
        )
        .await
        .ok()
        .and_then(|seen| seen.ok().and_then(|s| s.notice.clone()));

        match settled {
            Some(notice) => println!("{name:>4}: [{:?}] {}", notice.severity, notice.message),
            None => println!("{name:>4}: no symbol found"),
        }

        if name == "ana" {
            let again = scanner.simulate(session.payload.clone()).await;
            let notice = match again {
                Ok(receipt) => Notice::from_result(&Ok(receipt)),
                Err(rollcall::live::CaptureError::Mark(err)) => Notice::from_error(&err),
                Err(other) => return Err(other.into()),
            };
            println!("{name:>4}: [{:?}] {} (second scan)", notice.severity, notice.message);
        }

        scanner.shutdown().await?;
    }

    let history = api.attendance_history(&teacher, CLASS).await?;
    println!("\nattendance for {CLASS}:");
    for record in &history {
        println!("  {} {:?} at {}", record.student, record.status, record.marked_at_ms);
    }

    presenter.shutdown().await?;
    Ok(())
}
