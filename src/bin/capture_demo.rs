//! Drives the capture state machine against the fake verification backend.
//! The fake accepts 123456 and rejects everything else, so the full
//! collect -> verify -> reject -> retry -> accept loop can be watched here.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use usher::application_impl::FakeVerificationService;
use usher::capture::*;

fn render(snapshot: &CaptureSnapshot) -> String {
    let cells: String = snapshot.cells.iter().map(|c| c.unwrap_or('_')).collect();
    format!(
        "[{}] phase={:?} countdown={} resend_available={}",
        cells, snapshot.phase, snapshot.countdown_remaining, snapshot.resend_available
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let (session, mut snapshots) = CaptureSession::new(
        "demo@example.com".to_string(),
        Arc::new(FakeVerificationService::new()),
        cancel.clone(),
    );
    let (events, inputs) = mpsc::channel(16);
    let handle = tokio::spawn(session.run(inputs));

    println!("fresh session:");
    println!("  {}", render(&snapshots.borrow().clone()));

    println!("typing a wrong code (111111):");
    for c in "11111".chars() {
        events.send(CaptureEvent::Digit(c)).await?;
    }
    snapshots.wait_for(|s| s.cells[4].is_some()).await?;
    println!("  {}", render(&snapshots.borrow().clone()));
    events.send(CaptureEvent::Digit('1')).await?;
    let rejected = snapshots
        .wait_for(|s| s.phase == CapturePhase::Collecting && s.cells.iter().all(|c| c.is_none()))
        .await?
        .clone();
    println!("  rejected, cells cleared: {}", render(&rejected));

    println!("typing the correct code (123456):");
    for c in "123456".chars() {
        events.send(CaptureEvent::Digit(c)).await?;
    }
    let accepted = snapshots
        .wait_for(|s| s.phase == CapturePhase::Accepted)
        .await?
        .clone();
    println!("  {}", render(&accepted));

    cancel.cancel();
    handle.await?;
    println!("session torn down");
    Ok(())
}
