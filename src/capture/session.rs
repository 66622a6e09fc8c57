use super::capture::{
    CaptureEffect, CaptureEvent, CaptureForm, CapturePhase, RejectReason, VerifyOutcome,
};
use crate::application_port::{IssueInput, VerificationError, VerificationService, VerifyInput};
use crate::domain_model::CODE_LEN;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Render-ready view of the form, published after every event.
#[derive(Debug, Clone)]
pub struct CaptureSnapshot {
    pub phase: CapturePhase,
    pub cells: [Option<char>; CODE_LEN],
    pub focus: usize,
    pub countdown_remaining: u32,
    pub resend_available: bool,
    pub submit_enabled: bool,
    pub inputs_enabled: bool,
}

impl CaptureSnapshot {
    fn of(form: &CaptureForm) -> Self {
        CaptureSnapshot {
            phase: form.phase(),
            cells: *form.cells(),
            focus: form.focus(),
            countdown_remaining: form.countdown_remaining(),
            resend_available: form.resend_available(),
            submit_enabled: form.submit_enabled(),
            inputs_enabled: form.inputs_enabled(),
        }
    }
}

/// One user's capture flow: multiplexes UI events and the 1 Hz tick in a
/// single task, keeps at most one verify in flight, and dies on cancel.
pub struct CaptureSession {
    email: String,
    service: Arc<dyn VerificationService>,
    cancel: CancellationToken,
    form: CaptureForm,
    snapshots: watch::Sender<CaptureSnapshot>,
}

impl CaptureSession {
    pub fn new(
        email: String,
        service: Arc<dyn VerificationService>,
        cancel: CancellationToken,
    ) -> (Self, watch::Receiver<CaptureSnapshot>) {
        let form = CaptureForm::new();
        let (snapshots, receiver) = watch::channel(CaptureSnapshot::of(&form));
        (
            Self {
                email,
                service,
                cancel,
                form,
                snapshots,
            },
            receiver,
        )
    }

    pub async fn run(mut self, mut inputs: mpsc::Receiver<CaptureEvent>) {
        self.request_issuance().await;

        // First tick one second from now, not immediately.
        let period = Duration::from_secs(1);
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // The form enters Verifying on submit, so at most one verify task is
        // ever feeding this channel.
        let (outcome_tx, mut outcomes) = mpsc::channel::<Result<(), VerificationError>>(1);
        let cancel = self.cancel.clone();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    // An abandoned verify keeps running to completion; the
                    // store settles its fate without us.
                    break;
                }
                Some(result) = outcomes.recv() => {
                    let outcome = match result {
                        Ok(()) => VerifyOutcome::Accepted,
                        Err(err) => VerifyOutcome::Rejected(reject_reason(&err)),
                    };
                    let effect = self.apply(CaptureEvent::Outcome(outcome));
                    self.run_effect(effect, &outcome_tx).await;
                }
                _ = ticker.tick() => {
                    self.apply(CaptureEvent::Tick);
                }
                maybe_event = inputs.recv() => {
                    let Some(event) = maybe_event else { break };
                    let effect = self.apply(event);
                    self.run_effect(effect, &outcome_tx).await;
                }
            }
        }
    }

    fn apply(&mut self, event: CaptureEvent) -> CaptureEffect {
        let effect = self.form.apply(event);
        let _ = self.snapshots.send(CaptureSnapshot::of(&self.form));
        effect
    }

    async fn run_effect(
        &mut self,
        effect: CaptureEffect,
        outcome_tx: &mpsc::Sender<Result<(), VerificationError>>,
    ) {
        match effect {
            CaptureEffect::None => {}
            CaptureEffect::SubmitCode(code) => {
                let service = self.service.clone();
                let email = self.email.clone();
                let outcome_tx = outcome_tx.clone();
                tokio::spawn(async move {
                    let result = service.verify(VerifyInput { email, code }).await;
                    // The session may be gone by now; that is fine.
                    let _ = outcome_tx.send(result).await;
                });
            }
            CaptureEffect::RequestResend => {
                self.request_issuance().await;
            }
        }
    }

    async fn request_issuance(&mut self) {
        let input = IssueInput {
            email: self.email.clone(),
        };
        match self.service.request_code(input).await {
            Ok(_) => {
                self.apply(CaptureEvent::Issued);
            }
            Err(err) => {
                // No countdown starts; the user is not told to check email.
                warn!(email = %self.email, error = %err, "issuance failed");
                self.apply(CaptureEvent::IssueFailed);
            }
        }
    }
}

fn reject_reason(err: &VerificationError) -> RejectReason {
    match err {
        VerificationError::Mismatch { .. } => RejectReason::Mismatch,
        VerificationError::Expired => RejectReason::Expired,
        VerificationError::NotFound => RejectReason::NotFound,
        VerificationError::AttemptsExhausted => RejectReason::AttemptsExhausted,
        _ => RejectReason::Other,
    }
}
