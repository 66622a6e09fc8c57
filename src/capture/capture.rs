use super::countdown::Countdown;
use crate::domain_model::CODE_LEN;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CapturePhase {
    /// 0-6 digits filled, inputs live.
    Collecting,
    /// Request in flight, inputs disabled.
    Verifying,
    Accepted,
    /// Attempt budget exhausted; only resend is offered.
    Locked,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RejectReason {
    Mismatch,
    Expired,
    NotFound,
    AttemptsExhausted,
    /// Transient fault (transport, store); retry input is allowed.
    Other,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum VerifyOutcome {
    Accepted,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CaptureEvent {
    Digit(char),
    Backspace,
    Submit,
    Resend,
    /// One-second countdown tick.
    Tick,
    /// A (re)issuance succeeded; the cooldown rearms.
    Issued,
    /// A (re)issuance failed; no cooldown starts, resend stays offered.
    IssueFailed,
    Outcome(VerifyOutcome),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CaptureEffect {
    None,
    /// All six cells filled; the composed code goes to the endpoint.
    SubmitCode(String),
    RequestResend,
}

/// Six-cell code capture. Pure transitions; the async session drives it.
#[derive(Debug, Clone)]
pub struct CaptureForm {
    cells: [Option<char>; CODE_LEN],
    focus: usize,
    phase: CapturePhase,
    countdown: Countdown,
}

impl CaptureForm {
    pub fn new() -> Self {
        CaptureForm {
            cells: [None; CODE_LEN],
            focus: 0,
            phase: CapturePhase::Collecting,
            countdown: Countdown::new(),
        }
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn cells(&self) -> &[Option<char>; CODE_LEN] {
        &self.cells
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.countdown.remaining()
    }

    pub fn inputs_enabled(&self) -> bool {
        self.phase == CapturePhase::Collecting
    }

    pub fn submit_enabled(&self) -> bool {
        self.phase == CapturePhase::Collecting && self.code().is_some()
    }

    pub fn resend_available(&self) -> bool {
        self.countdown.finished()
            && !matches!(self.phase, CapturePhase::Verifying | CapturePhase::Accepted)
    }

    /// The composed code, once every cell is filled.
    pub fn code(&self) -> Option<String> {
        self.cells.iter().copied().collect()
    }

    pub fn apply(&mut self, event: CaptureEvent) -> CaptureEffect {
        match event {
            CaptureEvent::Digit(c) => self.on_digit(c),
            CaptureEvent::Backspace => self.on_backspace(),
            CaptureEvent::Submit => self.on_submit(),
            CaptureEvent::Resend => self.on_resend(),
            CaptureEvent::Tick => {
                self.countdown.tick();
                CaptureEffect::None
            }
            CaptureEvent::Issued => {
                self.countdown.restart();
                CaptureEffect::None
            }
            CaptureEvent::IssueFailed => CaptureEffect::None,
            CaptureEvent::Outcome(outcome) => self.on_outcome(outcome),
        }
    }

    fn on_digit(&mut self, c: char) -> CaptureEffect {
        if !c.is_ascii_digit() || !self.inputs_enabled() {
            return CaptureEffect::None;
        }
        self.cells[self.focus] = Some(c);
        if self.focus + 1 < CODE_LEN {
            self.focus += 1;
        }
        self.auto_submit()
    }

    fn on_backspace(&mut self) -> CaptureEffect {
        if !self.inputs_enabled() {
            return CaptureEffect::None;
        }
        if self.cells[self.focus].is_some() {
            self.cells[self.focus] = None;
        } else if self.focus > 0 {
            self.focus -= 1;
        }
        CaptureEffect::None
    }

    fn on_submit(&mut self) -> CaptureEffect {
        if !self.submit_enabled() {
            return CaptureEffect::None;
        }
        self.auto_submit()
    }

    fn on_resend(&mut self) -> CaptureEffect {
        if !self.resend_available() {
            return CaptureEffect::None;
        }
        self.clear_cells();
        self.phase = CapturePhase::Collecting;
        CaptureEffect::RequestResend
    }

    fn on_outcome(&mut self, outcome: VerifyOutcome) -> CaptureEffect {
        if self.phase != CapturePhase::Verifying {
            return CaptureEffect::None;
        }
        match outcome {
            VerifyOutcome::Accepted => self.phase = CapturePhase::Accepted,
            VerifyOutcome::Rejected(RejectReason::AttemptsExhausted) => {
                self.phase = CapturePhase::Locked;
            }
            VerifyOutcome::Rejected(_) => {
                self.clear_cells();
                self.phase = CapturePhase::Collecting;
            }
        }
        CaptureEffect::None
    }

    fn auto_submit(&mut self) -> CaptureEffect {
        match self.code() {
            Some(code) => {
                self.phase = CapturePhase::Verifying;
                CaptureEffect::SubmitCode(code)
            }
            None => CaptureEffect::None,
        }
    }

    fn clear_cells(&mut self) {
        self.cells = [None; CODE_LEN];
        self.focus = 0;
    }
}

impl Default for CaptureForm {
    fn default() -> Self {
        Self::new()
    }
}
