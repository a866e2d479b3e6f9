//! Every phase of a jump lives behind this module, and a phase can only be
//! left through the methods below:
//! - PUBLIC  : JumpState and JumpContext are public
//! - PRIVATE : their fields are private, so no phase is built by hand
//!
//! The typestate makes "ascending with a peak timestamp" unrepresentable:
//! only `JumpState<PeakHold>` carries a timestamp.

use crate::jump::{Ascending, Descending, Grounded, PeakHold};

pub enum IsAscending {
    Done(JumpState<PeakHold>),
    InProgress(JumpState<Ascending>),
}

pub enum IsHolding {
    Done(JumpState<Descending>),
    InProgress(JumpState<PeakHold>),
}

pub enum IsDescending {
    Done(JumpState<Grounded>),
    InProgress(JumpState<Descending>),
}

#[derive(Debug, Copy, Clone, PartialEq)]
/// Shared data for every phase
/// - offset : vertical display offset, negative = up
/// - height, hold_ms : jump shape, fixed for the session
pub struct JumpContext {
    offset: i32,
    height: i32,
    hold_ms: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct JumpState<S> {
    context: JumpContext,
    phase: S,
}

impl<S> JumpState<S> {
    pub fn context(&self) -> &JumpContext {
        &self.context
    }
}

impl JumpState<Grounded> {
    pub fn new(height: i32, hold_ms: f64) -> Self {
        JumpState {
            context: JumpContext {
                offset: 0,
                height,
                hold_ms,
            },
            phase: Grounded,
        }
    }

    pub fn jump(self) -> JumpState<Ascending> {
        JumpState {
            context: self.context.on_state_transition(),
            phase: Ascending,
        }
    }
}

impl JumpState<Ascending> {
    pub fn update(mut self, now: f64) -> IsAscending {
        self.context = self.context.rise();
        if self.context.offset <= -self.context.height {
            IsAscending::Done(self.hold(now))
        } else {
            IsAscending::InProgress(self)
        }
    }

    fn hold(self, now: f64) -> JumpState<PeakHold> {
        JumpState {
            context: self.context.at_peak(),
            phase: PeakHold { since: now },
        }
    }
}

impl JumpState<PeakHold> {
    /// Timestamp captured when the peak was reached
    pub fn since(&self) -> f64 {
        self.phase.since
    }

    /// Holds while `now - since <= hold_ms`, measured on the wall clock
    pub fn update(self, now: f64) -> IsHolding {
        if now - self.phase.since > self.context.hold_ms {
            IsHolding::Done(self.release())
        } else {
            IsHolding::InProgress(self)
        }
    }

    fn release(self) -> JumpState<Descending> {
        JumpState {
            context: self.context,
            phase: Descending,
        }
    }
}

impl JumpState<Descending> {
    pub fn update(mut self) -> IsDescending {
        self.context = self.context.fall();
        if self.context.offset >= 0 {
            IsDescending::Done(self.land())
        } else {
            IsDescending::InProgress(self)
        }
    }

    fn land(self) -> JumpState<Grounded> {
        JumpState {
            context: self.context.on_state_transition(),
            phase: Grounded,
        }
    }
}

impl JumpContext {
    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// back to the ground line, on jump start and on landing
    fn on_state_transition(mut self) -> Self {
        self.offset = 0;
        self
    }

    fn rise(mut self) -> Self {
        self.offset = (self.offset - 1).max(-self.height);
        self
    }

    fn at_peak(mut self) -> Self {
        self.offset = -self.height;
        self
    }

    fn fall(mut self) -> Self {
        self.offset = (self.offset + 1).min(0);
        self
    }
}
