use self::state::{IsAscending, IsDescending, IsHolding, JumpContext, JumpState};
use crate::config::Config;

pub mod state;

/// ┌──────────────── Jump Transition Flow ─────────────────────┐
/// │  From State  →  Event   →  To State                       │
/// ├───────────────────────────────────────────────────────────┤
/// │  Grounded    →  Jump    →  Ascending (offset = 0)         │
/// │  -------        ------                                    │
/// │  Ascending   →  Update  →  PeakHold (offset = -height)    │
/// │  PeakHold    →  Update  →  Descending (hold_ms elapsed)   │
/// │  Descending  →  Update  →  Grounded (offset = 0)          │
/// └───────────────────────────────────────────────────────────┘
/// Ascent and descent move one unit per tick; the hold at the peak is timed
/// on the wall clock, so it lasts the same whatever the frame rate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Event {
    Jump,
    Update { now: f64 },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Grounded;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ascending;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PeakHold {
    since: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Descending;

/// Data-free view of the current phase, for callers that only inspect
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Grounded,
    Ascending,
    PeakHold,
    Descending,
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum JumpStateMachine {
    Grounded(JumpState<Grounded>),
    Ascending(JumpState<Ascending>),
    PeakHold(JumpState<PeakHold>),
    Descending(JumpState<Descending>),
}

impl From<JumpState<Grounded>> for JumpStateMachine {
    fn from(state: JumpState<Grounded>) -> Self {
        JumpStateMachine::Grounded(state)
    }
}

impl From<JumpState<Ascending>> for JumpStateMachine {
    fn from(state: JumpState<Ascending>) -> Self {
        JumpStateMachine::Ascending(state)
    }
}

impl From<JumpState<PeakHold>> for JumpStateMachine {
    fn from(state: JumpState<PeakHold>) -> Self {
        JumpStateMachine::PeakHold(state)
    }
}

impl From<JumpState<Descending>> for JumpStateMachine {
    fn from(state: JumpState<Descending>) -> Self {
        JumpStateMachine::Descending(state)
    }
}

impl From<IsAscending> for JumpStateMachine {
    fn from(is_ascending: IsAscending) -> Self {
        match is_ascending {
            IsAscending::Done(peak_state) => peak_state.into(),
            IsAscending::InProgress(ascending_state) => ascending_state.into(),
        }
    }
}

impl From<IsDescending> for JumpStateMachine {
    fn from(is_descending: IsDescending) -> Self {
        match is_descending {
            IsDescending::Done(grounded_state) => grounded_state.into(),
            IsDescending::InProgress(descending_state) => descending_state.into(),
        }
    }
}

impl JumpStateMachine {
    fn transition(self, event: Event) -> Self {
        use JumpStateMachine::*;
        match (self, event) {
            (Grounded(state), Event::Jump) => state.jump().into(),
            (Grounded(_), Event::Update { .. }) => self,
            (Ascending(state), Event::Update { now }) => state.update(now).into(),
            (PeakHold(state), Event::Update { now }) => match state.update(now) {
                // the releasing tick already moves one unit down
                IsHolding::Done(descending_state) => descending_state.update().into(),
                IsHolding::InProgress(peak_state) => peak_state.into(),
            },
            (Descending(state), Event::Update { .. }) => state.update().into(),
            // at most one jump at a time
            (_, Event::Jump) => self,
        }
    }

    fn context(&self) -> &JumpContext {
        use JumpStateMachine::*;
        match self {
            Grounded(state) => state.context(),
            Ascending(state) => state.context(),
            PeakHold(state) => state.context(),
            Descending(state) => state.context(),
        }
    }

    fn phase(&self) -> Phase {
        match self {
            JumpStateMachine::Grounded(_) => Phase::Grounded,
            JumpStateMachine::Ascending(_) => Phase::Ascending,
            JumpStateMachine::PeakHold(_) => Phase::PeakHold,
            JumpStateMachine::Descending(_) => Phase::Descending,
        }
    }
}

/// Vertical jump of the character
/// - trigger() -> JumpStateMachine::transition(Event::Jump)
/// - update()  -> JumpStateMachine::transition(Event::Update)
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Jump {
    state: JumpStateMachine,
}

impl Jump {
    pub fn new(height: i32, hold_ms: f64) -> Self {
        Jump {
            state: JumpStateMachine::Grounded(JumpState::new(height, hold_ms)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.jump_height(), config.hold_ms)
    }

    /// Starts a jump if grounded. Returns false when the trigger was ignored
    /// because a jump is already in progress.
    pub fn trigger(&mut self) -> bool {
        let accepted = self.is_grounded();
        self.state = self.state.transition(Event::Jump);
        accepted
    }

    pub fn update(&mut self, now: f64) {
        self.state = self.state.transition(Event::Update { now });
    }

    /// Vertical display offset, within [-height, 0]
    pub fn offset(&self) -> i32 {
        self.state.context().offset()
    }

    pub fn height(&self) -> i32 {
        self.state.context().height()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn is_grounded(&self) -> bool {
        self.phase() == Phase::Grounded
    }

    /// When the peak was reached, while holding there
    pub fn peak_since(&self) -> Option<f64> {
        match &self.state {
            JumpStateMachine::PeakHold(state) => Some(state.since()),
            _ => None,
        }
    }
}
