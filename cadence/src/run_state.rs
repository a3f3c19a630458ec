//! Run-state labels gating command eligibility

use serde::{Deserialize, Serialize};

/// Phase of the host application for the current cycle
///
/// The scheduler never interprets these beyond set membership; the host
/// decides which one is current and passes it to every `poll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    Init,
    InitLoop,
    Start,
    #[default]
    Loop,
    Stop,
}

impl RunState {
    /// Every run state, in host phase order
    pub const ALL: [RunState; 5] = [Self::Init, Self::InitLoop, Self::Start, Self::Loop, Self::Stop];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::InitLoop => write!(f, "init-loop"),
            Self::Start => write!(f, "start"),
            Self::Loop => write!(f, "loop"),
            Self::Stop => write!(f, "stop"),
        }
    }
}

impl std::str::FromStr for RunState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "init" => Ok(Self::Init),
            "init-loop" => Ok(Self::InitLoop),
            "start" => Ok(Self::Start),
            "loop" => Ok(Self::Loop),
            "stop" => Ok(Self::Stop),
            _ => Err(format!("Unknown run state: {}", s)),
        }
    }
}

/// Set of run states a command may run in
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RunStates(u8);

impl RunStates {
    /// The empty set
    pub const fn none() -> Self {
        Self(0)
    }

    /// Every run state
    pub fn all() -> Self {
        RunState::ALL.into_iter().collect()
    }

    /// A single run state
    pub fn only(state: RunState) -> Self {
        Self(state.bit())
    }

    /// Active phase only, the default for commands
    pub fn loop_only() -> Self {
        Self::only(RunState::Loop)
    }

    /// Both polled phases: pre-start init loop and the active loop
    pub fn polled() -> Self {
        Self::only(RunState::InitLoop).with(RunState::Loop)
    }

    pub fn with(self, state: RunState) -> Self {
        Self(self.0 | state.bit())
    }

    pub fn contains(&self, state: RunState) -> bool {
        self.0 & state.bit() != 0
    }

    pub fn intersection(&self, other: RunStates) -> RunStates {
        Self(self.0 & other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = RunState> + '_ {
        RunState::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

impl FromIterator<RunState> for RunStates {
    fn from_iter<I: IntoIterator<Item = RunState>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), RunStates::with)
    }
}

impl std::fmt::Debug for RunStates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
