//! Build run state machine
//!
//! The orchestrator walks the pipeline steps strictly in order and ends in
//! exactly one of two terminal states.

use std::fmt;

use argo_core::domain::build_run::BuildRunStatus;
use tracing::{info, warn};

/// Pipeline step a build run is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Started,
    FetchingRun,
    FetchingConfig,
    FetchingSecrets,
    FetchingRegistryAccess,
    AuthenticatingRegistry,
    Building,
    Completed,
    Failed,
}

impl BuildState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildState::Completed | BuildState::Failed)
    }

    /// The step that follows on success, `None` once terminal
    pub fn next(&self) -> Option<BuildState> {
        use BuildState::*;

        match self {
            Started => Some(FetchingRun),
            FetchingRun => Some(FetchingConfig),
            FetchingConfig => Some(FetchingSecrets),
            FetchingSecrets => Some(FetchingRegistryAccess),
            FetchingRegistryAccess => Some(AuthenticatingRegistry),
            AuthenticatingRegistry => Some(Building),
            Building => Some(Completed),
            Completed | Failed => None,
        }
    }

    /// Valid moves: one step forward, or to `Failed` from any non-terminal state
    pub fn can_transition_to(&self, target: BuildState) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == BuildState::Failed || self.next() == Some(target)
    }

    /// Status reported to the control plane for this state
    pub fn run_status(&self) -> BuildRunStatus {
        match self {
            BuildState::Completed => BuildRunStatus::Completed,
            BuildState::Failed => BuildRunStatus::Failed,
            _ => BuildRunStatus::Running,
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildState::Started => "started",
            BuildState::FetchingRun => "fetching run",
            BuildState::FetchingConfig => "fetching config",
            BuildState::FetchingSecrets => "fetching secrets",
            BuildState::FetchingRegistryAccess => "fetching registry access",
            BuildState::AuthenticatingRegistry => "authenticating registry",
            BuildState::Building => "building",
            BuildState::Completed => "completed",
            BuildState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Current state plus the path taken to reach it
#[derive(Debug, Clone)]
pub struct StateMachine {
    current: BuildState,
    history: Vec<BuildState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: BuildState::Started,
            history: vec![BuildState::Started],
        }
    }

    pub fn current(&self) -> BuildState {
        self.current
    }

    /// Every state visited so far, starting with `Started`
    pub fn history(&self) -> &[BuildState] {
        &self.history
    }

    /// Moves to `target`
    ///
    /// An unexpected move is logged and still applied, so a run can never get
    /// stuck short of a terminal state.
    pub fn transition(&mut self, target: BuildState) {
        if !self.current.can_transition_to(target) {
            warn!(
                "Unexpected build state transition: {} -> {}",
                self.current, target
            );
        }

        info!("Build state: {} -> {}", self.current, target);
        self.current = target;
        self.history.push(target);
    }
}
