use crate::error::EmbedError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Scheduled,
    ScriptLoading,
    Constructing,
    Ready,
    Failed,
}

impl LoadPhase {
    pub fn name(self) -> &'static str {
        match self {
            LoadPhase::Idle => "idle",
            LoadPhase::Scheduled => "scheduled",
            LoadPhase::ScriptLoading => "script_loading",
            LoadPhase::Constructing => "constructing",
            LoadPhase::Ready => "ready",
            LoadPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LoadPhase::Ready | LoadPhase::Failed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadStatus {
    pub loading: bool,
    pub error: Option<EmbedError>,
}

/// Load state of one mount. Every transition goes through a method that
/// returns `false` when the current phase does not allow it, so a repeated
/// trigger can never start a second load.
#[derive(Debug)]
pub struct Lifecycle<I> {
    phase: LoadPhase,
    instance: Option<I>,
    error: Option<EmbedError>,
}

impl<I> Default for Lifecycle<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> Lifecycle<I> {
    pub fn new() -> Self {
        Self {
            phase: LoadPhase::Idle,
            instance: None,
            error: None,
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn instance(&self) -> Option<&I> {
        self.instance.as_ref()
    }

    pub fn error(&self) -> Option<&EmbedError> {
        self.error.as_ref()
    }

    pub fn status(&self) -> LoadStatus {
        LoadStatus {
            loading: !self.phase.is_terminal(),
            error: self.error.clone(),
        }
    }

    pub fn schedule(&mut self) -> bool {
        self.advance(LoadPhase::Idle, LoadPhase::Scheduled)
    }

    pub fn begin_script(&mut self) -> bool {
        self.advance(LoadPhase::Scheduled, LoadPhase::ScriptLoading)
    }

    pub fn begin_construct(&mut self) -> bool {
        self.advance(LoadPhase::ScriptLoading, LoadPhase::Constructing)
    }

    pub fn ready(&mut self, instance: I) -> bool {
        if !self.advance(LoadPhase::Constructing, LoadPhase::Ready) {
            return false;
        }
        self.instance = Some(instance);
        true
    }

    /// Records the first failure of an in-flight load. Ignored once terminal
    /// or before anything was scheduled.
    pub fn fail(&mut self, error: EmbedError) -> bool {
        match self.phase {
            LoadPhase::Scheduled | LoadPhase::ScriptLoading | LoadPhase::Constructing => {
                self.phase = LoadPhase::Failed;
                self.error = Some(error);
                true
            }
            LoadPhase::Idle | LoadPhase::Ready | LoadPhase::Failed => false,
        }
    }

    pub fn reset(&mut self) -> Option<I> {
        self.phase = LoadPhase::Idle;
        self.error = None;
        self.instance.take()
    }

    fn advance(&mut self, from: LoadPhase, to: LoadPhase) -> bool {
        if self.phase != from {
            return false;
        }
        self.phase = to;
        true
    }
}
