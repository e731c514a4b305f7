use std::{fmt, str::FromStr};

use crate::{
    core::ElementId,
    error::{RevealError, RevealResult},
    render::RenderLayer,
    timeline::{Direction, Timeline},
    tracker::{EdgeEvent, TriggerBand, TriggerHandle, ViewportTracker},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Idle,
    Entering,
    Entered,
    Exiting,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Entering => "entering",
            Self::Entered => "entered",
            Self::Exiting => "exiting",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleAction {
    Play,
    Pause,
    Resume,
    Reverse,
    Restart,
    Reset,
    Complete,
    None,
}

impl FromStr for ToggleAction {
    type Err = RevealError;

    fn from_str(s: &str) -> RevealResult<Self> {
        Ok(match s {
            "play" => Self::Play,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "reverse" => Self::Reverse,
            "restart" => Self::Restart,
            "reset" => Self::Reset,
            "complete" => Self::Complete,
            "none" => Self::None,
            other => {
                return Err(RevealError::validation(format!(
                    "unknown toggle action '{other}'"
                )));
            }
        })
    }
}

impl fmt::Display for ToggleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Reverse => "reverse",
            Self::Restart => "restart",
            Self::Reset => "reset",
            Self::Complete => "complete",
            Self::None => "none",
        })
    }
}

/// What a controller does on each edge event, written in the usual four-word
/// form ordered enter-down, leave-down, enter-up, leave-up: `"play none none reverse"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TogglePolicy {
    pub on_enter: ToggleAction,
    pub on_leave: ToggleAction,
    pub on_enter_back: ToggleAction,
    pub on_leave_back: ToggleAction,
}

impl TogglePolicy {
    /// Plays once and never reverses.
    pub fn once() -> Self {
        Self {
            on_enter: ToggleAction::Play,
            on_leave: ToggleAction::None,
            on_enter_back: ToggleAction::None,
            on_leave_back: ToggleAction::None,
        }
    }

    pub fn action_for(&self, event: EdgeEvent) -> ToggleAction {
        match event {
            EdgeEvent::EnteredGoingDown => self.on_enter,
            EdgeEvent::LeftGoingDown => self.on_leave,
            EdgeEvent::EnteredGoingUp => self.on_enter_back,
            EdgeEvent::LeftGoingUp => self.on_leave_back,
        }
    }
}

impl Default for TogglePolicy {
    /// Play on enter going down, reverse on leave going up.
    fn default() -> Self {
        Self {
            on_leave_back: ToggleAction::Reverse,
            ..Self::once()
        }
    }
}

impl FromStr for TogglePolicy {
    type Err = RevealError;

    fn from_str(s: &str) -> RevealResult<Self> {
        let actions = s
            .split_whitespace()
            .map(str::parse)
            .collect::<RevealResult<Vec<ToggleAction>>>()?;
        let [on_enter, on_leave, on_enter_back, on_leave_back] = actions[..] else {
            return Err(RevealError::validation(format!(
                "toggle policy '{s}' must name exactly four actions"
            )));
        };
        Ok(Self {
            on_enter,
            on_leave,
            on_enter_back,
            on_leave_back,
        })
    }
}

impl TryFrom<String> for TogglePolicy {
    type Error = RevealError;

    fn try_from(s: String) -> RevealResult<Self> {
        s.parse()
    }
}

impl From<TogglePolicy> for String {
    fn from(p: TogglePolicy) -> Self {
        p.to_string()
    }
}

impl fmt::Display for TogglePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.on_enter, self.on_leave, self.on_enter_back, self.on_leave_back
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Transition {
    pub from: ControllerState,
    pub to: ControllerState,
}

/// Drives one section's timeline from its trigger's edge events.
///
/// A disposed controller ignores every call; disposal halts the timeline and
/// releases the trigger before returning.
pub struct SectionController {
    name: String,
    state: ControllerState,
    timeline: Timeline,
    policy: TogglePolicy,
    trigger: Option<TriggerHandle>,
    needs_apply: bool,
    live: bool,
}

impl SectionController {
    /// Validates every target and renders the timeline's start values.
    ///
    /// Nothing is created when a target is missing.
    pub fn new(
        name: impl Into<String>,
        timeline: Timeline,
        policy: TogglePolicy,
        layer: &mut dyn RenderLayer,
    ) -> RevealResult<Self> {
        let name = name.into();
        if timeline.is_empty() {
            return Err(RevealError::timeline(format!(
                "section '{name}' has an empty timeline"
            )));
        }
        timeline.validate_targets(&*layer)?;

        let mut timeline = timeline;
        timeline.seek(0.0);
        timeline.apply(layer);

        Ok(Self {
            name,
            state: ControllerState::Idle,
            timeline,
            policy,
            trigger: None,
            needs_apply: false,
            live: true,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn policy(&self) -> TogglePolicy {
        self.policy
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn trigger(&self) -> Option<TriggerHandle> {
        self.trigger
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Registers the trigger for `region`, disposing any previous one first.
    pub fn bind(
        &mut self,
        tracker: &mut ViewportTracker,
        region: ElementId,
        band: TriggerBand,
        layer: &dyn RenderLayer,
    ) -> RevealResult<TriggerHandle> {
        if !self.live {
            return Err(RevealError::validation(format!(
                "section '{}' is disposed",
                self.name
            )));
        }
        if let Some(previous) = self.trigger.take() {
            tracker.unregister(previous);
        }
        let handle = tracker.register(region, band, layer)?;
        self.trigger = Some(handle);
        Ok(handle)
    }

    /// Maps an edge event through the toggle policy.
    pub fn handle(&mut self, event: EdgeEvent) -> Option<Transition> {
        if !self.live {
            return None;
        }
        let action = self.policy.action_for(event);
        tracing::debug!(section = %self.name, %event, %action, state = %self.state, "edge event");
        self.perform(action)
    }

    /// Applies `action` directly. Interrupting an in-flight animation redirects it
    /// from its current value.
    pub fn perform(&mut self, action: ToggleAction) -> Option<Transition> {
        if !self.live {
            return None;
        }
        use ControllerState::*;

        let from = self.state;
        let to = match action {
            ToggleAction::Play => match from {
                Idle | Exiting => {
                    if self.timeline.play() {
                        Entering
                    } else {
                        Entered
                    }
                }
                Entering => {
                    self.timeline.play();
                    Entering
                }
                Entered => Entered,
            },
            ToggleAction::Reverse => match from {
                Entering | Entered => {
                    if self.timeline.reverse() {
                        Exiting
                    } else {
                        Idle
                    }
                }
                Exiting => {
                    self.timeline.reverse();
                    Exiting
                }
                Idle => Idle,
            },
            ToggleAction::Restart => {
                self.timeline.seek(0.0);
                self.needs_apply = true;
                if self.timeline.play() {
                    Entering
                } else {
                    Entered
                }
            }
            ToggleAction::Reset => {
                self.timeline.halt();
                self.timeline.seek(0.0);
                self.needs_apply = true;
                Idle
            }
            ToggleAction::Complete => {
                self.timeline.halt();
                self.timeline.seek(self.timeline.duration());
                self.needs_apply = true;
                Entered
            }
            ToggleAction::Pause => {
                self.timeline.pause();
                from
            }
            ToggleAction::Resume => {
                self.timeline.resume();
                from
            }
            ToggleAction::None => from,
        };

        self.transition_to(to)
    }

    fn transition_to(&mut self, to: ControllerState) -> Option<Transition> {
        let from = self.state;
        if from == to {
            return None;
        }
        self.state = to;
        tracing::debug!(section = %self.name, %from, %to, "section transition");
        Some(Transition { from, to })
    }

    /// Advances playback by `dt` seconds, writes the new values and settles
    /// `Entering`/`Exiting` once the timeline reaches its bound.
    pub fn tick(&mut self, dt: f64, layer: &mut dyn RenderLayer) -> Option<Transition> {
        if !self.live {
            return None;
        }
        if !self.timeline.is_playing() {
            if std::mem::take(&mut self.needs_apply) {
                self.timeline.apply(layer);
            }
            return None;
        }

        let finished = self.timeline.advance(dt);
        self.timeline.apply(layer);
        self.needs_apply = false;
        tracing::trace!(section = %self.name, playhead = self.timeline.playhead(), "section tick");

        match (finished, self.state) {
            (Some(Direction::Forward), ControllerState::Entering) => {
                self.transition_to(ControllerState::Entered)
            }
            (Some(Direction::Backward), ControllerState::Exiting) => {
                self.transition_to(ControllerState::Idle)
            }
            _ => None,
        }
    }

    /// Halts playback and releases the trigger. Returns `false` if already disposed.
    pub fn dispose(&mut self, tracker: &mut ViewportTracker) -> bool {
        if !self.live {
            return false;
        }
        self.live = false;
        self.timeline.halt();
        self.needs_apply = false;
        if let Some(handle) = self.trigger.take() {
            tracker.unregister(handle);
        }
        tracing::debug!(section = %self.name, state = %self.state, "section disposed");
        true
    }
}
