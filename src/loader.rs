use crate::{
    anim::Step,
    core::{ElementId, Property, props},
    ease::Ease,
    error::{RevealError, RevealResult},
    render::RenderLayer,
    timeline::{Direction, Position, Timeline},
};

pub const DEFAULT_LOAD_DURATION: f64 = 2.0;
pub const FADE_DURATION: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderPhase {
    Filling,
    FadingOut,
    Done,
}

/// What one loader tick produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoaderUpdate {
    /// New progress percentage, only when it increased.
    pub progress: Option<u8>,
    pub completed: bool,
}

/// Fills a 0..=100 progress value over a fixed duration, then fades the loading
/// container out and fires the completion callback exactly once.
pub struct LoadingDriver {
    duration: f64,
    elapsed: f64,
    progress: u8,
    phase: LoaderPhase,
    fade: Timeline,
    on_complete: Option<Box<dyn FnOnce()>>,
}

impl std::fmt::Debug for LoadingDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingDriver")
            .field("duration", &self.duration)
            .field("elapsed", &self.elapsed)
            .field("progress", &self.progress)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl LoadingDriver {
    pub fn new(duration: f64, container: ElementId, layer: &dyn RenderLayer) -> RevealResult<Self> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(RevealError::validation(format!(
                "loader duration must be finite and > 0, got {duration}"
            )));
        }
        let mut fade = Timeline::new();
        fade.append(
            Step::new(
                container,
                props([(Property::Opacity, 1.0), (Property::Scale, 1.0)]),
                props([(Property::Opacity, 0.0), (Property::Scale, 1.1)]),
                FADE_DURATION,
                Ease::InOutCubic,
            )?,
            Position::default(),
        )?;
        fade.validate_targets(layer)?;

        Ok(Self {
            duration,
            elapsed: 0.0,
            progress: 0,
            phase: LoaderPhase::Filling,
            fade,
            on_complete: None,
        })
    }

    pub fn on_complete(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn phase(&self) -> LoaderPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == LoaderPhase::Done
    }

    /// Starts filling again from zero. The completion callback is not re-armed.
    pub fn restart(&mut self) {
        self.elapsed = 0.0;
        self.progress = 0;
        self.phase = LoaderPhase::Filling;
        self.fade.halt();
        self.fade.seek(0.0);
    }

    /// Ticks after completion are no-ops.
    pub fn tick(&mut self, dt: f64, layer: &mut dyn RenderLayer) -> LoaderUpdate {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let mut update = LoaderUpdate::default();

        match self.phase {
            LoaderPhase::Filling => {
                self.elapsed = (self.elapsed + dt).min(self.duration);
                let fraction = self.elapsed / self.duration;
                let next = if self.elapsed >= self.duration {
                    100
                } else {
                    ((fraction * 100.0).floor() as u8).min(99)
                };
                if next > self.progress {
                    self.progress = next;
                    update.progress = Some(next);
                }
                if self.progress == 100 {
                    self.phase = LoaderPhase::FadingOut;
                    self.fade.play();
                    tracing::debug!("loading finished; fading out");
                }
            }
            LoaderPhase::FadingOut => {
                let finished = self.fade.advance(dt);
                self.fade.apply(layer);
                if finished == Some(Direction::Forward) {
                    self.phase = LoaderPhase::Done;
                    update.completed = true;
                    if let Some(f) = self.on_complete.take() {
                        f();
                    }
                    tracing::debug!("loader complete");
                }
            }
            LoaderPhase::Done => {}
        }
        update
    }
}
