use std::{collections::BTreeMap, str::FromStr};

use crate::{
    anim::{Step, Tween},
    core::{ElementId, Property},
    error::{RevealError, RevealResult},
    render::RenderLayer,
};

/// Where an appended item starts.
///
/// "Previous" always means the previously appended item; a stagger group counts
/// as one item ending where its last member ends.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// Exactly `t` seconds from timeline start.
    Absolute(f64),
    /// `gap` seconds after the previous item's end.
    AfterPrevious(f64),
    /// `amount` seconds before the previous item's end.
    OverlapPrevious(f64),
}

impl Default for Position {
    fn default() -> Self {
        Self::AfterPrevious(0.0)
    }
}

impl FromStr for Position {
    type Err = RevealError;

    /// `"1.5"`, `"+=0.2"` or `"-=0.8"`.
    fn from_str(s: &str) -> RevealResult<Self> {
        let s = s.trim();
        let parse = |raw: &str| {
            raw.trim()
                .parse::<f64>()
                .map_err(|_| RevealError::validation(format!("bad position token '{s}'")))
        };
        if let Some(rest) = s.strip_prefix("+=") {
            Ok(Self::AfterPrevious(parse(rest)?))
        } else if let Some(rest) = s.strip_prefix("-=") {
            Ok(Self::OverlapPrevious(parse(rest)?))
        } else {
            Ok(Self::Absolute(parse(s)?))
        }
    }
}

#[derive(Clone, Debug)]
pub enum Item {
    Step(Step),
    Timeline(Box<Timeline>),
}

impl Item {
    fn duration(&self) -> f64 {
        match self {
            Self::Step(step) => step.duration(),
            Self::Timeline(tl) => tl.duration(),
        }
    }
}

impl From<Step> for Item {
    fn from(step: Step) -> Self {
        Self::Step(step)
    }
}

impl From<Timeline> for Item {
    fn from(tl: Timeline) -> Self {
        Self::Timeline(Box::new(tl))
    }
}

#[derive(Clone, Debug)]
struct Placed {
    start: f64,
    item: Item,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PlayState {
    Stopped,
    Playing(Direction),
    Paused(Direction),
}

/// One resolved step, flattened out of any nesting.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ScheduledStep {
    pub target: ElementId,
    pub start: f64,
    pub end: f64,
    pub properties: Vec<Property>,
}

/// Ordered composition of steps and sub-timelines with a single playhead.
///
/// Start offsets are resolved once, at append time, left to right; later appends
/// never move earlier items.
#[derive(Clone, Debug)]
pub struct Timeline {
    items: Vec<Placed>,
    previous_end: f64,
    duration: f64,
    playhead: f64,
    state: PlayState,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            previous_end: 0.0,
            duration: 0.0,
            playhead: 0.0,
            state: PlayState::Stopped,
        }
    }

    fn resolve(&self, pos: Position) -> RevealResult<f64> {
        let start = match pos {
            Position::Absolute(t) => t,
            Position::AfterPrevious(gap) => self.previous_end + gap,
            Position::OverlapPrevious(amount) => self.previous_end - amount,
        };
        if !start.is_finite() {
            return Err(RevealError::timeline(format!(
                "position {pos:?} does not resolve to a finite time"
            )));
        }
        if start < 0.0 {
            return Err(RevealError::timeline(format!(
                "position {pos:?} would start {:.3}s before time zero",
                -start
            )));
        }
        Ok(start)
    }

    /// Appends a step or sub-timeline and returns its resolved start offset.
    pub fn append(&mut self, item: impl Into<Item>, pos: Position) -> RevealResult<f64> {
        let item = item.into();
        if let Item::Timeline(tl) = &item
            && tl.items.is_empty()
        {
            return Err(RevealError::timeline("cannot nest an empty timeline"));
        }
        let start = self.resolve(pos)?;
        let end = start + item.duration();
        self.items.push(Placed { start, item });
        self.previous_end = end;
        self.duration = self.duration.max(end);
        Ok(start)
    }

    /// Appends `tween` once per target, member `i` starting at `anchor + interval * i`
    /// where the anchor is resolved from `pos`. Returns the anchor.
    ///
    /// Either every member is appended or none is.
    pub fn stagger(
        &mut self,
        tween: &Tween,
        targets: &[ElementId],
        interval: f64,
        pos: Position,
    ) -> RevealResult<f64> {
        if targets.is_empty() {
            return Err(RevealError::missing_target("stagger needs at least one target"));
        }
        if !(interval.is_finite() && interval >= 0.0) {
            return Err(RevealError::timeline(format!(
                "stagger interval must be finite and >= 0 (got {interval})"
            )));
        }
        let anchor = self.resolve(pos)?;
        let last_end = anchor + interval * (targets.len() - 1) as f64 + tween.duration();

        for (i, target) in targets.iter().enumerate() {
            self.items.push(Placed {
                start: anchor + interval * i as f64,
                item: Item::Step(tween.clone().on(*target)),
            });
        }
        self.previous_end = last_end;
        self.duration = self.duration.max(last_end);
        Ok(anchor)
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlayState::Playing(_))
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, PlayState::Paused(_))
    }

    pub fn direction(&self) -> Option<Direction> {
        match self.state {
            PlayState::Playing(d) | PlayState::Paused(d) => Some(d),
            PlayState::Stopped => None,
        }
    }

    /// Plays toward the end from the current playhead. Returns whether playback
    /// is running; a no-op at the end already.
    pub fn play(&mut self) -> bool {
        self.run(Direction::Forward)
    }

    /// Plays toward the start from the current playhead. Returns whether playback
    /// is running; a no-op at the start already.
    pub fn reverse(&mut self) -> bool {
        self.run(Direction::Backward)
    }

    fn run(&mut self, direction: Direction) -> bool {
        let at_bound = match direction {
            Direction::Forward => self.playhead >= self.duration,
            Direction::Backward => self.playhead <= 0.0,
        };
        self.state = if at_bound {
            PlayState::Stopped
        } else {
            PlayState::Playing(direction)
        };
        !at_bound
    }

    pub fn pause(&mut self) {
        if let PlayState::Playing(d) = self.state {
            self.state = PlayState::Paused(d);
        }
    }

    pub fn resume(&mut self) -> bool {
        match self.state {
            PlayState::Paused(d) => self.run(d),
            PlayState::Playing(_) => true,
            PlayState::Stopped => false,
        }
    }

    /// Halts playback without moving the playhead.
    pub fn halt(&mut self) {
        self.state = PlayState::Stopped;
    }

    pub fn seek(&mut self, t: f64) {
        self.playhead = if t.is_nan() {
            0.0
        } else {
            t.clamp(0.0, self.duration)
        };
    }

    /// Moves the playhead by `dt` seconds in the playing direction. Returns the
    /// direction when this call reached its bound and stopped playback.
    pub fn advance(&mut self, dt: f64) -> Option<Direction> {
        let PlayState::Playing(direction) = self.state else {
            return None;
        };
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        match direction {
            Direction::Forward => {
                self.playhead = (self.playhead + dt).min(self.duration);
                if self.playhead >= self.duration {
                    self.state = PlayState::Stopped;
                    return Some(direction);
                }
            }
            Direction::Backward => {
                self.playhead = (self.playhead - dt).max(0.0);
                if self.playhead <= 0.0 {
                    self.state = PlayState::Stopped;
                    return Some(direction);
                }
            }
        }
        None
    }

    fn collect_steps<'a>(&'a self, offset: f64, out: &mut Vec<(f64, &'a Step)>) {
        for placed in &self.items {
            match &placed.item {
                Item::Step(step) => out.push((offset + placed.start, step)),
                Item::Timeline(tl) => tl.collect_steps(offset + placed.start, out),
            }
        }
    }

    fn flattened(&self) -> Vec<(f64, &Step)> {
        let mut out = Vec::new();
        self.collect_steps(0.0, &mut out);
        out
    }

    pub fn schedule(&self) -> Vec<ScheduledStep> {
        self.flattened()
            .into_iter()
            .map(|(start, step)| ScheduledStep {
                target: step.target(),
                start,
                end: start + step.duration(),
                properties: step.properties().collect(),
            })
            .collect()
    }

    pub fn targets(&self) -> Vec<ElementId> {
        let mut out: Vec<ElementId> = self.flattened().iter().map(|(_, s)| s.target()).collect();
        out.sort();
        out.dedup();
        out
    }

    /// Property values at absolute time `t`.
    ///
    /// For each (element, property) the most recently started step decides the
    /// value (later declaration wins ties). Before any step on it has started the
    /// first declared step's start value is used.
    pub fn sample_at(&self, t: f64) -> Vec<(ElementId, Property, f64)> {
        let mut started: BTreeMap<(ElementId, Property), (f64, &Step)> = BTreeMap::new();
        let mut pending: BTreeMap<(ElementId, Property), &Step> = BTreeMap::new();

        for (start, step) in self.flattened() {
            for prop in step.properties() {
                let key = (step.target(), prop);
                if start <= t {
                    if started.get(&key).is_none_or(|(prev, _)| *prev <= start) {
                        started.insert(key, (start, step));
                    }
                } else {
                    pending.entry(key).or_insert(step);
                }
            }
        }

        let mut out = BTreeMap::new();
        for (key, step) in pending {
            if let Some(v) = step.value_at(key.1, f64::NEG_INFINITY) {
                out.insert(key, v);
            }
        }
        for (key, (start, step)) in started {
            if let Some(v) = step.value_at(key.1, t - start) {
                out.insert(key, v);
            }
        }
        out.into_iter().map(|((id, p), v)| (id, p, v)).collect()
    }

    pub fn sample(&self) -> Vec<(ElementId, Property, f64)> {
        self.sample_at(self.playhead)
    }

    /// Writes the values at the playhead into `layer`.
    pub fn apply(&self, layer: &mut dyn RenderLayer) {
        for (id, prop, value) in self.sample() {
            layer.set_property(id, prop, value);
        }
    }

    /// Fails with `MissingTarget` if any step targets an element `layer` does not have.
    pub fn validate_targets(&self, layer: &dyn RenderLayer) -> RevealResult<()> {
        for id in self.targets() {
            if layer.geometry(id).is_none() {
                return Err(RevealError::missing_target(format!(
                    "timeline targets unmounted element {id}"
                )));
            }
        }
        Ok(())
    }
}
