//! Viewport intersection tracking.
//!
//! Each registered trigger watches one region against a band of scroll offsets
//! derived from two anchors. Scroll and resize only mark the tracker dirty;
//! [`ViewportTracker::evaluate`] runs at most once per frame and turns zone
//! changes into discrete [`EdgeEvent`]s.

use std::{fmt, str::FromStr};

use slotmap::{SlotMap, new_key_type};

use crate::{
    core::{ElementId, Rect, Viewport},
    error::{RevealError, RevealResult},
    render::RenderLayer,
};

new_key_type! {
    /// Handle to a registered trigger.
    pub struct TriggerHandle;
}

/// A point on the region matched against a line of the viewport, e.g. `"top 80%"`:
/// the band edge is crossed when the region's top reaches 80% of viewport height.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Anchor {
    /// Fraction of the region's height, 0 = top, 1 = bottom.
    pub element: f64,
    /// Fraction of the viewport's height, 0 = top, 1 = bottom.
    pub viewport: f64,
}

impl Anchor {
    pub const fn new(element: f64, viewport: f64) -> Self {
        Self { element, viewport }
    }

    /// Scroll offset at which this anchor lines up for `region`.
    pub fn scroll_offset(&self, region: Rect, viewport_height: f64) -> f64 {
        region.y0 + region.height() * self.element - viewport_height * self.viewport
    }
}

fn parse_edge(s: &str) -> RevealResult<f64> {
    match s {
        "top" => Ok(0.0),
        "center" => Ok(0.5),
        "bottom" => Ok(1.0),
        pct => {
            let v: f64 = pct
                .strip_suffix('%')
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| RevealError::validation(format!("bad anchor edge '{pct}'")))?;
            if !v.is_finite() {
                return Err(RevealError::validation(format!("bad anchor edge '{pct}'")));
            }
            Ok(v / 100.0)
        }
    }
}

fn fmt_edge(v: f64) -> String {
    if v == 0.0 {
        "top".to_string()
    } else if v == 0.5 {
        "center".to_string()
    } else if v == 1.0 {
        "bottom".to_string()
    } else {
        format!("{}%", v * 100.0)
    }
}

impl FromStr for Anchor {
    type Err = RevealError;

    fn from_str(s: &str) -> RevealResult<Self> {
        let mut parts = s.split_whitespace();
        let (Some(el), Some(vp), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(RevealError::validation(format!(
                "anchor '{s}' must be '<element-edge> <viewport-edge>'"
            )));
        };
        Ok(Self::new(parse_edge(el)?, parse_edge(vp)?))
    }
}

impl TryFrom<String> for Anchor {
    type Error = RevealError;

    fn try_from(s: String) -> RevealResult<Self> {
        s.parse()
    }
}

impl From<Anchor> for String {
    fn from(a: Anchor) -> Self {
        a.to_string()
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", fmt_edge(self.element), fmt_edge(self.viewport))
    }
}

/// Entry and exit anchors of a trigger.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TriggerBand {
    #[serde(default = "TriggerBand::default_entry")]
    pub entry: Anchor,
    #[serde(default = "TriggerBand::default_exit")]
    pub exit: Anchor,
}

impl TriggerBand {
    pub fn new(entry: Anchor, exit: Anchor) -> Self {
        Self { entry, exit }
    }

    pub fn parse(entry: &str, exit: &str) -> RevealResult<Self> {
        Ok(Self::new(entry.parse()?, exit.parse()?))
    }

    /// `"top bottom"`: the region's top reaches the viewport's bottom.
    pub fn default_entry() -> Anchor {
        Anchor::new(0.0, 1.0)
    }

    /// `"bottom top"`: the region's bottom reaches the viewport's top.
    pub fn default_exit() -> Anchor {
        Anchor::new(1.0, 0.0)
    }

    /// `[start, end)` scroll offsets; an inverted band collapses to empty.
    pub fn offsets(&self, region: Rect, viewport_height: f64) -> (f64, f64) {
        let start = self.entry.scroll_offset(region, viewport_height);
        let end = self.exit.scroll_offset(region, viewport_height);
        (start, end.max(start))
    }
}

impl Default for TriggerBand {
    fn default() -> Self {
        Self::new(Self::default_entry(), Self::default_exit())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeEvent {
    EnteredGoingDown,
    LeftGoingDown,
    EnteredGoingUp,
    LeftGoingUp,
}

impl fmt::Display for EdgeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EnteredGoingDown => "entered_going_down",
            Self::LeftGoingDown => "left_going_down",
            Self::EnteredGoingUp => "entered_going_up",
            Self::LeftGoingUp => "left_going_up",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeNotice {
    pub handle: TriggerHandle,
    pub event: EdgeEvent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Zone {
    Before,
    Inside,
    After,
}

impl Zone {
    fn classify(y: f64, (start, end): (f64, f64)) -> Self {
        if y < start {
            Self::Before
        } else if y < end {
            Self::Inside
        } else {
            Self::After
        }
    }

    fn edges(from: Zone, to: Zone) -> &'static [EdgeEvent] {
        use EdgeEvent::*;
        match (from, to) {
            (Zone::Before, Zone::Inside) => &[EnteredGoingDown],
            (Zone::Before, Zone::After) => &[EnteredGoingDown, LeftGoingDown],
            (Zone::Inside, Zone::After) => &[LeftGoingDown],
            (Zone::After, Zone::Inside) => &[EnteredGoingUp],
            (Zone::After, Zone::Before) => &[EnteredGoingUp, LeftGoingUp],
            (Zone::Inside, Zone::Before) => &[LeftGoingUp],
            _ => &[],
        }
    }
}

#[derive(Clone, Debug)]
struct Entry {
    region: ElementId,
    band: TriggerBand,
    zone: Zone,
}

pub struct ViewportTracker {
    viewport: Viewport,
    entries: SlotMap<TriggerHandle, Entry>,
    order: Vec<TriggerHandle>,
    dirty: bool,
}

impl ViewportTracker {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            entries: SlotMap::with_key(),
            order: Vec::new(),
            dirty: false,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Starts watching `region`. The trigger starts out "before" its band, so a
    /// region already inside it reports `EnteredGoingDown` on the next evaluation.
    pub fn register(
        &mut self,
        region: ElementId,
        band: TriggerBand,
        layer: &dyn RenderLayer,
    ) -> RevealResult<TriggerHandle> {
        if layer.geometry(region).is_none() {
            return Err(RevealError::missing_target(format!(
                "trigger region {region} is not mounted"
            )));
        }
        let handle = self.entries.insert(Entry {
            region,
            band,
            zone: Zone::Before,
        });
        self.order.push(handle);
        self.dirty = true;
        tracing::debug!(?handle, %region, entry = %band.entry, exit = %band.exit, "trigger registered");
        Ok(handle)
    }

    /// Stops watching. Idempotent; returns whether the handle was live.
    pub fn unregister(&mut self, handle: TriggerHandle) -> bool {
        if self.entries.remove(handle).is_none() {
            return false;
        }
        self.order.retain(|h| *h != handle);
        tracing::debug!(?handle, "trigger unregistered");
        true
    }

    pub fn is_live(&self, handle: TriggerHandle) -> bool {
        self.entries.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn scroll_to(&mut self, y: f64) {
        let y = if y.is_finite() { y.max(0.0) } else { 0.0 };
        if y != self.viewport.scroll_y {
            self.viewport.scroll_y = y;
            self.dirty = true;
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) -> RevealResult<()> {
        let mut next = Viewport::new(width, height)?;
        next.scroll_y = self.viewport.scroll_y;
        self.viewport = next;
        self.dirty = true;
        Ok(())
    }

    /// Forces the next evaluation, e.g. after layout moved a region.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Classifies every live trigger against the current scroll offset and returns
    /// the edge events, in registration order. No-op unless something changed
    /// since the last evaluation.
    #[tracing::instrument(level = "trace", skip_all, fields(scroll_y = self.viewport.scroll_y))]
    pub fn evaluate(&mut self, layer: &dyn RenderLayer) -> Vec<EdgeNotice> {
        if !self.dirty {
            return Vec::new();
        }
        self.dirty = false;

        let y = self.viewport.scroll_y;
        let vh = self.viewport.height;
        let mut out = Vec::new();
        for &handle in &self.order {
            let Some(entry) = self.entries.get_mut(handle) else {
                continue;
            };
            let Some(rect) = layer.geometry(entry.region) else {
                tracing::warn!(?handle, region = %entry.region, "trigger region vanished; skipping");
                continue;
            };
            let next = Zone::classify(y, entry.band.offsets(rect, vh));
            for &event in Zone::edges(entry.zone, next) {
                out.push(EdgeNotice { handle, event });
            }
            entry.zone = next;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::EdgeEvent::*;
    use crate::render::Scene;

    fn setup() -> (Scene, ElementId, ViewportTracker) {
        let mut scene = Scene::new();
        let about = scene
            .add_root("about", Rect::new(0.0, 1000.0, 1280.0, 1500.0))
            .unwrap();
        let tracker = ViewportTracker::new(Viewport::new(1280.0, 800.0).unwrap());
        (scene, about, tracker)
    }

    fn events(notices: Vec<EdgeNotice>) -> Vec<EdgeEvent> {
        notices.into_iter().map(|n| n.event).collect()
    }

    #[test]
    fn anchors_parse_and_display() {
        let a: Anchor = "top 80%".parse().unwrap();
        assert_eq!(a, Anchor::new(0.0, 0.8));
        assert_eq!(a.to_string(), "top 80%");
        assert_eq!("bottom top".parse::<Anchor>().unwrap(), TriggerBand::default_exit());
        assert!("top".parse::<Anchor>().is_err());
        assert!("top 80".parse::<Anchor>().is_err());
        assert!("top 80% extra".parse::<Anchor>().is_err());
    }

    #[test]
    fn band_offsets_follow_anchor_math() {
        let band = TriggerBand::parse("top 80%", "bottom 20%").unwrap();
        let (start, end) = band.offsets(Rect::new(0.0, 1000.0, 10.0, 1500.0), 800.0);
        assert!((start - 360.0).abs() < 1e-9);
        assert!((end - 1340.0).abs() < 1e-9);
    }

    #[test]
    fn emits_all_four_edges() {
        let (scene, about, mut tracker) = setup();
        let band = TriggerBand::parse("top 80%", "bottom 20%").unwrap();
        tracker.register(about, band, &scene).unwrap();
        assert!(tracker.evaluate(&scene).is_empty());

        tracker.scroll_to(400.0);
        assert_eq!(events(tracker.evaluate(&scene)), vec![EnteredGoingDown]);
        tracker.scroll_to(2000.0);
        assert_eq!(events(tracker.evaluate(&scene)), vec![LeftGoingDown]);
        tracker.scroll_to(1000.0);
        assert_eq!(events(tracker.evaluate(&scene)), vec![EnteredGoingUp]);
        tracker.scroll_to(0.0);
        assert_eq!(events(tracker.evaluate(&scene)), vec![LeftGoingUp]);
    }

    #[test]
    fn jumping_over_the_band_emits_both_edges() {
        let (scene, about, mut tracker) = setup();
        let band = TriggerBand::parse("top 80%", "bottom 20%").unwrap();
        tracker.register(about, band, &scene).unwrap();
        tracker.evaluate(&scene);

        tracker.scroll_to(5000.0);
        assert_eq!(
            events(tracker.evaluate(&scene)),
            vec![EnteredGoingDown, LeftGoingDown]
        );
        tracker.scroll_to(0.0);
        assert_eq!(
            events(tracker.evaluate(&scene)),
            vec![EnteredGoingUp, LeftGoingUp]
        );
    }

    #[test]
    fn scroll_updates_coalesce_per_evaluation() {
        let (scene, about, mut tracker) = setup();
        tracker
            .register(about, TriggerBand::parse("top 80%", "bottom 20%").unwrap(), &scene)
            .unwrap();
        tracker.evaluate(&scene);

        tracker.scroll_to(400.0);
        tracker.scroll_to(800.0);
        tracker.scroll_to(100.0);
        assert!(tracker.evaluate(&scene).is_empty());
        assert!(!tracker.is_dirty());
        assert!(tracker.evaluate(&scene).is_empty());
    }

    #[test]
    fn region_already_in_band_enters_on_first_evaluation() {
        let (scene, about, mut tracker) = setup();
        tracker.scroll_to(500.0);
        let h = tracker
            .register(about, TriggerBand::parse("top 80%", "bottom 20%").unwrap(), &scene)
            .unwrap();
        assert_eq!(
            tracker.evaluate(&scene),
            vec![EdgeNotice {
                handle: h,
                event: EnteredGoingDown
            }]
        );
    }

    #[test]
    fn events_follow_registration_order() {
        let (mut scene, about, mut tracker) = setup();
        let contact = scene
            .add_root("contact", Rect::new(0.0, 1100.0, 1280.0, 1600.0))
            .unwrap();
        let band = TriggerBand::parse("top 80%", "bottom 20%").unwrap();
        let second = tracker.register(contact, band, &scene).unwrap();
        let first = tracker.register(about, band, &scene).unwrap();
        tracker.evaluate(&scene);

        tracker.scroll_to(600.0);
        let handles: Vec<_> = tracker.evaluate(&scene).into_iter().map(|n| n.handle).collect();
        assert_eq!(handles, vec![second, first]);
    }

    #[test]
    fn unregister_is_idempotent_and_stales_the_handle() {
        let (scene, about, mut tracker) = setup();
        let h = tracker.register(about, TriggerBand::default(), &scene).unwrap();
        assert!(tracker.unregister(h));
        assert!(!tracker.unregister(h));
        assert!(!tracker.is_live(h));
        tracker.scroll_to(900.0);
        assert!(tracker.evaluate(&scene).is_empty());
    }

    #[test]
    fn missing_and_vanished_regions() {
        let (mut scene, about, mut tracker) = setup();
        assert!(matches!(
            tracker.register(ElementId::default(), TriggerBand::default(), &scene),
            Err(RevealError::MissingTarget(_))
        ));
        tracker.register(about, TriggerBand::default(), &scene).unwrap();
        scene.remove(about);
        tracker.scroll_to(900.0);
        assert!(tracker.evaluate(&scene).is_empty());
    }

    #[test]
    fn resize_moves_the_band() {
        let (scene, about, mut tracker) = setup();
        tracker
            .register(about, TriggerBand::parse("top 80%", "bottom 20%").unwrap(), &scene)
            .unwrap();
        tracker.scroll_to(300.0);
        assert!(tracker.evaluate(&scene).is_empty());
        // Taller viewport: start offset drops to 1000 - 0.8 * 1000 = 200.
        tracker.resize(1280.0, 1000.0).unwrap();
        assert_eq!(events(tracker.evaluate(&scene)), vec![EnteredGoingDown]);
        assert!(tracker.resize(0.0, 10.0).is_err());
    }

    #[test]
    fn band_serde_uses_anchor_strings() {
        let band: TriggerBand =
            serde_json::from_str(r#"{"entry":"top 85%","exit":"bottom 20%"}"#).unwrap();
        assert_eq!(band.entry, Anchor::new(0.0, 0.85));
        let json = serde_json::to_string(&band).unwrap();
        assert!(json.contains("\"top 85%\""));
        let defaulted: TriggerBand = serde_json::from_str("{}").unwrap();
        assert_eq!(defaulted, TriggerBand::default());
    }
}
