//! Section mounting and teardown.
//!
//! The [`LifecycleManager`] is owned by the page root and passed by reference to
//! whatever mounts sections. It owns the viewport tracker, every mounted
//! controller, and the mapping from trigger handles back to sections.

use slotmap::{SecondaryMap, SlotMap, new_key_type};

use crate::{
    controller::{ControllerState, SectionController, ToggleAction, TogglePolicy},
    core::{ElementId, Viewport},
    error::{RevealError, RevealResult},
    render::RenderLayer,
    scheduler::{FrameScheduler, Subscriber, TickId},
    timeline::Timeline,
    tracker::{EdgeEvent, EdgeNotice, TriggerBand, TriggerHandle, ViewportTracker},
};

new_key_type! {
    /// Handle to a mounted section.
    pub struct SectionKey;
}

/// How a mounted section starts its animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Activation {
    /// Driven by a viewport trigger on `region`.
    Scroll {
        region: ElementId,
        band: TriggerBand,
    },
    /// Plays as soon as it is mounted.
    Immediate,
}

#[derive(Clone, Debug)]
pub struct SectionSetup {
    pub name: String,
    pub timeline: Timeline,
    pub policy: TogglePolicy,
    pub activation: Activation,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionEvent {
    Edge {
        section: String,
        event: EdgeEvent,
    },
    Transition {
        section: String,
        from: ControllerState,
        to: ControllerState,
    },
}

struct Mounted {
    controller: SectionController,
    tick: TickId,
}

pub struct LifecycleManager {
    tracker: ViewportTracker,
    sections: SlotMap<SectionKey, Mounted>,
    by_trigger: SecondaryMap<TriggerHandle, SectionKey>,
    triggers_tick: Option<TickId>,
}

impl LifecycleManager {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            tracker: ViewportTracker::new(viewport),
            sections: SlotMap::with_key(),
            by_trigger: SecondaryMap::new(),
            triggers_tick: None,
        }
    }

    pub fn tracker(&self) -> &ViewportTracker {
        &self.tracker
    }

    pub fn scroll_to(&mut self, y: f64) {
        self.tracker.scroll_to(y);
    }

    pub fn resize(&mut self, width: f64, height: f64) -> RevealResult<()> {
        self.tracker.resize(width, height)
    }

    /// Builds the controller, registers its trigger and subscribes it to the frame
    /// tick. On error nothing stays registered and nothing is written to `layer`.
    pub fn mount(
        &mut self,
        setup: SectionSetup,
        ticks: &mut FrameScheduler,
        layer: &mut dyn RenderLayer,
    ) -> RevealResult<SectionKey> {
        let SectionSetup {
            name,
            timeline,
            policy,
            activation,
        } = setup;
        if let Activation::Scroll { region, .. } = activation
            && layer.geometry(region).is_none()
        {
            return Err(RevealError::missing_target(format!(
                "section '{name}' trigger region {region} is not mounted"
            )));
        }
        let mut controller = SectionController::new(name, timeline, policy, layer)?;

        let trigger = match activation {
            Activation::Scroll { region, band } => {
                match controller.bind(&mut self.tracker, region, band, &*layer) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        controller.dispose(&mut self.tracker);
                        return Err(e);
                    }
                }
            }
            Activation::Immediate => {
                controller.perform(ToggleAction::Play);
                None
            }
        };

        if self.triggers_tick.is_none() {
            self.triggers_tick = Some(ticks.subscribe(Subscriber::Triggers));
        }

        let name = controller.name().to_string();
        let key = self.sections.insert_with_key(|key| Mounted {
            controller,
            tick: ticks.subscribe(Subscriber::Section(key)),
        });
        if let Some(handle) = trigger {
            self.by_trigger.insert(handle, key);
        }
        tracing::debug!(section = %name, ?key, "section mounted");
        Ok(key)
    }

    /// Like [`LifecycleManager::mount`], but a section that fails to build is
    /// logged and left to render statically.
    pub fn mount_or_static(
        &mut self,
        setup: SectionSetup,
        ticks: &mut FrameScheduler,
        layer: &mut dyn RenderLayer,
    ) -> Option<SectionKey> {
        let name = setup.name.clone();
        match self.mount(setup, ticks, layer) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(section = %name, error = %e, "section renders without animation");
                None
            }
        }
    }

    /// Disposes the section's controller, trigger and tick subscription before
    /// returning. Idempotent.
    pub fn unmount(&mut self, key: SectionKey, ticks: &mut FrameScheduler) -> bool {
        let Some(mut mounted) = self.sections.remove(key) else {
            return false;
        };
        if let Some(handle) = mounted.controller.trigger() {
            self.by_trigger.remove(handle);
        }
        mounted.controller.dispose(&mut self.tracker);
        ticks.unsubscribe(mounted.tick);

        if self.sections.is_empty()
            && let Some(id) = self.triggers_tick.take()
        {
            ticks.unsubscribe(id);
        }
        tracing::debug!(section = %mounted.controller.name(), ?key, "section unmounted");
        true
    }

    pub fn unmount_all(&mut self, ticks: &mut FrameScheduler) {
        let keys: Vec<SectionKey> = self.sections.keys().collect();
        for key in keys {
            self.unmount(key, ticks);
        }
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn controller(&self, key: SectionKey) -> Option<&SectionController> {
        self.sections.get(key).map(|m| &m.controller)
    }

    pub fn state(&self, key: SectionKey) -> Option<ControllerState> {
        self.controller(key).map(SectionController::state)
    }

    pub fn find(&self, name: &str) -> Option<SectionKey> {
        self.sections
            .iter()
            .find(|(_, m)| m.controller.name() == name)
            .map(|(k, _)| k)
    }

    /// Runs trigger evaluation for this frame and delivers the resulting edge
    /// events to their sections.
    pub fn evaluate_triggers(&mut self, layer: &dyn RenderLayer) -> Vec<SectionEvent> {
        let notices = self.tracker.evaluate(layer);
        let mut out = Vec::new();
        for notice in notices {
            out.extend(self.deliver(notice));
        }
        out
    }

    /// Delivers one edge event. Events for handles that were unregistered after
    /// being collected are dropped.
    pub fn deliver(&mut self, notice: EdgeNotice) -> Vec<SectionEvent> {
        if !self.tracker.is_live(notice.handle) {
            tracing::trace!(handle = ?notice.handle, "stale edge event dropped");
            return Vec::new();
        }
        let Some(mounted) = self
            .by_trigger
            .get(notice.handle)
            .and_then(|key| self.sections.get_mut(*key))
        else {
            return Vec::new();
        };

        let section = mounted.controller.name().to_string();
        let mut out = vec![SectionEvent::Edge {
            section: section.clone(),
            event: notice.event,
        }];
        if let Some(t) = mounted.controller.handle(notice.event) {
            out.push(SectionEvent::Transition {
                section,
                from: t.from,
                to: t.to,
            });
        }
        out
    }

    pub fn tick_section(
        &mut self,
        key: SectionKey,
        dt: f64,
        layer: &mut dyn RenderLayer,
    ) -> Option<SectionEvent> {
        let mounted = self.sections.get_mut(key)?;
        let t = mounted.controller.tick(dt, layer)?;
        Some(SectionEvent::Transition {
            section: mounted.controller.name().to_string(),
            from: t.from,
            to: t.to,
        })
    }

    /// Runs one tick subscription owned by this manager. Loader ticks belong to
    /// the caller and are ignored here.
    pub fn dispatch(
        &mut self,
        subscriber: Subscriber,
        dt: f64,
        layer: &mut dyn RenderLayer,
    ) -> Vec<SectionEvent> {
        match subscriber {
            Subscriber::Triggers => self.evaluate_triggers(&*layer),
            Subscriber::Section(key) => self.tick_section(key, dt, layer).into_iter().collect(),
            Subscriber::Loader => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        anim::Tween,
        core::{Property, Rect, props},
        ease::Ease,
        render::Scene,
        timeline::Position,
    };

    struct Fixture {
        scene: Scene,
        ticks: FrameScheduler,
        manager: LifecycleManager,
        section: ElementId,
        card: ElementId,
    }

    fn fixture() -> Fixture {
        let mut scene = Scene::new();
        let section = scene
            .add_root("about", Rect::new(0.0, 1000.0, 1280.0, 1500.0))
            .unwrap();
        let card = scene
            .add_child(section, "about.card", Rect::new(0.0, 1000.0, 400.0, 1200.0))
            .unwrap();
        Fixture {
            scene,
            ticks: FrameScheduler::new(),
            manager: LifecycleManager::new(Viewport::new(1280.0, 800.0).unwrap()),
            section,
            card,
        }
    }

    fn setup(fx: &Fixture) -> SectionSetup {
        let mut timeline = Timeline::new();
        let tween = Tween::new(
            props([(Property::Opacity, 0.0)]),
            props([(Property::Opacity, 1.0)]),
            1.0,
            Ease::Linear,
        )
        .unwrap();
        timeline.append(tween.on(fx.card), Position::default()).unwrap();
        SectionSetup {
            name: "about".to_string(),
            timeline,
            policy: TogglePolicy::default(),
            activation: Activation::Scroll {
                region: fx.section,
                band: TriggerBand::parse("top 80%", "bottom 20%").unwrap(),
            },
        }
    }

    fn run(fx: &mut Fixture, dt: f64) -> Vec<SectionEvent> {
        let (_, ids) = fx.ticks.begin_frame(dt);
        let mut out = Vec::new();
        for id in ids {
            if let Some(sub) = fx.ticks.get(id) {
                out.extend(fx.manager.dispatch(sub, dt, &mut fx.scene));
            }
        }
        out
    }

    #[test]
    fn scroll_scenario_enters_settles_and_reverses() {
        let mut fx = fixture();
        let s = setup(&fx);
        let key = fx.manager.mount(s, &mut fx.ticks, &mut fx.scene).unwrap();
        assert_eq!(fx.manager.state(key), Some(ControllerState::Idle));
        run(&mut fx, 0.016);
        assert_eq!(fx.manager.state(key), Some(ControllerState::Idle));

        fx.manager.scroll_to(400.0);
        let events = run(&mut fx, 0.016);
        assert!(events.contains(&SectionEvent::Transition {
            section: "about".into(),
            from: ControllerState::Idle,
            to: ControllerState::Entering,
        }));

        // Scroll past the band; leave-down is ignored by the default policy.
        fx.manager.scroll_to(3000.0);
        for _ in 0..120 {
            run(&mut fx, 1.0 / 60.0);
        }
        assert_eq!(fx.manager.state(key), Some(ControllerState::Entered));
        assert_eq!(fx.scene.property(fx.card, Property::Opacity), Some(1.0));

        fx.manager.scroll_to(0.0);
        run(&mut fx, 1.0 / 60.0);
        assert_eq!(fx.manager.state(key), Some(ControllerState::Exiting));
        assert!(fx.scene.property(fx.card, Property::Opacity).unwrap() < 1.0);

        for _ in 0..120 {
            run(&mut fx, 1.0 / 60.0);
        }
        assert_eq!(fx.manager.state(key), Some(ControllerState::Idle));
        assert_eq!(fx.scene.property(fx.card, Property::Opacity), Some(0.0));
    }

    #[test]
    fn unmount_releases_everything() {
        let mut fx = fixture();
        let s = setup(&fx);
        let key = fx.manager.mount(s, &mut fx.ticks, &mut fx.scene).unwrap();
        assert_eq!(fx.ticks.len(), 2);
        assert_eq!(fx.manager.tracker().len(), 1);

        assert!(fx.manager.unmount(key, &mut fx.ticks));
        assert!(!fx.manager.unmount(key, &mut fx.ticks));
        assert!(fx.ticks.is_empty());
        assert!(fx.manager.tracker().is_empty());
        assert!(fx.manager.is_empty());
    }

    #[test]
    fn queued_event_for_unmounted_section_is_inert() {
        let mut fx = fixture();
        let s = setup(&fx);
        let key = fx.manager.mount(s, &mut fx.ticks, &mut fx.scene).unwrap();
        let handle = fx.manager.controller(key).unwrap().trigger().unwrap();
        fx.manager.unmount(key, &mut fx.ticks);

        let before = fx.scene.mutation_count();
        let events = fx.manager.deliver(EdgeNotice {
            handle,
            event: EdgeEvent::EnteredGoingDown,
        });
        assert!(events.is_empty());
        fx.manager.scroll_to(400.0);
        assert!(run(&mut fx, 0.5).is_empty());
        assert_eq!(fx.scene.mutation_count(), before);
    }

    #[test]
    fn failed_mount_leaves_nothing_registered() {
        let mut fx = fixture();
        let before = fx.scene.mutation_count();
        let mut bad = setup(&fx);
        bad.activation = Activation::Scroll {
            region: ElementId::default(),
            band: TriggerBand::default(),
        };
        assert!(matches!(
            fx.manager.mount(bad, &mut fx.ticks, &mut fx.scene),
            Err(RevealError::MissingTarget(_))
        ));
        assert!(fx.manager.is_empty());
        assert!(fx.manager.tracker().is_empty());
        assert!(fx.ticks.is_empty());
        // Targets keep their authored look instead of the hidden start values.
        assert_eq!(fx.scene.mutation_count(), before);
        assert_eq!(fx.scene.property(fx.card, Property::Opacity), None);

        let mut unbound = setup(&fx);
        unbound.activation = Activation::Scroll {
            region: ElementId::default(),
            band: TriggerBand::default(),
        };
        assert_eq!(
            fx.manager
                .mount_or_static(unbound, &mut fx.ticks, &mut fx.scene),
            None
        );
        assert_eq!(fx.scene.mutation_count(), before);

        let mut missing = setup(&fx);
        missing.name = "ghost".into();
        missing.timeline = {
            let mut tl = Timeline::new();
            let tween = Tween::new(
                props([(Property::Opacity, 0.0)]),
                props([(Property::Opacity, 1.0)]),
                1.0,
                Ease::Linear,
            )
            .unwrap();
            tl.append(tween.on(ElementId::default()), Position::default()).unwrap();
            tl
        };
        assert_eq!(
            fx.manager
                .mount_or_static(missing, &mut fx.ticks, &mut fx.scene),
            None
        );
        assert!(fx.manager.is_empty());
    }

    #[test]
    fn immediate_sections_play_on_mount() {
        let mut fx = fixture();
        let mut s = setup(&fx);
        s.activation = Activation::Immediate;
        s.policy = TogglePolicy::once();
        let key = fx.manager.mount(s, &mut fx.ticks, &mut fx.scene).unwrap();
        assert_eq!(fx.manager.state(key), Some(ControllerState::Entering));
        assert_eq!(fx.manager.tracker().len(), 0);
        for _ in 0..70 {
            run(&mut fx, 1.0 / 60.0);
        }
        assert_eq!(fx.manager.state(key), Some(ControllerState::Entered));
        assert_eq!(fx.manager.find("about"), Some(key));
    }
}
