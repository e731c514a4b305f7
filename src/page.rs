//! Page composition root: one scene, one frame tick, one lifecycle manager.
//!
//! A page starts in the loading phase with only the loading driver ticking. When
//! the loader completes, it is unsubscribed and every section is mounted from
//! inside the same frame; the sections first tick on the following frame.

use crate::{
    config::{PageConfig, SectionKind},
    contact::{ContactFormState, MessageRelay, SubmissionStatus},
    controller::ControllerState,
    core::{ElementId, Rect},
    error::{RevealError, RevealResult},
    lifecycle::{LifecycleManager, SectionEvent, SectionKey},
    loader::LoadingDriver,
    render::Scene,
    scheduler::{FrameScheduler, Subscriber},
    sections,
    theme::{Theme, ThemeStore},
};

/// Scroll offset past which the navigation bar switches to its compact style.
pub const NAV_SCROLL_THRESHOLD: f64 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PagePhase {
    Loading,
    Content,
    Unmounted,
}

/// What happened during one frame.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub loaded: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SectionEvent>,
}

impl FrameReport {
    pub fn is_quiet(&self) -> bool {
        self.progress.is_none() && !self.loaded && self.events.is_empty()
    }
}

pub struct Page {
    config: PageConfig,
    scene: Scene,
    ticks: FrameScheduler,
    manager: LifecycleManager,
    loader: Option<LoadingDriver>,
    loader_element: ElementId,
    phase: PagePhase,
    mounted: Vec<SectionKey>,
    theme: Theme,
    contact: ContactFormState,
}

impl Page {
    #[tracing::instrument(skip_all, fields(sections = config.sections.len()))]
    pub fn new(config: PageConfig) -> RevealResult<Self> {
        config.validate()?;
        let viewport = config.viewport()?;

        let mut scene = Scene::new();
        let loader_element = scene.add_root("loader", viewport.visible_rect())?;
        for layout in &config.sections {
            sections::build_elements(&mut scene, layout, viewport.width)?;
        }
        let loader = LoadingDriver::new(config.loader_duration, loader_element, &scene)?;

        let mut ticks = FrameScheduler::new();
        ticks.subscribe(Subscriber::Loader);

        Ok(Self {
            theme: config.theme,
            config,
            scene,
            ticks,
            manager: LifecycleManager::new(viewport),
            loader: Some(loader),
            loader_element,
            phase: PagePhase::Loading,
            mounted: Vec::new(),
            contact: ContactFormState::new(),
        })
    }

    pub fn phase(&self) -> PagePhase {
        self.phase
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn manager(&self) -> &LifecycleManager {
        &self.manager
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    pub fn loader_progress(&self) -> Option<u8> {
        self.loader.as_ref().map(LoadingDriver::progress)
    }

    pub fn section_state(&self, name: &str) -> Option<ControllerState> {
        self.manager.state(self.manager.find(name)?)
    }

    pub fn scroll_y(&self) -> f64 {
        self.manager.tracker().viewport().scroll_y
    }

    pub fn is_nav_scrolled(&self) -> bool {
        self.scroll_y() > NAV_SCROLL_THRESHOLD
    }

    pub fn scroll_to(&mut self, y: f64) {
        self.manager.scroll_to(y);
    }

    /// Jumps to the top edge of the first section of `kind`, as the navigation
    /// links do. Every band crossed on the way fires on the next frame.
    pub fn scroll_to_section(&mut self, kind: SectionKind) -> RevealResult<()> {
        let top = self
            .config
            .sections
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.top)
            .ok_or_else(|| RevealError::missing_target(format!("page has no '{kind}' section")))?;
        tracing::debug!(section = %kind, top, "scroll to section");
        self.scroll_to(top);
        Ok(())
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_to(0.0);
    }

    pub fn resize(&mut self, width: f64, height: f64) -> RevealResult<()> {
        self.manager.resize(width, height)?;
        if self.loader.is_some() {
            self.scene
                .set_rect(self.loader_element, Rect::new(0.0, 0.0, width, height))?;
        }
        Ok(())
    }

    /// Dispatches one frame of `dt` seconds.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn frame(&mut self, dt: f64) -> FrameReport {
        let (info, ids) = self.ticks.begin_frame(dt);
        let mut report = FrameReport {
            frame: info.index,
            time: info.elapsed,
            ..FrameReport::default()
        };

        for id in ids {
            let Some(subscriber) = self.ticks.get(id) else {
                continue;
            };
            match subscriber {
                Subscriber::Loader => {
                    let Some(loader) = self.loader.as_mut() else {
                        self.ticks.unsubscribe(id);
                        continue;
                    };
                    let update = loader.tick(info.dt, &mut self.scene);
                    report.progress = report.progress.max(update.progress);
                    if update.completed {
                        self.ticks.unsubscribe(id);
                        self.loader = None;
                        self.scene.remove(self.loader_element);
                        self.mount_content();
                        report.loaded = true;
                    }
                }
                other => report
                    .events
                    .extend(self.manager.dispatch(other, info.dt, &mut self.scene)),
            }
        }
        report
    }

    /// Mounts every section's animation. A section whose choreography cannot be
    /// built stays visible without animation.
    fn mount_content(&mut self) {
        for layout in &self.config.sections {
            let setups = match sections::choreography(&self.scene, layout) {
                Ok(setups) => setups,
                Err(e) => {
                    tracing::warn!(section = %layout.kind, error = %e, "section renders without animation");
                    continue;
                }
            };
            for setup in setups {
                if let Some(key) =
                    self.manager
                        .mount_or_static(setup, &mut self.ticks, &mut self.scene)
                {
                    self.mounted.push(key);
                }
            }
        }
        self.phase = PagePhase::Content;
        tracing::info!(sections = self.mounted.len(), "content mounted");
    }

    /// Disposes every section and stops all ticking. Idempotent.
    pub fn unmount(&mut self) {
        self.manager.unmount_all(&mut self.ticks);
        self.mounted.clear();
        self.loader = None;
        self.ticks.clear();
        self.phase = PagePhase::Unmounted;
    }

    pub fn is_idle(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn load_theme(&mut self, store: &dyn ThemeStore) {
        if let Some(theme) = store.load() {
            self.theme = theme;
        }
    }

    pub fn toggle_theme(&mut self, store: &mut dyn ThemeStore) -> Theme {
        self.theme = self.theme.toggled();
        store.save(self.theme);
        tracing::debug!(theme = %self.theme, "theme toggled");
        self.theme
    }

    pub fn contact(&mut self) -> &mut ContactFormState {
        &mut self.contact
    }

    pub fn submit_contact(&mut self, relay: &dyn MessageRelay) -> SubmissionStatus {
        self.contact.submit(relay, &self.config.relay).clone()
    }
}
