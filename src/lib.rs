#![forbid(unsafe_code)]

pub mod anim;
pub mod config;
pub mod contact;
pub mod controller;
pub mod core;
pub mod ease;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod page;
pub mod render;
pub mod scheduler;
pub mod sections;
pub mod theme;
pub mod timeline;
pub mod tracker;

pub use anim::{Step, Tween};
pub use config::{PageConfig, SectionKind, SectionLayout};
pub use contact::{ContactForm, ContactFormState, MessageRelay, RelayConfig, RelayError, SubmissionStatus};
pub use controller::{ControllerState, SectionController, ToggleAction, TogglePolicy};
pub use core::{ElementId, Property, PropertyMap, Rect, Viewport, props};
pub use ease::Ease;
pub use error::{RevealError, RevealResult};
pub use lifecycle::{Activation, LifecycleManager, SectionEvent, SectionKey, SectionSetup};
pub use loader::{LoaderPhase, LoadingDriver};
pub use page::{FrameReport, Page, PagePhase};
pub use render::{RenderLayer, Scene};
pub use scheduler::{FrameScheduler, Subscriber, TickId};
pub use theme::{MemoryThemeStore, Theme, ThemeStore};
pub use timeline::{Direction, Position, Timeline};
pub use tracker::{Anchor, EdgeEvent, EdgeNotice, TriggerBand, TriggerHandle, ViewportTracker};
