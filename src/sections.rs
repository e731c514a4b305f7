//! Element layout and entrance choreography for each portfolio section.
//!
//! [`build_elements`] mounts a section's named elements into a [`Scene`];
//! [`choreography`] looks those names back up and builds the timelines, so a
//! scene missing an element fails with `MissingTarget` instead of animating
//! half a section.

use crate::{
    anim::{Step, Tween},
    config::{SectionKind, SectionLayout},
    controller::TogglePolicy,
    core::{ElementId, Rect, props},
    ease::Ease,
    error::RevealResult,
    lifecycle::{Activation, SectionSetup},
    render::Scene,
    timeline::{Position, Timeline},
    tracker::TriggerBand,
};

use crate::core::Property::{Blur, Opacity, Rotation, Scale, X, Y};

pub const HERO_PARTICLES: usize = 20;
pub const ABOUT_PARAGRAPHS: usize = 3;
pub const ABOUT_SKILLS: usize = 8;
pub const PROJECT_CARDS: usize = 6;
pub const CONTACT_FIELDS: usize = 4;
pub const CONTACT_SOCIALS: usize = 3;

const POWER2_OUT: Ease = Ease::OutCubic;
const POWER3_OUT: Ease = Ease::OutQuart;
const BACK_OUT: Ease = Ease::OutBack { overshoot: 1.7 };

/// Horizontal strip of `parent` between fractions `from..to` of its height.
fn slice(parent: Rect, from: f64, to: f64) -> Rect {
    let h = parent.height();
    Rect::new(parent.x0, parent.y0 + h * from, parent.x1, parent.y0 + h * to)
}

/// Cell `index` of `count` equal columns across `parent`.
fn column(parent: Rect, index: usize, count: usize) -> Rect {
    let w = parent.width() / count.max(1) as f64;
    let x0 = parent.x0 + w * index as f64;
    Rect::new(x0, parent.y0, x0 + w, parent.y1)
}

fn add_row(
    scene: &mut Scene,
    parent: ElementId,
    rect: Rect,
    prefix: &str,
    count: usize,
) -> RevealResult<()> {
    for i in 0..count {
        scene.add_child(parent, format!("{prefix}.{i}"), column(rect, i, count))?;
    }
    Ok(())
}

/// Mounts the section's elements under a root named after its kind.
pub fn build_elements(scene: &mut Scene, layout: &SectionLayout, width: f64) -> RevealResult<ElementId> {
    let rect = Rect::new(0.0, layout.top, width, layout.top + layout.height);
    let root = scene.add_root(layout.kind.as_str(), rect)?;

    match layout.kind {
        SectionKind::Hero => {
            scene.add_child(root, "hero.title", slice(rect, 0.30, 0.45))?;
            scene.add_child(root, "hero.subtitle", slice(rect, 0.45, 0.55))?;
            scene.add_child(root, "hero.cta", slice(rect, 0.60, 0.68))?;
            let particles = scene.add_child(root, "hero.particles", rect)?;
            add_row(scene, particles, slice(rect, 0.85, 0.90), "hero.particle", HERO_PARTICLES)?;
        }
        SectionKind::About => {
            let body = slice(rect, 0.15, 0.85);
            scene.add_child(root, "about.image", column(body, 0, 2))?;
            let text = column(body, 1, 2);
            let content = scene.add_child(root, "about.content", slice(text, 0.0, 0.6))?;
            add_row(scene, content, slice(text, 0.0, 0.6), "about.paragraph", ABOUT_PARAGRAPHS)?;
            let skills = scene.add_child(root, "about.skills", slice(text, 0.7, 1.0))?;
            add_row(scene, skills, slice(text, 0.7, 1.0), "about.skill", ABOUT_SKILLS)?;
        }
        SectionKind::Projects => {
            scene.add_child(root, "projects.title", slice(rect, 0.05, 0.15))?;
            let grid = slice(rect, 0.2, 0.95);
            let cards = scene.add_child(root, "projects.cards", grid)?;
            add_row(scene, cards, grid, "projects.card", PROJECT_CARDS)?;
        }
        SectionKind::Contact => {
            let form_rect = slice(rect, 0.2, 0.7);
            let form = scene.add_child(root, "contact.form", form_rect)?;
            add_row(scene, form, form_rect, "contact.field", CONTACT_FIELDS)?;
            let socials_rect = slice(rect, 0.75, 0.85);
            let socials = scene.add_child(root, "contact.socials", socials_rect)?;
            add_row(scene, socials, socials_rect, "contact.social", CONTACT_SOCIALS)?;
        }
        SectionKind::Footer => {}
    }
    Ok(root)
}

/// Children of `name`, failing when the element is missing.
fn members(scene: &Scene, name: &str) -> RevealResult<Vec<ElementId>> {
    Ok(scene.children(scene.require(name)?).to_vec())
}

fn scroll(
    layout: &SectionLayout,
    region: ElementId,
    entry: &str,
    exit: Option<&str>,
) -> RevealResult<Activation> {
    let band = match layout.trigger {
        Some(band) => band,
        None => {
            let mut band = TriggerBand::new(entry.parse()?, TriggerBand::default_exit());
            if let Some(exit) = exit {
                band.exit = exit.parse()?;
            }
            band
        }
    };
    Ok(Activation::Scroll { region, band })
}

/// Builds the timelines for a section mounted by [`build_elements`]. Sections
/// without an entrance animation yield nothing.
pub fn choreography(scene: &Scene, layout: &SectionLayout) -> RevealResult<Vec<SectionSetup>> {
    match layout.kind {
        SectionKind::Hero => hero(scene, layout).map(|s| vec![s]),
        SectionKind::About => about(scene, layout).map(|s| vec![s]),
        SectionKind::Projects => projects(scene, layout),
        SectionKind::Contact => contact(scene, layout).map(|s| vec![s]),
        SectionKind::Footer => Ok(Vec::new()),
    }
}

fn hero(scene: &Scene, layout: &SectionLayout) -> RevealResult<SectionSetup> {
    let mut tl = Timeline::new();
    tl.append(
        Step::new(
            scene.require("hero.title")?,
            props([(Opacity, 0.0), (Y, 40.0), (Blur, 8.0)]),
            props([(Opacity, 1.0), (Y, 0.0), (Blur, 0.0)]),
            1.2,
            POWER3_OUT,
        )?,
        Position::Absolute(0.5),
    )?;
    tl.append(
        Step::new(
            scene.require("hero.subtitle")?,
            props([(Opacity, 0.0), (Y, 30.0), (Blur, 4.0)]),
            props([(Opacity, 1.0), (Y, 0.0), (Blur, 0.0)]),
            1.0,
            POWER3_OUT,
        )?,
        Position::OverlapPrevious(0.8),
    )?;
    tl.append(
        Step::new(
            scene.require("hero.cta")?,
            props([(Opacity, 0.0), (Y, 20.0), (Scale, 0.9)]),
            props([(Opacity, 1.0), (Y, 0.0), (Scale, 1.0)]),
            0.8,
            BACK_OUT,
        )?,
        Position::OverlapPrevious(0.6),
    )?;

    // Particles drift in independently of the text, from the very start.
    let mut particles = Timeline::new();
    particles.stagger(
        &Tween::new(props([(Opacity, 0.0)]), props([(Opacity, 0.6)]), 2.0, POWER2_OUT)?,
        &members(scene, "hero.particles")?,
        0.2,
        Position::default(),
    )?;
    tl.append(particles, Position::Absolute(0.0))?;

    Ok(SectionSetup {
        name: "hero".to_string(),
        timeline: tl,
        policy: layout.policy.unwrap_or_else(TogglePolicy::once),
        activation: Activation::Immediate,
    })
}

fn about(scene: &Scene, layout: &SectionLayout) -> RevealResult<SectionSetup> {
    let region = scene.require("about")?;
    let mut tl = Timeline::new();
    tl.append(
        Step::new(
            scene.require("about.image")?,
            props([(Opacity, 0.0), (X, -50.0), (Rotation, -5.0)]),
            props([(Opacity, 1.0), (X, 0.0), (Rotation, 0.0)]),
            1.0,
            POWER3_OUT,
        )?,
        Position::default(),
    )?;
    tl.stagger(
        &Tween::new(
            props([(Opacity, 0.0), (Y, 30.0)]),
            props([(Opacity, 1.0), (Y, 0.0)]),
            0.8,
            POWER3_OUT,
        )?,
        &members(scene, "about.content")?,
        0.2,
        Position::OverlapPrevious(0.5),
    )?;
    tl.stagger(
        &Tween::new(
            props([(Opacity, 0.0), (Scale, 0.8)]),
            props([(Opacity, 1.0), (Scale, 1.0)]),
            0.6,
            BACK_OUT,
        )?,
        &members(scene, "about.skills")?,
        0.1,
        Position::OverlapPrevious(0.4),
    )?;

    Ok(SectionSetup {
        name: "about".to_string(),
        timeline: tl,
        policy: layout.policy.unwrap_or_default(),
        activation: scroll(layout, region, "top 80%", Some("bottom 20%"))?,
    })
}

/// The heading and the card grid trigger separately and play once each. A
/// configured trigger band applies to the heading only.
fn projects(scene: &Scene, layout: &SectionLayout) -> RevealResult<Vec<SectionSetup>> {
    let region = scene.require("projects")?;
    let cards = scene.require("projects.cards")?;
    let policy = layout.policy.unwrap_or_else(TogglePolicy::once);

    let mut title = Timeline::new();
    title.append(
        Step::new(
            scene.require("projects.title")?,
            props([(Opacity, 0.0), (Y, 50.0)]),
            props([(Opacity, 1.0), (Y, 0.0)]),
            1.0,
            POWER3_OUT,
        )?,
        Position::default(),
    )?;

    let mut grid = Timeline::new();
    grid.stagger(
        &Tween::new(
            props([(Opacity, 0.0), (Y, 60.0), (Scale, 0.9)]),
            props([(Opacity, 1.0), (Y, 0.0), (Scale, 1.0)]),
            0.8,
            POWER3_OUT,
        )?,
        scene.children(cards),
        0.2,
        Position::default(),
    )?;

    Ok(vec![
        SectionSetup {
            name: "projects.title".to_string(),
            timeline: title,
            policy,
            activation: scroll(layout, region, "top 85%", None)?,
        },
        SectionSetup {
            name: "projects.cards".to_string(),
            timeline: grid,
            policy,
            activation: Activation::Scroll {
                region: cards,
                band: TriggerBand::new("top 80%".parse()?, TriggerBand::default_exit()),
            },
        },
    ])
}

fn contact(scene: &Scene, layout: &SectionLayout) -> RevealResult<SectionSetup> {
    let region = scene.require("contact")?;
    let mut tl = Timeline::new();
    tl.stagger(
        &Tween::new(
            props([(Opacity, 0.0), (Y, 40.0)]),
            props([(Opacity, 1.0), (Y, 0.0)]),
            0.8,
            POWER3_OUT,
        )?,
        &members(scene, "contact.form")?,
        0.2,
        Position::default(),
    )?;
    tl.stagger(
        &Tween::new(
            props([(Opacity, 0.0), (Scale, 0.8)]),
            props([(Opacity, 1.0), (Scale, 1.0)]),
            0.6,
            BACK_OUT,
        )?,
        &members(scene, "contact.socials")?,
        0.1,
        Position::OverlapPrevious(0.4),
    )?;

    Ok(SectionSetup {
        name: "contact".to_string(),
        timeline: tl,
        policy: layout.policy.unwrap_or_default(),
        activation: scroll(layout, region, "top 80%", None)?,
    })
}
