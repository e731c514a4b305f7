use std::cell::Cell;

use reveal::{
    ContactForm, ControllerState, EdgeEvent, MessageRelay, Page, PageConfig, PagePhase, Property,
    RelayConfig, RelayError, SectionEvent, SubmissionStatus, Theme, contact::Field,
};

const DT: f64 = 1.0 / 60.0;

fn fixture_config() -> PageConfig {
    PageConfig::from_path("tests/data/page.json").unwrap()
}

fn run(page: &mut Page, seconds: f64) -> Vec<reveal::FrameReport> {
    let frames = (seconds / DT).ceil() as usize;
    (0..frames).map(|_| page.frame(DT)).collect()
}

#[test]
fn fixture_config_loads() {
    let config = fixture_config();
    assert_eq!(config.loader_duration, 1.0);
    assert_eq!(config.theme, Theme::Dark);
    assert_eq!(config.relay.service_id, "service_portfolio");
    assert_eq!(config.sections.len(), 5);
}

#[test]
fn sections_mount_after_the_loader_finishes() {
    let mut page = Page::new(fixture_config()).unwrap();
    assert_eq!(page.theme(), Theme::Dark);

    // 1s fill + 0.5s fade.
    let reports = run(&mut page, 1.4);
    assert!(reports.iter().all(|r| !r.loaded));
    assert_eq!(page.phase(), PagePhase::Loading);
    assert_eq!(page.section_state("about"), None);

    let reports = run(&mut page, 0.3);
    assert_eq!(reports.iter().filter(|r| r.loaded).count(), 1);
    assert_eq!(page.phase(), PagePhase::Content);
    for name in ["hero", "about", "projects.title", "projects.cards", "contact"] {
        assert!(page.section_state(name).is_some(), "{name} not mounted");
    }
}

#[test]
fn scroll_through_the_page() {
    let mut page = Page::new(fixture_config()).unwrap();
    run(&mut page, 2.0);

    page.scroll_to(1200.0);
    let reports = run(&mut page, 3.0);
    let edges: Vec<(&str, EdgeEvent)> = reports
        .iter()
        .flat_map(|r| &r.events)
        .filter_map(|e| match e {
            SectionEvent::Edge { section, event } => Some((section.as_str(), *event)),
            SectionEvent::Transition { .. } => None,
        })
        .collect();
    assert!(edges.contains(&("about", EdgeEvent::EnteredGoingDown)));
    assert!(edges.contains(&("projects.title", EdgeEvent::EnteredGoingDown)));
    assert_eq!(page.section_state("about"), Some(ControllerState::Entered));
    assert_eq!(page.section_state("projects.title"), Some(ControllerState::Entered));
    assert_eq!(page.section_state("contact"), Some(ControllerState::Idle));

    let card = page.scene().find("projects.card.0").unwrap();
    assert_eq!(page.scene().property(card, Property::Opacity), Some(0.0));

    page.scroll_to(0.0);
    run(&mut page, 4.0);
    assert_eq!(page.section_state("about"), Some(ControllerState::Idle));
    // Project heading plays once and stays.
    assert_eq!(page.section_state("projects.title"), Some(ControllerState::Entered));
    assert!(!page.is_nav_scrolled());
}

struct CountingRelay {
    calls: Cell<usize>,
    fail: bool,
}

impl MessageRelay for CountingRelay {
    fn send(&self, config: &RelayConfig, form: &ContactForm) -> Result<(), RelayError> {
        self.calls.set(self.calls.get() + 1);
        assert_eq!(config.template_id, "template_contact");
        assert_eq!(form.email, "grace@example.com");
        if self.fail {
            Err(RelayError::Rejected("quota exceeded".into()))
        } else {
            Ok(())
        }
    }
}

#[test]
fn contact_submission_uses_configured_relay() {
    let mut page = Page::new(fixture_config()).unwrap();
    let fill = |page: &mut Page| {
        page.contact().set(Field::Name, "Grace");
        page.contact().set(Field::Email, "grace@example.com");
        page.contact().set(Field::Message, "Let's talk");
    };

    let failing = CountingRelay {
        calls: Cell::new(0),
        fail: true,
    };
    fill(&mut page);
    assert!(matches!(
        page.submit_contact(&failing),
        SubmissionStatus::Failed(_)
    ));
    assert_eq!(failing.calls.get(), 1);
    assert_eq!(page.contact().form().name, "Grace");

    let ok = CountingRelay {
        calls: Cell::new(0),
        fail: false,
    };
    assert_eq!(page.submit_contact(&ok), SubmissionStatus::Sent);
    assert_eq!(page.contact().form(), &ContactForm::default());
}
