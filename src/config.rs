use std::{collections::BTreeSet, fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use crate::{
    contact::RelayConfig,
    controller::TogglePolicy,
    core::Viewport,
    error::{RevealError, RevealResult},
    loader::DEFAULT_LOAD_DURATION,
    theme::Theme,
    tracker::TriggerBand,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Hero,
    About,
    Projects,
    Contact,
    Footer,
}

impl SectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::About => "about",
            Self::Projects => "projects",
            Self::Contact => "contact",
            Self::Footer => "footer",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = RevealError;

    fn from_str(s: &str) -> RevealResult<Self> {
        Ok(match s {
            "hero" => Self::Hero,
            "about" => Self::About,
            "projects" => Self::Projects,
            "contact" => Self::Contact,
            "footer" => Self::Footer,
            other => {
                return Err(RevealError::validation(format!("unknown section '{other}'")));
            }
        })
    }
}

/// Vertical placement of one section plus optional trigger overrides.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SectionLayout {
    pub kind: SectionKind,
    pub top: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerBand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<TogglePolicy>,
}

impl SectionLayout {
    pub fn new(kind: SectionKind, top: f64, height: f64) -> Self {
        Self {
            kind,
            top,
            height,
            trigger: None,
            policy: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

fn default_loader_duration() -> f64 {
    DEFAULT_LOAD_DURATION
}

/// Everything needed to assemble a page, as read from JSON.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PageConfig {
    pub viewport: ViewportSize,
    #[serde(default = "default_loader_duration")]
    pub loader_duration: f64,
    pub sections: Vec<SectionLayout>,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub theme: Theme,
}

impl PageConfig {
    /// The stock single-page portfolio layout.
    pub fn portfolio() -> Self {
        Self {
            viewport: ViewportSize {
                width: 1280.0,
                height: 800.0,
            },
            loader_duration: DEFAULT_LOAD_DURATION,
            sections: vec![
                SectionLayout::new(SectionKind::Hero, 0.0, 800.0),
                SectionLayout::new(SectionKind::About, 800.0, 900.0),
                SectionLayout::new(SectionKind::Projects, 1700.0, 1200.0),
                SectionLayout::new(SectionKind::Contact, 2900.0, 900.0),
                SectionLayout::new(SectionKind::Footer, 3800.0, 200.0),
            ],
            relay: RelayConfig::default(),
            theme: Theme::default(),
        }
    }

    pub fn from_reader<R: std::io::Read>(r: R) -> RevealResult<Self> {
        let config: Self = serde_json::from_reader(r)
            .map_err(|e| RevealError::serde(format!("parse page config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> RevealResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            RevealError::validation(format!("open page config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn viewport(&self) -> RevealResult<Viewport> {
        Viewport::new(self.viewport.width, self.viewport.height)
    }

    pub fn validate(&self) -> RevealResult<()> {
        self.viewport()?;
        if !self.loader_duration.is_finite() || self.loader_duration <= 0.0 {
            return Err(RevealError::validation(format!(
                "loader_duration must be finite and > 0, got {}",
                self.loader_duration
            )));
        }
        let mut seen = BTreeSet::new();
        for s in &self.sections {
            if !seen.insert(s.kind) {
                return Err(RevealError::validation(format!(
                    "section '{}' is declared twice",
                    s.kind
                )));
            }
            if !s.top.is_finite() || s.top < 0.0 {
                return Err(RevealError::validation(format!(
                    "section '{}' top must be finite and >= 0",
                    s.kind
                )));
            }
            if !s.height.is_finite() || s.height <= 0.0 {
                return Err(RevealError::validation(format!(
                    "section '{}' height must be finite and > 0",
                    s.kind
                )));
            }
        }
        Ok(())
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self::portfolio()
    }
}
