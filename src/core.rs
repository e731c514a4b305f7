use std::{collections::BTreeMap, fmt, str::FromStr};

use slotmap::{Key, new_key_type};

use crate::error::{RevealError, RevealResult};

pub use kurbo::Rect;

new_key_type! {
    /// Non-owning reference to an element of the render layer. The null key
    /// never resolves to a mounted element.
    pub struct ElementId;
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:?}", self.data())
    }
}

/// `n` distinct ids that belong to no scene.
#[cfg(test)]
pub(crate) fn detached_ids(n: usize) -> Vec<ElementId> {
    let mut keys = slotmap::SlotMap::<ElementId, ()>::with_key();
    (0..n).map(|_| keys.insert(())).collect()
}

/// Numeric visual properties the sequencer is allowed to drive.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Opacity,
    X,
    Y,
    Scale,
    Rotation,
    Blur,
    /// Horizontal offset as a percentage of the element's own width.
    XPercent,
}

impl Property {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opacity => "opacity",
            Self::X => "x",
            Self::Y => "y",
            Self::Scale => "scale",
            Self::Rotation => "rotation",
            Self::Blur => "blur",
            Self::XPercent => "x_percent",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Property {
    type Err = RevealError;

    fn from_str(s: &str) -> RevealResult<Self> {
        Ok(match s {
            "opacity" => Self::Opacity,
            "x" => Self::X,
            "y" => Self::Y,
            "scale" => Self::Scale,
            "rotation" => Self::Rotation,
            "blur" => Self::Blur,
            "x_percent" | "xPercent" => Self::XPercent,
            other => {
                return Err(RevealError::validation(format!("unknown property '{other}'")));
            }
        })
    }
}

/// Ordered property -> value map used for step start and end states.
pub type PropertyMap = BTreeMap<Property, f64>;

/// Builds a `PropertyMap` from `(property, value)` pairs.
pub fn props<const N: usize>(pairs: [(Property, f64); N]) -> PropertyMap {
    pairs.into_iter().collect()
}

/// Visible window over the document, in document coordinates.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    pub scroll_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> RevealResult<Self> {
        if !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite() {
            return Err(RevealError::validation("viewport width/height must be > 0"));
        }
        Ok(Self {
            scroll_y: 0.0,
            width,
            height,
        })
    }

    pub fn visible_rect(&self) -> Rect {
        Rect::new(0.0, self.scroll_y, self.width, self.scroll_y + self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_rejects_degenerate_sizes() {
        assert!(Viewport::new(0.0, 800.0).is_err());
        assert!(Viewport::new(1280.0, -1.0).is_err());
        assert!(Viewport::new(f64::NAN, 800.0).is_err());
        let v = Viewport::new(1280.0, 800.0).unwrap();
        assert_eq!(v.scroll_y, 0.0);
    }

    #[test]
    fn visible_rect_follows_scroll() {
        let mut v = Viewport::new(100.0, 50.0).unwrap();
        v.scroll_y = 200.0;
        let r = v.visible_rect();
        assert_eq!(r.y0, 200.0);
        assert_eq!(r.y1, 250.0);
    }

    #[test]
    fn property_names_parse() {
        for p in [
            Property::Opacity,
            Property::X,
            Property::Y,
            Property::Scale,
            Property::Rotation,
            Property::Blur,
            Property::XPercent,
        ] {
            assert_eq!(p.as_str().parse::<Property>().unwrap(), p);
        }
        assert!("color".parse::<Property>().is_err());
    }

    #[test]
    fn element_ids_are_distinct_and_printable() {
        let ids = detached_ids(3);
        assert_ne!(ids[0], ids[1]);
        assert!(ids[0] < ids[2]);
        assert!(ElementId::default().is_null());
        assert!(ids[1].to_string().starts_with('#'));
    }
}
