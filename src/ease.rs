use std::{fmt, str::FromStr};

use crate::error::{RevealError, RevealResult};

/// Easing curve applied to normalized step progress.
///
/// Names follow the conventional `family.direction` spelling (`"power3.out"`,
/// `"back.out(1.7)"`, `"power2.inOut"`). `powerN` maps onto the polynomial of
/// degree `N + 1`, so `power1` is quad and `power3` is quart.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Ease {
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InQuart,
    OutQuart,
    InOutQuart,
    OutSine,
    InOutSine,
    /// Overshoots past 1.0 before settling; `overshoot` is the usual 1.70158-style constant.
    OutBack { overshoot: f64 },
}

impl Ease {
    pub const DEFAULT_BACK_OVERSHOOT: f64 = 1.70158;

    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
            Self::InQuart => t.powi(4),
            Self::OutQuart => 1.0 - (1.0 - t).powi(4),
            Self::InOutQuart => {
                if t < 0.5 {
                    8.0 * t.powi(4)
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(4) / 2.0)
                }
            }
            Self::OutSine => (t * std::f64::consts::FRAC_PI_2).sin(),
            Self::InOutSine => -((std::f64::consts::PI * t).cos() - 1.0) / 2.0,
            Self::OutBack { overshoot } => {
                // Endpoints pinned: the cubic leaves rounding residue at both ends.
                if t <= 0.0 {
                    return 0.0;
                }
                if t >= 1.0 {
                    return 1.0;
                }
                let c1 = overshoot;
                let c3 = c1 + 1.0;
                let u = t - 1.0;
                1.0 + c3 * u.powi(3) + c1 * u.powi(2)
            }
        }
    }

    pub fn out_back() -> Self {
        Self::OutBack {
            overshoot: Self::DEFAULT_BACK_OVERSHOOT,
        }
    }
}

impl Default for Ease {
    /// `power1.out`, the conventional tween default.
    fn default() -> Self {
        Self::OutQuad
    }
}

impl FromStr for Ease {
    type Err = RevealError;

    fn from_str(s: &str) -> RevealResult<Self> {
        let s = s.trim();
        if s == "none" || s == "linear" {
            return Ok(Self::Linear);
        }

        let (family, rest) = s.split_once('.').unwrap_or((s, "out"));
        let (direction, arg) = match rest.split_once('(') {
            Some((dir, tail)) => {
                let raw = tail
                    .strip_suffix(')')
                    .ok_or_else(|| RevealError::validation(format!("unclosed ease argument in '{s}'")))?;
                let v: f64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| RevealError::validation(format!("bad ease argument in '{s}'")))?;
                (dir, Some(v))
            }
            None => (rest, None),
        };

        let ease = match (family, direction) {
            ("power0", _) => Self::Linear,
            ("power1" | "quad", "in") => Self::InQuad,
            ("power1" | "quad", "out") => Self::OutQuad,
            ("power1" | "quad", "inOut") => Self::InOutQuad,
            ("power2" | "cubic", "in") => Self::InCubic,
            ("power2" | "cubic", "out") => Self::OutCubic,
            ("power2" | "cubic", "inOut") => Self::InOutCubic,
            ("power3" | "quart", "in") => Self::InQuart,
            ("power3" | "quart", "out") => Self::OutQuart,
            ("power3" | "quart", "inOut") => Self::InOutQuart,
            ("sine", "out") => Self::OutSine,
            ("sine", "inOut") => Self::InOutSine,
            ("back", "out") => Self::OutBack {
                overshoot: arg.unwrap_or(Self::DEFAULT_BACK_OVERSHOOT),
            },
            _ => {
                return Err(RevealError::validation(format!("unknown ease '{s}'")));
            }
        };
        Ok(ease)
    }
}

impl fmt::Display for Ease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => f.write_str("none"),
            Self::InQuad => f.write_str("power1.in"),
            Self::OutQuad => f.write_str("power1.out"),
            Self::InOutQuad => f.write_str("power1.inOut"),
            Self::InCubic => f.write_str("power2.in"),
            Self::OutCubic => f.write_str("power2.out"),
            Self::InOutCubic => f.write_str("power2.inOut"),
            Self::InQuart => f.write_str("power3.in"),
            Self::OutQuart => f.write_str("power3.out"),
            Self::InOutQuart => f.write_str("power3.inOut"),
            Self::OutSine => f.write_str("sine.out"),
            Self::InOutSine => f.write_str("sine.inOut"),
            Self::OutBack { overshoot } => write!(f, "back.out({overshoot})"),
        }
    }
}
