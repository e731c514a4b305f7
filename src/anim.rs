use crate::{
    core::{ElementId, Property, PropertyMap},
    ease::Ease,
    error::{RevealError, RevealResult},
};

pub trait Lerp: Sized {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

/// Target-less description of a property transition: start state, end state,
/// duration in seconds and easing curve.
///
/// `from` and `to` must name the same properties.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tween {
    from: PropertyMap,
    to: PropertyMap,
    duration: f64,
    ease: Ease,
}

impl Tween {
    pub fn new(from: PropertyMap, to: PropertyMap, duration: f64, ease: Ease) -> RevealResult<Self> {
        let tween = Self {
            from,
            to,
            duration,
            ease,
        };
        tween.validate()?;
        Ok(tween)
    }

    pub fn validate(&self) -> RevealResult<()> {
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(RevealError::timeline(format!(
                "step duration must be finite and > 0 (got {})",
                self.duration
            )));
        }
        if self.to.is_empty() {
            return Err(RevealError::timeline("step must animate at least one property"));
        }
        if !self.from.keys().eq(self.to.keys()) {
            return Err(RevealError::timeline(
                "step start and end states must name the same properties",
            ));
        }
        if self
            .from
            .values()
            .chain(self.to.values())
            .any(|v| !v.is_finite())
        {
            return Err(RevealError::timeline("step values must be finite"));
        }
        Ok(())
    }

    /// Binds the tween to an element.
    pub fn on(self, target: ElementId) -> Step {
        Step {
            target,
            tween: self,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

/// A tween bound to one element. Immutable once built.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Step {
    target: ElementId,
    tween: Tween,
}

impl Step {
    pub fn new(
        target: ElementId,
        from: PropertyMap,
        to: PropertyMap,
        duration: f64,
        ease: Ease,
    ) -> RevealResult<Self> {
        Ok(Tween::new(from, to, duration, ease)?.on(target))
    }

    pub fn target(&self) -> ElementId {
        self.target
    }

    pub fn duration(&self) -> f64 {
        self.tween.duration
    }

    pub fn properties(&self) -> impl Iterator<Item = Property> + '_ {
        self.tween.to.keys().copied()
    }

    /// Value of `prop` at `local_t` seconds into the step.
    ///
    /// Exactly the start value at `local_t <= 0` and exactly the end value at
    /// `local_t >= duration`.
    pub fn value_at(&self, prop: Property, local_t: f64) -> Option<f64> {
        let from = *self.tween.from.get(&prop)?;
        let to = *self.tween.to.get(&prop)?;
        if local_t <= 0.0 {
            return Some(from);
        }
        if local_t >= self.tween.duration {
            return Some(to);
        }
        let te = self.tween.ease.apply(local_t / self.tween.duration);
        Some(f64::lerp(&from, &to, te))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::props;

    fn fade_up() -> Tween {
        Tween::new(
            props([(Property::Opacity, 0.0), (Property::Y, 40.0)]),
            props([(Property::Opacity, 1.0), (Property::Y, 0.0)]),
            2.0,
            Ease::Linear,
        )
        .unwrap()
    }

    #[test]
    fn endpoints_are_exact() {
        let step = fade_up().on(ElementId::default());
        assert_eq!(step.value_at(Property::Opacity, -1.0), Some(0.0));
        assert_eq!(step.value_at(Property::Opacity, 0.0), Some(0.0));
        assert_eq!(step.value_at(Property::Y, 2.0), Some(0.0));
        assert_eq!(step.value_at(Property::Y, 5.0), Some(0.0));
        assert_eq!(step.value_at(Property::Scale, 1.0), None);
    }

    #[test]
    fn interpolates_with_ease() {
        let step = fade_up().on(ElementId::default());
        assert_eq!(step.value_at(Property::Opacity, 1.0), Some(0.5));
        assert_eq!(step.value_at(Property::Y, 1.0), Some(20.0));

        let eased = Step::new(
            ElementId::default(),
            props([(Property::Opacity, 0.0)]),
            props([(Property::Opacity, 1.0)]),
            1.0,
            Ease::OutCubic,
        )
        .unwrap();
        assert!(eased.value_at(Property::Opacity, 0.5).unwrap() > 0.5);
    }

    #[test]
    fn rejects_malformed_tweens() {
        let one = || props([(Property::Opacity, 1.0)]);
        assert!(Tween::new(one(), one(), 0.0, Ease::Linear).is_err());
        assert!(Tween::new(one(), one(), f64::INFINITY, Ease::Linear).is_err());
        assert!(Tween::new(PropertyMap::new(), PropertyMap::new(), 1.0, Ease::Linear).is_err());
        assert!(
            Tween::new(
                props([(Property::Scale, 0.9)]),
                one(),
                1.0,
                Ease::Linear
            )
            .is_err()
        );
        assert!(
            Tween::new(
                props([(Property::Opacity, f64::NAN)]),
                one(),
                1.0,
                Ease::Linear
            )
            .is_err()
        );
    }
}
