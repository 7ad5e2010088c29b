/// Timing curves for the overlay and scroll animations.
///
/// `OutQuint` matches the `cubic-bezier(0.22, 1, 0.36, 1)` curve the stage transitions use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    #[default]
    Linear,
    OutQuint,
}

impl Ease {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::OutQuint => 1.0 - (1.0 - t).powi(5),
        }
    }

    /// Interpolate `from -> to` at progress `t` (clamped).
    pub fn lerp(self, from: f64, to: f64, t: f64) -> f64 {
        from + (to - from) * self.apply(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Ease; 2] = [Ease::Linear, Ease::OutQuint];

    #[test]
    fn endpoints_are_stable() {
        for ease in ALL {
            assert_eq!(ease.apply(0.0), 0.0);
            assert_eq!(ease.apply(1.0), 1.0);
            assert_eq!(ease.apply(-4.0), 0.0);
            assert_eq!(ease.apply(9.0), 1.0);
        }
    }

    #[test]
    fn monotonic_spot_check() {
        for ease in ALL {
            let a = ease.apply(0.25);
            let b = ease.apply(0.5);
            let c = ease.apply(0.75);
            assert!(a < b);
            assert!(b < c);
        }
    }

    #[test]
    fn out_quint_front_loads_motion() {
        assert!(Ease::OutQuint.apply(0.3) > Ease::Linear.apply(0.3));
        assert_eq!(Ease::Linear.lerp(1.0, 0.0, 0.25), 0.75);
    }
}
