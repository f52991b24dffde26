use serde::Serialize;

/// Named color ramps understood by both plotly.js and the native renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorScale {
    /// Perceptually ordered rainbow (Mikhailov 2019).
    Turbo,
}

impl ColorScale {
    fn gradient(self) -> colorous::Gradient {
        match self {
            ColorScale::Turbo => colorous::TURBO,
        }
    }

    /// Sample the ramp at `t` in [0, 1] (clamped).
    pub fn sample(self, t: f64) -> [u8; 3] {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let c = self.gradient().eval_continuous(t);
        [c.r, c.g, c.b]
    }

    /// Map `value` through the ramp over `[cmin, cmax]`. Non-finite values
    /// have no color.
    pub fn map(self, value: f64, cmin: f64, cmax: f64) -> Option<[u8; 3]> {
        if !value.is_finite() {
            return None;
        }
        let span = cmax - cmin;
        let t = if span.abs() > f64::EPSILON { (value - cmin) / span } else { 0.5 };
        Some(self.sample(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turbo_endpoints() {
        // Blue near the low end, red near the high end.
        let low = ColorScale::Turbo.sample(0.1);
        let high = ColorScale::Turbo.sample(0.9);
        assert!(low[2] > low[0]);
        assert!(high[0] > high[2]);
    }

    #[test]
    fn test_turbo_clamps() {
        assert_eq!(ColorScale::Turbo.sample(-3.0), ColorScale::Turbo.sample(0.0));
        assert_eq!(ColorScale::Turbo.sample(7.0), ColorScale::Turbo.sample(1.0));
    }

    #[test]
    fn test_nan_position_samples_low_end() {
        let c = colorous::TURBO.eval_continuous(0.0);
        assert_eq!(ColorScale::Turbo.sample(f64::NAN), [c.r, c.g, c.b]);
        let mid = colorous::TURBO.eval_continuous(0.25);
        assert_eq!(ColorScale::Turbo.sample(0.25), [mid.r, mid.g, mid.b]);
    }

    #[test]
    fn test_map_nan_has_no_color() {
        assert!(ColorScale::Turbo.map(f64::NAN, 0.0, 1.0).is_none());
        assert_eq!(
            ColorScale::Turbo.map(2.0, 2.0, 2.0),
            Some(ColorScale::Turbo.sample(0.5))
        );
    }
}
