//! Decay curves for knockback falloff.

use serde::{Deserialize, Serialize};
use visage_common::{ContentError, ContentResult};

/// One authored point on a keyframed curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    /// Normalized time in `[0, 1]`.
    pub time: f32,
    /// Factor at that time.
    pub value: f32,
}

impl CurveKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// Maps normalized elapsed time to a push factor, 1 at the start and 0 at the end.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "keys")]
pub enum DecayCurve {
    /// `1 - t`
    #[default]
    Linear,
    /// `(1 - t)^2`
    Quadratic,
    /// Piecewise linear through authored keys.
    Keyframes(Vec<CurveKey>),
}

impl DecayCurve {
    /// Evaluates at `t`, clamped to `[0, 1]`.
    #[must_use]
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => 1.0 - t,
            Self::Quadratic => (1.0 - t) * (1.0 - t),
            Self::Keyframes(keys) => evaluate_keys(keys, t),
        }
    }

    /// Keyframed curves must start at `(0, 1)`, end at `(1, 0)` and strictly
    /// decrease in between.
    pub fn validate(&self) -> ContentResult<()> {
        let Self::Keyframes(keys) = self else {
            return Ok(());
        };
        let invalid = |reason: &str| ContentError::InvalidValue {
            field: "stagger_curve",
            reason: reason.to_string(),
        };
        let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
            return Err(invalid("needs at least two keys"));
        };
        if keys.len() < 2 {
            return Err(invalid("needs at least two keys"));
        }
        if first.time != 0.0 || first.value != 1.0 {
            return Err(invalid("must start at (0, 1)"));
        }
        if last.time != 1.0 || last.value != 0.0 {
            return Err(invalid("must end at (1, 0)"));
        }
        for pair in keys.windows(2) {
            if pair[1].time <= pair[0].time {
                return Err(invalid("key times must increase"));
            }
            if pair[1].value >= pair[0].value {
                return Err(invalid("key values must strictly decrease"));
            }
        }
        Ok(())
    }
}

fn evaluate_keys(keys: &[CurveKey], t: f32) -> f32 {
    let Some(first) = keys.first() else {
        return 0.0;
    };
    if t <= first.time {
        return first.value;
    }
    for pair in keys.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.time {
            let span = b.time - a.time;
            if span <= 0.0 {
                return b.value;
            }
            let f = (t - a.time) / span;
            return a.value + (b.value - a.value) * f;
        }
    }
    keys.last().map_or(0.0, |k| k.value)
}
