//! Fade envelopes and curve shapes.
//!
//! An envelope holds `vol_start` from `pre` up to `start`, moves towards
//! `vol_end` between `start` and `end`, then holds `vol_end` until `post`.
//! Outside `[pre, post)` the envelope does not apply at all, which lets
//! several fades on the same lane take turns without multiplying together.
//!
//! Curves are written for the fade-in direction. Fade-outs reverse the index
//! and mirror the gain, so every shape keeps its "normal" look both ways and
//! some shapes end up complementary (exponential in ~ logarithmic out).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Attenuation factor for the exponential shapes: `ln(10) * 2.5`, i.e. the
/// curve starts 2.5 decades below full scale.
pub const EXPONENTIAL_FACTOR: f32 = 5.756_463;

/// Curve applied to the normalized fade index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FadeShape {
    /// Linear ramp, sharper fades.
    #[default]
    Triangular,
    /// Closer to the natural decay of a sound; good for fade-outs.
    Exponential,
    /// Inverse of exponential.
    Logarithmic,
    /// Raised cosine, for musical crossfades.
    RaisedCosine,
    /// Quarter of a sine wave.
    QuarterSine,
    /// Parabola.
    Parabola,
    /// Inverted parabola.
    InvertedParabola,
}

impl FadeShape {
    /// Resolve a one-character shape code.
    ///
    /// `{`/`}` and `(`/`)` are accepted as aliases of exponential and raised
    /// cosine. Unknown codes fall back to triangular.
    pub fn from_code(code: char) -> Self {
        match code {
            'E' | '{' | '}' => FadeShape::Exponential,
            'L' => FadeShape::Logarithmic,
            'H' | '(' | ')' => FadeShape::RaisedCosine,
            'Q' => FadeShape::QuarterSine,
            'p' => FadeShape::Parabola,
            'P' => FadeShape::InvertedParabola,
            _ => FadeShape::Triangular,
        }
    }

    /// One-character code for this shape.
    pub fn code(self) -> char {
        match self {
            FadeShape::Triangular => 'T',
            FadeShape::Exponential => 'E',
            FadeShape::Logarithmic => 'L',
            FadeShape::RaisedCosine => 'H',
            FadeShape::QuarterSine => 'Q',
            FadeShape::Parabola => 'p',
            FadeShape::InvertedParabola => 'P',
        }
    }

    /// Map a normalized index in `[0, 1]` to a gain in `[0, 1]`.
    pub fn apply(self, index: f32) -> f32 {
        match self {
            FadeShape::Triangular => index,
            FadeShape::Exponential => (-EXPONENTIAL_FACTOR * (1.0 - index)).exp(),
            FadeShape::Logarithmic => 1.0 - (-EXPONENTIAL_FACTOR * index).exp(),
            FadeShape::RaisedCosine => (1.0 - (index * std::f32::consts::PI).cos()) / 2.0,
            FadeShape::QuarterSine => (index * std::f32::consts::FRAC_PI_2).sin(),
            FadeShape::Parabola => 1.0 - (1.0 - index).sqrt(),
            FadeShape::InvertedParabola => 1.0 - (1.0 - index) * (1.0 - index),
        }
    }
}

impl TryFrom<String> for FadeShape {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        let mut chars = trimmed.chars();
        if let (Some(code), None) = (chars.next(), chars.next()) {
            return Ok(FadeShape::from_code(code));
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "triangular" | "linear" => Ok(FadeShape::Triangular),
            "exponential" => Ok(FadeShape::Exponential),
            "logarithmic" => Ok(FadeShape::Logarithmic),
            "raised_cosine" | "cosine" => Ok(FadeShape::RaisedCosine),
            "quarter_sine" | "sine" => Ok(FadeShape::QuarterSine),
            "parabola" => Ok(FadeShape::Parabola),
            "inverted_parabola" => Ok(FadeShape::InvertedParabola),
            _ => Err(format!("unknown fade shape \"{}\"", value)),
        }
    }
}

impl From<FadeShape> for String {
    fn from(value: FadeShape) -> Self {
        value.code().to_string()
    }
}

impl fmt::Display for FadeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Time-windowed gain ramp. Positions are absolute sample positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeEnvelope {
    pub vol_start: f32,
    pub vol_end: f32,
    pub shape: FadeShape,
    /// `None` means "from the beginning of the stream".
    pub pre: Option<i64>,
    pub start: i64,
    pub end: i64,
    /// `None` means "until the end of the stream".
    pub post: Option<i64>,
}

impl FadeEnvelope {
    /// Check `pre <= start <= end <= post` with non-negative `start`/`end`.
    pub fn is_well_formed(&self) -> bool {
        if self.start < 0 || self.end < 0 || self.start > self.end {
            return false;
        }
        if matches!(self.pre, Some(pre) if pre > self.start) {
            return false;
        }
        !matches!(self.post, Some(post) if self.end > post)
    }

    /// First and one-past-last sample this envelope can touch.
    pub fn active_window(&self) -> (i64, i64) {
        (self.pre.unwrap_or(0), self.post.unwrap_or(i64::MAX))
    }

    /// Gain at `pos`, or `None` when `pos` lies outside `[pre, post)`.
    pub fn gain_at(&self, pos: i64) -> Option<f32> {
        let before = pos < self.start && self.pre.map_or(true, |pre| pos >= pre);
        if before {
            return Some(self.vol_start);
        }

        let after = pos >= self.end && self.post.map_or(true, |post| pos < post);
        if after {
            return Some(self.vol_end);
        }

        if pos < self.start || pos >= self.end {
            return None;
        }

        let fade_in = self.vol_start < self.vol_end;
        let range_vol = self.vol_end - self.vol_start;
        let range_dur = (self.end - self.start) as f32;
        let index = if fade_in {
            (pos - self.start) as f32 / range_dur
        } else {
            (self.end - pos) as f32 / range_dur
        };

        let gain = self.shape.apply(index);
        if fade_in {
            Some(self.vol_start + range_vol * gain)
        } else {
            Some(self.vol_end - range_vol * gain)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps
    }

    fn fade_out(shape: FadeShape) -> FadeEnvelope {
        FadeEnvelope {
            vol_start: 1.0,
            vol_end: 0.0,
            shape,
            pre: None,
            start: 0,
            end: 100,
            post: None,
        }
    }

    #[test]
    fn triangular_is_identity() {
        for index in [0.0_f32, 0.25, 0.5, 0.75, 1.0] {
            assert_eq!(FadeShape::Triangular.apply(index), index);
        }
    }

    #[test]
    fn exponential_endpoints() {
        let low = FadeShape::Exponential.apply(0.0);
        assert!(approx_eq(low, 0.003_16, 1e-4), "got {}", low);
        assert!(approx_eq(FadeShape::Exponential.apply(1.0), 1.0, 1e-6));
    }

    #[test]
    fn shape_gains_at_quarter_and_midpoint() {
        let cases = [
            (FadeShape::Exponential, 0.013_335, 0.056_234),
            (FadeShape::Logarithmic, 0.762_863, 0.943_766),
            (FadeShape::RaisedCosine, 0.146_447, 0.5),
            (FadeShape::QuarterSine, 0.382_683, 0.707_107),
            (FadeShape::Parabola, 0.133_975, 0.292_893),
            (FadeShape::InvertedParabola, 0.4375, 0.75),
        ];
        for (shape, quarter, half) in cases {
            let got = shape.apply(0.25);
            assert!(approx_eq(got, quarter, 1e-5), "{:?}(0.25) = {}", shape, got);
            let got = shape.apply(0.5);
            assert!(approx_eq(got, half, 1e-5), "{:?}(0.5) = {}", shape, got);
        }
    }

    #[test]
    fn shapes_stay_within_unit_range() {
        let shapes = [
            FadeShape::Triangular,
            FadeShape::Exponential,
            FadeShape::Logarithmic,
            FadeShape::RaisedCosine,
            FadeShape::QuarterSine,
            FadeShape::Parabola,
            FadeShape::InvertedParabola,
        ];
        for shape in shapes {
            for step in 0..=20 {
                let gain = shape.apply(step as f32 / 20.0);
                assert!((0.0..=1.0 + 1e-6).contains(&gain), "{:?} -> {}", shape, gain);
            }
            // logarithmic tops out at 1 - 10^-2.5
            assert!(approx_eq(shape.apply(1.0), 1.0, 5e-3), "{:?}", shape);
        }
    }

    #[test]
    fn alias_codes_resolve() {
        assert_eq!(FadeShape::from_code('{'), FadeShape::Exponential);
        assert_eq!(FadeShape::from_code('}'), FadeShape::Exponential);
        assert_eq!(FadeShape::from_code('('), FadeShape::RaisedCosine);
        assert_eq!(FadeShape::from_code(')'), FadeShape::RaisedCosine);
        assert_eq!(FadeShape::from_code('?'), FadeShape::Triangular);
    }

    #[test]
    fn linear_fade_out_midpoint() {
        let envelope = fade_out(FadeShape::Triangular);
        assert!(approx_eq(envelope.gain_at(50).unwrap(), 0.5, 1e-6));
        assert!(approx_eq(envelope.gain_at(0).unwrap(), 1.0, 1e-6));
        assert!(approx_eq(envelope.gain_at(75).unwrap(), 0.25, 1e-6));
    }

    #[test]
    fn holds_outside_window() {
        let mut envelope = fade_out(FadeShape::Triangular);
        envelope.start = 100;
        envelope.end = 200;
        assert_eq!(envelope.gain_at(10), Some(1.0));
        assert_eq!(envelope.gain_at(200), Some(0.0));
        assert_eq!(envelope.gain_at(1_000_000), Some(0.0));
    }

    #[test]
    fn closed_bounds_are_not_applicable_outside() {
        let envelope = FadeEnvelope {
            vol_start: 0.0,
            vol_end: 1.0,
            shape: FadeShape::Triangular,
            pre: Some(50),
            start: 100,
            end: 200,
            post: Some(300),
        };
        assert_eq!(envelope.gain_at(49), None);
        assert_eq!(envelope.gain_at(50), Some(0.0));
        assert!(approx_eq(envelope.gain_at(150).unwrap(), 0.5, 1e-6));
        assert_eq!(envelope.gain_at(299), Some(1.0));
        assert_eq!(envelope.gain_at(300), None);
    }

    #[test]
    fn fade_in_and_out_are_continuous_at_edges() {
        let envelope = FadeEnvelope {
            vol_start: 0.2,
            vol_end: 0.8,
            shape: FadeShape::RaisedCosine,
            pre: None,
            start: 0,
            end: 1000,
            post: None,
        };
        assert!(approx_eq(envelope.gain_at(0).unwrap(), 0.2, 1e-4));
        assert!(approx_eq(envelope.gain_at(999).unwrap(), 0.8, 1e-3));

        let envelope = fade_out(FadeShape::Exponential);
        assert!(approx_eq(envelope.gain_at(0).unwrap(), 1.0, 1e-6));
        assert!(envelope.gain_at(99).unwrap() < 0.01);
    }

    #[test]
    fn well_formed_checks_ordering() {
        let mut envelope = fade_out(FadeShape::Triangular);
        assert!(envelope.is_well_formed());
        envelope.pre = Some(10);
        assert!(!envelope.is_well_formed());
        envelope.pre = None;
        envelope.post = Some(99);
        assert!(!envelope.is_well_formed());
        envelope.post = Some(100);
        assert!(envelope.is_well_formed());
        envelope.start = 101;
        assert!(!envelope.is_well_formed());
    }

    #[test]
    fn shape_serde_accepts_codes_and_names() {
        let shapes: Vec<FadeShape> =
            serde_json::from_str(r#"["E", "(", "quarter_sine", "P"]"#).expect("shapes");
        assert_eq!(
            shapes,
            vec![
                FadeShape::Exponential,
                FadeShape::RaisedCosine,
                FadeShape::QuarterSine,
                FadeShape::InvertedParabola
            ]
        );
        assert!(serde_json::from_str::<FadeShape>(r#""wobble""#).is_err());
        assert_eq!(serde_json::to_string(&FadeShape::Parabola).unwrap(), r#""p""#);
    }
}
