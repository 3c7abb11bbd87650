//! Match patterns and the template builder.
//!
//! A pattern describes the expected shape of a single disk. The engines ask
//! it for a dense template of a given shape, centered at `(rows / 2, cols / 2)`,
//! and for the crop size (half-width of the correlation window).

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_SEARCH_FACTOR, DISK_SUPERSAMPLING, GAUSSIAN_SEARCH_SIGMAS};
use crate::error::{BlobfinderError, Result};

/// Expected peak shape, read-only to the engines.
pub trait MatchPattern: Send + Sync {
    /// Half-width of the square window correlated around each peak.
    fn crop_size(&self) -> usize;

    /// Dense template of `shape`, with the pattern centered at
    /// `(shape.0 / 2, shape.1 / 2)`.
    fn template(&self, shape: (usize, usize)) -> Result<Array2<f32>>;

    /// Check the pattern parameters.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Build a template after checking that `shape` covers the pattern's
/// natural crop window of `2 * crop_size` per axis.
pub fn build_template(pattern: &dyn MatchPattern, shape: (usize, usize)) -> Result<Array2<f32>> {
    pattern.validate()?;
    let min = 2 * pattern.crop_size();
    if shape.0 < min || shape.1 < min {
        return Err(BlobfinderError::TemplateTooSmall {
            required: (min, min),
            got: shape,
        });
    }
    let template = pattern.template(shape)?;
    if template.dim() != shape {
        return Err(BlobfinderError::ShapeMismatch {
            expected: shape,
            got: template.dim(),
        });
    }
    Ok(template)
}

/// Built-in analytic patterns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pattern {
    /// Gaussian bump with peak value 1.
    Gaussian {
        sigma: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        search: Option<f64>,
    },
    /// Anti-aliased uniform disk.
    Circular {
        radius: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        search: Option<f64>,
    },
    /// Disk weighted linearly by distance from the center, emphasising edges.
    RadialGradient {
        radius: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        search: Option<f64>,
    },
    /// Zero-mean template: disk with positive weight summing to 1,
    /// surrounding annulus with negative weight summing to -1.
    BackgroundSubtraction {
        radius: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        radius_outer: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        search: Option<f64>,
    },
}

impl Default for Pattern {
    fn default() -> Self {
        Self::Circular {
            radius: 4.0,
            search: None,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gaussian { sigma, .. } => write!(f, "Gaussian (sigma={sigma})"),
            Self::Circular { radius, .. } => write!(f, "Circular (r={radius})"),
            Self::RadialGradient { radius, .. } => write!(f, "Radial gradient (r={radius})"),
            Self::BackgroundSubtraction { radius, .. } => {
                write!(f, "Background subtraction (r={radius})")
            }
        }
    }
}

impl Pattern {
    pub fn gaussian(sigma: f64) -> Self {
        Self::Gaussian {
            sigma,
            search: None,
        }
    }

    pub fn circular(radius: f64) -> Self {
        Self::Circular {
            radius,
            search: None,
        }
    }

    /// Search radius in pixels.
    pub fn search(&self) -> f64 {
        match self {
            Self::Gaussian { sigma, search } => search.unwrap_or(sigma * GAUSSIAN_SEARCH_SIGMAS),
            Self::Circular { radius, search } | Self::RadialGradient { radius, search } => {
                search.unwrap_or(radius * DEFAULT_SEARCH_FACTOR)
            }
            Self::BackgroundSubtraction { search, .. } => {
                search.unwrap_or(self.radius_outer() * DEFAULT_SEARCH_FACTOR)
            }
        }
    }

    fn radius_outer(&self) -> f64 {
        match self {
            Self::BackgroundSubtraction {
                radius,
                radius_outer,
                ..
            } => radius_outer.unwrap_or(radius * 1.5),
            Self::Gaussian { sigma, .. } => sigma * GAUSSIAN_SEARCH_SIGMAS,
            Self::Circular { radius, .. } | Self::RadialGradient { radius, .. } => *radius,
        }
    }

    /// Pattern value at offset (dy, dx) from the center, before any
    /// template-wide normalisation.
    fn sample(&self, dy: f64, dx: f64) -> f32 {
        match self {
            Self::Gaussian { sigma, .. } => {
                (-(dy * dy + dx * dx) / (2.0 * sigma * sigma)).exp() as f32
            }
            Self::Circular { radius, .. } => {
                supersample(dy, dx, |r| if r <= *radius { 1.0 } else { 0.0 })
            }
            Self::RadialGradient { radius, .. } => {
                supersample(dy, dx, |r| if r <= *radius { r / radius } else { 0.0 })
            }
            Self::BackgroundSubtraction { radius, .. } => {
                let outer = self.radius_outer();
                supersample(dy, dx, |r| {
                    if r <= *radius {
                        1.0
                    } else if r <= outer {
                        -1.0
                    } else {
                        0.0
                    }
                })
            }
        }
    }
}

impl MatchPattern for Pattern {
    fn crop_size(&self) -> usize {
        (self.search().ceil() as usize).max(1)
    }

    fn validate(&self) -> Result<()> {
        let (name, value) = match self {
            Self::Gaussian { sigma, .. } => ("sigma", *sigma),
            Self::Circular { radius, .. }
            | Self::RadialGradient { radius, .. }
            | Self::BackgroundSubtraction { radius, .. } => ("radius", *radius),
        };
        if !(value.is_finite() && value > 0.0) {
            return Err(BlobfinderError::InvalidPattern(format!(
                "{name} must be positive, got {value}"
            )));
        }
        if let Self::BackgroundSubtraction { radius, .. } = self {
            if self.radius_outer() <= *radius {
                return Err(BlobfinderError::InvalidPattern(format!(
                    "radius_outer {} must exceed radius {}",
                    self.radius_outer(),
                    radius
                )));
            }
        }
        let search = self.search();
        if !(search.is_finite() && search > 0.0) {
            return Err(BlobfinderError::InvalidPattern(format!(
                "search must be positive, got {search}"
            )));
        }
        Ok(())
    }

    fn template(&self, shape: (usize, usize)) -> Result<Array2<f32>> {
        self.validate()?;
        let (cy, cx) = (shape.0 / 2, shape.1 / 2);
        let mut template = Array2::from_shape_fn(shape, |(r, c)| {
            self.sample(r as f64 - cy as f64, c as f64 - cx as f64)
        });
        if matches!(self, Self::BackgroundSubtraction { .. }) {
            balance_positive_negative(&mut template);
        }
        Ok(template)
    }
}

/// Average of `f(r)` over a `DISK_SUPERSAMPLING²` grid inside the pixel.
fn supersample<F: Fn(f64) -> f64>(dy: f64, dx: f64, f: F) -> f32 {
    let n = DISK_SUPERSAMPLING;
    let step = 1.0 / n as f64;
    let mut sum = 0.0;
    for i in 0..n {
        let y = dy - 0.5 + (i as f64 + 0.5) * step;
        for j in 0..n {
            let x = dx - 0.5 + (j as f64 + 0.5) * step;
            sum += f((y * y + x * x).sqrt());
        }
    }
    (sum / (n * n) as f64) as f32
}

/// Scale positive entries to sum 1 and negative entries to sum -1.
fn balance_positive_negative(template: &mut Array2<f32>) {
    let positive: f64 = template.iter().filter(|&&v| v > 0.0).map(|&v| v as f64).sum();
    let negative: f64 = template.iter().filter(|&&v| v < 0.0).map(|&v| -v as f64).sum();
    template.mapv_inplace(|v| {
        if v > 0.0 && positive > 0.0 {
            (v as f64 / positive) as f32
        } else if v < 0.0 && negative > 0.0 {
            (v as f64 / negative) as f32
        } else {
            v
        }
    });
}

/// A caller-supplied template, placed centered into the requested shape.
#[derive(Clone, Debug)]
pub struct UserTemplate {
    pub template: Array2<f32>,
    pub search: Option<f64>,
}

impl UserTemplate {
    pub fn new(template: Array2<f32>) -> Self {
        Self {
            template,
            search: None,
        }
    }

    pub fn with_search(mut self, search: f64) -> Self {
        self.search = Some(search);
        self
    }
}

impl MatchPattern for UserTemplate {
    fn crop_size(&self) -> usize {
        let (h, w) = self.template.dim();
        let search = self.search.unwrap_or(h.max(w) as f64 / 2.0);
        (search.ceil() as usize).max(1)
    }

    fn validate(&self) -> Result<()> {
        let (h, w) = self.template.dim();
        if h == 0 || w == 0 {
            return Err(BlobfinderError::InvalidPattern("empty user template".into()));
        }
        if let Some(search) = self.search {
            if !(search.is_finite() && search > 0.0) {
                return Err(BlobfinderError::InvalidPattern(format!(
                    "search must be positive, got {search}"
                )));
            }
        }
        Ok(())
    }

    fn template(&self, shape: (usize, usize)) -> Result<Array2<f32>> {
        let (th, tw) = self.template.dim();
        let mut out = Array2::<f32>::zeros(shape);
        // Align the user template's center with the output center.
        let oy = shape.0 as i64 / 2 - th as i64 / 2;
        let ox = shape.1 as i64 / 2 - tw as i64 / 2;
        for ((r, c), &v) in self.template.indexed_iter() {
            let y = oy + r as i64;
            let x = ox + c as i64;
            if y >= 0 && y < shape.0 as i64 && x >= 0 && x < shape.1 as i64 {
                out[[y as usize, x as usize]] = v;
            }
        }
        Ok(out)
    }
}
