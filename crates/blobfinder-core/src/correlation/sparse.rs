//! Direct correlation through a sparse mask stack.
//!
//! For every peak and every offset in `[-steps, steps]²` the template is
//! placed at `peak + offset` and flattened into one row of a sparse matrix
//! over the frame's pixels. Correlating a frame is then a matrix-vector
//! product, which splits naturally over tiles: each tile adds its pixels'
//! contributions to a zero-initialised accumulator, in any order.
//!
//! The number of steps is independent of the template size, but the cost
//! grows with `(2 * steps + 1)²`.

use ndarray::{Array2, Array3};
use tracing::debug;

use crate::compute::sparse::CscMatrix;
use crate::error::{BlobfinderError, Result};
use crate::frame::Tile;
use crate::pattern::{build_template, MatchPattern};
use crate::pipeline::types::PeakResult;

use super::evaluate::evaluate_correlations;
use super::prescale::PreScale;
use super::zero_shift::ZeroShift;

/// Shared, read-only state of the sparse strategy for one peak list and
/// frame shape.
#[derive(Clone, Debug)]
pub struct SparseState {
    peaks: Vec<[i64; 2]>,
    steps: usize,
    frame_shape: (usize, usize),
    masks: CscMatrix<f64>,
    prescale: PreScale,
}

impl SparseState {
    /// Build the mask stack. The neighbourhood of every peak is fixed here,
    /// so any zero shift is rejected.
    ///
    /// Responses are truncated direct correlations with no periodic
    /// spectrum, so peaks are always refined with the parabola fit.
    pub fn new(
        pattern: &dyn MatchPattern,
        peaks: &[[i64; 2]],
        steps: usize,
        frame_shape: (usize, usize),
        zero_shift: &ZeroShift,
        prescale: PreScale,
    ) -> Result<Self> {
        if !zero_shift.is_none() {
            return Err(BlobfinderError::ZeroShiftUnsupported);
        }

        let crop_size = pattern.crop_size();
        let size = 2 * crop_size + 1;
        let template = build_template(pattern, (size, size))?;
        let masks = sparse_template_multi_stack(&template, peaks, steps, frame_shape);
        debug!(
            n_peaks = peaks.len(),
            steps,
            nnz = masks.nnz(),
            "Built sparse mask stack"
        );

        Ok(Self {
            peaks: peaks.to_vec(),
            steps,
            frame_shape,
            masks,
            prescale,
        })
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn peaks(&self) -> &[[i64; 2]] {
        &self.peaks
    }

    /// Side length of each peak's response patch.
    pub fn patch_size(&self) -> usize {
        2 * self.steps + 1
    }

    pub fn masks(&self) -> &CscMatrix<f64> {
        &self.masks
    }

    /// Fresh zero accumulator for one frame.
    pub fn accumulator(&self) -> SparseAccumulator {
        SparseAccumulator {
            values: vec![0.0; self.masks.shape().0],
            tiles: 0,
        }
    }

    /// Add one tile's contribution: `acc += masks · prescale(tile)` over
    /// the tile's pixels.
    pub fn accumulate(&self, acc: &mut SparseAccumulator, tile: &Tile) -> Result<()> {
        let (h, w) = self.frame_shape;
        let (th, tw) = tile.shape();
        let (oy, ox) = tile.origin;
        if oy + th > h || ox + tw > w {
            return Err(BlobfinderError::TileOutOfBounds {
                row: oy,
                col: ox,
                shape: (th, tw),
                frame: self.frame_shape,
            });
        }

        let prescale = self.prescale;
        tile.for_each_pixel(|y, x, v| {
            let v = prescale.apply(v as f64);
            self.masks.axpy_column(y * w + x, v, &mut acc.values);
        });
        acc.tiles += 1;
        Ok(())
    }

    /// Response patches `(n_peaks, 2*steps+1, 2*steps+1)` of a complete
    /// accumulator. An accumulator that never saw a tile reads as zero.
    pub fn responses(&self, acc: &SparseAccumulator) -> Array3<f32> {
        let size = self.patch_size();
        Array3::from_shape_fn((self.peaks.len(), size, size), |(p, r, c)| {
            acc.values
                .get((p * size + r) * size + c)
                .map_or(0.0, |&v| v as f32)
        })
    }

    /// Evaluate a complete accumulator, i.e. one into which every tile of
    /// the frame has been accumulated.
    pub fn finalize(&self, acc: &SparseAccumulator, out: &mut [PeakResult]) {
        let responses = self.responses(acc);
        evaluate_correlations(responses.view(), &self.peaks, self.steps, out);
    }
}

/// Partial correlation sums of one frame.
///
/// Addition is the only operation, so accumulators built from disjoint
/// tile subsets can be merged in any grouping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseAccumulator {
    values: Vec<f64>,
    tiles: usize,
}

impl SparseAccumulator {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of tiles folded in so far.
    pub fn tile_count(&self) -> usize {
        self.tiles
    }

    pub fn merge(mut self, other: SparseAccumulator) -> SparseAccumulator {
        if self.values.is_empty() {
            return SparseAccumulator {
                values: other.values,
                tiles: self.tiles + other.tiles,
            };
        }
        for (a, b) in self.values.iter_mut().zip(&other.values) {
            *a += b;
        }
        self.tiles += other.tiles;
        self
    }
}

/// Stack of template masks, one row per (peak, offset), over the flattened
/// `frame_shape` pixels. Template pixels falling outside the frame are
/// dropped.
pub fn sparse_template_multi_stack(
    template: &Array2<f32>,
    peaks: &[[i64; 2]],
    steps: usize,
    frame_shape: (usize, usize),
) -> CscMatrix<f64> {
    let (h, w) = frame_shape;
    let (th, tw) = template.dim();
    let (cy, cx) = ((th / 2) as i64, (tw / 2) as i64);
    let size = 2 * steps + 1;
    let steps = steps as i64;

    let mut triplets = Vec::new();
    for (p, peak) in peaks.iter().enumerate() {
        for dy in -steps..=steps {
            for dx in -steps..=steps {
                let row = p * size * size + ((dy + steps) as usize) * size + (dx + steps) as usize;
                let oy = peak[0] + dy - cy;
                let ox = peak[1] + dx - cx;
                for ((ty, tx), &t) in template.indexed_iter() {
                    if t == 0.0 {
                        continue;
                    }
                    let y = oy + ty as i64;
                    let x = ox + tx as i64;
                    if y >= 0 && y < h as i64 && x >= 0 && x < w as i64 {
                        triplets.push((row, y as usize * w + x as usize, t as f64));
                    }
                }
            }
        }
    }

    CscMatrix::from_triplets(peaks.len() * size * size, h * w, &triplets)
}
