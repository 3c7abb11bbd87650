use ndarray::{s, Array2, ArrayViewMut2};

use crate::error::{BlobfinderError, Result};

/// A single detector image in one of the supported array representations.
///
/// Pixel values are raw intensities; pre-scaling happens inside the
/// correlation engines.
#[derive(Clone, Debug)]
pub enum Frame {
    /// Dense row-major pixel data, shape = (rows, cols).
    Dense(Array2<f32>),
    /// Coordinate-list sparse image.
    Coo(CooFrame),
    /// Compressed-row sparse image.
    Compressed(CsrFrame),
}

impl Frame {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::Dense(data) => data.dim(),
            Self::Coo(coo) => coo.shape,
            Self::Compressed(csr) => csr.shape,
        }
    }

    /// Short name of the representation, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Dense(_) => "dense",
            Self::Coo(_) => "sparse-coo",
            Self::Compressed(_) => "sparse-compressed",
        }
    }

    /// Write the full image into `out`, which must have the frame's shape.
    /// Every element of `out` is overwritten.
    pub fn densify_into(&self, out: &mut Array2<f32>) -> Result<()> {
        if out.dim() != self.shape() {
            return Err(BlobfinderError::ShapeMismatch {
                expected: self.shape(),
                got: out.dim(),
            });
        }
        match self {
            Self::Dense(data) => out.assign(data),
            Self::Coo(coo) => coo.scatter_into(out),
            Self::Compressed(csr) => csr.scatter_into(out),
        }
        Ok(())
    }

    pub fn to_dense(&self) -> Array2<f32> {
        match self {
            Self::Dense(data) => data.clone(),
            Self::Coo(coo) => {
                let mut out = Array2::<f32>::zeros(coo.shape);
                coo.scatter_into(&mut out);
                out
            }
            Self::Compressed(csr) => {
                let mut out = Array2::<f32>::zeros(csr.shape);
                csr.scatter_into(&mut out);
                out
            }
        }
    }

    /// Copy the window whose top-left corner is at `origin` (frame
    /// coordinates, may be negative) into `out` by gathering individual
    /// pixels. Pixels outside the frame read as zero.
    pub fn gather_window(&self, origin: (i64, i64), mut out: ArrayViewMut2<f32>) {
        let (h, w) = self.shape();
        let (win_h, win_w) = out.dim();
        out.fill(0.0);
        match self {
            Self::Dense(data) => {
                for wy in 0..win_h {
                    let y = origin.0 + wy as i64;
                    if y < 0 || y >= h as i64 {
                        continue;
                    }
                    for wx in 0..win_w {
                        let x = origin.1 + wx as i64;
                        if x >= 0 && x < w as i64 {
                            out[[wy, wx]] = data[[y as usize, x as usize]];
                        }
                    }
                }
            }
            Self::Coo(coo) => {
                for i in 0..coo.values.len() {
                    let wy = coo.rows[i] as i64 - origin.0;
                    let wx = coo.cols[i] as i64 - origin.1;
                    if wy >= 0 && wy < win_h as i64 && wx >= 0 && wx < win_w as i64 {
                        out[[wy as usize, wx as usize]] += coo.values[i];
                    }
                }
            }
            Self::Compressed(csr) => {
                let row_start = origin.0.max(0);
                let row_end = (origin.0 + win_h as i64).min(h as i64);
                for y in row_start..row_end {
                    let (cols, values) = csr.row(y as usize);
                    let lo = cols.partition_point(|&c| (c as i64) < origin.1);
                    let hi = cols.partition_point(|&c| (c as i64) < origin.1 + win_w as i64);
                    for i in lo..hi {
                        let wy = (y - origin.0) as usize;
                        let wx = (cols[i] as i64 - origin.1) as usize;
                        out[[wy, wx]] += values[i];
                    }
                }
            }
        }
    }

    /// Cut the frame into row stripes of at most `rows_per_tile` rows.
    pub fn tiles(&self, frame_index: usize, rows_per_tile: usize) -> Vec<Tile> {
        let (h, w) = self.shape();
        let step = rows_per_tile.max(1);
        let mut tiles = Vec::with_capacity(h.div_ceil(step));
        let mut row = 0;
        while row < h {
            let rows = step.min(h - row);
            let data = match self {
                Self::Dense(data) => {
                    TileData::Dense(data.slice(s![row..row + rows, ..]).to_owned())
                }
                Self::Coo(coo) => {
                    let entries = (0..coo.values.len())
                        .filter(|&i| coo.rows[i] >= row && coo.rows[i] < row + rows)
                        .map(|i| (coo.rows[i] - row, coo.cols[i], coo.values[i]))
                        .collect();
                    TileData::Sparse {
                        shape: (rows, w),
                        entries,
                    }
                }
                Self::Compressed(csr) => {
                    let mut entries = Vec::new();
                    for y in row..row + rows {
                        let (cols, values) = csr.row(y);
                        for (&col, &v) in cols.iter().zip(values) {
                            entries.push((y - row, col, v));
                        }
                    }
                    TileData::Sparse {
                        shape: (rows, w),
                        entries,
                    }
                }
            };
            tiles.push(Tile {
                frame_index,
                origin: (row, 0),
                data,
            });
            row += rows;
        }
        tiles
    }
}

/// Coordinate-list sparse image. Duplicate coordinates are summed.
#[derive(Clone, Debug)]
pub struct CooFrame {
    pub shape: (usize, usize),
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f32>,
}

impl CooFrame {
    pub fn new(shape: (usize, usize), entries: &[(usize, usize, f32)]) -> Result<Self> {
        let mut rows = Vec::with_capacity(entries.len());
        let mut cols = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        for &(r, c, v) in entries {
            if r >= shape.0 || c >= shape.1 {
                return Err(BlobfinderError::ShapeMismatch {
                    expected: shape,
                    got: (r + 1, c + 1),
                });
            }
            rows.push(r);
            cols.push(c);
            values.push(v);
        }
        Ok(Self {
            shape,
            rows,
            cols,
            values,
        })
    }

    pub fn from_dense(data: &Array2<f32>) -> Self {
        let mut rows = Vec::new();
        let mut cols = Vec::new();
        let mut values = Vec::new();
        for ((r, c), &v) in data.indexed_iter() {
            if v != 0.0 {
                rows.push(r);
                cols.push(c);
                values.push(v);
            }
        }
        Self {
            shape: data.dim(),
            rows,
            cols,
            values,
        }
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Zero `out` (of this frame's shape) and add every entry into it.
    fn scatter_into(&self, out: &mut Array2<f32>) {
        out.fill(0.0);
        for ((&r, &c), &v) in self.rows.iter().zip(&self.cols).zip(&self.values) {
            out[[r, c]] += v;
        }
    }
}

/// Compressed-row sparse image. Column indices are sorted within each row.
#[derive(Clone, Debug)]
pub struct CsrFrame {
    pub shape: (usize, usize),
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f32>,
}

impl CsrFrame {
    pub fn from_dense(data: &Array2<f32>) -> Self {
        let (h, _) = data.dim();
        let mut indptr = Vec::with_capacity(h + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        indptr.push(0);
        for row in data.rows() {
            for (c, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    indices.push(c);
                    values.push(v);
                }
            }
            indptr.push(indices.len());
        }
        Self {
            shape: data.dim(),
            indptr,
            indices,
            values,
        }
    }

    pub fn from_coo(coo: &CooFrame) -> Self {
        let mut dense = Array2::<f32>::zeros(coo.shape);
        coo.scatter_into(&mut dense);
        Self::from_dense(&dense)
    }

    /// Column indices and values stored for `row`.
    pub fn row(&self, row: usize) -> (&[usize], &[f32]) {
        let range = self.indptr[row]..self.indptr[row + 1];
        (&self.indices[range.clone()], &self.values[range])
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    fn scatter_into(&self, out: &mut Array2<f32>) {
        out.fill(0.0);
        for row in 0..self.shape.0 {
            let (cols, values) = self.row(row);
            for (&col, &v) in cols.iter().zip(values) {
                out[[row, col]] += v;
            }
        }
    }
}

/// A spatial fragment of one frame.
#[derive(Clone, Debug)]
pub struct Tile {
    /// Index of the frame this tile belongs to.
    pub frame_index: usize,
    /// Frame coordinates (row, col) of the tile's top-left pixel.
    pub origin: (usize, usize),
    pub data: TileData,
}

#[derive(Clone, Debug)]
pub enum TileData {
    Dense(Array2<f32>),
    /// Entries are (row, col, value) in tile-local coordinates.
    Sparse {
        shape: (usize, usize),
        entries: Vec<(usize, usize, f32)>,
    },
}

impl Tile {
    pub fn shape(&self) -> (usize, usize) {
        match &self.data {
            TileData::Dense(data) => data.dim(),
            TileData::Sparse { shape, .. } => *shape,
        }
    }

    /// Visit every stored pixel as (frame row, frame col, value).
    /// Zero pixels of dense tiles are skipped.
    pub fn for_each_pixel<F: FnMut(usize, usize, f32)>(&self, mut f: F) {
        let (oy, ox) = self.origin;
        match &self.data {
            TileData::Dense(data) => {
                for ((r, c), &v) in data.indexed_iter() {
                    if v != 0.0 {
                        f(oy + r, ox + c, v);
                    }
                }
            }
            TileData::Sparse { entries, .. } => {
                for &(r, c, v) in entries {
                    f(oy + r, ox + c, v);
                }
            }
        }
    }
}
