//! Grid layouts for placing axes on a figure
//!
//! Coordinates are figure fractions with the origin at the bottom-left.
//! Rows are numbered from the top. Spacing follows the usual convention:
//! `wspace`/`hspace` are fractions of the average cell width/height.

use std::ops::Range;

/// Rectangle in figure-fraction coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, bottom: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            bottom,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn top(&self) -> f64 {
        self.bottom + self.height
    }
}

/// Default subplot area of a figure
pub const DEFAULT_AREA: Rect = Rect {
    left: 0.125,
    bottom: 0.11,
    width: 0.775,
    height: 0.77,
};

const DEFAULT_SPACE: f64 = 0.2;

/// Grid of cells inside a rectangle
#[derive(Debug, Clone)]
pub struct GridSpec {
    area: Rect,
    nrows: usize,
    ncols: usize,
    width_ratios: Vec<f64>,
    height_ratios: Vec<f64>,
    wspace: f64,
    hspace: f64,
}

impl GridSpec {
    /// Grid over the default subplot area of a figure
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self::within(DEFAULT_AREA, nrows, ncols)
    }

    /// Grid nested inside another cell
    pub fn within(area: Rect, nrows: usize, ncols: usize) -> Self {
        let nrows = nrows.max(1);
        let ncols = ncols.max(1);
        Self {
            area,
            nrows,
            ncols,
            width_ratios: vec![1.0; ncols],
            height_ratios: vec![1.0; nrows],
            wspace: DEFAULT_SPACE,
            hspace: DEFAULT_SPACE,
        }
    }

    /// Replace the figure margins (fractions of the figure)
    pub fn margins(mut self, left: f64, right: f64, bottom: f64, top: f64) -> Self {
        self.area = Rect::new(left, bottom, right - left, top - bottom);
        self
    }

    pub fn width_ratios(mut self, ratios: &[f64]) -> Self {
        if ratios.len() == self.ncols {
            self.width_ratios = ratios.to_vec();
        }
        self
    }

    pub fn height_ratios(mut self, ratios: &[f64]) -> Self {
        if ratios.len() == self.nrows {
            self.height_ratios = ratios.to_vec();
        }
        self
    }

    pub fn wspace(mut self, wspace: f64) -> Self {
        self.wspace = wspace;
        self
    }

    pub fn hspace(mut self, hspace: f64) -> Self {
        self.hspace = hspace;
        self
    }

    pub fn cell(&self, row: usize, col: usize) -> Rect {
        self.span(row..row + 1, col..col + 1)
    }

    /// Rectangle covering a block of cells (end-exclusive ranges)
    pub fn span(&self, rows: Range<usize>, cols: Range<usize>) -> Rect {
        let (lefts, widths) = layout(self.area.left, self.area.width, &self.width_ratios, self.wspace);
        let (offsets, heights) = layout(0.0, self.area.height, &self.height_ratios, self.hspace);

        let c0 = cols.start.min(self.ncols - 1);
        let c1 = cols.end.clamp(c0 + 1, self.ncols) - 1;
        let r0 = rows.start.min(self.nrows - 1);
        let r1 = rows.end.clamp(r0 + 1, self.nrows) - 1;

        let left = lefts[c0];
        let right = lefts[c1] + widths[c1];
        let top = self.area.top() - offsets[r0];
        let bottom = self.area.top() - offsets[r1] - heights[r1];
        Rect::new(left, bottom, right - left, top - bottom)
    }
}

/// Start offsets and sizes of cells along one dimension
fn layout(start: f64, total: f64, ratios: &[f64], space: f64) -> (Vec<f64>, Vec<f64>) {
    let n = ratios.len() as f64;
    let avg = total / (n + space * (n - 1.0));
    let sep = space * avg;
    let sum: f64 = ratios.iter().sum();
    let sizes: Vec<f64> = ratios.iter().map(|r| avg * n * r / sum).collect();

    let mut starts = Vec::with_capacity(sizes.len());
    let mut pos = start;
    for size in &sizes {
        starts.push(pos);
        pos += size + sep;
    }
    (starts, sizes)
}
