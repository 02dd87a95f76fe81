//! Figure model used by the plot collaborator
//!
//! A [`Figure`] is a canvas sized in inches (rendered at [`DPI`]) holding
//! [`Axes`] placed by figure-fraction rectangles. Axes collect drawing
//! primitives in data coordinates; limits are either set explicitly or
//! auto-scaled from the data. Rendering to PNG happens only once the whole
//! figure is composed.

pub mod grid;
mod render;

pub use grid::{GridSpec, Rect};
pub use render::{level_color, to_png};

use thiserror::Error;

/// Pixels per inch
pub const DPI: f64 = 100.0;

/// Fraction of the data range added on each side when auto-scaling
const MARGIN: f64 = 0.05;

/// RGB color
pub type Color = [u8; 3];

pub mod colors {
    use super::Color;

    pub const BLACK: Color = [0, 0, 0];
    pub const GREY: Color = [160, 160, 160];
    pub const RED: Color = [214, 39, 40];
    pub const GREEN: Color = [44, 160, 44];
    pub const BLUE: Color = [31, 119, 180];
    pub const ORANGE: Color = [255, 127, 14];
    pub const PURPLE: Color = [148, 103, 189];
}

/// Figure composition and rendering errors
#[derive(Debug, Error)]
pub enum FigureError {
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Drawing failed: {0}")]
    Draw(String),

    #[error("Invalid data shape: {0}")]
    Shape(String),

    #[error("Canvas has zero size")]
    EmptyCanvas,
}

/// Data extent of an image artist
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

/// Orientation of a full-width or full-height band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanAxis {
    X,
    Y,
}

/// Drawing primitive in data coordinates
#[derive(Debug, Clone)]
pub enum Artist {
    Scatter {
        xs: Vec<f64>,
        ys: Vec<f64>,
        color: Color,
        size: u32,
    },
    /// Scatter colored through the colormap
    ScatterValues {
        xs: Vec<f64>,
        ys: Vec<f64>,
        values: Vec<f64>,
        size: u32,
    },
    Line {
        xs: Vec<f64>,
        ys: Vec<f64>,
        color: Color,
    },
    Bars {
        xs: Vec<f64>,
        heights: Vec<f64>,
        width: f64,
        color: Color,
    },
    /// Row-major grid; row 0 sits at `extent.y0`
    Image {
        values: Vec<f64>,
        rows: usize,
        cols: usize,
        extent: Extent,
    },
    Span {
        axis: SpanAxis,
        lo: f64,
        hi: f64,
        color: Color,
    },
}

/// One plotting panel
#[derive(Debug, Clone)]
pub struct Axes {
    rect: Rect,
    xlim: Option<(f64, f64)>,
    ylim: Option<(f64, f64)>,
    artists: Vec<Artist>,
    x_visible: bool,
    y_visible: bool,
    frame: bool,
}

impl Axes {
    fn new(rect: Rect) -> Self {
        Self {
            rect,
            xlim: None,
            ylim: None,
            artists: Vec::new(),
            x_visible: true,
            y_visible: true,
            frame: true,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn artists(&self) -> &[Artist] {
        &self.artists
    }

    pub fn scatter(&mut self, xs: &[f64], ys: &[f64], color: Color, size: u32) -> Result<(), FigureError> {
        check_pair(xs, ys)?;
        self.artists.push(Artist::Scatter {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            color,
            size,
        });
        Ok(())
    }

    pub fn scatter_values(
        &mut self,
        xs: &[f64],
        ys: &[f64],
        values: &[f64],
        size: u32,
    ) -> Result<(), FigureError> {
        check_pair(xs, ys)?;
        check_pair(xs, values)?;
        self.artists.push(Artist::ScatterValues {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            values: values.to_vec(),
            size,
        });
        Ok(())
    }

    pub fn plot(&mut self, xs: &[f64], ys: &[f64], color: Color) -> Result<(), FigureError> {
        check_pair(xs, ys)?;
        self.artists.push(Artist::Line {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            color,
        });
        Ok(())
    }

    pub fn bar(&mut self, xs: &[f64], heights: &[f64], width: f64, color: Color) -> Result<(), FigureError> {
        check_pair(xs, heights)?;
        self.artists.push(Artist::Bars {
            xs: xs.to_vec(),
            heights: heights.to_vec(),
            width,
            color,
        });
        Ok(())
    }

    pub fn imshow(&mut self, values: &[f64], rows: usize, cols: usize, extent: Extent) -> Result<(), FigureError> {
        if rows.checked_mul(cols) != Some(values.len()) || values.is_empty() {
            return Err(FigureError::Shape(format!(
                "{} values for a {}x{} image",
                values.len(),
                rows,
                cols
            )));
        }
        self.artists.push(Artist::Image {
            values: values.to_vec(),
            rows,
            cols,
            extent,
        });
        Ok(())
    }

    pub fn axhspan(&mut self, lo: f64, hi: f64, color: Color) {
        self.artists.push(Artist::Span {
            axis: SpanAxis::Y,
            lo,
            hi,
            color,
        });
    }

    pub fn axvspan(&mut self, lo: f64, hi: f64, color: Color) {
        self.artists.push(Artist::Span {
            axis: SpanAxis::X,
            lo,
            hi,
            color,
        });
    }

    pub fn set_xlim(&mut self, lo: f64, hi: f64) {
        self.xlim = Some((lo, hi));
    }

    pub fn set_ylim(&mut self, lo: f64, hi: f64) {
        self.ylim = Some((lo, hi));
    }

    /// Current x limits, auto-scaled when not set
    pub fn get_xlim(&self) -> (f64, f64) {
        self.xlim.unwrap_or_else(|| self.autoscale(SpanAxis::X))
    }

    /// Current y limits, auto-scaled when not set
    pub fn get_ylim(&self) -> (f64, f64) {
        self.ylim.unwrap_or_else(|| self.autoscale(SpanAxis::Y))
    }

    pub fn hide_xaxis(&mut self) {
        self.x_visible = false;
    }

    pub fn hide_yaxis(&mut self) {
        self.y_visible = false;
    }

    pub fn remove_frame(&mut self) {
        self.frame = false;
    }

    pub fn x_visible(&self) -> bool {
        self.x_visible
    }

    pub fn y_visible(&self) -> bool {
        self.y_visible
    }

    pub fn has_frame(&self) -> bool {
        self.frame
    }

    fn autoscale(&self, axis: SpanAxis) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        let mut tight = false;
        let mut extend = |v: f64| {
            if v.is_finite() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        };

        for artist in &self.artists {
            match artist {
                Artist::Scatter { xs, ys, .. }
                | Artist::ScatterValues { xs, ys, .. }
                | Artist::Line { xs, ys, .. } => {
                    let data = if axis == SpanAxis::X { xs } else { ys };
                    data.iter().copied().for_each(&mut extend);
                }
                Artist::Bars { xs, heights, width, .. } => {
                    if axis == SpanAxis::X {
                        for x in xs {
                            extend(x - width / 2.0);
                            extend(x + width / 2.0);
                        }
                    } else {
                        extend(0.0);
                        heights.iter().copied().for_each(&mut extend);
                    }
                }
                Artist::Image { extent, .. } => {
                    tight = true;
                    if axis == SpanAxis::X {
                        extend(extent.x0);
                        extend(extent.x1);
                    } else {
                        extend(extent.y0);
                        extend(extent.y1);
                    }
                }
                Artist::Span { axis: span_axis, lo: a, hi: b, .. } => {
                    if *span_axis == axis {
                        extend(*a);
                        extend(*b);
                    }
                }
            }
        }

        if lo > hi {
            return (0.0, 1.0);
        }
        if lo == hi {
            return (lo - 0.5, hi + 0.5);
        }
        if tight {
            return (lo, hi);
        }
        let pad = (hi - lo) * MARGIN;
        (lo - pad, hi + pad)
    }
}

fn check_pair(a: &[f64], b: &[f64]) -> Result<(), FigureError> {
    if a.len() != b.len() {
        return Err(FigureError::Shape(format!(
            "length mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

/// Handle to an axes inside one figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxesId(usize);

/// A canvas holding axes
#[derive(Debug, Clone)]
pub struct Figure {
    width_in: f64,
    height_in: f64,
    axes: Vec<Axes>,
}

impl Figure {
    /// Create a figure of `width_in` x `height_in` inches
    pub fn new(width_in: f64, height_in: f64) -> Self {
        Self {
            width_in,
            height_in,
            axes: Vec::new(),
        }
    }

    pub fn add_axes(&mut self, rect: Rect) -> AxesId {
        self.axes.push(Axes::new(rect));
        AxesId(self.axes.len() - 1)
    }

    pub fn axes(&self, id: AxesId) -> &Axes {
        &self.axes[id.0]
    }

    pub fn axes_mut(&mut self, id: AxesId) -> &mut Axes {
        &mut self.axes[id.0]
    }

    pub fn all_axes(&self) -> &[Axes] {
        &self.axes
    }

    /// Canvas size in pixels
    pub fn canvas_size(&self) -> (u32, u32) {
        (
            (self.width_in * DPI).round().max(0.0) as u32,
            (self.height_in * DPI).round().max(0.0) as u32,
        )
    }

    /// Give two axes the union of their x limits
    pub fn share_x(&mut self, a: AxesId, b: AxesId) {
        let (a0, a1) = self.axes(a).get_xlim();
        let (b0, b1) = self.axes(b).get_xlim();
        let (lo, hi) = (a0.min(b0), a1.max(b1));
        self.axes_mut(a).set_xlim(lo, hi);
        self.axes_mut(b).set_xlim(lo, hi);
    }

    /// Apply the overall min/max of the auto-scaled y limits to every axes
    pub fn harmonize_ylim(&mut self, ids: &[AxesId]) {
        let limits: Vec<(f64, f64)> = ids.iter().map(|&id| self.axes(id).get_ylim()).collect();
        let lo = limits.iter().map(|l| l.0).fold(f64::INFINITY, f64::min);
        let hi = limits.iter().map(|l| l.1).fold(f64::NEG_INFINITY, f64::max);
        if lo.is_finite() && hi.is_finite() {
            for &id in ids {
                self.axes_mut(id).set_ylim(lo, hi);
            }
        }
    }

    /// Rasterize and encode as PNG
    pub fn render_png(&self) -> Result<Vec<u8>, FigureError> {
        let (image, _) = render::rasterize(self, None)?;
        render::encode_png(image)
    }

    /// Render, also reporting where `points` of axes `id` were placed
    ///
    /// Locations are canvas fractions with the origin at the bottom-left.
    pub fn render_locating(&self, id: AxesId, points: &[(f64, f64)]) -> Result<Rendered, FigureError> {
        let (image, coords) = render::rasterize(self, Some((id, points)))?;
        let (w, h) = (f64::from(image.width()), f64::from(image.height()));
        let located = coords
            .into_iter()
            .map(|(px, py)| (f64::from(px) / w, 1.0 - f64::from(py) / h))
            .collect();
        Ok(Rendered {
            png: render::encode_png(image)?,
            located,
        })
    }
}

/// Encoded figure plus the canvas positions asked for at render time
#[derive(Debug, Clone)]
pub struct Rendered {
    pub png: Vec<u8>,
    pub located: Vec<(f64, f64)>,
}
