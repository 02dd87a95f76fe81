//! Rasterization of figures through the plotters bitmap backend

use std::io::Cursor;
use std::ops::Range;

use ephys_common::normalize::normalize_u8;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use plotters::chart::{ChartBuilder, ChartContext};
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::drawing::{DrawingArea, IntoDrawingArea};
use plotters::element::{Circle, PathElement, Pixel, Rectangle};
use plotters::prelude::BitMapBackend;
use plotters::style::colors::colormaps::{ColorMap, ViridisRGB};
use plotters::style::{Color as _, RGBColor};

use super::{colors, Artist, Axes, AxesId, Color, Figure, FigureError, SpanAxis};

pub(super) const BACKGROUND: Color = [255, 255, 255];

type Chart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Sequential colormap color for a normalized level
pub fn level_color(level: u8) -> Color {
    let c: RGBColor = ViridisRGB.get_color(f32::from(level) / 255.0);
    [c.0, c.1, c.2]
}

/// Encode a row-major grayscale matrix (row 0 on top) as PNG
pub fn to_png(values: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FigureError> {
    let image = GrayImage::from_raw(width, height, values.to_vec()).ok_or_else(|| {
        FigureError::Shape(format!("{} bytes for a {}x{} image", values.len(), width, height))
    })?;
    encode(DynamicImage::ImageLuma8(image))
}

pub(super) fn encode_png(image: RgbImage) -> Result<Vec<u8>, FigureError> {
    encode(DynamicImage::ImageRgb8(image))
}

fn encode(image: DynamicImage) -> Result<Vec<u8>, FigureError> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

fn draw_error(err: impl std::fmt::Display) -> FigureError {
    FigureError::Draw(err.to_string())
}

fn rgb(color: Color) -> RGBColor {
    RGBColor(color[0], color[1], color[2])
}

/// Draw every axes into an RGB buffer
///
/// When `locate` names an axes, the backend pixel (origin top-left) of each
/// given data point on that chart is returned alongside the image.
pub(super) fn rasterize(
    figure: &Figure,
    locate: Option<(AxesId, &[(f64, f64)])>,
) -> Result<(RgbImage, Vec<(i32, i32)>), FigureError> {
    let (w, h) = figure.canvas_size();
    if w == 0 || h == 0 {
        return Err(FigureError::EmptyCanvas);
    }

    let mut buf = vec![0u8; w as usize * h as usize * 3];
    let mut located = Vec::new();
    {
        let root = BitMapBackend::with_buffer(&mut buf, (w, h)).into_drawing_area();
        root.fill(&rgb(BACKGROUND)).map_err(draw_error)?;
        for (index, axes) in figure.all_axes().iter().enumerate() {
            let points = match locate {
                Some((id, points)) if id.0 == index => points,
                _ => &[],
            };
            let area = axes_area(&root, axes, w, h);
            let coords = draw_axes(&area, axes, points)?;
            if !points.is_empty() {
                located = coords;
            }
        }
        root.present().map_err(draw_error)?;
    }

    let image = RgbImage::from_raw(w, h, buf)
        .ok_or_else(|| FigureError::Shape(format!("buffer does not hold a {}x{} image", w, h)))?;
    Ok((image, located))
}

/// Sub-area covered by the axes rectangle
fn axes_area<'b>(
    root: &DrawingArea<BitMapBackend<'b>, Shift>,
    axes: &Axes,
    w: u32,
    h: u32,
) -> DrawingArea<BitMapBackend<'b>, Shift> {
    let (w, h) = (f64::from(w), f64::from(h));
    let rect = axes.rect();
    let left = (rect.left * w).round() as i32;
    let top = ((1.0 - rect.top()) * h).round() as i32;
    let width = ((rect.width * w).round() as i32).max(1);
    let height = ((rect.height * h).round() as i32).max(1);
    root.clone().shrink((left, top), (width, height))
}

/// Finite, non-empty plotting range
fn chart_range((lo, hi): (f64, f64)) -> Range<f64> {
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    if lo == hi {
        return lo - 0.5..hi + 0.5;
    }
    lo..hi
}

fn draw_axes(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    axes: &Axes,
    locate: &[(f64, f64)],
) -> Result<Vec<(i32, i32)>, FigureError> {
    let xs = chart_range(axes.get_xlim());
    let ys = chart_range(axes.get_ylim());
    let mut chart = ChartBuilder::on(area)
        .build_cartesian_2d(xs.clone(), ys.clone())
        .map_err(draw_error)?;

    let clip = Clip::new(xs, ys);
    for artist in axes.artists() {
        draw_artist(&mut chart, &clip, artist)?;
    }
    draw_frame(area, axes)?;

    Ok(locate.iter().map(|p| chart.backend_coord(p)).collect())
}

/// Data-space bounds of one chart; nothing is drawn outside them
struct Clip {
    x: (f64, f64),
    y: (f64, f64),
}

impl Clip {
    fn new(xs: Range<f64>, ys: Range<f64>) -> Self {
        Self {
            x: (xs.start.min(xs.end), xs.start.max(xs.end)),
            y: (ys.start.min(ys.end), ys.start.max(ys.end)),
        }
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x.0 && x <= self.x.1 && y >= self.y.0 && y <= self.y.1
    }

    /// Rectangle clamped to the bounds, `None` when nothing is left
    fn rect(&self, xa: f64, ya: f64, xb: f64, yb: f64) -> Option<[(f64, f64); 2]> {
        if ![xa, ya, xb, yb].iter().all(|v| v.is_finite()) {
            return None;
        }
        let x0 = xa.min(xb).max(self.x.0);
        let x1 = xa.max(xb).min(self.x.1);
        let y0 = ya.min(yb).max(self.y.0);
        let y1 = ya.max(yb).min(self.y.1);
        (x0 <= x1 && y0 <= y1).then_some([(x0, y0), (x1, y1)])
    }

    /// Consecutive runs of in-bounds vertices
    fn runs(&self, xs: &[f64], ys: &[f64]) -> Vec<Vec<(f64, f64)>> {
        let mut runs = Vec::new();
        let mut current = Vec::new();
        for (&x, &y) in xs.iter().zip(ys) {
            if self.contains(x, y) {
                current.push((x, y));
            } else if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }
}

fn draw_markers(
    chart: &mut Chart<'_, '_>,
    clip: &Clip,
    xs: &[f64],
    ys: &[f64],
    fills: impl Iterator<Item = Color>,
    size: u32,
) -> Result<(), FigureError> {
    let points: Vec<((f64, f64), Color)> = xs
        .iter()
        .zip(ys)
        .zip(fills)
        .filter(|((x, y), _)| clip.contains(**x, **y))
        .map(|((&x, &y), c)| ((x, y), c))
        .collect();
    if size <= 1 {
        chart
            .draw_series(points.into_iter().map(|(p, c)| Pixel::new(p, rgb(c))))
            .map_err(draw_error)?;
    } else {
        let radius = (size / 2) as i32;
        chart
            .draw_series(
                points
                    .into_iter()
                    .map(|(p, c)| Circle::new(p, radius, rgb(c).filled())),
            )
            .map_err(draw_error)?;
    }
    Ok(())
}

fn draw_artist(chart: &mut Chart<'_, '_>, clip: &Clip, artist: &Artist) -> Result<(), FigureError> {
    match artist {
        Artist::Scatter { xs, ys, color, size } => {
            draw_markers(chart, clip, xs, ys, std::iter::repeat(*color), *size)?;
        }
        Artist::ScatterValues { xs, ys, values, size } => {
            let levels = normalize_u8(values);
            draw_markers(chart, clip, xs, ys, levels.into_iter().map(level_color), *size)?;
        }
        Artist::Line { xs, ys, color } => {
            let style = rgb(*color);
            chart
                .draw_series(
                    clip.runs(xs, ys)
                        .into_iter()
                        .map(|run| PathElement::new(run, style)),
                )
                .map_err(draw_error)?;
        }
        Artist::Bars { xs, heights, width, color } => {
            let style = rgb(*color).filled();
            let bars: Vec<_> = xs
                .iter()
                .zip(heights)
                .filter_map(|(&x, &height)| clip.rect(x - width / 2.0, 0.0, x + width / 2.0, height))
                .collect();
            chart
                .draw_series(bars.into_iter().map(|r| Rectangle::new(r, style)))
                .map_err(draw_error)?;
        }
        Artist::Image { values, rows, cols, extent } => {
            let levels = normalize_u8(values);
            let cw = (extent.x1 - extent.x0) / *cols as f64;
            let rh = (extent.y1 - extent.y0) / *rows as f64;
            let cells: Vec<_> = levels
                .iter()
                .enumerate()
                .filter_map(|(i, &level)| {
                    let (r, c) = (i / cols, i % cols);
                    let x = extent.x0 + c as f64 * cw;
                    let y = extent.y0 + r as f64 * rh;
                    clip.rect(x, y, x + cw, y + rh).map(|rect| (rect, level))
                })
                .collect();
            chart
                .draw_series(
                    cells
                        .into_iter()
                        .map(|(rect, level)| Rectangle::new(rect, rgb(level_color(level)).filled())),
                )
                .map_err(draw_error)?;
        }
        Artist::Span { axis, lo, hi, color } => {
            let rect = match axis {
                SpanAxis::Y => clip.rect(clip.x.0, *lo, clip.x.1, *hi),
                SpanAxis::X => clip.rect(*lo, clip.y.0, *hi, clip.y.1),
            };
            if let Some(rect) = rect {
                chart
                    .draw_series(std::iter::once(Rectangle::new(rect, rgb(*color).filled())))
                    .map_err(draw_error)?;
            }
        }
    }
    Ok(())
}

/// Axis lines in black, the closing edges in grey
fn draw_frame(area: &DrawingArea<BitMapBackend<'_>, Shift>, axes: &Axes) -> Result<(), FigureError> {
    if !axes.has_frame() {
        return Ok(());
    }
    let (w, h) = area.dim_in_pixel();
    let (right, bottom) = (w as i32 - 1, h as i32 - 1);
    let mut edges = Vec::with_capacity(4);
    if axes.x_visible() {
        edges.push((vec![(0, bottom), (right, bottom)], colors::BLACK));
    }
    if axes.y_visible() {
        edges.push((vec![(0, 0), (0, bottom)], colors::BLACK));
    }
    edges.push((vec![(0, 0), (right, 0)], colors::GREY));
    edges.push((vec![(right, 0), (right, bottom)], colors::GREY));
    for (points, color) in edges {
        area.draw(&PathElement::new(points, rgb(color)))
            .map_err(draw_error)?;
    }
    Ok(())
}
