//! # Tide Chart Renderer
//!
//! Turns one day of tide and sun data into a 250×122 bitmap:
//!
//! - a filled tide silhouette spanning midnight to midnight
//! - high/low tide times along the top (high) and bottom (low) of the canvas
//! - the date of the day, top left
//! - the day's highest and lowest predicted heights, left edge
//! - rings on the curve where the sun rises and sets
//!
//! ## Coordinate System
//!
//! Sample `i` of `N` sits at `x = i * plot_width / N + x_buffer`, so the x axis
//! is an affine function of local time of day. Heights are scaled so that the
//! range `[min, max]` fills `band_height` pixels, ending `y_buffer` pixels above
//! the bottom edge. Two zero heights are folded into the range first, which
//! keeps the zero line on the chart even when every real sample is above (or
//! below) it; the silhouette is closed along that zero line.
//!
//! ## Purity
//!
//! [`render`] only reads its arguments and returns a fresh image, so rendering
//! the same day twice yields identical bitmaps. Invalid input fails the whole
//! call before anything is drawn. Geometry is computed by [`ChartLayout::compute`]
//! separately from drawing so positions can be inspected directly.

use crate::{config::DisplayConfig, image::RenderedImage, TideDay, TideKind};
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_9X15_BOLD},
        MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{
        Circle, Polyline, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, StrokeAlignment,
    },
    text::{Baseline, Text},
};
use log::debug;
use thiserror::Error;

/// Label x position per hour of the event time
const PIXELS_PER_HOUR: i32 = 10;
/// Leftmost high/low label position (keeps clear of the height labels)
const LABEL_X_MIN: i32 = 50;
/// Rightmost high/low label position (keeps the text on the canvas)
const LABEL_X_MAX: i32 = 190;
const HIGH_LABEL_Y: i32 = 0;
const LOW_LABEL_Y: i32 = 100;
const DATE_ANCHOR: Point = Point::new(0, 0);
/// Bottom-left of the maximum height label
const MAX_LABEL_ANCHOR: Point = Point::new(0, 32);
/// Top-left of the minimum height label
const MIN_LABEL_ANCHOR: Point = Point::new(0, 94);
const SUN_STROKE_WIDTH: u32 = 2;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Input the chart cannot be drawn from.
///
/// Every variant is an invalid-input condition; nothing is retried or drawn.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    /// The sample series does not match the configured sample count
    #[error("expected {expected} tide samples, got {actual}")]
    SampleCount { expected: usize, actual: usize },

    /// The chart geometry has no samples to lay out
    #[error("chart geometry needs at least one sample")]
    EmptySeries,

    /// A tide height is NaN or infinite
    #[error("tide sample {index} is not a finite number")]
    NonFiniteSample { index: usize },

    /// A time of day or timestamp did not parse
    #[error("malformed time: {0:?}")]
    MalformedTime(String),

    /// A high/low height did not parse
    #[error("malformed tide height: {0:?}")]
    MalformedHeight(String),

    /// A high/low type other than `H` or `L`
    #[error("unknown tide type: {0:?}")]
    UnknownTideKind(String),
}

/// Fixed canvas and plot dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartGeometry {
    pub width: u32,
    pub height: u32,
    pub x_buffer: i32,
    pub y_buffer: i32,
    pub plot_width: u32,
    pub band_height: f32,
    pub sample_count: usize,
    pub sun_radius: u32,
}

impl Default for ChartGeometry {
    fn default() -> Self {
        Self::from(&DisplayConfig::default())
    }
}

impl From<&DisplayConfig> for ChartGeometry {
    fn from(display: &DisplayConfig) -> Self {
        ChartGeometry {
            width: display.width,
            height: display.height,
            x_buffer: display.x_buffer,
            y_buffer: display.y_buffer,
            plot_width: display.plot_width,
            band_height: display.band_height,
            sample_count: display.sample_count,
            sun_radius: display.sun_radius,
        }
    }
}

impl ChartGeometry {
    /// Horizontal pixel position of sample `index`.
    pub fn sample_x(&self, index: usize) -> f32 {
        index as f32 * (self.plot_width as f32 / self.sample_count as f32) + self.x_buffer as f32
    }

    /// Pixel row of the lowest height in the scaled range.
    fn bottom(&self) -> f32 {
        (self.height as i32 - self.y_buffer) as f32
    }
}

/// Maps tide heights to pixel rows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VerticalScale {
    /// Lowest height in the scaled range (never above zero)
    pub min: f32,
    /// Highest height in the scaled range (never below zero)
    pub max: f32,
    pub pixels_per_unit: f32,
    bottom: f32,
}

impl VerticalScale {
    /// Fit `samples`, padded with two zero heights, into `band_height` pixels
    /// ending at row `bottom`.
    pub fn new(samples: &[f32], band_height: f32, bottom: f32) -> Self {
        let (min, max) = samples
            .iter()
            .copied()
            .chain([0.0, 0.0])
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;
        // All-zero days have no range; draw them flat on the baseline
        let pixels_per_unit = if range > 0.0 { band_height / range } else { 0.0 };
        VerticalScale {
            min,
            max,
            pixels_per_unit,
            bottom,
        }
    }

    /// Pixel row for `height`; larger heights are higher on screen.
    pub fn y(&self, height: f32) -> f32 {
        self.bottom - (height - self.min) * self.pixels_per_unit
    }
}

/// A point on the tide curve in unrounded pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurvePoint {
    pub x: f32,
    pub y: f32,
}

impl CurvePoint {
    pub fn to_point(self) -> Point {
        Point::new(self.x.round() as i32, self.y.round() as i32)
    }
}

/// Font used for a label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelFont {
    /// 10×20, high/low times
    Large,
    /// 9×15 bold, date and heights
    Small,
}

/// A positioned piece of text.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub text: String,
    /// Left edge of the text, at the row given by `baseline`
    pub anchor: Point,
    pub baseline: Baseline,
    pub font: LabelFont,
}

impl Label {
    fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let font = match self.font {
            LabelFont::Large => &FONT_10X20,
            LabelFont::Small => &FONT_9X15_BOLD,
        };
        let style = MonoTextStyle::new(font, BinaryColor::On);
        Text::with_baseline(&self.text, self.anchor, style, self.baseline).draw(target)?;
        Ok(())
    }
}

/// Where a sunrise or sunset ring lands on the curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SunMarker {
    /// Sample index nearest the event
    pub index: usize,
    pub center: Point,
}

impl SunMarker {
    fn locate(time: NaiveTime, curve: &[CurvePoint]) -> Self {
        let index = sun_index(time, curve.len());
        SunMarker {
            index,
            center: curve[index].to_point(),
        }
    }
}

/// All chart geometry for one day, ready to draw.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartLayout {
    pub scale: VerticalScale,
    /// One point per sample
    pub curve: Vec<CurvePoint>,
    /// The curve plus two vertices closing it along the zero line
    pub polygon: Vec<Point>,
    /// High/low times, in event order
    pub time_labels: Vec<Label>,
    /// Absent when there are no high/low events
    pub date_label: Option<Label>,
    pub max_label: Label,
    pub min_label: Label,
    pub sunrise: SunMarker,
    pub sunset: SunMarker,
    sun_radius: u32,
}

impl ChartLayout {
    /// Validate `day` against `geometry` and lay out every chart element.
    pub fn compute(geometry: &ChartGeometry, day: &TideDay) -> Result<Self, ChartError> {
        let n = geometry.sample_count;
        if n == 0 {
            return Err(ChartError::EmptySeries);
        }
        if day.samples.len() != n {
            return Err(ChartError::SampleCount {
                expected: n,
                actual: day.samples.len(),
            });
        }
        if let Some(index) = day.samples.iter().position(|v| !v.is_finite()) {
            return Err(ChartError::NonFiniteSample { index });
        }

        let scale = VerticalScale::new(&day.samples, geometry.band_height, geometry.bottom());
        let curve: Vec<CurvePoint> = day
            .samples
            .iter()
            .enumerate()
            .map(|(i, &height)| CurvePoint {
                x: geometry.sample_x(i),
                y: scale.y(height),
            })
            .collect();

        let base = scale.y(0.0);
        let mut polygon: Vec<Point> = curve.iter().map(|p| p.to_point()).collect();
        polygon.push(CurvePoint { x: curve[n - 1].x, y: base }.to_point());
        polygon.push(CurvePoint { x: curve[0].x, y: base }.to_point());

        let time_labels = day
            .events
            .iter()
            .map(|event| Label {
                text: hilo_time_label(event.time.time()),
                anchor: Point::new(
                    hilo_label_x(event.time.hour()),
                    match event.kind {
                        TideKind::High => HIGH_LABEL_Y,
                        TideKind::Low => LOW_LABEL_Y,
                    },
                ),
                baseline: Baseline::Top,
                font: LabelFont::Large,
            })
            .collect();

        // The date shown is the date of the last high/low event
        let date_label = day.events.last().map(|event| Label {
            text: date_label(event.time.date()),
            anchor: DATE_ANCHOR,
            baseline: Baseline::Top,
            font: LabelFont::Small,
        });

        let (lowest, highest) = day
            .samples
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let max_label = Label {
            text: height_label(highest),
            anchor: MAX_LABEL_ANCHOR,
            baseline: Baseline::Bottom,
            font: LabelFont::Small,
        };
        let min_label = Label {
            text: height_label(lowest),
            anchor: MIN_LABEL_ANCHOR,
            baseline: Baseline::Top,
            font: LabelFont::Small,
        };

        let sunrise = SunMarker::locate(day.sunrise, &curve);
        let sunset = SunMarker::locate(day.sunset, &curve);

        Ok(ChartLayout {
            scale,
            curve,
            polygon,
            time_labels,
            date_label,
            max_label,
            min_label,
            sunrise,
            sunset,
            sun_radius: geometry.sun_radius,
        })
    }

    /// Draw the chart in ink (`BinaryColor::On`) onto `target`.
    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        fill_polygon(&self.polygon, target)?;
        let mut outline = self.polygon.clone();
        outline.push(self.polygon[0]);
        Polyline::new(&outline)
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(target)?;

        for label in &self.time_labels {
            label.draw(target)?;
        }
        if let Some(label) = &self.date_label {
            label.draw(target)?;
        }
        self.max_label.draw(target)?;
        self.min_label.draw(target)?;

        let ring = PrimitiveStyleBuilder::new()
            .stroke_color(BinaryColor::On)
            .stroke_width(SUN_STROKE_WIDTH)
            .stroke_alignment(StrokeAlignment::Inside)
            .build();
        for marker in [self.sunrise, self.sunset] {
            Circle::with_center(marker.center, 2 * self.sun_radius + 1)
                .into_styled(ring)
                .draw(target)?;
        }
        Ok(())
    }
}

/// Render one day of tide data into a new image.
///
/// Fails without producing an image when the input is invalid, so a caller
/// can keep showing whatever it displayed before.
pub fn render(geometry: &ChartGeometry, day: &TideDay) -> Result<RenderedImage, ChartError> {
    let layout = ChartLayout::compute(geometry, day)?;
    debug!(
        "Chart scale {:.2}..{:.2} ft at {:.2} px/ft, {} high/low labels",
        layout.scale.min,
        layout.scale.max,
        layout.scale.pixels_per_unit,
        layout.time_labels.len()
    );

    let mut image = RenderedImage::new(geometry.width, geometry.height);
    layout.draw(&mut image).unwrap_or_else(|never| match never {});
    Ok(image)
}

/// High/low label text: hour without a leading zero, e.g. `8:05`, `0:15`, `14:51`.
pub fn hilo_time_label(time: NaiveTime) -> String {
    format!("{}:{:02}", time.hour(), time.minute())
}

/// High/low label x position. Only the hour is used, so events in the same
/// or adjacent hours can overlap.
pub fn hilo_label_x(hour: u32) -> i32 {
    (hour as i32 * PIXELS_PER_HOUR).clamp(LABEL_X_MIN, LABEL_X_MAX)
}

/// `month/day` without leading zeros.
pub fn date_label(date: NaiveDate) -> String {
    format!("{}/{}", date.month(), date.day())
}

/// Height rounded to one decimal place.
pub fn height_label(height: f32) -> String {
    format!("{:.1}", height)
}

/// Fraction of the day elapsed at `time`, in `[0, 1)`.
pub fn day_fraction(time: NaiveTime) -> f64 {
    f64::from(time.num_seconds_from_midnight()) / SECONDS_PER_DAY
}

/// Nearest sample index to `time` in a day of `sample_count` samples.
///
/// Times in the last half-interval before midnight would round to
/// `sample_count`; they are clamped to the last sample.
pub fn sun_index(time: NaiveTime, sample_count: usize) -> usize {
    let index = (sample_count as f64 * day_fraction(time)).round() as usize;
    index.min(sample_count.saturating_sub(1))
}

/// Even-odd scanline fill. Vertices are pixel centres.
fn fill_polygon<D>(vertices: &[Point], target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    if vertices.len() < 3 {
        return Ok(());
    }
    let (top, bottom) = vertices
        .iter()
        .fold((i32::MAX, i32::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));

    let mut crossings: Vec<f32> = Vec::with_capacity(vertices.len());
    for row in top..=bottom {
        let scan = row as f32;
        crossings.clear();
        for (a, b) in vertices.iter().zip(vertices.iter().cycle().skip(1)) {
            let (ay, by) = (a.y as f32, b.y as f32);
            if (ay <= scan) != (by <= scan) {
                let t = (scan - ay) / (by - ay);
                crossings.push(a.x as f32 + t * (b.x - a.x) as f32);
            }
        }
        crossings.sort_by(f32::total_cmp);

        for span in crossings.chunks_exact(2) {
            let start = span[0].ceil() as i32;
            let end = span[1].floor() as i32;
            if end >= start {
                let area = Rectangle::new(
                    Point::new(start, row),
                    Size::new((end - start + 1) as u32, 1),
                );
                target.fill_solid(&area, BinaryColor::On)?;
            }
        }
    }
    Ok(())
}
