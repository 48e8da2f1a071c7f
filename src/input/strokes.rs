use super::MaskSource;
use anyhow::{bail, Context, Result};
use image::{Rgb, RgbImage};
use std::str::FromStr;

/// Pen width used when none is given
pub const DEFAULT_LINE_WIDTH: f32 = 10.0;

const UNMARKED: Rgb<u8> = Rgb([255, 255, 255]);
const FOREGROUND_INK: Rgb<u8> = Rgb([0, 0, 255]);
const BACKGROUND_INK: Rgb<u8> = Rgb([255, 0, 0]);

/// Polyline drawn by the user, in pixel coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub points: Vec<(f32, f32)>,
}

impl FromStr for Stroke {
    type Err = anyhow::Error;

    /// Parse whitespace-separated `x,y` points, e.g. `"10,12 40,12 40,30"`.
    fn from_str(s: &str) -> Result<Self> {
        let points = s
            .split_whitespace()
            .map(|pair| -> Result<(f32, f32)> {
                let (x, y) = pair
                    .split_once(',')
                    .with_context(|| format!("Point {pair:?} is not of the form x,y"))?;
                let x: f32 = x.trim().parse().with_context(|| format!("Bad x in {pair:?}"))?;
                let y: f32 = y.trim().parse().with_context(|| format!("Bad y in {pair:?}"))?;
                if !x.is_finite() || !y.is_finite() {
                    bail!("Point {pair:?} is not finite");
                }
                Ok((x, y))
            })
            .collect::<Result<Vec<_>>>()?;

        if points.is_empty() {
            bail!("Stroke has no points");
        }
        Ok(Self { points })
    }
}

/// Renders foreground and background strokes into a mask image.
///
/// The mask starts white; foreground strokes are inked blue, then background
/// strokes red on top, each with round caps.
#[derive(Debug, Clone)]
pub struct StrokeCanvas {
    foreground: Vec<Stroke>,
    background: Vec<Stroke>,
    line_width: f32,
}

impl Default for StrokeCanvas {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_WIDTH)
    }
}

impl StrokeCanvas {
    pub fn new(line_width: f32) -> Self {
        Self {
            foreground: Vec::new(),
            background: Vec::new(),
            line_width,
        }
    }

    pub fn add_foreground(&mut self, stroke: Stroke) {
        self.foreground.push(stroke);
    }

    pub fn add_background(&mut self, stroke: Stroke) {
        self.background.push(stroke);
    }

    pub fn is_empty(&self) -> bool {
        self.foreground.is_empty() && self.background.is_empty()
    }

    /// Forget all strokes, as after a finished segmentation
    pub fn clear(&mut self) {
        self.foreground.clear();
        self.background.clear();
    }

    fn draw(&self, mask: &mut RgbImage, stroke: &Stroke, ink: Rgb<u8>) {
        let radius = self.line_width / 2.0;
        match stroke.points.as_slice() {
            [] => {}
            [point] => draw_segment(mask, *point, *point, radius, ink),
            points => {
                for pair in points.windows(2) {
                    draw_segment(mask, pair[0], pair[1], radius, ink);
                }
            }
        }
    }
}

impl MaskSource for StrokeCanvas {
    fn render_mask(&self, width: u32, height: u32) -> Result<RgbImage> {
        if self.line_width.is_nan() || self.line_width <= 0.0 {
            bail!("Line width must be positive, got {}", self.line_width);
        }

        let mut mask = RgbImage::from_pixel(width, height, UNMARKED);
        for stroke in &self.foreground {
            self.draw(&mut mask, stroke, FOREGROUND_INK);
        }
        for stroke in &self.background {
            self.draw(&mut mask, stroke, BACKGROUND_INK);
        }

        tracing::debug!(
            "Rendered {} foreground and {} background strokes",
            self.foreground.len(),
            self.background.len()
        );
        Ok(mask)
    }
}

/// Ink every pixel within `radius` of the segment `a`-`b`
fn draw_segment(mask: &mut RgbImage, a: (f32, f32), b: (f32, f32), radius: f32, ink: Rgb<u8>) {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let clamp_x = |v: f32| v.clamp(0.0, (width - 1) as f32) as u32;
    let clamp_y = |v: f32| v.clamp(0.0, (height - 1) as f32) as u32;
    let min_x = a.0.min(b.0) - radius;
    let max_x = a.0.max(b.0) + radius;
    let min_y = a.1.min(b.1) - radius;
    let max_y = a.1.max(b.1) + radius;
    if max_x < 0.0 || max_y < 0.0 || min_x > (width - 1) as f32 || min_y > (height - 1) as f32 {
        return;
    }

    let radius2 = radius * radius;
    for y in clamp_y(min_y.floor())..=clamp_y(max_y.ceil()) {
        for x in clamp_x(min_x.floor())..=clamp_x(max_x.ceil()) {
            if distance2_to_segment((x as f32, y as f32), a, b) <= radius2 {
                mask.put_pixel(x, y, ink);
            }
        }
    }
}

fn distance2_to_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    (p.0 - cx) * (p.0 - cx) + (p.1 - cy) * (p.1 - cy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::StrokeClass;

    #[test]
    fn parses_point_lists() {
        let stroke: Stroke = "1,2  3.5,4\t5,6".parse().unwrap();
        assert_eq!(stroke.points, vec![(1.0, 2.0), (3.5, 4.0), (5.0, 6.0)]);

        assert!("".parse::<Stroke>().is_err());
        assert!("1;2".parse::<Stroke>().is_err());
        assert!("1,x".parse::<Stroke>().is_err());
        assert!("NaN,1".parse::<Stroke>().is_err());
    }

    #[test]
    fn single_point_draws_a_round_dot() {
        let mut canvas = StrokeCanvas::new(3.0);
        canvas.add_foreground("5,5".parse().unwrap());
        let mask = canvas.render_mask(11, 11).unwrap();

        assert_eq!(mask.get_pixel(5, 5), &FOREGROUND_INK);
        assert_eq!(mask.get_pixel(6, 5), &FOREGROUND_INK);
        assert_eq!(mask.get_pixel(5, 4), &FOREGROUND_INK);
        // Diagonal neighbour at sqrt(2) is inside radius 1.5.
        assert_eq!(mask.get_pixel(6, 6), &FOREGROUND_INK);
        assert_eq!(mask.get_pixel(7, 5), &UNMARKED);
        assert_eq!(mask.get_pixel(0, 0), &UNMARKED);
    }

    #[test]
    fn background_is_drawn_over_foreground() {
        let mut canvas = StrokeCanvas::new(1.0);
        canvas.add_foreground("0,2 9,2".parse().unwrap());
        canvas.add_background("4,0 4,9".parse().unwrap());
        let mask = canvas.render_mask(10, 10).unwrap();

        assert_eq!(StrokeClass::classify(mask.get_pixel(0, 2)), StrokeClass::Foreground);
        assert_eq!(StrokeClass::classify(mask.get_pixel(9, 2)), StrokeClass::Foreground);
        assert_eq!(StrokeClass::classify(mask.get_pixel(4, 2)), StrokeClass::Background);
        assert_eq!(StrokeClass::classify(mask.get_pixel(4, 7)), StrokeClass::Background);
        assert_eq!(StrokeClass::classify(mask.get_pixel(7, 7)), StrokeClass::Unmarked);
    }

    #[test]
    fn strokes_outside_the_image_are_clipped() {
        let mut canvas = StrokeCanvas::default();
        canvas.add_background("-50,-50 -40,-40".parse().unwrap());
        canvas.add_foreground("2,2 100,2".parse().unwrap());
        let mask = canvas.render_mask(8, 8).unwrap();
        assert_eq!(mask.get_pixel(7, 2), &FOREGROUND_INK);
        assert!(mask.pixels().all(|p| *p != BACKGROUND_INK));
    }

    #[test]
    fn clear_forgets_strokes() {
        let mut canvas = StrokeCanvas::default();
        canvas.add_foreground("1,1".parse().unwrap());
        assert!(!canvas.is_empty());
        canvas.clear();
        assert!(canvas.is_empty());
        let mask = canvas.render_mask(4, 4).unwrap();
        assert!(mask.pixels().all(|p| *p == UNMARKED));
    }

    #[test]
    fn rejects_non_positive_width() {
        let canvas = StrokeCanvas::new(0.0);
        assert!(canvas.render_mask(4, 4).is_err());
    }
}
