//! A minimal line chart of the loss history, drawn straight onto an RGB canvas.

use image::{Rgb, RgbImage};

use crate::{GanErr, Result, training::LossHistory};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 400;

const LEFT: i64 = 64;
const RIGHT: i64 = WIDTH as i64 - 20;
const TOP: i64 = 32;
const BOTTOM: i64 = HEIGHT as i64 - 44;

const TICK: i64 = 5;
const MAX_X_TICKS: usize = 10;
const Y_TICKS: usize = 5;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const GENERATOR: Rgb<u8> = Rgb([31, 119, 180]);
const DISCRIMINATOR: Rgb<u8> = Rgb([255, 127, 14]);

const X_LABEL: &str = "Epoch";
const Y_LABEL: &str = "Loss";
const LEGEND: [(&str, Rgb<u8>); 2] = [("G loss", GENERATOR), ("D loss", DISCRIMINATOR)];

/// Horizontal advance of a glyph, in font pixels.
const ADVANCE: i64 = 6;

/// 5×7 bitmap of `c`, one byte per row with the leftmost column in bit 4.
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c {
        '0' => [0x0e, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0e],
        '1' => [0x04, 0x0c, 0x04, 0x04, 0x04, 0x04, 0x0e],
        '2' => [0x0e, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1f],
        '3' => [0x1f, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0e],
        '4' => [0x02, 0x06, 0x0a, 0x12, 0x1f, 0x02, 0x02],
        '5' => [0x1f, 0x10, 0x1e, 0x01, 0x01, 0x11, 0x0e],
        '6' => [0x06, 0x08, 0x10, 0x1e, 0x11, 0x11, 0x0e],
        '7' => [0x1f, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0e, 0x11, 0x11, 0x0e, 0x11, 0x11, 0x0e],
        '9' => [0x0e, 0x11, 0x11, 0x0f, 0x01, 0x02, 0x0c],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0c, 0x0c],
        '-' => [0x00, 0x00, 0x00, 0x1f, 0x00, 0x00, 0x00],
        'D' => [0x1e, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1e],
        'E' => [0x1f, 0x10, 0x10, 0x1e, 0x10, 0x10, 0x1f],
        'G' => [0x0e, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0f],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1f],
        'c' => [0x00, 0x00, 0x0e, 0x10, 0x10, 0x11, 0x0e],
        'h' => [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x11],
        'l' => [0x0c, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0e],
        'o' => [0x00, 0x00, 0x0e, 0x11, 0x11, 0x11, 0x0e],
        'p' => [0x00, 0x00, 0x1e, 0x11, 0x1e, 0x10, 0x10],
        's' => [0x00, 0x00, 0x0e, 0x10, 0x0e, 0x01, 0x1e],
        _ => return None,
    };
    Some(rows)
}

/// Renders both loss curves, epochs on the x axis, with labelled axes and a legend in the top
/// right corner.
///
/// # Errors
/// `EmptyHistory` if no epoch was recorded yet.
pub fn render_loss_plot(history: &LossHistory) -> Result<RgbImage> {
    if history.is_empty() {
        return Err(GanErr::EmptyHistory);
    }

    let mut canvas = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    let scale = Scale::fit(history);

    for i in 0..=Y_TICKS {
        let y = BOTTOM - (BOTTOM - TOP) * i as i64 / Y_TICKS as i64;
        draw_line(&mut canvas, (LEFT, y), (RIGHT, y), GRID);
        draw_line(&mut canvas, (LEFT - TICK, y), (LEFT, y), AXIS);

        let label = tick_label(scale.tick_value(i, Y_TICKS));
        let x = LEFT - TICK - 3 - text_width(&label, 1);
        draw_text(&mut canvas, (x, y - 3), &label, 1, AXIS);
    }

    let step = history.len().div_ceil(MAX_X_TICKS).max(1);
    for epoch in (0..history.len()).step_by(step) {
        let x = scale.x(epoch);
        draw_line(&mut canvas, (x, BOTTOM), (x, BOTTOM + TICK), AXIS);

        let label = epoch.to_string();
        let origin = (x - text_width(&label, 1) / 2, BOTTOM + TICK + 3);
        draw_text(&mut canvas, origin, &label, 1, AXIS);
    }

    draw_line(&mut canvas, (LEFT, TOP), (LEFT, BOTTOM), AXIS);
    draw_line(&mut canvas, (LEFT, BOTTOM), (RIGHT, BOTTOM), AXIS);

    let x_label = ((LEFT + RIGHT - text_width(X_LABEL, 2)) / 2, BOTTOM + 22);
    draw_text(&mut canvas, x_label, X_LABEL, 2, AXIS);
    draw_text(&mut canvas, (8, 8), Y_LABEL, 2, AXIS);

    draw_series(&mut canvas, &scale, history.generator(), GENERATOR);
    draw_series(&mut canvas, &scale, history.discriminator(), DISCRIMINATOR);

    draw_legend(&mut canvas, &LEGEND);

    Ok(canvas)
}

/// Maps (epoch, loss) pairs to canvas coordinates.
struct Scale {
    epochs: usize,
    low: f32,
    high: f32,
}

impl Scale {
    fn fit(history: &LossHistory) -> Self {
        let values = history.generator().iter().chain(history.discriminator());
        let (low, high) = values.fold((f32::MAX, f32::MIN), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

        let pad = if high - low < f32::EPSILON {
            0.5
        } else {
            (high - low) * 0.05
        };
        let (low, high) = (low - pad, high + pad);

        Self {
            epochs: history.len(),
            low,
            high,
        }
    }

    fn x(&self, epoch: usize) -> i64 {
        if self.epochs < 2 {
            return (LEFT + RIGHT) / 2;
        }

        LEFT + (RIGHT - LEFT) * epoch as i64 / (self.epochs - 1) as i64
    }

    /// Loss at the `i`-th of `n` evenly spaced horizontal grid lines, from the bottom.
    fn tick_value(&self, i: usize, n: usize) -> f32 {
        self.low + (self.high - self.low) * i as f32 / n as f32
    }

    fn y(&self, loss: f32) -> i64 {
        let t = (loss - self.low) / (self.high - self.low);
        BOTTOM - ((BOTTOM - TOP) as f32 * t).round() as i64
    }
}

fn draw_series(canvas: &mut RgbImage, scale: &Scale, losses: &[f32], color: Rgb<u8>) {
    let points: Vec<_> = losses
        .iter()
        .enumerate()
        .map(|(epoch, &loss)| (scale.x(epoch), scale.y(loss)))
        .collect();

    for pair in points.windows(2) {
        draw_line(canvas, pair[0], pair[1], color);
        draw_line(canvas, (pair[0].0, pair[0].1 + 1), (pair[1].0, pair[1].1 + 1), color);
    }

    for &(x, y) in &points {
        fill_rect(canvas, (x - 2, y - 2), (5, 5), color);
    }
}

fn draw_legend(canvas: &mut RgbImage, entries: &[(&str, Rgb<u8>)]) {
    const ROW: i64 = 20;

    let left = RIGHT - 110;
    let top = TOP + 10;

    for (i, (label, color)) in entries.iter().enumerate() {
        let y = top + i as i64 * ROW;
        fill_rect(canvas, (left, y + 5), (24, 4), *color);
        draw_text(canvas, (left + 32, y), label, 2, AXIS);
    }
}

/// Formats a y axis value, dropping the decimals of large losses.
fn tick_label(value: f32) -> String {
    if value.abs() >= 100. {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn text_width(text: &str, pixel: i64) -> i64 {
    (text.chars().count() as i64 * ADVANCE - 1).max(0) * pixel
}

/// Draws `text` with its top left corner at `origin`, each font pixel `pixel` canvas pixels wide.
/// Characters without a glyph are left blank.
fn draw_text(canvas: &mut RgbImage, origin: (i64, i64), text: &str, pixel: i64, color: Rgb<u8>) {
    let (x0, y0) = origin;

    for (i, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else {
            continue;
        };
        let left = x0 + i as i64 * ADVANCE * pixel;

        for (row, bits) in rows.iter().enumerate() {
            for col in 0..5 {
                if bits & (0x10 >> col) != 0 {
                    let at = (left + col * pixel, y0 + row as i64 * pixel);
                    fill_rect(canvas, at, (pixel, pixel), color);
                }
            }
        }
    }
}

fn fill_rect(canvas: &mut RgbImage, (x0, y0): (i64, i64), (w, h): (i64, i64), color: Rgb<u8>) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            put(canvas, x, y, color);
        }
    }
}

/// Bresenham's line, clipped to the canvas.
fn draw_line(canvas: &mut RgbImage, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgb<u8>) {
    let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
    let (sx, sy) = ((x1 - x0).signum(), (y1 - y0).signum());
    let (mut x, mut y, mut err) = (x0, y0, dx + dy);

    loop {
        put(canvas, x, y, color);
        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn put(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if (0..canvas.width() as i64).contains(&x) && (0..canvas.height() as i64).contains(&y) {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(canvas: &RgbImage, color: Rgb<u8>) -> usize {
        canvas.pixels().filter(|&&p| p == color).count()
    }

    #[test]
    fn empty_history_is_an_error() {
        assert!(matches!(
            render_loss_plot(&LossHistory::default()),
            Err(GanErr::EmptyHistory)
        ));
    }

    #[test]
    fn both_curves_and_axes_are_drawn() {
        let mut history = LossHistory::default();
        history.push(2.0, 1.4);
        history.push(1.5, 1.2);
        history.push(1.1, 1.3);

        let canvas = render_loss_plot(&history).unwrap();

        assert_eq!(canvas.dimensions(), (WIDTH, HEIGHT));
        assert!(count(&canvas, GENERATOR) > 100);
        assert!(count(&canvas, DISCRIMINATOR) > 100);
        assert_eq!(canvas.get_pixel(LEFT as u32, (TOP + 1) as u32), &AXIS);
        assert_eq!(canvas.get_pixel((RIGHT - 1) as u32, BOTTOM as u32), &AXIS);
    }

    #[test]
    fn every_label_character_has_a_glyph() {
        let labels = [X_LABEL, Y_LABEL, LEGEND[0].0, LEGEND[1].0, "0123456789.-"];
        for c in labels.iter().flat_map(|l| l.chars()).filter(|&c| c != ' ') {
            assert!(glyph(c).is_some(), "no glyph for {c:?}");
        }
    }

    #[test]
    fn axis_titles_and_tick_labels_are_drawn() {
        let mut history = LossHistory::default();
        history.push(2.0, 1.4);
        history.push(1.5, 1.2);

        let canvas = render_loss_plot(&history).unwrap();
        let inked = |x0: i64, y0: i64, w: i64, h: i64| {
            (y0..y0 + h)
                .flat_map(|y| (x0..x0 + w).map(move |x| (x, y)))
                .any(|(x, y)| canvas.get_pixel(x as u32, y as u32) == &AXIS)
        };

        // "Epoch" under the x axis, "Loss" above the y axis, tick values left of it.
        let x_label = text_width(X_LABEL, 2);
        assert!(inked((LEFT + RIGHT - x_label) / 2, BOTTOM + 22, x_label, 14));
        assert!(inked(8, 8, text_width(Y_LABEL, 2), 14));
        assert!(inked(0, TOP, LEFT - TICK - 1, BOTTOM - TOP));
    }

    #[test]
    fn large_losses_drop_their_decimals() {
        assert_eq!(tick_label(0.6931), "0.69");
        assert_eq!(tick_label(1234.2), "1234");
        assert_eq!(text_width("ab", 2), 22);
    }

    #[test]
    fn single_epoch_and_flat_curves_render() {
        let mut history = LossHistory::default();
        history.push(0.7, 0.7);

        let canvas = render_loss_plot(&history).unwrap();
        assert!(count(&canvas, DISCRIMINATOR) > 0);
    }
}
