//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid, deterministic (helpful for golden tests):
//! - main curve: `-` line, broken at missing samples
//! - optional overlay: `o` at every sample (e.g. a reconstruction)

/// Render one spectrum, optionally with an overlay sampled on the same grid.
pub fn render_spectrum(
    wavelengths: &[f64],
    values: &[f64],
    overlay: Option<&[f64]>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (w_min, w_max) = finite_range(wavelengths.iter().copied()).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = finite_range(values.iter().chain(overlay.unwrap_or(&[])).copied()).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    let mut prev: Option<(usize, usize)> = None;
    for (&w, &v) in wavelengths.iter().zip(values) {
        if !(w.is_finite() && v.is_finite()) {
            prev = None;
            continue;
        }
        let x = map_x(w, w_min, w_max, width);
        let y = map_y(v, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(&mut grid, x0, y0, x, y, '-'),
            None => grid[y][x] = '-',
        }
        prev = Some((x, y));
    }

    if let Some(overlay) = overlay {
        for (&w, &v) in wavelengths.iter().zip(overlay) {
            if w.is_finite() && v.is_finite() {
                grid[map_y(v, y_min, y_max, height)][map_x(w, w_min, w_max, width)] = 'o';
            }
        }
    }

    let mut out = format!("Spectrum: wavelength=[{w_min:.0}, {w_max:.0}] A | flux=[{y_min:.2}, {y_max:.2}]\n");
    for row in grid {
        out.extend(row);
        out.push('\n');
    }
    out
}

fn finite_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    (min.is_finite() && max > min).then_some((min, max))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let pad = ((max - min).abs() * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(w: f64, w_min: f64, w_max: f64, width: usize) -> usize {
    let u = ((w - w_min) / (w_max - w_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top.
    (height as f64 - 1.0 - u * (height as f64 - 1.0)).round() as usize
}

/// Bresenham line; only fills blank cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let (mut x, mut y) = (x0 as isize, y0 as isize);
    let (x1, y1) = (x1 as isize, y1 as isize);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        let cell = &mut grid[y as usize][x as usize];
        if *cell == ' ' {
            *cell = ch;
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golden_rising_line() {
        let txt = render_spectrum(&[4000.0, 5000.0], &[0.0, 1.0], None, 10, 5);
        let expected = concat!(
            "Spectrum: wavelength=[4000, 5000] A | flux=[-0.05, 1.05]\n",
            "        --\n",
            "      --  \n",
            "    --    \n",
            "  --      \n",
            "--        \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn overlay_marks_samples_on_top() {
        let txt = render_spectrum(&[4000.0, 5000.0], &[0.0, 1.0], Some(&[1.0, 0.0]), 10, 5);
        let rows: Vec<&str> = txt.lines().skip(1).collect();
        assert_eq!(rows[0], "o       --");
        assert_eq!(rows[4], "--       o");
    }

    #[test]
    fn missing_samples_break_the_line() {
        let w = [1.0, 2.0, 3.0, 4.0, 5.0];
        let v = [0.0, 1.0, f64::NAN, 1.0, 0.0];
        let txt = render_spectrum(&w, &v, None, 10, 5);
        assert!(txt.lines().skip(1).all(|row| row.chars().count() == 10));
        // Samples 2 and 4 sit on the top row at columns 2 and 7; nothing joins them.
        let top = txt.lines().nth(1).unwrap();
        assert_eq!(&top[2..8], "-    -");
    }
}
