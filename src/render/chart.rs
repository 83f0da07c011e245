//! Character-grid voltammogram plot.
//!
//! The terminal stand-in for the original SVG plot: potential on the x
//! axis (domain fixed at run start from the sweep window), current on the
//! y axis (domain recomputed from the trace each frame, padded 10% like
//! the d3 version). Writes a full frame of `height` lines to any
//! `io::Write`; positioning on screen is the caller's business.

use std::io::{self, Write};

use crate::buffer::DataPoint;

/// Width of the y-axis label gutter, including the axis column.
const GUTTER: usize = 11;

/// Fixed-size plot surface.
#[derive(Debug)]
pub struct AsciiChart {
    width: usize,
    height: usize,
    x_lo: f64,
    x_hi: f64,
}

impl AsciiChart {
    /// A chart `width` x `height` characters. Sizes below the gutter and
    /// axis rows are clamped to the minimum drawable surface.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width: width.max(GUTTER + 8),
            height: height.max(4),
            x_lo: 0.0,
            x_hi: 0.0,
        }
    }

    /// Fix the x domain for a run from the sweep window; order of the
    /// bounds does not matter.
    pub fn init(&mut self, lval: f64, rval: f64) {
        self.x_lo = lval.min(rval);
        self.x_hi = lval.max(rval);
    }

    /// Redraw the full trace from scratch into `out`: exactly
    /// `self.height` newline-terminated lines.
    pub fn render(&self, points: &[DataPoint], out: &mut dyn Write) -> io::Result<()> {
        let plot_w = self.width - GUTTER;
        let plot_h = self.height - 2;
        let (y_lo, y_hi) = self.y_domain(points);

        let mut grid = vec![vec![' '; plot_w]; plot_h];
        for point in points {
            if let Some((col, row)) = self.project(point, plot_w, plot_h, y_lo, y_hi) {
                grid[row][col] = '*';
            }
        }

        for (row, cells) in grid.iter().enumerate() {
            let label = if row == 0 {
                format!("{y_hi:>9.2e}")
            } else if row == plot_h - 1 {
                format!("{y_lo:>9.2e}")
            } else {
                " ".repeat(9)
            };
            let line: String = cells.iter().collect();
            writeln!(out, "{label} |{line}")?;
        }

        // x axis and its two bound labels
        writeln!(out, "{} +{}", " ".repeat(9), "-".repeat(plot_w))?;
        let left = format!("{:.3}", self.x_lo);
        let right = format!("{:.3}", self.x_hi);
        let pad = plot_w.saturating_sub(left.len() + right.len());
        writeln!(out, "{} {left}{}{right}", " ".repeat(10), " ".repeat(pad))?;
        Ok(())
    }

    /// Map a point into grid coordinates; off-domain points are dropped.
    fn project(
        &self,
        point: &DataPoint,
        plot_w: usize,
        plot_h: usize,
        y_lo: f64,
        y_hi: f64,
    ) -> Option<(usize, usize)> {
        let x_span = self.x_hi - self.x_lo;
        let y_span = y_hi - y_lo;
        if x_span <= 0.0 || y_span <= 0.0 {
            return None;
        }

        let fx = (point.e - self.x_lo) / x_span;
        let fy = (point.i - y_lo) / y_span;
        if !(0.0..=1.0).contains(&fx) || !(0.0..=1.0).contains(&fy) {
            return None;
        }

        let col = (fx * (plot_w - 1) as f64).round() as usize;
        let row = ((1.0 - fy) * (plot_h - 1) as f64).round() as usize;
        Some((col, row))
    }

    /// Current domain, padded 10% beyond the trace extent. An empty or
    /// flat trace gets a unit domain so the frame still renders.
    fn y_domain(&self, points: &[DataPoint]) -> (f64, f64) {
        let mut lo = f64::MAX;
        let mut hi = f64::MIN;
        for point in points {
            lo = lo.min(1.1 * point.i);
            hi = hi.max(1.1 * point.i);
        }
        if lo >= hi {
            let mid = if points.is_empty() { 0.0 } else { points[0].i };
            (mid - 1.0, mid + 1.0)
        } else {
            (lo, hi)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_lines(chart: &AsciiChart, points: &[DataPoint]) -> Vec<String> {
        let mut out = Vec::new();
        chart.render(points, &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_frame_has_fixed_height() {
        let mut chart = AsciiChart::new(60, 20);
        chart.init(-0.3, 0.3);
        let lines = render_lines(&chart, &[]);
        assert_eq!(lines.len(), 20);
    }

    #[test]
    fn test_empty_trace_renders_axes_only() {
        let mut chart = AsciiChart::new(60, 12);
        chart.init(-0.3, 0.3);
        let lines = render_lines(&chart, &[]);
        assert!(lines.iter().all(|l| !l.contains('*')));
        assert!(lines[10].contains('+'));
        assert!(lines[11].contains("-0.300"));
        assert!(lines[11].contains("0.300"));
    }

    #[test]
    fn test_points_land_inside_the_plot() {
        let mut chart = AsciiChart::new(60, 20);
        chart.init(-1.0, 1.0);
        let points = [
            DataPoint { e: -1.0, i: 0.0 },
            DataPoint { e: 0.0, i: 5.0 },
            DataPoint { e: 1.0, i: -5.0 },
        ];
        let lines = render_lines(&chart, &points);
        let stars: usize = lines.iter().map(|l| l.matches('*').count()).sum();
        assert_eq!(stars, 3);
    }

    #[test]
    fn test_swapped_domain_bounds_are_normalised() {
        let mut chart = AsciiChart::new(60, 10);
        chart.init(0.3, -0.3);
        let points = [DataPoint { e: 0.0, i: 1.0 }];
        let lines = render_lines(&chart, &points);
        assert!(lines.iter().any(|l| l.contains('*')));
    }

    #[test]
    fn test_off_domain_points_are_dropped() {
        let mut chart = AsciiChart::new(60, 10);
        chart.init(-0.1, 0.1);
        let points = [DataPoint { e: 9.0, i: 0.0 }];
        let lines = render_lines(&chart, &points);
        assert!(lines.iter().all(|l| !l.contains('*')));
    }
}
