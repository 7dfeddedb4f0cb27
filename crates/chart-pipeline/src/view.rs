// File: crates/chart-pipeline/src/view.rs
// Visible ranges of stacked data and helpers for brushing/autoscale.

use chrono::NaiveDateTime;

use crate::stack::Layer;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
    pub x_min: NaiveDateTime,
    pub x_max: NaiveDateTime,
    pub y_min: f64,
    pub y_max: f64,
}

impl ViewState {
    /// Key range of all layers, with `y` from zero to the tallest stack.
    /// `None` when there are no points.
    pub fn from_stacked(layers: &[Layer]) -> Option<Self> {
        let mut points = layers.iter().flat_map(|l| l.points.iter());
        let first = points.next()?;
        let (mut x_min, mut x_max, mut y_max) = (first.x, first.x, first.top());
        for p in points {
            x_min = x_min.min(p.x);
            x_max = x_max.max(p.x);
            y_max = y_max.max(p.top());
        }
        Some(Self { x_min, x_max, y_min: 0.0, y_max })
    }

    /// Fit `y_max` to the stacks inside the current x range.
    pub fn autoscale_y_visible(&mut self, layers: &[Layer]) -> bool {
        match visible_y_max(layers, self.x_min, self.x_max) {
            Some(y_max) => {
                self.y_min = 0.0;
                self.y_max = y_max;
                true
            }
            None => false,
        }
    }
}

/// Tallest stack with `x` in `[from, to]`.
pub fn visible_y_max(layers: &[Layer], from: NaiveDateTime, to: NaiveDateTime) -> Option<f64> {
    layers
        .iter()
        .flat_map(|l| l.points.iter())
        .filter(|p| p.x >= from && p.x <= to)
        .map(|p| p.top())
        .reduce(f64::max)
}

/// Sum of a layer's `y` with `x` in `[from, to)`.
pub fn total_within(layer: &Layer, from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    layer.points.iter().filter(|p| p.x >= from && p.x < to).map(|p| p.y).sum()
}
