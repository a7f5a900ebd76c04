//! Squarified treemap partitioning.
//!
//! Items are turned into areas proportional to their weight, then packed in
//! rows along the shorter side of the remaining frame. A row keeps growing
//! while adding the next item does not worsen its worst aspect ratio. Each
//! step takes the remaining frame and returns the next one, so the layout is
//! a pure function of the input order.

use serde::Serialize;

use crate::geometry::{Rect, Weighted};

/// One laid out item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partition<T> {
    /// Space assigned to the item.
    pub rect: Rect,
    /// Area the item was normalized to.
    pub normalized_size: f64,
    /// The item itself.
    pub item: T,
}

/// An item with its share of the frame area.
struct Normalized<T> {
    area: f64,
    item: T,
}

/// Lay `items` out inside `frame`.
///
/// Items with a non-positive weight are dropped, except that a single item
/// always receives the whole frame. Output follows input order.
pub fn partition<T: Weighted>(items: impl IntoIterator<Item = T>, frame: Rect) -> Vec<Partition<T>> {
    let mut items: Vec<T> = items.into_iter().collect();

    if items.len() == 1 {
        let item = items.remove(0);
        return vec![Partition {
            rect: frame,
            normalized_size: frame.area(),
            item,
        }];
    }

    items.retain(|item| item.weight() > 0.0);
    let total: f64 = items.iter().map(Weighted::weight).sum();
    if items.is_empty() || !total.is_finite() {
        return Vec::new();
    }

    if frame.is_degenerate() {
        return slice(items, total, frame);
    }

    let area = frame.area();
    let normalized: Vec<Normalized<T>> = items
        .into_iter()
        .map(|item| Normalized {
            area: item.weight() / total * area,
            item,
        })
        .collect();

    squarify(normalized, frame)
}

fn squarify<T>(normalized: Vec<Normalized<T>>, frame: Rect) -> Vec<Partition<T>> {
    let areas: Vec<f64> = normalized.iter().map(|n| n.area).collect();

    let mut rects = Vec::with_capacity(areas.len());
    let mut remaining = frame;
    let mut start = 0;
    while start < areas.len() {
        if start + 1 == areas.len() {
            // The last item takes whatever is left.
            rects.push(remaining);
            break;
        }
        if remaining.is_degenerate() {
            // Rounding ate the frame; the rest collapses onto its origin.
            let collapsed = Rect::new(remaining.x, remaining.y, 0.0, 0.0);
            rects.resize(areas.len(), collapsed);
            break;
        }

        let side = remaining.shorter_side();
        let len = row_length(&areas[start..areas.len() - 1], side);
        let (row, next) = layout_row(&areas[start..start + len], remaining);
        rects.extend(row);
        remaining = next;
        start += len;
    }

    normalized
        .into_iter()
        .zip(rects)
        .map(|(n, rect)| Partition {
            rect,
            normalized_size: n.area,
            item: n.item,
        })
        .collect()
}

/// Number of leading `candidates` forming the next row (at least one).
fn row_length(candidates: &[f64], side: f64) -> usize {
    let mut len = 1;
    while len < candidates.len()
        && worst_ratio(&candidates[..len + 1], side) <= worst_ratio(&candidates[..len], side)
    {
        len += 1;
    }
    len
}

/// Worst aspect ratio of a row of areas laid along a side of length `side`.
fn worst_ratio(row: &[f64], side: f64) -> f64 {
    let sum: f64 = row.iter().sum();
    let max = row.iter().copied().fold(f64::MIN, f64::max);
    let min = row.iter().copied().fold(f64::MAX, f64::min);
    if sum == 0.0 || side == 0.0 {
        return 0.0;
    }

    let sum_squared = sum * sum;
    let side_squared = side * side;
    f64::max(
        side_squared * max / sum_squared,
        sum_squared / (side_squared * min),
    )
}

/// Place a row along the shorter side of `frame`.
///
/// Returns the rectangles of the row and the frame left after it.
fn layout_row(row: &[f64], frame: Rect) -> (Vec<Rect>, Rect) {
    let side = frame.shorter_side();
    let thickness = row.iter().sum::<f64>() / side;

    let mut rects = Vec::with_capacity(row.len());
    if frame.height <= frame.width {
        // Column along the left edge.
        let mut y = frame.y;
        for area in row {
            let height = area / thickness;
            rects.push(Rect::new(frame.x, y, thickness, height));
            y += height;
        }
        let remaining = Rect::new(
            frame.x + thickness,
            frame.y,
            (frame.width - thickness).max(0.0),
            frame.height,
        );
        (rects, remaining)
    } else {
        // Row along the top edge.
        let mut x = frame.x;
        for area in row {
            let width = area / thickness;
            rects.push(Rect::new(x, frame.y, width, thickness));
            x += width;
        }
        let remaining = Rect::new(
            frame.x,
            frame.y + thickness,
            frame.width,
            (frame.height - thickness).max(0.0),
        );
        (rects, remaining)
    }
}

/// Split a zero-area frame along its longer side.
fn slice<T: Weighted>(items: Vec<T>, total: f64, frame: Rect) -> Vec<Partition<T>> {
    let horizontal = frame.width >= frame.height;
    let length = if horizontal { frame.width } else { frame.height };

    let mut offset = 0.0;
    items
        .into_iter()
        .map(|item| {
            let extent = item.weight() / total * length;
            let rect = if horizontal {
                Rect::new(frame.x + offset, frame.y, extent, frame.height)
            } else {
                Rect::new(frame.x, frame.y + offset, frame.width, extent)
            };
            offset += extent;
            Partition {
                rect,
                normalized_size: 0.0,
                item,
            }
        })
        .collect()
}
