//! Squarified treemap layout for bundlescope.
//!
//! The partitioner only needs [`Weighted`] items; it knows nothing about
//! archive trees and keeps no state between calls.
//!
//! ```rust
//! use bundlescope_layout::{Rect, partition};
//!
//! let parts = partition([6.0, 6.0, 4.0, 3.0, 2.0, 2.0, 1.0], Rect::with_size(6.0, 4.0));
//! assert_eq!(parts.len(), 7);
//! assert_eq!(parts[0].rect, Rect::new(0.0, 0.0, 3.0, 2.0));
//! ```

mod geometry;
mod squarify;

pub use geometry::{Rect, Weighted};
pub use squarify::{Partition, partition};
