// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visible-area evaluation for a single element.

use kurbo::{Rect, Size};

/// Result of intersecting an element with the visible part of its viewport.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Visibility {
    /// The element does not overlap the viewport on at least one axis, or it
    /// has no measurable area.
    ///
    /// Callers treat this as a disposal signal for the element's key.
    Hidden,
    /// Fraction of the element's area inside the viewport, in `0.0..=1.0` for
    /// well-formed inputs.
    Visible(f64),
}

impl Visibility {
    /// Returns the visible fraction, or `0.0` when hidden.
    #[must_use]
    pub fn ratio(self) -> f64 {
        match self {
            Self::Hidden => 0.0,
            Self::Visible(ratio) => ratio,
        }
    }

    /// Returns `true` for [`Visibility::Hidden`].
    #[must_use]
    pub fn is_hidden(self) -> bool {
        matches!(self, Self::Hidden)
    }

    /// Returns `true` if the element is visible and its ratio reaches `threshold`.
    #[must_use]
    pub fn meets(self, threshold: f64) -> bool {
        match self {
            Self::Hidden => false,
            Self::Visible(ratio) => ratio >= threshold,
        }
    }
}

/// Computes how much of an element is inside the visible viewport bounds.
///
/// - `size` is the element's own size; its area is the denominator.
/// - `bounds` is the element's rectangle in viewport coordinates.
/// - `viewport` is the currently visible part of the viewport, in the same
///   coordinate space as `bounds`.
///
/// The overlap is computed per axis. A negative overlap on either axis means the
/// element is entirely outside the viewport and yields [`Visibility::Hidden`].
/// Edges that merely touch give a zero overlap and therefore `Visible(0.0)`.
///
/// Elements with a zero, negative, or non-finite area are reported as
/// [`Visibility::Hidden`] instead of producing a ratio from a division by zero.
///
/// Rectangles are read through their `min_*`/`max_*` accessors, so a
/// non-normalized rect behaves like its normalized form.
///
/// ```rust
/// use kurbo::{Rect, Size};
/// use understory_impression::{Visibility, visible_ratio};
///
/// let viewport = Rect::new(0.0, 0.0, 100.0, 100.0);
///
/// // Half of a 100x100 card hangs off the bottom edge.
/// let card = Rect::new(0.0, 50.0, 100.0, 150.0);
/// assert_eq!(
///     visible_ratio(Size::new(100.0, 100.0), card, viewport),
///     Visibility::Visible(0.5)
/// );
///
/// // Scrolled fully out of view.
/// let card = Rect::new(0.0, 200.0, 100.0, 300.0);
/// assert!(visible_ratio(Size::new(100.0, 100.0), card, viewport).is_hidden());
/// ```
#[must_use]
pub fn visible_ratio(size: Size, bounds: Rect, viewport: Rect) -> Visibility {
    let component_area = size.width * size.height;
    if !component_area.is_finite() || component_area <= 0.0 {
        return Visibility::Hidden;
    }

    let visible_top = bounds.min_y().max(viewport.min_y());
    let visible_bottom = bounds.max_y().min(viewport.max_y());
    let visible_height = visible_bottom - visible_top;
    if visible_height < 0.0 {
        return Visibility::Hidden;
    }

    let visible_left = bounds.min_x().max(viewport.min_x());
    let visible_right = bounds.max_x().min(viewport.max_x());
    let visible_width = visible_right - visible_left;
    if visible_width < 0.0 {
        return Visibility::Hidden;
    }

    Visibility::Visible(visible_width * visible_height / component_area)
}
