use crate::error::{Error, Result};
use glam::DVec2;

/// One of the four children of a subdivided region.
///
/// North is towards decreasing `y` and west towards decreasing `x`. A position lying exactly on
/// a midpoint belongs to the south or east side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Quadrant {
    /// `x < mid.x`, `y < mid.y`.
    NorthWest = 0,
    /// `x >= mid.x`, `y < mid.y`.
    NorthEast = 1,
    /// `x < mid.x`, `y >= mid.y`.
    SouthWest = 2,
    /// `x >= mid.x`, `y >= mid.y`.
    SouthEast = 3,
}

impl Quadrant {
    /// All quadrants, in the order children are stored.
    pub const ALL: [Self; 4] = [
        Self::NorthWest,
        Self::NorthEast,
        Self::SouthWest,
        Self::SouthEast,
    ];

    /// Returns the quadrant of `position` relative to `center`.
    #[inline]
    pub fn of(position: DVec2, center: DVec2) -> Self {
        match (position.x < center.x, position.y < center.y) {
            (true, true) => Self::NorthWest,
            (false, true) => Self::NorthEast,
            (true, false) => Self::SouthWest,
            (false, false) => Self::SouthEast,
        }
    }

    /// Index of the quadrant in an array of children.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// An axis-aligned region `[min.x, max.x) × [min.y, max.y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    /// Minimum corner of the box, included in the region.
    pub min: DVec2,
    /// Maximum corner of the box, excluded from the region.
    pub max: DVec2,
}

impl Default for BoundingBox {
    #[inline]
    fn default() -> Self {
        Self::new(DVec2::INFINITY, DVec2::NEG_INFINITY)
    }
}

impl BoundingBox {
    /// Fraction of the larger span added on every side by [`BoundingBox::padded_square_with`].
    pub const PADDING_RATIO: f64 = 0.1;

    /// Creates a new [`BoundingBox`] with the given min and max corners.
    #[inline]
    pub const fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    /// Creates a new [`BoundingBox`] with the given min corner and side lengths.
    #[inline]
    pub fn with_size(min: DVec2, size: DVec2) -> Self {
        Self::new(min, min + size)
    }

    /// Extends the [`BoundingBox`] so that its closure contains the given position.
    #[inline]
    pub fn extend(&mut self, position: DVec2) {
        self.min = self.min.min(position);
        self.max = self.max.max(position);
    }

    /// Creates a square [`BoundingBox`] whose half-open region strictly contains every given
    /// position.
    ///
    /// The tight box around the positions is padded on every side by
    /// [`PADDING_RATIO`](Self::PADDING_RATIO) of its larger span, then made square by extending
    /// the shorter side. When all positions coincide, the padding falls back to a small amount
    /// relative to their magnitude so that the region is never empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `positions` is empty or contains a non-finite value.
    ///
    /// # Example
    ///
    /// ```
    /// # use quadgrav::tree::BoundingBox;
    /// # use glam::DVec2;
    /// let bbox = BoundingBox::padded_square_with([DVec2::new(0.0, 0.0), DVec2::new(10.0, 5.0)])
    ///     .unwrap();
    ///
    /// assert_eq!(bbox.min, DVec2::new(-1.0, -1.0));
    /// assert_eq!(bbox.size(), DVec2::splat(12.0));
    /// ```
    pub fn padded_square_with<I>(positions: I) -> Result<Self>
    where
        I: IntoIterator<Item = DVec2>,
    {
        let mut tight = Self::default();
        for (i, position) in positions.into_iter().enumerate() {
            if !position.is_finite() {
                return Err(Error::InvalidInput(format!(
                    "position {position} of body {i} is not finite"
                )));
            }
            tight.extend(position);
        }

        if tight.is_empty() {
            return Err(Error::InvalidInput(
                "cannot compute the bounds of an empty body collection".into(),
            ));
        }

        let span = tight.size().max_element();
        let scale = tight.min.abs().max(tight.max.abs()).max_element();
        let padding = (span * Self::PADDING_RATIO)
            .max(scale * 1e-9)
            .max(f64::MIN_POSITIVE);

        let min = tight.min - padding;
        let side = (tight.size() + 2.0 * padding).max_element();

        Ok(Self::with_size(min, DVec2::splat(side)))
    }

    /// Returns true if the box was created from no position.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Returns the centre of the [`BoundingBox`].
    #[inline]
    pub fn center(&self) -> DVec2 {
        (self.min + self.max) / 2.0
    }

    /// Returns the size of the [`BoundingBox`].
    #[inline]
    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }

    /// Returns the width of the [`BoundingBox`] (x element of the size).
    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Returns the height of the [`BoundingBox`] (y element of the size).
    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Returns the larger of the width and height.
    #[inline]
    pub fn extent(&self) -> f64 {
        self.width().max(self.height())
    }

    /// Returns true if the position lies in the half-open region of the box.
    #[inline]
    pub fn contains(&self, position: DVec2) -> bool {
        position.x >= self.min.x
            && position.x < self.max.x
            && position.y >= self.min.y
            && position.y < self.max.y
    }

    /// Returns the quadrant of the box the position belongs to.
    #[inline]
    pub fn quadrant(&self, position: DVec2) -> Quadrant {
        Quadrant::of(position, self.center())
    }

    /// Subdivides this [`BoundingBox`] into its four quadrants, in [`Quadrant::ALL`] order.
    #[inline]
    pub fn subdivide(&self) -> [Self; 4] {
        let Self { min, max } = *self;
        let center = self.center();

        [
            Self::new(min, center),
            Self::new(DVec2::new(center.x, min.y), DVec2::new(max.x, center.y)),
            Self::new(DVec2::new(min.x, center.y), DVec2::new(center.x, max.y)),
            Self::new(center, max),
        ]
    }
}
