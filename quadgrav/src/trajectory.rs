use glam::DVec2;
use std::collections::VecDeque;

/// Fixed-capacity history of the positions of one body.
///
/// Samples are kept from oldest to newest. Once full, pushing a sample drops the oldest one.
///
/// # Example
///
/// ```
/// # use quadgrav::trajectory::Trajectory;
/// # use glam::DVec2;
/// let mut trajectory = Trajectory::new(2);
/// trajectory.push(DVec2::new(0.0, 0.0));
/// trajectory.push(DVec2::new(1.0, 0.0));
/// trajectory.push(DVec2::new(2.0, 0.0));
///
/// let samples: Vec<_> = trajectory.iter().copied().collect();
/// assert_eq!(samples, [DVec2::new(1.0, 0.0), DVec2::new(2.0, 0.0)]);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trajectory {
    samples: VecDeque<DVec2>,
    capacity: usize,
}

impl Trajectory {
    /// Creates a new empty [`Trajectory`] holding at most `capacity` samples.
    #[inline]
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            capacity,
        }
    }

    /// Appends a sample, dropping the oldest one if the trajectory is full.
    #[inline]
    pub fn push(&mut self, position: DVec2) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(position);
    }

    /// Returns the maximum number of samples.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if no sample was taken.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the most recent sample.
    #[inline]
    pub fn latest(&self) -> Option<DVec2> {
        self.samples.back().copied()
    }

    /// Returns an iterator over the samples, from oldest to newest.
    #[inline]
    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, DVec2> {
        self.samples.iter()
    }

    /// Removes every sample.
    #[inline]
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a DVec2;
    type IntoIter = std::collections::vec_deque::Iter<'a, DVec2>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
