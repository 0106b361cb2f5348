use crate::error::{Error, Result};

/// Gravitational constant in SI units (m³ kg⁻¹ s⁻²).
pub const G_SI: f64 = 6.674_30e-11;

/// Gravitational constant of a normalised unit system.
pub const G_NORMALIZED: f64 = 1.0;

/// Parameters of the gravitational interaction.
///
/// There is no default gravitational constant: callers working in SI units pass [`G_SI`], callers
/// using a normalised unit system usually pass [`G_NORMALIZED`].
///
/// # Example
///
/// ```
/// # use quadgrav::config::{Gravity, G_NORMALIZED};
/// let gravity = Gravity::new(G_NORMALIZED).with_theta(0.7);
///
/// assert_eq!(gravity.theta, 0.7);
/// assert_eq!(gravity.epsilon, Gravity::DEFAULT_EPSILON);
/// assert!(gravity.validate().is_ok());
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gravity {
    /// Gravitational constant.
    #[cfg_attr(feature = "serde", serde(rename = "G"))]
    pub g: f64,
    /// Opening angle of the Barnes-Hut approximation. If 0, every node is opened and the result
    /// is the exact all-pairs sum.
    #[cfg_attr(feature = "serde", serde(default = "Gravity::default_theta"))]
    pub theta: f64,
    /// Softening distance below which a pairwise contribution is skipped.
    #[cfg_attr(feature = "serde", serde(default = "Gravity::default_epsilon"))]
    pub epsilon: f64,
}

impl Gravity {
    /// Opening angle used by [`Gravity::new`].
    pub const DEFAULT_THETA: f64 = 0.5;

    /// Softening distance used by [`Gravity::new`].
    pub const DEFAULT_EPSILON: f64 = 1e-9;

    /// Creates a new [`Gravity`] with the given gravitational constant and the default opening
    /// angle and softening distance.
    #[inline]
    pub const fn new(g: f64) -> Self {
        Self {
            g,
            theta: Self::DEFAULT_THETA,
            epsilon: Self::DEFAULT_EPSILON,
        }
    }

    /// Sets the opening angle.
    #[inline]
    pub const fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    /// Sets the softening distance.
    #[inline]
    pub const fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Checks that the gravitational constant is finite and that the opening angle and softening
    /// distance are finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        if !self.g.is_finite() {
            return Err(Error::Config(format!(
                "gravitational constant must be finite, got {}",
                self.g
            )));
        }
        if !(self.theta.is_finite() && self.theta >= 0.0) {
            return Err(Error::Config(format!(
                "theta must be finite and non-negative, got {}",
                self.theta
            )));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(Error::Config(format!(
                "epsilon must be finite and non-negative, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }

    #[cfg(feature = "serde")]
    fn default_theta() -> f64 {
        Self::DEFAULT_THETA
    }

    #[cfg(feature = "serde")]
    fn default_epsilon() -> f64 {
        Self::DEFAULT_EPSILON
    }
}

/// Parameters of the quadtree construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TreeConfig {
    /// Depth past which colliding bodies are merged into one leaf instead of subdividing.
    pub max_depth: usize,
}

impl TreeConfig {
    /// Largest accepted `max_depth`. Past it, halving the root region no longer yields distinct
    /// `f64` midpoints for any realistic root size.
    pub const MAX_DEPTH_LIMIT: usize = 256;

    /// Creates a new [`TreeConfig`] with the given maximum depth.
    #[inline]
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Checks that the maximum depth is in `1..=MAX_DEPTH_LIMIT`.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 || self.max_depth > Self::MAX_DEPTH_LIMIT {
            return Err(Error::Config(format!(
                "max_depth must be in 1..={}, got {}",
                Self::MAX_DEPTH_LIMIT,
                self.max_depth
            )));
        }
        Ok(())
    }
}

impl Default for TreeConfig {
    #[inline]
    fn default() -> Self {
        Self::new(32)
    }
}

/// Parameters of the per-body trajectory sampling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrajectoryConfig {
    /// Number of samples kept per body before the oldest ones are dropped.
    pub capacity: usize,
    /// A sample is taken every `interval` frames.
    pub interval: u64,
}

impl TrajectoryConfig {
    /// Creates a new [`TrajectoryConfig`].
    #[inline]
    pub const fn new(capacity: usize, interval: u64) -> Self {
        Self { capacity, interval }
    }

    /// Checks that both the capacity and the interval are non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::Config("trajectory capacity must be non-zero".into()));
        }
        if self.interval == 0 {
            return Err(Error::Config("trajectory interval must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for TrajectoryConfig {
    #[inline]
    fn default() -> Self {
        Self::new(1000, 10)
    }
}

/// A timestep that can be adjusted in fixed increments within a range.
///
/// # Example
///
/// ```
/// # use quadgrav::config::TimeStep;
/// let mut time_step = TimeStep::new(0.05, 0.01, 0.1, 0.03);
///
/// time_step.increase();
/// assert!((time_step.dt - 0.08).abs() < 1e-12);
///
/// time_step.increase();
/// assert_eq!(time_step.dt, 0.1);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeStep {
    /// Current timestep.
    pub dt: f64,
    /// Smallest timestep reachable with [`TimeStep::decrease`].
    pub min: f64,
    /// Largest timestep reachable with [`TimeStep::increase`].
    pub max: f64,
    /// Amount added or removed by one adjustment.
    pub increment: f64,
}

impl TimeStep {
    /// Creates a new [`TimeStep`]. `dt` is clamped to `[min, max]`.
    #[inline]
    pub fn new(dt: f64, min: f64, max: f64, increment: f64) -> Self {
        Self {
            dt: dt.max(min).min(max),
            min,
            max,
            increment,
        }
    }

    /// Increases the timestep by one increment, up to `max`.
    #[inline]
    pub fn increase(&mut self) {
        self.dt = (self.dt + self.increment).min(self.max);
    }

    /// Decreases the timestep by one increment, down to `min`.
    #[inline]
    pub fn decrease(&mut self) {
        self.dt = (self.dt - self.increment).max(self.min);
    }

    /// Checks that `0 < min <= dt <= max` and that the increment is finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        validate_dt(self.min)?;
        if !(self.max.is_finite() && self.min <= self.dt && self.dt <= self.max) {
            return Err(Error::Config(format!(
                "timestep {} must lie in [{}, {}]",
                self.dt, self.min, self.max
            )));
        }
        if !(self.increment.is_finite() && self.increment >= 0.0) {
            return Err(Error::Config(format!(
                "timestep increment must be finite and non-negative, got {}",
                self.increment
            )));
        }
        Ok(())
    }
}

impl Default for TimeStep {
    #[inline]
    fn default() -> Self {
        Self::new(0.001, 0.0001, 0.1, 0.001)
    }
}

/// Everything a [`Stepper`](crate::stepper::Stepper) needs besides the bodies.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepperConfig {
    /// Parameters of the gravitational interaction.
    pub gravity: Gravity,
    /// Parameters of the quadtree construction.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tree: TreeConfig,
    /// Trajectory sampling, disabled when `None`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub trajectory: Option<TrajectoryConfig>,
    /// Timestep used by [`Stepper::advance`](crate::stepper::Stepper::advance).
    #[cfg_attr(feature = "serde", serde(default))]
    pub time_step: TimeStep,
}

impl StepperConfig {
    /// Creates a new [`StepperConfig`] with the given gravity parameters and default values for
    /// everything else. Trajectory sampling is disabled.
    #[inline]
    pub fn new(gravity: Gravity) -> Self {
        Self {
            gravity,
            tree: TreeConfig::default(),
            trajectory: None,
            time_step: TimeStep::default(),
        }
    }

    /// Sets the quadtree parameters.
    #[inline]
    pub fn with_tree(mut self, tree: TreeConfig) -> Self {
        self.tree = tree;
        self
    }

    /// Enables trajectory sampling with the given parameters.
    #[inline]
    pub fn with_trajectory(mut self, trajectory: TrajectoryConfig) -> Self {
        self.trajectory = Some(trajectory);
        self
    }

    /// Sets the adjustable timestep.
    #[inline]
    pub fn with_time_step(mut self, time_step: TimeStep) -> Self {
        self.time_step = time_step;
        self
    }

    /// Validates every part of the configuration.
    pub fn validate(&self) -> Result<()> {
        self.gravity.validate()?;
        self.tree.validate()?;
        if let Some(trajectory) = &self.trajectory {
            trajectory.validate()?;
        }
        self.time_step.validate()
    }
}

/// Checks that a timestep is finite and strictly positive.
#[inline]
pub fn validate_dt(dt: f64) -> Result<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "timestep must be finite and strictly positive, got {dt}"
        )))
    }
}
