use glam::DVec2;

/// Trait to describe a body that the simulation can move: a position, a velocity and a mass.
///
/// The simulation only borrows bodies for the duration of a tick. It reads their position and
/// mass to build the tree and writes their velocity and position once every force is known.
///
/// #### Deriving:
///
/// Used when the type has fields named `position`, `velocity` and `mass`:
///
/// ```
/// # use quadgrav::prelude::*;
/// # use glam::DVec2;
/// #[derive(Body)]
/// struct Asteroid {
///     position: DVec2,
///     velocity: DVec2,
///     mass: f64,
///     name: String,
/// }
/// ```
///
/// #### Manual implementation:
///
/// ```
/// # use quadgrav::prelude::*;
/// # use glam::DVec2;
/// struct Planet {
///     state: [DVec2; 2],
///     earth_masses: f64,
/// }
///
/// impl Body for Planet {
///     fn position(&self) -> DVec2 {
///         self.state[0]
///     }
///
///     fn velocity(&self) -> DVec2 {
///         self.state[1]
///     }
///
///     fn mass(&self) -> f64 {
///         self.earth_masses * 3.003e-6
///     }
///
///     fn position_mut(&mut self) -> &mut DVec2 {
///         &mut self.state[0]
///     }
///
///     fn velocity_mut(&mut self) -> &mut DVec2 {
///         &mut self.state[1]
///     }
/// }
/// ```
pub trait Body {
    /// The position of the body.
    fn position(&self) -> DVec2;

    /// The velocity of the body.
    fn velocity(&self) -> DVec2;

    /// The mass of the body. Must be strictly positive for the body to be simulated.
    fn mass(&self) -> f64;

    /// Mutable access to the position of the body.
    fn position_mut(&mut self) -> &mut DVec2;

    /// Mutable access to the velocity of the body.
    fn velocity_mut(&mut self) -> &mut DVec2;

    /// Returns the position and mass of the body as a [`PointMass`].
    #[inline]
    fn point_mass(&self) -> PointMass {
        PointMass::new(self.position(), self.mass())
    }
}

impl<B: Body + ?Sized> Body for &mut B {
    #[inline]
    fn position(&self) -> DVec2 {
        (**self).position()
    }

    #[inline]
    fn velocity(&self) -> DVec2 {
        (**self).velocity()
    }

    #[inline]
    fn mass(&self) -> f64 {
        (**self).mass()
    }

    #[inline]
    fn position_mut(&mut self) -> &mut DVec2 {
        (**self).position_mut()
    }

    #[inline]
    fn velocity_mut(&mut self) -> &mut DVec2 {
        (**self).velocity_mut()
    }
}

/// Position and mass of a body, as copied into a [`QuadTree`](crate::tree::QuadTree).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointMass {
    /// Position of the point-mass.
    pub position: DVec2,
    /// Mass of the point-mass.
    pub mass: f64,
}

impl PointMass {
    /// Creates a new [`PointMass`] with the given position and mass.
    #[inline]
    pub const fn new(position: DVec2, mass: f64) -> Self {
        Self { position, mass }
    }

    /// Returns the centre of mass of the given point-masses, or `None` if their total mass is
    /// not strictly positive.
    #[inline]
    pub fn centre_of_mass<I>(point_masses: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        let (weighted, mass) = point_masses
            .into_iter()
            .filter(|p| p.mass > 0.0)
            .fold((DVec2::ZERO, 0.0), |(weighted, mass), p| {
                (weighted + p.position * p.mass, mass + p.mass)
            });

        (mass > 0.0).then(|| Self::new(weighted / mass, mass))
    }
}

/// Ready-made body record with a display radius that plays no part in the physics.
#[derive(Clone, Copy, Debug, Default, PartialEq, quadgrav_derive::Body)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointBody {
    /// Position of the body.
    pub position: DVec2,
    /// Velocity of the body.
    pub velocity: DVec2,
    /// Mass of the body.
    pub mass: f64,
    /// Display radius of the body.
    pub radius: f64,
}

impl PointBody {
    /// Creates a new [`PointBody`] at rest with a zero radius.
    #[inline]
    pub const fn new(position: DVec2, mass: f64) -> Self {
        Self {
            position,
            velocity: DVec2::ZERO,
            mass,
            radius: 0.0,
        }
    }

    /// Sets the velocity of the body.
    #[inline]
    pub fn with_velocity(mut self, velocity: DVec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Sets the display radius of the body.
    #[inline]
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }
}
