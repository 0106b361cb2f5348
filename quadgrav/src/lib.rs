#![warn(missing_docs)]
//! # Quadgrav
//!
//! Quadgrav is a crate providing a two-dimensional gravitational N-body simulation core built on
//! the [Barnes-Hut](https://en.wikipedia.org/wiki/Barnes%E2%80%93Hut_simulation) approximation.
//!
//! ## Goals
//!
//! Every tick, the positions of all bodies are inserted in a [`QuadTree`](tree::QuadTree), the
//! total mass and centre of mass of every node is aggregated, the force on each body is evaluated
//! by walking the tree and the bodies are advanced with semi-implicit Euler integration.
//!
//! Distant groups of bodies are treated as a single mass at their centre of mass. The `theta`
//! parameter of [`Gravity`](config::Gravity) trades accuracy for speed: `0.0` visits every body,
//! larger values approximate more aggressively.
//!
//! Rendering, input, logging and the creation of the initial bodies are left to the caller. A
//! tick only reads and writes the bodies it is given.
//!
//! Quadgrav uses [rayon](https://github.com/rayon-rs/rayon) for parallel force evaluation.
//! Enable the `parallel` feature to access the relevant compute methods, and the `serde` feature
//! to (de)serialize configurations.
//!
//! ## Using Quadgrav
//!
//! ### Implementing the [`Body`](body::Body) trait
//!
//! When the type has fields named `position`, `velocity` and `mass`, you can derive the trait.
//!
//! ```
//! use quadgrav::prelude::*;
//! use glam::DVec2;
//!
//! #[derive(Body)]
//! struct Planet {
//!     position: DVec2,
//!     velocity: DVec2,
//!     mass: f64,
//! }
//! ```
//!
//! ### Stepping the simulation
//!
//! The gravitational constant has no default: callers pick SI units with [`G_SI`](config::G_SI)
//! or normalized units with [`G_NORMALIZED`](config::G_NORMALIZED).
//!
//! ```
//! use quadgrav::prelude::*;
//! use glam::DVec2;
//!
//! let mut bodies = vec![
//!     PointBody::new(DVec2::ZERO, 1e6),
//!     PointBody::new(DVec2::new(100.0, 0.0), 1.0).with_velocity(DVec2::new(0.0, 100.0)),
//! ];
//!
//! let gravity = Gravity::new(G_NORMALIZED).with_theta(0.5);
//! quadgrav::step(&mut bodies, 1.0 / 60.0, &gravity).unwrap();
//!
//! assert!(bodies[1].position.y > 0.0);
//! ```
//!
//! A [`Stepper`](stepper::Stepper) keeps the quadtree allocations between ticks, records the
//! forces of the last tick and optionally samples trajectories.
//!
//! ```
//! use quadgrav::prelude::*;
//! use glam::DVec2;
//!
//! # let mut bodies = vec![
//! #     PointBody::new(DVec2::ZERO, 1e6),
//! #     PointBody::new(DVec2::new(100.0, 0.0), 1.0).with_velocity(DVec2::new(0.0, 100.0)),
//! # ];
//! let config = StepperConfig::new(Gravity::new(G_NORMALIZED))
//!     .with_trajectory(TrajectoryConfig::new(100, 1));
//! let mut stepper = Stepper::new(config).unwrap();
//!
//! for _ in 0..10 {
//!     stepper.advance(&mut bodies).unwrap();
//! }
//!
//! for state in stepper.states(&bodies) {
//!     println!("{}: {} {}", state.index, state.position, state.force);
//! }
//! assert_eq!(stepper.frame(), 10);
//! assert_eq!(stepper.trajectories()[1].len(), 10);
//! ```

/// Trait and types describing the simulated bodies.
pub mod body;
/// Configuration of the simulation and its validation.
pub mod config;
/// Error type returned by fallible operations.
pub mod error;
/// Newtonian force between point-masses and its evaluation over a quadtree.
pub mod gravity;
/// Compute methods that use multiple CPU threads.
#[cfg(feature = "parallel")]
pub mod parallel;
/// Compute methods that use one CPU thread.
pub mod sequential;
/// Simulation loop: tree construction, force evaluation and integration.
pub mod stepper;
/// Bounded history of sampled positions.
pub mod trajectory;
/// Arena quadtree and space partitioning implementation.
pub mod tree;

pub use error::{Error, Result};
pub use stepper::step;

use crate::{config::Gravity, tree::QuadTree};
use glam::DVec2;

/// Trait to compute the force on every body of an aggregated [`QuadTree`].
///
/// # Example
///
/// ```
/// # use quadgrav::prelude::*;
/// use glam::DVec2;
///
/// struct NoGravity;
///
/// impl ComputeMethod for NoGravity {
///     fn compute(&mut self, _: &QuadTree, affected: usize, _: &Gravity, forces: &mut Vec<DVec2>) {
///         forces.clear();
///         forces.resize(affected, DVec2::ZERO);
///     }
/// }
///
/// let mut bodies = [PointBody::new(DVec2::ZERO, 1.0), PointBody::new(DVec2::X, 1.0)];
/// let mut stepper = Stepper::with_method(StepperConfig::new(Gravity::new(1.0)), NoGravity).unwrap();
/// stepper.step(&mut bodies, 0.1).unwrap();
///
/// assert_eq!(bodies[1].position, DVec2::X);
/// ```
pub trait ComputeMethod {
    /// Replaces the content of `forces` with the force every body of `tree` exerts on each of
    /// its first `affected` bodies, in [`BodyID`](tree::BodyID) order.
    ///
    /// Bodies past `affected` only attract, see [`QuadTree::rebuild_with`].
    fn compute(
        &mut self,
        tree: &QuadTree,
        affected: usize,
        gravity: &Gravity,
        forces: &mut Vec<DVec2>,
    );
}

/// Most commonly used items.
pub mod prelude {
    pub use crate::{
        body::{Body, PointBody, PointMass},
        config::{
            Gravity, StepperConfig, TimeStep, TrajectoryConfig, TreeConfig, G_NORMALIZED, G_SI,
        },
        stepper::{BodyState, Stepper},
        trajectory::Trajectory,
        tree::QuadTree,
        ComputeMethod,
    };
    pub use quadgrav_derive::Body;

    #[cfg(feature = "parallel")]
    pub use crate::parallel;
    pub use crate::sequential;
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{
        body::{Body, PointBody},
        config::{Gravity, StepperConfig, TreeConfig, G_NORMALIZED},
        gravity::pairwise_force,
        stepper::Stepper,
        tree::QuadTree,
        ComputeMethod,
    };
    use glam::DVec2;

    pub fn force_error<C: ComputeMethod>(mut cm: C, theta: f64, epsilon: f64) {
        let bodies = [
            PointBody::new(DVec2::splat(3.0), 1e-3),
            PointBody::new(DVec2::splat(0.0), 20.0),
            PointBody::new(DVec2::splat(1.0), 30.0),
            PointBody::new(DVec2::splat(-3.0), 40.0),
            PointBody::new(DVec2::new(5.0, -2.0), 1e-3),
            PointBody::new(DVec2::splat(-5.0), 1e-3),
        ];
        let gravity = Gravity::new(G_NORMALIZED).with_theta(theta);
        let tree = QuadTree::build(&bodies, &TreeConfig::default()).unwrap();

        let mut computed = Vec::new();
        cm.compute(&tree, tree.len(), &gravity, &mut computed);
        assert_eq!(computed.len(), bodies.len());

        for (i, (body1, computed)) in bodies.iter().zip(computed).enumerate() {
            let mut force = DVec2::ZERO;

            for (j, body2) in bodies.iter().enumerate() {
                if i != j {
                    force +=
                        pairwise_force(body1.position, body1.mass, body2.point_mass(), &gravity);
                }
            }

            dbg!(force);
            dbg!(computed);

            let error = (force - computed).length() / force.length();
            dbg!(error);
            assert!(error <= epsilon, "{body1:?}");
        }
    }

    pub fn circular_orbit_stability<C: ComputeMethod>(
        cm: C,
        theta: f64,
        orbit_count: usize,
        epsilon: f64,
    ) {
        const DT: f64 = 1.0 / 60.0;

        fn specific_orbital_energy(radius: f64, m1: f64, m2: f64) -> f64 {
            -(m1 + m2) / (2.0 * radius)
        }

        fn orbital_period(radius: f64, main_mass: f64) -> f64 {
            2.0 * std::f64::consts::PI * ((radius * radius * radius) / main_mass).sqrt()
        }

        let mut bodies = [
            PointBody::new(DVec2::ZERO, 1e6),
            PointBody::new(DVec2::new(100.0, 0.0), 1.0).with_velocity(DVec2::new(0.0, 100.0)),
        ];

        let distance_before = bodies[0].position.distance(bodies[1].position);
        let energy_before = specific_orbital_energy(distance_before, bodies[0].mass, 1.0);

        let period = orbital_period(distance_before, bodies[0].mass);
        // Steps to complete one full orbit.
        let steps = (period / DT).round() as usize;

        let config = StepperConfig::new(Gravity::new(G_NORMALIZED).with_theta(theta));
        let mut stepper = Stepper::with_method(config, cm).unwrap();
        for _ in 0..steps * orbit_count {
            stepper.step(&mut bodies, DT).unwrap();
        }

        let distance_after = bodies[0].position.distance(bodies[1].position);
        let energy_after = specific_orbital_energy(distance_after, bodies[0].mass, 1.0);

        let error_energy = (1.0 - energy_before / energy_after).abs();
        dbg!(error_energy);
        assert!(error_energy < epsilon);

        let error_distance = (1.0 - distance_before / distance_after).abs();
        dbg!(error_distance);
        assert!(error_distance < epsilon);
    }
}
