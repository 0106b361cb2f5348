use crate::{
    body::Body,
    config::{validate_dt, Gravity, StepperConfig, TimeStep},
    error::{Error, Result},
    sequential::BarnesHut,
    trajectory::Trajectory,
    tree::QuadTree,
    ComputeMethod,
};
use glam::DVec2;

/// Snapshot of one body after a tick, as handed to an external logger.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyState {
    /// Index of the body in the slice it was stepped with.
    pub index: usize,
    /// Position of the body.
    pub position: DVec2,
    /// Velocity of the body.
    pub velocity: DVec2,
    /// Force applied to the body during the last tick.
    pub force: DVec2,
    /// Mass of the body.
    pub mass: f64,
}

/// Drives the simulation one tick at a time.
///
/// A tick builds the quadtree of the bodies, aggregates it, computes the force on every body with
/// the compute method `C` and integrates with semi-implicit Euler:
///
/// ```text
/// velocity += force / mass * dt
/// position += velocity * dt
/// ```
///
/// Bodies are only written once every force is known, so a tick that fails leaves them untouched.
/// The quadtree and force buffers are kept between ticks.
#[derive(Clone, Debug)]
pub struct Stepper<C = BarnesHut> {
    config: StepperConfig,
    method: C,
    tree: QuadTree,
    forces: Vec<DVec2>,
    trajectories: Vec<Trajectory>,
    frame: u64,
    time: f64,
}

impl Stepper {
    /// Creates a new [`Stepper`] using the sequential Barnes-Hut compute method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    #[inline]
    pub fn new(config: StepperConfig) -> Result<Self> {
        Self::with_method(config, BarnesHut)
    }
}

impl<C: ComputeMethod> Stepper<C> {
    /// Creates a new [`Stepper`] using the given compute method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_method(config: StepperConfig, method: C) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            method,
            tree: QuadTree::new(config.tree),
            forces: Vec::new(),
            trajectories: Vec::new(),
            frame: 0,
            time: 0.0,
        })
    }

    /// Advances the bodies by `dt`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `dt` is not finite and strictly positive or a mass is not finite
    ///   and strictly positive. Nothing is built in that case.
    /// - [`Error::InvalidInput`] if `bodies` is empty, a position or a velocity is not finite or
    ///   the compute method did not return one force per body.
    /// - [`Error::Allocation`] if the quadtree or a buffer cannot grow.
    ///
    /// On error, neither the bodies nor the frame counter and clock are modified.
    #[inline]
    pub fn step<B: Body>(&mut self, bodies: &mut [B], dt: f64) -> Result<()> {
        self.step_with_attractors::<B, B>(bodies, &[], dt)
    }

    /// Advances the bodies by `dt` under the gravity of each other and of `attractors`.
    ///
    /// Attractors are inserted in the same quadtree as the bodies but are neither integrated nor
    /// given a force, e.g. planets with prescribed orbits pulling on asteroids. Forces,
    /// trajectories and [`Stepper::states`] only cover `bodies`.
    ///
    /// # Errors
    ///
    /// See [`Stepper::step`]. Attractor masses are checked like body masses.
    ///
    /// # Example
    ///
    /// ```
    /// # use quadgrav::prelude::*;
    /// # use glam::DVec2;
    /// let planets = [PointBody::new(DVec2::ZERO, 1e3)];
    /// let mut asteroids = [PointBody::new(DVec2::new(10.0, 0.0), 1.0)];
    ///
    /// let mut stepper = Stepper::new(StepperConfig::new(Gravity::new(G_NORMALIZED))).unwrap();
    /// stepper.step_with_attractors(&mut asteroids, &planets, 0.1).unwrap();
    ///
    /// assert!(asteroids[0].velocity.x < 0.0);
    /// assert_eq!(stepper.forces().len(), 1);
    /// ```
    pub fn step_with_attractors<B: Body, A: Body>(
        &mut self,
        bodies: &mut [B],
        attractors: &[A],
        dt: f64,
    ) -> Result<()> {
        validate_dt(dt)?;
        validate_bodies(bodies)?;

        self.tree.rebuild_with(bodies, attractors)?;

        self.forces.clear();
        self.forces.try_reserve(bodies.len())?;
        self.method.compute(
            &self.tree,
            bodies.len(),
            &self.config.gravity,
            &mut self.forces,
        );

        if self.forces.len() != bodies.len() {
            return Err(Error::InvalidInput(format!(
                "expected {} forces, the compute method returned {}",
                bodies.len(),
                self.forces.len()
            )));
        }

        if let Some(trajectory) = &self.config.trajectory {
            if self.trajectories.len() < bodies.len() {
                self.trajectories
                    .try_reserve(bodies.len() - self.trajectories.len())?;
            }
            self.trajectories
                .resize_with(bodies.len(), || Trajectory::new(trajectory.capacity));
        }

        for (body, &force) in bodies.iter_mut().zip(&self.forces) {
            let acceleration = force / body.mass();
            *body.velocity_mut() += acceleration * dt;

            let velocity = body.velocity();
            *body.position_mut() += velocity * dt;
        }

        if let Some(trajectory) = &self.config.trajectory {
            if self.frame % trajectory.interval == 0 {
                for (samples, body) in self.trajectories.iter_mut().zip(bodies.iter()) {
                    samples.push(body.position());
                }
                tracing::trace!(frame = self.frame, "sampled trajectories");
            }
        }

        self.frame += 1;
        self.time += dt;

        tracing::debug!(
            bodies = bodies.len(),
            attractors = attractors.len(),
            nodes = self.tree.nodes().len(),
            depth = self.tree.depth(),
            merged = self.tree.merged_count(),
            frame = self.frame,
            time = self.time,
            "tick"
        );

        Ok(())
    }

    /// Advances the bodies by the configured [`TimeStep`].
    ///
    /// # Errors
    ///
    /// See [`Stepper::step`].
    #[inline]
    pub fn advance<B: Body>(&mut self, bodies: &mut [B]) -> Result<()> {
        self.step(bodies, self.config.time_step.dt)
    }
}

impl<C> Stepper<C> {
    /// Returns the configuration of the stepper.
    #[inline]
    pub const fn config(&self) -> &StepperConfig {
        &self.config
    }

    /// Replaces the gravity parameters used by the next ticks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the parameters are invalid, leaving the current ones in place.
    #[inline]
    pub fn set_gravity(&mut self, gravity: Gravity) -> Result<()> {
        gravity.validate()?;
        self.config.gravity = gravity;
        Ok(())
    }

    /// Returns the adjustable timestep used by [`Stepper::advance`].
    #[inline]
    pub fn time_step_mut(&mut self) -> &mut TimeStep {
        &mut self.config.time_step
    }

    /// Returns the compute method.
    #[inline]
    pub fn method_mut(&mut self) -> &mut C {
        &mut self.method
    }

    /// Returns the quadtree of the last tick.
    #[inline]
    pub const fn tree(&self) -> &QuadTree {
        &self.tree
    }

    /// Returns the force applied to every body during the last tick.
    #[inline]
    pub fn forces(&self) -> &[DVec2] {
        &self.forces
    }

    /// Returns the sampled trajectory of every body. Empty if sampling is disabled.
    #[inline]
    pub fn trajectories(&self) -> &[Trajectory] {
        &self.trajectories
    }

    /// Returns the number of completed ticks.
    #[inline]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Returns the simulated time, the sum of the timesteps of every completed tick.
    #[inline]
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Returns the state of every body along with the force applied to it during the last tick.
    ///
    /// Bodies without a recorded force, e.g. before the first tick, report a zero force.
    #[inline]
    pub fn states<'a, B: Body>(
        &'a self,
        bodies: &'a [B],
    ) -> impl Iterator<Item = BodyState> + 'a {
        bodies.iter().enumerate().map(|(index, body)| BodyState {
            index,
            position: body.position(),
            velocity: body.velocity(),
            force: self.forces.get(index).copied().unwrap_or_default(),
            mass: body.mass(),
        })
    }
}

/// Advances the bodies by `dt` with the sequential Barnes-Hut compute method.
///
/// This builds a new quadtree for the tick; use a [`Stepper`] to keep it between ticks.
///
/// # Errors
///
/// See [`Stepper::new`] and [`Stepper::step`].
///
/// # Example
///
/// ```
/// # use quadgrav::prelude::*;
/// # use glam::DVec2;
/// let mut bodies = [
///     PointBody::new(DVec2::new(0.0, 0.0), 1.0),
///     PointBody::new(DVec2::new(1.0, 0.0), 1.0),
/// ];
/// quadgrav::step(&mut bodies, 0.5, &Gravity::new(G_NORMALIZED)).unwrap();
///
/// assert_eq!(bodies[0].velocity, DVec2::new(0.5, 0.0));
/// assert_eq!(bodies[1].velocity, DVec2::new(-0.5, 0.0));
/// assert_eq!(bodies[0].position, DVec2::new(0.25, 0.0));
/// ```
#[inline]
pub fn step<B: Body>(bodies: &mut [B], dt: f64, gravity: &Gravity) -> Result<()> {
    Stepper::new(StepperConfig::new(*gravity))?.step(bodies, dt)
}

fn validate_bodies<B: Body>(bodies: &[B]) -> Result<()> {
    if bodies.is_empty() {
        return Err(Error::InvalidInput("cannot step an empty body collection".into()));
    }

    for (i, body) in bodies.iter().enumerate() {
        let mass = body.mass();
        if !(mass.is_finite() && mass > 0.0) {
            return Err(Error::Config(format!(
                "mass of body {i} must be finite and strictly positive, got {mass}"
            )));
        }
        if !body.velocity().is_finite() {
            return Err(Error::InvalidInput(format!(
                "velocity {} of body {i} is not finite",
                body.velocity()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        body::PointBody,
        config::{TrajectoryConfig, TreeConfig, G_NORMALIZED},
        gravity::pairwise_force,
        sequential::BruteForce,
    };
    use approx::assert_relative_eq;

    fn config() -> StepperConfig {
        StepperConfig::new(Gravity::new(G_NORMALIZED))
    }

    fn pair() -> [PointBody; 2] {
        [
            PointBody::new(DVec2::new(0.0, 0.0), 1.0),
            PointBody::new(DVec2::new(1.0, 0.0), 1.0),
        ]
    }

    #[test]
    fn velocity_is_updated_before_position() {
        let mut bodies = pair();
        let mut stepper = Stepper::new(config()).unwrap();
        stepper.step(&mut bodies, 0.1).unwrap();

        assert_relative_eq!(bodies[0].velocity.x, 0.1);
        assert_relative_eq!(bodies[0].position.x, 0.01);
        assert_relative_eq!(bodies[1].velocity.x, -0.1);
        assert_relative_eq!(bodies[1].position.x, 0.99);
        assert_eq!(stepper.forces(), [DVec2::new(1.0, 0.0), DVec2::new(-1.0, 0.0)]);
    }

    #[test]
    fn lone_body_drifts() {
        let mut bodies = [PointBody::new(DVec2::ONE, 2.0).with_velocity(DVec2::new(1.0, -2.0))];
        step(&mut bodies, 0.5, &Gravity::new(G_NORMALIZED)).unwrap();

        assert_eq!(bodies[0].velocity, DVec2::new(1.0, -2.0));
        assert_eq!(bodies[0].position, DVec2::new(1.5, 0.0));
    }

    #[test]
    fn aborted_tick_leaves_bodies_untouched() {
        let mut stepper = Stepper::new(config()).unwrap();

        let mut bodies = [
            PointBody::new(DVec2::ZERO, 1.0).with_velocity(DVec2::ONE),
            PointBody::new(DVec2::X, 0.0),
        ];
        let before = bodies;
        assert!(matches!(
            stepper.step(&mut bodies, 0.1),
            Err(Error::Config(_))
        ));
        assert_eq!(bodies, before);

        let mut bodies = pair();
        bodies[1].velocity = DVec2::new(f64::NAN, 0.0);
        assert!(matches!(
            stepper.step(&mut bodies, 0.1),
            Err(Error::InvalidInput(_))
        ));

        let mut bodies = pair();
        bodies[1].position = DVec2::new(0.0, f64::INFINITY);
        assert!(matches!(
            stepper.step(&mut bodies, 0.1),
            Err(Error::InvalidInput(_))
        ));

        assert_eq!(stepper.frame(), 0);
        assert_eq!(stepper.time(), 0.0);
    }

    #[test]
    fn rejects_bad_timesteps_and_empty_input() {
        let mut stepper = Stepper::new(config()).unwrap();

        for dt in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut bodies = pair();
            assert!(matches!(
                stepper.step(&mut bodies, dt),
                Err(Error::Config(_))
            ));
            assert_eq!(bodies, pair());
        }

        assert!(matches!(
            stepper.step::<PointBody>(&mut [], 0.1),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_invalid_config() {
        let invalid = [
            StepperConfig::new(Gravity::new(f64::NAN)),
            config().with_tree(TreeConfig::new(0)),
            config().with_trajectory(TrajectoryConfig::new(0, 1)),
            config().with_time_step(TimeStep::new(0.1, 0.0, 1.0, 0.1)),
        ];

        for config in invalid {
            assert!(matches!(Stepper::new(config), Err(Error::Config(_))));
        }

        let mut stepper = Stepper::new(config()).unwrap();
        let theta = Gravity::new(G_NORMALIZED).with_theta(-1.0);
        assert!(stepper.set_gravity(theta).is_err());
        assert_eq!(stepper.config().gravity.theta, Gravity::DEFAULT_THETA);
    }

    #[test]
    fn frame_and_time() {
        let mut bodies = pair();
        let mut stepper = Stepper::with_method(config(), BruteForce).unwrap();

        for _ in 0..10 {
            stepper.step(&mut bodies, 0.01).unwrap();
        }

        assert_eq!(stepper.frame(), 10);
        assert_relative_eq!(stepper.time(), 0.1, max_relative = 1e-12);
    }

    #[test]
    fn advance_uses_the_time_step() {
        let time_step = TimeStep::new(0.01, 0.01, 0.05, 0.02);
        let mut stepper = Stepper::new(config().with_time_step(time_step)).unwrap();
        let mut bodies = pair();

        stepper.advance(&mut bodies).unwrap();
        stepper.time_step_mut().increase();
        stepper.advance(&mut bodies).unwrap();

        assert_relative_eq!(stepper.time(), 0.04, max_relative = 1e-12);
    }

    #[test]
    fn trajectories_are_sampled_at_the_interval() {
        let config = config().with_trajectory(TrajectoryConfig::new(3, 2));
        let mut stepper = Stepper::new(config).unwrap();
        let mut bodies = pair();

        let mut expected = Vec::new();
        for frame in 0..10 {
            stepper.step(&mut bodies, 0.01).unwrap();
            if frame % 2 == 0 {
                expected.push(bodies[1].position);
            }
        }

        let trajectory = &stepper.trajectories()[1];
        assert_eq!(stepper.trajectories().len(), 2);
        assert_eq!(trajectory.len(), 3);
        assert!(trajectory.iter().copied().eq(expected[2..].iter().copied()));
        assert_ne!(trajectory.latest(), Some(bodies[1].position));
    }

    #[test]
    fn trajectories_follow_the_body_count() {
        let config = config().with_trajectory(TrajectoryConfig::new(10, 1));
        let mut stepper = Stepper::new(config).unwrap();

        let mut bodies = vec![
            PointBody::new(DVec2::ZERO, 1.0),
            PointBody::new(DVec2::X, 1.0),
            PointBody::new(DVec2::Y, 1.0),
        ];
        stepper.step(&mut bodies, 0.01).unwrap();
        assert_eq!(stepper.trajectories().len(), 3);

        bodies.pop();
        stepper.step(&mut bodies, 0.01).unwrap();
        assert_eq!(stepper.trajectories().len(), 2);
        assert_eq!(stepper.trajectories()[0].len(), 2);
    }

    #[test]
    fn borrowed_bodies() {
        let [mut a, mut b] = pair();
        let mut borrowed = [&mut a, &mut b];
        step(&mut borrowed, 0.1, &Gravity::new(G_NORMALIZED)).unwrap();

        assert_relative_eq!(a.velocity.x, 0.1);
        assert_relative_eq!(b.velocity.x, -0.1);
    }

    #[test]
    fn disabled_trajectories() {
        let mut stepper = Stepper::new(config()).unwrap();
        stepper.step(&mut pair(), 0.01).unwrap();

        assert!(stepper.trajectories().is_empty());
    }

    #[test]
    fn states_report_the_last_forces() {
        let mut stepper = Stepper::new(config()).unwrap();
        let mut bodies = pair();

        let before: Vec<_> = stepper.states(&bodies).collect();
        assert!(before.iter().all(|state| state.force == DVec2::ZERO));

        stepper.step(&mut bodies, 0.1).unwrap();
        let states: Vec<_> = stepper.states(&bodies).collect();

        assert_eq!(states.len(), 2);
        assert_eq!(states[1].index, 1);
        assert_eq!(states[1].position, bodies[1].position);
        assert_eq!(states[1].velocity, bodies[1].velocity);
        assert_eq!(states[1].force, stepper.forces()[1]);
        assert_eq!(states[1].mass, 1.0);
    }

    #[test]
    fn wrong_force_count() {
        struct Truncated;

        impl ComputeMethod for Truncated {
            fn compute(&mut self, _: &QuadTree, _: usize, _: &Gravity, forces: &mut Vec<DVec2>) {
                forces.clear();
                forces.push(DVec2::ZERO);
            }
        }

        let mut stepper = Stepper::with_method(config(), Truncated).unwrap();
        let mut bodies = pair();

        assert!(matches!(
            stepper.step(&mut bodies, 0.1),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(bodies, pair());
    }

    #[test]
    fn attractors_pull_without_moving() {
        let planets = [
            PointBody::new(DVec2::new(0.0, 0.0), 1e3).with_velocity(DVec2::new(5.0, 5.0)),
            PointBody::new(DVec2::new(100.0, 0.0), 1e3),
        ];
        let mut asteroids = [
            PointBody::new(DVec2::new(10.0, 0.0), 1.0),
            PointBody::new(DVec2::new(50.0, 20.0), 2.0),
        ];
        let before = asteroids;

        let gravity = Gravity::new(G_NORMALIZED).with_theta(0.0);
        let config = StepperConfig::new(gravity).with_trajectory(TrajectoryConfig::new(4, 1));
        let mut stepper = Stepper::new(config).unwrap();
        stepper
            .step_with_attractors(&mut asteroids, &planets, 0.01)
            .unwrap();

        assert_eq!(planets[0].position, DVec2::ZERO);
        assert_eq!(planets[0].velocity, DVec2::new(5.0, 5.0));
        assert_eq!(stepper.forces().len(), 2);
        assert_eq!(stepper.trajectories().len(), 2);
        assert_eq!(stepper.tree().len(), 4);

        assert!(asteroids[0].velocity.x < 0.0);
        assert!(asteroids[0].position.x < before[0].position.x);

        let mut exact = DVec2::ZERO;
        for other in [planets[0], planets[1], before[1]] {
            exact += pairwise_force(before[0].position, 1.0, other.point_mass(), &gravity);
        }
        assert_relative_eq!(stepper.forces()[0].x, exact.x, max_relative = 1e-12);
        assert_relative_eq!(stepper.forces()[0].y, exact.y, max_relative = 1e-12);
    }

    #[test]
    fn attractors_are_validated() {
        let mut stepper = Stepper::new(config()).unwrap();
        let mut asteroids = pair();

        assert!(matches!(
            stepper.step_with_attractors(&mut asteroids, &[PointBody::new(DVec2::Y, -1.0)], 0.1),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            stepper.step_with_attractors::<PointBody, _>(&mut [], &pair(), 0.1),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(asteroids, pair());
        assert_eq!(stepper.frame(), 0);
    }

    #[test]
    fn swapping_the_compute_method() {
        struct Scaled(f64);

        impl ComputeMethod for Scaled {
            fn compute(
                &mut self,
                tree: &QuadTree,
                affected: usize,
                gravity: &Gravity,
                forces: &mut Vec<DVec2>,
            ) {
                BruteForce.compute(tree, affected, gravity, forces);
                forces.iter_mut().for_each(|force| *force *= self.0);
            }
        }

        let mut stepper = Stepper::with_method(config(), Scaled(1.0)).unwrap();
        stepper.step(&mut pair(), 0.1).unwrap();
        assert_eq!(stepper.forces()[0], DVec2::new(1.0, 0.0));

        stepper.method_mut().0 = 2.0;
        stepper.step(&mut pair(), 0.1).unwrap();
        assert_eq!(stepper.forces()[0], DVec2::new(2.0, 0.0));
    }

    #[test]
    fn matches_brute_force_at_zero_theta() {
        let mut bodies: Vec<_> = (0..64)
            .map(|i| {
                let angle = i as f64 * 0.7;
                let position = DVec2::new(angle.cos(), angle.sin()) * (1.0 + i as f64);
                PointBody::new(position, 1.0 + (i % 5) as f64)
            })
            .collect();
        let mut reference = bodies.clone();

        let gravity = Gravity::new(G_NORMALIZED).with_theta(0.0);
        let mut barnes_hut = Stepper::new(StepperConfig::new(gravity)).unwrap();
        let mut brute_force =
            Stepper::with_method(StepperConfig::new(gravity), BruteForce).unwrap();

        for _ in 0..20 {
            barnes_hut.step(&mut bodies, 0.01).unwrap();
            brute_force.step(&mut reference, 0.01).unwrap();
        }

        for (a, b) in bodies.iter().zip(&reference) {
            assert_relative_eq!(a.position.x, b.position.x, epsilon = 1e-9);
            assert_relative_eq!(a.position.y, b.position.y, epsilon = 1e-9);
        }
    }
}
