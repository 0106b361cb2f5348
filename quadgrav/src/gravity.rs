use crate::{
    body::PointMass,
    config::Gravity,
    tree::{BodyID, NodeKind, QuadTree},
};
use glam::DVec2;

/// Returns the Newtonian force exerted by `other` on a mass `mass` at `position`.
///
/// The force is zero when the two are closer than the softening distance of `gravity`, or when
/// they coincide.
///
/// # Example
///
/// ```
/// # use quadgrav::{gravity::pairwise_force, prelude::*};
/// # use glam::DVec2;
/// let gravity = Gravity::new(G_NORMALIZED);
/// let force = pairwise_force(DVec2::ZERO, 1.0, PointMass::new(DVec2::X * 2.0, 8.0), &gravity);
///
/// assert_eq!(force, DVec2::new(2.0, 0.0));
/// ```
#[inline]
pub fn pairwise_force(position: DVec2, mass: f64, other: PointMass, gravity: &Gravity) -> DVec2 {
    let dir = other.position - position;
    let distance = dir.length();

    if distance < gravity.epsilon || distance == 0.0 {
        return DVec2::ZERO;
    }

    let magnitude = gravity.g * mass * other.mass / (distance * distance);
    dir * (magnitude / distance)
}

impl QuadTree {
    /// Returns the force exerted by every other body of the tree on the body with the given id,
    /// or `None` if there is no such body.
    #[inline]
    pub fn force_on(&self, body: BodyID, gravity: &Gravity) -> Option<DVec2> {
        let point = self.points().get(body as usize)?;
        Some(self.force_at(point.position, point.mass, Some(body), gravity))
    }

    /// Returns the force the bodies of the tree exert on a mass `mass` at `position`, ignoring the
    /// body `exclude`.
    ///
    /// Nodes are visited from the root. A node without mass is skipped. A leaf contributes the
    /// exact force of each of its bodies. An internal node of extent `s` whose centre of mass is
    /// at distance `d` is treated as a single point-mass when `s < theta * d` and its region does
    /// not contain `position`; otherwise its children are visited.
    ///
    /// The tree has to be aggregated, see [`QuadTree::aggregate`].
    pub fn force_at(
        &self,
        position: DVec2,
        mass: f64,
        exclude: Option<BodyID>,
        gravity: &Gravity,
    ) -> DVec2 {
        let mut force = DVec2::ZERO;
        let Some(root) = self.root() else {
            return force;
        };
        debug_assert!(self.is_aggregated(), "force evaluation on a stale quadtree");

        let estimate = 3 * self.depth() + 1;
        let mut stack = Vec::with_capacity(estimate);
        stack.push(root);

        while let Some(id) = stack.pop() {
            let (node, data) = (&self.nodes()[id as usize], self.data()[id as usize]);

            if data.mass == 0.0 {
                continue;
            }

            match node.kind {
                NodeKind::Empty => {}
                NodeKind::Leaf(head) => {
                    for other in self.leaf_bodies(head).filter(|&b| Some(b) != exclude) {
                        force += pairwise_force(
                            position,
                            mass,
                            self.points()[other as usize],
                            gravity,
                        );
                    }
                }
                NodeKind::Internal(children) => {
                    let distance = data.position.distance(position);

                    if node.bbox.extent() < gravity.theta * distance
                        && !node.bbox.contains(position)
                    {
                        force += pairwise_force(position, mass, data, gravity);
                    } else {
                        stack.extend(children);
                    }
                }
            }
        }

        force
    }
}
