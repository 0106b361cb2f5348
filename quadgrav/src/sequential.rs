use crate::{
    config::Gravity,
    gravity::pairwise_force,
    tree::{BodyID, QuadTree},
    ComputeMethod,
};
use glam::DVec2;

/// Brute-force [`ComputeMethod`] using one CPU thread.
///
/// Sums the exact force of every other body, ignoring the structure of the tree. Useful as a
/// reference for the accuracy of [`BarnesHut`].
#[derive(Clone, Copy, Default, Debug)]
pub struct BruteForce;

impl ComputeMethod for BruteForce {
    #[inline]
    fn compute(
        &mut self,
        tree: &QuadTree,
        affected: usize,
        gravity: &Gravity,
        forces: &mut Vec<DVec2>,
    ) {
        let points = tree.points();
        let affected = &points[..affected.min(points.len())];

        forces.clear();
        forces.extend(affected.iter().enumerate().map(|(i, p1)| {
            points
                .iter()
                .enumerate()
                .filter(|&(j, _)| i != j)
                .fold(DVec2::ZERO, |force, (_, &p2)| {
                    force + pairwise_force(p1.position, p1.mass, p2, gravity)
                })
        }));
    }
}

/// Barnes-Hut [`ComputeMethod`] using one CPU thread.
///
/// The opening angle is the `theta` parameter of [`Gravity`].
#[derive(Clone, Copy, Default, Debug)]
pub struct BarnesHut;

impl ComputeMethod for BarnesHut {
    #[inline]
    fn compute(
        &mut self,
        tree: &QuadTree,
        affected: usize,
        gravity: &Gravity,
        forces: &mut Vec<DVec2>,
    ) {
        let points = tree.points();

        forces.clear();
        forces.extend(
            points[..affected.min(points.len())]
                .iter()
                .enumerate()
                .map(|(id, p)| tree.force_at(p.position, p.mass, Some(id as BodyID), gravity)),
        );
    }
}
