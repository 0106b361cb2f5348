use crate::{
    config::Gravity,
    gravity::pairwise_force,
    tree::{BodyID, QuadTree},
    ComputeMethod,
};
use glam::DVec2;
use rayon::prelude::*;

/// Brute-force [`ComputeMethod`] using the CPU in parallel with
/// [rayon](https://github.com/rayon-rs/rayon).
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

        points[..affected.min(points.len())]
            .par_iter()
            .enumerate()
            .map(|(i, p1)| {
                // Sequential inner loop is faster.
                points
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| i != j)
                    .fold(DVec2::ZERO, |force, (_, &p2)| {
                        force + pairwise_force(p1.position, p1.mass, p2, gravity)
                    })
            })
            .collect_into_vec(forces);
    }
}

/// Barnes-Hut [`ComputeMethod`] using the CPU in parallel with
/// [rayon](https://github.com/rayon-rs/rayon).
///
/// The tree is shared read-only between threads; each body walks it independently.
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

        points[..affected.min(points.len())]
            .par_iter()
            .enumerate()
            .map(|(id, p)| tree.force_at(p.position, p.mass, Some(id as BodyID), gravity))
            .collect_into_vec(forces);
    }
}
