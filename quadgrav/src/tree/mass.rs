use crate::{
    body::PointMass,
    tree::{NodeKind, QuadTree},
};

impl QuadTree {
    /// Computes the total mass and centre of mass of every node.
    ///
    /// Children are always stored after their parent, so walking the arena backwards visits
    /// every child before its parent. A leaf holding one body takes its mass and position as is.
    /// Other nodes only account for their positive-mass parts and fall back to their geometric
    /// centre with a zero mass when they have none.
    ///
    /// Aggregating an already aggregated tree yields the same values.
    pub fn aggregate(&mut self) {
        for id in (0..self.nodes.len()).rev() {
            let node = self.nodes[id];
            let empty = PointMass::new(node.bbox.center(), 0.0);

            let data = match node.kind {
                NodeKind::Empty => empty,
                NodeKind::Leaf(head) if self.next_in_leaf[head as usize].is_none() => {
                    self.points[head as usize]
                }
                NodeKind::Leaf(head) => PointMass::centre_of_mass(
                    self.leaf_bodies(head).map(|body| self.points[body as usize]),
                )
                .unwrap_or(empty),
                NodeKind::Internal(children) => {
                    PointMass::centre_of_mass(children.map(|child| self.data[child as usize]))
                        .unwrap_or(empty)
                }
            };

            self.data[id] = data;
        }

        self.aggregated = true;
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        body::{PointBody, PointMass},
        config::TreeConfig,
        tree::{BoundingBox, NodeID, NodeKind, QuadTree},
    };
    use approx::assert_relative_eq;
    use glam::DVec2;
    use rand::prelude::*;

    fn random_bodies(count: usize, seed: u64) -> Vec<PointBody> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let position = DVec2::new(rng.gen_range(-1e3..1e3), rng.gen_range(-1e3..1e3));
                PointBody::new(position, rng.gen_range(1.0..1e3))
            })
            .collect()
    }

    fn assert_same_aggregates(a: &QuadTree, a_id: NodeID, b: &QuadTree, b_id: NodeID) {
        let (a_node, b_node) = (a.nodes()[a_id as usize], b.nodes()[b_id as usize]);
        let (a_data, b_data) = (a.data()[a_id as usize], b.data()[b_id as usize]);

        assert_eq!(a_node.bbox, b_node.bbox);
        assert_relative_eq!(a_data.mass, b_data.mass, max_relative = 1e-12);
        assert_relative_eq!(a_data.position.x, b_data.position.x, epsilon = 1e-9);
        assert_relative_eq!(a_data.position.y, b_data.position.y, epsilon = 1e-9);

        match (a_node.kind, b_node.kind) {
            (NodeKind::Internal(a_children), NodeKind::Internal(b_children)) => {
                for (a_child, b_child) in a_children.into_iter().zip(b_children) {
                    assert_same_aggregates(a, a_child, b, b_child);
                }
            }
            (NodeKind::Internal(_), _) | (_, NodeKind::Internal(_)) => {
                panic!("trees differ in shape")
            }
            _ => {}
        }
    }

    #[test]
    fn mass_is_conserved() {
        let bodies = random_bodies(1000, 1808);
        let tree = QuadTree::build(&bodies, &TreeConfig::default()).unwrap();

        let total: f64 = bodies.iter().map(|b| b.mass).sum();
        let weighted: DVec2 = bodies.iter().map(|b| b.position * b.mass).sum();
        let root = tree.root_data().unwrap();

        assert_relative_eq!(root.mass, total, max_relative = 1e-12);
        assert_relative_eq!(root.position.x, weighted.x / total, epsilon = 1e-9);
        assert_relative_eq!(root.position.y, weighted.y / total, epsilon = 1e-9);
    }

    #[test]
    fn internal_nodes_sum_their_children() {
        let bodies = random_bodies(200, 7);
        let tree = QuadTree::build(&bodies, &TreeConfig::default()).unwrap();

        for (node, data) in tree.nodes().iter().zip(tree.data()) {
            if let Some(children) = node.children() {
                let sum: f64 = children.iter().map(|&c| tree.data()[c as usize].mass).sum();
                assert_relative_eq!(data.mass, sum, max_relative = 1e-12);
                assert!(data.mass > 0.0);
            }
        }
    }

    #[test]
    fn aggregates_do_not_depend_on_insertion_order() {
        let bodies = random_bodies(300, 42);
        let mut shuffled = bodies.clone();
        shuffled.shuffle(&mut StdRng::seed_from_u64(43));

        let a = QuadTree::build(&bodies, &TreeConfig::default()).unwrap();
        let b = QuadTree::build(&shuffled, &TreeConfig::default()).unwrap();

        assert_eq!(a.nodes().len(), b.nodes().len());
        assert_same_aggregates(&a, QuadTree::ROOT, &b, QuadTree::ROOT);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let mut tree = QuadTree::build(&random_bodies(100, 3), &TreeConfig::default()).unwrap();
        let first = tree.data().to_vec();

        tree.aggregate();
        assert_eq!(tree.data(), first);
    }

    #[test]
    fn empty_and_massless_nodes_use_their_centre() {
        let mut tree = QuadTree::new(TreeConfig::default());
        tree.reset(BoundingBox::new(DVec2::ZERO, DVec2::splat(4.0)))
            .unwrap();
        tree.insert(PointMass::new(DVec2::new(1.0, 1.0), 0.0))
            .unwrap();
        tree.insert(PointMass::new(DVec2::new(3.0, 3.0), 0.0))
            .unwrap();
        tree.aggregate();

        let root = tree.root_data().unwrap();
        assert_eq!(*root, PointMass::new(DVec2::splat(2.0), 0.0));

        let children = tree.nodes()[0].children().unwrap();
        let [nw, ne, _, _] = children.map(|c| tree.data()[c as usize]);
        assert_eq!(nw, PointMass::new(DVec2::new(1.0, 1.0), 0.0));
        assert_eq!(ne, PointMass::new(DVec2::new(3.0, 1.0), 0.0));
    }

    #[test]
    fn merged_leaf_holds_the_sum() {
        let bodies = [
            PointBody::new(DVec2::ONE, 2.0),
            PointBody::new(DVec2::ONE, 3.0),
            PointBody::new(DVec2::ONE, 5.0),
        ];
        let tree = QuadTree::build(&bodies, &TreeConfig::default()).unwrap();

        assert_eq!(*tree.root_data().unwrap(), PointMass::new(DVec2::ONE, 10.0));
    }
}
