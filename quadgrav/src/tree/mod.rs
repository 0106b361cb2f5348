/// Mass aggregation of the nodes of a [`QuadTree`].
pub mod mass;
/// Bounding box and quadrant geometry.
pub mod partition;

pub use partition::*;

use crate::{
    body::{Body, PointMass},
    config::TreeConfig,
    error::{Error, Result},
};
use glam::DVec2;

/// Index of a [`Node`] in a [`QuadTree`].
pub type NodeID = u32;

/// Index of a body in a [`QuadTree`], equal to its index in the slice the tree was built from.
pub type BodyID = u32;

/// Content of a [`Node`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Leaf without any body.
    Empty,
    /// Leaf holding a body. Bodies merged into the same leaf are chained after it, see
    /// [`QuadTree::leaf_bodies`].
    Leaf(BodyID),
    /// Node with four children, in [`Quadrant::ALL`] order.
    Internal([NodeID; 4]),
}

/// Region of a [`QuadTree`] and what it holds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    /// Region covered by the node.
    pub bbox: BoundingBox,
    /// Content of the node.
    pub kind: NodeKind,
}

impl Node {
    #[inline]
    const fn empty(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            kind: NodeKind::Empty,
        }
    }

    /// Returns true if the node has no children.
    #[inline]
    pub const fn is_leaf(&self) -> bool {
        !matches!(self.kind, NodeKind::Internal(_))
    }

    /// Returns the children of the node, if any.
    #[inline]
    pub const fn children(&self) -> Option<[NodeID; 4]> {
        match self.kind {
            NodeKind::Internal(children) => Some(children),
            _ => None,
        }
    }
}

/// Arena-allocated quadtree of point-masses used by the Barnes-Hut algorithm.
///
/// Nodes are stored contiguously and reference their children by [`NodeID`]. The `data` vector
/// is parallel to the `nodes` vector and holds, for each node, its total mass and centre of mass
/// as a [`PointMass`], filled by [`QuadTree::aggregate`]. Bodies are copied into the tree as
/// point-masses and referenced by [`BodyID`].
///
/// A tree is meant to be rebuilt every tick: [`QuadTree::rebuild`] clears the arena but keeps its
/// allocations.
///
/// # Example
///
/// ```
/// # use quadgrav::prelude::*;
/// # use glam::DVec2;
/// let bodies = [
///     PointBody::new(DVec2::new(-1.0, 0.0), 1.0),
///     PointBody::new(DVec2::new(1.0, 0.0), 3.0),
/// ];
/// let tree = QuadTree::build(&bodies, &TreeConfig::default()).unwrap();
///
/// let root = tree.root_data().unwrap();
/// assert_eq!(root.mass, 4.0);
/// assert_eq!(root.position, DVec2::new(0.5, 0.0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct QuadTree {
    config: TreeConfig,
    nodes: Vec<Node>,
    data: Vec<PointMass>,
    points: Vec<PointMass>,
    next_in_leaf: Vec<Option<BodyID>>,
    depth: usize,
    merged: usize,
    aggregated: bool,
}

impl QuadTree {
    /// Index of the root node.
    pub const ROOT: NodeID = 0;

    /// Creates a new empty [`QuadTree`] without a root.
    #[inline]
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Creates a new [`QuadTree`] from the given bodies, then aggregates it.
    ///
    /// # Errors
    ///
    /// See [`QuadTree::rebuild`].
    #[inline]
    pub fn build<B: Body>(bodies: &[B], config: &TreeConfig) -> Result<Self> {
        let mut tree = Self::new(*config);
        tree.rebuild(bodies)?;
        Ok(tree)
    }

    /// Clears the tree and fills it with the given bodies, then aggregates it.
    ///
    /// The root region is the padded square around all bodies (see
    /// [`BoundingBox::padded_square_with`]). Allocations from previous builds are reused.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if `bodies` is empty or a position is not finite.
    /// - [`Error::Config`] if the tree configuration is invalid or a mass is not finite and
    ///   strictly positive.
    /// - [`Error::Allocation`] if the arena cannot grow.
    ///
    /// On error the tree is left empty.
    #[inline]
    pub fn rebuild<B: Body>(&mut self, bodies: &[B]) -> Result<()> {
        self.rebuild_with::<B, B>(bodies, &[])
    }

    /// Clears the tree and fills it with `bodies` followed by `attractors`, then aggregates it.
    ///
    /// Bodies keep their index as [`BodyID`] and attractors are numbered after them, so the
    /// attractor at index `i` has the id `bodies.len() + i`. Both sets contribute to the
    /// aggregated masses.
    ///
    /// # Errors
    ///
    /// Same as [`QuadTree::rebuild`], with `bodies` and `attractors` checked together.
    pub fn rebuild_with<B: Body, A: Body>(
        &mut self,
        bodies: &[B],
        attractors: &[A],
    ) -> Result<()> {
        self.clear();
        self.config.validate()?;

        let points = || {
            bodies
                .iter()
                .map(Body::point_mass)
                .chain(attractors.iter().map(Body::point_mass))
        };

        if let Some((i, point)) = points()
            .enumerate()
            .find(|(_, point)| !(point.mass.is_finite() && point.mass > 0.0))
        {
            return Err(Error::Config(format!(
                "mass of body {i} must be finite and strictly positive, got {}",
                point.mass
            )));
        }

        let bounds = BoundingBox::padded_square_with(points().map(|point| point.position))?;

        let result = self.fill(bounds, bodies.len() + attractors.len(), points());
        if result.is_err() {
            self.clear();
        }
        result
    }

    fn fill<I>(&mut self, bounds: BoundingBox, len: usize, points: I) -> Result<()>
    where
        I: Iterator<Item = PointMass>,
    {
        // Roughly two nodes per body for well-spread inputs.
        self.nodes.try_reserve(2 * len)?;
        self.data.try_reserve(2 * len)?;
        self.points.try_reserve(len)?;
        self.next_in_leaf.try_reserve(len)?;

        self.reset(bounds)?;
        for point in points {
            self.insert(point)?;
        }

        if self.merged > 0 {
            tracing::warn!(
                merged = self.merged,
                max_depth = self.config.max_depth,
                "bodies merged into shared quadtree leaves"
            );
        }

        self.aggregate();
        Ok(())
    }

    /// Removes every node and body from the tree, keeping its allocations.
    #[inline]
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.data.clear();
        self.points.clear();
        self.next_in_leaf.clear();
        self.depth = 0;
        self.merged = 0;
        self.aggregated = false;
    }

    /// Clears the tree and creates an empty root covering `bounds`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if the root cannot be allocated.
    pub fn reset(&mut self, bounds: BoundingBox) -> Result<()> {
        self.clear();
        self.push_node(bounds)?;
        Ok(())
    }

    /// Inserts a point-mass in the tree and returns its [`BodyID`].
    ///
    /// An empty leaf takes the body. A leaf that already holds a body is subdivided, its body is
    /// moved to the matching child and the insertion continues from the now internal node. Two
    /// bodies at identical coordinates, or colliding at the configured maximum depth, share a
    /// single leaf instead.
    ///
    /// The aggregated data is stale after an insertion until [`QuadTree::aggregate`] is called.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if the tree has no root or the position lies outside of it.
    /// - [`Error::Config`] if the mass is negative or not finite.
    /// - [`Error::Allocation`] if the arena cannot grow.
    pub fn insert(&mut self, point: PointMass) -> Result<BodyID> {
        let Some(root) = self.nodes.first() else {
            return Err(Error::InvalidInput("the quadtree has no root".into()));
        };
        if !root.bbox.contains(point.position) {
            return Err(Error::InvalidInput(format!(
                "position {} lies outside of the quadtree bounds {:?}",
                point.position, root.bbox
            )));
        }
        if !(point.mass.is_finite() && point.mass >= 0.0) {
            return Err(Error::Config(format!(
                "mass must be finite and non-negative, got {}",
                point.mass
            )));
        }

        let body = BodyID::try_from(self.points.len())
            .map_err(|_| Error::InvalidInput("too many bodies for one quadtree".into()))?;
        self.points.try_reserve(1)?;
        self.next_in_leaf.try_reserve(1)?;
        self.points.push(point);
        self.next_in_leaf.push(None);
        self.aggregated = false;

        let mut id = Self::ROOT as usize;
        let mut depth = 0;

        loop {
            let node = self.nodes[id];

            match node.kind {
                NodeKind::Empty => {
                    self.nodes[id].kind = NodeKind::Leaf(body);
                    self.depth = self.depth.max(depth);
                    return Ok(body);
                }
                NodeKind::Leaf(existing) => {
                    let existing_position = self.points[existing as usize].position;

                    // Below the depth cap a chain only forms from equal positions, so the head
                    // stands for every body of the leaf.
                    if existing_position == point.position || depth >= self.config.max_depth {
                        self.next_in_leaf[body as usize] = Some(existing);
                        self.nodes[id].kind = NodeKind::Leaf(body);
                        self.merged += 1;
                        self.depth = self.depth.max(depth);
                        return Ok(body);
                    }

                    let children = self.subdivide(id)?;
                    let quadrant = node.bbox.quadrant(existing_position);
                    self.nodes[children[quadrant.index()] as usize].kind =
                        NodeKind::Leaf(existing);
                    self.depth = self.depth.max(depth + 1);
                }
                NodeKind::Internal(children) => {
                    id = children[node.bbox.quadrant(point.position).index()] as usize;
                    depth += 1;
                }
            }
        }
    }

    fn push_node(&mut self, bbox: BoundingBox) -> Result<NodeID> {
        let id = NodeID::try_from(self.nodes.len()).map_err(|_| Error::Allocation)?;
        self.nodes.try_reserve(1)?;
        self.data.try_reserve(1)?;
        self.nodes.push(Node::empty(bbox));
        self.data.push(PointMass::new(bbox.center(), 0.0));
        Ok(id)
    }

    fn subdivide(&mut self, id: usize) -> Result<[NodeID; 4]> {
        self.nodes.try_reserve(4)?;
        self.data.try_reserve(4)?;

        let [nw, ne, sw, se] = self.nodes[id].bbox.subdivide();
        let children = [
            self.push_node(nw)?,
            self.push_node(ne)?,
            self.push_node(sw)?,
            self.push_node(se)?,
        ];
        self.nodes[id].kind = NodeKind::Internal(children);

        Ok(children)
    }

    /// Returns the configuration the tree is built with.
    #[inline]
    pub const fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Returns the root of the tree, or `None` if the tree was never built.
    #[inline]
    pub fn root(&self) -> Option<NodeID> {
        (!self.nodes.is_empty()).then_some(Self::ROOT)
    }

    /// Returns the aggregated data of the root, or `None` if the tree was never built.
    #[inline]
    pub fn root_data(&self) -> Option<&PointMass> {
        self.data.first()
    }

    /// Returns the region covered by the root, or `None` if the tree was never built.
    #[inline]
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.nodes.first().map(|root| root.bbox)
    }

    /// Returns every node of the tree, indexed by [`NodeID`].
    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the node with the given id.
    #[inline]
    pub fn node(&self, id: NodeID) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    /// Returns the total mass and centre of mass of every node, indexed by [`NodeID`].
    #[inline]
    pub fn data(&self) -> &[PointMass] {
        &self.data
    }

    /// Returns the point-masses inserted in the tree, indexed by [`BodyID`].
    #[inline]
    pub fn points(&self) -> &[PointMass] {
        &self.points
    }

    /// Returns the number of bodies in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the tree holds no body.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the depth of the deepest occupied leaf, the root being at depth 0.
    #[inline]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the number of bodies that share a leaf with another body.
    #[inline]
    pub const fn merged_count(&self) -> usize {
        self.merged
    }

    /// Returns true if the aggregated data reflects every inserted body.
    #[inline]
    pub const fn is_aggregated(&self) -> bool {
        self.aggregated
    }

    /// Returns the bodies held by the leaf whose first body is `head`.
    #[inline]
    pub fn leaf_bodies(&self, head: BodyID) -> impl Iterator<Item = BodyID> + '_ {
        std::iter::successors(Some(head), |&body| {
            self.next_in_leaf.get(body as usize).copied().flatten()
        })
    }
}
