//! Balanced partition tree with vertex cuts.
//!
//! # Construction
//!
//! The vertex set is bisected recursively at the coordinate median along
//! whichever axis (latitude or longitude) has the wider spread.  At each
//! split the *cut* is the smaller of the two boundary sets (vertices of one
//! half adjacent to the other half); removing it disconnects the halves, so
//! every path between them crosses a cut vertex.  The remaining vertices of
//! each half form the two children.  Sets no larger than `leaf_size` become
//! leaves whose vertices are all cut vertices.
//!
//! Each graph vertex is a cut vertex of exactly one tree node, its *home*.
//! `V(A)`, the vertex set of tree node `A`, is every vertex whose home lies
//! in `A`'s subtree; membership is an O(1) pre/post interval test.
//!
//! # Local indexes
//!
//! Label columns of tree node `A` are dense arrays over `V(A)`.  For each
//! vertex and each ancestor depth the tree stores the vertex's position in
//! that ancestor's local order.

use rh_core::NodeId;
use rh_graph::{Direction, RoadGraph};

/// Default maximum leaf size.
pub const DEFAULT_LEAF_SIZE: usize = 16;

/// Tree node handle (index into [`PartitionTree::nodes`]).
pub type TreeIdx = u32;

#[derive(Clone, Debug)]
pub struct TreeNode {
    pub parent:   Option<TreeIdx>,
    pub depth:    u32,
    /// Cut vertices owned by this node, ascending by id.
    pub cut:      Vec<NodeId>,
    /// Every vertex of `V(A)`, in local-index order.
    pub vertices: Vec<NodeId>,
    /// DFS interval over homes: `v ∈ V(A)` iff `pre <= pre(home(v)) < post`.
    pub pre:      u32,
    pub post:     u32,
}

/// The partition hierarchy of one graph.
pub struct PartitionTree {
    pub nodes:     Vec<TreeNode>,
    /// Home tree node of each graph vertex.
    home:          Vec<TreeIdx>,
    /// `local[local_start[v] + d]` = index of `v` in the depth-`d` ancestor.
    local_start:   Vec<u32>,
    local:         Vec<u32>,
}

impl PartitionTree {
    /// Partition `graph`.  `leaf_size` is clamped to at least 1.
    pub fn build(graph: &RoadGraph, leaf_size: usize) -> PartitionTree {
        let n = graph.node_count();
        let leaf_size = leaf_size.max(1);

        let mut nodes: Vec<TreeNode> = Vec::new();
        let mut home = vec![0 as TreeIdx; n];

        // side[v]: scratch marking the half each vertex of the current split is on.
        let mut side = vec![Side::Out; n];

        // Depth-first with an explicit stack so pre-order numbering falls out.
        let mut stack: Vec<(Option<TreeIdx>, u32, Vec<NodeId>)> = Vec::new();
        if n > 0 {
            stack.push((None, 0, (0..n as u32).map(NodeId).collect()));
        }

        while let Some((parent, depth, mut set)) = stack.pop() {
            let idx = nodes.len() as TreeIdx;

            let (cut, children) = if set.len() <= leaf_size {
                set.sort_unstable();
                (set, Vec::new())
            } else {
                split(graph, set, &mut side)
            };

            for &v in &cut {
                home[v.index()] = idx;
            }
            nodes.push(TreeNode { parent, depth, cut, vertices: Vec::new(), pre: idx, post: idx + 1 });

            // Push right child first so the left child is numbered next.
            for child in children.into_iter().rev() {
                if !child.is_empty() {
                    stack.push((Some(idx), depth + 1, child));
                }
            }
        }

        // post[A] = one past the last pre-order index in A's subtree.
        for i in (0..nodes.len()).rev() {
            let post = nodes[i].post;
            if let Some(p) = nodes[i].parent {
                let pn = &mut nodes[p as usize];
                pn.post = pn.post.max(post);
            }
        }

        // Vertex sets: a vertex belongs to its home and every ancestor.
        // Visiting vertices in id order keeps each `vertices` list sorted.
        let mut local_start = Vec::with_capacity(n + 1);
        let mut local = Vec::new();
        let mut chain: Vec<TreeIdx> = Vec::new();
        for v in 0..n {
            local_start.push(local.len() as u32);
            chain.clear();
            let mut cur = Some(home[v]);
            while let Some(a) = cur {
                chain.push(a);
                cur = nodes[a as usize].parent;
            }
            for &a in chain.iter().rev() {
                let node = &mut nodes[a as usize];
                local.push(node.vertices.len() as u32);
                node.vertices.push(NodeId(v as u32));
            }
        }
        local_start.push(local.len() as u32);

        let tree = PartitionTree { nodes, home, local_start, local };
        tracing::debug!(
            tree_nodes = tree.nodes.len(),
            height = tree.height(),
            cut_vertices = n,
            "partition tree built"
        );
        tree
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn height(&self) -> u32 {
        self.nodes.iter().map(|t| t.depth + 1).max().unwrap_or(0)
    }

    #[inline]
    pub fn home(&self, v: NodeId) -> TreeIdx {
        self.home[v.index()]
    }

    #[inline]
    pub fn node(&self, a: TreeIdx) -> &TreeNode {
        &self.nodes[a as usize]
    }

    /// `true` if `v ∈ V(a)`.
    #[inline]
    pub fn contains(&self, a: TreeIdx, v: NodeId) -> bool {
        let h = self.home[v.index()];
        let node = &self.nodes[a as usize];
        node.pre <= h && h < node.post
    }

    /// Local index of `v` in its depth-`depth` ancestor.
    #[inline]
    pub fn local_index(&self, v: NodeId, depth: u32) -> usize {
        self.local[self.local_start[v.index()] as usize + depth as usize] as usize
    }

    /// Ancestors of `v`'s home from the root down, including the home.
    pub fn ancestors(&self, v: NodeId) -> Vec<TreeIdx> {
        let mut chain = Vec::new();
        let mut cur = Some(self.home[v.index()]);
        while let Some(a) = cur {
            chain.push(a);
            cur = self.nodes[a as usize].parent;
        }
        chain.reverse();
        chain
    }

    /// Tree nodes whose vertex sets contain both `s` and `t`, root first.
    pub fn common_ancestors(&self, s: NodeId, t: NodeId) -> Vec<TreeIdx> {
        let a = self.ancestors(s);
        let b = self.ancestors(t);
        a.into_iter().zip(b).take_while(|(x, y)| x == y).map(|(x, _)| x).collect()
    }

    pub fn size_bytes(&self) -> usize {
        let per_node: usize = self
            .nodes
            .iter()
            .map(|t| (t.cut.capacity() + t.vertices.capacity()) * std::mem::size_of::<NodeId>())
            .sum();
        per_node
            + self.nodes.len() * std::mem::size_of::<TreeNode>()
            + (self.home.len() + self.local_start.len() + self.local.len()) * 4
    }
}

// ── Splitting ─────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq)]
enum Side {
    Out,
    Left,
    Right,
}

/// Bisect `set`, returning `(cut, [left, right])`.
fn split(graph: &RoadGraph, mut set: Vec<NodeId>, side: &mut [Side]) -> (Vec<NodeId>, Vec<Vec<NodeId>>) {
    let spread = |f: &dyn Fn(NodeId) -> f64| {
        let (lo, hi) = set
            .iter()
            .map(|&v| f(v))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));
        hi - lo
    };
    let lat = |v: NodeId| graph.node_pos[v.index()].lat;
    let lng = |v: NodeId| graph.node_pos[v.index()].lng;

    let lat_spread = spread(&lat);
    let lng_spread = spread(&lng);
    if lat_spread >= lng_spread && lat_spread > 0.0 {
        set.sort_by(|&a, &b| lat(a).total_cmp(&lat(b)).then(a.cmp(&b)));
    } else if lng_spread > 0.0 {
        set.sort_by(|&a, &b| lng(a).total_cmp(&lng(b)).then(a.cmp(&b)));
    } else {
        // Coincident points: split by id.
        set.sort_unstable();
    }

    let right = set.split_off(set.len() / 2);
    let left = set;
    for &v in &left {
        side[v.index()] = Side::Left;
    }
    for &v in &right {
        side[v.index()] = Side::Right;
    }

    let boundary = |half: &[NodeId], other: Side| -> Vec<NodeId> {
        half.iter()
            .copied()
            .filter(|&v| {
                graph.neighbors(v, Direction::Forward).any(|(_, u)| side[u.index()] == other)
                    || graph.neighbors(v, Direction::Backward).any(|(_, u)| side[u.index()] == other)
            })
            .collect()
    };
    let left_boundary = boundary(&left, Side::Right);
    let right_boundary = boundary(&right, Side::Left);

    for &v in left.iter().chain(&right) {
        side[v.index()] = Side::Out;
    }

    let (mut cut, left, right) = if left_boundary.len() <= right_boundary.len() {
        let rest = remove_sorted(left, &left_boundary);
        (left_boundary, rest, right)
    } else {
        let rest = remove_sorted(right, &right_boundary);
        (right_boundary, left, rest)
    };
    cut.sort_unstable();
    (cut, vec![left, right])
}

/// `set` minus `remove`, where `remove` is a subsequence of `set`.
fn remove_sorted(set: Vec<NodeId>, remove: &[NodeId]) -> Vec<NodeId> {
    let mut r = remove.iter().peekable();
    set.into_iter()
        .filter(|v| {
            if r.peek() == Some(&v) {
                r.next();
                false
            } else {
                true
            }
        })
        .collect()
}
