//! The vantage-point tree: a recursive metric-space index supporting
//! exact k-nearest-neighbour search. Nodes are an owned recursive
//! structure (`Box<VpNode>`, each node exclusively owning its children)
//! rather than the original's raw-pointer graph — the algorithm itself
//! is unchanged.

use super::distance::LpDistance;
use crate::error::{Error, Result};
use crate::platform::{NullProgress, Progress, ProgressSignal};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::{BTreeSet, BinaryHeap};

/// One hit from a k-NN search: the row index and its distance to the
/// query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VpElement {
    pub index: usize,
    pub distance: f32,
}

#[derive(Debug)]
struct VpNode {
    index: usize,
    threshold: f32,
    in_child: Option<Box<VpNode>>,
    out_child: Option<Box<VpNode>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapEntry {
    distance: f32,
    index: usize,
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// The hard cap on the candidate heap during search, regardless of how
/// many distinct distances have been seen.
pub const MAX_NN: usize = 128;

/// The fixed vantage-selection seed; builds are deterministic given the
/// same input so they stay reproducible across runs.
pub const BUILD_SEED: u64 = crate::config::VP_TREE_SEED;

pub struct VpTree {
    root: Option<Box<VpNode>>,
    distance: LpDistance,
    size: usize,
    max_nearest_neighbors: usize,
    search_rng: RefCell<StdRng>,
}

impl VpTree {
    /// An empty tree (state `empty`); `search` on it returns an empty
    /// vector without error.
    pub fn empty(distance: LpDistance) -> Self {
        Self {
            root: None,
            distance,
            size: 0,
            max_nearest_neighbors: MAX_NN,
            search_rng: RefCell::new(StdRng::from_entropy()),
        }
    }

    pub fn is_built(&self) -> bool {
        self.root.is_some()
    }

    pub fn distance(&self) -> &LpDistance {
        &self.distance
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set_max_nearest_neighbors(&mut self, max: usize) {
        self.max_nearest_neighbors = max;
    }

    pub fn seed_search_rng(&mut self, seed: u64) {
        self.search_rng = RefCell::new(StdRng::seed_from_u64(seed));
    }

    /// Replaces any prior tree. Deterministic given the fixed build seed.
    /// An empty `data` leaves the tree in state `empty`.
    pub fn build(data: &[Vec<f32>], distance: LpDistance, progress: &dyn Progress) -> Result<Self> {
        Self::build_with_seed(data, distance, BUILD_SEED, progress)
    }

    /// Test-only hook to exercise the build algorithm with a different
    /// seed; production callers always go through [`VpTree::build`].
    pub fn build_with_seed(
        data: &[Vec<f32>],
        distance: LpDistance,
        seed: u64,
        progress: &dyn Progress,
    ) -> Result<Self> {
        if data.is_empty() {
            log::debug!("VpTree::build: empty input, tree stays in the empty state");
            return Ok(Self::empty(distance));
        }
        log::debug!("VpTree::build: {} points, seed {seed}", data.len());
        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..data.len()).collect();
        progress.start(data.len());
        let processed = RefCell::new(0usize);
        let aborted = RefCell::new(false);
        let root = build_recursive(
            &mut indices,
            data,
            &distance,
            &mut rng,
            progress,
            &processed,
            data.len(),
            &aborted,
        )?;
        if *aborted.borrow() {
            log::warn!("VpTree::build: aborted by progress sink, discarding partial tree");
            return Ok(Self::empty(distance));
        }
        progress.finish();
        log::debug!("VpTree::build: done, {} nodes", data.len());
        Ok(Self {
            root,
            distance,
            size: data.len(),
            max_nearest_neighbors: MAX_NN,
            search_rng: RefCell::new(StdRng::from_entropy()),
        })
    }

    /// Exact k-NN via the tree. Returns fewer than `k` only when the
    /// tree holds fewer than `k` points.
    pub fn search(&self, target: &[f32], k: usize, data: &[Vec<f32>]) -> Result<Vec<VpElement>> {
        let Some(root) = &self.root else {
            return Ok(Vec::new());
        };
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
        let mut tau = f32::INFINITY;
        let mut unique: BTreeSet<u64> = BTreeSet::new();
        search_node(
            root,
            target,
            k,
            data,
            &self.distance,
            self.max_nearest_neighbors,
            &mut heap,
            &mut tau,
            &mut unique,
        )?;
        let candidates: Vec<VpElement> = heap
            .into_iter()
            .map(|e| VpElement {
                index: e.index,
                distance: e.distance,
            })
            .collect();
        Ok(select_k(k, candidates, &mut self.search_rng.borrow_mut()))
    }

    /// Same contract as `search`, via an exhaustive scan; used as the
    /// correctness oracle and whenever no tree exists.
    pub fn linear_search(
        &self,
        target: &[f32],
        k: usize,
        data: &[Vec<f32>],
    ) -> Result<Vec<VpElement>> {
        let mut candidates = Vec::with_capacity(data.len());
        for (index, row) in data.iter().enumerate() {
            let distance = self.distance.distance(target, row)?;
            candidates.push(VpElement { index, distance });
        }
        Ok(select_k(k, candidates, &mut self.search_rng.borrow_mut()))
    }

    /// For each row in `[begin, end)`, verify the tree and an exhaustive
    /// scan agree on the distance multiset returned for `k` neighbours.
    pub fn test(&self, data: &[Vec<f32>], begin: usize, end: usize, k: usize) -> Result<()> {
        for i in begin..end {
            let target = data
                .get(i)
                .ok_or_else(|| Error::out_of_range(format!("row {i} of {}", data.len())))?;
            let mut tree_distances: Vec<f32> =
                self.search(target, k, data)?.into_iter().map(|e| e.distance).collect();
            let mut linear_distances: Vec<f32> = self
                .linear_search(target, k, data)?
                .into_iter()
                .map(|e| e.distance)
                .collect();
            tree_distances.sort_by(f32::total_cmp);
            linear_distances.sort_by(f32::total_cmp);
            if tree_distances.len() != linear_distances.len()
                || tree_distances
                    .iter()
                    .zip(&linear_distances)
                    .any(|(a, b)| (a - b).abs() > 1e-4)
            {
                return Err(Error::nearest_neighbor_different(format!(
                    "row {i}: tree {:?} vs linear {:?}",
                    tree_distances, linear_distances
                )));
            }
        }
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn build_recursive(
    indices: &mut Vec<usize>,
    data: &[Vec<f32>],
    distance: &LpDistance,
    rng: &mut StdRng,
    progress: &dyn Progress,
    processed: &RefCell<usize>,
    total: usize,
    aborted: &RefCell<bool>,
) -> Result<Option<Box<VpNode>>> {
    if *aborted.borrow() || indices.is_empty() {
        return Ok(None);
    }
    if indices.len() == 1 {
        let mut count = processed.borrow_mut();
        *count += 1;
        log::trace!("VpTree::build: leaf node for row {}, {}/{total}", indices[0], *count);
        if progress.update(*count, total) == ProgressSignal::Abort {
            *aborted.borrow_mut() = true;
            return Ok(None);
        }
        return Ok(Some(Box::new(VpNode {
            index: indices[0],
            threshold: 0.0,
            in_child: None,
            out_child: None,
        })));
    }

    let vantage_pos = rng.gen_range(0..indices.len());
    indices.swap(0, vantage_pos);
    let vantage = indices[0];

    let mut rest: Vec<(usize, f32)> = Vec::with_capacity(indices.len() - 1);
    for &idx in &indices[1..] {
        let d = distance.distance(&data[vantage], &data[idx])?;
        rest.push((idx, d));
    }
    let median = rest.len() / 2;
    rest.select_nth_unstable_by(median, |a, b| a.1.total_cmp(&b.1));
    let threshold = rest[median].1;

    let mut in_indices: Vec<usize> = rest[..median].iter().map(|(i, _)| *i).collect();
    let mut out_indices: Vec<usize> = rest[median..].iter().map(|(i, _)| *i).collect();

    let in_child = build_recursive(
        &mut in_indices,
        data,
        distance,
        rng,
        progress,
        processed,
        total,
        aborted,
    )?;
    let out_child = build_recursive(
        &mut out_indices,
        data,
        distance,
        rng,
        progress,
        processed,
        total,
        aborted,
    )?;

    {
        let mut count = processed.borrow_mut();
        *count += 1;
        if progress.update(*count, total) == ProgressSignal::Abort {
            *aborted.borrow_mut() = true;
        }
    }

    Ok(Some(Box::new(VpNode {
        index: vantage,
        threshold,
        in_child,
        out_child,
    })))
}

#[allow(clippy::too_many_arguments)]
fn search_node(
    node: &VpNode,
    target: &[f32],
    k: usize,
    data: &[Vec<f32>],
    distance: &LpDistance,
    max_nearest_neighbors: usize,
    heap: &mut BinaryHeap<HeapEntry>,
    tau: &mut f32,
    unique: &mut BTreeSet<u64>,
) -> Result<()> {
    let d = distance.distance(target, &data[node.index])?;

    if d <= *tau {
        unique.insert(d.to_bits() as u64);
        if unique.len() > k || heap.len() > max_nearest_neighbors {
            if let Some(top) = heap.peek().copied() {
                let top_d = top.distance;
                while matches!(heap.peek(), Some(e) if e.distance == top_d) {
                    heap.pop();
                }
                unique.remove(&(top_d.to_bits() as u64));
            }
        }
        heap.push(HeapEntry {
            distance: d,
            index: node.index,
        });
        *tau = heap.peek().map(|e| e.distance).unwrap_or(f32::INFINITY);
    }

    let threshold = node.threshold;
    if d < threshold {
        if let Some(child) = &node.in_child {
            search_node(child, target, k, data, distance, max_nearest_neighbors, heap, tau, unique)?;
        }
        if d + *tau >= threshold {
            if let Some(child) = &node.out_child {
                search_node(child, target, k, data, distance, max_nearest_neighbors, heap, tau, unique)?;
            }
        }
    } else if d == threshold {
        if let Some(child) = &node.in_child {
            search_node(child, target, k, data, distance, max_nearest_neighbors, heap, tau, unique)?;
        }
        if let Some(child) = &node.out_child {
            search_node(child, target, k, data, distance, max_nearest_neighbors, heap, tau, unique)?;
        }
    } else {
        if let Some(child) = &node.out_child {
            search_node(child, target, k, data, distance, max_nearest_neighbors, heap, tau, unique)?;
        }
        if d - *tau <= threshold {
            if let Some(child) = &node.in_child {
                search_node(child, target, k, data, distance, max_nearest_neighbors, heap, tau, unique)?;
            }
        }
    }
    Ok(())
}

/// Finalise a candidate set: if larger than `k`, pick `k` uniformly at
/// random (without replacement); then sort ascending by distance, ties
/// broken by ascending index.
fn select_k(k: usize, mut candidates: Vec<VpElement>, rng: &mut StdRng) -> Vec<VpElement> {
    if candidates.len() > k {
        let mut selected = Vec::with_capacity(k);
        for _ in 0..k {
            if candidates.is_empty() {
                break;
            }
            let pick = rng.gen_range(0..candidates.len());
            selected.push(candidates.swap_remove(pick));
        }
        candidates = selected;
    }
    candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.index.cmp(&b.index)));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_data() -> Vec<Vec<f32>> {
        (0..20)
            .map(|i| vec![(i % 5) as f32, (i / 5) as f32])
            .collect()
    }

    #[test]
    fn empty_tree_search_returns_empty() {
        let tree = VpTree::empty(LpDistance::L2);
        assert!(!tree.is_built());
        let data: Vec<Vec<f32>> = Vec::new();
        assert!(tree.search(&[0.0, 0.0], 3, &data).unwrap().is_empty());
    }

    #[test]
    fn exact_match_has_zero_distance() {
        let data = grid_data();
        let tree = VpTree::build(&data, LpDistance::L2, &NullProgress).unwrap();
        for (i, row) in data.iter().enumerate() {
            let hits = tree.search(row, 5, &data).unwrap();
            assert_eq!(hits[0].distance, 0.0);
            assert_eq!(hits[0].index, i);
        }
    }

    #[test]
    fn tree_matches_linear_search() {
        let data = grid_data();
        let tree = VpTree::build(&data, LpDistance::L2, &NullProgress).unwrap();
        tree.test(&data, 0, data.len(), 5).unwrap();
    }

    #[test]
    fn deterministic_build_same_seed() {
        let data = grid_data();
        let a = VpTree::build_with_seed(&data, LpDistance::L2, 23, &NullProgress).unwrap();
        let b = VpTree::build_with_seed(&data, LpDistance::L2, 23, &NullProgress).unwrap();
        assert_eq!(a.size(), b.size());
        // Same seed must produce the same root vantage point.
        assert_eq!(a.root.as_ref().unwrap().index, b.root.as_ref().unwrap().index);
    }

    #[test]
    fn fewer_than_k_points_returns_all() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let tree = VpTree::build(&data, LpDistance::L2, &NullProgress).unwrap();
        let hits = tree.search(&[0.0, 0.0], 5, &data).unwrap();
        assert_eq!(hits.len(), 2);
    }
}
