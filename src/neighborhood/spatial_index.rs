//! Spatial index providers for sphere queries.
//!
//! The graph builder is written against the [`SpatialIndex`] capability
//! only. [`RStarIndex`] is the production provider; [`BruteForceIndex`]
//! is the O(n²) reference used to validate it and for very small inputs.

use rstar::{primitives::GeomWithData, Point, RTree};

use super::CoordinateSlice;
use crate::floating_type_mod::FT;
use crate::VF;

/// Capability consumed by the graph builder: build once from all particle
/// coordinates, then answer sphere queries concurrently.
pub trait SpatialIndex<const D: usize>: Sync + Sized {
    fn build<P: CoordinateSlice<D> + ?Sized>(points: &P) -> Self;

    /// Number of indexed particles.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes `visit` with the id of every particle whose squared
    /// distance to `center` is at most `radius_sq`, in no particular
    /// order. The owner particle itself is reported like any other.
    fn for_each_within<F: FnMut(usize)>(&self, center: VF<D>, radius_sq: FT, visit: F);
}

#[derive(Debug, PartialEq, Clone, Copy)]
struct TreePoint<const D: usize> {
    p: VF<D>,
}

impl<const D: usize> Point for TreePoint<D> {
    type Scalar = FT;

    const DIMENSIONS: usize = D;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        TreePoint {
            p: VF::<D>::from_fn(|d, _| generator(d)),
        }
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        self.p[index]
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        &mut self.p[index]
    }
}

type TreeEntry<const D: usize> = GeomWithData<TreePoint<D>, usize>;

/// Bulk-loaded R*-tree over the particle coordinates.
pub struct RStarIndex<const D: usize> {
    tree: RTree<TreeEntry<D>>,
    size: usize,
}

impl<const D: usize> SpatialIndex<D> for RStarIndex<D> {
    fn build<P: CoordinateSlice<D> + ?Sized>(points: &P) -> Self {
        let entries: Vec<_> = (0..points.size())
            .map(|i| TreeEntry::new(TreePoint { p: points.point(i) }, i))
            .collect();
        let size = entries.len();
        RStarIndex {
            tree: RTree::bulk_load(entries),
            size,
        }
    }

    fn len(&self) -> usize {
        self.size
    }

    fn for_each_within<F: FnMut(usize)>(&self, center: VF<D>, radius_sq: FT, mut visit: F) {
        for entry in self
            .tree
            .locate_within_distance(TreePoint { p: center }, radius_sq)
        {
            visit(entry.data);
        }
    }
}

/// Exhaustive pairwise scan. Quadratic, kept as the correctness reference
/// for the tree-backed index.
pub struct BruteForceIndex<const D: usize> {
    points: Vec<VF<D>>,
}

impl<const D: usize> SpatialIndex<D> for BruteForceIndex<D> {
    fn build<P: CoordinateSlice<D> + ?Sized>(points: &P) -> Self {
        BruteForceIndex {
            points: (0..points.size()).map(|i| points.point(i)).collect(),
        }
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn for_each_within<F: FnMut(usize)>(&self, center: VF<D>, radius_sq: FT, mut visit: F) {
        for (i, point) in self.points.iter().enumerate() {
            if (point - center).norm_squared() <= radius_sq {
                visit(i);
            }
        }
    }
}
