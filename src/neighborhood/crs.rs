//! Compressed sparse row neighbor graphs and their two-pass parallel
//! construction.
//!
//! Row lengths are unknown up front, so the build runs the query set
//! twice: a counting pass writes per-row neighbor counts, a serial prefix
//! sum turns them into row offsets, and a filling pass re-runs the same
//! queries into disjoint per-row slices of the column array. Every lane
//! writes only rows it owns, so neither pass needs a lock or a shared
//! growable buffer.

use std::fmt;

use tracing::info_span;

use super::discriminator::Discriminator;
use super::spatial_index::{RStarIndex, SpatialIndex};
use super::CoordinateSlice;
use crate::concurrency::par_iter_mut1;
use crate::floating_type_mod::FT;

/// Neighbor-list graph in compressed sparse row form.
///
/// Row `k` holds the neighbors of the particle with global id
/// `shift + k`, in discovery order. `total` is the size of the indexed
/// particle set and bounds every column id.
#[derive(Debug, Clone)]
pub struct CrsGraph {
    /// Neighbor ids, one run per queried particle.
    pub col_indices: Vec<u32>,
    /// Monotone run boundaries; one entry more than there are rows.
    pub row_offsets: Vec<usize>,
    /// Global id of the particle behind row 0.
    pub shift: usize,
    /// Number of particles in the underlying spatial index.
    pub total: usize,
}

impl CrsGraph {
    pub fn num_rows(&self) -> usize {
        self.row_offsets.len() - 1
    }

    /// Neighbor count of the particle with global id `p`. Particles
    /// outside the queried range have zero neighbors by definition.
    pub fn neighbor_count(&self, p: usize) -> usize {
        debug_assert!(p < self.total);
        match p.checked_sub(self.shift) {
            Some(local) if local < self.num_rows() => {
                self.row_offsets[local + 1] - self.row_offsets[local]
            }
            _ => 0,
        }
    }

    /// The `n`-th neighbor of the particle with global id `p`.
    /// Requires `n < neighbor_count(p)`.
    pub fn neighbor(&self, p: usize, n: usize) -> usize {
        debug_assert!(p < self.total);
        debug_assert!(n < self.neighbor_count(p));
        let local = p - self.shift;
        self.col_indices[self.row_offsets[local] + n] as usize
    }

    /// The whole neighbor run of particle `p`; empty for particles
    /// outside the queried range.
    pub fn neighbors(&self, p: usize) -> &[u32] {
        match p.checked_sub(self.shift) {
            Some(local) if local < self.num_rows() => {
                &self.col_indices[self.row_offsets[local]..self.row_offsets[local + 1]]
            }
            _ => &[],
        }
    }
}

/// Errors reported by the graph builder before any parallel work starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborhoodError {
    /// The query range runs backwards.
    InvalidRange { first: usize, last: usize },
    /// The query range reaches past the coordinate slice.
    RangeOutOfBounds { last: usize, points: usize },
}

impl fmt::Display for NeighborhoodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeighborhoodError::InvalidRange { first, last } => {
                write!(f, "invalid query range: first {} exceeds last {}", first, last)
            }
            NeighborhoodError::RangeOutOfBounds { last, points } => {
                write!(
                    f,
                    "query range ends at {} but only {} particles are indexed",
                    last, points
                )
            }
        }
    }
}

impl std::error::Error for NeighborhoodError {}

/// Builds the neighbor list of every particle in `[first, last)` over the
/// default R*-tree index.
///
/// A non-positive (or NaN) radius yields a graph with every row empty;
/// this is a valid result, not an error. `first == last` yields an empty
/// graph with a single row offset.
pub fn build_neighborhood_list<Tag, P, const D: usize>(
    tag: Tag,
    positions: &P,
    first: usize,
    last: usize,
    radius: FT,
) -> Result<CrsGraph, NeighborhoodError>
where
    Tag: Discriminator,
    P: CoordinateSlice<D> + ?Sized,
{
    build_neighborhood_list_with::<RStarIndex<D>, Tag, P, D>(tag, positions, first, last, radius)
}

/// [`build_neighborhood_list`] with an explicit spatial index provider,
/// e.g. [`super::BruteForceIndex`] for verification runs.
pub fn build_neighborhood_list_with<Idx, Tag, P, const D: usize>(
    _tag: Tag,
    positions: &P,
    first: usize,
    last: usize,
    radius: FT,
) -> Result<CrsGraph, NeighborhoodError>
where
    Idx: SpatialIndex<D>,
    Tag: Discriminator,
    P: CoordinateSlice<D> + ?Sized,
{
    if first > last {
        return Err(NeighborhoodError::InvalidRange { first, last });
    }
    if last > positions.size() {
        return Err(NeighborhoodError::RangeOutOfBounds {
            last,
            points: positions.size(),
        });
    }

    let rows = last - first;
    let total = positions.size();
    let _span = info_span!("build_neighborhood_list", particles = total, queries = rows).entered();

    let mut row_offsets = vec![0usize; rows + 1];

    if rows == 0 || !(radius > 0.0) {
        return Ok(CrsGraph {
            col_indices: Vec::new(),
            row_offsets,
            shift: first,
            total,
        });
    }

    let index = {
        let _s = info_span!("index_build").entered();
        Idx::build(positions)
    };
    let radius_sq = radius * radius;

    // Counting pass: one lane per queried particle, each writing its own
    // row count.
    let mut counts = vec![0usize; rows];
    {
        let _s = info_span!("count_pass").entered();
        par_iter_mut1(&mut counts, |local, count| {
            let owner = first + local;
            index.for_each_within(positions.point(owner), radius_sq, |candidate| {
                if Tag::keep(owner, candidate) {
                    *count += 1;
                }
            });
        });
    }

    // Prefix sum: the only cross-row dependency of the whole build.
    for local in 0..rows {
        row_offsets[local + 1] = row_offsets[local] + counts[local];
    }

    // Filling pass: re-run the identical queries, each lane writing into
    // the disjoint column span its row owns.
    let mut col_indices = vec![0u32; row_offsets[rows]];
    {
        let _s = info_span!("fill_pass").entered();
        let mut row_slots: Vec<&mut [u32]> = Vec::with_capacity(rows);
        let mut rest = col_indices.as_mut_slice();
        for &count in &counts {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(count);
            row_slots.push(head);
            rest = tail;
        }

        par_iter_mut1(&mut row_slots, |local, slots| {
            let owner = first + local;
            let mut cursor = 0;
            index.for_each_within(positions.point(owner), radius_sq, |candidate| {
                if Tag::keep(owner, candidate) {
                    slots[cursor] = candidate as u32;
                    cursor += 1;
                }
            });
            debug_assert_eq!(cursor, slots.len());
        });
    }

    Ok(CrsGraph {
        col_indices,
        row_offsets,
        shift: first,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::{build_neighborhood_list, build_neighborhood_list_with, CrsGraph, NeighborhoodError};
    use crate::floating_type_mod::FT;
    use crate::neighborhood::{BruteForceIndex, Full, Half};
    use crate::{vec3f, V3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn line_of_four() -> Vec<V3> {
        vec![
            vec3f(0., 0., 0.),
            vec3f(1., 0., 0.),
            vec3f(2., 0., 0.),
            vec3f(10., 0., 0.),
        ]
    }

    fn row_set(graph: &CrsGraph, p: usize) -> Vec<usize> {
        let mut row: Vec<usize> = graph.neighbors(p).iter().map(|&c| c as usize).collect();
        row.sort_unstable();
        row
    }

    fn random_cloud(rng: &mut StdRng, n: usize, extent: FT) -> Vec<V3> {
        (0..n)
            .map(|_| {
                vec3f(
                    rng.gen_range(0.0..extent),
                    rng.gen_range(0.0..extent),
                    rng.gen_range(0.0..extent),
                )
            })
            .collect()
    }

    fn check_invariants(graph: &CrsGraph) {
        assert_eq!(graph.row_offsets[0], 0);
        for w in graph.row_offsets.windows(2) {
            assert!(w[0] <= w[1]);
        }
        assert_eq!(*graph.row_offsets.last().unwrap(), graph.col_indices.len());
        for &c in &graph.col_indices {
            assert!((c as usize) < graph.total);
        }
        let total_count: usize = (0..graph.num_rows())
            .map(|k| graph.neighbor_count(graph.shift + k))
            .sum();
        assert_eq!(total_count, graph.col_indices.len());
    }

    #[test]
    fn full_list_on_a_line_of_four() {
        let positions = line_of_four();
        let graph = build_neighborhood_list(Full, &positions[..], 0, 4, 1.5).unwrap();

        check_invariants(&graph);
        assert_eq!(graph.num_rows(), 4);
        assert_eq!(graph.shift, 0);
        assert_eq!(graph.total, 4);
        assert_eq!(row_set(&graph, 0), vec![1]);
        assert_eq!(row_set(&graph, 1), vec![0, 2]);
        assert_eq!(row_set(&graph, 2), vec![1]);
        assert_eq!(row_set(&graph, 3), Vec::<usize>::new());
    }

    #[test]
    fn half_list_on_a_line_of_four() {
        let positions = line_of_four();
        let graph = build_neighborhood_list(Half, &positions[..], 0, 4, 1.5).unwrap();

        check_invariants(&graph);
        assert_eq!(row_set(&graph, 0), vec![1]);
        assert_eq!(row_set(&graph, 1), vec![2]);
        assert_eq!(row_set(&graph, 2), Vec::<usize>::new());
        assert_eq!(row_set(&graph, 3), Vec::<usize>::new());
    }

    #[test]
    fn accessors_walk_each_row() {
        let positions = line_of_four();
        let graph = build_neighborhood_list(Full, &positions[..], 0, 4, 1.5).unwrap();

        for p in 0..4 {
            let via_accessor: Vec<usize> = (0..graph.neighbor_count(p))
                .map(|n| graph.neighbor(p, n))
                .collect();
            let via_run: Vec<usize> = graph.neighbors(p).iter().map(|&c| c as usize).collect();
            assert_eq!(via_accessor, via_run);
        }
    }

    #[test]
    fn shifted_range_queries_a_window() {
        let positions = line_of_four();
        let graph = build_neighborhood_list(Full, &positions[..], 1, 3, 1.5).unwrap();

        check_invariants(&graph);
        assert_eq!(graph.shift, 1);
        assert_eq!(graph.num_rows(), 2);
        assert_eq!(graph.total, 4);
        assert_eq!(row_set(&graph, 1), vec![0, 2]);
        assert_eq!(row_set(&graph, 2), vec![1]);

        // Particles outside the window have zero neighbors, not an error.
        assert_eq!(graph.neighbor_count(0), 0);
        assert_eq!(graph.neighbor_count(3), 0);
        assert!(graph.neighbors(3).is_empty());
    }

    #[test]
    fn backwards_range_is_rejected() {
        let positions = line_of_four();
        let err = build_neighborhood_list(Full, &positions[..], 3, 1, 1.5).unwrap_err();
        assert_eq!(err, NeighborhoodError::InvalidRange { first: 3, last: 1 });
        assert!(err.to_string().contains("exceeds"));

        let err = build_neighborhood_list(Full, &positions[..], 0, 9, 1.5).unwrap_err();
        assert_eq!(err, NeighborhoodError::RangeOutOfBounds { last: 9, points: 4 });
    }

    #[test]
    fn degenerate_inputs_build_empty_graphs() {
        let positions = line_of_four();

        // Zero and negative radii: all rows present, all empty.
        for radius in [0.0, -1.0] {
            for graph in [
                build_neighborhood_list(Full, &positions[..], 0, 4, radius).unwrap(),
                build_neighborhood_list(Half, &positions[..], 0, 4, radius).unwrap(),
            ] {
                check_invariants(&graph);
                assert_eq!(graph.num_rows(), 4);
                assert!(graph.col_indices.is_empty());
                assert!(graph.row_offsets.iter().all(|&o| o == 0));
            }
        }

        // Empty range: a single row offset and no columns.
        let graph = build_neighborhood_list(Full, &positions[..], 2, 2, 1.5).unwrap();
        assert_eq!(graph.row_offsets, vec![0]);
        assert_eq!(graph.num_rows(), 0);
        assert_eq!(graph.shift, 2);

        // A single particle has no neighbors under either policy.
        let lonely = vec![vec3f(0., 0., 0.)];
        for graph in [
            build_neighborhood_list(Full, &lonely[..], 0, 1, 10.0).unwrap(),
            build_neighborhood_list(Half, &lonely[..], 0, 1, 10.0).unwrap(),
        ] {
            assert_eq!(graph.neighbor_count(0), 0);
        }

        // Empty point set with an empty range.
        let nothing: Vec<V3> = Vec::new();
        let graph = build_neighborhood_list(Full, &nothing[..], 0, 0, 1.5).unwrap();
        assert_eq!(graph.row_offsets, vec![0]);
        assert_eq!(graph.total, 0);
    }

    #[test]
    fn coincident_particles_are_mutual_neighbors() {
        let positions = vec![vec3f(1., 1., 1.), vec3f(1., 1., 1.)];
        let graph = build_neighborhood_list(Full, &positions[..], 0, 2, 0.5).unwrap();
        assert_eq!(row_set(&graph, 0), vec![1]);
        assert_eq!(row_set(&graph, 1), vec![0]);

        let graph = build_neighborhood_list(Half, &positions[..], 0, 2, 0.5).unwrap();
        assert_eq!(row_set(&graph, 0), vec![1]);
        assert_eq!(row_set(&graph, 1), Vec::<usize>::new());
    }

    #[test]
    fn full_lists_are_symmetric() {
        let mut rng = StdRng::seed_from_u64(41);
        let positions = random_cloud(&mut rng, 300, 8.0);
        let n = positions.len();
        let graph = build_neighborhood_list(Full, &positions[..], 0, n, 1.0).unwrap();

        check_invariants(&graph);
        for p in 0..n {
            for &c in graph.neighbors(p) {
                assert!(
                    graph.neighbors(c as usize).contains(&(p as u32)),
                    "particle {} lists {} but not vice versa",
                    p,
                    c
                );
            }
        }
    }

    #[test]
    fn half_equals_full_restricted_to_ascending_pairs() {
        let mut rng = StdRng::seed_from_u64(42);
        let positions = random_cloud(&mut rng, 250, 6.0);
        let n = positions.len();

        let full = build_neighborhood_list(Full, &positions[..], 0, n, 1.2).unwrap();
        let half = build_neighborhood_list(Half, &positions[..], 0, n, 1.2).unwrap();

        check_invariants(&full);
        check_invariants(&half);
        for p in 0..n {
            let ascending: Vec<usize> = row_set(&full, p).into_iter().filter(|&c| c > p).collect();
            assert_eq!(ascending, row_set(&half, p), "row {} differs", p);
        }
    }

    #[test]
    fn tree_and_brute_force_builds_agree() {
        let mut rng = StdRng::seed_from_u64(43);
        let positions = random_cloud(&mut rng, 200, 5.0);
        let n = positions.len();

        let tree = build_neighborhood_list(Full, &positions[..], 0, n, 1.3).unwrap();
        let brute =
            build_neighborhood_list_with::<BruteForceIndex<3>, _, _, 3>(Full, &positions[..], 0, n, 1.3)
                .unwrap();

        assert_eq!(tree.row_offsets, brute.row_offsets);
        for p in 0..n {
            assert_eq!(row_set(&tree, p), row_set(&brute, p));
        }
    }

    #[test]
    fn two_dimensional_coordinates_are_supported() {
        use crate::vec2f;

        let positions = vec![vec2f(0., 0.), vec2f(1., 0.), vec2f(4., 0.)];
        let graph = build_neighborhood_list(Full, &positions[..], 0, 3, 1.5).unwrap();
        assert_eq!(row_set(&graph, 0), vec![1]);
        assert_eq!(row_set(&graph, 1), vec![0]);
        assert_eq!(row_set(&graph, 2), Vec::<usize>::new());
    }

    #[test]
    fn builds_from_an_aosoa_member_slice() {
        use crate::soa::AoSoA;

        // The tile scalar must match the crate-wide coordinate scalar
        // for the slice to serve as query coordinates.
        crate::soa_tile! {
            struct PointTile(lanes = 4, ordering = LaneFastest) {
                position: FT[3],
                charge: FT,
            }
        }

        let line = line_of_four();
        let mut particles: AoSoA<PointTile> = AoSoA::with_len(line.len());
        {
            let mut positions = particles.slice_mut::<0>();
            for (p, x) in line.iter().enumerate() {
                for d in 0..3 {
                    positions.set(p, &[d], x[d]);
                }
            }
        }

        let slice = particles.slice::<0>();
        let graph = build_neighborhood_list::<_, _, 3>(Full, &slice, 0, 4, 1.5).unwrap();
        assert_eq!(row_set(&graph, 1), vec![0, 2]);
    }
}
