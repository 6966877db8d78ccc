//! Cutoff-radius neighbor lists packed as compressed sparse row graphs.
//!
//! The entry point is [`build_neighborhood_list`]: given particle
//! coordinates, a query range and a cutoff radius it returns a
//! [`CrsGraph`] listing, for every particle in the range, the ids of all
//! particles within the cutoff. The [`Full`] policy lists every pair from
//! both sides, the [`Half`] policy lists each unordered pair once for
//! Newton's-third-law style force kernels.

pub mod crs;
pub mod discriminator;
pub mod spatial_index;

pub use crs::{build_neighborhood_list, build_neighborhood_list_with, CrsGraph, NeighborhoodError};
pub use discriminator::{Discriminator, Full, Half};
pub use spatial_index::{BruteForceIndex, RStarIndex, SpatialIndex};

use crate::floating_type_mod::FT;
use crate::soa::{Slice, Tile, TileMember};
use crate::VF;

/// Read access to a collection of `D`-component particle coordinates.
pub trait CoordinateSlice<const D: usize>: Sync {
    /// Number of particles.
    fn size(&self) -> usize;

    /// One coordinate component of particle `i`.
    fn coord(&self, i: usize, d: usize) -> FT;

    fn point(&self, i: usize) -> VF<D> {
        VF::<D>::from_fn(|d, _| self.coord(i, d))
    }
}

impl<const D: usize> CoordinateSlice<D> for [VF<D>] {
    fn size(&self) -> usize {
        self.len()
    }

    fn coord(&self, i: usize, d: usize) -> FT {
        self[i][d]
    }

    fn point(&self, i: usize) -> VF<D> {
        self[i]
    }
}

impl<'a, T, const I: usize, const D: usize> CoordinateSlice<D> for Slice<'a, T, I>
where
    T: Tile + TileMember<I, Scalar = FT>,
{
    fn size(&self) -> usize {
        Slice::size(self)
    }

    fn coord(&self, i: usize, d: usize) -> FT {
        debug_assert!(T::SHAPE.len() == 1 && T::SHAPE[0] == D);
        self.get(i, &[d])
    }
}
