/*!
Particle data layout and neighborhood construction for particle-based
solvers (SPH, MD, PIC, DEM).

Two building blocks:

- [`soa`]: tile-based structure-of-arrays storage. The [`soa_tile!`] macro
  turns an ordered list of per-particle fields into a fixed-size POD block
  holding one inner array per field, with two selectable lane orderings.
- [`neighborhood`]: cutoff-radius neighbor lists over particle coordinates,
  built in parallel on top of an R*-tree and packed into a compressed
  sparse row graph.
*/

pub mod concurrency;
pub mod neighborhood;
pub mod soa;

#[cfg(feature = "double-precision")]
pub mod floating_type_mod {
    pub type FT = f64;
}

#[cfg(not(feature = "double-precision"))]
pub mod floating_type_mod {
    pub type FT = f32;
}

use floating_type_mod::FT;

use nalgebra::SVector;

pub type V<T, const D: usize> = SVector<T, D>;

pub type VF<const D: usize> = V<FT, D>;

pub type V2 = V<FT, 2>;
pub type V3 = V<FT, 3>;

pub fn vec2f(x: FT, y: FT) -> V2 {
    [x, y].into()
}

pub fn vec3f(x: FT, y: FT, z: FT) -> V3 {
    [x, y, z].into()
}

pub use neighborhood::{
    build_neighborhood_list, build_neighborhood_list_with, BruteForceIndex, CoordinateSlice,
    CrsGraph, Discriminator, Full, Half, NeighborhoodError, RStarIndex, SpatialIndex,
};
pub use soa::{member, member_mut, AoSoA, LaneOrder, Slice, SliceMut, Tile, TileMember};
