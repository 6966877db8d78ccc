//! Tile-based structure-of-arrays storage.
//!
//! A *tile* holds the fields of a fixed number of particles (its lanes),
//! each field stored as its own inner array so that one lane index sweeps
//! contiguous memory per field. Tiles are plain old data and a collection
//! of them forms an array-of-structs-of-arrays, see [`AoSoA`].

pub mod aosoa;
pub mod layout;
pub mod tile;

pub use aosoa::{AoSoA, Slice, SliceMut};
pub use layout::{flat_offset, member_extent, member_strides, shape_len, LaneOrder};
pub use tile::{member, member_mut, Tile, TileMember};

// Re-exported for the types generated by `soa_tile!`.
pub use bytemuck::{Pod, Zeroable};
