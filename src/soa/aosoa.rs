//! Array-of-structs-of-arrays container and member column views.

use super::layout::flat_offset;
use super::tile::{Tile, TileMember};
use core::mem::size_of;

/// A particle collection stored as an array of tiles.
///
/// The container tracks a logical particle count; the last tile may be
/// partially occupied. Tiles are plain old data, so growth and shrinkage
/// are raw copies.
#[derive(Clone)]
pub struct AoSoA<T: Tile> {
    tiles: Vec<T>,
    len: usize,
}

impl<T: Tile> AoSoA<T> {
    pub fn new() -> Self {
        AoSoA {
            tiles: Vec::new(),
            len: 0,
        }
    }

    pub fn with_len(len: usize) -> Self {
        let mut aosoa = Self::new();
        aosoa.resize(len);
        aosoa
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Grows or shrinks to `len` particles. New tiles are zero-filled.
    pub fn resize(&mut self, len: usize) {
        let tiles = (len + T::LANES - 1) / T::LANES;
        self.tiles.resize(tiles, T::zeroed());
        self.len = len;
    }

    pub fn tiles(&self) -> &[T] {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut [T] {
        &mut self.tiles
    }

    pub fn tile(&self, t: usize) -> &T {
        &self.tiles[t]
    }

    pub fn tile_mut(&mut self, t: usize) -> &mut T {
        &mut self.tiles[t]
    }

    /// Splits a particle index into its tile and lane.
    pub const fn decompose(p: usize) -> (usize, usize) {
        (p / T::LANES, p % T::LANES)
    }

    /// Read-only view of member `I` across all particles.
    pub fn slice<const I: usize>(&self) -> Slice<'_, T, I>
    where
        T: TileMember<I>,
    {
        Slice {
            tiles: &self.tiles,
            len: self.len,
        }
    }

    /// Mutable view of member `I` across all particles.
    pub fn slice_mut<const I: usize>(&mut self) -> SliceMut<'_, T, I>
    where
        T: TileMember<I>,
    {
        SliceMut {
            tiles: &mut self.tiles,
            len: self.len,
        }
    }
}

fn scalar_range<T: TileMember<I>, const I: usize>(p: usize, shape_idx: &[usize]) -> (usize, core::ops::Range<usize>) {
    let (t, lane) = (p / T::LANES, p % T::LANES);
    let flat = flat_offset(T::SHAPE, T::LANES, T::ORDER, shape_idx, lane);
    let start = T::OFFSET + flat * size_of::<T::Scalar>();
    (t, start..start + size_of::<T::Scalar>())
}

/// Borrowed view of one member's column; indexes by particle id and the
/// member's own shape indices.
#[derive(Clone, Copy)]
pub struct Slice<'a, T: Tile + TileMember<I>, const I: usize> {
    tiles: &'a [T],
    len: usize,
}

impl<'a, T: Tile + TileMember<I>, const I: usize> Slice<'a, T, I> {
    /// Number of particles covered by the view.
    pub fn size(&self) -> usize {
        self.len
    }

    pub fn get(&self, p: usize, shape_idx: &[usize]) -> T::Scalar {
        debug_assert!(p < self.len);
        let (t, range) = scalar_range::<T, I>(p, shape_idx);
        bytemuck::pod_read_unaligned(&bytemuck::bytes_of(&self.tiles[t])[range])
    }
}

/// Mutable variant of [`Slice`].
pub struct SliceMut<'a, T: Tile + TileMember<I>, const I: usize> {
    tiles: &'a mut [T],
    len: usize,
}

impl<'a, T: Tile + TileMember<I>, const I: usize> SliceMut<'a, T, I> {
    pub fn size(&self) -> usize {
        self.len
    }

    pub fn get(&self, p: usize, shape_idx: &[usize]) -> T::Scalar {
        debug_assert!(p < self.len);
        let (t, range) = scalar_range::<T, I>(p, shape_idx);
        bytemuck::pod_read_unaligned(&bytemuck::bytes_of(&self.tiles[t])[range])
    }

    pub fn set(&mut self, p: usize, shape_idx: &[usize], value: T::Scalar) {
        debug_assert!(p < self.len);
        let (t, range) = scalar_range::<T, I>(p, shape_idx);
        bytemuck::bytes_of_mut(&mut self.tiles[t])[range]
            .copy_from_slice(bytemuck::bytes_of(&value));
    }
}

#[cfg(test)]
mod tests {
    use super::AoSoA;
    use crate::soa::Tile;

    crate::soa_tile! {
        struct StateTile(lanes = 8, ordering = LaneFastest) {
            position: f64[3],
            mass: f64,
        }
    }

    #[test]
    fn resize_is_zero_filled_and_tile_counted() {
        let mut particles: AoSoA<StateTile> = AoSoA::new();
        assert!(particles.is_empty());

        particles.resize(17);
        assert_eq!(particles.len(), 17);
        assert_eq!(particles.tile_count(), 3);
        for p in 0..17 {
            assert_eq!(particles.slice::<1>().get(p, &[]), 0.0);
        }

        particles.resize(3);
        assert_eq!(particles.tile_count(), 1);
    }

    #[test]
    fn decompose_splits_particle_indices() {
        assert_eq!(AoSoA::<StateTile>::decompose(0), (0, 0));
        assert_eq!(AoSoA::<StateTile>::decompose(7), (0, 7));
        assert_eq!(AoSoA::<StateTile>::decompose(8), (1, 0));
        assert_eq!(AoSoA::<StateTile>::decompose(21), (2, 5));
    }

    #[test]
    fn slice_round_trips_through_tiles() {
        let mut particles: AoSoA<StateTile> = AoSoA::with_len(20);

        {
            let mut positions = particles.slice_mut::<0>();
            for p in 0..20 {
                for d in 0..3 {
                    positions.set(p, &[d], (p * 3 + d) as f64);
                }
            }
            let mut masses = particles.slice_mut::<1>();
            for p in 0..20 {
                masses.set(p, &[], 0.5 + p as f64);
            }
        }

        // Values land in the expected tile storage.
        let (t, lane) = AoSoA::<StateTile>::decompose(13);
        assert_eq!(particles.tile(t).position[2][lane], (13 * 3 + 2) as f64);
        assert_eq!(particles.tile(t).mass[lane], 13.5);

        let positions = particles.slice::<0>();
        let masses = particles.slice::<1>();
        for p in 0..20 {
            for d in 0..3 {
                assert_eq!(positions.get(p, &[d]), (p * 3 + d) as f64);
            }
            assert_eq!(masses.get(p, &[]), 0.5 + p as f64);
        }
        assert_eq!(positions.size(), 20);
        assert_eq!(StateTile::LANES, 8);
    }
}
