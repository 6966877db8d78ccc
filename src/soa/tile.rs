//! Tile types and the [`soa_tile!`] macro that generates them.
//!
//! `soa_tile!` expands an ordered field list into a `#[repr(C)]` struct
//! holding one inner array per field, sized for a fixed lane count. The
//! resulting block is plain old data and byte-for-byte the size of the
//! equivalent hand-written struct; the macro rejects zero lane counts,
//! zero shape extents and padded layouts at compile time.

use super::layout::LaneOrder;
use bytemuck::Pod;

/// A fixed-size structure-of-arrays block covering `LANES` particles.
pub trait Tile: Pod + Send + Sync {
    /// Number of particles stored per tile.
    const LANES: usize;
    /// Placement of the lane index inside every member.
    const ORDER: LaneOrder;
    /// Number of members in the field list.
    const MEMBERS: usize;
}

/// Compile-time indexed access to the `I`-th member of a tile.
pub trait TileMember<const I: usize>: Tile {
    /// Scalar type of the member.
    type Scalar: Pod;
    /// Concrete nested-array type of the member.
    type Field;
    /// Shape extents of one particle's entry, outermost first. Empty for
    /// scalar members.
    const SHAPE: &'static [usize];
    /// Byte offset of the member inside the tile.
    const OFFSET: usize;

    fn member(&self) -> &Self::Field;
    fn member_mut(&mut self) -> &mut Self::Field;
}

/// Typed view of the `I`-th member of a tile.
///
/// Under [`LaneOrder::LaneFastest`] the returned array indexes as
/// `[shape_indices...][lane]`, under [`LaneOrder::LaneSlowest`] as
/// `[lane][shape_indices...]`.
pub fn member<const I: usize, T: TileMember<I>>(tile: &T) -> &T::Field {
    tile.member()
}

/// Mutable variant of [`member`].
pub fn member_mut<const I: usize, T: TileMember<I>>(tile: &mut T) -> &mut T::Field {
    tile.member_mut()
}

/// Declares a tile type from an ordered list of per-particle fields.
///
/// ```
/// particle_tiles::soa_tile! {
///     pub struct MotionTile(lanes = 8, ordering = LaneFastest) {
///         position: f64[3],
///         velocity: f64[3],
///         mass: f64,
///     }
/// }
///
/// let mut tile = <MotionTile as particle_tiles::soa::Zeroable>::zeroed();
/// // member 0 is `position`, indexed [component][lane]
/// particle_tiles::member_mut::<0, _>(&mut tile)[1][5] = 2.5;
/// assert_eq!(tile.position[1][5], 2.5);
/// ```
///
/// Scalars of every field must be plain old data. A field without shape
/// brackets is a scalar and stores one value per lane.
#[macro_export]
macro_rules! soa_tile {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident(lanes = $lanes:literal, ordering = $ord:ident) {
            $( $(#[$fmeta:meta])* $field:ident : $scalar:ty $([$dim:literal])* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(Copy, Clone)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                pub $field: $crate::soa_tile!(@member_ty $ord, $scalar, $lanes, $([$dim])*),
            )+
        }

        unsafe impl $crate::soa::Zeroable for $name {}
        // Sound: repr(C), every member is a nested array of a Pod scalar,
        // and the size assertion below rules out interior padding.
        unsafe impl $crate::soa::Pod for $name {}

        impl $crate::soa::Tile for $name {
            const LANES: usize = $lanes;
            const ORDER: $crate::soa::LaneOrder = $crate::soa_tile!(@order $ord);
            const MEMBERS: usize = [$( stringify!($field) ),+].len();
        }

        const _: () = {
            assert!($lanes > 0, "a tile must hold at least one lane");
            $($( assert!($dim > 0, "member shape extents must be positive"); )*)+
            assert!(
                ::core::mem::size_of::<$name>()
                    == 0 $( + ::core::mem::size_of::<
                        $crate::soa_tile!(@member_ty $ord, $scalar, $lanes, $([$dim])*)
                    >() )+,
                "tile members must pack without padding"
            );

            #[allow(dead_code)]
            fn member_scalars_are_pod() {
                fn check<T: $crate::soa::Pod>() {}
                $( check::<$scalar>(); )+
            }
        };

        $crate::soa_tile!(@members $name, $ord, $lanes, (0usize), $( ($field : $scalar $([$dim])*) )+);
    };

    // Member storage type. Lane fastest: wrap `[Scalar; LANES]` in the
    // shape extents from innermost to outermost.
    (@member_ty LaneFastest, $scalar:ty, $lanes:literal,) => {
        [$scalar; $lanes]
    };
    (@member_ty LaneFastest, $scalar:ty, $lanes:literal, [$d0:literal] $([$rest:literal])*) => {
        [$crate::soa_tile!(@member_ty LaneFastest, $scalar, $lanes, $([$rest])*); $d0]
    };
    // Lane slowest: one shaped entry per lane.
    (@member_ty LaneSlowest, $scalar:ty, $lanes:literal, $([$dim:literal])*) => {
        [$crate::soa_tile!(@shape_ty $scalar, $([$dim])*); $lanes]
    };
    (@shape_ty $scalar:ty,) => {
        $scalar
    };
    (@shape_ty $scalar:ty, [$d0:literal] $([$rest:literal])*) => {
        [$crate::soa_tile!(@shape_ty $scalar, $([$rest])*); $d0]
    };

    (@order LaneFastest) => { $crate::soa::LaneOrder::LaneFastest };
    (@order LaneSlowest) => { $crate::soa::LaneOrder::LaneSlowest };

    // One `TileMember` impl per field, counting member indices upward.
    (@members $name:ident, $ord:ident, $lanes:literal, ($($idx:tt)*),) => {};
    (@members $name:ident, $ord:ident, $lanes:literal, ($($idx:tt)*),
        ($field:ident : $scalar:ty $([$dim:literal])*) $($rest:tt)*
    ) => {
        impl $crate::soa::TileMember<{ $($idx)* }> for $name {
            type Scalar = $scalar;
            type Field = $crate::soa_tile!(@member_ty $ord, $scalar, $lanes, $([$dim])*);
            const SHAPE: &'static [usize] = &[$( $dim ),*];
            const OFFSET: usize = ::core::mem::offset_of!($name, $field);

            fn member(&self) -> &Self::Field {
                &self.$field
            }

            fn member_mut(&mut self) -> &mut Self::Field {
                &mut self.$field
            }
        }

        $crate::soa_tile!(@members $name, $ord, $lanes, ($($idx)* + 1usize), $($rest)*);
    };
}
