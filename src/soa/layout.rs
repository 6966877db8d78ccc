//! Index arithmetic for tile members.
//!
//! A member with shape `[d0, d1, ...]` stores `d0 * d1 * ... * LANES`
//! scalars. The lane order decides where the lane index sits in the
//! flattened storage; both orders are plain reorderings of the same
//! logical data.

/// Placement of the lane index inside one member's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneOrder {
    /// The lane index varies fastest: indexing reads
    /// `member[shape_indices...][lane]`.
    LaneFastest,
    /// The lane index varies slowest: indexing reads
    /// `member[lane][shape_indices...]`.
    LaneSlowest,
}

/// Number of scalars one particle contributes to a member.
pub fn shape_len(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Total number of scalars in a member across all lanes.
pub fn member_extent(shape: &[usize], lanes: usize) -> usize {
    lanes * shape_len(shape)
}

/// Flat scalar offset of one element inside a member.
///
/// `shape_idx` must provide one index per shape dimension; a scalar field
/// passes an empty slice and is addressed by its lane alone.
pub fn flat_offset(
    shape: &[usize],
    lanes: usize,
    order: LaneOrder,
    shape_idx: &[usize],
    lane: usize,
) -> usize {
    debug_assert_eq!(shape.len(), shape_idx.len());
    debug_assert!(lane < lanes);

    let mut inner = 0;
    for (extent, idx) in shape.iter().zip(shape_idx.iter()) {
        debug_assert!(idx < extent);
        inner = inner * extent + idx;
    }

    match order {
        LaneOrder::LaneFastest => inner * lanes + lane,
        LaneOrder::LaneSlowest => lane * shape_len(shape) + inner,
    }
}

/// Scalar strides of a member: one stride per shape dimension plus the
/// lane stride. `flat_offset` equals the dot product of indices with
/// these strides.
pub fn member_strides(shape: &[usize], lanes: usize, order: LaneOrder) -> (Vec<usize>, usize) {
    let mut strides = vec![0; shape.len()];
    let mut acc = 1;
    for (k, extent) in shape.iter().enumerate().rev() {
        strides[k] = acc;
        acc *= extent;
    }

    match order {
        LaneOrder::LaneFastest => {
            for s in strides.iter_mut() {
                *s *= lanes;
            }
            (strides, 1)
        }
        LaneOrder::LaneSlowest => (strides, shape_len(shape)),
    }
}

#[test]
fn flat_offset_matches_strides() {
    let shape = [2, 3, 4];
    let lanes = 8;
    for order in [LaneOrder::LaneFastest, LaneOrder::LaneSlowest] {
        let (strides, lane_stride) = member_strides(&shape, lanes, order);
        for i0 in 0..2 {
            for i1 in 0..3 {
                for i2 in 0..4 {
                    for lane in 0..lanes {
                        let expected =
                            i0 * strides[0] + i1 * strides[1] + i2 * strides[2] + lane * lane_stride;
                        assert_eq!(
                            flat_offset(&shape, lanes, order, &[i0, i1, i2], lane),
                            expected
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn flat_offset_is_a_bijection() {
    let shape = [3, 5];
    let lanes = 4;
    for order in [LaneOrder::LaneFastest, LaneOrder::LaneSlowest] {
        let mut seen = vec![false; member_extent(&shape, lanes)];
        for i0 in 0..3 {
            for i1 in 0..5 {
                for lane in 0..lanes {
                    let flat = flat_offset(&shape, lanes, order, &[i0, i1], lane);
                    assert!(!seen[flat]);
                    seen[flat] = true;
                }
            }
        }
        assert!(seen.iter().all(|&v| v));
    }
}

#[test]
fn scalar_members_are_lane_indexed() {
    // Empty shape: both orders address by lane only.
    for order in [LaneOrder::LaneFastest, LaneOrder::LaneSlowest] {
        for lane in 0..6 {
            assert_eq!(flat_offset(&[], 6, order, &[], lane), lane);
        }
        let (strides, lane_stride) = member_strides(&[], 6, order);
        assert!(strides.is_empty());
        assert_eq!(lane_stride, 1);
    }
}
