use crate::error::EngineError;

/// Smallest power of two that is >= `n`.
///
/// `n` must be at least 1: element counts are never zero by the time a
/// sort domain is sized.
pub fn ceil_pow2(n: u32) -> u32 {
    debug_assert!(n >= 1, "ceil_pow2 is undefined for 0");
    let mut v = n.wrapping_sub(1);
    v |= v >> 1;
    v |= v >> 2;
    v |= v >> 4;
    v |= v >> 8;
    v |= v >> 16;
    v.wrapping_add(1)
}

/// Number of lane groups needed to run `total_lanes` lanes.
///
/// Rounds up to a tight ceiling: an exact multiple of `group_width`
/// dispatches no extra idle group.
pub fn group_count(total_lanes: u32, group_width: u32) -> u32 {
    assert!(group_width > 0, "group width must be positive");
    total_lanes.div_ceil(group_width)
}

/// Checks that `groups` groups of `group_width` lanes cover `lanes` lanes.
///
/// An under-dispatch silently leaves elements unprocessed, so debug builds
/// abort right here.
pub fn ensure_covers(groups: u32, group_width: u32, lanes: u32) -> Result<(), EngineError> {
    let covered = groups as u64 * group_width as u64;
    debug_assert!(
        covered >= lanes as u64,
        "dispatch of {groups} x {group_width} lanes under-counts {lanes} lanes"
    );
    if covered < lanes as u64 {
        return Err(EngineError::DispatchUnderCount { groups, group_width, lanes });
    }
    Ok(())
}

/// Group count for `lanes` lanes, with the coverage invariant checked.
pub fn checked_group_count(lanes: u32, group_width: u32) -> Result<u32, EngineError> {
    let groups = group_count(lanes, group_width);
    ensure_covers(groups, group_width, lanes)?;
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceil_pow2_rounds_up() {
        assert_eq!(ceil_pow2(1), 1);
        assert_eq!(ceil_pow2(2), 2);
        assert_eq!(ceil_pow2(3), 4);
        assert_eq!(ceil_pow2(5), 8);
        assert_eq!(ceil_pow2(8), 8);
        assert_eq!(ceil_pow2(1000), 1024);
        assert_eq!(ceil_pow2(1 << 31), 1 << 31);
    }

    #[test]
    fn group_count_never_under_dispatches() {
        for width in [1u32, 7, 128, 256] {
            for lanes in 0..1100u32 {
                let groups = group_count(lanes, width);
                assert!(groups * width >= lanes);
                // tight: one group less would not be enough
                if lanes > 0 {
                    assert!((groups - 1) * width < lanes);
                }
            }
        }
    }

    #[test]
    fn exact_multiple_adds_no_idle_group() {
        assert_eq!(group_count(256, 256), 1);
        assert_eq!(group_count(257, 256), 2);
        assert_eq!(group_count(0, 128), 0);
    }

    #[test]
    fn checked_group_count_accepts_valid_grid() {
        assert_eq!(checked_group_count(1000, 128).unwrap(), 8);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn under_count_is_reported() {
        assert!(matches!(
            ensure_covers(1, 128, 129),
            Err(EngineError::DispatchUnderCount { groups: 1, group_width: 128, lanes: 129 })
        ));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "under-counts")]
    fn under_count_aborts_in_debug() {
        let _ = ensure_covers(1, 128, 129);
    }
}
