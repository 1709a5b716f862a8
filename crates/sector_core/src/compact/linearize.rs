//! Splits a flat index space into fixed-size dispatch slices.

/// Calls `dispatch(offset, len)` for consecutive slices covering `0..total`.
///
/// Every slice but the last is `slice` long. Slices run in ascending order.
///
/// # Returns
///
/// The number of dispatches issued.
///
/// # Panics
///
/// Panics if `slice` is zero while `total` is not.
pub fn linearize<F>(total: usize, slice: usize, mut dispatch: F) -> usize
where
    F: FnMut(usize, usize),
{
    if total == 0 {
        return 0;
    }
    assert!(slice > 0, "dispatch slice must be nonzero");

    let mut offset = 0;
    let mut dispatches = 0;
    while offset < total {
        let len = slice.min(total - offset);
        dispatch(offset, len);
        offset += len;
        dispatches += 1;
    }
    dispatches
}
