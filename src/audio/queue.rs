//! Playlist index arithmetic.
//!
//! Manual skips and auto-advance both wrap around the playlist; an empty
//! playlist has no next or previous entry.

pub(crate) fn next_index(current: usize, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some((current.min(len - 1) + 1) % len)
}

pub(crate) fn prev_index(current: usize, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let current = current.min(len - 1);
    Some(if current == 0 { len - 1 } else { current - 1 })
}
