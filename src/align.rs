/// Size of a header or footer word, in bytes.
pub const WSIZE: usize = 4;

/// Double word size. Every block size and every payload offset is a
/// multiple of this.
pub const DSIZE: usize = 8;

/// Rounds a byte count up to the double-word alignment unit.
///
/// # Examples
///
/// ```rust
/// use segalloc::align;
///
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(16), 16);
/// assert_eq!(align!(1), 8);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::DSIZE - 1) & !($crate::align::DSIZE - 1)
  };
}

/// Checked variant of [`align!`], `None` when rounding would overflow.
pub fn checked_align(value: usize) -> Option<usize> {
  Some(value.checked_add(DSIZE - 1)? & !(DSIZE - 1))
}
