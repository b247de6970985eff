/// Rounds `$value` up to the next multiple of `$granule`.
///
/// `$granule` must be a power of two.
///
/// # Examples
///
/// ```rust
/// use rallocator::round_up;
///
/// assert_eq!(round_up!(0, 8), 0);
/// assert_eq!(round_up!(1, 8), 8);
/// assert_eq!(round_up!(8, 8), 8);
/// assert_eq!(round_up!(9, 8), 16);
/// ```
#[macro_export]
macro_rules! round_up {
  ($value:expr, $granule:expr) => {
    ($value + $granule - 1) & !($granule - 1)
  };
}

#[cfg(test)]
mod tests {
  #[test]
  fn rounds_up_to_granule() {
    for i in 0..10usize {
      let sizes = (8 * i + 1)..=(8 * (i + 1));
      let expected = 8 * (i + 1);

      for size in sizes {
        assert_eq!(expected, round_up!(size, 8));
      }
    }
  }

  #[test]
  fn exact_multiples_are_unchanged() {
    for i in 0..10usize {
      assert_eq!(8 * i, round_up!(8 * i, 8));
    }
  }
}
