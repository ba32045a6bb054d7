// Optimal sorting-network medians (Devillard, public domain) and a
// quickselect fallback (Numerical Recipes in C, 2nd ed., section 8.5).
// Ported arithmetically from examples/original_source/median.c.

#[inline]
fn pix_sort(p: &mut [f64], a: usize, b: usize) {
  if p[a] > p[b] {
    p.swap(a, b);
  }
}

pub fn opt_med2(p: &mut [f64]) -> f64 {
  (p[0] + p[1]) * 0.5
}

pub fn opt_med3(p: &mut [f64]) -> f64 {
  pix_sort(p, 0, 1);
  pix_sort(p, 1, 2);
  pix_sort(p, 0, 1);
  p[1]
}

pub fn opt_med4(p: &mut [f64]) -> f64 {
  pix_sort(p, 0, 2);
  pix_sort(p, 1, 3);
  pix_sort(p, 0, 1);
  pix_sort(p, 2, 3);
  (p[1] + p[2]) * 0.5
}

pub fn opt_med5(p: &mut [f64]) -> f64 {
  pix_sort(p, 0, 1);
  pix_sort(p, 3, 4);
  pix_sort(p, 0, 3);
  pix_sort(p, 1, 4);
  pix_sort(p, 1, 2);
  pix_sort(p, 2, 3);
  pix_sort(p, 1, 2);
  p[2]
}

// Even-length windows: Havlicek, Sakady & Katz, "Fast, efficient median
// filters with even length windows".
pub fn opt_med6(p: &mut [f64]) -> f64 {
  pix_sort(p, 1, 2);
  pix_sort(p, 3, 4);
  pix_sort(p, 0, 1);
  pix_sort(p, 2, 3);
  pix_sort(p, 4, 5);
  pix_sort(p, 1, 2);
  pix_sort(p, 3, 4);
  pix_sort(p, 0, 1);
  pix_sort(p, 2, 3);
  pix_sort(p, 4, 5);
  pix_sort(p, 1, 2);
  pix_sort(p, 3, 4);
  (p[2] + p[3]) * 0.5
}

pub fn opt_med7(p: &mut [f64]) -> f64 {
  pix_sort(p, 0, 5);
  pix_sort(p, 0, 3);
  pix_sort(p, 1, 6);
  pix_sort(p, 2, 4);
  pix_sort(p, 0, 1);
  pix_sort(p, 3, 5);
  pix_sort(p, 2, 6);
  pix_sort(p, 2, 3);
  pix_sort(p, 3, 6);
  pix_sort(p, 4, 5);
  pix_sort(p, 1, 4);
  pix_sort(p, 1, 3);
  pix_sort(p, 3, 4);
  p[3]
}

// Optimal Batcher's sort for 8 elements.
pub fn opt_med8(p: &mut [f64]) -> f64 {
  pix_sort(p, 0, 4);
  pix_sort(p, 1, 5);
  pix_sort(p, 2, 6);
  pix_sort(p, 3, 7);
  pix_sort(p, 0, 2);
  pix_sort(p, 1, 3);
  pix_sort(p, 4, 6);
  pix_sort(p, 5, 7);
  pix_sort(p, 2, 4);
  pix_sort(p, 3, 5);
  pix_sort(p, 0, 1);
  pix_sort(p, 2, 3);
  pix_sort(p, 4, 5);
  pix_sort(p, 6, 7);
  pix_sort(p, 1, 4);
  pix_sort(p, 3, 6);
  (p[3] + p[4]) * 0.5
}

pub fn opt_med9(p: &mut [f64]) -> f64 {
  pix_sort(p, 1, 2);
  pix_sort(p, 4, 5);
  pix_sort(p, 7, 8);
  pix_sort(p, 0, 1);
  pix_sort(p, 3, 4);
  pix_sort(p, 6, 7);
  pix_sort(p, 1, 2);
  pix_sort(p, 4, 5);
  pix_sort(p, 7, 8);
  pix_sort(p, 0, 3);
  pix_sort(p, 5, 8);
  pix_sort(p, 4, 7);
  pix_sort(p, 3, 6);
  pix_sort(p, 1, 4);
  pix_sort(p, 2, 5);
  pix_sort(p, 4, 7);
  pix_sort(p, 4, 2);
  pix_sort(p, 6, 4);
  pix_sort(p, 4, 2);
  p[4]
}

pub fn opt_med16(p: &mut [f64]) -> f64 {
  pix_sort(p, 0, 8);
  pix_sort(p, 1, 9);
  pix_sort(p, 2, 10);
  pix_sort(p, 3, 11);
  pix_sort(p, 4, 12);
  pix_sort(p, 5, 13);
  pix_sort(p, 6, 14);
  pix_sort(p, 7, 15);
  pix_sort(p, 0, 4);
  pix_sort(p, 1, 5);
  pix_sort(p, 2, 6);
  pix_sort(p, 3, 7);
  pix_sort(p, 8, 12);
  pix_sort(p, 9, 13);
  pix_sort(p, 10, 14);
  pix_sort(p, 11, 15);
  pix_sort(p, 4, 8);
  pix_sort(p, 5, 9);
  pix_sort(p, 6, 10);
  pix_sort(p, 7, 11);
  pix_sort(p, 0, 2);
  pix_sort(p, 1, 3);
  pix_sort(p, 4, 6);
  pix_sort(p, 5, 7);
  pix_sort(p, 8, 10);
  pix_sort(p, 9, 11);
  pix_sort(p, 12, 14);
  pix_sort(p, 13, 15);
  pix_sort(p, 2, 8);
  pix_sort(p, 3, 9);
  pix_sort(p, 6, 12);
  pix_sort(p, 7, 13);
  pix_sort(p, 2, 4);
  pix_sort(p, 3, 5);
  pix_sort(p, 6, 8);
  pix_sort(p, 7, 9);
  pix_sort(p, 10, 12);
  pix_sort(p, 11, 13);
  pix_sort(p, 0, 1);
  pix_sort(p, 2, 3);
  pix_sort(p, 4, 5);
  pix_sort(p, 6, 7);
  pix_sort(p, 8, 9);
  pix_sort(p, 10, 11);
  pix_sort(p, 12, 13);
  pix_sort(p, 14, 15);
  pix_sort(p, 1, 8);
  pix_sort(p, 3, 10);
  pix_sort(p, 5, 12);
  pix_sort(p, 7, 14);
  pix_sort(p, 5, 8);
  pix_sort(p, 7, 10);
  (p[7] + p[8]) * 0.5
}

pub fn opt_med25(p: &mut [f64]) -> f64 {
  pix_sort(p, 0, 1);
  pix_sort(p, 3, 4);
  pix_sort(p, 2, 4);
  pix_sort(p, 2, 3);
  pix_sort(p, 6, 7);
  pix_sort(p, 5, 7);
  pix_sort(p, 5, 6);
  pix_sort(p, 9, 10);
  pix_sort(p, 8, 10);
  pix_sort(p, 8, 9);
  pix_sort(p, 12, 13);
  pix_sort(p, 11, 13);
  pix_sort(p, 11, 12);
  pix_sort(p, 15, 16);
  pix_sort(p, 14, 16);
  pix_sort(p, 14, 15);
  pix_sort(p, 18, 19);
  pix_sort(p, 17, 19);
  pix_sort(p, 17, 18);
  pix_sort(p, 21, 22);
  pix_sort(p, 20, 22);
  pix_sort(p, 20, 21);
  pix_sort(p, 23, 24);
  pix_sort(p, 2, 5);
  pix_sort(p, 3, 6);
  pix_sort(p, 0, 6);
  pix_sort(p, 0, 3);
  pix_sort(p, 4, 7);
  pix_sort(p, 1, 7);
  pix_sort(p, 1, 4);
  pix_sort(p, 11, 14);
  pix_sort(p, 8, 14);
  pix_sort(p, 8, 11);
  pix_sort(p, 12, 15);
  pix_sort(p, 9, 15);
  pix_sort(p, 9, 12);
  pix_sort(p, 13, 16);
  pix_sort(p, 10, 16);
  pix_sort(p, 10, 13);
  pix_sort(p, 20, 23);
  pix_sort(p, 17, 23);
  pix_sort(p, 17, 20);
  pix_sort(p, 21, 24);
  pix_sort(p, 18, 24);
  pix_sort(p, 18, 21);
  pix_sort(p, 19, 22);
  pix_sort(p, 8, 17);
  pix_sort(p, 9, 18);
  pix_sort(p, 0, 18);
  pix_sort(p, 0, 9);
  pix_sort(p, 10, 19);
  pix_sort(p, 1, 19);
  pix_sort(p, 1, 10);
  pix_sort(p, 11, 20);
  pix_sort(p, 2, 20);
  pix_sort(p, 2, 11);
  pix_sort(p, 12, 21);
  pix_sort(p, 3, 21);
  pix_sort(p, 3, 12);
  pix_sort(p, 13, 22);
  pix_sort(p, 4, 22);
  pix_sort(p, 4, 13);
  pix_sort(p, 14, 23);
  pix_sort(p, 5, 23);
  pix_sort(p, 5, 14);
  pix_sort(p, 15, 24);
  pix_sort(p, 6, 24);
  pix_sort(p, 6, 15);
  pix_sort(p, 7, 16);
  pix_sort(p, 7, 19);
  pix_sort(p, 13, 21);
  pix_sort(p, 15, 23);
  pix_sort(p, 7, 13);
  pix_sort(p, 7, 15);
  pix_sort(p, 1, 9);
  pix_sort(p, 3, 11);
  pix_sort(p, 5, 17);
  pix_sort(p, 11, 17);
  pix_sort(p, 9, 17);
  pix_sort(p, 4, 10);
  pix_sort(p, 6, 12);
  pix_sort(p, 7, 14);
  pix_sort(p, 4, 6);
  pix_sort(p, 4, 7);
  pix_sort(p, 12, 14);
  pix_sort(p, 10, 14);
  pix_sort(p, 6, 7);
  pix_sort(p, 10, 12);
  pix_sort(p, 6, 10);
  pix_sort(p, 6, 17);
  pix_sort(p, 12, 17);
  pix_sort(p, 7, 17);
  pix_sort(p, 7, 10);
  pix_sort(p, 12, 18);
  pix_sort(p, 7, 12);
  pix_sort(p, 10, 18);
  pix_sort(p, 12, 20);
  pix_sort(p, 10, 20);
  pix_sort(p, 10, 12);
  p[12]
}

// Median-of-three quickselect on a scratch copy; xs is left untouched.
pub fn quick_select(xs: &[f64], n: usize) -> f64 {
  debug_assert!(n > 0 && n <= xs.len());
  let mut arr: Vec<f64> = xs[..n].to_vec();
  let median = (n - 1) / 2;
  let mut low = 0i64;
  let mut high = (n - 1) as i64;
  loop {
    if high <= low {
      break;
    }
    if high == low + 1 {
      let (l, h) = (low as usize, high as usize);
      if arr[l] > arr[h] {
        arr.swap(l, h);
      }
      break;
    }
    let middle = (low + high) / 2;
    let (lo, mi, hi) = (low as usize, middle as usize, high as usize);
    if arr[mi] > arr[hi] {
      arr.swap(mi, hi);
    }
    if arr[lo] > arr[hi] {
      arr.swap(lo, hi);
    }
    if arr[mi] > arr[lo] {
      arr.swap(mi, lo);
    }
    arr.swap(mi, lo + 1);
    let mut ll = lo + 1;
    let mut hh = hi;
    loop {
      loop {
        ll += 1;
        if arr[lo] <= arr[ll] {
          break;
        }
      }
      loop {
        hh -= 1;
        if arr[hh] <= arr[lo] {
          break;
        }
      }
      if hh < ll {
        break;
      }
      arr.swap(ll, hh);
    }
    arr.swap(lo, hh);
    if hh as i64 <= median as i64 {
      low = ll as i64;
    }
    if hh as i64 >= median as i64 {
      high = hh as i64 - 1;
    }
  }
  arr[median]
}

// Dispatches to the fastest exact network available, falling back to
// quickselect for sizes the networks don't cover.
pub fn calc_median(xs: &[f64]) -> f64 {
  let n = xs.len();
  debug_assert!(n > 0);
  if n == 1 {
    return xs[0];
  }
  let mut buf: Vec<f64>;
  let fun: fn(&mut [f64]) -> f64 = match n {
    2 => opt_med2,
    3 => opt_med3,
    4 => opt_med4,
    5 => opt_med5,
    6 => opt_med6,
    7 => opt_med7,
    8 => opt_med8,
    9 => opt_med9,
    16 => opt_med16,
    25 => opt_med25,
    _ => return quick_select(xs, n),
  };
  buf = xs.to_vec();
  fun(&mut buf)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn med5_matches_sorted_middle() {
    let mut p = [9.0, 1.0, 7.0, 3.0, 5.0];
    assert_eq!(opt_med5(&mut p), 5.0);
  }

  #[test]
  fn med3_basic() {
    let mut p = [3.0, 1.0, 2.0];
    assert_eq!(opt_med3(&mut p), 2.0);
  }

  #[test]
  fn med9_matches_quickselect() {
    let data = [5.0, 3.0, 8.0, 1.0, 9.0, 2.0, 7.0, 4.0, 6.0];
    let mut buf = data;
    let via_network = opt_med9(&mut buf);
    let via_quickselect = quick_select(&data, data.len());
    assert_eq!(via_network, via_quickselect);
  }

  #[test]
  fn calc_median_dispatches_by_size() {
    let data: Vec<f64> = (0..25).map(|i| (24 - i) as f64).collect();
    assert_eq!(calc_median(&data), 12.0);
  }

  #[test]
  fn quick_select_is_order_preserving_under_permutation() {
    let data = [4.0, 1.0, 3.0, 5.0, 2.0, 6.0, 0.0];
    assert_eq!(quick_select(&data, data.len()), 3.0);
  }
}
