// Median and adaptive-median filtering over a square window, ported from
// get_median/get_adaptive_median/get_adp_median_cross in
// examples/original_source/median.c.
//
// Out-of-frame neighbours are handled by clamping the coordinate into
// range rather than the original's per-direction duplicate/diagonal-copy
// cases, so border pixels go through the same lookup path as interior
// ones.

use crate::error::Result;
use crate::frame::Frame;
use crate::median::{opt_med25, opt_med5};
use crate::running_median::RunningMedian;

const LARGEST_ADPMED_RADIUS: usize = 3;
const EPSILON: f64 = f64::EPSILON;

#[inline]
fn clamp_coord(v: i64, len: usize) -> usize {
  v.clamp(0, len as i64 - 1) as usize
}

fn cross_samples(frame: &Frame, row: usize, col: usize) -> [f64; 5] {
  let h = frame.height();
  let w = frame.width();
  let data = frame.data();
  let at = |dr: i64, dc: i64| {
    let r = clamp_coord(row as i64 + dr, h);
    let c = clamp_coord(col as i64 + dc, w);
    data.get(r, c)
  };
  [at(0, -1), at(0, 0), at(0, 1), at(-1, 0), at(1, 0)]
}

fn block_5x5(frame: &Frame, row: usize, col: usize) -> [f64; 25] {
  let h = frame.height();
  let w = frame.width();
  let data = frame.data();
  let mut buf = [0.0f64; 25];
  let mut k = 0;
  for dr in -2i64..=2 {
    let r = clamp_coord(row as i64 + dr, h);
    for dc in -2i64..=2 {
      let c = clamp_coord(col as i64 + dc, w);
      buf[k] = data.get(r, c);
      k += 1;
    }
  }
  buf
}

fn cross_median(frame: &mut Frame, adaptive: bool) {
  let (h, w) = (frame.height(), frame.width());
  let src = frame.clone();
  for row in 0..h {
    for col in 0..w {
      let mut buf = cross_samples(&src, row, col);
      let md = opt_med5(&mut buf);
      let out = if !adaptive {
        md
      } else {
        let lo = buf.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = buf.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let ival = src.data().get(row, col);
        if lo + EPSILON < md && md < hi - EPSILON {
          if lo < ival && ival < hi {
            ival
          } else {
            md
          }
        } else {
          block_5x5_median(&src, row, col)
        }
      };
      frame.data_mut()[row][col] = out;
    }
  }
}

fn block_5x5_median(frame: &Frame, row: usize, col: usize) -> f64 {
  let mut buf = block_5x5(frame, row, col);
  opt_med25(&mut buf)
}

// Sweeps a square window of side 2*radius+1 column-major, one running
// median per column. radius == 0 takes the cross fast path instead.
// Border pixels within radius of an edge are left unfiltered.
fn windowed_filter(frame: &Frame, radius: usize, adaptive: bool) -> Frame {
  let (h, w) = (frame.height(), frame.width());
  let mut out = frame.clone();
  if radius == 0 {
    cross_median(&mut out, adaptive);
    return out;
  }
  if 2 * radius + 1 > h.min(w) {
    return out;
  }
  let side = 2 * radius + 1;
  let window = side * side;
  for col in radius..w - radius {
    let mut rm = RunningMedian::new(window);
    for row in 0..side - 1 {
      for c in col - radius..=col + radius {
        rm.insert(frame.data().get(row, c));
      }
    }
    for row in radius..h - radius {
      let new_row = row + radius;
      for c in col - radius..=col + radius {
        rm.insert(frame.data().get(new_row, c));
      }
      if !adaptive {
        out.data_mut()[row][col] = rm.median();
        continue;
      }
      let (md, lo, hi) = rm.stat();
      let lo_eps = lo + EPSILON;
      let hi_eps = hi - EPSILON;
      let ival = frame.data().get(row, col);
      let value = if lo_eps < md && md < hi_eps {
        if lo < ival && ival < hi {
          ival
        } else {
          md
        }
      } else if radius > LARGEST_ADPMED_RADIUS {
        ival
      } else {
        block_5x5_median(frame, row, col)
      };
      out.data_mut()[row][col] = value;
    }
  }
  out
}

// radius == 0 is the 3x3 cross fast path, larger radii use a
// (2*radius+1)^2 square window.
pub fn median_filter(frame: &Frame, radius: usize) -> Result<Frame> {
  Ok(windowed_filter(frame, radius, false))
}

// Keeps the source pixel when it already lies strictly within the
// window's range, else falls back to a clamped 5x5 sorted window when
// the local window is degenerate and the radius is small enough.
pub fn adaptive_median_filter(frame: &Frame, radius: usize) -> Result<Frame> {
  Ok(windowed_filter(frame, radius, true))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::PixelType;

  fn frame_from(rows: &[&[f64]]) -> Frame {
    let h = rows.len();
    let w = rows[0].len();
    let pixels: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    Frame::from_pixels(w, h, PixelType::Double, pixels, Vec::new()).unwrap()
  }

  #[test]
  fn cross_median_smooths_a_spike() {
    let frame = frame_from(&[&[1.0, 1.0, 1.0], &[1.0, 100.0, 1.0], &[1.0, 1.0, 1.0]]);
    let out = median_filter(&frame, 0).unwrap();
    assert_eq!(out.data().get(1, 1), 1.0);
  }

  #[test]
  fn general_window_leaves_border_untouched() {
    let frame = frame_from(&[
      &[1.0, 2.0, 3.0, 4.0, 5.0],
      &[2.0, 3.0, 4.0, 5.0, 6.0],
      &[3.0, 4.0, 5.0, 6.0, 7.0],
      &[4.0, 5.0, 6.0, 7.0, 8.0],
      &[5.0, 6.0, 7.0, 8.0, 9.0],
    ]);
    let out = median_filter(&frame, 1).unwrap();
    assert_eq!(out.data().get(0, 0), frame.data().get(0, 0));
    assert_eq!(out.data().get(4, 4), frame.data().get(4, 4));
  }

  #[test]
  fn adaptive_filter_preserves_sharp_edge_pixel_inside_range() {
    let frame = frame_from(&[
      &[0.0, 0.0, 0.0, 10.0, 10.0],
      &[0.0, 0.0, 0.0, 10.0, 10.0],
      &[0.0, 0.0, 5.0, 10.0, 10.0],
      &[0.0, 0.0, 0.0, 10.0, 10.0],
      &[0.0, 0.0, 0.0, 10.0, 10.0],
    ]);
    let out = adaptive_median_filter(&frame, 1).unwrap();
    // (2,2) lies strictly between the window's min (0) and max (10), so
    // the adaptive rule keeps the original sample rather than the median.
    assert_eq!(out.data().get(2, 2), 5.0);
  }
}
