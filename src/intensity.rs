// Point intensity operators: binarisation, bound clamping, posterisation.
// Ported from binarize/cut_bounds/StepFilter in
// examples/original_source/linfilter.c.

use crate::array2d::Array2D;
use crate::error::{Error, Result};
use crate::frame::{Frame, PixelType};

const EPSILON: f64 = f64::EPSILON;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleLaw {
  Uniform,
  Log,
  Exp,
  Sqrt,
  Pow,
}

impl ScaleLaw {
  pub fn name(&self) -> &'static str {
    match self {
      ScaleLaw::Uniform => "uniform",
      ScaleLaw::Log => "log",
      ScaleLaw::Exp => "exp",
      ScaleLaw::Sqrt => "sqrt",
      ScaleLaw::Pow => "pow",
    }
  }

  pub fn parse(name: &str) -> Option<Self> {
    match name {
      "uniform" => Some(ScaleLaw::Uniform),
      "log" => Some(ScaleLaw::Log),
      "exp" => Some(ScaleLaw::Exp),
      "sqrt" => Some(ScaleLaw::Sqrt),
      "pow" => Some(ScaleLaw::Pow),
      _ => None,
    }
  }
}

// Single source of truth for each law's step constant, so posterize and
// posterize_level_bounds stay exact inverses. The original used different
// step formulas for the sqrt law in StepFilter vs. fillIsoScale; this
// picks one (see DESIGN.md).
fn step_for_scale(law: ScaleLaw, nsteps: u32, wd: f64) -> f64 {
  let n = nsteps as f64;
  match law {
    ScaleLaw::Uniform => wd / n,
    ScaleLaw::Log => wd / (n + 1.0).ln(),
    ScaleLaw::Exp => (wd + 1.0).ln() / n,
    ScaleLaw::Sqrt => wd * wd / n,
    ScaleLaw::Pow => wd / (n * n),
  }
}

pub fn posterize(img: &Frame, nsteps: u32, law: ScaleLaw) -> Result<Frame> {
  if !(2..=255).contains(&nsteps) {
    return Err(Error::ParameterRange {
      stage: "step".into(),
      key: "nsteps".into(),
      detail: format!("{nsteps} not in [2, 255]"),
    });
  }
  let stats = img.stats();
  let (min, max) = (stats.min, stats.max);
  let wd = max - min;
  if wd.abs() < EPSILON {
    return Err(Error::Usage("posterize: frame has effectively zero dynamic range".into()));
  }
  let step = step_for_scale(law, nsteps, wd);
  let top = (nsteps - 1) as f64;
  let forward = |p: f64| -> f64 {
    let level = match law {
      ScaleLaw::Uniform => ((p - min) / step).floor(),
      ScaleLaw::Log => (((p - min) / step).exp() - 1.0).floor(),
      ScaleLaw::Exp => ((p - min + 1.0).ln() / step).floor(),
      ScaleLaw::Sqrt => ((p - min) * (p - min) / step).floor(),
      ScaleLaw::Pow => (((p - min) / step).sqrt()).floor(),
    };
    // the maximum pixel must land in the last bucket, not one past it
    level.min(top)
  };
  let (h, w) = (img.height(), img.width());
  let mut out = Frame::new(w, h, PixelType::Byte);
  for row in 0..h {
    for col in 0..w {
      out.data_mut()[row][col] = forward(img.data().get(row, col));
    }
  }
  out.modify_key("BZERO", "0");
  out.modify_key("BSCALE", "1");
  out.modify_key("DATAMIN", "0");
  out.modify_key("DATAMAX", &nsteps.to_string());
  out.push_history(format!("step filter with {nsteps} levels ({} distribution)", law.name()));
  Ok(out)
}

// Lower intensity edge of level (1..=nsteps), the algebraic inverse of
// posterize's forward mapping for the same min/wd/step.
pub fn posterize_level_bounds(nsteps: u32, law: ScaleLaw, min: f64, wd: f64) -> Vec<f64> {
  let step = step_for_scale(law, nsteps, wd);
  (1..=nsteps)
    .map(|k| {
      let k = k as f64;
      match law {
        ScaleLaw::Uniform => min + step * k,
        ScaleLaw::Log => min + step * (k + 1.0).ln(),
        ScaleLaw::Exp => min - 1.0 + (step * k).exp(),
        ScaleLaw::Sqrt => min + (step * k).sqrt(),
        ScaleLaw::Pow => min + step * k * k,
      }
    })
    .collect()
}

// In-place clamp. Either bound may be None (+/- infinity).
pub fn cut_bounds(img: &mut Frame, low: Option<f64>, up: Option<f64>) {
  if low.is_none() && up.is_none() {
    return;
  }
  let (h, w) = (img.height(), img.width());
  for row in 0..h {
    for col in 0..w {
      let v = img.data().get(row, col);
      let clamped = match (low, up) {
        (Some(lo), Some(hi)) => v.clamp(lo, hi),
        (Some(lo), None) => v.max(lo),
        (None, Some(hi)) => v.min(hi),
        (None, None) => v,
      };
      img.data_mut()[row][col] = clamped;
    }
  }
  let comment = match (low, up) {
    (Some(lo), None) => format!("cut lower bound to value {lo}"),
    (None, Some(hi)) => format!("cut upper bound to value {hi}"),
    (Some(lo), Some(hi)) => format!("cut lower bound to {lo} & upper to {hi}"),
    (None, None) => unreachable!(),
  };
  img.push_comment(comment);
}

// threshold must lie in (-1, 1); negative inverts the result.
pub fn binarize(img: &Frame, threshold: f64) -> Result<(Array2D<u16>, f64)> {
  if threshold < -1.0 + EPSILON || threshold > 1.0 - EPSILON {
    return Err(Error::ParameterRange {
      stage: "binarize".into(),
      key: "threshold".into(),
      detail: format!("{threshold} not in (-1, 1)"),
    });
  }
  let invert = threshold < 0.0;
  let threshold = threshold.abs();
  let stats = img.stats();
  let thrval = stats.min + (stats.max - stats.min) * threshold;
  let (h, w) = (img.height(), img.width());
  let mut out = Array2D::<u16>::zeroed(h, w);
  for row in 0..h {
    for col in 0..w {
      let above = img.data().get(row, col) >= thrval;
      out[row][col] = (above != invert) as u16;
    }
  }
  Ok((out, thrval))
}

pub fn binarize_frame(img: &Frame, threshold: f64) -> Result<Frame> {
  let (grid, thrval) = binarize(img, threshold)?;
  let (h, w) = (img.height(), img.width());
  let pixels: Vec<f64> = grid.as_slice().iter().map(|&v| v as f64).collect();
  let mut out = Frame::from_pixels(w, h, PixelType::Short, pixels, Vec::new())?;
  out.push_comment(format!("binarize image by threshold value {thrval}"));
  out.push_comment(format!(
    "    ({}% from data range{})",
    (threshold.abs() * 100.0),
    if threshold < 0.0 { ", inverted" } else { "" }
  ));
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn uniform_frame() -> Frame {
    let pixels: Vec<f64> = (0..16).map(|v| v as f64).collect();
    Frame::from_pixels(4, 4, PixelType::Double, pixels, Vec::new()).unwrap()
  }

  #[test]
  fn posterize_uniform_example() {
    let frame = uniform_frame();
    let out = posterize(&frame, 4, ScaleLaw::Uniform).unwrap();
    // wd = 15, step = 15/4 = 3.75; pixel 0 -> 0, pixel 15 -> floor(4.0) clamped to 3
    assert_eq!(out.data().get(0, 0), 0.0);
    assert_eq!(out.data().get(3, 3), 3.0);
  }

  #[test]
  fn posterize_forward_and_inverse_are_consistent_sqrt() {
    let min = 0.0;
    let wd = 100.0;
    let nsteps = 10;
    let bounds = posterize_level_bounds(nsteps, ScaleLaw::Sqrt, min, wd);
    // Evaluate forward mapping exactly at a level's lower edge: must floor
    // back to that level (allowing for the floor's own half-open boundary).
    let step = step_for_scale(ScaleLaw::Sqrt, nsteps, wd);
    for (k, &edge) in bounds.iter().enumerate() {
      let level = (k + 1) as f64;
      let forward = (edge - min) * (edge - min) / step;
      assert!((forward - level).abs() < 1e-6);
    }
  }

  #[test]
  fn posterize_clamps_maximum_into_last_bucket() {
    let pixels = vec![0.0, 2.5, 5.0, 7.5, 10.0];
    let frame = Frame::from_pixels(5, 1, PixelType::Double, pixels, Vec::new()).unwrap();
    let out = posterize(&frame, 4, ScaleLaw::Uniform).unwrap();
    let levels: Vec<f64> = (0..5).map(|c| out.data().get(0, c)).collect();
    assert_eq!(levels, vec![0.0, 1.0, 2.0, 3.0, 3.0]);
  }

  #[test]
  fn binarize_rejects_out_of_range_threshold() {
    let frame = uniform_frame();
    assert!(binarize(&frame, 1.0).is_err());
  }

  #[test]
  fn cut_bounds_clamps_both_sides() {
    let mut frame = uniform_frame();
    cut_bounds(&mut frame, Some(2.0), Some(10.0));
    assert_eq!(frame.data().get(0, 0), 2.0);
    assert_eq!(frame.data().get(3, 3), 10.0);
    assert_eq!(frame.headers().len(), 1);
  }
}
