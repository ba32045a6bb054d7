// Connected-component labelling over a packed bitmap. Ported from
// cclabel4/cclabel8 in examples/original_source/binmorph.c. The original
// runs a separate union-find over cclabling.h's template; this inlines a
// plain quick union since the label counts involved are small.

use std::collections::HashMap;

use crate::array2d::Array2D;
use crate::error::{Error, Result};
use crate::packed::PackedBitmap;

fn find(parent: &mut [u32], x: u32) -> u32 {
  let mut root = x;
  while parent[root as usize] != root {
    root = parent[root as usize];
  }
  let mut cur = x;
  while parent[cur as usize] != root {
    let next = parent[cur as usize];
    parent[cur as usize] = root;
    cur = next;
  }
  root
}

fn union(parent: &mut Vec<u32>, a: u32, b: u32) {
  let (ra, rb) = (find(parent, a), find(parent, b));
  if ra != rb {
    let (hi, lo) = if ra > rb { (ra, rb) } else { (rb, ra) };
    parent[hi as usize] = lo;
  }
}

fn compact_labels(raw: &Array2D<u32>, parent: &mut [u32]) -> Result<(Array2D<u16>, u32)> {
  let (h, w) = (raw.rows(), raw.cols());
  let mut rep_to_compact: HashMap<u32, u32> = HashMap::new();
  let mut next_id = 1u32;
  let mut out = Array2D::<u16>::zeroed(h, w);
  for row in 0..h {
    for col in 0..w {
      let label = raw.get(row, col);
      if label == 0 {
        continue;
      }
      let root = find(parent, label);
      let compact = *rep_to_compact.entry(root).or_insert_with(|| {
        let id = next_id;
        next_id += 1;
        id
      });
      if compact > u16::MAX as u32 {
        return Err(Error::LabelOverflow);
      }
      out[row][col] = compact as u16;
    }
  }
  Ok((out, next_id - 1))
}

// Scanline pass looking back only at North and West; equivalences are
// tracked via union-find and resolved in a second compacting pass.
pub fn label_4connected(bmp: &PackedBitmap) -> Result<(Array2D<u16>, u32)> {
  let (h, w) = (bmp.height(), bmp.width());
  let mut raw = Array2D::<u32>::zeroed(h, w);
  let mut parent: Vec<u32> = vec![0];
  for row in 0..h {
    for col in 0..w {
      if !bmp.get(row, col) {
        continue;
      }
      let north = if row > 0 { raw.get(row - 1, col) } else { 0 };
      let west = if col > 0 { raw.get(row, col - 1) } else { 0 };
      let label = match (north, west) {
        (0, 0) => {
          let new_label = parent.len() as u32;
          parent.push(new_label);
          new_label
        }
        (n, 0) => n,
        (0, wv) => wv,
        (n, wv) => {
          if n != wv {
            union(&mut parent, n, wv);
          }
          n.min(wv)
        }
      };
      raw[row][col] = label;
    }
  }
  compact_labels(&raw, &mut parent)
}

// Re-sweeps a 4-connected label grid, merging NW/NE diagonal neighbours'
// classes into the current pixel's, then relabels compactly.
pub fn label_8connected(bmp: &PackedBitmap) -> Result<(Array2D<u16>, u32)> {
  let (labels4, n4) = label_4connected(bmp)?;
  let (h, w) = (bmp.height(), bmp.width());
  let mut parent: Vec<u32> = (0..=n4).collect();
  let mut raw = Array2D::<u32>::zeroed(h, w);
  for row in 0..h {
    for col in 0..w {
      raw[row][col] = labels4.get(row, col) as u32;
    }
  }
  for row in 0..h {
    for col in 0..w {
      let label = raw.get(row, col);
      if label == 0 {
        continue;
      }
      if row > 0 && col > 0 {
        let nw = raw.get(row - 1, col - 1);
        if nw != 0 {
          union(&mut parent, label, nw);
        }
      }
      if row > 0 && col + 1 < w {
        let ne = raw.get(row - 1, col + 1);
        if ne != 0 {
          union(&mut parent, label, ne);
        }
      }
    }
  }
  compact_labels(&raw, &mut parent)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::packed::pack;

  #[test]
  fn two_separate_blobs_get_two_labels_4connected() {
    let mut grid = Array2D::<u16>::zeroed(6, 6);
    for r in 0..2 {
      for c in 0..2 {
        grid[r][c] = 1;
      }
    }
    for r in 4..6 {
      for c in 4..6 {
        grid[r][c] = 1;
      }
    }
    let bmp = pack(&grid);
    let (labels, n) = label_4connected(&bmp).unwrap();
    assert_eq!(n, 2);
    assert_eq!(labels.get(0, 0), labels.get(1, 1));
    assert_ne!(labels.get(0, 0), labels.get(4, 4));
  }

  #[test]
  fn diagonal_blobs_merge_only_under_8connectivity() {
    let mut grid = Array2D::<u16>::zeroed(4, 4);
    grid[0][0] = 1;
    grid[1][1] = 1;
    let bmp = pack(&grid);
    let (labels4, n4) = label_4connected(&bmp).unwrap();
    assert_eq!(n4, 2);
    assert_ne!(labels4.get(0, 0), labels4.get(1, 1));

    let (labels8, n8) = label_8connected(&bmp).unwrap();
    assert_eq!(n8, 1);
    assert_eq!(labels8.get(0, 0), labels8.get(1, 1));
  }

  #[test]
  fn u_shaped_blob_is_a_single_component() {
    let mut grid = Array2D::<u16>::zeroed(3, 3);
    grid[0][0] = 1;
    grid[1][0] = 1;
    grid[2][0] = 1;
    grid[2][1] = 1;
    grid[2][2] = 1;
    grid[1][2] = 1;
    grid[0][2] = 1;
    let bmp = pack(&grid);
    let (_labels, n) = label_4connected(&bmp).unwrap();
    assert_eq!(n, 1);
  }
}
