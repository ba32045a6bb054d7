use crate::array2d::Array2D;
use crate::error::{Error, Result};
use crate::median::quick_select;

// Declared on-disk storage type; in-core pixel data is always f64.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelType {
  Byte,
  Short,
  Long,
  LongLong,
  Float,
  Double,
}

// One free-form text header record, logically an 80-character card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderRecord(String);

const CARD_LEN: usize = 80;

impl HeaderRecord {
  pub fn new(text: impl Into<String>) -> Self {
    let mut text = text.into();
    if text.len() > CARD_LEN {
      text.truncate(CARD_LEN);
    } else {
      while text.len() < CARD_LEN {
        text.push(' ');
      }
    }
    Self(text)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  // Everything before the first '=', trimmed, capped at 8 characters.
  pub fn key(&self) -> &str {
    let head = match self.0.find('=') {
      Some(idx) => &self.0[..idx],
      None => &self.0,
    };
    let head = head.trim_end();
    if head.len() > 8 {
      &head[..8]
    } else {
      head
    }
  }

  pub fn contains(&self, needle: &str) -> bool {
    self.0.trim_end().contains(needle)
  }
}

// Structural keys are re-derived from the Frame itself on write and never
// travel as free-form header records.
pub fn is_structural_key(key: &str) -> bool {
  matches!(key, "SIMPLE" | "EXTEND" | "BITPIX") || key.starts_with("NAXIS")
}

#[derive(Clone, Debug)]
pub struct Column {
  pub name: String,
  pub unit: String,
  pub elem_type: i32,
  pub elem_width: i64,
  pub repeat: i64,
  pub contents: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct Table {
  pub name: String,
  pub columns: Vec<Column>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameStats {
  pub min: f64,
  pub max: f64,
  pub mean: f64,
  pub std: f64,
  pub median: f64,
}

#[derive(Clone, Debug)]
pub struct Frame {
  dtype: PixelType,
  data: Array2D<f64>,
  headers: Vec<HeaderRecord>,
  tables: Vec<Table>,
}

impl Frame {
  pub fn new(width: usize, height: usize, dtype: PixelType) -> Self {
    Self {
      dtype,
      data: Array2D::zeroed(height, width),
      headers: Vec::new(),
      tables: Vec::new(),
    }
  }

  // Structural keys present in `headers` are dropped silently; they are
  // re-derived from width/height/dtype rather than carried as free text.
  pub fn from_pixels(
    width: usize,
    height: usize,
    dtype: PixelType,
    pixels: Vec<f64>,
    headers: Vec<HeaderRecord>,
  ) -> Result<Self> {
    if pixels.len() != width.checked_mul(height).unwrap_or(usize::MAX) {
      return Err(Error::Usage(format!(
        "pixel buffer length {} does not match {}x{}",
        pixels.len(),
        width,
        height
      )));
    }
    let headers = headers.into_iter().filter(|h| !is_structural_key(h.key())).collect();
    Ok(Self { dtype, data: Array2D::from_vec(height, width, pixels), headers, tables: Vec::new() })
  }

  pub fn width(&self) -> usize {
    self.data.cols()
  }

  pub fn height(&self) -> usize {
    self.data.rows()
  }

  pub fn dtype(&self) -> PixelType {
    self.dtype
  }

  pub fn set_dtype(&mut self, dtype: PixelType) {
    self.dtype = dtype;
  }

  pub fn data(&self) -> &Array2D<f64> {
    &self.data
  }

  pub fn data_mut(&mut self) -> &mut Array2D<f64> {
    &mut self.data
  }

  pub fn pixels(&self) -> &[f64] {
    self.data.as_slice()
  }

  pub fn headers(&self) -> &[HeaderRecord] {
    &self.headers
  }

  pub fn set_headers(&mut self, headers: Vec<HeaderRecord>) {
    self.headers = headers;
  }

  pub fn tables(&self) -> &[Table] {
    &self.tables
  }

  pub fn tables_mut(&mut self) -> &mut Vec<Table> {
    &mut self.tables
  }

  pub fn push_header(&mut self, record: HeaderRecord) {
    if !is_structural_key(record.key()) {
      self.headers.push(record);
    }
  }

  pub fn push_comment(&mut self, text: impl AsRef<str>) {
    self.push_header(HeaderRecord::new(format!("COMMENT {}", text.as_ref())));
  }

  pub fn push_history(&mut self, text: impl AsRef<str>) {
    self.push_header(HeaderRecord::new(format!("HISTORY {}", text.as_ref())));
  }

  pub fn find_header(&self, key: &str) -> Option<&HeaderRecord> {
    self.headers.iter().find(|h| h.key() == key)
  }

  pub fn modify_key(&mut self, key: &str, newval: &str) {
    if let Some(pos) = self.headers.iter().position(|h| h.key() == key) {
      self.headers[pos] = HeaderRecord::new(format!("{:<8}= {}", key, newval));
    } else {
      self.headers.push(HeaderRecord::new(format!("{:<8}= {}", key, newval)));
    }
  }

  pub fn remove_key(&mut self, key: &str) {
    self.headers.retain(|h| h.key() != key);
  }

  pub fn remove_records_containing(&mut self, needle: &str) {
    self.headers.retain(|h| !h.contains(needle));
  }

  pub fn require_min_shape(&self, minimum: usize) -> Result<()> {
    if self.width() < minimum || self.height() < minimum {
      return Err(Error::Shape { width: self.width(), height: self.height(), minimum });
    }
    Ok(())
  }

  // Single-sweep min/max/mean/std plus a quickselect median.
  pub fn stats(&self) -> FrameStats {
    let px = self.pixels();
    debug_assert!(!px.is_empty());
    let mut min = px[0];
    let mut max = px[0];
    let mut sum = 0.0f64;
    let mut sum2 = 0.0f64;
    for &v in px {
      if v > max {
        max = v;
      } else if v < min {
        min = v;
      }
      sum += v;
      sum2 += v * v;
    }
    let n = px.len() as f64;
    let mean = sum / n;
    let std = (sum2 / n - mean * mean).max(0.0).sqrt();
    let median = quick_select(px, px.len());
    FrameStats { min, max, mean, std, median }
  }
}
