// Declarative pipeline stage grammar and execution engine, ported from
// examples/original_source/pipeline.c (parce_filter, get_pipeline_params,
// process_pipeline).

use log::warn;

use crate::error::{Error, Result};
use crate::frame::{Frame, HeaderRecord};
use crate::intensity::{posterize, ScaleLaw};
use crate::median_filter::{adaptive_median_filter, median_filter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
  Median,
  AdpMed,
  LapGauss,
  Gauss,
  SobelH,
  SobelV,
  SimpleGrad,
  PrewittH,
  PrewittV,
  ScharrH,
  ScharrV,
  Step,
}

impl StageKind {
  fn name(&self) -> &'static str {
    match self {
      StageKind::Median => "median",
      StageKind::AdpMed => "adpmed",
      StageKind::LapGauss => "lapgauss",
      StageKind::Gauss => "gauss",
      StageKind::SobelH => "sobelh",
      StageKind::SobelV => "sobelv",
      StageKind::SimpleGrad => "simplegrad",
      StageKind::PrewittH => "prewitth",
      StageKind::PrewittV => "prewittv",
      StageKind::ScharrH => "scharrh",
      StageKind::ScharrV => "scharrv",
      StageKind::Step => "step",
    }
  }

  fn parse(name: &str) -> Option<Self> {
    match name.to_ascii_lowercase().as_str() {
      "median" => Some(StageKind::Median),
      "adpmed" => Some(StageKind::AdpMed),
      "lapgauss" => Some(StageKind::LapGauss),
      "gauss" => Some(StageKind::Gauss),
      "sobelh" => Some(StageKind::SobelH),
      "sobelv" => Some(StageKind::SobelV),
      "simplegrad" => Some(StageKind::SimpleGrad),
      "prewitth" => Some(StageKind::PrewittH),
      "prewittv" => Some(StageKind::PrewittV),
      "scharrh" => Some(StageKind::ScharrH),
      "scharrv" => Some(StageKind::ScharrV),
      "step" => Some(StageKind::Step),
      _ => None,
    }
  }

  fn recognised_keys(&self) -> &'static [&'static str] {
    match self {
      StageKind::Median | StageKind::AdpMed => &["r"],
      StageKind::LapGauss | StageKind::Gauss => &["sx", "sy", "w", "h"],
      StageKind::Step => &["nsteps", "scale"],
      _ => &[],
    }
  }
}

#[derive(Clone, Debug, Default)]
pub struct StageParams {
  pub r: Option<i64>,
  pub w: Option<i64>,
  pub h: Option<i64>,
  pub sx: Option<f64>,
  pub sy: Option<f64>,
  pub nsteps: Option<u32>,
  pub scale: Option<ScaleLaw>,
}

#[derive(Clone, Debug)]
pub struct Stage {
  pub kind: StageKind,
  pub params: StageParams,
}

const MIN_GAUSS_WINDOW: i64 = 5;

// Parses one stage descriptor (type=<name>[:key=value]*), validating
// every recognised parameter's range up front.
pub fn parse_stage(text: &str) -> Result<Stage> {
  let tokens: Vec<&str> = text.split([':', ',']).map(str::trim).filter(|t| !t.is_empty()).collect();
  if tokens.is_empty() {
    return Err(Error::Usage("empty stage descriptor".into()));
  }

  let mut type_name: Option<String> = None;
  let mut pairs: Vec<(String, String)> = Vec::new();
  for token in &tokens {
    match token.split_once('=') {
      Some((k, v)) => {
        let key = k.trim().to_ascii_lowercase();
        if key == "type" {
          type_name = Some(v.trim().to_string());
        } else {
          pairs.push((key, v.trim().to_string()));
        }
      }
      None => {
        if token.eq_ignore_ascii_case("help") {
          return Err(Error::Usage(format!("help requested for stage descriptor '{text}'")));
        }
        return Err(Error::Usage(format!("malformed stage token '{token}' (expected key=value)")));
      }
    }
  }

  let type_name = type_name.ok_or_else(|| Error::Usage("stage descriptor missing mandatory 'type' key".into()))?;
  let kind = StageKind::parse(&type_name).ok_or_else(|| Error::UnknownStageType(type_name.clone()))?;

  let allowed = kind.recognised_keys();
  let mut params = StageParams::default();
  for (key, value) in &pairs {
    if !allowed.contains(&key.as_str()) {
      return Err(Error::UnknownKey { stage: kind.name().into(), key: key.clone() });
    }
    match key.as_str() {
      "r" => params.r = Some(parse_int(kind, key, value)?),
      "w" => params.w = Some(parse_int(kind, key, value)?),
      "h" => params.h = Some(parse_int(kind, key, value)?),
      "sx" => params.sx = Some(parse_float(kind, key, value)?),
      "sy" => params.sy = Some(parse_float(kind, key, value)?),
      "nsteps" => params.nsteps = Some(parse_int(kind, key, value)? as u32),
      "scale" => {
        params.scale = Some(ScaleLaw::parse(&value.to_ascii_lowercase()).ok_or_else(|| Error::ParameterRange {
          stage: kind.name().into(),
          key: "scale".into(),
          detail: format!("unknown scale law '{value}'"),
        })?)
      }
      _ => unreachable!(),
    }
  }

  validate(kind, &mut params)?;
  Ok(Stage { kind, params })
}

fn parse_int(kind: StageKind, key: &str, value: &str) -> Result<i64> {
  value.parse::<i64>().map_err(|_| Error::ParameterRange {
    stage: kind.name().into(),
    key: key.into(),
    detail: format!("'{value}' is not an integer"),
  })
}

fn parse_float(kind: StageKind, key: &str, value: &str) -> Result<f64> {
  value.parse::<f64>().map_err(|_| Error::ParameterRange {
    stage: kind.name().into(),
    key: key.into(),
    detail: format!("'{value}' is not a number"),
  })
}

fn validate(kind: StageKind, params: &mut StageParams) -> Result<()> {
  match kind {
    StageKind::Median | StageKind::AdpMed => {
      let r = params.r.ok_or_else(|| Error::Usage(format!("stage '{}' requires key 'r'", kind.name())))?;
      if r < 0 {
        return Err(Error::ParameterRange { stage: kind.name().into(), key: "r".into(), detail: format!("{r} < 0") });
      }
    }
    StageKind::LapGauss | StageKind::Gauss => {
      let stage = kind.name();
      let w = params.w.ok_or_else(|| Error::Usage(format!("stage '{stage}' requires key 'w'")))?;
      let h = params.h.ok_or_else(|| Error::Usage(format!("stage '{stage}' requires key 'h'")))?;
      let sx = params.sx.ok_or_else(|| Error::Usage(format!("stage '{stage}' requires key 'sx'")))?;
      let sy = params.sy.ok_or_else(|| Error::Usage(format!("stage '{stage}' requires key 'sy'")))?;
      if sx < 1.0 {
        return Err(Error::ParameterRange { stage: stage.into(), key: "sx".into(), detail: format!("{sx} < 1") });
      }
      if sy < 1.0 {
        return Err(Error::ParameterRange { stage: stage.into(), key: "sy".into(), detail: format!("{sy} < 1") });
      }
      if w < MIN_GAUSS_WINDOW {
        warn!("stage '{stage}': window width {w} raised to {MIN_GAUSS_WINDOW}");
        params.w = Some(MIN_GAUSS_WINDOW);
      }
      if h < MIN_GAUSS_WINDOW {
        warn!("stage '{stage}': window height {h} raised to {MIN_GAUSS_WINDOW}");
        params.h = Some(MIN_GAUSS_WINDOW);
      }
    }
    StageKind::Step => {
      let nsteps = params.nsteps.ok_or_else(|| Error::Usage("stage 'step' requires key 'nsteps'".into()))?;
      if !(2..=255).contains(&nsteps) {
        return Err(Error::ParameterRange {
          stage: "step".into(),
          key: "nsteps".into(),
          detail: format!("{nsteps} not in [2, 255]"),
        });
      }
      if params.scale.is_none() {
        return Err(Error::Usage("stage 'step' requires key 'scale'".into()));
      }
    }
    _ => {}
  }
  Ok(())
}

// The convolutional stage families are external collaborators: this
// crate validates and forwards their parameters but does not implement
// an FFT backend. Callers supply one via this trait.
pub trait ConvolutionBackend {
  fn gauss(&self, frame: &Frame, sx: f64, sy: f64, w: i64, h: i64) -> Result<Frame>;
  fn lapgauss(&self, frame: &Frame, sx: f64, sy: f64, w: i64, h: i64) -> Result<Frame>;
  fn sobelh(&self, frame: &Frame) -> Result<Frame>;
  fn sobelv(&self, frame: &Frame) -> Result<Frame>;
  fn prewitth(&self, frame: &Frame) -> Result<Frame>;
  fn prewittv(&self, frame: &Frame) -> Result<Frame>;
  fn scharrh(&self, frame: &Frame) -> Result<Frame>;
  fn scharrv(&self, frame: &Frame) -> Result<Frame>;
  fn simplegrad(&self, frame: &Frame) -> Result<Frame>;
}

// Rejects every convolutional stage; exercises the engine and the core
// stage set without pulling in an FFT dependency.
pub struct UnimplementedBackend;

impl ConvolutionBackend for UnimplementedBackend {
  fn gauss(&self, _: &Frame, _: f64, _: f64, _: i64, _: i64) -> Result<Frame> {
    Err(Error::Usage("stage 'gauss' requires an external convolution backend".into()))
  }
  fn lapgauss(&self, _: &Frame, _: f64, _: f64, _: i64, _: i64) -> Result<Frame> {
    Err(Error::Usage("stage 'lapgauss' requires an external convolution backend".into()))
  }
  fn sobelh(&self, _: &Frame) -> Result<Frame> {
    Err(Error::Usage("stage 'sobelh' requires an external convolution backend".into()))
  }
  fn sobelv(&self, _: &Frame) -> Result<Frame> {
    Err(Error::Usage("stage 'sobelv' requires an external convolution backend".into()))
  }
  fn prewitth(&self, _: &Frame) -> Result<Frame> {
    Err(Error::Usage("stage 'prewitth' requires an external convolution backend".into()))
  }
  fn prewittv(&self, _: &Frame) -> Result<Frame> {
    Err(Error::Usage("stage 'prewittv' requires an external convolution backend".into()))
  }
  fn scharrh(&self, _: &Frame) -> Result<Frame> {
    Err(Error::Usage("stage 'scharrh' requires an external convolution backend".into()))
  }
  fn scharrv(&self, _: &Frame) -> Result<Frame> {
    Err(Error::Usage("stage 'scharrv' requires an external convolution backend".into()))
  }
  fn simplegrad(&self, _: &Frame) -> Result<Frame> {
    Err(Error::Usage("stage 'simplegrad' requires an external convolution backend".into()))
  }
}

// Runs an ordered list of stages over a frame. The input is cloned once
// into a working frame and never mutated.
pub struct PipelineEngine<'a> {
  backend: &'a dyn ConvolutionBackend,
}

impl<'a> PipelineEngine<'a> {
  pub fn new(backend: &'a dyn ConvolutionBackend) -> Self {
    Self { backend }
  }

  pub fn run(&self, input: &Frame, stages: &[Stage]) -> Result<Frame> {
    let mut working = input.clone();
    for (index, stage) in stages.iter().enumerate() {
      let base = working.headers().to_vec();
      let mut produced = self.run_stage(&working, stage).map_err(|source| Error::Stage {
        index,
        kind: stage.kind.name().into(),
        source: Box::new(source),
      })?;
      // a stage either clones `working` wholesale (its headers already
      // equal `base`) or builds a fresh frame and appends its own audit
      // records on top of nothing; either way, only the records beyond
      // `base` are new, so carrying `base` forward never duplicates it.
      let new_headers: Vec<HeaderRecord> = if produced.headers().starts_with(&base) {
        produced.headers()[base.len()..].to_vec()
      } else {
        produced.headers().to_vec()
      };
      produced.set_headers(base.into_iter().chain(new_headers).collect());
      working = produced;
    }
    Ok(working)
  }

  fn run_stage(&self, frame: &Frame, stage: &Stage) -> Result<Frame> {
    let p = &stage.params;
    match stage.kind {
      StageKind::Median => median_filter(frame, p.r.unwrap_or(0) as usize),
      StageKind::AdpMed => adaptive_median_filter(frame, p.r.unwrap_or(0) as usize),
      StageKind::LapGauss => self.backend.lapgauss(frame, p.sx.unwrap(), p.sy.unwrap(), p.w.unwrap(), p.h.unwrap()),
      StageKind::Gauss => self.backend.gauss(frame, p.sx.unwrap(), p.sy.unwrap(), p.w.unwrap(), p.h.unwrap()),
      StageKind::SobelH => self.backend.sobelh(frame),
      StageKind::SobelV => self.backend.sobelv(frame),
      StageKind::SimpleGrad => self.backend.simplegrad(frame),
      StageKind::PrewittH => self.backend.prewitth(frame),
      StageKind::PrewittV => self.backend.prewittv(frame),
      StageKind::ScharrH => self.backend.scharrh(frame),
      StageKind::ScharrV => self.backend.scharrv(frame),
      StageKind::Step => posterize(frame, p.nsteps.unwrap(), p.scale.unwrap()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::PixelType;

  #[test]
  fn parses_median_stage() {
    let stage = parse_stage("type=median:r=2").unwrap();
    assert_eq!(stage.kind, StageKind::Median);
    assert_eq!(stage.params.r, Some(2));
  }

  #[test]
  fn comma_and_colon_separators_are_equivalent() {
    let a = parse_stage("type=step,nsteps=4,scale=log").unwrap();
    let b = parse_stage("type=step:nsteps=4:scale=log").unwrap();
    assert_eq!(a.params.nsteps, b.params.nsteps);
    assert_eq!(a.params.scale, b.params.scale);
  }

  #[test]
  fn rejects_unknown_key() {
    let err = parse_stage("type=median:bogus=1").unwrap_err();
    assert!(matches!(err, Error::UnknownKey { .. }));
  }

  #[test]
  fn rejects_negative_radius() {
    let err = parse_stage("type=median:r=-1").unwrap_err();
    assert!(matches!(err, Error::ParameterRange { .. }));
  }

  #[test]
  fn step_requires_both_nsteps_and_scale() {
    assert!(parse_stage("type=step:nsteps=4").is_err());
    assert!(parse_stage("type=step:scale=log").is_err());
  }

  #[test]
  fn help_key_requests_help_and_terminates() {
    let err = parse_stage("type=median:help").unwrap_err();
    assert!(matches!(err, Error::Usage(_)));
  }

  #[test]
  fn type_and_scale_values_are_case_insensitive() {
    let stage = parse_stage("type=STEP:nsteps=4:scale=LOG").unwrap();
    assert_eq!(stage.kind, StageKind::Step);
    assert_eq!(stage.params.scale, Some(ScaleLaw::Log));
  }

  #[test]
  fn rejects_unknown_stage_type() {
    assert!(matches!(parse_stage("type=bogus"), Err(Error::UnknownStageType(_))));
  }

  #[test]
  fn gauss_window_is_auto_raised_not_rejected() {
    let stage = parse_stage("type=gauss:sx=1.5:sy=1.5:w=3:h=3").unwrap();
    assert_eq!(stage.params.w, Some(MIN_GAUSS_WINDOW));
    assert_eq!(stage.params.h, Some(MIN_GAUSS_WINDOW));
  }

  #[test]
  fn engine_propagates_headers_and_runs_core_stages() {
    let pixels: Vec<f64> = (0..16).map(|v| v as f64).collect();
    let mut frame = Frame::from_pixels(4, 4, PixelType::Double, pixels, Vec::new()).unwrap();
    frame.push_comment("source frame");
    let stages =
      vec![parse_stage("type=median:r=0").unwrap(), parse_stage("type=step:nsteps=4:scale=uniform").unwrap()];
    let backend = UnimplementedBackend;
    let engine = PipelineEngine::new(&backend);
    let out = engine.run(&frame, &stages).unwrap();
    assert_eq!(out.width(), 4);
    assert_eq!(out.height(), 4);
    let source_count = out.headers().iter().filter(|h| h.contains("source frame")).count();
    assert_eq!(source_count, 1, "the median stage must not duplicate carried-forward headers");
    let history_count = out.headers().iter().filter(|h| h.contains("step filter")).count();
    assert_eq!(history_count, 1);
  }

  #[test]
  fn engine_reports_failing_stage_index() {
    let pixels: Vec<f64> = (0..16).map(|v| v as f64).collect();
    let frame = Frame::from_pixels(4, 4, PixelType::Double, pixels, Vec::new()).unwrap();
    let stages = vec![parse_stage("type=median:r=0").unwrap(), parse_stage("type=gauss:sx=1:sy=1:w=5:h=5").unwrap()];
    let backend = UnimplementedBackend;
    let engine = PipelineEngine::new(&backend);
    let err = engine.run(&frame, &stages).unwrap_err();
    match err {
      Error::Stage { index, kind, .. } => {
        assert_eq!(index, 1);
        assert_eq!(kind, "gauss");
      }
      _ => panic!("expected Error::Stage"),
    }
  }
}
