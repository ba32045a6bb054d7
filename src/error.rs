use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("usage error: {0}")]
  Usage(String),

  #[error("parameter '{key}' out of range for stage '{stage}': {detail}")]
  ParameterRange { stage: String, key: String, detail: String },

  #[error("frame shape {width}x{height} is too small (minimum {minimum}x{minimum} required)")]
  Shape { width: usize, height: usize, minimum: usize },

  #[error("resource error: {0}")]
  Resource(String),

  #[error("more than 65535 connected components in one label pass")]
  LabelOverflow,

  #[error("unknown stage type '{0}'")]
  UnknownStageType(String),

  #[error("unknown key '{key}' for stage type '{stage}'")]
  UnknownKey { stage: String, key: String },

  #[error("stage #{index} ({kind}) failed")]
  Stage {
    index: usize,
    kind: String,
    #[source]
    source: Box<Error>,
  },
}

pub type Result<T> = std::result::Result<T, Error>;
