// Thin smoke-test harness: exercises the library end-to-end on a
// synthetic frame. No CLI surface, just enough to confirm the pipeline
// wiring holds together.

use fitsfilter::frame::{Frame, PixelType};
use fitsfilter::pipeline::{parse_stage, PipelineEngine, UnimplementedBackend};
use log::info;

fn synthetic_frame(width: usize, height: usize) -> Frame {
  let mut pixels = Vec::with_capacity(width * height);
  for row in 0..height {
    for col in 0..width {
      pixels.push(((row * width + col) % 251) as f64);
    }
  }
  Frame::from_pixels(width, height, PixelType::Double, pixels, Vec::new()).expect("valid synthetic frame")
}

fn main() {
  env_logger::init();

  let frame = synthetic_frame(64, 48);
  let stats = frame.stats();
  info!(
    "synthetic frame {}x{}: min={:.2} max={:.2} mean={:.2} median={:.2}",
    frame.width(),
    frame.height(),
    stats.min,
    stats.max,
    stats.mean,
    stats.median
  );

  let stages = ["type=median:r=1", "type=step:nsteps=8:scale=log"]
    .iter()
    .map(|text| parse_stage(text).expect("well-formed stage descriptor"))
    .collect::<Vec<_>>();

  let backend = UnimplementedBackend;
  let engine = PipelineEngine::new(&backend);
  match engine.run(&frame, &stages) {
    Ok(out) => {
      let out_stats = out.stats();
      info!(
        "pipeline produced {}x{} frame, {} header record(s), output median {:.2}",
        out.width(),
        out.height(),
        out.headers().len(),
        out_stats.median
      );
    }
    Err(err) => info!("pipeline failed: {err}"),
  }
}
