mod http;
mod mjpeg;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use focusguard_core::annotation::infrastructure::overlay_annotator::OverlayAnnotator;
use focusguard_core::attention::domain::attention_state_machine::threshold_from_secs;
use focusguard_core::attention::infrastructure::monotonic_clock::MonotonicClock;
use focusguard_core::detection::domain::detector_params::DetectorParams;
use focusguard_core::detection::domain::face_detector::FaceDetector;
use focusguard_core::detection::infrastructure::onnx_face_detector::OnnxFaceDetector;
use focusguard_core::detection::infrastructure::scaled_face_detector::ScaledFaceDetector;
use focusguard_core::pipeline::attention_service::AttentionService;
use focusguard_core::pipeline::frame_broadcaster::FrameBroadcaster;
use focusguard_core::pipeline::infrastructure::threaded_frame_producer::FrameProducer;
use focusguard_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use focusguard_core::shared::constants::{
    DEFAULT_ALLOWED_ORIGINS, DEFAULT_CONFIDENCE, DEFAULT_DEVICE_INDEX,
    DEFAULT_DISTRACTION_THRESHOLD_SECS, DEFAULT_HOST, DEFAULT_JPEG_QUALITY,
    DEFAULT_MAX_READ_RETRIES, DEFAULT_MIN_NEIGHBORS, DEFAULT_PORT, DEFAULT_RETRY_BACKOFF,
    DEFAULT_SCALE_FACTOR, FACE_MODEL_NAME, FACE_MODEL_URL,
};
use focusguard_core::shared::model_resolver::{self, ModelSource};
use focusguard_core::video::domain::frame_source::FrameSource;
use focusguard_core::video::infrastructure::image_sequence_source::ImageSequenceSource;
use focusguard_core::video::infrastructure::jpeg_frame_encoder::JpegFrameEncoder;
use focusguard_core::video::infrastructure::retrying_frame_source::RetryingFrameSource;

use crate::http::{AppState, CorsPolicy};

/// Camera attention tracker: live FOCUSED/DISTRACTED status over HTTP.
#[derive(Parser, Debug)]
#[command(name = "focusguard")]
struct Cli {
    /// Camera device index.
    #[arg(long, default_value_t = DEFAULT_DEVICE_INDEX)]
    device: u32,

    /// Read frames from an image file or directory instead of a camera.
    #[arg(long)]
    source: Option<PathBuf>,

    /// Restart --source from the first image when it runs out.
    #[arg(long)]
    loop_source: bool,

    /// Playback rate for --source, in frames per second (0 = as fast as possible).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    source_fps: f64,

    /// Downscale factor applied to frames before detection (>= 1.0).
    #[arg(long, default_value_t = DEFAULT_SCALE_FACTOR)]
    scale_factor: f64,

    /// Overlapping candidates a face needs before it counts.
    #[arg(long, default_value_t = DEFAULT_MIN_NEIGHBORS)]
    min_neighbors: usize,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Seconds without a face before the status becomes DISTRACTED.
    #[arg(
        long,
        default_value_t = DEFAULT_DISTRACTION_THRESHOLD_SECS,
        allow_negative_numbers = true
    )]
    threshold: f64,

    /// Address to bind the HTTP server to.
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Origin allowed to read responses cross-origin (repeatable).
    #[arg(long = "allowed-origin")]
    allowed_origins: Vec<String>,

    /// JPEG quality of the video feed (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    jpeg_quality: u8,

    /// Consecutive failed reads tolerated before the source is considered gone.
    #[arg(long, default_value_t = DEFAULT_MAX_READ_RETRIES)]
    max_read_retries: u32,

    /// Face model file. Downloaded to the user cache when omitted.
    #[arg(long)]
    model: Option<PathBuf>,
}

impl Cli {
    fn detector_params(&self) -> DetectorParams {
        DetectorParams {
            scale_factor: self.scale_factor,
            min_neighbors: self.min_neighbors,
            confidence: self.confidence,
        }
    }

    fn allowed_origins(&self) -> Vec<String> {
        if self.allowed_origins.is_empty() {
            DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect()
        } else {
            self.allowed_origins.clone()
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let threshold = threshold_from_secs(cli.threshold)?;
    let detector = build_detector(&cli)?;
    let source = open_source(&cli)?;

    let service = AttentionService::new(
        source,
        detector,
        Box::new(OverlayAnnotator::default()),
        Box::new(JpegFrameEncoder::new(cli.jpeg_quality)),
        Box::new(MonotonicClock::new()),
        threshold,
    )
    .with_logger(Box::new(StdoutPipelineLogger::default()));

    let state = Arc::new(AppState {
        status: service.status_cell(),
        broadcaster: Arc::new(FrameBroadcaster::default()),
        cors: CorsPolicy::new(cli.allowed_origins()),
    });

    let addr = format!("{}:{}", cli.host, cli.port);
    let server = Arc::new(
        tiny_http::Server::http(&addr).map_err(|e| format!("Failed to bind {addr}: {e}"))?,
    );
    install_shutdown_handler(server.clone());
    let producer = FrameProducer::spawn(service, state.broadcaster.clone())?;

    log::info!("Attention tracker listening on http://{addr}");
    log::info!("  video feed: http://{addr}/video_feed");
    log::info!("  status:     http://{addr}/status");
    log::info!("  health:     http://{addr}/health");
    log::info!("  allowed origins: {}", state.cors.origins().join(", "));

    http::serve(server, state);

    let report = producer.stop()?;
    log::info!(
        "Shut down: {} frames published, {} dropped",
        report.frames,
        report.dropped
    );
    Ok(())
}

/// Ctrl+C and SIGTERM unblock the listener so `run` can stop the producer.
fn install_shutdown_handler(server: Arc<tiny_http::Server>) {
    let result = ctrlc::set_handler(move || {
        log::info!("Shutdown requested");
        server.unblock();
    });
    if let Err(e) = result {
        log::warn!("Failed to install Ctrl+C handler: {e}");
    }
}

fn build_detector(cli: &Cli) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let model_path = match &cli.model {
        Some(path) => model_resolver::resolve(ModelSource::Explicit(path), None)?,
        None => {
            log::info!("Resolving model: {FACE_MODEL_NAME}");
            let path = model_resolver::resolve(
                ModelSource::Named {
                    name: FACE_MODEL_NAME,
                    url: FACE_MODEL_URL,
                },
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };

    let base: Box<dyn FaceDetector> = Box::new(OnnxFaceDetector::new(
        &model_path,
        cli.confidence,
        cli.min_neighbors,
    )?);

    if cli.scale_factor > 1.0 {
        Ok(Box::new(ScaledFaceDetector::new(base, cli.scale_factor)?))
    } else {
        Ok(base)
    }
}

fn open_source(cli: &Cli) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    let inner: Box<dyn FrameSource> = match &cli.source {
        Some(path) => {
            let mut source = ImageSequenceSource::open(path)?.looping(cli.loop_source);
            if cli.source_fps > 0.0 {
                if let Ok(interval) = Duration::try_from_secs_f64(1.0 / cli.source_fps) {
                    source = source.with_frame_interval(interval);
                }
            }
            Box::new(source)
        }
        None => open_camera(cli.device)?,
    };

    Ok(Box::new(RetryingFrameSource::new(
        inner,
        cli.max_read_retries,
        DEFAULT_RETRY_BACKOFF,
    )))
}

#[cfg(feature = "camera")]
fn open_camera(device: u32) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    use focusguard_core::video::infrastructure::camera_source::CameraSource;

    log::info!("Using camera {device}");
    Ok(Box::new(CameraSource::new(device)))
}

#[cfg(not(feature = "camera"))]
fn open_camera(_device: u32) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    Err("built without camera support; rebuild with --features camera or pass --source".into())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    cli.detector_params().validate()?;
    threshold_from_secs(cli.threshold)?;

    if let Some(source) = &cli.source {
        if !source.exists() {
            return Err(format!("Source not found: {}", source.display()).into());
        }
    } else if cli.loop_source {
        return Err("--loop-source requires --source".into());
    }
    if !cli.source_fps.is_finite() || cli.source_fps < 0.0 {
        return Err(format!("Source fps must be >= 0, got {}", cli.source_fps).into());
    }
    if !(1..=100).contains(&cli.jpeg_quality) {
        return Err(format!(
            "JPEG quality must be between 1 and 100, got {}",
            cli.jpeg_quality
        )
        .into());
    }
    if let Some(model) = &cli.model {
        if !model.is_file() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if cli.host.trim().is_empty() {
        return Err("Host must not be empty".into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("focusguard").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.device, 0);
        assert_eq!(cli.port, 5001);
        assert_eq!(cli.host, "0.0.0.0");
        assert_eq!(cli.min_neighbors, 5);
        assert!((cli.scale_factor - 1.3).abs() < f64::EPSILON);
        assert!((cli.threshold - 2.0).abs() < f64::EPSILON);
        assert_eq!(
            cli.allowed_origins(),
            vec!["http://localhost:3000", "http://localhost:3001"]
        );
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn test_repeated_allowed_origin_replaces_defaults() {
        let cli = parse(&[
            "--allowed-origin",
            "http://a.test",
            "--allowed-origin",
            "http://b.test",
        ]);
        assert_eq!(cli.allowed_origins(), vec!["http://a.test", "http://b.test"]);
    }

    #[rstest]
    #[case(&["--scale-factor", "0.5"])]
    #[case(&["--confidence", "1.5"])]
    #[case(&["--threshold", "-1"])]
    #[case(&["--jpeg-quality", "0"])]
    #[case(&["--source-fps", "-2"])]
    #[case(&["--loop-source"])]
    #[case(&["--source", "/nonexistent/frames"])]
    #[case(&["--model", "/nonexistent/model.onnx"])]
    fn test_validate_rejects(#[case] args: &[&str]) {
        assert!(validate(&parse(args)).is_err());
    }

    #[test]
    fn test_zero_threshold_is_valid() {
        assert!(validate(&parse(&["--threshold", "0"])).is_ok());
    }
}
