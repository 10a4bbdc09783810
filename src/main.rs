use anyhow::Result;
use clap::Parser;
use opencv::core::Mat;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pose_osc::camera::OpenCvCamera;
use pose_osc::config::Config;
use pose_osc::osc::{OscClient, OSC_ADDRESS};
use pose_osc::pipeline;
use pose_osc::pose::{BlazePoseModel, PoseTracker};
use pose_osc::render::{Display, MinifbRenderer};

const WINDOW_TITLE: &str = "Pose OSC";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    let options = config.estimator_options();

    info!("Pose OSC {}", env!("POSE_OSC_VERSION"));
    info!("OSC target: {}:{} {}", config.ip, config.port, OSC_ADDRESS);
    info!("Input: {}", config.input);
    info!(
        "Model complexity: {}, detection >= {}, tracking >= {}",
        options.model_complexity, options.min_detection_confidence, options.min_tracking_confidence
    );
    info!(
        "Smooth: {}, static image mode: {}",
        options.smooth_landmarks, options.static_image_mode
    );

    let mut client = OscClient::new(&config.ip, config.port)?;
    info!("OSC client ready ({})", client.target_addr());

    let camera = OpenCvCamera::open(&config.input, config.mirror())?;
    let (width, height) = camera.resolution();

    let model = BlazePoseModel::load(&config.model_dir, options.model_complexity)?;
    let estimator = PoseTracker::new(model, options);
    info!("Model loaded");

    let mut renderer = if config.display() {
        info!("Press ESC to exit");
        Some(MinifbRenderer::new(WINDOW_TITLE, width as usize, height as usize)?)
    } else {
        None
    };
    let display = renderer
        .as_mut()
        .map(|r| r as &mut dyn Display<Frame = Mat>);

    let summary = pipeline::run(camera, estimator, &mut client, display)?;
    info!(
        "Shutting down... ({} frames, {} with pose)",
        summary.frames, summary.detections
    );

    Ok(())
}
