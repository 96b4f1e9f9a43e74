//! calibration-validator: run a validation round against a simulated tracker.
//!
//! Streams synthetic gaze from a feeder thread, collects five stimulus
//! points, and prints per-eye accuracy and precision.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use calibration_validator::config::{SAMPLE_COUNT_DEFAULT, TIMEOUT_MS_DEFAULT};
use calibration_validator::simulated::{SimulatedEyeTracker, SimulatedGaze};
use calibration_validator::{
    CalibrationValidator, EyeMetrics, EyeTracker, NormalizedPoint2D, TrackerRegistry,
};
use clap::Parser;
use parking_lot::Mutex;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "calibration-validator", about = "Eye tracker calibration validation demo")]
struct Cli {
    /// Address of the simulated eye tracker
    #[arg(long, default_value = "sim://tracker-0")]
    address: String,

    /// Valid samples to collect per stimulus point (10-3000)
    #[arg(long, default_value_t = SAMPLE_COUNT_DEFAULT)]
    sample_count: usize,

    /// Collection timeout per stimulus point in ms (100-3000)
    #[arg(long, default_value_t = TIMEOUT_MS_DEFAULT)]
    timeout_ms: u64,

    /// Gaze stream rate (Hz)
    #[arg(long, default_value = "120")]
    rate_hz: f64,

    /// Gaze jitter amplitude (degrees)
    #[arg(long, default_value = "0.3")]
    jitter_deg: f64,

    /// Systematic gaze offset (degrees)
    #[arg(long, default_value = "0.5")]
    offset_deg: f64,

    /// Invalidate every N-th right-eye sample (0 disables)
    #[arg(long, default_value = "0")]
    dropout: u64,
}

const STIMULUS_POINTS: [(f64, f64); 5] =
    [(0.3, 0.3), (0.3, 0.7), (0.5, 0.5), (0.7, 0.3), (0.7, 0.7)];

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calibration_validator=info".into()),
        )
        .init();

    info!("calibration-validator v{} starting", env!("CARGO_PKG_VERSION"));

    let tracker = Arc::new(SimulatedEyeTracker::with_default_display(cli.address.clone()));
    let mut registry = TrackerRegistry::new();
    registry.register(tracker.clone());

    let validator =
        CalibrationValidator::init(&registry, &cli.address, cli.sample_count, cli.timeout_ms)
            .context("failed to create validator")?;

    // Feeder: fixates whatever target is current, at the configured rate.
    let target: Arc<Mutex<NormalizedPoint2D>> =
        Arc::new(Mutex::new(NormalizedPoint2D::new(0.5, 0.5)));
    let running = Arc::new(AtomicBool::new(true));
    let feeder = {
        let tracker = tracker.clone();
        let target = target.clone();
        let running = running.clone();
        let mut gaze = SimulatedGaze::new();
        gaze.offset_deg = cli.offset_deg;
        gaze.jitter_deg = cli.jitter_deg;
        gaze.dropout_every = cli.dropout;
        gaze.sample_rate_hz = cli.rate_hz;
        let period = Duration::from_secs_f64(1.0 / cli.rate_hz.max(1.0));
        thread::Builder::new()
            .name("gaze-feeder".into())
            .spawn(move || {
                while running.load(Ordering::Relaxed) {
                    let area = match tracker.display_area() {
                        Ok(area) => area,
                        Err(e) => {
                            warn!("feeder: {}", e);
                            break;
                        }
                    };
                    let point = *target.lock();
                    tracker.deliver(&gaze.generate(&area, &point));
                    thread::sleep(period);
                }
                gaze.samples_generated()
            })
            .context("failed to spawn gaze feeder")?
    };

    let outcome = run_validation(&validator, &target);

    running.store(false, Ordering::Relaxed);
    match feeder.join() {
        Ok(n) => info!("feeder stopped after {} samples", n),
        Err(_) => warn!("gaze feeder panicked"),
    }

    let result = outcome?;

    println!(
        "Calibration validation result (average over {} collected points):",
        result.points_count()
    );
    print_eye("Left eye", &result.average_left);
    print_eye("Right eye", &result.average_right);
    for p in &result.points {
        if p.timed_out {
            println!("  {} timed out with {} samples", p.screen_point, p.gaze_data_count());
        }
    }
    println!("{}", result.to_sexp());

    drop(result);
    validator.destroy().context("failed to destroy validator")?;

    Ok(())
}

fn run_validation(
    validator: &CalibrationValidator,
    target: &Mutex<NormalizedPoint2D>,
) -> anyhow::Result<calibration_validator::ValidationResult> {
    validator
        .enter_validation_mode()
        .context("failed to enter validation mode")?;

    for &(x, y) in &STIMULUS_POINTS {
        let point = NormalizedPoint2D::new(x, y);
        *target.lock() = point;

        validator
            .start_collecting_data(point)
            .with_context(|| format!("failed to start collecting at {}", point))?;
        while validator.is_collecting_data() {
            thread::sleep(POLL_INTERVAL);
        }
    }

    let result = validator.compute().context("failed to compute validation result")?;
    validator
        .leave_validation_mode()
        .context("failed to leave validation mode")?;
    Ok(result)
}

fn print_eye(label: &str, m: &EyeMetrics) {
    println!("  {}:", label);
    println!("    Accuracy: {:.6}", m.accuracy);
    println!("    Precision: {:.6}", m.precision);
    println!("    Precision (RMS): {:.6}", m.precision_rms);
}
