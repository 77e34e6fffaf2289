// Drive a square: four sides, four quarter turns, then report the
// dead-reckoned pose (which should be close to where we started).
//
// Usage: cargo run --example drive_square -- --port /dev/ttyUSB0 --side-cm 30
//
// Wheels on the ground, area clear: this moves the robot.

use std::error::Error;
use std::f64::consts::FRAC_PI_2;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use diffdrive_runtime::config::{DEFAULT_MOTOR_PORT, RobotConfig};
use diffdrive_runtime::drive::{DualDrive, MotionSequencer};
use diffdrive_runtime::motor::wheel::{LEFT_WHEEL_ID, RIGHT_WHEEL_ID};
use diffdrive_runtime::motor::{SerialWheel, ServoBus};
use diffdrive_runtime::retcode::Retcode;

#[derive(Parser)]
struct Args {
    /// Serial port of the wheel servo bus
    #[arg(long, default_value = DEFAULT_MOTOR_PORT)]
    port: String,

    /// Wheel speed in ticks/s
    #[arg(long, default_value_t = 400)]
    speed: i32,

    /// Side length of the square in cm
    #[arg(long, default_value_t = 30.0)]
    side_cm: f64,

    /// Optional robot config JSON (geometry, calibration, timing)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => RobotConfig::from_json_file(path)?,
        None => RobotConfig::default(),
    };

    let bus = Arc::new(Mutex::new(ServoBus::open(&args.port)?));
    let mut left = SerialWheel::new(Arc::clone(&bus), LEFT_WHEEL_ID);
    let mut right = SerialWheel::new(bus, RIGHT_WHEEL_ID);
    left.initialize()?;
    right.initialize()?;

    let drive = DualDrive::from_actuators(left, right, config.ramp.clone(), config.drive.clone());
    drive.reset_position_counters()?;
    drive.set_tolerance(2);

    let sequencer = MotionSequencer::spawn(drive, config.sequencer.clone());
    sequencer.set_speed(args.speed);

    for _ in 0..4 {
        sequencer.enqueue_drive(args.side_cm);
        sequencer.enqueue_turn(FRAC_PI_2);
    }

    if sequencer.start() != Retcode::Ok {
        return Err("sequence did not start".into());
    }
    info!("square started, waiting for completion");
    sequencer.await_sequence_complete();

    let pose = sequencer.pose();
    info!(
        x = pose.x,
        y = pose.y,
        heading = pose.normalized_heading(),
        "square complete"
    );
    Ok(())
}
