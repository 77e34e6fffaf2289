// Read-only bus check: ping both wheel servos and stream their tick counts.
// Run this before anything that moves the robot.
//
// Usage: cargo run --example wheel_check -- --port /dev/ttyUSB0

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use diffdrive_runtime::config::DEFAULT_MOTOR_PORT;
use diffdrive_runtime::motor::wheel::{LEFT_WHEEL_ID, RIGHT_WHEEL_ID};
use diffdrive_runtime::motor::{SerialWheel, ServoBus, WheelActuator};

#[derive(Parser)]
struct Args {
    /// Serial port of the wheel servo bus
    #[arg(long, default_value = DEFAULT_MOTOR_PORT)]
    port: String,

    /// How many position samples to print
    #[arg(long, default_value_t = 20)]
    samples: u32,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();
    let bus = Arc::new(Mutex::new(ServoBus::open(&args.port)?));

    for id in [LEFT_WHEEL_ID, RIGHT_WHEEL_ID] {
        let responding = bus.lock().unwrap().ping(id)?;
        println!(
            "servo {id}: {}",
            if responding { "ok" } else { "NO RESPONSE" }
        );
    }

    let mut left = SerialWheel::new(Arc::clone(&bus), LEFT_WHEEL_ID);
    let mut right = SerialWheel::new(bus, RIGHT_WHEEL_ID);

    println!("turn the wheels by hand to see the counters move");
    for _ in 0..args.samples {
        let l = left.position()?;
        let r = right.position()?;
        println!("left {l:>8}  right {r:>8}");
        thread::sleep(Duration::from_millis(250));
    }
    Ok(())
}
