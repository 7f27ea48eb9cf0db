//! Monitor live telemetry from a flight controller.
//!
//! Subscribes to every decoded message on the link and prints a
//! one-line summary per message, plus any link events (connection and
//! control line changes).
//!
//! # Requirements
//!
//! - A MAVLink-speaking autopilot on a serial port
//! - Serial port path adjusted for your system
//!
//! # Usage
//!
//! ```sh
//! cargo run -p uavlink --example monitor_telemetry -- /dev/ttyUSB0
//! ```

use std::sync::Arc;
use std::time::Duration;

use uavlink::{CallbackSubscriber, DeviceBuilder, LinkEvent, Message};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "uavlink=info".into()),
        )
        .init();

    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".to_string());

    println!("Connecting to autopilot on {port}...");
    let device = DeviceBuilder::new("fc0")
        .port(&port)
        .baud_rate(57_600)
        .build()
        .await?;

    device.register(Arc::new(CallbackSubscriber::new("monitor", |msg| {
        match msg.message() {
            Message::Heartbeat(hb) => {
                println!(
                    "HEARTBEAT         type={} autopilot={} status={}",
                    hb.mav_type, hb.autopilot, hb.system_status
                );
            }
            Message::Attitude(att) => {
                println!(
                    "ATTITUDE          roll={:+.3} pitch={:+.3} yaw={:+.3} rad",
                    att.roll, att.pitch, att.yaw
                );
            }
            Message::GlobalPositionInt(pos) => {
                println!(
                    "GLOBAL_POSITION   lat={:.7} lon={:.7} alt={:.1} m",
                    pos.lat as f64 / 1e7,
                    pos.lon as f64 / 1e7,
                    pos.alt as f64 / 1000.0
                );
            }
            Message::SensorOffsets(off) => {
                println!(
                    "SENSOR_OFFSETS    mag=({}, {}, {})",
                    off.mag_ofs_x, off.mag_ofs_y, off.mag_ofs_z
                );
            }
            Message::Ahrs(ahrs) => {
                println!(
                    "AHRS              error_rp={:.4} error_yaw={:.4}",
                    ahrs.error_rp, ahrs.error_yaw
                );
            }
            Message::Unknown { msg_id, payload } => {
                println!("UNKNOWN({msg_id})       {} payload bytes", payload.len());
            }
        }
    })))?;

    let mut events = device.subscribe_events();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(60);
    println!("Monitoring for 60 seconds...\n");

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Ok(LinkEvent::Connected)) => println!("[link] connected"),
            Ok(Ok(LinkEvent::Disconnected)) => {
                println!("[link] disconnected");
                break;
            }
            Ok(Ok(LinkEvent::CtsChanged { on })) => println!("[link] CTS -> {on}"),
            Ok(Ok(LinkEvent::DsrChanged { on })) => println!("[link] DSR -> {on}"),
            Ok(Err(tokio::sync::broadcast::error::RecvError::Lagged(n))) => {
                println!("(missed {n} link events due to lag)");
            }
            Ok(Err(tokio::sync::broadcast::error::RecvError::Closed)) => break,
            Err(_) => break,
        }
    }

    println!("\nMonitoring complete.");
    device.close().await?;
    Ok(())
}
