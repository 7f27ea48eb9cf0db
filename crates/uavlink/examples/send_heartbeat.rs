//! Send ground-station heartbeats to a flight controller.
//!
//! Opens a session on the device and writes one HEARTBEAT frame per
//! second for ten seconds, the cadence most autopilots expect from a
//! ground station.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p uavlink --example send_heartbeat -- /dev/ttyUSB0
//! ```

use std::time::Duration;

use uavlink::{CommandMessage, DeviceBuilder, Heartbeat, Message};

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

    let device = DeviceBuilder::new("fc0").port(&port).build().await?;
    let session = device.session("gcs-heartbeat");

    let heartbeat = Heartbeat {
        mav_type: 6,      // ground control station
        autopilot: 8,     // invalid / not an autopilot
        system_status: 4, // active
        mavlink_version: 3,
        ..Default::default()
    };

    for n in 1..=10 {
        session
            .send(CommandMessage::new(Message::Heartbeat(heartbeat)))
            .await?;
        println!("heartbeat {n}/10 sent");
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    device.close().await?;
    Ok(())
}
