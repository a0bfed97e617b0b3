use ffbvib::config::Config;
use ffbvib::{DeviceIndex, VibrationController, hid, rumble};

use std::sync::Arc;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("ffbvib v{} starting...", env!("CARGO_PKG_VERSION"));

    let cfg = Config::load();

    // Discovery only; every device loop opens its own handle.
    let found = match hidapi::HidApi::new() {
        Ok(api) => hid::find_devices(&api, &cfg.hid),
        Err(e) => {
            log::error!("Failed to initialize HID API: {e}");
            std::process::exit(1);
        }
    };
    if found.is_empty() {
        log::warn!("No matching HID device found.");
        return;
    }

    let controller = Arc::new(VibrationController::with_hid(cfg.settings()));
    let mut devices: Vec<DeviceIndex> = Vec::new();
    for (device, info) in DeviceIndex::ALL.into_iter().zip(&found) {
        controller.bind_device(device, info.path.clone());
        devices.push(device);
    }
    if found.len() > devices.len() {
        log::info!("{} extra device(s) ignored", found.len() - devices.len());
    }

    log::info!(
        "Playing {} pulse(s) ({} ms) on {} device(s)",
        cfg.test_pattern.len(),
        rumble::pattern_length(&cfg.test_pattern).as_millis(),
        devices.len()
    );

    let mut players = Vec::new();
    for device in devices.iter().copied() {
        let controller = Arc::clone(&controller);
        let pattern = cfg.test_pattern.clone();
        players.push(tokio::spawn(async move {
            if let Err(e) = rumble::play_pattern(&controller, device, &pattern).await {
                log::warn!("{device}: pattern aborted: {e}");
            }
        }));
    }
    for player in players {
        if let Err(e) = player.await {
            log::error!("Pattern task failed: {e}");
        }
    }

    // Let the final stop reach the hardware before tearing the loops down.
    tokio::time::sleep(cfg.settings().poll_interval * 2).await;

    for device in devices {
        let controller = Arc::clone(&controller);
        if let Err(e) = tokio::task::spawn_blocking(move || controller.reset(device)).await {
            log::error!("{device}: reset failed: {e}");
        }
    }

    log::info!("Done.");
}
