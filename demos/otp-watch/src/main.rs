use std::sync::Arc;
use std::time::Duration;

use otpwatch::{
    spawn_tick_task, FileSecretStore, SystemClock, TickerConfig, WindowScheduler,
};
use tokio::sync::Mutex;

/// Watches a TOTP secret: prints the current code and its remaining
/// validity once per second until interrupted.
///
/// Usage: otp-watch [SECRET] [PERIOD] [DIGITS]
///
/// With no secret argument, the secret persisted by a previous run is
/// reused.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let secret = args.next();
    let period = args.next().map(|p| p.parse::<u64>()).transpose()?.unwrap_or(30);
    let digits = args.next().map(|d| d.parse::<u32>()).transpose()?.unwrap_or(6);

    let store = FileSecretStore::new(std::env::temp_dir().join("otp-watch-secret"));
    let mut scheduler = WindowScheduler::new(Arc::new(SystemClock), Box::new(store));
    scheduler.on_error(|error| eprintln!("error: {error}"));
    scheduler.set_period(period);
    scheduler.set_digits(digits);

    match secret {
        Some(secret) => scheduler.set_secret(secret),
        None => scheduler.load_persisted(),
    }

    let scheduler = Arc::new(Mutex::new(scheduler));
    let cancel = spawn_tick_task(scheduler.clone(), TickerConfig::default());

    loop {
        {
            let scheduler = scheduler.lock().await;
            match scheduler.current_code() {
                Some(code) => println!(
                    "Code: {}, Remaining time: {}",
                    code,
                    scheduler.remaining_seconds()
                ),
                None => println!("No secret configured, pass one as the first argument"),
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        }
    }

    cancel.cancel();

    Ok(())
}
