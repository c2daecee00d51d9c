use tokio_util::sync::CancellationToken;

use deskhand::{config, tracker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenvy::dotenv();

    let cfg = config::load_config_or_default();
    let target = cfg.screen.virtual_resolution();

    let token = CancellationToken::new();
    let tracker_token = token.clone();
    let mut handle = tokio::task::spawn_blocking(move || tracker::run(target, tracker_token));

    let outcome = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("Interrupted, shutting down.");
            token.cancel();
            handle.await?
        }
        outcome = &mut handle => outcome?,
    };

    if let Err(e) = outcome {
        tracing::error!(error = %e, "tracker failed");
        std::process::exit(1);
    }
    Ok(())
}
