use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    if let Err(err) = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
    {
        eprintln!("tracing init failed: {err}");
    }

    match recruit_users::initialize_state().await {
        Ok(state) => {
            tracing::info!(
                name = %state.config.name,
                "users store ready"
            );
        },
        Err(err) => {
            tracing::error!(error = %err, "cannot initialize users store");
            std::process::exit(1);
        },
    }
}
