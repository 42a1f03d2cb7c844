use tracing::error;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if let Err(err) = boostline_core::observability::init_observability("backend") {
        eprintln!("failed to initialise logging: {err:#}");
    }

    if let Err(err) = backend::run().await {
        error!("Backend exited with error: {:#}", err);
        std::process::exit(1);
    }
}
