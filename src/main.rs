#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = driveinsight_lib::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
