#[tokio::main]
async fn main() -> std::io::Result<()> {
    vessel_sync::frameworks::server::run_with_config().await
}
