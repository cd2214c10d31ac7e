#[tokio::main]
async fn main() -> anyhow::Result<()> {
    webhook_ingest::run().await
}
