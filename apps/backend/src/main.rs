#[tokio::main]
async fn main() -> anyhow::Result<()> {
    revision_backend::run().await
}
