#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stickerhunt_lib::run().await
}
