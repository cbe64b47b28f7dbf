#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    clinic_lib::init_tracing();
    clinic_lib::run().await
}
