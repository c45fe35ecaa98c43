use sitewise_sql::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();
    sitewise_sql::run().await
}
