use std::net::SocketAddr;

use gatestorm_testserver::{TestServerOptions, TestServerStats};
use tokio::net::TcpListener;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut bind_addr: SocketAddr = "127.0.0.1:0".parse()?;
    let mut options = TestServerOptions::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" => {
                let addr = args.next().ok_or_else(|| {
                    anyhow::anyhow!("--bind requires an address, e.g. 127.0.0.1:3001")
                })?;
                bind_addr = addr.parse()?;
            }
            "--prefix" => {
                options.prefix = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--prefix requires a path, e.g. /api/v1"))?;
            }
            "--no-rate-limit" => {
                options.login_failure_budget = None;
                options.public_request_budget = None;
            }
            "-h" | "--help" => {
                eprintln!(
                    "gatestorm-testserver\n\nUSAGE:\n  gatestorm-testserver [--bind 127.0.0.1:0] [--prefix /api/v1] [--no-rate-limit]\n\nOUTPUT:\n  Prints HTTP_URL=<url> to stdout once ready."
                );
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    let listener = TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let app = gatestorm_testserver::router(options, TestServerStats::default());

    println!("HTTP_URL=http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
