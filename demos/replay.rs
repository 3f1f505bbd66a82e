use anyhow::Result;
use clap::Parser;
use httpfuzz::listeners::LogListener;
use httpfuzz::*;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Arguments {
    /// plugin modules to load, or "log" for the built-in logger
    #[clap(short, long)]
    plugin: Vec<String>,

    /// request timeout ( seconds )
    #[clap(default_value_t = 10, short, long)]
    timeout: u64,
}

/// Fetch every URL read from stdin and hand the results to the plugins
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Arguments::parse();

    let broker = PluginLoader::new(Logger::current())
        .register("log", LogListener::init)
        .load(&args.plugin)?;

    let client = Client::new(
        reqwest::Client::builder()
            .timeout(Duration::new(args.timeout, 0))
            .build()?,
    );

    for url in std::io::stdin().lines().map_while(|line| line.ok()) {
        let mut request: Request = http::Request::get(url.as_str()).body(Body::empty())?.into();
        let outbound = request.clone_body(request.cancellation().child_token())?;

        let started = Instant::now();
        let response = match client.execute(outbound).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(%url, error = %err, "request failed");
                continue;
            }
        };

        let mut result = FuzzResult::new(
            request,
            response,
            "",
            Location::Path,
            "",
            started.elapsed(),
        );
        broker.send_result(&mut result).await?;
    }

    broker.signal_done();
    broker.wait().await;

    for fault in broker.faults() {
        eprintln!("plugin {} panicked: {}", fault.plugin, fault.message);
    }
    Ok(())
}
