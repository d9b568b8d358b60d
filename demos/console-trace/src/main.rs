//! Console Trace Demo
//!
//! Sends a couple of requests through a `HyperClient` and prints the traffic
//! trace to stderr with `tracing-subscriber`.
//!
//! ```text
//! NETLOG_LEVEL=headers cargo run -p console-trace -- https://httpbin.org/
//! ```

// Demo-specific lint allowances
#![allow(missing_docs)]
#![allow(clippy::print_stdout)]

use netlog::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Form posted to the echo endpoint.
#[derive(Debug, Serialize)]
struct Login<'a> {
    user: &'a str,
    remember: bool,
}

#[tokio::main]
async fn main() -> netlog::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("netlog=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let level = std::env::var("NETLOG_LEVEL")
        .map_or(Ok(LogLevel::Body), |value| value.parse::<LogLevel>())?;
    let base = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://httpbin.org/".to_owned());

    let client = HyperClient::builder()
        .base_url(base.parse()?)
        .tag("console-trace")
        .log_level(level)
        .default_headers(|headers| {
            headers.insert("x-demo".to_owned(), "console-trace".to_owned());
        })
        .build();

    if let Err(err) = run(&client).await {
        if err.is_transport() {
            println!("{} unreachable, see the HTTP FAILED line above", client.tag());
        }
        return Err(err);
    }
    Ok(())
}

async fn run(client: &HyperClient) -> netlog::Result<()> {
    let search = client.url("get?q=cat&page=2")?;
    let response = client.get(search.as_str()).await?;
    report("GET", &search, &response);

    let login = client.url("post")?;
    let form = Login {
        user: "ada",
        remember: true,
    };
    let response = client.post_form(login.as_str(), &form).await?;
    report("POST", &login, &response);

    // Only the summary lines from here on
    client.set_log_level(LogLevel::Basic);
    let empty = client.url("status/204")?;
    let response = client.get(empty.as_str()).await?;
    report("GET", &empty, &response);

    Ok(())
}

fn report(method: &str, url: &netlog::url::Url, response: &netlog::Response) {
    let outcome = if response.is_success() { "ok" } else { "failed" };
    println!("{method} {url} -> {} ({outcome})", response.status());
}
