//! Live dashboard example
//!
//! Tracks one form's analytics from a running Formwire backend and prints
//! a summary line every few seconds.
//!
//! ```text
//! FORMWIRE_API_URL=http://localhost:8080/api/v1 \
//!     cargo run --example live_dashboard -- contact-form
//! ```

use anyhow::Result;
use formwire::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&LogConfig::development());

    let form_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "contact-form".to_string());

    let config = FormwireConfig::from_default_dotenv();
    let validation = config.validate()?;
    for warning in &validation.warnings {
        println!("warning: {warning}");
    }

    let ws_config = config.ws_config()?;
    ws_config.validate()?;
    println!("=== Formwire Live Dashboard ===");
    println!("  Form: {form_id}");
    println!("  REST: {}", config.api_url);
    println!("  Hub:  {}", ws_config.url);
    println!();

    let client = Arc::new(WsClient::new(ws_config));
    client.add_event_listener(|event: &WsEvent| info!(event = %event, "connection event"));

    let source = Arc::new(HttpAnalyticsSource::from_config(&config)?);
    let options = LiveAnalyticsOptions::default()
        .with_owned_client()
        .on_new_response(|response: &NewResponseData| {
            println!(
                "-> new response {} from {} at {}",
                response.id, response.device, response.submitted_at
            );
        })
        .on_analytics_update(|analytics: &AnalyticsData| {
            println!("-> analytics replaced, {} total", analytics.total_responses);
        });

    let live = LiveAnalytics::new(client, source, form_id, options);
    live.start().await?;

    for _ in 0..12 {
        tokio::time::sleep(Duration::from_secs(5)).await;
        print_view(&live.snapshot());
    }

    live.disconnect().await;
    println!("Disconnected.");
    Ok(())
}

fn print_view(view: &AnalyticsView) {
    let connection = if view.is_connected { "live" } else { "offline" };
    match &view.analytics {
        Some(analytics) => println!(
            "[{connection}] total={} today={} week={} month={} new={}",
            analytics.total_responses,
            analytics.today_responses,
            analytics.week_responses,
            analytics.month_responses,
            view.new_responses_count
        ),
        None if view.loading => println!("[{connection}] loading..."),
        None => println!(
            "[{connection}] no data{}",
            view.error
                .as_deref()
                .map(|e| format!(" ({e})"))
                .unwrap_or_default()
        ),
    }
}
