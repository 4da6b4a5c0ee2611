//! One-shot chat against the handler of the current mode

use crate::app::App;
use colored::*;
use futures::StreamExt;
use vanguard_core::api::with_retry;
use vanguard_core::{ApiMessage, ApiStreamChunk, ApiStreamUsage, RetryPolicy, VanguardResult};

pub async fn run(app: &App, system: &str, message: &str, max_retries: u32) -> VanguardResult<()> {
    let handler = app.controller.api_handler();
    let model = handler.get_model();
    app.console.detail(&format!(
        "{} mode, {} / {}",
        app.controller.mode(),
        handler.provider(),
        model.id
    ));

    let messages = vec![ApiMessage::user(message)];
    let policy = RetryPolicy {
        max_retries,
        ..RetryPolicy::default()
    };
    let mut stream = with_retry(&policy, || handler.create_message(system, &messages)).await?;

    let mut usage: Option<ApiStreamUsage> = None;
    while let Some(chunk) = stream.next().await {
        match chunk? {
            ApiStreamChunk::Text { text } => app.console.stream_text(&text),
            ApiStreamChunk::Usage(report) => usage = Some(report),
        }
    }
    println!();

    if let Some(usage) = usage {
        println!("{}", format_usage(&usage).dimmed());
    }
    Ok(())
}

fn format_usage(usage: &ApiStreamUsage) -> String {
    let mut line = format!(
        "tokens: {} in, {} out",
        usage.input_tokens, usage.output_tokens
    );
    if usage.cache_read_tokens > 0 || usage.cache_write_tokens > 0 {
        line.push_str(&format!(
            ", cache {} read / {} written",
            usage.cache_read_tokens, usage.cache_write_tokens
        ));
    }
    if let Some(cost) = usage.total_cost {
        line.push_str(&format!(", ${:.6}", cost));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_usage() {
        let usage = ApiStreamUsage {
            input_tokens: 12,
            output_tokens: 5,
            cache_read_tokens: 3,
            cache_write_tokens: 0,
            total_cost: Some(0.0012),
        };
        assert_eq!(
            format_usage(&usage),
            "tokens: 12 in, 5 out, cache 3 read / 0 written, $0.001200"
        );
    }
}
