mod remote;
mod task;

use std::time::Duration;

use tickbot_core::{Bot, BotConfig, ConfigLoader, Session};
use tracing_subscriber::EnvFilter;

use crate::remote::RemoteSession;
use crate::task::Task;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// `RUST_LOG` as given, `info` when unset or unparsable.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok()))
        .with_writer(std::io::stderr)
        .init();

    let control_addr = env_or("TICKBOT_CONTROL_ADDR", "127.0.0.1:7878");
    let tick_ms: u64 = std::env::var("TICKBOT_TICK_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(600);
    let config: BotConfig = match std::env::var("TICKBOT_CONFIG") {
        Ok(path) if !path.trim().is_empty() => ConfigLoader::parse_from_file(&path)?,
        _ => BotConfig::default(),
    };

    // Arguments win over the environment: `tickbot-runner bank-deposit raw shrimps all`.
    let args: Vec<String> = std::env::args().skip(1).collect();
    let text = if args.is_empty() {
        std::env::var("TICKBOT_COMMAND").unwrap_or_default()
    } else {
        args.join(" ")
    };
    let task = Task::parse(&text)?;

    let remote = RemoteSession::connect(&control_addr, Duration::from_millis(tick_ms)).await?;
    tracing::info!(addr = %control_addr, tick_ms, "runner.connected");
    let bot = Bot::new(Session::from_shared(remote), config);

    let out = task::run(&bot, &task).await?;
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use tracing::level_filters::LevelFilter;

    use super::*;

    #[test]
    fn rust_log_level_is_not_capped_at_info() {
        let hint = |d: Option<&str>| log_filter(d.map(str::to_string)).max_level_hint();
        assert_eq!(hint(Some("debug")), Some(LevelFilter::DEBUG));
        assert_eq!(hint(Some("tickbot_core=trace")), Some(LevelFilter::TRACE));
        assert_eq!(hint(None), Some(LevelFilter::INFO));
        assert_eq!(hint(Some("  ")), Some(LevelFilter::INFO));
    }
}
