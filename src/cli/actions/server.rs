use crate::{cli::globals::GlobalArgs, tanipintar};
use anyhow::Result;
use secrecy::SecretString;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub redis_url: String,
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub store_fail_open: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let globals = GlobalArgs {
        access_secret: args.access_secret,
        refresh_secret: args.refresh_secret,
        issuer: args.issuer,
        audience: args.audience,
        access_ttl_seconds: args.access_ttl_seconds,
        refresh_ttl_seconds: args.refresh_ttl_seconds,
        store_fail_open: args.store_fail_open,
    };

    tanipintar::new(args.port, args.dsn, args.redis_url, &globals).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_url(&args.dsn)),
        ("redis_url", redact_url(&args.redis_url)),
        ("issuer", args.issuer.clone()),
        ("audience", args.audience.clone()),
        ("access_ttl_seconds", args.access_ttl_seconds.to_string()),
        ("refresh_ttl_seconds", args.refresh_ttl_seconds.to_string()),
        ("store_fail_open", args.store_fail_open.to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = "Startup configuration:".to_string();
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-url".to_string(),
    }
}
