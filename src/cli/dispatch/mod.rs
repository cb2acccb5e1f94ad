use crate::cli::actions::{server::Args, Action};
use crate::token::parse_ttl;
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing or TTLs are invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let redis_url = matches
        .get_one::<String>("redis-url")
        .cloned()
        .context("missing required argument: --redis-url")?;

    let access_secret = matches
        .get_one::<String>("access-secret")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --access-secret")?;
    let refresh_secret = matches
        .get_one::<String>("refresh-secret")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --refresh-secret")?;

    let issuer = matches
        .get_one::<String>("issuer")
        .cloned()
        .unwrap_or_else(|| "tanipintar-backend".to_string());
    let audience = matches
        .get_one::<String>("audience")
        .cloned()
        .unwrap_or_else(|| "tanipintar-mobile".to_string());

    let access_ttl = matches
        .get_one::<String>("access-ttl")
        .cloned()
        .unwrap_or_else(|| crate::token::DEFAULT_ACCESS_TTL.to_string());
    let access_ttl_seconds = parse_ttl(&access_ttl)
        .with_context(|| format!("invalid --access-ttl value: {access_ttl}"))?;

    let refresh_ttl = matches
        .get_one::<String>("refresh-ttl")
        .cloned()
        .unwrap_or_else(|| crate::token::DEFAULT_REFRESH_TTL.to_string());
    let refresh_ttl_seconds = parse_ttl(&refresh_ttl)
        .with_context(|| format!("invalid --refresh-ttl value: {refresh_ttl}"))?;

    let store_fail_open = matches.get_flag("store-fail-open");

    Ok(Action::Server(Args {
        port,
        dsn,
        redis_url,
        access_secret,
        refresh_secret,
        issuer,
        audience,
        access_ttl_seconds,
        refresh_ttl_seconds,
        store_fail_open,
    }))
}
