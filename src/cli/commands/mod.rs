use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("tanipintar")
        .about("TaniPintar authentication and session service")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("TANIPINTAR_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("User directory database connection string")
                .env("TANIPINTAR_DSN")
                .required(true),
        )
        .arg(
            Arg::new("redis-url")
                .long("redis-url")
                .help("Revocation store URL, example: redis://127.0.0.1:6379/0")
                .env("TANIPINTAR_REDIS_URL")
                .required(true),
        )
        .arg(
            Arg::new("access-secret")
                .long("access-secret")
                .help("HS256 secret for access tokens (at least 32 bytes)")
                .env("TANIPINTAR_ACCESS_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("refresh-secret")
                .long("refresh-secret")
                .help("HS256 secret for refresh tokens (at least 32 bytes, distinct from the access secret)")
                .env("TANIPINTAR_REFRESH_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("issuer")
                .long("issuer")
                .help("Issuer claim stamped into and required from every token")
                .default_value("tanipintar-backend")
                .env("TANIPINTAR_ISSUER"),
        )
        .arg(
            Arg::new("audience")
                .long("audience")
                .help("Audience claim stamped into and required from every token")
                .default_value("tanipintar-mobile")
                .env("TANIPINTAR_AUDIENCE"),
        )
        .arg(
            Arg::new("access-ttl")
                .long("access-ttl")
                .help("Access token lifetime, e.g. 30s, 15m, 1h")
                .default_value(crate::token::DEFAULT_ACCESS_TTL)
                .env("TANIPINTAR_ACCESS_TTL"),
        )
        .arg(
            Arg::new("refresh-ttl")
                .long("refresh-ttl")
                .help("Refresh token lifetime, e.g. 12h, 7d")
                .default_value(crate::token::DEFAULT_REFRESH_TTL)
                .env("TANIPINTAR_REFRESH_TTL"),
        )
        .arg(
            Arg::new("store-fail-open")
                .long("store-fail-open")
                .help("Skip the blacklist check when the revocation store is unreachable (fail-open). Default is fail-closed")
                .env("TANIPINTAR_STORE_FAIL_OPEN")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("TANIPINTAR_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
