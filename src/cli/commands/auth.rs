use clap::{builder::ValueParser, Arg, Command};
use std::time::Duration;

pub const ARG_SERVER_SECRET: &str = "server-secret";
pub const ARG_ACCESS_TOKEN_TTL: &str = "access-token-ttl";
pub const ARG_REFRESH_TOKEN_TTL: &str = "refresh-token-ttl";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SERVER_SECRET)
                .long(ARG_SERVER_SECRET)
                .help("Server-wide secret mixed into every token signing key")
                .long_help(
                    "Server-wide secret mixed into every token signing key. Changing it invalidates all outstanding tokens.",
                )
                .env("TESSERA_SERVER_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL)
                .long(ARG_ACCESS_TOKEN_TTL)
                .help("Access token lifetime, e.g. 900, 15m, 1h")
                .env("TESSERA_ACCESS_TOKEN_TTL")
                .default_value("15m")
                .value_parser(validator_duration()),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_TTL)
                .long(ARG_REFRESH_TOKEN_TTL)
                .help("Refresh token lifetime, e.g. 12h, 7d")
                .env("TESSERA_REFRESH_TOKEN_TTL")
                .default_value("7d")
                .value_parser(validator_duration()),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL; sets the CORS origin and the cookie Secure flag")
                .env("TESSERA_FRONTEND_BASE_URL")
                .default_value("http://localhost:3000"),
        )
}

/// Seconds, or a number followed by `s`, `m`, `h` or `d`. Zero is rejected.
#[must_use]
pub fn validator_duration() -> ValueParser {
    ValueParser::from(|value: &str| -> Result<Duration, String> { parse_duration(value) })
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let (number, unit) = match value.char_indices().last() {
        Some((index, c)) if c.is_ascii_alphabetic() => (&value[..index], c.to_ascii_lowercase()),
        _ => (value, 's'),
    };

    let multiplier: u64 = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        other => return Err(format!("unknown duration unit '{other}', use s, m, h or d")),
    };

    let amount = number
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("invalid duration: {value}"))?;
    if amount == 0 {
        return Err("duration must be greater than zero".to_string());
    }

    amount
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration too large: {value}"))
}
