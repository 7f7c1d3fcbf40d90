use anyhow::{anyhow, Context, Result};
use api_auth::signing::{DEFAULT_RSA_BITS, MIN_RSA_BITS};
use api_auth::{KeySource, TokenConfiguration};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// A login account seeded into the in-memory directory.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

impl fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedUser")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub token: TokenConfiguration,
    pub key_source: KeySource,
    pub users: Vec<SeedUser>,
    pub addr: SocketAddr,
}

pub fn load_service_config() -> Result<ServiceConfig> {
    let issuer = env::var("TOKEN_ISSUER").unwrap_or_else(|_| "api-aspnetcore".to_string());
    let audience =
        env::var("TOKEN_AUDIENCE").unwrap_or_else(|_| "api-aspnetcore-clients".to_string());
    let expiration_seconds = i64_from_env("TOKEN_EXPIRATION_SECONDS")?.unwrap_or(3600);
    let clock_skew_seconds = i64_from_env("TOKEN_CLOCK_SKEW_SECONDS")?.unwrap_or(0);

    let token = TokenConfiguration::new(issuer, audience, expiration_seconds)
        .with_clock_skew(clock_skew_seconds);
    token
        .ensure_valid()
        .context("Invalid TOKEN_* configuration")?;

    let key_source = key_source_from_env()?;

    let users = env::var("API_USERS")
        .ok()
        .map(|value| parse_users(&value))
        .transpose()
        .context("Failed to parse API_USERS")?
        .unwrap_or_default();

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .map(|value| value.trim().parse::<u16>())
        .transpose()
        .context("Failed to parse PORT")?
        .unwrap_or(8080);
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Failed to parse HOST '{host}'"))?;

    Ok(ServiceConfig {
        token,
        key_source,
        users,
        addr: SocketAddr::from((ip, port)),
    })
}

fn key_source_from_env() -> Result<KeySource> {
    key_source_from(|key| env::var(key).ok())
}

/// First configured source wins: shared secret, then RSA PEM, then a generated RSA key.
fn key_source_from(lookup: impl Fn(&str) -> Option<String>) -> Result<KeySource> {
    if let Some(secret) = lookup("TOKEN_SIGNING_SECRET").and_then(|value| normalize_optional(&value)) {
        return Ok(KeySource::Secret(secret));
    }

    if let Some(pem) = lookup("TOKEN_SIGNING_KEY_PEM").and_then(|value| normalize_optional(&value)) {
        return Ok(KeySource::RsaPem(pem));
    }

    let bits = lookup("TOKEN_RSA_KEY_BITS")
        .map(|value| value.trim().parse::<usize>())
        .transpose()
        .context("Failed to parse TOKEN_RSA_KEY_BITS")?
        .unwrap_or(DEFAULT_RSA_BITS);
    if bits < MIN_RSA_BITS {
        return Err(anyhow!(
            "TOKEN_RSA_KEY_BITS must be at least {MIN_RSA_BITS}, got {bits}"
        ));
    }
    Ok(KeySource::GenerateRsa { bits })
}

fn i64_from_env(key: &str) -> Result<Option<i64>> {
    env::var(key)
        .ok()
        .map(|value| {
            value
                .trim()
                .parse::<i64>()
                .map_err(|err| anyhow!("Invalid integer for {key}: {err}"))
        })
        .transpose()
}

fn parse_users(value: &str) -> Result<Vec<SeedUser>> {
    let mut users = Vec::new();
    for item in value.split(|c| c == ',' || c == ';') {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut parts = trimmed.splitn(3, ':');
        let email = parts.next().map(str::trim).unwrap_or_default();
        let password = parts.next().map(str::trim).unwrap_or_default();
        if email.is_empty() || password.is_empty() {
            return Err(anyhow!(
                "Invalid user entry '{trimmed}'. Use email:password[:name]"
            ));
        }
        let name = parts.next().and_then(normalize_optional);
        users.push(SeedUser {
            email: email.to_ascii_lowercase(),
            password: password.to_string(),
            name,
        });
    }
    Ok(users)
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
