use anyhow::Context;
use std::str::FromStr;

#[derive(Debug)]
pub struct Config {
    database_url: String,
    server_port: u16,
    public_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = load_env("DATABASE_URL")?;
        let server_port = load_env("SERVER_PORT")?;
        let public_url = load_env_or("PUBLIC_URL", || format!("http://localhost:{server_port}"))?;
        Ok(Self {
            database_url,
            server_port,
            public_url,
        })
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    #[must_use]
    pub const fn server_port(&self) -> u16 {
        self.server_port
    }

    /// Base of the absolute URLs handed out in links and `Location` headers.
    #[must_use]
    pub fn public_url(&self) -> &str {
        &self.public_url
    }
}

fn load_env<T>(key: &str) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    let val =
        std::env::var(key).with_context(|| format!("Failed to load environment variable {key}"))?;
    val.parse::<T>()
        .with_context(|| format!("Failed to parse environment variable {key}"))
}

fn load_env_or<T>(key: &str, default: impl FnOnce() -> T) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(_) => load_env(key),
        Err(std::env::VarError::NotPresent) => Ok(default()),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to load environment variable {key}"))
        }
    }
}
