use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tower_sessions::cookie::Key;

/// Bytes of key material the cookie signer needs.
const MIN_SECRET_LEN: usize = 64;

/// Ten years.
const MAX_SESSION_TTL_HOURS: i64 = 87_600;

#[derive(Debug, Parser)]
#[command(name = "jotter")]
#[command(about = "A small blog: register, log in, write posts")]
pub struct Cli {
    /// Path to the SQLite database file
    #[arg(long, global = true, env = "JOTTER_DB_PATH", default_value = "jotter.db")]
    pub db_path: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web server
    Serve(ServeArgs),

    /// Create the database schema
    InitDb {
        /// Drop every table first, deleting all users, posts and sessions
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, env = "JOTTER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "JOTTER_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Hex-encoded cookie signing secret (at least 64 bytes). Without it a
    /// random key is used and all sessions end when the server restarts.
    #[arg(long, env = "JOTTER_SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Sessions expire after this many hours without a request (1 to 87600)
    #[arg(
        long,
        env = "JOTTER_SESSION_TTL_HOURS",
        default_value_t = 24,
        value_parser = clap::value_parser!(u32).range(1..=MAX_SESSION_TTL_HOURS)
    )]
    pub session_ttl_hours: u32,

    /// Only send the session cookie over HTTPS
    #[arg(long, env = "JOTTER_SECURE_COOKIES", default_value_t = false)]
    pub secure_cookies: bool,

    /// Seconds between sweeps of expired sessions
    #[arg(long, env = "JOTTER_SESSION_CLEANUP_SECS", default_value_t = 3600)]
    pub session_cleanup_secs: u64,
}

impl ServeArgs {
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    /// The configured signing key, or `None` when no secret was given.
    pub fn session_key(&self) -> Result<Option<Key>> {
        let secret = self.session_secret.as_deref().map(str::trim).unwrap_or_default();
        if secret.is_empty() {
            return Ok(None);
        }

        let bytes = hex::decode(secret).context("session secret is not valid hex")?;
        if bytes.len() < MIN_SECRET_LEN {
            bail!(
                "session secret must decode to at least {} bytes, got {}",
                MIN_SECRET_LEN,
                bytes.len()
            );
        }

        Ok(Some(Key::from(bytes.as_slice())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve(args: &[&str]) -> ServeArgs {
        let argv = ["jotter", "serve"].iter().chain(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Serve(args) => args,
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn init_db_takes_reset_flag() {
        let cli = Cli::try_parse_from(["jotter", "init-db", "--reset", "--db-path", "x.db"]).unwrap();
        assert_eq!(cli.db_path, PathBuf::from("x.db"));
        assert!(matches!(cli.command, Command::InitDb { reset: true }));
    }

    #[test]
    fn listen_address_from_flags() {
        let args = serve(&["--host", "127.0.0.1", "--port", "8080"]);
        assert_eq!(args.addr().unwrap(), "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn secret_must_be_long_hex() {
        let long = "ab".repeat(MIN_SECRET_LEN);
        assert!(serve(&["--session-secret", &long]).session_key().unwrap().is_some());

        let short = "ab".repeat(MIN_SECRET_LEN - 1);
        assert!(serve(&["--session-secret", &short]).session_key().is_err());

        assert!(serve(&["--session-secret", "not hex"]).session_key().is_err());
    }

    #[test]
    fn session_ttl_is_bounded() {
        assert_eq!(serve(&[]).session_ttl_hours, 24);
        assert_eq!(serve(&["--session-ttl-hours", "87600"]).session_ttl_hours, 87_600);

        for bad in ["0", "-1", "87601", "99999999999"] {
            let argv = ["jotter", "serve", "--session-ttl-hours", bad];
            assert!(Cli::try_parse_from(argv).is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn missing_secret_means_ephemeral_key() {
        let args = ServeArgs {
            host: "0.0.0.0".into(),
            port: 3000,
            session_secret: None,
            session_ttl_hours: 24,
            secure_cookies: false,
            session_cleanup_secs: 3600,
        };
        assert!(args.session_key().unwrap().is_none());
    }
}
