use std::net::SocketAddr;
use std::time::Duration;

use crate::{Error, Result};

const DEFAULT_LISTEN_ADDR : ([u8; 4], u16) = ([127, 0, 0, 1], 3000);
const DEFAULT_DATABASE_PATH : &str = "linkboard.sqlite3";
const DEFAULT_SERVER_NAME : &str = "linkboard";
const DEFAULT_TOKEN_TTL : Duration = Duration::from_secs(60 * 60 * 24);

// no Debug impl, the token secret must not end up in logs
pub struct Config {
    pub listen_addr :   SocketAddr,
    pub database_path : String,
    pub server_name :   String,
    pub token_secret :  Vec<u8>,
    pub token_ttl :     Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token_secret = match std::env::var("LINKBOARD_TOKEN_SECRET") {
            Ok(s) if !s.is_empty() => s.into_bytes(),
            _ => {
                return Err(Error::Config(
                    "LINKBOARD_TOKEN_SECRET must be set".to_string(),
                ))
            },
        };

        let listen_addr = match std::env::var("LINKBOARD_LISTEN_ADDR") {
            Ok(s) => s.parse().map_err(|_| {
                Error::Config(format!("invalid listen address: {}", s))
            })?,
            Err(_) => SocketAddr::from(DEFAULT_LISTEN_ADDR),
        };

        let database_path = std::env::var("LINKBOARD_DATABASE_PATH")
            .unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string());

        let server_name = std::env::var("LINKBOARD_SERVER_NAME")
            .unwrap_or_else(|_| DEFAULT_SERVER_NAME.to_string());

        let token_ttl = match std::env::var("LINKBOARD_TOKEN_TTL_SECS") {
            Ok(s) => {
                let secs = s.parse().map_err(|_| {
                    Error::Config(format!("invalid token ttl: {}", s))
                })?;

                Duration::from_secs(secs)
            },
            Err(_) => DEFAULT_TOKEN_TTL,
        };

        Ok(Self {
            listen_addr,
            database_path,
            server_name,
            token_secret,
            token_ttl,
        })
    }
}
