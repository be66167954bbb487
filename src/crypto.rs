use std::time;

use jsonwebtoken as jwt;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub fn encode_password(pass : &[u8]) -> Result<String> {
    let mut salt = [0u8; 32];
    thread_rng().fill(&mut salt[..]);

    tokio::task::block_in_place(|| {
        Ok(argon2::hash_encoded(pass, &salt, &argon2::Config::default())?)
    })
}

pub fn verify_password(encoded : &str, pass : &[u8]) -> Result<bool> {
    tokio::task::block_in_place(|| Ok(argon2::verify_encoded(encoded, pass)?))
}

pub struct Token {
    pub iss : String,
    pub sub : String,
}

impl Token {
    pub fn issue(
        &self,
        secret : &[u8],
        exp_duration : time::Duration,
    ) -> Result<String> {
        let now = time::SystemTime::now();

        let iat = now.duration_since(time::UNIX_EPOCH)?.as_secs();

        let exp = now
            .checked_add(exp_duration)
            .ok_or(Error::TokenDurationTooBig)?
            .duration_since(time::UNIX_EPOCH)?
            .as_secs();

        #[derive(Serialize)]
        struct TokenFull<'a> {
            iss : &'a str,
            sub : &'a str,
            iat : u64,
            exp : u64,
        }

        let tok = TokenFull {
            iss : &self.iss,
            sub : &self.sub,
            iat,
            exp,
        };

        Ok(jwt::encode(
            &jwt::Header::default(),
            &tok,
            &jwt::EncodingKey::from_secret(secret),
        )?)
    }

    pub fn validate(token : &str, secret : &[u8], iss : &str) -> Result<Self> {
        let mut validation = jwt::Validation::new(jwt::Algorithm::HS256);
        validation.set_issuer(&[iss]);
        validation.leeway = 0;

        #[derive(Deserialize)]
        struct TokenFull {
            iss : String,
            sub : String,
        }

        // bad signature, bad structure, wrong issuer, and expiry all look
        // the same to callers
        let tok : TokenFull = jwt::decode(
            token,
            &jwt::DecodingKey::from_secret(secret),
            &validation,
        )
        .map_err(|_| Error::InvalidToken)?
        .claims;

        Ok(Self {
            iss : tok.iss,
            sub : tok.sub,
        })
    }
}
