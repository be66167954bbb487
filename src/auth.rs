use std::time::Duration;

use crate::database::Db;
use crate::{crypto, models, Error, Result};

pub struct Auth {
    secret :    Vec<u8>,
    issuer :    String,
    token_ttl : Duration,
}

impl Auth {
    pub fn new(secret : Vec<u8>, issuer : String, token_ttl : Duration) -> Self {
        Self {
            secret,
            issuer,
            token_ttl,
        }
    }

    pub async fn register(
        &self,
        db : &Db,
        username : &str,
        password : &str,
    ) -> Result<i64> {
        let encoded = crypto::encode_password(password.as_bytes())?;

        db.insert_user(username, &encoded).await
    }

    pub async fn verify(
        &self,
        db : &Db,
        username : &str,
        password : &str,
    ) -> Result<bool> {
        let user = match db.get_user_by_name(username).await {
            Ok(user) => user,
            Err(Error::UserNameNotFound(_)) => {
                // burn a hash so an unknown name costs the same as a wrong
                // password
                crypto::encode_password(password.as_bytes())?;
                return Ok(false);
            },
            Err(err) => return Err(err),
        };

        crypto::verify_password(&user.password, password.as_bytes())
    }

    pub async fn login(
        &self,
        db : &Db,
        username : &str,
        password : &str,
    ) -> Result<String> {
        match self.verify(db, username, password).await? {
            true => self.issue(username),
            false => Err(Error::WrongUsernameOrPassword),
        }
    }

    pub fn issue(&self, username : &str) -> Result<String> {
        crypto::Token {
            iss : self.issuer.clone(),
            sub : username.to_string(),
        }
        .issue(&self.secret, self.token_ttl)
    }

    pub fn refresh(&self, token : &str) -> Result<String> {
        let tok = crypto::Token::validate(token, &self.secret, &self.issuer)
            .map_err(|_| Error::AccessDenied)?;

        self.issue(&tok.sub)
    }

    pub async fn identity(
        &self,
        db : &Db,
        header : Option<&str>,
    ) -> Option<models::User> {
        let value = header?;
        let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();

        let tok =
            crypto::Token::validate(token, &self.secret, &self.issuer).ok()?;

        db.get_user_by_name(&tok.sub).await.ok()
    }
}
