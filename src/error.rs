use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("duplicate username: {0}")]
    DuplicateUsername(String),

    #[error("wrong username or password")]
    WrongUsernameOrPassword,

    #[error("invalid token")]
    InvalidToken,

    #[error("access denied")]
    AccessDenied,

    #[error("token duration too big")]
    TokenDurationTooBig,

    #[error("no user named {0}")]
    UserNameNotFound(String),

    #[error("bad request")]
    BadRequest,

    #[error("route not found")]
    RouteNotFound,

    #[error("internal server error")]
    Internal,

    #[error("configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Hash(#[from] argon2::Error),

    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Time(#[from] std::time::SystemTimeError),
}
