use std::convert::Infallible;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use warp::filters::method;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::{filters, Filter, Rejection, Reply};

use crate::auth::Auth;
use crate::{database, models, Error};

pub struct ServerInner {
    pub auth : Auth,
    pub db :   database::Db,
}

pub type Server = Arc<ServerInner>;

type BoxReply = Box<dyn Reply>;

fn with_server(
    server : &Server,
) -> impl Filter<Extract = (Server,), Error = Infallible> + Clone {
    let f = |server : Server| warp::any().map(move || Arc::clone(&server));

    (f)(Arc::clone(server))
}

// yields the authenticated user, or None when the header is missing or the
// token fails validation; handlers decide whether that is fatal
fn with_identity(
    server : &Server,
) -> impl Filter<Extract = (Option<models::User>,), Error = Rejection> + Clone
{
    warp::any()
        .and(with_server(server))
        .and(warp::header::optional::<String>("authorization"))
        .and_then(|server : Server, header : Option<String>| async move {
            let identity =
                server.auth.identity(&server.db, header.as_deref()).await;

            Ok::<_, Rejection>(identity)
        })
}

macro_rules! handler {
    ($name:ident ( $($aname:ident : $atype:ty),*) $body:block) => {
        pub fn $name (
            $(
                $aname : $atype,
            )*
        ) -> impl Filter<Extract = (BoxReply,) , Error = Rejection> + Clone {
            $body
        }
    }
}

macro_rules! handler_or{
    ($head:expr $(, $tail:expr)*) => {
        $head
        $(
            .or($tail)
            .unify()
            .boxed()
        )*
    };
    ($head:expr $(, $tail:expr)*,) => {
        handler_or!($head $(, $tail)*)
    }
}

pub fn routes(
    server : &Server,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    handler_or!(
        post_users(server),
        post_login(server),
        post_token_refresh(server),
        get_links(server),
        post_links(server),
    )
    .recover(recover_rejection)
    .with(warp::log::custom(|info| {
        tracing::info!(
            status = %info.status(),
            method = %info.method(),
            path = info.path(),
            elapsed = ?info.elapsed(),
            "request"
        );
    }))
}

async fn recover_rejection(
    err : Rejection,
) -> Result<Error, Infallible> {
    let err = if err.is_not_found()
        || err.find::<warp::reject::MethodNotAllowed>().is_some()
    {
        Error::RouteNotFound
    } else if err
        .find::<filters::body::BodyDeserializeError>()
        .is_some()
    {
        Error::BadRequest
    } else {
        tracing::error!(rejection = ?err, "unhandled rejection");
        Error::Internal
    };

    Ok(err)
}

#[derive(Serialize)]
struct TokenPayload {
    token : String,
}

#[derive(Serialize)]
struct UserPayload {
    id :   i64,
    name : String,
}

#[derive(Serialize)]
struct LinkPayload {
    id :      i64,
    title :   String,
    address : String,
    user :    UserPayload,
}

handler! { post_users (server : &Server) {
    #[derive(Deserialize)]
    struct Req {
        username : String,
        password : String,
    }

    warp::path!("api" / "users")
        .and(method::post())
        .and(with_server(server))
        .and(filters::body::json())
        .and_then(|server : Server, body : Req| async move {
            let res = async {
                server
                    .auth
                    .register(&server.db, &body.username, &body.password)
                    .await?;

                // registering doubles as a first login
                server.auth.issue(&body.username)
            }
            .await;

            let reply : BoxReply = match res {
                Ok(token) => Box::new(reply::with_status(
                    reply::json(&TokenPayload { token }),
                    StatusCode::CREATED,
                )),
                Err(err) => Box::new(err),
            };

            Ok::<_, Infallible>(reply)
        })
}}

handler! { post_login (server : &Server) {
    #[derive(Deserialize)]
    struct Req {
        username : String,
        password : String,
    }

    warp::path!("api" / "login")
        .and(method::post())
        .and(with_server(server))
        .and(filters::body::json())
        .and_then(|server : Server, body : Req| async move {
            let res = server
                .auth
                .login(&server.db, &body.username, &body.password)
                .await;

            let reply : BoxReply = match res {
                Ok(token) => Box::new(reply::json(&TokenPayload { token })),
                Err(err) => Box::new(err),
            };

            Ok::<_, Infallible>(reply)
        })
}}

handler! { post_token_refresh (server : &Server) {
    #[derive(Deserialize)]
    struct Req {
        token : String,
    }

    warp::path!("api" / "token" / "refresh")
        .and(method::post())
        .and(with_server(server))
        .and(filters::body::json())
        .and_then(|server : Server, body : Req| async move {
            let reply : BoxReply = match server.auth.refresh(&body.token) {
                Ok(token) => Box::new(reply::json(&TokenPayload { token })),
                Err(err) => Box::new(err),
            };

            Ok::<_, Infallible>(reply)
        })
}}

handler! { post_links (server : &Server) {
    #[derive(Deserialize)]
    struct Req {
        title :   String,
        address : String,
    }

    warp::path!("api" / "links")
        .and(method::post())
        .and(with_identity(server))
        .and(with_server(server))
        .and(filters::body::json())
        .and_then(|identity : Option<models::User>,
                   server : Server,
                   body : Req| async move {
            let user = match identity {
                Some(user) => user,
                None => {
                    return Ok::<BoxReply, Infallible>(Box::new(
                        Error::AccessDenied,
                    ))
                },
            };

            if url::Url::parse(&body.address).is_err() {
                return Ok(Box::new(Error::InvalidUrl(body.address)));
            }

            let link_id = match server
                .db
                .insert_link(user.id, &body.title, &body.address)
                .await
            {
                Ok(id) => id,
                Err(err) => return Ok(Box::new(err)),
            };

            Ok(Box::new(reply::with_status(
                reply::json(&LinkPayload {
                    id :      link_id,
                    title :   body.title,
                    address : body.address,
                    user :    UserPayload {
                        id :   user.id,
                        name : user.name,
                    },
                }),
                StatusCode::CREATED,
            )))
        })
}}

handler! { get_links (server : &Server) {
    warp::path!("api" / "links")
        .and(method::get())
        .and(with_server(server))
        .and_then(|server : Server| async move {
            let reply : BoxReply = match server.db.get_links().await {
                Ok(rows) => {
                    let links = rows
                        .into_iter()
                        .map(|(link, user)| LinkPayload {
                            id :      link.id,
                            title :   link.title,
                            address : link.address,
                            user :    UserPayload {
                                id :   user.id,
                                name : user.name,
                            },
                        })
                        .collect::<Vec<_>>();

                    Box::new(reply::json(&links))
                },
                Err(err) => Box::new(err),
            };

            Ok::<_, Infallible>(reply)
        })
}}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    error : &'a str,
}

impl Reply for Error {
    fn into_response(self) -> Response {
        use Error::*;
        use StatusCode as S;

        let status = match &self {
            InvalidUrl(_) | BadRequest => S::BAD_REQUEST,
            DuplicateUsername(_) => S::CONFLICT,
            WrongUsernameOrPassword | InvalidToken => S::UNAUTHORIZED,
            AccessDenied => S::FORBIDDEN,
            RouteNotFound => S::NOT_FOUND,
            _ => S::INTERNAL_SERVER_ERROR,
        };

        if status == S::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error");

            return reply::with_status(
                reply::json(&ErrorPayload {
                    error : "internal server error",
                }),
                status,
            )
            .into_response();
        }

        reply::with_status(
            reply::json(&ErrorPayload {
                error : &self.to_string(),
            }),
            status,
        )
        .into_response()
    }
}
