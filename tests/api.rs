use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use linkboard::api::{self, ServerInner};
use linkboard::auth::Auth;
use linkboard::database::Db;

const SECRET : &[u8] = b"integration-secret";
const ISSUER : &str = "linkboard-test";

fn test_server() -> api::Server {
    Arc::new(ServerInner {
        auth : Auth::new(
            SECRET.to_vec(),
            ISSUER.to_string(),
            Duration::from_secs(300),
        ),
        db :   Db::open_in_memory().unwrap(),
    })
}

async fn post_json(
    server : &api::Server,
    path : &str,
    body : &Value,
) -> (u16, Value) {
    let res = warp::test::request()
        .method("POST")
        .path(path)
        .json(body)
        .reply(&api::routes(server))
        .await;

    let status = res.status().as_u16();
    let body = serde_json::from_slice(res.body()).unwrap_or(Value::Null);

    (status, body)
}

#[tokio::test(flavor = "multi_thread")]
async fn register_login_create_list() {
    let server = test_server();
    let routes = api::routes(&server);

    // registering returns a usable token
    let (status, body) = post_json(
        &server,
        "/api/users",
        &json!({"username": "alice", "password": "pw123"}),
    )
    .await;
    assert_eq!(status, 201);
    assert!(!body["token"].as_str().unwrap().is_empty());

    // logging in with the right password returns a fresh token
    let (status, body) = post_json(
        &server,
        "/api/login",
        &json!({"username": "alice", "password": "pw123"}),
    )
    .await;
    assert_eq!(status, 200);
    let token = body["token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());

    // the wrong password is rejected
    let (status, body) = post_json(
        &server,
        "/api/login",
        &json!({"username": "alice", "password": "wrong"}),
    )
    .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "wrong username or password");

    // an unknown user gets the same error
    let (status, body) = post_json(
        &server,
        "/api/login",
        &json!({"username": "mallory", "password": "pw123"}),
    )
    .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "wrong username or password");

    // create a link as alice
    let res = warp::test::request()
        .method("POST")
        .path("/api/links")
        .header("authorization", format!("Bearer {}", token))
        .json(&json!({"title": "X", "address": "http://x.com"}))
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 201);
    let link : Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(link["title"], "X");
    assert_eq!(link["address"], "http://x.com");
    assert_eq!(link["user"]["name"], "alice");

    // the listing includes it, with the owner resolved
    let res = warp::test::request()
        .method("GET")
        .path("/api/links")
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 200);
    let links : Value = serde_json::from_slice(res.body()).unwrap();
    let links = links.as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["id"], link["id"]);
    assert_eq!(links[0]["user"]["name"], "alice");
}

#[tokio::test(flavor = "multi_thread")]
async fn create_link_requires_identity() {
    let server = test_server();
    let routes = api::routes(&server);

    // no credentials at all
    let res = warp::test::request()
        .method("POST")
        .path("/api/links")
        .json(&json!({"title": "X", "address": "http://x.com"}))
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 403);

    // a token that fails validation is the same as no token
    let res = warp::test::request()
        .method("POST")
        .path("/api/links")
        .header("authorization", "Bearer garbage")
        .json(&json!({"title": "X", "address": "http://x.com"}))
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 403);

    // nothing was stored
    let res = warp::test::request()
        .method("GET")
        .path("/api/links")
        .reply(&routes)
        .await;
    let links : Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(links.as_array().unwrap().len(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn create_link_rejects_bad_address() {
    let server = test_server();
    let routes = api::routes(&server);

    let (_, body) = post_json(
        &server,
        "/api/users",
        &json!({"username": "alice", "password": "pw123"}),
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();

    let res = warp::test::request()
        .method("POST")
        .path("/api/links")
        .header("authorization", format!("Bearer {}", token))
        .json(&json!({"title": "X", "address": "not a url"}))
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 400);
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_registration_conflicts() {
    let server = test_server();

    let (status, _) = post_json(
        &server,
        "/api/users",
        &json!({"username": "alice", "password": "pw123"}),
    )
    .await;
    assert_eq!(status, 201);

    let (status, body) = post_json(
        &server,
        "/api/users",
        &json!({"username": "alice", "password": "other"}),
    )
    .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "duplicate username: alice");
}

#[tokio::test(flavor = "multi_thread")]
async fn refresh_rotates_a_valid_token() {
    let server = test_server();
    let routes = api::routes(&server);

    let (_, body) = post_json(
        &server,
        "/api/users",
        &json!({"username": "alice", "password": "pw123"}),
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) =
        post_json(&server, "/api/token/refresh", &json!({ "token": token }))
            .await;
    assert_eq!(status, 200);
    let refreshed = body["token"].as_str().unwrap().to_string();

    // the refreshed token still authenticates as alice
    let res = warp::test::request()
        .method("POST")
        .path("/api/links")
        .header("authorization", format!("Bearer {}", refreshed))
        .json(&json!({"title": "X", "address": "http://x.com"}))
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 201);
    let link : Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(link["user"]["name"], "alice");
}

#[tokio::test(flavor = "multi_thread")]
async fn refresh_rejects_expired_and_garbage_tokens() {
    use jsonwebtoken as jwt;

    let server = test_server();

    let (status, _) = post_json(
        &server,
        "/api/token/refresh",
        &json!({"token": "garbage"}),
    )
    .await;
    assert_eq!(status, 403);

    #[derive(serde::Serialize)]
    struct TokenFull<'a> {
        iss : &'a str,
        sub : &'a str,
        iat : u64,
        exp : u64,
    }

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let expired = jwt::encode(
        &jwt::Header::default(),
        &TokenFull {
            iss : ISSUER,
            sub : "alice",
            iat : now - 120,
            exp : now - 60,
        },
        &jwt::EncodingKey::from_secret(SECRET),
    )
    .unwrap();

    let (status, _) =
        post_json(&server, "/api/token/refresh", &json!({ "token": expired }))
            .await;
    assert_eq!(status, 403);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_routes_not_found() {
    let server = test_server();
    let routes = api::routes(&server);

    let res = warp::test::request()
        .method("GET")
        .path("/api/unknown")
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 404);
}
