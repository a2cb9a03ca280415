use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{articles, auth, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(articles::router())
        .merge(auth::router())
        .merge(users::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
            Request, StatusCode,
        },
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut b = Request::builder().uri(uri);
        if let Some(c) = cookie {
            b = b.header(COOKIE, c);
        }
        b.body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut b = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(c) = cookie {
            b = b.header(COOKIE, c);
        }
        b.body(Body::from(body.to_string())).unwrap()
    }

    async fn json(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn location(res: &Response) -> &str {
        res.headers()[LOCATION].to_str().unwrap()
    }

    async fn register(app: &Router, login: &str) {
        let body = format!(
            "login={login}&email={login}%40example.com&password=longenough1&confpassword=longenough1"
        );
        let res = app
            .clone()
            .oneshot(post_form("/createuser", &body, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/");
    }

    /// Logs in and returns the `session=...` pair for a Cookie header.
    async fn login(app: &Router, login: &str) -> String {
        let body = format!("login={login}&password=longenough1");
        let res = app
            .clone()
            .oneshot(post_form("/auth", &body, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/account");
        let set = res.headers()[SET_COOKIE].to_str().unwrap();
        assert!(set.contains("HttpOnly"), "{set}");
        set.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn health() {
        let app = build_app(AppState::fake());
        let res = app.oneshot(get("/health", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn only_the_owner_can_delete() {
        let app = build_app(AppState::fake());
        register(&app, "author1").await;
        register(&app, "reader1").await;
        let author = login(&app, "author1").await;
        let reader = login(&app, "reader1").await;

        let account = json(
            app.clone()
                .oneshot(get("/account", Some(&author)))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(account["login"], "author1");
        assert_eq!(account["role"], "User");

        let res = app
            .clone()
            .oneshot(post_form(
                "/create",
                "category=news&title=Hello&subtitle=First&content=Body",
                Some(&author),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/");

        let list = json(app.clone().oneshot(get("/", None)).await.unwrap()).await;
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["author_login"], "author1");
        let id = list[0]["id"].as_str().unwrap().to_string();

        let view = json(
            app.clone()
                .oneshot(get(&format!("/articles/{id}"), Some(&author)))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(view["title"], "Hello");
        assert_eq!(view["can_modify"], true);

        // someone else's delete bounces home and changes nothing
        let res = app
            .clone()
            .oneshot(post_form(&format!("/delete/{id}"), "", Some(&reader)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/");
        let view = json(
            app.clone()
                .oneshot(get(&format!("/articles/{id}"), Some(&reader)))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(view["can_modify"], false);

        let res = app
            .clone()
            .oneshot(post_form(&format!("/delete/{id}"), "", Some(&author)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let res = app
            .clone()
            .oneshot(get(&format!("/articles/{id}"), None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_by_non_owner_is_ignored() {
        let app = build_app(AppState::fake());
        register(&app, "author1").await;
        register(&app, "reader1").await;
        let author = login(&app, "author1").await;
        let reader = login(&app, "reader1").await;
        app.clone()
            .oneshot(post_form(
                "/create",
                "category=news&title=Hello&subtitle=First&content=Body",
                Some(&author),
            ))
            .await
            .unwrap();
        let list = json(app.clone().oneshot(get("/articles", None)).await.unwrap()).await;
        let id = list[0]["id"].as_str().unwrap().to_string();

        let res = app
            .clone()
            .oneshot(get(&format!("/edit/{id}"), Some(&reader)))
            .await
            .unwrap();
        assert_eq!(location(&res), "/");

        let form = format!("id={id}&category=news&title=Hijacked&subtitle=x&content=x");
        let res = app
            .clone()
            .oneshot(post_form("/update", &form, Some(&reader)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        let form = format!("id={id}&category=news&title=Edited&subtitle=x&content=x");
        app.clone()
            .oneshot(post_form("/update", &form, Some(&author)))
            .await
            .unwrap();
        let view = json(
            app.clone()
                .oneshot(get(&format!("/articles/{id}"), None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(view["title"], "Edited");
    }

    #[tokio::test]
    async fn anonymous_authoring_redirects_to_login() {
        let app = build_app(AppState::fake());
        let res = app
            .clone()
            .oneshot(post_form(
                "/create",
                "category=a&title=b&subtitle=c&content=d",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/login");

        let res = app
            .clone()
            .oneshot(get("/articles/new", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let next = location(&res).to_string();
        assert_eq!(next, "/login");

        let res = app.oneshot(get(&next, None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let form = json(res).await;
        assert_eq!(form["action"], "/auth");
        assert_eq!(form["fields"][0], "login");
    }

    #[tokio::test]
    async fn registration_form_is_served_next_to_user_pages() {
        let app = build_app(AppState::fake());
        let res = app.clone().oneshot(get("/users/new", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let form = json(res).await;
        assert_eq!(form["action"], "/createuser");
        assert_eq!(form["fields"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn malformed_ids_look_like_missing_ones() {
        let app = build_app(AppState::fake());
        register(&app, "author1").await;
        let author = login(&app, "author1").await;

        let res = app
            .clone()
            .oneshot(get("/articles/42", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = app
            .clone()
            .oneshot(get("/users/not-a-uuid", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        for req in [
            post_form("/delete/not-a-uuid", "", Some(&author)),
            get("/edit/42", Some(&author)),
            post_form(
                "/update",
                "id=42&category=a&title=b&subtitle=c&content=d",
                Some(&author),
            ),
        ] {
            let res = app.clone().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&res), "/");
        }
    }

    #[tokio::test]
    async fn account_without_session_shows_placeholder() {
        let app = build_app(AppState::fake());
        let body = json(
            app.clone()
                .oneshot(get("/account", Some("session=forged")))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["login"], "you arent authorized");
        assert!(body["role"].is_null());
    }

    #[tokio::test]
    async fn bad_login_sets_no_cookie() {
        let app = build_app(AppState::fake());
        register(&app, "author1").await;
        let res = app
            .oneshot(post_form("/auth", "login=author1&password=wrongwrong", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(res.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn registration_reports_every_violation() {
        let app = build_app(AppState::fake());
        let res = app
            .clone()
            .oneshot(post_form(
                "/createuser",
                "login=bob&email=&password=short&confpassword=other",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json(res).await;
        assert_eq!(body["errors"].as_array().unwrap().len(), 3);

        let users = json(app.oneshot(get("/users", None)).await.unwrap()).await;
        assert!(users.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_login_conflicts() {
        let app = build_app(AppState::fake());
        register(&app, "author1").await;
        let res = app
            .oneshot(post_form(
                "/createuser",
                "login=author1&email=&password=longenough1&confpassword=longenough1",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn user_page_lists_their_articles() {
        let app = build_app(AppState::fake());
        register(&app, "author1").await;
        let author = login(&app, "author1").await;
        app.clone()
            .oneshot(post_form(
                "/create",
                "category=a&title=b&subtitle=c&content=d",
                Some(&author),
            ))
            .await
            .unwrap();

        let users = json(app.clone().oneshot(get("/users", None)).await.unwrap()).await;
        assert!(users[0].get("password_hash").is_none());
        let uid = users[0]["id"].as_str().unwrap().to_string();

        let page = json(
            app.clone()
                .oneshot(get(&format!("/users/{uid}"), None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(page["user"]["login"], "author1");
        assert_eq!(page["articles"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn logout_expires_the_cookie() {
        let app = build_app(AppState::fake());
        let res = app.oneshot(post_form("/logout", "", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let set = res.headers()[SET_COOKIE].to_str().unwrap();
        assert!(set.contains("Max-Age=0"), "{set}");
    }
}
