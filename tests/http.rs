//! End-to-end tests driving the router in-process.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use bytes::Bytes;
use filehost::auth::TokenService;
use filehost::config::AppConfig;
use filehost::server::{AppState, create_router};
use filehost::storage::{LocalObjectStore, ObjectStore, StorageError, StorageResult};
use filehost::store::{SqliteStore, Store};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const FORM: &str = "application/x-www-form-urlencoded";
const BOUNDARY: &str = "filehost-test-boundary";

struct TestApp {
    _temp: TempDir,
    config: AppConfig,
    router: Router,
    store: Arc<SqliteStore>,
    objects: Arc<LocalObjectStore>,
}

/// Local storage whose buckets can never be removed.
struct UndeletableBuckets(Arc<LocalObjectStore>);

#[async_trait]
impl ObjectStore for UndeletableBuckets {
    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.0.create_bucket(bucket).await
    }
    async fn delete_bucket(&self, _: &str) -> StorageResult<()> {
        Err(StorageError::Backend {
            message: "access denied".to_string(),
            transient: false,
        })
    }
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        self.0.bucket_exists(bucket).await
    }
    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> StorageResult<()> {
        self.0.put_object(bucket, key, data).await
    }
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        self.0.get_object(bucket, key).await
    }
    async fn list_objects(&self, bucket: &str) -> StorageResult<Vec<String>> {
        self.0.list_objects(bucket).await
    }
    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.0.delete_object(bucket, key).await
    }
}

impl TestApp {
    async fn new() -> Self {
        Self::with_objects(|objects| objects as Arc<dyn ObjectStore>).await
    }

    /// Serves through `wrap(local)` while `objects` still inspects the local
    /// storage directly.
    async fn with_objects(
        wrap: impl FnOnce(Arc<LocalObjectStore>) -> Arc<dyn ObjectStore>,
    ) -> Self {
        let temp = TempDir::new().expect("create temp dir");

        let mut config = AppConfig::default();
        config.auth.secret = "test-secret".to_string();
        config.server.data_dir = temp.path().to_path_buf();

        let store = Arc::new(SqliteStore::new(config.server.db_path()).expect("open db"));
        store.initialize().expect("init db");
        let objects = Arc::new(
            LocalObjectStore::new(&config.local_storage_root())
                .await
                .expect("open object root"),
        );

        let state = Arc::new(AppState::new(&config, store.clone(), wrap(objects.clone())));

        Self {
            _temp: temp,
            config,
            router: create_router(state),
            store,
            objects,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, FORM);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn upload(&self, link: &str, file_name: &str, content: &str, cookie: &str) -> Response<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        let request = Request::post(format!("/file/add/{link}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::COOKIE, cookie)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Registers a user and returns the `name=value` pair to send back as a cookie.
    async fn register(&self, name: &str) -> String {
        let response = self
            .post_form(
                "/register",
                &format!("name={name}&email={name}%40example.com&password=password1"),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/repository");
        session_cookie(&response)
    }

    async fn create_repository(&self, name: &str, cookie: &str) -> Value {
        let response = self
            .post_form("/repository/create", &format!("name={name}"), Some(cookie))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let listing = json(self.get("/repository", Some(cookie)).await).await;
        listing["data"]["repositories"][0].clone()
    }
}

fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

fn session_cookie(response: &Response<Body>) -> String {
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("access_token="));
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie.split(';').next().unwrap().to_string()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes()
        .to_vec()
}

async fn json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let response = app.get("/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"OK");
}

#[tokio::test]
async fn test_protected_routes_redirect_to_login() {
    let app = TestApp::new().await;

    let response = app.get("/repository", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let response = app.post_form("/repository/create", "name=Docs", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let response = app
        .get("/repository", Some("access_token=Bearer%20garbage"))
        .await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_index_shows_session_user() {
    let app = TestApp::new().await;

    let anonymous = json(app.get("/", None).await).await;
    assert!(anonymous["data"]["user"].is_null());

    let cookie = app.register("alice").await;
    let signed_in = json(app.get("/", Some(&cookie)).await).await;
    assert_eq!(signed_in["data"]["user"]["name"], "alice");
    assert!(signed_in["data"]["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_flow() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let response = app
        .post_form("/token", "name=alice&password=password1", None)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/repository");
    let cookie = session_cookie(&response);

    let response = app.get("/repository", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_bad_credentials_are_indistinguishable() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let wrong_password = app
        .post_form("/token", "name=alice&password=password2", None)
        .await;
    let unknown_user = app
        .post_form("/token", "name=bob&password=password1", None)
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(wrong_password).await, json(unknown_user).await);
}

#[tokio::test]
async fn test_duplicate_registration_is_conflict() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let response = app
        .post_form(
            "/register",
            "name=alice&email=other%40example.com&password=password1",
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_bearer_header_is_accepted() {
    let app = TestApp::new().await;
    app.register("alice").await;
    let token = TokenService::new(&app.config.auth).issue("alice").unwrap();

    let request = Request::get("/repository")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_stale_identity_clears_cookie() {
    let app = TestApp::new().await;
    let token = TokenService::new(&app.config.auth).issue("ghost").unwrap();
    let cookie = format!("access_token=Bearer%20{token}");

    let response = app.get("/repository", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("Max-Age=0"));

    // Pages open to anonymous viewers treat it as no session.
    let response = app.get("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new().await;
    let cookie = app.register("alice").await;

    let response = app.get("/logout", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("access_token="));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_file_round_trip() {
    let app = TestApp::new().await;
    let cookie = app.register("alice").await;
    let repository = app.create_repository("My+Docs", &cookie).await;
    let link = repository["link"].as_str().unwrap();
    let bucket = repository["name"].as_str().unwrap();
    assert_eq!(repository["view_name"], "My Docs");
    assert_eq!(bucket, "filehosting-my-docs");

    let response = app.upload(link, "Notes.txt", "hello", &cookie).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/repository/{link}"));

    let page = json(app.get(&format!("/repository/{link}"), Some(&cookie)).await).await;
    assert_eq!(page["data"]["editable"], true);
    assert_eq!(page["data"]["access"], "owner");
    let file = &page["data"]["files"][0];
    assert_eq!(file["view_name"], "Notes.txt");
    assert_eq!(file["name"], "notes.txt");

    let response = app
        .get(file["download_link"].as_str().unwrap(), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Notes.txt\""
    );
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(
        headers[header::ACCESS_CONTROL_EXPOSE_HEADERS],
        "Content-Disposition"
    );
    assert_eq!(body_bytes(response).await, b"hello");

    let response = app
        .post_form(
            &format!("/file/remove?bucket_name={bucket}&name=notes.txt"),
            "",
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/repository/{link}"));
    assert!(app.objects.list_objects(bucket).await.unwrap().is_empty());

    let response = app
        .get(&format!("/file/read?bucket_name={bucket}&key=notes.txt"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_link_is_read_only_for_others() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let repository = app.create_repository("Docs", &alice).await;
    let link = repository["link"].as_str().unwrap();
    let bucket = repository["name"].as_str().unwrap();
    app.upload(link, "Notes.txt", "hello", &alice).await;

    for cookie in [None, Some(bob.as_str())] {
        let page = json(app.get(&format!("/repository/{link}"), cookie).await).await;
        assert_eq!(page["data"]["editable"], false);
        assert_eq!(page["data"]["access"], "reader");
        assert_eq!(page["data"]["files"].as_array().unwrap().len(), 1);
        assert!(page["data"]["repositories"].as_array().unwrap().is_empty());
    }

    let response = app.upload(link, "evil.txt", "x", &bob).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_form(
            &format!("/file/remove?bucket_name={bucket}&name=notes.txt"),
            "",
            Some(&bob),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_form(&format!("/repository/delete/{bucket}"), "", Some(&bob))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert_eq!(app.objects.list_objects(bucket).await.unwrap(), ["notes.txt"]);
}

#[tokio::test]
async fn test_delete_repository() {
    let app = TestApp::new().await;
    let cookie = app.register("alice").await;
    let repository = app.create_repository("Docs", &cookie).await;
    let link = repository["link"].as_str().unwrap();
    let bucket = repository["name"].as_str().unwrap();
    let id = repository["id"].as_str().unwrap();
    app.upload(link, "Notes.txt", "hello", &cookie).await;

    let response = app
        .get(&format!("/repository/delete/{bucket}"), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/repository");
    assert_eq!(json(response).await["data"]["status"], "complete");

    assert!(app.store.get_repository(id).unwrap().is_none());
    assert!(app.store.list_files(id).unwrap().is_empty());
    assert!(!app.objects.bucket_exists(bucket).await.unwrap());

    let response = app.get(&format!("/repository/{link}"), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_repository_reports_storage_leftovers() {
    let app = TestApp::with_objects(|objects| Arc::new(UndeletableBuckets(objects))).await;
    let cookie = app.register("alice").await;
    let repository = app.create_repository("Docs", &cookie).await;
    let link = repository["link"].as_str().unwrap();
    let bucket = repository["name"].as_str().unwrap();
    let id = repository["id"].as_str().unwrap();
    app.upload(link, "Notes.txt", "hello", &cookie).await;

    let response = app
        .get(&format!("/repository/delete/{bucket}"), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/repository");

    let body = json(response).await;
    assert_eq!(body["data"]["status"], "storage_leftovers");
    assert_eq!(body["data"]["bucket"], bucket);
    assert!(body["data"]["detail"].as_str().unwrap().contains("access denied"));

    assert!(app.store.get_repository(id).unwrap().is_none());
    assert!(app.objects.bucket_exists(bucket).await.unwrap());
}

#[tokio::test]
async fn test_upload_requires_file_field() {
    let app = TestApp::new().await;
    let cookie = app.register("alice").await;
    let repository = app.create_repository("Docs", &cookie).await;
    let link = repository["link"].as_str().unwrap();

    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"other\"\r\n\r\n\
         value\r\n\
         --{BOUNDARY}--\r\n"
    );
    let request = Request::post(format!("/file/add/{link}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::COOKIE, &cookie)
        .body(Body::from(body))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_repository_is_conflict() {
    let app = TestApp::new().await;
    let cookie = app.register("alice").await;
    app.create_repository("Docs", &cookie).await;

    let response = app
        .post_form("/repository/create", "name=docs", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
