use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use reqwest::StatusCode as HttpStatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use server::routes::{self, users::ServerState};
use service::file::user_records::UserStore;

struct TestApp {
    base_url: String,
    store_path: PathBuf,
}

async fn start_server() -> anyhow::Result<TestApp> {
    // Isolated store file per test run
    let store_path = PathBuf::from(format!("target/test-data/{}/users.json", Uuid::new_v4()));
    let users = UserStore::new(store_path.clone()).await;
    let state = ServerState { users };

    let app: Router = routes::build_router(state, CorsLayer::very_permissive());
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {}", e);
        }
    });

    Ok(TestApp { base_url, store_path })
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Write the store document directly; the server re-reads the file on every
/// request, so seeding after startup is visible immediately.
async fn seed(app: &TestApp, users: &Value) -> anyhow::Result<()> {
    tokio::fs::write(&app.store_path, serde_json::to_vec_pretty(users)?).await?;
    Ok(())
}

async fn persisted(app: &TestApp) -> anyhow::Result<Value> {
    let bytes = tokio::fs::read(&app.store_path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn e2e_health() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client().get(format!("{}/health", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn e2e_create_then_fetch_round_trips() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();

    let res = c
        .post(format!("{}/users", app.base_url))
        .json(&json!({"name": "Alice", "email": "a@x.com", "age": 28}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    let created = res.json::<Value>().await?;

    let id = created["id"].as_str().expect("id is a string");
    assert!(!id.is_empty());
    assert_eq!(created["name"], "Alice");
    assert_eq!(created["email"], "a@x.com");
    assert_eq!(created["age"], json!(28));

    let res = c.get(format!("{}/users/{}", app.base_url, id)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    assert_eq!(res.json::<Value>().await?, created);

    // persisted store now has exactly this record
    assert_eq!(persisted(&app).await?, json!([created]));
    Ok(())
}

#[tokio::test]
async fn e2e_list_is_idempotent_and_ordered() -> anyhow::Result<()> {
    let app = start_server().await?;
    let users = json!([
        {"id": "2", "name": "B", "email": "b@x.com", "age": 2},
        {"id": "1", "name": "A", "email": "a@x.com", "age": 1}
    ]);
    seed(&app, &users).await?;

    let c = client();
    let first = c.get(format!("{}/users", app.base_url)).send().await?;
    assert_eq!(first.status(), HttpStatusCode::OK);
    let first = first.json::<Value>().await?;
    let second = c.get(format!("{}/users", app.base_url)).send().await?.json::<Value>().await?;

    // store order, unchanged between reads
    assert_eq!(first, users);
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn e2e_empty_store_lists_empty_array() -> anyhow::Result<()> {
    let app = start_server().await?;
    let body = client()
        .get(format!("{}/users", app.base_url))
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(body, json!([]));
    Ok(())
}

#[tokio::test]
async fn e2e_create_rejects_missing_fields() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();

    for body in [
        json!({}),
        json!({"name": "", "email": "a@x.com", "age": 1}),
        json!({"name": "Alice", "email": "", "age": 1}),
        json!({"name": "Alice", "email": "a@x.com"}),
    ] {
        let res = c.post(format!("{}/users", app.base_url)).json(&body).send().await?;
        assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST, "body: {body}");
        let err = res.json::<Value>().await?;
        assert_eq!(err, json!({"error": "Missing name, email, or age"}));
    }

    // nothing was persisted
    let list = c.get(format!("{}/users", app.base_url)).send().await?.json::<Value>().await?;
    assert_eq!(list, json!([]));
    Ok(())
}

#[tokio::test]
async fn e2e_age_zero_is_valid() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client()
        .post(format!("{}/users", app.base_url))
        .json(&json!({"name": "Baby", "email": "baby@x.com", "age": 0}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["age"], json!(0));
    Ok(())
}

#[tokio::test]
async fn e2e_put_merges_partial_body() -> anyhow::Result<()> {
    let app = start_server().await?;
    seed(
        &app,
        &json!([{"id": "1", "name": "John Doe", "email": "john@example.com", "age": 30}]),
    )
    .await?;

    let res = client()
        .put(format!("{}/users/1", app.base_url))
        .json(&json!({"age": 40}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(
        body,
        json!({"id": "1", "name": "John Doe", "email": "john@example.com", "age": 40})
    );

    // the persisted file reflects the same record
    assert_eq!(persisted(&app).await?, json!([body]));
    Ok(())
}

#[tokio::test]
async fn e2e_put_with_empty_body_changes_nothing() -> anyhow::Result<()> {
    let app = start_server().await?;
    let record = json!({"id": "1", "name": "John Doe", "email": "john@example.com", "age": 30});
    seed(&app, &json!([record])).await?;

    let res = client()
        .put(format!("{}/users/1", app.base_url))
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    assert_eq!(res.json::<Value>().await?, record);
    assert_eq!(persisted(&app).await?, json!([record]));
    Ok(())
}

#[tokio::test]
async fn e2e_unknown_id_is_404_and_store_untouched() -> anyhow::Result<()> {
    let app = start_server().await?;
    seed(
        &app,
        &json!([{"id": "1", "name": "John Doe", "email": "john@example.com", "age": 30}]),
    )
    .await?;
    let before = tokio::fs::read(&app.store_path).await?;

    let c = client();
    let get = c.get(format!("{}/users/999", app.base_url)).send().await?;
    let put = c
        .put(format!("{}/users/999", app.base_url))
        .json(&json!({"age": 1}))
        .send()
        .await?;
    let del = c.delete(format!("{}/users/999", app.base_url)).send().await?;

    for res in [get, put, del] {
        assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);
        assert_eq!(res.json::<Value>().await?, json!({"error": "User not found"}));
    }

    // byte-identical store document
    let after = tokio::fs::read(&app.store_path).await?;
    assert_eq!(before, after);
    Ok(())
}

#[tokio::test]
async fn e2e_delete_returns_removed_and_preserves_order() -> anyhow::Result<()> {
    let app = start_server().await?;
    let first = json!({"id": "1", "name": "First", "email": "first@x.com", "age": 10});
    let second = json!({"id": "2", "name": "Second", "email": "second@x.com", "age": 20});
    seed(&app, &json!([first, second])).await?;

    let c = client();
    let res = c.delete(format!("{}/users/1", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    // the deleted record comes back with its pre-deletion contents
    assert_eq!(res.json::<Value>().await?, first);

    let list = c.get(format!("{}/users", app.base_url)).send().await?.json::<Value>().await?;
    assert_eq!(list, json!([second]));
    assert_eq!(persisted(&app).await?, json!([second]));
    Ok(())
}

#[tokio::test]
async fn e2e_persisted_document_is_pretty_printed() -> anyhow::Result<()> {
    let app = start_server().await?;
    client()
        .post(format!("{}/users", app.base_url))
        .json(&json!({"name": "Alice", "email": "a@x.com", "age": 28}))
        .send()
        .await?;

    let text = tokio::fs::read_to_string(&app.store_path).await?;
    // two-space indented array of objects, fields in declaration order
    assert!(text.starts_with("[\n  {\n    \"id\""), "document was: {text}");
    let id_at = text.find("\"id\"").expect("id field");
    let name_at = text.find("\"name\"").expect("name field");
    let email_at = text.find("\"email\"").expect("email field");
    let age_at = text.find("\"age\"").expect("age field");
    assert!(id_at < name_at && name_at < email_at && email_at < age_at);
    Ok(())
}
