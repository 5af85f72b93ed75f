//! End-to-end: descriptor + data files → schema → queries → reloads →
//! subscription events.

use cql::{build_api, ChangeKind, Config, CqlApi};
use futures::StreamExt;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::time::Duration;

const TEAM_SCHEMA: &str = r#"{
    "team": {
        "type": "Object",
        "description": "A club",
        "fields": {
            "name": { "type": "String" },
            "captain": { "type": "player" }
        }
    },
    "player": { "type": "Object", "fields": { "name": "String" } }
}"#;

fn project(dir: &Path, teams: &str) -> CqlApi {
    fs::write(dir.join(".schema.json"), TEAM_SCHEMA).unwrap();
    fs::write(dir.join("teams.json"), teams).unwrap();
    fs::write(dir.join("players.json"), r#"[{"id":"p1","name":"Ann"}]"#).unwrap();
    build_api(&Config {
        data_dir: dir.to_path_buf(),
        watch: false,
        ..Config::default()
    })
    .unwrap()
}

async fn query(api: &CqlApi, document: &str) -> Value {
    let response = api.schema.execute(document).await;
    assert!(response.errors.is_empty(), "errors: {:?}", response.errors);
    response.data.into_json().unwrap()
}

/// Drain `stream` until it stays quiet for a short while.
async fn collect<S>(stream: &mut S) -> Vec<Value>
where
    S: futures::Stream<Item = async_graphql::Response> + Unpin,
{
    let mut out = Vec::new();
    while let Ok(Some(response)) = tokio::time::timeout(Duration::from_millis(200), stream.next()).await {
        assert!(response.errors.is_empty(), "errors: {:?}", response.errors);
        out.push(response.data.into_json().unwrap());
    }
    out
}

/// Poll a subscription until its resolver has attached to the channel.
async fn attach<S>(api: &CqlApi, stream: &mut S, kind: ChangeKind)
where
    S: futures::Stream<Item = async_graphql::Response> + Unpin,
{
    let before = api.publisher().subscriber_count("team", kind);
    tokio::time::timeout(Duration::from_secs(5), async {
        while api.publisher().subscriber_count("team", kind) == before {
            let _ = tokio::time::timeout(Duration::from_millis(5), stream.next()).await;
        }
    })
    .await
    .expect("subscription never attached");
}

#[tokio::test]
async fn test_query_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let api = project(dir.path(), r#"[{"id":"1","name":"Red","captain":"p1"}]"#);

    let data = query(&api, "{ teams { name captain { name } } players { name } }").await;
    assert_eq!(
        data,
        json!({
            "teams": [{ "name": "Red", "captain": { "name": "Ann" } }],
            "players": [{ "name": "Ann" }]
        })
    );
}

#[tokio::test]
async fn test_reload_publishes_changed_then_added() {
    let dir = tempfile::tempdir().unwrap();
    let api = project(dir.path(), r#"[{"id":"1","name":"Red"}]"#);

    let mut changed = Box::pin(api.schema.execute_stream("subscription { teamChanged { name } }"));
    let mut added = Box::pin(api.schema.execute_stream("subscription { teamAdded { name } }"));
    let mut deleted = Box::pin(api.schema.execute_stream("subscription { teamDeleted { name } }"));

    attach(&api, &mut changed, ChangeKind::Changed).await;
    attach(&api, &mut added, ChangeKind::Added).await;
    attach(&api, &mut deleted, ChangeKind::Deleted).await;

    fs::write(
        dir.path().join("teams.json"),
        r#"[{"id":"1","name":"Blue"},{"id":"2","name":"Green"}]"#,
    )
    .unwrap();
    let summary = api.loader.reload("teams").unwrap();
    assert_eq!((summary.added, summary.changed, summary.deleted), (1, 1, 0));

    assert_eq!(
        collect(&mut changed).await,
        vec![json!({ "teamChanged": { "name": "Blue" } })]
    );
    assert_eq!(
        collect(&mut added).await,
        vec![json!({ "teamAdded": { "name": "Green" } })]
    );
    assert!(collect(&mut deleted).await.is_empty());
}

#[tokio::test]
async fn test_events_carry_records_per_kind() {
    let dir = tempfile::tempdir().unwrap();
    let api = project(dir.path(), r#"[{"id":"1","name":"Red"}]"#);

    let mut changed = api.publisher().subscribe("team", ChangeKind::Changed).unwrap();
    let mut added = api.publisher().subscribe("team", ChangeKind::Added).unwrap();

    fs::write(
        dir.path().join("teams.json"),
        r#"[{"id":"1","name":"Blue"},{"id":"2","name":"Green"}]"#,
    )
    .unwrap();
    api.loader.reload("teams").unwrap();

    // Each channel holds exactly its own kind.
    let changed = changed.next().await.unwrap();
    let added = added.next().await.unwrap();
    assert_eq!(changed.record.id().as_str(), "1");
    assert_eq!(changed.record.get("name").unwrap(), "Blue");
    assert_eq!(added.record.id().as_str(), "2");
}

#[tokio::test]
async fn test_reload_publishes_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let api = project(dir.path(), r#"[{"id":"1","name":"A"},{"id":"2","name":"B"}]"#);

    let mut deleted = Box::pin(api.schema.execute_stream("subscription { teamDeleted { name } }"));
    attach(&api, &mut deleted, ChangeKind::Deleted).await;

    fs::write(dir.path().join("teams.json"), r#"[{"id":"2","name":"B"}]"#).unwrap();
    api.loader.reload("teams").unwrap();

    assert_eq!(
        collect(&mut deleted).await,
        vec![json!({ "teamDeleted": { "name": "A" } })]
    );
    assert_eq!(query(&api, "{ teams { name } }").await, json!({ "teams": [{ "name": "B" }] }));
}

#[tokio::test]
async fn test_late_subscriber_misses_earlier_reload() {
    let dir = tempfile::tempdir().unwrap();
    let api = project(dir.path(), "[]");

    fs::write(dir.path().join("teams.json"), r#"[{"id":"1","name":"Red"}]"#).unwrap();
    api.loader.reload("teams").unwrap();

    let mut late = Box::pin(api.schema.execute_stream("subscription { teamAdded { name } }"));
    assert!(collect(&mut late).await.is_empty());
}

#[tokio::test]
async fn test_unchanged_reload_publishes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let api = project(dir.path(), r#"[{"id":"1","name":"Red","rank":1}]"#);

    let mut changed = Box::pin(api.schema.execute_stream("subscription { teamChanged { name } }"));
    attach(&api, &mut changed, ChangeKind::Changed).await;

    // Same record, different key order.
    fs::write(dir.path().join("teams.json"), r#"[{"rank":1,"name":"Red","id":"1"}]"#).unwrap();
    let summary = api.loader.reload("teams").unwrap();
    assert_eq!(summary.changed, 0);
    assert!(collect(&mut changed).await.is_empty());
}

#[tokio::test]
async fn test_broken_reload_keeps_serving() {
    let dir = tempfile::tempdir().unwrap();
    let api = project(dir.path(), r#"[{"id":"1","name":"Red"}]"#);

    fs::write(dir.path().join("teams.json"), "[{").unwrap();
    assert!(api.loader.reload("teams").is_err());
    assert_eq!(query(&api, "{ teams { name } }").await, json!({ "teams": [{ "name": "Red" }] }));
}

#[tokio::test]
async fn test_large_reload_reaches_attached_subscriber() {
    let dir = tempfile::tempdir().unwrap();
    let api = project(dir.path(), "[]");

    let mut added = Box::pin(api.schema.execute_stream("subscription { teamAdded { name } }"));
    attach(&api, &mut added, ChangeKind::Added).await;

    let teams: Vec<Value> = (0..300)
        .map(|i| json!({ "id": i.to_string(), "name": format!("Team {}", i) }))
        .collect();
    fs::write(dir.path().join("teams.json"), Value::Array(teams).to_string()).unwrap();
    let summary = api.loader.reload("teams").unwrap();
    assert_eq!(summary.added, 300);

    let events = collect(&mut added).await;
    assert_eq!(events.len(), 300);
    assert_eq!(events[0], json!({ "teamAdded": { "name": "Team 0" } }));
    assert_eq!(events[299], json!({ "teamAdded": { "name": "Team 299" } }));
}
