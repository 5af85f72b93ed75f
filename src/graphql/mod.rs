//! GraphQL surface for CQL.
//!
//! Wires the object type registry, the dataset loader, and the change
//! publisher into an `async-graphql` dynamic schema.
//!
//! ## Example
//!
//! ```graphql
//! # Current snapshot of teams.json
//! { teams { name captain { name } } }
//!
//! # Live changes
//! subscription { teamChanged { name } }
//! ```

pub mod query;
pub mod subscription;
pub mod types;

use async_graphql::dynamic::Schema;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::dataset::{DatasetLoader, DatasetOptions};
use crate::error::{CqlError, Result};
use crate::events::ChangePublisher;
use crate::schema::{ObjectTypeRegistry, TypeDescriptorStore};
use query::{build_query, QUERY_TYPE};
use subscription::{build_subscription, SUBSCRIPTION_TYPE};
use types::build_object;

/// The synthesized schema type
pub type CqlSchema = Schema;

/// Query cost limits applied to the schema.
#[derive(Debug, Clone, Copy)]
pub struct SchemaLimits {
    pub max_depth: usize,
    pub max_complexity: usize,
}

impl From<&Config> for SchemaLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_depth: config.max_depth,
            max_complexity: config.max_complexity,
        }
    }
}

impl Default for SchemaLimits {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Build the GraphQL schema over the loaded collections.
pub fn build_schema(
    registry: &ObjectTypeRegistry,
    loader: &Arc<DatasetLoader>,
    limits: &SchemaLimits,
) -> Result<CqlSchema> {
    if loader.collections().next().is_none() {
        return Err(CqlError::Schema(format!(
            "no collection data files in {}",
            loader.dir().display()
        )));
    }

    let mut builder = Schema::build(QUERY_TYPE, None, Some(SUBSCRIPTION_TYPE))
        .register(build_query(registry, loader)?)
        .register(build_subscription(registry, loader)?);
    for object in registry.iter() {
        builder = builder.register(build_object(object, loader));
    }

    builder
        .limit_depth(limits.max_depth)
        .limit_complexity(limits.max_complexity)
        .finish()
        .map_err(|e| CqlError::Schema(e.to_string()))
}

/// Everything a running server needs.
#[derive(Clone)]
pub struct CqlApi {
    pub schema: CqlSchema,
    pub registry: Arc<ObjectTypeRegistry>,
    pub loader: Arc<DatasetLoader>,
}

impl CqlApi {
    pub fn publisher(&self) -> &Arc<ChangePublisher> {
        self.loader.publisher()
    }

    /// Schema in SDL form.
    pub fn sdl(&self) -> String {
        self.schema.sdl()
    }

    pub async fn execute(&self, query: &str) -> String {
        execute(&self.schema, query).await
    }
}

/// Startup pipeline: descriptors → registry → datasets → schema.
///
/// Any descriptor or data error aborts the build.
pub fn build_api(config: &Config) -> Result<CqlApi> {
    let store = TypeDescriptorStore::load(&config.schema_path())?;
    let registry = Arc::new(ObjectTypeRegistry::build(&store)?);

    let publisher = Arc::new(ChangePublisher::new());
    let options = DatasetOptions {
        extension: config.data_extension.clone(),
    };
    let loader = Arc::new(DatasetLoader::load(&config.data_dir, &options, publisher)?);

    let schema = build_schema(&registry, &loader, &SchemaLimits::from(config))?;
    info!(
        types = registry.len(),
        collections = loader.collections().count(),
        "graphql schema built"
    );

    Ok(CqlApi {
        schema,
        registry,
        loader,
    })
}

/// Execute a GraphQL query and return JSON result
pub async fn execute(schema: &CqlSchema, query: &str) -> String {
    let result = schema.execute(query).await;
    serde_json::to_string_pretty(&result).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeKind;
    use futures::StreamExt;
    use serde_json::{json, Value};
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    fn write_project(dir: &Path, schema: &str, files: &[(&str, &str)]) -> Config {
        fs::write(dir.join(".schema.json"), schema).unwrap();
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
        Config {
            data_dir: dir.to_path_buf(),
            ..Config::default()
        }
    }

    async fn run(api: &CqlApi, query: &str) -> Value {
        let response = api.schema.execute(query).await;
        assert!(response.errors.is_empty(), "errors: {:?}", response.errors);
        response.data.into_json().unwrap()
    }

    #[tokio::test]
    async fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_project(
            dir.path(),
            r#"{"team":{"type":"Object","fields":{"name":{"type":"String"}}}}"#,
            &[("teams.json", r#"[{"id":"1","name":"Red"}]"#)],
        );
        let api = build_api(&config).unwrap();

        let data = run(&api, "{ teams { name } }").await;
        assert_eq!(data, json!({ "teams": [{ "name": "Red" }] }));

        // `id` is not declared, so it is not queryable.
        let response = api.schema.execute("{ teams { id } }").await;
        assert!(!response.errors.is_empty());
    }

    #[tokio::test]
    async fn test_forward_reference_and_lookup_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_project(
            dir.path(),
            r#"{
                "team": { "fields": {
                    "name": "String",
                    "captain": "player",
                    "players": { "type": "Array", "of": "player" }
                } },
                "player": { "fields": { "id": "Id", "name": "String", "team": "team" } }
            }"#,
            &[
                (
                    "teams.json",
                    r#"[{"id":"1","name":"Red","captain":{"name":"Ann"},"players":[10, 11, 99]}]"#,
                ),
                ("players.json", r#"[{"id":10,"name":"Bo","team":"1"},{"id":11,"name":"Cy"}]"#),
            ],
        );
        let api = build_api(&config).unwrap();

        let data = run(&api, "{ teams { captain { name } players { id name team { name } } } }").await;
        assert_eq!(
            data,
            json!({ "teams": [{
                "captain": { "name": "Ann" },
                "players": [
                    { "id": "10", "name": "Bo", "team": { "name": "Red" } },
                    { "id": "11", "name": "Cy", "team": null },
                    null
                ]
            }] })
        );
    }

    #[tokio::test]
    async fn test_scalar_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_project(
            dir.path(),
            r#"{"team":{"fields":{"wins":"Int"}}}"#,
            &[("teams.json", r#"[{"id":"1","wins":"many"}]"#)],
        );
        let api = build_api(&config).unwrap();
        let response = api.schema.execute("{ teams { wins } }").await;
        assert!(!response.errors.is_empty());
    }

    #[test]
    fn test_sdl_lists_collection_fields() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_project(
            dir.path(),
            r#"{"team":{"description":"A club","fields":{"name":"String"}}}"#,
            &[("teams.json", "[]")],
        );
        let sdl = build_api(&config).unwrap().sdl();
        assert!(sdl.contains("type Team"));
        assert!(sdl.contains("teams: [Team]"));
        assert!(sdl.contains("teamAdded: Team"));
        assert!(sdl.contains("teamChanged: Team"));
        assert!(sdl.contains("teamDeleted: Team"));
    }

    #[test]
    fn test_collection_without_type_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_project(
            dir.path(),
            r#"{"team":{"fields":{"name":"String"}}}"#,
            &[("teams.json", "[]"), ("coaches.json", "[]")],
        );
        assert!(matches!(
            build_api(&config),
            Err(CqlError::UnknownCollectionType { .. })
        ));
    }

    #[test]
    fn test_unresolved_field_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_project(
            dir.path(),
            r#"{"team":{"fields":{"coach":"coach"}}}"#,
            &[("teams.json", "[]")],
        );
        assert!(matches!(
            build_api(&config),
            Err(CqlError::UnresolvedFieldType { .. })
        ));
    }

    #[test]
    fn test_empty_data_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_project(dir.path(), r#"{"team":{"fields":{"name":"String"}}}"#, &[]);
        assert!(matches!(build_api(&config), Err(CqlError::Schema(_))));
    }

    #[test]
    fn test_root_named_entity_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_project(
            dir.path(),
            r#"{"query":{"fields":{"text":"String"}}}"#,
            &[("queries.json", r#"[{"id":"1","text":"hi"}]"#)],
        );
        match build_api(&config) {
            Err(CqlError::Descriptor { name, .. }) => assert_eq!(name, "query"),
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("expected a descriptor error"),
        }
    }

    #[test]
    fn test_scalar_named_entity_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_project(
            dir.path(),
            r#"{"string":{"fields":{"text":"String"}}}"#,
            &[("strings.json", "[]")],
        );
        assert!(matches!(build_api(&config), Err(CqlError::Descriptor { .. })));
    }

    #[test]
    fn test_entity_without_fields_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_project(
            dir.path(),
            r#"{"team":{"fields":{"name":"String"}},"coach":{"type":"Object"}}"#,
            &[("teams.json", "[]")],
        );
        match build_api(&config) {
            Err(CqlError::Descriptor { name, .. }) => assert_eq!(name, "coach"),
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("expected a descriptor error"),
        }
    }

    #[test]
    fn test_non_identifier_file_name_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_project(
            dir.path(),
            r#"{"team_member":{"fields":{"name":"String"}}}"#,
            &[("team-members.json", "[]")],
        );
        assert!(matches!(build_api(&config), Err(CqlError::DataLoad { .. })));
    }

    #[test]
    fn test_sdl_hides_file_system_paths() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_project(
            dir.path(),
            r#"{"team":{"fields":{"name":"String"}}}"#,
            &[("teams.json", "[]")],
        );
        let sdl = build_api(&config).unwrap().sdl();
        assert!(sdl.contains("Records of the `teams` collection"));
        assert!(!sdl.contains(&dir.path().display().to_string()));
        assert!(!sdl.contains("teams.json"));
    }

    #[tokio::test]
    async fn test_subscription_receives_reload_events() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_project(
            dir.path(),
            r#"{"team":{"fields":{"name":"String"}}}"#,
            &[("teams.json", r#"[{"id":"1","name":"Red"}]"#)],
        );
        let api = build_api(&config).unwrap();
        let mut stream = Box::pin(api.schema.execute_stream("subscription { teamChanged { name } }"));

        let trigger = async {
            while api.publisher().subscriber_count("team", ChangeKind::Changed) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            fs::write(dir.path().join("teams.json"), r#"[{"id":"1","name":"Blue"}]"#).unwrap();
            api.loader.reload("teams").unwrap();
        };

        let (response, _) = tokio::join!(
            tokio::time::timeout(Duration::from_secs(5), stream.next()),
            tokio::time::timeout(Duration::from_secs(5), trigger),
        );
        let response = response.unwrap().unwrap();
        assert!(response.errors.is_empty());
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({ "teamChanged": { "name": "Blue" } })
        );

        // Query results follow the reload.
        let data = run(&api, "{ teams { name } }").await;
        assert_eq!(data, json!({ "teams": [{ "name": "Blue" }] }));
    }
}
