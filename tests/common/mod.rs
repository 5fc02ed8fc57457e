//! Common test utilities for all integration tests.
//!
//! Provides [`FakeGateway`], an in-memory stand-in for the remote platform that
//! records every call and behaves like the platform for the resources the
//! provisioning flow touches.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use ci_provision::errors::{Error, Result};
use ci_provision::platform::{
    Identity, OneOrMany, QueryResult, RemoteError, RemoteResourceGateway, ResourceKind, SaveResult,
};
use serde_json::{json, Value};

pub const USER_ID: &str = "005000000000001AAA";
pub const USERNAME: &str = "ci@example.org";
pub const CONSUMER_KEY: &str = "3MVG9_FAKE_CONSUMER_KEY";

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    MetadataRead { kind: ResourceKind, identifier: String },
    MetadataCreate { kind: ResourceKind, record: Value },
    MetadataDelete { kind: ResourceKind, identifier: String },
    Query(String),
    Identity,
    RecordCreate { kind: ResourceKind, fields: Value },
}

pub fn remote_error(status_code: &str, message: &str) -> RemoteError {
    RemoteError {
        fields: OneOrMany::One("Name".to_string()),
        message: message.to_string(),
        status_code: status_code.to_string(),
    }
}

#[derive(Default)]
struct FakeState {
    connected_apps: HashMap<String, Value>,
    permission_sets: HashMap<String, String>,
    assignments: HashSet<(String, String)>,
    /// Permission sets the COUNT probe does not see yet
    hidden_permission_sets: HashSet<String>,
    permission_set_create_error: Option<RemoteError>,
    assignment_error: Option<RemoteError>,
    connected_app_create_error: Option<RemoteError>,
    fail_delete: bool,
    omit_consumer_key: bool,
    next_id: u32,
}

/// Recording in-memory platform
pub struct FakeGateway {
    calls: Mutex<Vec<Call>>,
    state: Mutex<FakeState>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self { calls: Mutex::new(Vec::new()), state: Mutex::new(FakeState::default()) }
    }

    pub fn with_connected_app(self, identifier: &str) -> Self {
        self.state.lock().unwrap().connected_apps.insert(
            identifier.to_string(),
            json!({ "fullName": identifier, "oauthConfig": { "consumerKey": "OLD_KEY" } }),
        );
        self
    }

    pub fn with_permission_set(self, identifier: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = format!("0PS{:012}", state.next_id);
            state.next_id += 1;
            state.permission_sets.insert(identifier.to_string(), id);
        }
        self
    }

    /// A permission set created by someone else between probe and create
    pub fn with_concurrently_created_permission_set(self, identifier: &str) -> Self {
        let gateway = self.with_permission_set(identifier);
        gateway.state.lock().unwrap().hidden_permission_sets.insert(identifier.to_string());
        gateway
    }

    pub fn with_assignment(self, identifier: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = state.permission_sets.get(identifier).cloned().unwrap_or_default();
            state.assignments.insert((id, USER_ID.to_string()));
        }
        self
    }

    pub fn failing_permission_set_create(self, error: RemoteError) -> Self {
        self.state.lock().unwrap().permission_set_create_error = Some(error);
        self
    }

    pub fn failing_assignment(self, error: RemoteError) -> Self {
        self.state.lock().unwrap().assignment_error = Some(error);
        self
    }

    pub fn failing_connected_app_create(self, error: RemoteError) -> Self {
        self.state.lock().unwrap().connected_app_create_error = Some(error);
        self
    }

    pub fn failing_delete(self) -> Self {
        self.state.lock().unwrap().fail_delete = true;
        self
    }

    /// Created connected apps come back without a consumer key
    pub fn without_consumer_key(self) -> Self {
        self.state.lock().unwrap().omit_consumer_key = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn creates(&self, kind: ResourceKind) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::MetadataCreate { kind: k, record } if k == kind => Some(record),
                Call::RecordCreate { kind: k, fields } if k == kind => Some(fields),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self, kind: ResourceKind) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::MetadataDelete { kind: k, identifier } if k == kind => Some(identifier),
                _ => None,
            })
            .collect()
    }

    /// Index of the first call matching `predicate`
    pub fn position(&self, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls().iter().position(predicate)
    }

    pub fn connected_app(&self, identifier: &str) -> Option<Value> {
        self.state.lock().unwrap().connected_apps.get(identifier).cloned()
    }

    pub fn assignment_count(&self) -> usize {
        self.state.lock().unwrap().assignments.len()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

/// The literal in `... WHERE Name = '<identifier>'`
fn quoted_literal(soql: &str) -> Option<String> {
    let start = soql.find('\'')? + 1;
    let end = soql[start..].find('\'')? + start;
    Some(soql[start..end].to_string())
}

#[async_trait]
impl RemoteResourceGateway for FakeGateway {
    async fn metadata_read(&self, kind: ResourceKind, identifier: &str) -> Result<Option<Value>> {
        self.record(Call::MetadataRead { kind, identifier: identifier.to_string() });
        let state = self.state.lock().unwrap();
        match kind {
            ResourceKind::ConnectedApp => Ok(state.connected_apps.get(identifier).cloned()),
            _ => Ok(None),
        }
    }

    async fn metadata_create(&self, kind: ResourceKind, record: Value) -> Result<SaveResult> {
        self.record(Call::MetadataCreate { kind, record: record.clone() });
        let mut state = self.state.lock().unwrap();
        let full_name = record["fullName"].as_str().unwrap_or_default().to_string();

        match kind {
            ResourceKind::PermissionSet => {
                if let Some(error) = state.permission_set_create_error.clone() {
                    return Ok(SaveResult::failed(vec![error]));
                }
                if state.permission_sets.contains_key(&full_name) {
                    return Ok(SaveResult::failed(vec![remote_error(
                        "DUPLICATE_DEVELOPER_NAME",
                        "The name is already in use",
                    )]));
                }
                let id = format!("0PS{:012}", state.next_id);
                state.next_id += 1;
                state.permission_sets.insert(full_name.clone(), id);
                Ok(SaveResult::succeeded(full_name))
            }
            ResourceKind::ConnectedApp => {
                if let Some(error) = state.connected_app_create_error.clone() {
                    return Err(Error::remote("Create ConnectedApp", vec![error]));
                }
                if state.connected_apps.contains_key(&full_name) {
                    return Ok(SaveResult::failed(vec![remote_error(
                        "DUPLICATE_VALUE",
                        "duplicate value found",
                    )]));
                }
                let mut stored = record;
                if !state.omit_consumer_key {
                    stored["oauthConfig"]["consumerKey"] = json!(CONSUMER_KEY);
                }
                state.connected_apps.insert(full_name.clone(), stored);
                Ok(SaveResult::succeeded(full_name))
            }
            ResourceKind::PermissionSetAssignment => {
                Err(Error::internal("assignments are data records"))
            }
        }
    }

    async fn metadata_delete(&self, kind: ResourceKind, identifier: &str) -> Result<SaveResult> {
        self.record(Call::MetadataDelete { kind, identifier: identifier.to_string() });
        let mut state = self.state.lock().unwrap();
        if state.fail_delete {
            return Err(Error::transport("connection reset by peer"));
        }
        match state.connected_apps.remove(identifier) {
            Some(_) => Ok(SaveResult::succeeded(identifier)),
            None => Ok(SaveResult::failed(vec![remote_error("NOT_FOUND", "no such component")])),
        }
    }

    async fn query(&self, soql: &str) -> Result<QueryResult> {
        self.record(Call::Query(soql.to_string()));
        let state = self.state.lock().unwrap();
        let name = quoted_literal(soql).unwrap_or_default();
        let id = state.permission_sets.get(&name);

        if soql.contains("COUNT()") {
            let visible = id.is_some() && !state.hidden_permission_sets.contains(&name);
            return Ok(QueryResult::count(u64::from(visible)));
        }
        Ok(QueryResult::with_records(
            id.map(|id| vec![json!({ "Id": id, "Name": name })]).unwrap_or_default(),
        ))
    }

    async fn identity(&self) -> Result<Identity> {
        self.record(Call::Identity);
        Ok(Identity { user_id: USER_ID.to_string(), username: USERNAME.to_string() })
    }

    async fn record_create(&self, kind: ResourceKind, fields: Value) -> Result<SaveResult> {
        self.record(Call::RecordCreate { kind, fields: fields.clone() });
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.assignment_error.clone() {
            return Err(Error::remote("Create PermissionSetAssignment", vec![error]));
        }

        let key = (
            fields["PermissionSetId"].as_str().unwrap_or_default().to_string(),
            fields["AssigneeId"].as_str().unwrap_or_default().to_string(),
        );
        if !state.assignments.insert(key) {
            return Err(Error::remote(
                "Create PermissionSetAssignment",
                vec![remote_error("DUPLICATE_VALUE", "duplicate value found: AssigneeId")],
            ));
        }
        Ok(SaveResult {
            success: true,
            full_name: Some("0Pa000000000001".to_string()),
            errors: Default::default(),
        })
    }
}
