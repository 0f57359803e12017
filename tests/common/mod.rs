//! Shared test models and mock infrastructure.

#![allow(dead_code)]

pub mod mock_api;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use kendb3_runtime::api::error::TransportError;
use kendb3_runtime::{
    ApiPacket, EntityId, FetchTransport, HostPage, IdSelector, Model, ModelRef, RefAssignment,
    RefIds, ResolveTarget, ViewError, ViewHandler, ViewTitle,
};

// -- Test models --------------------------------------------------------------

/// A database editor or submitter.
#[derive(Debug, Default)]
pub struct Profile {
    pub id: EntityId,
    pub display_name: String,
}

impl Model for Profile {
    const MODEL_NAME: &'static str = "profiles";

    fn stub(id: EntityId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn merge(&mut self, attrs: &Map<String, Value>) {
        if let Some(name) = attrs.get("display_name").and_then(Value::as_str) {
            self.display_name = name.to_string();
        }
    }
}

/// A submission with references into the profile collection.
#[derive(Debug, Default)]
pub struct Submission {
    pub id: EntityId,
    pub name: String,
    pub revision_string: String,
    pub author_id: Option<EntityId>,
    pub author: Option<ModelRef<Profile>>,
    pub playtester_ids: Vec<EntityId>,
    pub playtesters: Option<Vec<ModelRef<Profile>>>,
}

impl Model for Submission {
    const MODEL_NAME: &'static str = "submissions";

    fn stub(id: EntityId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn merge(&mut self, attrs: &Map<String, Value>) {
        if let Some(name) = attrs.get("name").and_then(Value::as_str) {
            self.name = name.to_string();
        }
        if let Some(rev) = attrs.get("revision_string").and_then(Value::as_str) {
            self.revision_string = rev.to_string();
        }
        if let Some(author) = attrs.get("author_id") {
            self.author_id = author.as_i64();
        }
        if let Some(ids) = attrs.get("playtester_ids").and_then(Value::as_array) {
            self.playtester_ids = ids.iter().filter_map(Value::as_i64).collect();
        }
    }
}

impl ResolveTarget<Profile> for Submission {
    fn ref_ids(&self, source_field: &str) -> RefIds {
        match source_field {
            "author_id" => RefIds::One(self.author_id),
            "playtester_ids" => RefIds::Many(self.playtester_ids.clone()),
            other => panic!("unexpected source field '{other}'"),
        }
    }

    fn ref_is_set(&self, target_field: &str) -> bool {
        match target_field {
            "author" => self.author.is_some(),
            "playtester" => self.playtesters.is_some(),
            other => panic!("unexpected target field '{other}'"),
        }
    }

    fn set_ref(&mut self, target_field: &str, value: RefAssignment<Profile>) {
        match (target_field, value) {
            ("author", RefAssignment::One(profile)) => self.author = Some(profile),
            ("playtester", RefAssignment::Many(profiles)) => self.playtesters = Some(profiles),
            (other, _) => panic!("unexpected assignment to '{other}'"),
        }
    }
}

// -- Packet helpers -----------------------------------------------------------

/// Build a packet from `json!` instance objects.
pub fn packet(instances: &[Value], last_modified: &str, dump: bool) -> ApiPacket {
    ApiPacket {
        instances: instances
            .iter()
            .map(|v| {
                v.as_object()
                    .expect("packet instances must be JSON objects")
                    .clone()
            })
            .collect(),
        last_modified: last_modified.to_string(),
        dump,
    }
}

pub fn submission_inst(id: EntityId, name: &str) -> Value {
    json!({"id": id, "name": name, "revision_string": "1.0"})
}

pub fn profile_inst(id: EntityId, display_name: &str) -> Value {
    json!({"id": id, "display_name": display_name})
}

// -- Scripted transport -------------------------------------------------------

/// A request the transport saw, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub model: String,
    pub ids: IdSelector,
    pub fields: String,
}

struct ScriptedResponse {
    result: Result<ApiPacket, TransportError>,
    delay: Duration,
}

/// Transport returning scripted responses in order, recording every request.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_packet(&self, packet: ApiPacket) {
        self.push_packet_delayed(packet, Duration::ZERO);
    }

    pub fn push_packet_delayed(&self, packet: ApiPacket, delay: Duration) {
        self.responses.lock().push_back(ScriptedResponse {
            result: Ok(packet),
            delay,
        });
    }

    pub fn push_error(&self, error: TransportError) {
        self.responses.lock().push_back(ScriptedResponse {
            result: Err(error),
            delay: Duration::ZERO,
        });
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl FetchTransport for MockTransport {
    async fn fetch(
        &self,
        model: &str,
        ids: &IdSelector,
        fields: &str,
    ) -> Result<ApiPacket, TransportError> {
        self.requests.lock().push(RecordedRequest {
            model: model.to_string(),
            ids: ids.clone(),
            fields: fields.to_string(),
        });
        let scripted = self
            .responses
            .lock()
            .pop_front()
            .expect("MockTransport: no scripted response left");
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        scripted.result
    }
}

// -- Fake host page -----------------------------------------------------------

/// In-memory [`HostPage`]: location, history log, title log and a counter
/// of mount replacements.
pub struct FakePage {
    path: Mutex<String>,
    pub pushed: Mutex<Vec<String>>,
    pub titles: Mutex<Vec<String>>,
    mount_serial: AtomicUsize,
}

impl FakePage {
    pub fn at(path: &str) -> Arc<Self> {
        Arc::new(Self {
            path: Mutex::new(path.to_string()),
            pushed: Mutex::new(Vec::new()),
            titles: Mutex::new(Vec::new()),
            mount_serial: AtomicUsize::new(0),
        })
    }

    pub fn relocate(&self, path: &str) {
        *self.path.lock() = path.to_string();
    }

    pub fn mounts_created(&self) -> usize {
        self.mount_serial.load(Ordering::SeqCst)
    }
}

impl HostPage for FakePage {
    type Mount = usize;

    fn current_path(&self) -> String {
        self.path.lock().clone()
    }

    fn push_history(&self, path: &str) {
        self.pushed.lock().push(path.to_string());
        self.relocate(path);
    }

    fn set_title(&self, title: &str) {
        self.titles.lock().push(title.to_string());
    }

    fn reset_mount(&self) -> usize {
        self.mount_serial.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Handler that counts installs and returns a fixed title.
pub struct RecordingView {
    pub title: &'static str,
    installs: AtomicUsize,
}

impl RecordingView {
    pub fn new(title: &'static str) -> Arc<Self> {
        Arc::new(Self {
            title,
            installs: AtomicUsize::new(0),
        })
    }

    pub fn install_count(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ViewHandler<FakePage> for RecordingView {
    async fn install(
        &self,
        _page: &FakePage,
        _mount: &usize,
        _subpath: &str,
    ) -> Result<ViewTitle, ViewError> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(ViewTitle::new(self.title))
    }
}

/// A clickable node chain for interception tests.
pub struct ClickNode<'a> {
    href: Option<String>,
    parent: Option<&'a ClickNode<'a>>,
}

impl<'a> ClickNode<'a> {
    pub fn link(href: &str) -> Self {
        Self {
            href: Some(href.to_string()),
            parent: None,
        }
    }

    pub fn unlinked() -> Self {
        Self {
            href: None,
            parent: None,
        }
    }

    pub fn child_of(parent: &'a ClickNode<'a>) -> Self {
        Self {
            href: None,
            parent: Some(parent),
        }
    }
}

impl kendb3_runtime::NavTarget for ClickNode<'_> {
    fn nav_href(&self) -> Option<String> {
        self.href.clone()
    }

    fn parent(&self) -> Option<&dyn kendb3_runtime::NavTarget> {
        self.parent.map(|p| p as &dyn kendb3_runtime::NavTarget)
    }
}
