//! In-memory resource API and object fixtures

use crate::resource::{
    ApiResource, ItemIdentity, ListOptions, LogOptions, ResourceApi, ResourceList,
};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct ListCall {
    pub plural: String,
    pub scope: String,
    pub options: ListOptions,
}

/// Replays queued responses in order; an empty queue answers with an error
#[derive(Default)]
pub struct MockApi {
    lists: RefCell<VecDeque<Result<ResourceList, String>>>,
    logs: RefCell<VecDeque<Result<String, String>>>,
    list_calls: RefCell<Vec<ListCall>>,
    log_calls: RefCell<Vec<(ItemIdentity, LogOptions)>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a list response without a `kind`
    pub fn push_list(&self, items: Vec<Value>) {
        self.lists.borrow_mut().push_back(Ok(ResourceList { kind: None, items }));
    }

    pub fn push_typed_list(&self, kind: &str, items: Vec<Value>) {
        self.lists.borrow_mut().push_back(Ok(ResourceList {
            kind: Some(kind.to_string()),
            items,
        }));
    }

    pub fn push_error(&self, message: &str) {
        self.lists.borrow_mut().push_back(Err(message.to_string()));
    }

    pub fn push_logs(&self, text: &str) {
        self.logs.borrow_mut().push_back(Ok(text.to_string()));
    }

    pub fn push_log_error(&self, message: &str) {
        self.logs.borrow_mut().push_back(Err(message.to_string()));
    }

    pub fn list_calls(&self) -> Vec<ListCall> {
        self.list_calls.borrow().clone()
    }

    pub fn log_calls(&self) -> Vec<(ItemIdentity, LogOptions)> {
        self.log_calls.borrow().clone()
    }
}

impl ResourceApi for MockApi {
    fn fetch_list(
        &self,
        resource: &ApiResource,
        scope: &str,
        options: &ListOptions,
    ) -> anyhow::Result<ResourceList> {
        self.list_calls.borrow_mut().push(ListCall {
            plural: resource.plural.clone(),
            scope: scope.to_string(),
            options: options.clone(),
        });
        match self.lists.borrow_mut().pop_front() {
            Some(Ok(list)) => Ok(list),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("no list response queued")),
        }
    }

    fn fetch_log_stream(&self, item: &ItemIdentity, options: &LogOptions) -> anyhow::Result<String> {
        self.log_calls
            .borrow_mut()
            .push((item.clone(), options.clone()));
        match self.logs.borrow_mut().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("no log response queued")),
        }
    }
}

/// A running pod with a single `app` container
pub fn pod(namespace: &str, name: &str) -> Value {
    pod_with_containers(namespace, name, &["app"])
}

pub fn pod_with_containers(namespace: &str, name: &str, containers: &[&str]) -> Value {
    let containers: Vec<Value> = containers
        .iter()
        .map(|c| json!({"name": c, "image": format!("registry.local/{}:1.0", c)}))
        .collect();
    json!({
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": format!("uid-{}", name),
            "creationTimestamp": "2024-01-01T00:00:00Z"
        },
        "spec": {"nodeName": "node-1", "containers": containers},
        "status": {"phase": "Running", "podIP": "10.0.0.7"}
    })
}
