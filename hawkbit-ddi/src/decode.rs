//! Decoding of controller API responses into resources
//!
//! Field access goes through `Node`, which owns the default policy:
//! absent (or `null`) optional fields take a documented default, while a
//! field that is present with the wrong type, or a missing required field,
//! aborts decoding of the document.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{Artifact, Chunk, Deployment, Stop};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{0}' cannot be empty")]
    EmptyField(String),

    #[error("field '{path}' should be {expected}")]
    InvalidType { path: String, expected: &'static str },

    #[error("link '{0}' has no href")]
    MissingHref(String),

    #[error("artifact '{0}' has no links")]
    NoLinks(String),
}

/// Typed view over an optional JSON value that remembers where it came from
struct Node<'a> {
    path: String,
    value: Option<&'a Value>,
}

impl<'a> Node<'a> {
    fn root(value: &'a Value) -> Self {
        Self {
            path: "$".to_owned(),
            value: Some(value),
        }
    }

    fn get(&self, key: &str) -> Node<'a> {
        Node {
            path: format!("{}.{key}", self.path),
            value: self.value.and_then(|v| v.get(key)),
        }
    }

    fn item(&self, idx: usize, value: &'a Value) -> Node<'a> {
        Node {
            path: format!("{}.{idx}", self.path),
            value: Some(value),
        }
    }

    fn path(&self) -> String {
        self.path.clone()
    }

    /// The value, treating `null` as absent
    fn present(&self) -> Option<&'a Value> {
        self.value.filter(|v| !v.is_null())
    }

    fn invalid(&self, expected: &'static str) -> DecodeError {
        DecodeError::InvalidType {
            path: self.path(),
            expected,
        }
    }

    fn opt_str(&self) -> Result<Option<&'a str>, DecodeError> {
        match self.present() {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(self.invalid("a string")),
        }
    }

    fn required_str(&self) -> Result<&'a str, DecodeError> {
        self.opt_str()?
            .ok_or_else(|| DecodeError::MissingField(self.path()))
    }

    fn non_empty_str(&self) -> Result<&'a str, DecodeError> {
        let s = self.required_str()?;
        if s.is_empty() {
            return Err(DecodeError::EmptyField(self.path()));
        }
        Ok(s)
    }

    fn str_or_default(&self) -> Result<&'a str, DecodeError> {
        Ok(self.opt_str()?.unwrap_or_default())
    }

    fn u64_or(&self, default: u64) -> Result<u64, DecodeError> {
        match self.present() {
            None => Ok(default),
            Some(v) => v.as_u64().ok_or_else(|| self.invalid("a non-negative integer")),
        }
    }

    fn object(&self) -> Result<Option<&'a Map<String, Value>>, DecodeError> {
        match self.present() {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(_) => Err(self.invalid("an object")),
        }
    }

    fn array(&self) -> Result<&'a [Value], DecodeError> {
        match self.present() {
            None => Ok(&[]),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(_) => Err(self.invalid("an array")),
        }
    }
}

/// Parse a response body into a JSON document
pub fn parse(body: &[u8]) -> Result<Value, DecodeError> {
    Ok(serde_json::from_slice(body)?)
}

/// Decode a `hashes` object keeping only string values.
///
/// Entries with any other value type are dropped without failing.
pub fn decode_hash_map(value: &Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_owned())))
                .collect()
        })
        .unwrap_or_default()
}

/// Decode a `_links` object into a relation to href map.
///
/// Fails if any relation lacks a string `href`.
pub fn decode_link_map(value: &Value) -> Result<BTreeMap<String, String>, DecodeError> {
    links(&Node::root(value))
}

fn links(node: &Node) -> Result<BTreeMap<String, String>, DecodeError> {
    let mut result = BTreeMap::new();
    if let Some(obj) = node.object()? {
        for rel in obj.keys() {
            let link = node.get(rel);
            let href = link
                .get("href")
                .opt_str()?
                .ok_or_else(|| DecodeError::MissingHref(link.path()))?;
            result.insert(rel.clone(), href.to_owned());
        }
    }
    Ok(result)
}

/// Decode an `artifacts` array
pub fn decode_artifacts(value: &Value) -> Result<Vec<Artifact>, DecodeError> {
    artifacts(&Node::root(value))
}

fn artifacts(node: &Node) -> Result<Vec<Artifact>, DecodeError> {
    let items = node.array()?;
    let mut result = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let artifact = node.item(idx, item);
        if artifact.object()?.is_none() {
            return Err(artifact.invalid("an object"));
        }

        let filename = artifact.get("filename").non_empty_str()?;
        let size = artifact.get("size").u64_or(0)?;
        let hashes = artifact
            .get("hashes")
            .present()
            .map(decode_hash_map)
            .unwrap_or_default();
        let links = links(&artifact.get("_links"))?;
        if links.is_empty() {
            return Err(DecodeError::NoLinks(filename.to_owned()));
        }

        result.push(Artifact::new(filename, size, hashes, links));
    }
    Ok(result)
}

/// Decode a `chunks` array
pub fn decode_chunks(value: &Value) -> Result<Vec<Chunk>, DecodeError> {
    chunks(&Node::root(value))
}

fn chunks(node: &Node) -> Result<Vec<Chunk>, DecodeError> {
    let items = node.array()?;
    let mut result = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let chunk = node.item(idx, item);
        if chunk.object()?.is_none() {
            return Err(chunk.invalid("an object"));
        }

        result.push(Chunk::new(
            chunk.get("part").str_or_default()?,
            chunk.get("version").str_or_default()?,
            chunk.get("name").str_or_default()?,
            artifacts(&chunk.get("artifacts"))?,
        ));
    }
    Ok(result)
}

/// Decode a `deploymentBase` resource
pub fn decode_deployment(document: &Value) -> Result<Deployment, DecodeError> {
    let root = Node::root(document);
    let deployment = root.get("deployment");

    Ok(Deployment::new(
        root.get("id").non_empty_str()?,
        deployment.get("download").str_or_default()?,
        deployment.get("update").str_or_default()?,
        chunks(&deployment.get("chunks"))?,
    ))
}

/// Decode a `cancelAction` resource.
///
/// A missing or empty `stopId` decodes to a [`Stop`] with an empty id.
pub fn decode_cancel(document: &Value) -> Result<Stop, DecodeError> {
    let root = Node::root(document);
    let stop_id = root.get("cancelAction").get("stopId").str_or_default()?;
    Ok(Stop::new(stop_id))
}

/// Action links advertised by the root controller resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollLinks {
    pub deployment_base: Option<String>,
    pub config_data: Option<String>,
    pub cancel_action: Option<String>,
}

/// The action a poll resolves to, before any secondary fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollAction<'a> {
    FetchDeployment(&'a str),
    Register(&'a str),
    FetchCancel(&'a str),
}

impl PollLinks {
    /// Select the next action.
    ///
    /// Deployments pre-empt registration requests, which pre-empt
    /// cancellations.
    pub fn action(&self) -> Option<PollAction<'_>> {
        if let Some(href) = &self.deployment_base {
            Some(PollAction::FetchDeployment(href))
        } else if let Some(href) = &self.config_data {
            Some(PollAction::Register(href))
        } else {
            self.cancel_action
                .as_deref()
                .map(PollAction::FetchCancel)
        }
    }
}

/// Decode the root controller resource.
///
/// An href that is empty or not a string counts as absent, so it never
/// takes priority over the other links.
pub fn decode_poll(document: &Value) -> Result<PollLinks, DecodeError> {
    let root = Node::root(document);
    let links = root.get("_links");

    let href = |rel: &str| {
        links
            .get(rel)
            .get("href")
            .present()
            .and_then(Value::as_str)
            .filter(|h| !h.is_empty())
            .map(str::to_owned)
    };

    Ok(PollLinks {
        deployment_base: href("deploymentBase"),
        config_data: href("configData"),
        cancel_action: href("cancelAction"),
    })
}
