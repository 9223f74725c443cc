//! Lambda runtime abstraction.
//!
//! A runtime turns a source file into an invocable handler and calls it
//! with a request. How the handler is taken from the module depends on the
//! file's extension tag:
//!
//! | Extension | `ExportStyle` | Handler |
//! |-----------|---------------|---------|
//! | `.js` (and anything else) | `Direct` | the module's exports |
//! | `.ts` | `Default` | the `default` property of the exports |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::lambda::error::LambdaError;

/// How a module exposes its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportStyle {
    /// The module's exports are the handler.
    Direct,
    /// The handler is the `default` export.
    Default,
}

impl ExportStyle {
    /// Pick the style from a file's extension tag.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ts") => ExportStyle::Default,
            _ => ExportStyle::Direct,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStyle::Direct => "direct",
            ExportStyle::Default => "default",
        }
    }
}

/// The request as seen by a lambda.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LambdaRequest {
    pub method: String,
    /// Raw request target: path plus optional query.
    pub url: String,
    pub http_version: String,
    /// Lower-cased header names; repeated headers joined with `, `.
    pub headers: BTreeMap<String, String>,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_address: Option<String>,
}

impl LambdaRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            http_version: "1.1".to_string(),
            ..Default::default()
        }
    }
}

/// One or more values of a response header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

impl HeaderValues {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            HeaderValues::One(value) => std::slice::from_ref(value),
            HeaderValues::Many(values) => values,
        };
        values.iter().map(String::as_str)
    }
}

/// The response a lambda produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LambdaResponse {
    pub status: u16,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, HeaderValues>,
    #[serde(default)]
    pub body: String,
}

impl LambdaResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            status_message: None,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// First value of a header, by lower-case name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|values| values.iter().next())
    }
}

/// Loads lambda modules and invokes their handlers.
///
/// Implementations are driven from a single thread and need not be `Send`.
pub trait LambdaRuntime {
    /// An invocable handler. Cloning must be cheap (a handle, not a copy
    /// of the module).
    type Handler: Clone;

    /// Evaluate the module at `path` and extract its handler.
    ///
    /// Fails with `LambdaError::InvalidLambda` when the selected export is
    /// not invocable.
    fn load(&mut self, path: &Path, style: ExportStyle) -> Result<Self::Handler, LambdaError>;

    /// Call a handler with a request and collect its response.
    fn invoke(
        &mut self,
        handler: &Self::Handler,
        request: &LambdaRequest,
    ) -> Result<LambdaResponse, LambdaError>;

    /// Forget module state the runtime keeps for files under `root`, such
    /// as modules pulled in by a lambda. Returns how many were dropped.
    fn invalidate_under(&mut self, _root: &Path) -> usize {
        0
    }
}
