use std::collections::BTreeMap;

use serde::Serialize;

/// Lifecycle stage of the action a feedback refers to
#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Execution {
    Scheduled,
    Resumed,
    Proceeding,
    Closed,
    Canceled,
}

/// Outcome of the action a feedback refers to
#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Finished {
    None,
    Success,
    Failure,
}

/// How the server should apply the attributes sent on registration
#[derive(Clone, Copy, Serialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Add to or update the existing attributes
    Merge,
    /// Replace all existing attributes
    #[default]
    Replace,
    /// Remove the given attributes
    Remove,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Progress {
    pub cnt: u32,
    pub of: u32,
}

#[derive(Serialize, Debug)]
struct ResultReport {
    finished: Finished,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<Progress>,
}

#[derive(Serialize, Debug)]
struct StatusReport<'a> {
    details: &'a [String],
    execution: Execution,
    result: ResultReport,
}

/// Body of a `deploymentBase` or `cancelAction` feedback request
#[derive(Serialize, Debug)]
pub(crate) struct Feedback<'a> {
    id: &'a str,
    status: StatusReport<'a>,
}

impl<'a> Feedback<'a> {
    pub fn new(
        id: &'a str,
        execution: Execution,
        finished: Finished,
        progress: Option<Progress>,
        details: &'a [String],
    ) -> Self {
        Self {
            id,
            status: StatusReport {
                details,
                execution,
                result: ResultReport { finished, progress },
            },
        }
    }
}

/// Body of a `configData` request
#[derive(Serialize, Debug)]
pub(crate) struct ConfigData<'a> {
    mode: MergeMode,
    data: &'a BTreeMap<String, String>,
    status: StatusReport<'a>,
}

impl<'a> ConfigData<'a> {
    /// Registration updates always report a closed, successful action
    pub fn new(mode: MergeMode, data: &'a BTreeMap<String, String>, details: &'a [String]) -> Self {
        Self {
            mode,
            data,
            status: StatusReport {
                details,
                execution: Execution::Closed,
                result: ResultReport {
                    finished: Finished::Success,
                    progress: None,
                },
            },
        }
    }
}
