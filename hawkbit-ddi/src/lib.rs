/*
This crate is home to everything related to the hawkBit Direct Device
Integration (DDI) API, as seen from the device.

A device polls its controller resource to learn what to do next, fetches the
details of the offered action, and reports the progress of that action back
to the server through feedback requests. Artifacts are downloaded through
the links advertised with each deployment.
*/

mod client;
mod config;
mod decode;
mod download;
mod error;
mod feedback;
mod models;

pub use client::DdiClient;
pub use config::{ConfigError, DdiConfig, RequestConfig, default_tenant};
pub use decode::{
    DecodeError, PollAction, PollLinks, decode_artifacts, decode_cancel, decode_chunks,
    decode_deployment, decode_hash_map, decode_link_map, decode_poll,
};
pub use download::Download;
pub use error::Error;
pub use feedback::MergeMode;
pub use models::{
    Artifact, Chunk, DOWNLOAD_LINK, Deployment, DownloadResult, FeedbackSubject, Registration,
    State, StateKind, Stop, UpdateResult,
};

use hawkbit_util as util;
