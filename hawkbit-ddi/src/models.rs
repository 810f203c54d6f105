//! Resources offered by the controller API
//!
//! All types are immutable values decoded from a single server response.
//! The `Display` impls render an indented dump meant for diagnostics only.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use crate::util::http::StatusCode;

/// Link relation used by default when downloading an artifact
pub const DOWNLOAD_LINK: &str = "download";

/// One downloadable file of a software module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    filename: String,
    size: u64,
    hashes: BTreeMap<String, String>,
    links: BTreeMap<String, String>,
}

impl Artifact {
    pub fn new(
        filename: impl Into<String>,
        size: u64,
        hashes: BTreeMap<String, String>,
        links: BTreeMap<String, String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            size,
            hashes,
            links,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Advertised size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Hex digests indexed by algorithm name, e.g. `sha256`
    pub fn hashes(&self) -> &BTreeMap<String, String> {
        &self.hashes
    }

    /// URLs indexed by link relation, e.g. `download` or `md5sum`
    pub fn links(&self) -> &BTreeMap<String, String> {
        &self.links
    }

    pub fn link(&self, rel: &str) -> Option<&str> {
        self.links.get(rel).map(String::as_str)
    }
}

/// A software module that is part of a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    part: String,
    version: String,
    name: String,
    artifacts: Vec<Artifact>,
}

impl Chunk {
    pub fn new(
        part: impl Into<String>,
        version: impl Into<String>,
        name: impl Into<String>,
        artifacts: Vec<Artifact>,
    ) -> Self {
        Self {
            part: part.into(),
            version: version.into(),
            name: name.into(),
            artifacts,
        }
    }

    pub fn part(&self) -> &str {
        &self.part
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }
}

/// An update job offered by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    id: String,
    download: String,
    update: String,
    chunks: Vec<Chunk>,
}

impl Deployment {
    pub fn new(
        id: impl Into<String>,
        download: impl Into<String>,
        update: impl Into<String>,
        chunks: Vec<Chunk>,
    ) -> Self {
        Self {
            id: id.into(),
            download: download.into(),
            update: update.into(),
            chunks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Download handling requested by the server (`skip`, `attempt` or `forced`)
    pub fn download(&self) -> &str {
        &self.download
    }

    /// Update handling requested by the server (`skip`, `attempt` or `forced`)
    pub fn update(&self) -> &str {
        &self.update
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Iterate over the artifacts of every chunk
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.chunks.iter().flat_map(|c| c.artifacts.iter())
    }
}

/// A request to cancel a previous deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stop {
    id: String,
}

impl Stop {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// A request to (re)send the device attributes to `url`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    url: String,
}

impl Registration {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Resources that feedback can be reported for
pub trait FeedbackSubject {
    /// Id of the action the feedback refers to
    fn id(&self) -> &str;

    /// Path segment of the action's feedback URL below the controller root
    fn feedback_path_segment(&self) -> &'static str;
}

impl FeedbackSubject for Deployment {
    fn id(&self) -> &str {
        &self.id
    }

    fn feedback_path_segment(&self) -> &'static str {
        "deploymentBase"
    }
}

impl FeedbackSubject for Stop {
    fn id(&self) -> &str {
        &self.id
    }

    fn feedback_path_segment(&self) -> &'static str {
        "cancelAction"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    None,
    Register,
    Update,
    Cancel,
}

impl Display for StateKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StateKind::None => f.write_str("NONE"),
            StateKind::Register => f.write_str("REGISTER"),
            StateKind::Update => f.write_str("UPDATE"),
            StateKind::Cancel => f.write_str("CANCEL"),
        }
    }
}

/// Outcome of a poll, what the server wants the device to do next
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum State {
    /// Nothing to do
    #[default]
    None,
    Register(Registration),
    Update(Deployment),
    Cancel(Stop),
}

impl State {
    pub fn kind(&self) -> StateKind {
        match self {
            State::None => StateKind::None,
            State::Register(_) => StateKind::Register,
            State::Update(_) => StateKind::Update,
            State::Cancel(_) => StateKind::Cancel,
        }
    }

    pub fn is(&self, kind: StateKind) -> bool {
        self.kind() == kind
    }

    pub fn deployment(&self) -> Option<&Deployment> {
        match self {
            State::Update(deployment) => Some(deployment),
            _ => None,
        }
    }

    pub fn stop(&self) -> Option<&Stop> {
        match self {
            State::Cancel(stop) => Some(stop),
            _ => None,
        }
    }

    pub fn registration(&self) -> Option<&Registration> {
        match self {
            State::Register(registration) => Some(registration),
            _ => None,
        }
    }
}

impl From<Deployment> for State {
    fn from(value: Deployment) -> Self {
        State::Update(value)
    }
}

impl From<Stop> for State {
    fn from(value: Stop) -> Self {
        State::Cancel(value)
    }
}

impl From<Registration> for State {
    fn from(value: Registration) -> Self {
        State::Register(value)
    }
}

/// Response status of a feedback or registration update call.
///
/// Deciding what counts as success is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult(StatusCode);

impl UpdateResult {
    pub fn new(status: StatusCode) -> Self {
        Self(status)
    }

    pub fn code(&self) -> u16 {
        self.0.as_u16()
    }

    pub fn status(&self) -> StatusCode {
        self.0
    }

    pub fn is_success(&self) -> bool {
        self.0.is_success()
    }
}

/// Response status of a download request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadResult(StatusCode);

impl DownloadResult {
    pub fn new(status: StatusCode) -> Self {
        Self(status)
    }

    pub fn code(&self) -> u16 {
        self.0.as_u16()
    }

    pub fn status(&self) -> StatusCode {
        self.0
    }
}

const INDENT: &str = "    ";

trait Dump {
    fn dump(&self, f: &mut Formatter<'_>, prefix: &str) -> fmt::Result;
}

impl Dump for Artifact {
    fn dump(&self, f: &mut Formatter<'_>, prefix: &str) -> fmt::Result {
        writeln!(f, "{prefix}{} {}", self.filename, self.size)?;
        writeln!(f, "{prefix}Hashes")?;
        for (algorithm, digest) in self.hashes.iter() {
            writeln!(f, "{prefix}{INDENT}{algorithm} = {digest}")?;
        }
        writeln!(f, "{prefix}Links")?;
        for (rel, href) in self.links.iter() {
            writeln!(f, "{prefix}{INDENT}{rel} = {href}")?;
        }
        Ok(())
    }
}

impl Dump for Chunk {
    fn dump(&self, f: &mut Formatter<'_>, prefix: &str) -> fmt::Result {
        writeln!(f, "{prefix}{} - {} ({})", self.name, self.version, self.part)?;
        let nested = format!("{prefix}{INDENT}");
        for artifact in self.artifacts.iter() {
            artifact.dump(f, &nested)?;
        }
        Ok(())
    }
}

impl Dump for Deployment {
    fn dump(&self, f: &mut Formatter<'_>, prefix: &str) -> fmt::Result {
        writeln!(f, "{prefix}Deployment: {}", self.id)?;
        writeln!(
            f,
            "{prefix}{INDENT}Download: {}, Update: {}",
            self.download, self.update
        )?;
        writeln!(f, "{prefix}{INDENT}Chunks:")?;
        let nested = format!("{prefix}{INDENT}{INDENT}");
        for chunk in self.chunks.iter() {
            chunk.dump(f, &nested)?;
        }
        Ok(())
    }
}

impl Dump for Stop {
    fn dump(&self, f: &mut Formatter<'_>, prefix: &str) -> fmt::Result {
        writeln!(f, "{prefix}Stop: {}", self.id)
    }
}

impl Dump for Registration {
    fn dump(&self, f: &mut Formatter<'_>, prefix: &str) -> fmt::Result {
        writeln!(f, "{prefix}Registration: {}", self.url)
    }
}

impl Dump for State {
    fn dump(&self, f: &mut Formatter<'_>, prefix: &str) -> fmt::Result {
        writeln!(f, "{prefix}State <{}>", self.kind())?;
        let nested = format!("{prefix}{INDENT}");
        match self {
            State::None => Ok(()),
            State::Register(registration) => registration.dump(f, &nested),
            State::Update(deployment) => deployment.dump(f, &nested),
            State::Cancel(stop) => stop.dump(f, &nested),
        }
    }
}

macro_rules! display_dump {
    ($($ty:ty),*) => {
        $(
            impl Display for $ty {
                fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                    self.dump(f, "")
                }
            }
        )*
    };
}

display_dump!(Artifact, Chunk, Deployment, Stop, Registration, State);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn deployment() -> Deployment {
        Deployment::new(
            "42",
            "forced",
            "attempt",
            vec![Chunk::new(
                "os",
                "1.0.0",
                "rootfs",
                vec![Artifact::new(
                    "rootfs.img",
                    1024,
                    BTreeMap::from([("sha256".to_string(), "abcd".to_string())]),
                    BTreeMap::from([(
                        "download".to_string(),
                        "https://cdn/rootfs.img".to_string(),
                    )]),
                )],
            )],
        )
    }

    #[test]
    fn test_tags_the_state_by_payload() {
        let state = State::from(deployment());
        assert!(state.is(StateKind::Update));
        assert_eq!(state.kind(), StateKind::Update);
        assert_eq!(state.deployment().map(|d| d.id()), Some("42"));

        let state = State::from(Stop::new("7"));
        assert!(state.is(StateKind::Cancel));
        assert_eq!(state.stop(), Some(&Stop::new("7")));

        let state = State::from(Registration::new("https://x/configData"));
        assert!(state.is(StateKind::Register));
        assert_eq!(
            state.registration().map(|r| r.url()),
            Some("https://x/configData")
        );

        assert!(State::default().is(StateKind::None));
    }

    #[test]
    fn test_does_not_expose_payloads_of_other_variants() {
        let state = State::from(Stop::new("7"));
        assert_eq!(state.deployment(), None);
        assert_eq!(state.registration(), None);

        let state = State::None;
        assert_eq!(state.deployment(), None);
        assert_eq!(state.stop(), None);
        assert_eq!(state.registration(), None);
    }

    #[test]
    fn test_uses_the_subject_path_segment() {
        assert_eq!(deployment().feedback_path_segment(), "deploymentBase");
        assert_eq!(Stop::new("1").feedback_path_segment(), "cancelAction");
    }

    #[test]
    fn test_iterates_over_all_artifacts() {
        let deployment = deployment();
        let names: Vec<&str> = deployment.artifacts().map(|a| a.filename()).collect();
        assert_eq!(names, vec!["rootfs.img"]);
    }

    #[test]
    fn test_dumps_the_state() {
        let dump = State::from(deployment()).to_string();
        let expected = [
            "State <UPDATE>",
            "    Deployment: 42",
            "        Download: forced, Update: attempt",
            "        Chunks:",
            "            rootfs - 1.0.0 (os)",
            "                rootfs.img 1024",
            "                Hashes",
            "                    sha256 = abcd",
            "                Links",
            "                    download = https://cdn/rootfs.img",
            "",
        ]
        .join("\n");
        assert_eq!(dump, expected);

        assert_eq!(State::None.to_string(), "State <NONE>\n");
        assert_eq!(
            State::from(Stop::new("7")).to_string(),
            "State <CANCEL>\n    Stop: 7\n"
        );
    }
}
