use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{Span, debug, field, info, instrument, trace};

use crate::config::{ConfigError, DdiConfig};
use crate::decode::{self, PollAction, decode_cancel, decode_deployment, decode_poll};
use crate::error::Error;
use crate::feedback::{ConfigData, Execution, Feedback, Finished, MergeMode, Progress};
use crate::models::{Deployment, FeedbackSubject, Registration, State, Stop, UpdateResult};
use crate::util::http::{Client, Method, Uri};

const HAL_JSON: &str = "application/hal+json";

/// Device side client of the controller API.
///
/// Every operation performs its requests one after the other and returns
/// once the last response has been handled, there is no internal retry.
#[derive(Debug, Clone)]
pub struct DdiClient {
    pub(crate) client: Client,
    root: Uri,
}

impl DdiClient {
    pub fn new(config: &DdiConfig) -> Result<Self, Error> {
        let root = config.root_uri().map_err(ConfigError::from)?;
        let client = Client::with_options(config.client_options()?)
            .map_err(ConfigError::from)?
            .auth(Some(config.auth.clone()));

        Ok(Self { client, root })
    }

    /// The root controller resource polled by [`DdiClient::poll`]
    pub fn root_uri(&self) -> &Uri {
        &self.root
    }

    /// Ask the server what to do next.
    ///
    /// If the server offers a deployment or a cancellation, its details are
    /// fetched before returning, so the result is always complete.
    #[instrument(skip_all, fields(state = field::Empty), err(level = "warn"))]
    pub async fn poll(&self) -> Result<State, Error> {
        let document = self.get_document(&self.root).await?;
        let links = decode_poll(&document)?;

        let state = match links.action() {
            Some(PollAction::FetchDeployment(href)) => {
                debug!("fetching deployment: {href}");
                State::Update(self.read_deployment(href).await?)
            }
            Some(PollAction::Register(href)) => {
                debug!("registration requested: {href}");
                State::Register(Registration::new(href))
            }
            Some(PollAction::FetchCancel(href)) => {
                debug!("fetching cancel action: {href}");
                State::Cancel(self.read_cancel(href).await?)
            }
            None => {
                debug!("no update");
                State::None
            }
        };

        Span::current().record("state", field::display(state.kind()));
        Ok(state)
    }

    async fn read_deployment(&self, href: &str) -> Result<Deployment, Error> {
        let uri: Uri = href.parse()?;
        let document = self.get_document(&uri).await?;
        Ok(decode_deployment(&document)?)
    }

    async fn read_cancel(&self, href: &str) -> Result<Stop, Error> {
        let uri: Uri = href.parse()?;
        let document = self.get_document(&uri).await?;
        Ok(decode_cancel(&document)?)
    }

    #[instrument(level = "debug", skip_all, fields(uri = %uri, status = field::Empty))]
    async fn get_document(&self, uri: &Uri) -> Result<Value, Error> {
        let response = self
            .client
            .request(Method::GET, uri, |request| {
                Ok(request.header("Accept", HAL_JSON))
            })
            .await?;

        let status = response.status();
        Span::current().record("status", field::display(status));
        if !status.is_success() {
            return Err(Error::Status(status));
        }

        let body = response.bytes().await?;
        trace!("payload: {}", String::from_utf8_lossy(&body));

        Ok(decode::parse(&body)?)
    }

    pub async fn report_scheduled(
        &self,
        deployment: &Deployment,
        details: &[String],
    ) -> Result<UpdateResult, Error> {
        self.send_feedback(deployment, Execution::Scheduled, Finished::None, None, details)
            .await
    }

    pub async fn report_resumed(
        &self,
        deployment: &Deployment,
        details: &[String],
    ) -> Result<UpdateResult, Error> {
        self.send_feedback(deployment, Execution::Resumed, Finished::None, None, details)
            .await
    }

    /// Report that `done` out of `total` steps of the deployment are complete.
    ///
    /// Same body as the other deployment reports plus an optional
    /// `status.result.progress` object (`{"cnt": done, "of": total}`).
    pub async fn report_progress(
        &self,
        deployment: &Deployment,
        done: u32,
        total: u32,
        details: &[String],
    ) -> Result<UpdateResult, Error> {
        let progress = Progress {
            cnt: done,
            of: total,
        };
        self.send_feedback(
            deployment,
            Execution::Proceeding,
            Finished::None,
            Some(progress),
            details,
        )
        .await
    }

    pub async fn report_complete(
        &self,
        deployment: &Deployment,
        success: bool,
        details: &[String],
    ) -> Result<UpdateResult, Error> {
        let finished = if success {
            Finished::Success
        } else {
            Finished::Failure
        };
        self.send_feedback(deployment, Execution::Closed, finished, None, details)
            .await
    }

    pub async fn report_canceled(
        &self,
        deployment: &Deployment,
        details: &[String],
    ) -> Result<UpdateResult, Error> {
        self.send_feedback(deployment, Execution::Canceled, Finished::None, None, details)
            .await
    }

    pub async fn report_cancel_accepted(
        &self,
        stop: &Stop,
        details: &[String],
    ) -> Result<UpdateResult, Error> {
        self.send_feedback(stop, Execution::Closed, Finished::Success, None, details)
            .await
    }

    pub async fn report_cancel_rejected(
        &self,
        stop: &Stop,
        details: &[String],
    ) -> Result<UpdateResult, Error> {
        self.send_feedback(stop, Execution::Closed, Finished::Failure, None, details)
            .await
    }

    /// Send the device attributes requested by a [`State::Register`]
    #[instrument(skip_all, fields(mode = ?mode, status = field::Empty), err(level = "warn"))]
    pub async fn update_registration(
        &self,
        registration: &Registration,
        data: &BTreeMap<String, String>,
        mode: MergeMode,
        details: &[String],
    ) -> Result<UpdateResult, Error> {
        let uri: Uri = registration.url().parse()?;
        let body = ConfigData::new(mode, data, details);
        self.send(Method::PUT, &uri, &body).await
    }

    #[instrument(
        name = "feedback",
        skip_all,
        fields(id = subject.id(), execution = ?execution, finished = ?finished, status = field::Empty),
        err(level = "warn")
    )]
    async fn send_feedback<S: FeedbackSubject>(
        &self,
        subject: &S,
        execution: Execution,
        finished: Finished,
        progress: Option<Progress>,
        details: &[String],
    ) -> Result<UpdateResult, Error> {
        let uri = self.feedback_uri(subject)?;
        let body = Feedback::new(subject.id(), execution, finished, progress, details);
        self.send(Method::POST, &uri, &body).await
    }

    fn feedback_uri<S: FeedbackSubject>(&self, subject: &S) -> Result<Uri, Error> {
        Ok(self.root.append_segments([
            subject.feedback_path_segment(),
            subject.id(),
            "feedback",
        ])?)
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        uri: &Uri,
        body: &B,
    ) -> Result<UpdateResult, Error> {
        let payload = serde_json::to_vec(body).map_err(Error::Encode)?;
        debug!("sending {method} {uri}");
        trace!("payload: {}", String::from_utf8_lossy(&payload));

        let response = self
            .client
            .request(method, uri, |request| {
                Ok(request
                    .header("Accept", HAL_JSON)
                    .header("Content-Type", "application/json")
                    .body(payload))
            })
            .await?;

        let status = response.status();
        Span::current().record("status", field::display(status));
        info!("server replied: {status}");

        Ok(UpdateResult::new(status))
    }
}
