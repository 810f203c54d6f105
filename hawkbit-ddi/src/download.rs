use bytes::Bytes;
use tracing::{Span, debug, field, instrument};

use crate::client::DdiClient;
use crate::error::Error;
use crate::models::{Artifact, DOWNLOAD_LINK, DownloadResult};
use crate::util::http::{Method, Response, Uri};

/// An artifact download in progress.
///
/// The body has not been read yet when the handler receives it. The
/// connection is released once the handler returns.
#[derive(Debug)]
pub struct Download {
    response: Response,
}

impl Download {
    pub fn result(&self) -> DownloadResult {
        DownloadResult::new(self.response.status())
    }

    /// Size of the body as announced by the server, if any
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Read the next chunk of the artifact, `None` at the end of the body
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, Error> {
        Ok(self.response.chunk().await?)
    }
}

impl DdiClient {
    /// Download `artifact` through its `download` link.
    ///
    /// See [`DdiClient::download_link`].
    pub async fn download<F, T>(&self, artifact: &Artifact, handler: F) -> Result<T, Error>
    where
        F: AsyncFnOnce(&mut Download) -> T,
    {
        self.download_link(artifact, DOWNLOAD_LINK, handler).await
    }

    /// Download `artifact` through the link with relation `rel`.
    ///
    /// `handler` is called exactly once if the server accepts the request,
    /// and never otherwise. Whatever it returns is handed back to the caller.
    #[instrument(skip_all, fields(artifact = artifact.filename(), rel = rel, status = field::Empty), err(level = "warn"))]
    pub async fn download_link<F, T>(
        &self,
        artifact: &Artifact,
        rel: &str,
        handler: F,
    ) -> Result<T, Error>
    where
        F: AsyncFnOnce(&mut Download) -> T,
    {
        let href = artifact
            .link(rel)
            .ok_or_else(|| Error::MissingLink(rel.to_owned()))?;
        let uri: Uri = href.parse()?;

        debug!("downloading {uri}");
        let response = self.client.request(Method::GET, &uri, Ok).await?;

        let status = response.status();
        Span::current().record("status", field::display(status));
        if !status.is_success() {
            return Err(Error::Download(status));
        }

        let mut download = Download { response };
        Ok(handler(&mut download).await)
    }
}
