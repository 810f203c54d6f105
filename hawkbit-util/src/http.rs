pub use client::{Auth, Client, ClientError, ClientOptions, Method, Response, StatusCode};
pub use uri::{InvalidUriError, Uri};

mod uri {
    use std::fmt;
    use std::str::FromStr;

    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("{0}")]
    pub struct InvalidUriError(String);

    impl From<http::uri::InvalidUri> for InvalidUriError {
        fn from(value: http::uri::InvalidUri) -> Self {
            InvalidUriError(value.to_string())
        }
    }

    impl From<http::uri::InvalidUriParts> for InvalidUriError {
        fn from(value: http::uri::InvalidUriParts) -> Self {
            InvalidUriError(value.to_string())
        }
    }

    /// An absolute request URI, stored as a string in config files
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(try_from = "String", into = "String")]
    pub struct Uri(http::Uri);

    impl Uri {
        pub fn from_static(src: &'static str) -> Self {
            Self(http::Uri::from_static(src))
        }

        /// Append `path` to the path of this URI, dropping any query.
        ///
        /// Unlike replacing the path, this keeps any prefix the base URI
        /// was configured with, e.g. a server behind a reverse proxy at
        /// `https://example.com/hawkbit`.
        pub fn append_path(&self, path: &str) -> Result<Self, InvalidUriError> {
            let base = self.0.path().trim_end_matches('/');
            let path = path.trim_start_matches('/');
            let joined = http::uri::PathAndQuery::from_maybe_shared(format!("{base}/{path}"))?;

            let mut parts = self.0.clone().into_parts();
            parts.path_and_query = Some(joined);

            Ok(Self(http::Uri::from_parts(parts)?))
        }

        /// Append each of `segments` as a single path segment.
        ///
        /// Segments are percent-encoded, so a `/`, `?` or `#` inside one
        /// cannot change which resource the URI points to.
        pub fn append_segments<'a, I>(&self, segments: I) -> Result<Self, InvalidUriError>
        where
            I: IntoIterator<Item = &'a str>,
        {
            let path = segments
                .into_iter()
                .map(urlencoding::encode)
                .collect::<Vec<_>>()
                .join("/");
            self.append_path(&path)
        }
    }

    impl fmt::Display for Uri {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.0.fmt(f)
        }
    }

    impl FromStr for Uri {
        type Err = InvalidUriError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            Ok(Self(s.parse()?))
        }
    }

    impl TryFrom<String> for Uri {
        type Error = InvalidUriError;

        fn try_from(value: String) -> Result<Self, Self::Error> {
            Ok(Self(http::Uri::from_maybe_shared(value)?))
        }
    }

    impl From<Uri> for String {
        fn from(value: Uri) -> Self {
            value.0.to_string()
        }
    }
}

mod client {
    use std::fmt;
    use std::time::Duration;

    use bytes::Bytes;
    use reqwest::RequestBuilder;
    use reqwest::header::AUTHORIZATION;
    use serde::{Deserialize, Serialize};

    use super::uri::Uri;

    pub type Method = reqwest::Method;
    pub type StatusCode = reqwest::StatusCode;

    #[derive(Debug, thiserror::Error)]
    pub enum ClientError {
        #[error("failed to build request: {0}")]
        Request(String),

        #[error("failed to configure http client: {0}")]
        Configure(#[source] reqwest::Error),

        /// The request could not be sent or no response was received
        #[error(transparent)]
        Client(reqwest::Error),

        /// The response body could not be read
        #[error(transparent)]
        Server(reqwest::Error),
    }

    #[derive(Debug)]
    pub struct Response(reqwest::Response);

    impl Response {
        pub fn status(&self) -> StatusCode {
            self.0.status()
        }

        pub fn content_length(&self) -> Option<u64> {
            self.0.content_length()
        }

        /// Read the next chunk of the body, `None` once the body is exhausted
        pub async fn chunk(&mut self) -> Result<Option<Bytes>, ClientError> {
            self.0.chunk().await.map_err(ClientError::Server)
        }

        /// Read the full response body into an owned buffer
        pub async fn bytes(self) -> Result<Bytes, ClientError> {
            self.0.bytes().await.map_err(ClientError::Server)
        }
    }

    /// Authorization schemes understood by the hawkBit controller API
    #[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    pub enum Auth {
        /// Per-device security token
        TargetToken { token: String },
        /// Tenant wide gateway token
        GatewayToken { token: String },
    }

    impl Auth {
        pub fn header_value(&self) -> String {
            match self {
                Auth::TargetToken { token } => format!("TargetToken {token}"),
                Auth::GatewayToken { token } => format!("GatewayToken {token}"),
            }
        }
    }

    // Keep tokens out of the logs
    impl fmt::Debug for Auth {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Auth::TargetToken { .. } => f.write_str("TargetToken(***)"),
                Auth::GatewayToken { .. } => f.write_str("GatewayToken(***)"),
            }
        }
    }

    /// Transport level settings
    #[derive(Debug, Clone, Default)]
    pub struct ClientOptions {
        /// Total time allowed for a single request, body included
        pub timeout: Option<Duration>,
        /// Time allowed for establishing the connection
        pub connect_timeout: Option<Duration>,
        /// Additional PEM encoded root certificate to trust
        pub root_certificate: Option<Vec<u8>>,
    }

    // Based on: https://github.com/ramsayleung/rspotify/blob/master/rspotify-http/src/reqwest.rs
    #[derive(Debug, Clone)]
    pub struct Client {
        client: reqwest::Client,
        timeout: Option<Duration>,
        auth: Option<Auth>,
    }

    impl Client {
        pub fn with_options(options: ClientOptions) -> Result<Self, ClientError> {
            let mut builder = reqwest::Client::builder();

            if let Some(connect_timeout) = options.connect_timeout {
                builder = builder.connect_timeout(connect_timeout);
            }

            if let Some(pem) = &options.root_certificate {
                let cert = reqwest::Certificate::from_pem(pem).map_err(ClientError::Configure)?;
                builder = builder.add_root_certificate(cert);
            }

            Ok(Self {
                client: builder.build().map_err(ClientError::Configure)?,
                timeout: options.timeout,
                auth: None,
            })
        }

        pub fn auth(self, auth: Option<Auth>) -> Self {
            Self {
                client: self.client,
                timeout: self.timeout,
                auth,
            }
        }

        /// Thin wrapper around [reqwest::Request], this is your gateway to
        /// a fully customizable client if this type's methods won't do.
        ///
        /// Headers added by `decorator` only apply to this request.
        pub async fn request<D>(
            &self,
            method: Method,
            uri: &Uri,
            decorator: D,
        ) -> Result<Response, ClientError>
        where
            D: FnOnce(RequestBuilder) -> Result<RequestBuilder, ClientError>,
        {
            let mut request = self.client.request(method, uri.to_string());

            if let Some(timeout) = self.timeout {
                request = request.timeout(timeout);
            }

            if let Some(auth) = &self.auth {
                request = request.header(AUTHORIZATION, auth.header_value());
            };

            request = decorator(request)?;

            Ok(Response(request.send().await.map_err(ClientError::Client)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::time::Duration;

    #[test]
    fn test_append_path_to_bare_host() {
        let base: Uri = "https://hawkbit.example.com".parse().unwrap();
        let uri = base.append_path("/DEFAULT/controller/v1/dev").unwrap();
        assert_eq!(
            uri.to_string(),
            "https://hawkbit.example.com/DEFAULT/controller/v1/dev"
        );
    }

    #[test]
    fn test_append_path_keeps_prefix() {
        let base: Uri = "https://example.com/hawkbit/".parse().unwrap();
        let uri = base.append_path("DEFAULT/controller/v1/dev").unwrap();
        assert_eq!(
            uri.to_string(),
            "https://example.com/hawkbit/DEFAULT/controller/v1/dev"
        );
    }

    #[test]
    fn test_append_segments_encodes_reserved_characters() {
        let base: Uri = "https://example.com/hawkbit".parse().unwrap();

        let uri = base.append_segments(["DEFAULT", "v1", "dev?x"]).unwrap();
        assert_eq!(uri.to_string(), "https://example.com/hawkbit/DEFAULT/v1/dev%3Fx");

        let uri = base.append_segments(["dev#x", "feedback"]).unwrap();
        assert_eq!(uri.to_string(), "https://example.com/hawkbit/dev%23x/feedback");

        let uri = base.append_segments(["a/b", "with space"]).unwrap();
        assert_eq!(uri.to_string(), "https://example.com/hawkbit/a%2Fb/with%20space");
    }

    #[test]
    fn test_append_path_rejects_invalid_characters() {
        let base: Uri = "https://example.com".parse().unwrap();
        assert!(base.append_path("with space").is_err());
    }

    #[test]
    fn test_auth_header_value() {
        let auth = Auth::TargetToken {
            token: "abc".to_string(),
        };
        assert_eq!(auth.header_value(), "TargetToken abc");

        let auth = Auth::GatewayToken {
            token: "xyz".to_string(),
        };
        assert_eq!(auth.header_value(), "GatewayToken xyz");
    }

    #[test]
    fn test_auth_debug_hides_token() {
        let auth = Auth::TargetToken {
            token: "secret".to_string(),
        };
        assert!(!format!("{auth:?}").contains("secret"));
    }

    #[test]
    fn test_auth_deserialize() {
        let auth: Auth =
            serde_json::from_str(r#"{"type": "gateway_token", "token": "t"}"#).unwrap();
        assert_eq!(
            auth,
            Auth::GatewayToken {
                token: "t".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_root_certificate() {
        let res = Client::with_options(ClientOptions {
            root_certificate: Some(b"not a certificate".to_vec()),
            ..Default::default()
        });
        assert!(matches!(res, Err(ClientError::Configure(_))));
    }

    #[tokio::test]
    async fn test_request_sends_auth_header() {
        let mut server = Server::new_async().await;
        let endpoint: Uri = server.url().parse().unwrap();

        let mock = server
            .mock("GET", "/")
            .match_header("authorization", "TargetToken abc")
            .match_header("accept", "application/hal+json")
            .with_status(200)
            .with_body("hello")
            .create_async()
            .await;

        let client = Client::with_options(ClientOptions {
            timeout: Some(Duration::from_secs(10)),
            ..Default::default()
        })
        .unwrap()
        .auth(Some(Auth::TargetToken {
            token: "abc".to_string(),
        }));

        let response = client
            .request(Method::GET, &endpoint, |req| {
                Ok(req.header("Accept", "application/hal+json"))
            })
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.bytes().await.unwrap().as_ref(), b"hello");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_connection_error() {
        // nothing listens on port 1
        let endpoint = Uri::from_static("http://127.0.0.1:1/");
        let client = Client::with_options(ClientOptions {
            connect_timeout: Some(Duration::from_millis(200)),
            ..Default::default()
        })
        .unwrap();

        let res = client.request(Method::GET, &endpoint, Ok).await;
        assert!(matches!(res, Err(ClientError::Client(_))));
    }
}
