use bytes::Bytes;
use http_body_util::{BodyExt as _, Full};
use hyper::Request;
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

use super::estimate::{estimate_http_request_bytes_parts, estimate_http1_response_head_bytes};
use super::util::{has_header, host_header_value, parse_http_url};
use super::{Error, HttpRequest, HttpResponse, Result};

/// Shared, connection-pooling client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    default_timeout: Option<Duration>,
}

impl Default for HttpClient {
    fn default() -> Self {
        // The OS connect timeout can run to tens of seconds against an unreachable host.
        Self::new(Some(Duration::from_secs(3)), None)
    }
}

impl HttpClient {
    /// `request_timeout` applies to requests that do not carry their own timeout.
    #[must_use]
    pub fn new(connect_timeout: Option<Duration>, request_timeout: Option<Duration>) -> Self {
        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false);
        http_connector.set_connect_timeout(connect_timeout);

        let https_connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let inner = Client::builder(TokioExecutor::new()).build(https_connector);

        Self {
            inner,
            default_timeout: request_timeout,
        }
    }

    pub async fn request(&self, req: HttpRequest) -> Result<HttpResponse> {
        let timeout = req.timeout.or(self.default_timeout);
        let (parsed, uri) = parse_http_url(&req.url)?;

        let bytes_sent = estimate_http_request_bytes_parts(
            &req.method,
            &req.url,
            &req.headers,
            req.body.len() as u64,
        )?;

        let mut builder = Request::builder().method(req.method).uri(uri);

        // Explicit Host / Content-Length keep byte accounting deterministic.
        if !has_header(&req.headers, "host")
            && let Some(host) = host_header_value(&parsed)
        {
            builder = builder.header(http::header::HOST, host);
        }
        if !req.body.is_empty() && !has_header(&req.headers, "content-length") {
            builder = builder.header(http::header::CONTENT_LENGTH, req.body.len());
        }

        for (k, v) in req.headers {
            let name = http::header::HeaderName::from_bytes(k.as_bytes())?;
            let value = http::header::HeaderValue::from_str(&v)?;
            builder = builder.header(name, value);
        }

        let req: Request<Full<Bytes>> = builder.body(Full::new(req.body))?;

        let exchange = async {
            let res: hyper::Response<Incoming> = self.inner.request(req).await?;
            let (parts, body) = res.into_parts();
            let body = body.collect().await?.to_bytes();
            Ok::<_, Error>((parts, body))
        };

        let (parts, body) = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, exchange)
                .await
                .map_err(|_| Error::Timeout(timeout))??,
            None => exchange.await?,
        };

        let headers: Vec<(String, String)> = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let head_bytes =
            estimate_http1_response_head_bytes(parts.version, parts.status, &parts.headers);
        let bytes_received = head_bytes.saturating_add(body.len() as u64);

        Ok(HttpResponse {
            status: parts.status.as_u16(),
            body,
            headers,
            bytes_sent,
            bytes_received,
        })
    }
}
