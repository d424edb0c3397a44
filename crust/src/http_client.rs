use crate::{data::RequestData, data::ResponseData, error::Error, util};
use async_trait::async_trait;
use hyper::{body, client::HttpConnector, Body, Method, Request};
use hyper_tls::HttpsConnector;
use std::fmt::Debug;

/// Transport seam between the runner and the network. Tests substitute a
/// `MockRegistry` here; load runs use the real `HyperClient`.
#[async_trait]
pub trait HttpClient: Debug + Send + Sync {
    async fn send(&self, request_data: &RequestData) -> Result<ResponseData, Error>;
}

#[derive(Debug)]
pub struct HyperClient {
    client: hyper::Client<HttpsConnector<HttpConnector>>,
}

impl HyperClient {
    pub fn new() -> Self {
        Self {
            client: hyper::Client::builder().build(HttpsConnector::new()),
        }
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for HyperClient {
    async fn send(&self, request_data: &RequestData) -> Result<ResponseData, Error> {
        let method = Method::from_bytes(request_data.method.as_bytes())
            .map_err(|_| Error::Configuration(format!("bad method '{}'", request_data.method)))?;

        let mut request_builder = Request::builder()
            .uri(request_data.url.as_str())
            .method(method);

        if let Some(headers_mut) = request_builder.headers_mut() {
            util::put_headers(
                headers_mut,
                request_data
                    .headers
                    .iter()
                    .map(|(name, value)| (name, value))
                    .filter(|(name, _)| name.as_str() != "host"),
            )?;
        }

        let request: Request<Body> = request_builder.body(request_data.body.clone().into())?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status_code = response.status().as_u16();
        let headers = util::extract_headers(response.headers());
        let body = body::to_bytes(response.into_body())
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(ResponseData {
            status_code,
            headers,
            body: String::from_utf8_lossy(&body).into(),
        })
    }
}
