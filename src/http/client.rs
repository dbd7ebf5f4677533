use crate::http::config::HttpConfig;
use crate::http_client::{HttpClient, HttpClientError};
use http::{Request, Response};
use reqwest::blocking::{Client, Response as BlockingResponse};

/// [`HttpClient`] implementation performing blocking requests with reqwest.
#[derive(Debug, Clone)]
pub struct BlockingHttpClient {
    client: Client,
}

impl BlockingHttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, HttpBuildError> {
        let builder = Client::builder()
            .use_rustls_tls()
            .tls_built_in_native_certs(true)
            .timeout(config.timeout())
            .connect_timeout(config.conn_timeout());

        let client = builder
            .build()
            .map_err(|err| HttpBuildError::ClientBuilder(err.to_string()))?;

        Ok(Self { client })
    }
}

impl HttpClient for BlockingHttpClient {
    fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, HttpClientError> {
        let (parts, body) = request.into_parts();
        let res = self
            .client
            .request(parts.method, parts.uri.to_string().as_str())
            .headers(parts.headers)
            .body(body)
            .send()
            .map_err(|err| HttpClientError::TransportError(err.to_string()))?;

        try_build_response(res)
    }
}

fn try_build_response(res: BlockingResponse) -> Result<Response<Vec<u8>>, HttpClientError> {
    let status = res.status();
    let version = res.version();
    let headers = res.headers().clone();

    let body: Vec<u8> = res
        .bytes()
        .map_err(|err| HttpClientError::InvalidResponse(format!("reading body: {err}")))?
        .into();

    let mut response = Response::builder()
        .status(status)
        .version(version)
        .body(body)
        .map_err(|err| HttpClientError::InvalidResponse(err.to_string()))?;
    *response.headers_mut() = headers;

    Ok(response)
}

#[derive(thiserror::Error, Debug)]
pub enum HttpBuildError {
    #[error("could not build the http client: {0}")]
    ClientBuilder(String),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use http::header::{ACCEPT, CONTENT_TYPE};
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };

    use super::*;

    #[test]
    fn unsuccessful_status_is_returned_as_response() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/.well-known/smart-configuration")
                .header("accept", "application/fhir+json");
            then.status(404).body("not here");
        });

        let client = BlockingHttpClient::new(&HttpConfig::default()).unwrap();
        let request = Request::get(server.url("/.well-known/smart-configuration"))
            .header(ACCEPT, "application/fhir+json")
            .body(Vec::new())
            .unwrap();

        let response = client.send(request).unwrap();

        assert_eq!(response.status(), 404);
        assert_eq!(response.body(), b"not here");
        mock.assert();
    }

    #[test]
    fn post_body_and_headers_are_forwarded() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/token")
                .header("content-type", "application/x-www-form-urlencoded")
                .body("grant_type=client_credentials");
            then.status(201)
                .header("content-type", "application/json")
                .body(r#"{"access_token":"abc","expires_in":300}"#);
        });

        let client = BlockingHttpClient::new(&HttpConfig::default()).unwrap();
        let request = Request::post(server.url("/token"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(b"grant_type=client_credentials".to_vec())
            .unwrap();

        let response = client.send(request).unwrap();

        assert_eq!(response.status(), 201);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        mock.assert();
    }

    #[test]
    fn timeout_is_a_transport_error() {
        let timeout = Duration::from_millis(50);
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/metadata");
            then.status(200).delay(timeout + Duration::from_millis(100));
        });

        let client = BlockingHttpClient::new(&HttpConfig::with_timeout(timeout)).unwrap();
        let request = Request::get(server.url("/metadata"))
            .body(Vec::new())
            .unwrap();

        let error = client.send(request).unwrap_err();

        assert_matches!(error, HttpClientError::TransportError(_));
        mock.assert();
    }
}
