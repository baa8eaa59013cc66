use std::{collections::HashMap, io::Error, net::SocketAddr};

use bytes::Bytes;
use http_body_util::{BodyExt, Empty, Full};
use hyper::{
    body::{self, Buf},
    header::{self, HeaderValue},
    server::conn::http1,
    Method, Request, Response,
};
use hyper_util::{rt::TokioIo, service::TowerToHyperService};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{application::api::person::person_router, domain::person::PersonManager};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

pub const PERSONS_BASE_PATH: &str = "/api/persons";

#[derive(Debug, Serialize, PartialEq)]
pub struct HttpError<'a> {
    code: u16,
    error: &'a str,
    details: &'a str,
}
impl<'a> HttpError<'a> {
    pub const fn new(code: u16, error: &'a str, details: &'a str) -> Self {
        HttpError {
            code,
            error,
            details,
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }
    pub fn error(&self) -> &str {
        self.error
    }
}

pub const INTERNAL_ERROR: HttpError = HttpError {
    code: 500,
    error: "InternalError",
    details: "An internal error occured, please contact our technical service",
};

pub const NOT_FOUND_ERROR: HttpError = HttpError {
    code: 404,
    error: "NotFound",
    details: "The requested resource is not found",
};

/// Successful outcome of a sub-router, before it is written on the wire.
#[derive(Debug, PartialEq)]
pub struct ApiResponse {
    status: u16,
    body: Option<Value>,
    location: Option<String>,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: Some(body),
            location: None,
        }
    }

    pub fn created(body: Value, location: String) -> Self {
        Self {
            status: 201,
            body: Some(body),
            location: Some(location),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
            location: None,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

#[derive(Debug)]
pub enum APIError {
    ConfigurationError(String),
    RequestError(HttpError<'static>),
}

impl From<APIError> for Response<BoxBody> {
    fn from(value: APIError) -> Self {
        let err = match value {
            APIError::RequestError(err) => err,
            APIError::ConfigurationError(e) => {
                log::error!("Configuration error while serving a request: {}", e);
                INTERNAL_ERROR
            }
        };
        Response::builder()
            .status(err.code)
            .header(header::CONTENT_TYPE, "application/json")
            .body(full(serde_json::to_string(&err).expect("Should not fail")))
            .expect("Should not fail")
    }
}

pub struct MainRouter {
    person_manager: PersonManager,
    bind_address: SocketAddr,
}

impl MainRouter {
    pub fn new(person_manager: PersonManager, bind_address: SocketAddr) -> Self {
        return Self {
            person_manager,
            bind_address,
        };
    }

    /// Serves connections until Ctrl-C is received.
    pub async fn run(&self) -> Result<(), APIError> {
        let listener = TcpListener::bind(self.bind_address)
            .await
            .map_err(|e| APIError::ConfigurationError(e.to_string()))?;
        log::info!("Listening on http://{}", self.bind_address);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        // We start a loop to continuously accept incoming connections
        loop {
            let (stream, remote) = tokio::select! {
                accepted = listener.accept() => {
                    accepted.map_err(|e| APIError::ConfigurationError(e.to_string()))?
                }
                _ = &mut shutdown => {
                    log::info!("Shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
            };
            log::debug!("Accepted connection from {}", remote);

            // Use an adapter to access something implementing `tokio::io` traits as if they implement
            // `hyper::rt` IO traits.
            let io = TokioIo::new(stream);

            let person_manager_cloned = self.person_manager.clone();
            tokio::task::spawn(async move {
                let cors = CorsLayer::new()
                    .allow_origin(AllowOrigin::any())
                    .allow_methods(vec![
                        Method::GET,
                        Method::POST,
                        Method::PUT,
                        Method::DELETE,
                        Method::OPTIONS,
                    ])
                    .allow_headers(vec![header::CONTENT_TYPE])
                    .expose_headers(vec![header::LOCATION]);
                let service = ServiceBuilder::new().layer(cors).service_fn(|r| {
                    let person_manager_cloned = person_manager_cloned.clone();
                    async {
                        let res = match route_requests(r, person_manager_cloned).await {
                            Ok(r) => r,
                            Err(e) => e.into(),
                        };
                        Ok::<Response<BoxBody>, Error>(res)
                    }
                });
                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, TowerToHyperService::new(service))
                    .await
                {
                    log::error!("Error serving connection: {:?}", err);
                }
            });
        }
    }
}

async fn route_requests(
    request: Request<body::Incoming>,
    person_manager: PersonManager,
) -> Result<Response<BoxBody>, APIError> {
    let path = request.uri().path().to_string();
    let params = request.uri().query().unwrap_or_default().to_string();
    let method = request.method().clone();
    let whole_body = request
        .collect()
        .await
        .map_err(|e| {
            log::error!("An internal error occured while reading the body: {:?}", e);
            APIError::RequestError(INTERNAL_ERROR)
        })?
        .aggregate();
    // An unreadable body becomes Null and is rejected by the sub-router that needs one.
    let body: Value = serde_json::from_reader(whole_body.reader()).unwrap_or(Value::Null);
    let resp = dispatch(&method, &path, &params, body, &person_manager)
        .await
        .map_err(|e| {
            if let APIError::RequestError(err) = &e {
                log::info!("{} {} -> {}", method, path, err.code);
            }
            e
        })?;
    log::info!("{} {} -> {}", method, path, resp.status);

    let builder = Response::builder().status(resp.status);
    let builder = match &resp.location {
        Some(location) => builder.header(
            header::LOCATION,
            HeaderValue::from_str(location).map_err(|e| {
                log::error!("Invalid location header {}: {}", location, e);
                APIError::RequestError(INTERNAL_ERROR)
            })?,
        ),
        None => builder,
    };
    let response = match resp.body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(full(body.to_string())),
        None => builder.body(empty()),
    };
    response.map_err(|e| {
        log::error!("An internal error occured while building the response: {}", e);
        APIError::RequestError(INTERNAL_ERROR)
    })
}

/// Routes a decoded request to the sub-router owning its path.
pub async fn dispatch(
    method: &Method,
    path: &str,
    raw_params: &str,
    body: Value,
    person_manager: &PersonManager,
) -> Result<ApiResponse, APIError> {
    let mut splitted_path = path.split("/").skip(1);
    if splitted_path.next() != Some("api") {
        return Err(APIError::RequestError(NOT_FOUND_ERROR));
    }
    let query_params = get_query_params_from_raw(raw_params);
    match splitted_path.next() {
        Some("persons") => {
            let partial_path = &splitted_path.collect::<Vec<&str>>().join("/");
            person_router::router(partial_path, &query_params, method, body, person_manager)
                .await
                .map_err(APIError::RequestError)
        }
        _ => Err(APIError::RequestError(NOT_FOUND_ERROR)),
    }
}

fn full<T: Into<Bytes>>(chunk: T) -> BoxBody {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

fn empty() -> BoxBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

fn decode_query_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn get_query_params_from_raw(raw_params: &str) -> HashMap<String, String> {
    let mut query_params = HashMap::new();
    for query_param in raw_params.split("&") {
        if let Some((var, val)) = query_param.split_once("=") {
            query_params.insert(decode_query_component(var), decode_query_component(val));
        }
    }
    query_params
}
