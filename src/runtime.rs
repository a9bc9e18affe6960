use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use log::{debug, error};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use url::Url;

pub const RUNTIME_API_VAR: &str = "AWS_LAMBDA_RUNTIME_API";
const API_VERSION: &str = "2018-06-01";

const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
const DEADLINE_HEADER: &str = "Lambda-Runtime-Deadline-Ms";
const FUNCTION_ARN_HEADER: &str = "Lambda-Runtime-Invoked-Function-Arn";
const TRACE_ID_HEADER: &str = "Lambda-Runtime-Trace-Id";
const ERROR_TYPE_HEADER: &str = "Lambda-Runtime-Function-Error-Type";

const HANDLER_ERROR_TYPE: &str = "HandlerError";
const INIT_ERROR_TYPE: &str = "InitError";

// -----------------------------------------------------------------------------
// Models
// -----------------------------------------------------------------------------

/// Per-invocation metadata handed over by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationContext {
    pub request_id: String,
    pub deadline: Option<DateTime<Utc>>,
    pub invoked_function_arn: Option<String>,
    pub trace_id: Option<String>,
}

impl InvocationContext {
    /// Context for an invocation started outside the function platform.
    pub fn local() -> Self {
        InvocationContext {
            request_id: format!("local-{}", Utc::now().timestamp_millis()),
            deadline: None,
            invoked_function_arn: None,
            trace_id: None,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, RuntimeError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        let request_id = header(REQUEST_ID_HEADER)
            .filter(|id| !id.is_empty())
            .ok_or(RuntimeError::MissingHeader(REQUEST_ID_HEADER))?;

        let deadline = header(DEADLINE_HEADER)
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

        Ok(InvocationContext {
            request_id,
            deadline,
            invoked_function_arn: header(FUNCTION_ARN_HEADER),
            trace_id: header(TRACE_ID_HEADER),
        })
    }
}

impl fmt::Display for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} (function {}, deadline {}, trace {})",
            self.request_id,
            self.invoked_function_arn.as_deref().unwrap_or("<unknown>"),
            self.deadline
                .map(|deadline| deadline.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_else(|| "<none>".to_string()),
            self.trace_id.as_deref().unwrap_or("<none>"),
        )
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    #[serde(rename = "errorMessage")]
    pub error_message: String,

    #[serde(rename = "errorType")]
    pub error_type: String,

    #[serde(rename = "stackTrace")]
    pub stack_trace: Vec<String>,
}

impl ErrorResponse {
    pub fn new(error_type: &str, err: &anyhow::Error) -> Self {
        ErrorResponse {
            error_message: format!("{:#}", err),
            error_type: error_type.to_string(),
            stack_trace: err.chain().map(|cause| cause.to_string()).collect(),
        }
    }
}

#[derive(Debug)]
pub enum RuntimeError {
    MissingHeader(&'static str),
    InvalidEndpoint(url::ParseError),
    Http(reqwest::Error),
}

impl From<url::ParseError> for RuntimeError {
    fn from(err: url::ParseError) -> Self {
        RuntimeError::InvalidEndpoint(err)
    }
}

impl From<reqwest::Error> for RuntimeError {
    fn from(err: reqwest::Error) -> Self {
        RuntimeError::Http(err)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuntimeError::MissingHeader(name) => write!(f, "Missing header: {}", name),
            RuntimeError::InvalidEndpoint(err) => write!(f, "Invalid runtime endpoint: {}", err),
            RuntimeError::Http(err) => write!(f, "Runtime API request failed: {}", err),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::MissingHeader(_) => None,
            RuntimeError::InvalidEndpoint(err) => Some(err),
            RuntimeError::Http(err) => Some(err),
        }
    }
}

// -----------------------------------------------------------------------------
// Runtime API client
// -----------------------------------------------------------------------------

pub struct RuntimeClient {
    client: reqwest::Client,
    base: Url,
}

impl RuntimeClient {
    pub fn new(api: &str) -> Result<Self, RuntimeError> {
        let base = Url::parse(&format!("http://{}/{}/runtime/", api, API_VERSION))?;

        Ok(RuntimeClient {
            client: reqwest::Client::new(),
            base,
        })
    }

    pub fn from_env() -> Option<Result<Self, RuntimeError>> {
        dotenvy::var(RUNTIME_API_VAR)
            .ok()
            .filter(|api| !api.is_empty())
            .map(|api| Self::new(&api))
    }

    fn next_url(&self) -> Result<Url, RuntimeError> {
        Ok(self.base.join("invocation/next")?)
    }

    fn response_url(&self, request_id: &str) -> Result<Url, RuntimeError> {
        Ok(self
            .base
            .join(&format!("invocation/{}/response", request_id))?)
    }

    fn error_url(&self, request_id: &str) -> Result<Url, RuntimeError> {
        Ok(self.base.join(&format!("invocation/{}/error", request_id))?)
    }

    fn init_error_url(&self) -> Result<Url, RuntimeError> {
        Ok(self.base.join("init/error")?)
    }

    /// Long-polls for the next invocation.
    pub async fn next_invocation(
        &self,
    ) -> Result<(serde_json::Value, InvocationContext), RuntimeError> {
        let response = self
            .client
            .get(self.next_url()?)
            .send()
            .await?
            .error_for_status()?;

        let context = InvocationContext::from_headers(response.headers())?;
        let body = response.text().await?;

        Ok((parse_event(&body), context))
    }

    pub async fn send_response<T: Serialize>(
        &self,
        request_id: &str,
        payload: &T,
    ) -> Result<(), RuntimeError> {
        self.client
            .post(self.response_url(request_id)?)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    pub async fn send_error(
        &self,
        request_id: &str,
        err: &anyhow::Error,
    ) -> Result<(), RuntimeError> {
        self.post_error(self.error_url(request_id)?, HANDLER_ERROR_TYPE, err)
            .await
    }

    pub async fn send_init_error(&self, err: &anyhow::Error) -> Result<(), RuntimeError> {
        self.post_error(self.init_error_url()?, INIT_ERROR_TYPE, err)
            .await
    }

    async fn post_error(
        &self,
        url: Url,
        error_type: &str,
        err: &anyhow::Error,
    ) -> Result<(), RuntimeError> {
        self.client
            .post(url)
            .header(ERROR_TYPE_HEADER, error_type)
            .json(&ErrorResponse::new(error_type, err))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Serves invocations until the runtime API becomes unreachable. Handler
/// failures are reported per invocation and do not stop the loop.
pub async fn run<F, Fut, T>(runtime: &RuntimeClient, handler: F) -> Result<(), RuntimeError>
where
    F: Fn(serde_json::Value, InvocationContext) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
    T: Serialize,
{
    loop {
        let (event, context) = runtime.next_invocation().await?;
        let request_id = context.request_id.clone();

        debug!("invocation {} started", context);
        match handler(event, context).await {
            Ok(output) => runtime.send_response(&request_id, &output).await?,
            Err(err) => {
                error!("invocation {} failed: {:#}", request_id, err);
                runtime.send_error(&request_id, &err).await?;
            }
        }
    }
}

/// The event is opaque: anything that is not JSON is kept as a string.
fn parse_event(body: &str) -> serde_json::Value {
    if body.trim().is_empty() {
        return serde_json::Value::Null;
    }

    serde_json::from_str(body).unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
