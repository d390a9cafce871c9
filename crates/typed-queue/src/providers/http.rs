//! HTTP network client for AWS SQS.
//!
//! [`HttpSqsClient`] speaks the SQS Query API (version `2012-11-05`) directly
//! over `reqwest`. Every call is a `POST /` against the regional service
//! endpoint, or the configured `endpoint_url`, with the action parameters in an
//! `application/x-www-form-urlencoded` body. Requests are signed with AWS
//! Signature Version 4 and responses are parsed from XML with `quick-xml`.
//!
//! ## Authentication
//!
//! Only explicit credentials from [`SqsClientConfig`] are supported. A client
//! built without credentials can be constructed, but every call fails with
//! [`ProviderError::MISSING_CREDENTIALS`] before any request is sent.
//!
//! ## Errors
//!
//! Non-success responses are parsed from the SQS `ErrorResponse` document and
//! returned with the service's own error code and the HTTP status, so that
//! [`SqsOutputQueue`](crate::providers::SqsOutputQueue) can classify them.
//!
//! ## References
//!
//! - [SQS Query API](https://docs.aws.amazon.com/AWSSimpleQueueService/latest/SQSDeveloperGuide/sqs-making-api-requests.html)
//! - [AWS Signature V4](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)

use crate::error::{ConfigurationError, ProviderError};
use crate::message::QueueEndpoint;
use crate::provider::{ProviderType, SqsClientConfig};
use crate::providers::sqs::{
    BatchEntry, BatchErrorEntry, BatchResultEntry, SendBatchOutput, SendMessageOutput, SqsApi,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client as HttpClient;
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;

type HmacSha256 = Hmac<Sha256>;

/// SQS Query API version sent with every request
pub const SQS_API_VERSION: &str = "2012-11-05";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

// ============================================================================
// AWS Signature V4 Signing
// ============================================================================

/// AWS Signature Version 4 signer for SQS requests.
///
/// Signs `POST` requests with an empty query string. The signed headers are
/// `content-type`, `host` and `x-amz-date`, plus `x-amz-security-token` when
/// temporary credentials are in use.
#[derive(Clone)]
struct AwsV4Signer {
    access_key: String,
    secret_key: String,
    session_token: Option<String>,
    region: String,
    service: String,
}

impl AwsV4Signer {
    fn new(
        access_key: String,
        secret_key: String,
        session_token: Option<String>,
        region: String,
    ) -> Self {
        Self {
            access_key,
            secret_key,
            session_token,
            region,
            service: "sqs".to_string(),
        }
    }

    /// Sign a form-encoded `POST /` request.
    ///
    /// Returns the headers to add to the request: `Authorization`,
    /// `x-amz-date` and, for temporary credentials, `x-amz-security-token`.
    fn sign_request(
        &self,
        host: &str,
        body: &str,
        timestamp: &DateTime<Utc>,
    ) -> Result<Vec<(String, String)>, ProviderError> {
        let date_stamp = timestamp.format("%Y%m%d").to_string();
        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();

        // Canonical headers must be sorted by name
        let mut canonical_headers = format!(
            "content-type:{}\nhost:{}\nx-amz-date:{}\n",
            FORM_CONTENT_TYPE, host, amz_date
        );
        let mut signed_headers = "content-type;host;x-amz-date".to_string();
        if let Some(token) = &self.session_token {
            canonical_headers.push_str(&format!("x-amz-security-token:{}\n", token));
            signed_headers.push_str(";x-amz-security-token");
        }

        let payload_hash = format!("{:x}", Sha256::digest(body.as_bytes()));

        let canonical_request = format!(
            "POST\n/\n\n{}\n{}\n{}",
            canonical_headers, signed_headers, payload_hash
        );

        let algorithm = "AWS4-HMAC-SHA256";
        let credential_scope = format!(
            "{}/{}/{}/aws4_request",
            date_stamp, self.region, self.service
        );
        let canonical_request_hash = format!("{:x}", Sha256::digest(canonical_request.as_bytes()));

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            algorithm, amz_date, credential_scope, canonical_request_hash
        );

        let signature = self.calculate_signature(&string_to_sign, &date_stamp)?;

        let authorization_header = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            algorithm, self.access_key, credential_scope, signed_headers, signature
        );

        let mut headers = vec![
            ("Authorization".to_string(), authorization_header),
            ("x-amz-date".to_string(), amz_date),
        ];
        if let Some(token) = &self.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }

        Ok(headers)
    }

    /// Derive the signing key and sign `string_to_sign`
    fn calculate_signature(
        &self,
        string_to_sign: &str,
        date_stamp: &str,
    ) -> Result<String, ProviderError> {
        let k_secret = format!("AWS4{}", self.secret_key);
        let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes())?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, self.service.as_bytes())?;
        let k_signing = hmac_sha256(&k_service, b"aws4_request")?;
        let signature = hmac_sha256(&k_signing, string_to_sign.as_bytes())?;

        Ok(hex::encode(signature))
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| {
        ProviderError::local(
            ProviderType::AwsSqs,
            "SigningFailed",
            format!("Cannot create HMAC key: {}", e),
        )
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

// ============================================================================
// HTTP SQS Client
// ============================================================================

/// SQS network client over HTTP.
///
/// Cheap to share behind an `Arc`; the underlying `reqwest` client pools
/// connections.
pub struct HttpSqsClient {
    http_client: HttpClient,
    signer: Option<AwsV4Signer>,
    endpoint: Url,
    host: String,
    config: SqsClientConfig,
}

impl HttpSqsClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the endpoint is not
    /// an absolute URL with a host, or the HTTP client cannot be built.
    pub fn new(config: SqsClientConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let endpoint_str = config.service_endpoint();
        let endpoint = Url::parse(&endpoint_str).map_err(|e| ConfigurationError::Invalid {
            message: format!("Invalid SQS endpoint '{}': {}", endpoint_str, e),
        })?;

        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ConfigurationError::Invalid {
                    message: format!("SQS endpoint '{}' has no host", endpoint_str),
                })
            }
        };

        let signer = match (&config.access_key_id, &config.secret_access_key) {
            (Some(access_key), Some(secret_key)) => Some(AwsV4Signer::new(
                access_key.clone(),
                secret_key.clone(),
                config.session_token.clone(),
                config.region.clone(),
            )),
            _ => None,
        };

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ConfigurationError::Invalid {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            signer,
            endpoint,
            host,
            config,
        })
    }

    /// Service endpoint requests are sent to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Resolve a queue name to its queue URL with `GetQueueUrl`
    #[instrument(skip(self))]
    pub async fn get_queue_url(&self, queue_name: &str) -> Result<QueueEndpoint, ProviderError> {
        let params = vec![
            ("Action".to_string(), "GetQueueUrl".to_string()),
            ("QueueName".to_string(), queue_name.to_string()),
        ];

        let response = self.make_request(params).await?;
        let queue_url = parse_queue_url_response(&response)?;

        QueueEndpoint::new(&queue_url).map_err(|e| {
            ProviderError::malformed_response(
                ProviderType::AwsSqs,
                format!("GetQueueUrl returned an unusable URL '{}': {}", queue_url, e),
            )
        })
    }

    /// Sign and send one Query API call, returning the success body
    async fn make_request(&self, mut params: Vec<(String, String)>) -> Result<String, ProviderError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            ProviderError::local(
                ProviderType::AwsSqs,
                ProviderError::MISSING_CREDENTIALS,
                "No credentials configured",
            )
        })?;

        params.push(("Version".to_string(), SQS_API_VERSION.to_string()));
        let body = encode_form(&params);

        let timestamp = Utc::now();
        let auth_headers = signer.sign_request(&self.host, &body, &timestamp)?;

        let mut request = self
            .http_client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE);
        for (key, value) in auth_headers {
            request = request.header(&key, value);
        }

        let response = request.body(body).send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("Request timeout: {}", e)
            } else if e.is_connect() {
                format!("Connection failed: {}", e)
            } else {
                format!("HTTP request failed: {}", e)
            };
            ProviderError::transport(ProviderType::AwsSqs, message)
        })?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| {
            ProviderError::transport(
                ProviderType::AwsSqs,
                format!("Failed to read response body: {}", e),
            )
        })?;

        if !status.is_success() {
            let error = parse_error_response(&response_body, status.as_u16());
            debug!(code = %error.code, status = status.as_u16(), "SQS request failed");
            return Err(error);
        }

        Ok(response_body)
    }
}

impl fmt::Debug for HttpSqsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSqsClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("config", &self.config)
            .field("has_credentials", &self.signer.is_some())
            .finish()
    }
}

#[async_trait]
impl SqsApi for HttpSqsClient {
    #[instrument(skip(self, queue_url, body), fields(queue = %queue_url, body_len = body.len()))]
    async fn send_message(
        &self,
        queue_url: &QueueEndpoint,
        body: &str,
    ) -> Result<SendMessageOutput, ProviderError> {
        let params = vec![
            ("Action".to_string(), "SendMessage".to_string()),
            ("QueueUrl".to_string(), queue_url.as_str().to_string()),
            ("MessageBody".to_string(), body.to_string()),
        ];

        let response = self.make_request(params).await?;
        parse_send_message_response(&response)
    }

    #[instrument(skip(self, queue_url, entries), fields(queue = %queue_url, entries = entries.len()))]
    async fn send_message_batch(
        &self,
        queue_url: &QueueEndpoint,
        entries: &[BatchEntry],
    ) -> Result<SendBatchOutput, ProviderError> {
        let mut params = Vec::with_capacity(2 + entries.len() * 2);
        params.push(("Action".to_string(), "SendMessageBatch".to_string()));
        params.push(("QueueUrl".to_string(), queue_url.as_str().to_string()));

        // Entry parameters are numbered from one
        for (idx, entry) in entries.iter().enumerate() {
            params.push((
                format!("SendMessageBatchRequestEntry.{}.Id", idx + 1),
                entry.id.clone(),
            ));
            params.push((
                format!("SendMessageBatchRequestEntry.{}.MessageBody", idx + 1),
                entry.message_body.clone(),
            ));
        }

        let response = self.make_request(params).await?;
        parse_send_message_batch_response(&response)
    }
}

// ============================================================================
// Request Encoding
// ============================================================================

fn encode_form(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

// ============================================================================
// Response Parsing
// ============================================================================

fn xml_error(err: impl fmt::Display) -> ProviderError {
    ProviderError::malformed_response(
        ProviderType::AwsSqs,
        format!("XML parsing error: {}", err),
    )
}

/// Parse a `GetQueueUrl` response
fn parse_queue_url_response(xml: &str) -> Result<String, ProviderError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut in_queue_url = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"QueueUrl" => {
                in_queue_url = true;
            }
            Ok(Event::Text(e)) if in_queue_url => {
                return e.unescape().map(|s| s.into_owned()).map_err(xml_error);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Err(ProviderError::malformed_response(
        ProviderType::AwsSqs,
        "QueueUrl not found in response",
    ))
}

/// Parse a `SendMessage` response
fn parse_send_message_response(xml: &str) -> Result<SendMessageOutput, ProviderError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut in_message_id = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"MessageId" => {
                in_message_id = true;
            }
            Ok(Event::Text(e)) if in_message_id => {
                let message_id = e.unescape().map(|s| s.into_owned()).map_err(xml_error)?;
                return Ok(SendMessageOutput { message_id });
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Err(ProviderError::malformed_response(
        ProviderType::AwsSqs,
        "MessageId not found in response",
    ))
}

#[derive(Default)]
struct PartialEntry {
    id: Option<String>,
    message_id: Option<String>,
    code: Option<String>,
    message: Option<String>,
    sender_fault: bool,
}

/// Parse a `SendMessageBatch` response, both accepted and rejected entries
fn parse_send_message_batch_response(xml: &str) -> Result<SendBatchOutput, ProviderError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut output = SendBatchOutput::default();
    let mut entry: Option<PartialEntry> = None;
    let mut field: Option<Vec<u8>> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"SendMessageBatchResultEntry" | b"BatchResultErrorEntry" => {
                    entry = Some(PartialEntry::default());
                }
                name if entry.is_some() => field = Some(name.to_vec()),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let (Some(current), Some(name)) = (entry.as_mut(), field.as_deref()) {
                    let text = e.unescape().map(|s| s.into_owned()).map_err(xml_error)?;
                    match name {
                        b"Id" => current.id = Some(text),
                        b"MessageId" => current.message_id = Some(text),
                        b"Code" => current.code = Some(text),
                        b"Message" => current.message = Some(text),
                        b"SenderFault" => current.sender_fault = text == "true",
                        _ => {}
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"SendMessageBatchResultEntry" => {
                    let current = entry.take().unwrap_or_default();
                    output.successful.push(BatchResultEntry {
                        id: required(current.id, "Id")?,
                        message_id: required(current.message_id, "MessageId")?,
                    });
                }
                b"BatchResultErrorEntry" => {
                    let current = entry.take().unwrap_or_default();
                    output.failed.push(BatchErrorEntry {
                        id: required(current.id, "Id")?,
                        code: required(current.code, "Code")?,
                        message: current.message.unwrap_or_default(),
                        sender_fault: current.sender_fault,
                    });
                }
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(output)
}

fn required(value: Option<String>, element: &str) -> Result<String, ProviderError> {
    value.ok_or_else(|| {
        ProviderError::malformed_response(
            ProviderType::AwsSqs,
            format!("Batch result entry without {}", element),
        )
    })
}

/// Parse an `ErrorResponse` document into a provider error
fn parse_error_response(xml: &str, status_code: u16) -> ProviderError {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut error_code = None;
    let mut error_message = None;
    let mut in_error = false;
    let mut in_code = false;
    let mut in_message = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"Error" => in_error = true,
                b"Code" if in_error => in_code = true,
                b"Message" if in_error => in_message = true,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_code {
                    error_code = e.unescape().ok().map(|s| s.into_owned());
                    in_code = false;
                } else if in_message {
                    error_message = e.unescape().ok().map(|s| s.into_owned());
                    in_message = false;
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Error" => {
                in_error = false;
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let code = error_code.unwrap_or_else(|| "Unknown".to_string());
    let message = error_message.unwrap_or_else(|| format!("HTTP status {}", status_code));

    ProviderError::service(ProviderType::AwsSqs, code, message, status_code)
}
