//! Common test utilities for typed-queue integration tests
//!
//! This module provides:
//! - An SQS Query API simulator that wiremock serves over HTTP
//! - Helper functions for building clients and queues against it

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use typed_queue::{
    HttpSqsClient, OutputQueueConfig, QueueEndpoint, SqsClientConfig, SqsOutputQueue,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const QUEUE_URL: &str = "http://localhost:4566/000000000000/integration";

// ============================================================================
// SQS Simulator
// ============================================================================

/// One request received by the simulator
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub struct RecordedRequest {
    pub action: String,
    pub queue_url: Option<String>,
    /// Message bodies in request order
    pub bodies: Vec<String>,
}

#[derive(Default)]
struct SimulatorState {
    requests: Vec<RecordedRequest>,
    failures: HashMap<usize, (u16, String)>,
    reject_bodies_containing: Option<String>,
    next_message_id: u64,
}

/// Answers `SendMessage` and `SendMessageBatch` like SQS does.
///
/// Requests are numbered from zero in arrival order; a scripted failure
/// replaces the response to one request with an `ErrorResponse`.
#[derive(Clone, Default)]
pub struct SqsSimulator {
    state: Arc<Mutex<SimulatorState>>,
}

#[allow(dead_code)]
impl SqsSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer request `index` with an error
    pub fn fail_request(&self, index: usize, status: u16, code: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(index, (status, code.to_string()));
    }

    /// Reject batch entries whose body contains `needle`
    pub fn reject_bodies_containing(&self, needle: &str) {
        self.state.lock().unwrap().reject_bodies_containing = Some(needle.to_string());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Number of bodies carried by each batch request, in order
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.requests()
            .iter()
            .filter(|r| r.action == "SendMessageBatch")
            .map(|r| r.bodies.len())
            .collect()
    }

    /// Mount the simulator on a mock server
    pub async fn mount(&self, server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(self.clone())
            .mount(server)
            .await;
    }
}

impl Respond for SqsSimulator {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let params: Vec<(String, String)> = url::form_urlencoded::parse(&request.body)
            .into_owned()
            .collect();
        let param = |name: &str| {
            params
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };

        let action = param("Action").unwrap_or_default();
        let entries = batch_entries(&params);
        let bodies = match action.as_str() {
            "SendMessage" => param("MessageBody").into_iter().collect(),
            _ => entries.iter().map(|(_, body)| body.clone()).collect(),
        };

        let mut state = self.state.lock().unwrap();
        let index = state.requests.len();
        state.requests.push(RecordedRequest {
            action: action.clone(),
            queue_url: param("QueueUrl"),
            bodies,
        });

        if let Some((status, code)) = state.failures.remove(&index) {
            return ResponseTemplate::new(status).set_body_string(error_xml(&code));
        }

        match action.as_str() {
            "SendMessage" => {
                let message_id = next_message_id(&mut state);
                ResponseTemplate::new(200).set_body_string(format!(
                    "<SendMessageResponse><SendMessageResult>\
                     <MessageId>{}</MessageId>\
                     </SendMessageResult></SendMessageResponse>",
                    message_id
                ))
            }
            "SendMessageBatch" => {
                let mut results = String::new();
                for (id, body) in &entries {
                    let rejected = state
                        .reject_bodies_containing
                        .as_deref()
                        .is_some_and(|needle| body.contains(needle));
                    if rejected {
                        results.push_str(&format!(
                            "<BatchResultErrorEntry><Id>{}</Id>\
                             <Code>InvalidMessageContents</Code>\
                             <Message>Rejected by simulator</Message>\
                             <SenderFault>true</SenderFault></BatchResultErrorEntry>",
                            id
                        ));
                    } else {
                        let message_id = next_message_id(&mut state);
                        results.push_str(&format!(
                            "<SendMessageBatchResultEntry><Id>{}</Id>\
                             <MessageId>{}</MessageId></SendMessageBatchResultEntry>",
                            id, message_id
                        ));
                    }
                }
                ResponseTemplate::new(200).set_body_string(format!(
                    "<SendMessageBatchResponse><SendMessageBatchResult>{}\
                     </SendMessageBatchResult></SendMessageBatchResponse>",
                    results
                ))
            }
            _ => ResponseTemplate::new(400).set_body_string(error_xml("InvalidAction")),
        }
    }
}

fn next_message_id(state: &mut SimulatorState) -> String {
    state.next_message_id += 1;
    format!("00000000-0000-0000-0000-{:012}", state.next_message_id)
}

/// `(Id, MessageBody)` pairs ordered by entry number
fn batch_entries(params: &[(String, String)]) -> Vec<(String, String)> {
    let mut entries: BTreeMap<usize, (String, String)> = BTreeMap::new();

    for (key, value) in params {
        let Some(rest) = key.strip_prefix("SendMessageBatchRequestEntry.") else {
            continue;
        };
        let Some((number, field)) = rest.split_once('.') else {
            continue;
        };
        let Ok(number) = number.parse::<usize>() else {
            continue;
        };

        let entry = entries.entry(number).or_default();
        match field {
            "Id" => entry.0 = value.clone(),
            "MessageBody" => entry.1 = value.clone(),
            _ => {}
        }
    }

    entries.into_values().collect()
}

pub fn error_xml(code: &str) -> String {
    format!(
        "<ErrorResponse><Error><Type>Sender</Type><Code>{}</Code>\
         <Message>Simulated failure</Message></Error>\
         <RequestId>00000000-0000-0000-0000-000000000000</RequestId></ErrorResponse>",
        code
    )
}

// ============================================================================
// Builders
// ============================================================================

pub fn endpoint() -> QueueEndpoint {
    QueueEndpoint::new(QUEUE_URL).unwrap()
}

pub fn client_for(server: &MockServer) -> Arc<HttpSqsClient> {
    let config = SqsClientConfig {
        access_key_id: Some("AKIDEXAMPLE".to_string()),
        secret_access_key: Some("secret".to_string()),
        endpoint_url: Some(server.uri()),
        timeout_seconds: 5,
        ..SqsClientConfig::default()
    };
    Arc::new(HttpSqsClient::new(config).unwrap())
}

#[allow(dead_code)]
pub fn queue_for<T>(server: &MockServer) -> SqsOutputQueue<T, HttpSqsClient>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    SqsOutputQueue::new(client_for(server), OutputQueueConfig::new(endpoint())).unwrap()
}
