/// Incoming request models and payload classification
use crate::constants::{WEBHOOK_INSERT_TYPE, WEBHOOK_QUEUE_TABLE};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt;
use thiserror::Error;

/// A validated request to send the welcome email to one recipient
#[derive(Debug, Clone, PartialEq)]
pub struct EmailRequest {
    pub name: String,
    pub email: String,
    /// Requesting user's id, when the caller supplied one
    pub id: Option<Value>,
}

/// Opaque identifier of a row in the email queue table
///
/// Echoed back verbatim in responses and passed to the status RPC.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueueId(Value);

impl QueueId {
    /// Wraps a JSON value; falsy ids (`null`, `false`, `0`, `""`) mean no queue row
    pub fn from_value(value: Value) -> Option<Self> {
        is_truthy(&value).then_some(Self(value))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

/// Shape of an incoming JSON body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Database webhook envelope for an insert into the queue table
    Webhook {
        data: Value,
        queue_id: Option<QueueId>,
    },
    /// Direct API call with the request nested under `record`
    Wrapped(Value),
    /// Direct API call with the request as the body itself
    Direct(Value),
}

/// Request after classification and validation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub request: EmailRequest,
    pub queue_id: Option<QueueId>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestRejection {
    #[error("Missing required fields: name and email")]
    MissingFields { received: Value },

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
}

impl Payload {
    /// Classifies a JSON body into one of the supported shapes
    pub fn classify(body: Value) -> Self {
        let Value::Object(body) = body else {
            return Self::Direct(body);
        };

        let record = body.get("record").filter(|r| is_truthy(r)).cloned();

        match record {
            Some(record) if is_queue_insert(&body) => {
                let queue_id = record
                    .get("id")
                    .cloned()
                    .and_then(QueueId::from_value);
                let data = json!({
                    "name": record.get("name").cloned().unwrap_or(Value::Null),
                    "email": record.get("email").cloned().unwrap_or(Value::Null),
                    "id": record.get("user_id").cloned().unwrap_or(Value::Null),
                });
                Self::Webhook { data, queue_id }
            }
            Some(record) => Self::Wrapped(record),
            None => Self::Direct(Value::Object(body)),
        }
    }

    /// Short label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Webhook { .. } => "webhook",
            Self::Wrapped(_) => "wrapped",
            Self::Direct(_) => "direct",
        }
    }

    pub fn queue_id(&self) -> Option<&QueueId> {
        match self {
            Self::Webhook { queue_id, .. } => queue_id.as_ref(),
            Self::Wrapped(_) | Self::Direct(_) => None,
        }
    }

    /// Validates the resolved request data
    ///
    /// `name` and `email` must be non-empty strings and `email` must be a
    /// valid mailbox address. No network I/O happens before this succeeds.
    pub fn resolve(self) -> Result<ResolvedRequest, RequestRejection> {
        let (data, queue_id) = match self {
            Self::Webhook { data, queue_id } => (data, queue_id),
            Self::Wrapped(data) | Self::Direct(data) => (data, None),
        };

        let name = non_empty_str(&data, "name").map(str::to_string);
        let email = non_empty_str(&data, "email").map(str::to_string);
        let (Some(name), Some(email)) = (name, email) else {
            return Err(RequestRejection::MissingFields { received: data });
        };

        email
            .parse::<lettre::Address>()
            .map_err(|e| RequestRejection::InvalidEmail(format!("{}: {}", email, e)))?;

        let request = EmailRequest {
            name,
            email,
            id: data.get("id").filter(|v| !v.is_null()).cloned(),
        };

        Ok(ResolvedRequest { request, queue_id })
    }
}

/// JavaScript truthiness of a JSON value
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn is_queue_insert(body: &Map<String, Value>) -> bool {
    body.get("type").and_then(Value::as_str) == Some(WEBHOOK_INSERT_TYPE)
        && body.get("table").and_then(Value::as_str) == Some(WEBHOOK_QUEUE_TABLE)
}

fn non_empty_str<'a>(data: &'a Value, field: &str) -> Option<&'a str> {
    data.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
