//! JSON wire protocol.
//!
//! A command is a JSON object `{"type", "payload", "response_channel"}`
//! popped from the service's command queue; the reply is a JSON object
//! `{"type", "payload"}` pushed onto the queue the command named.
//!
//! Decoding happens in two stages so the reply channel is known as early as
//! possible: [`RawCommand::parse`] only needs valid JSON with a
//! `response_channel`, and [`RawCommand::into_command`] then interprets the
//! rest. Anything that fails in the second stage can still be reported to
//! the client.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use session::ResetOutcome;
use sim::{EnvOptions, Observation, Transition};

use crate::DispatchError;

/// Where errors go when the command could not be read far enough to find
/// its own reply channel.
pub const DEFAULT_RESPONSE_CHANNEL: &str = "default_response_channel";

/// A decoded command.
///
/// `Unknown` keeps the whole original message so the error reply can echo
/// it back.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ping,
    /// Payload is interpreted only after the session state check, so a
    /// second create is rejected whatever it carries.
    EnvCreate { payload: Value },
    EnvReset,
    EnvStep { action: Vec<f64> },
    EnvSubmit,
    Unknown { raw: Value },
}

impl Command {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "PING",
            Command::EnvCreate { .. } => "ENV_CREATE",
            Command::EnvReset => "ENV_RESET",
            Command::EnvStep { .. } => "ENV_STEP",
            Command::EnvSubmit => "ENV_SUBMIT",
            Command::Unknown { .. } => "UNKNOWN",
        }
    }
}

/// A command that has been parsed as JSON and has a reply channel, but has
/// not been interpreted yet.
#[derive(Debug, Clone)]
pub struct RawCommand {
    value: Value,
    response_channel: String,
}

#[derive(Deserialize)]
struct StepPayload {
    action: Vec<f64>,
}

#[derive(Deserialize, Default)]
struct CreatePayload {
    #[serde(default)]
    visualize: bool,
}

impl RawCommand {
    /// # Errors
    ///
    /// [`DispatchError::Malformed`] for bytes that are not UTF-8 JSON,
    /// [`DispatchError::MissingResponseChannel`] when there is no string
    /// `response_channel`.
    pub fn parse(raw: &[u8]) -> Result<Self, DispatchError> {
        let value: Value = serde_json::from_slice(raw).map_err(DispatchError::Malformed)?;
        let response_channel = value
            .get("response_channel")
            .and_then(Value::as_str)
            .ok_or(DispatchError::MissingResponseChannel)?
            .to_string();
        Ok(Self {
            value,
            response_channel,
        })
    }

    #[must_use]
    pub fn response_channel(&self) -> &str {
        &self.response_channel
    }

    /// # Errors
    ///
    /// [`DispatchError::MissingField`] without a `type`,
    /// [`DispatchError::Payload`] when an `ENV_STEP` payload has no numeric
    /// `action` array.
    pub fn into_command(mut self) -> Result<Command, DispatchError> {
        let kind = match self.value.get("type") {
            None => return Err(DispatchError::MissingField("type")),
            Some(Value::String(kind)) => Some(kind.clone()),
            Some(_) => None,
        };
        let Some(kind) = kind else {
            return Ok(Command::Unknown { raw: self.value });
        };
        let payload = self
            .value
            .get_mut("payload")
            .map(Value::take)
            .unwrap_or(Value::Null);

        let command = match kind.as_str() {
            "PING" => Command::Ping,
            "ENV_CREATE" => Command::EnvCreate { payload },
            "ENV_RESET" => Command::EnvReset,
            "ENV_STEP" => {
                let StepPayload { action } =
                    serde_json::from_value(payload).map_err(DispatchError::Payload)?;
                Command::EnvStep { action }
            }
            "ENV_SUBMIT" => Command::EnvSubmit,
            _ => {
                // Put the payload back so the echo is the message as sent.
                if let Some(obj) = self.value.as_object_mut() {
                    if !payload.is_null() {
                        obj.insert("payload".to_string(), payload);
                    }
                }
                Command::Unknown { raw: self.value }
            }
        };
        Ok(command)
    }
}

/// Environment options for `ENV_CREATE`.
///
/// Only `visualize` is read; a missing or `null` payload means defaults.
///
/// # Errors
///
/// [`DispatchError::Payload`] when the payload is not an object or
/// `visualize` is not a boolean.
pub fn create_options(payload: Value) -> Result<EnvOptions, DispatchError> {
    let CreatePayload { visualize } = if payload.is_null() {
        CreatePayload::default()
    } else {
        serde_json::from_value(payload).map_err(DispatchError::Payload)?
    };
    Ok(EnvOptions {
        visualize,
        ..EnvOptions::default()
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseKind {
    Pong,
    EnvCreateResponse,
    EnvResetResponse,
    EnvStepResponse,
    EnvSubmitResponse,
    Error,
}

/// Reply envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    pub payload: Value,
}

impl Response {
    #[must_use]
    pub fn pong() -> Self {
        Self {
            kind: ResponseKind::Pong,
            payload: json!({}),
        }
    }

    #[must_use]
    pub fn created(observation: Observation) -> Self {
        Self {
            kind: ResponseKind::EnvCreateResponse,
            payload: json!({ "observation": observation }),
        }
    }

    /// `{"observation": [...]}` or `{"observation": false}` once the seeds
    /// are used up.
    #[must_use]
    pub fn reset(outcome: ResetOutcome) -> Self {
        let observation = match outcome {
            ResetOutcome::Observation(obs) => json!(obs),
            ResetOutcome::Exhausted => Value::Bool(false),
        };
        Self {
            kind: ResponseKind::EnvResetResponse,
            payload: json!({ "observation": observation }),
        }
    }

    /// # Errors
    ///
    /// [`DispatchError::Encode`] if the step info cannot be represented.
    pub fn step(transition: &Transition) -> Result<Self, DispatchError> {
        Ok(Self {
            kind: ResponseKind::EnvStepResponse,
            payload: serde_json::to_value(transition).map_err(DispatchError::Encode)?,
        })
    }

    /// The mean reward goes out as a bare number.
    #[must_use]
    pub fn submitted(mean_reward: f64) -> Self {
        Self {
            kind: ResponseKind::EnvSubmitResponse,
            payload: json!(mean_reward),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Error,
            payload: Value::String(message.into()),
        }
    }

    /// # Errors
    ///
    /// [`DispatchError::Encode`] on serialization failure.
    pub fn encode(&self) -> Result<String, DispatchError> {
        serde_json::to_string(self).map_err(DispatchError::Encode)
    }

    /// Mean reward carried by a submit response.
    #[must_use]
    pub fn mean_reward(&self) -> Option<f64> {
        match self.kind {
            ResponseKind::EnvSubmitResponse => self.payload.as_f64(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(raw: &str) -> Command {
        RawCommand::parse(raw.as_bytes()).unwrap().into_command().unwrap()
    }

    #[test]
    fn known_commands_decode() {
        assert_eq!(command(r#"{"type":"PING","payload":{},"response_channel":"r"}"#), Command::Ping);
        assert_eq!(command(r#"{"type":"ENV_RESET","response_channel":"r"}"#), Command::EnvReset);
        assert_eq!(command(r#"{"type":"ENV_SUBMIT","payload":{},"response_channel":"r"}"#), Command::EnvSubmit);
        assert_eq!(
            command(r#"{"type":"ENV_STEP","payload":{"action":[0.5,-1,2]},"response_channel":"r"}"#),
            Command::EnvStep {
                action: vec![0.5, -1.0, 2.0]
            }
        );
        assert_eq!(
            command(r#"{"type":"ENV_CREATE","payload":{"visualize":true},"response_channel":"r"}"#),
            Command::EnvCreate {
                payload: json!({"visualize": true})
            }
        );
    }

    #[test]
    fn unknown_type_keeps_whole_message() {
        let raw = r#"{"type":"FOO","payload":{"x":1},"response_channel":"r"}"#;
        let Command::Unknown { raw: echoed } = command(raw) else {
            panic!("expected Unknown");
        };
        assert_eq!(echoed, serde_json::from_str::<Value>(raw).unwrap());
    }

    #[test]
    fn non_string_type_is_unknown() {
        assert!(matches!(
            command(r#"{"type":7,"response_channel":"r"}"#),
            Command::Unknown { .. }
        ));
    }

    #[test]
    fn channel_is_found_before_the_rest_is_checked() {
        let raw = RawCommand::parse(br#"{"type":"ENV_STEP","payload":{},"response_channel":"mine"}"#).unwrap();
        assert_eq!(raw.response_channel(), "mine");
        assert!(matches!(raw.into_command(), Err(DispatchError::Payload(_))));
    }

    #[test]
    fn missing_type_is_an_error() {
        let raw = RawCommand::parse(br#"{"response_channel":"mine"}"#).unwrap();
        assert!(matches!(raw.into_command(), Err(DispatchError::MissingField("type"))));
    }

    #[test]
    fn unreadable_commands_have_no_channel() {
        assert!(matches!(RawCommand::parse(b"not json"), Err(DispatchError::Malformed(_))));
        assert!(matches!(
            RawCommand::parse(b"{\"type\":\"PING\",\"response_channel\":\"\xff\"}"),
            Err(DispatchError::Malformed(_))
        ));
        assert!(matches!(
            RawCommand::parse(br#"{"type":"PING"}"#),
            Err(DispatchError::MissingResponseChannel)
        ));
        assert!(matches!(
            RawCommand::parse(br#"{"type":"PING","response_channel":5}"#),
            Err(DispatchError::MissingResponseChannel)
        ));
    }

    #[test]
    fn create_options_default_and_reject_bad_types() {
        assert_eq!(create_options(Value::Null).unwrap(), EnvOptions::default());
        assert_eq!(create_options(json!({})).unwrap(), EnvOptions::default());
        assert!(create_options(json!({"visualize": true})).unwrap().visualize);
        assert!(create_options(json!({"visualize": "yes"})).is_err());
        assert!(create_options(json!([1, 2])).is_err());
    }

    #[test]
    fn response_envelopes() {
        assert_eq!(Response::pong().encode().unwrap(), r#"{"type":"PONG","payload":{}}"#);
        assert_eq!(
            Response::reset(ResetOutcome::Exhausted).encode().unwrap(),
            r#"{"type":"ENV_RESET_RESPONSE","payload":{"observation":false}}"#
        );
        assert_eq!(
            Response::submitted(2.5).encode().unwrap(),
            r#"{"type":"ENV_SUBMIT_RESPONSE","payload":2.5}"#
        );
        assert_eq!(
            Response::error("boom").encode().unwrap(),
            r#"{"type":"ERROR","payload":"boom"}"#
        );
    }

    #[test]
    fn client_side_decode_preserves_observation_order() {
        let obs = vec![3.0, -1.5, 0.0, 42.0, 1e-3];
        let wire = Response::created(obs.clone()).encode().unwrap();
        let back: Response = serde_json::from_str(&wire).unwrap();
        assert_eq!(back.kind, ResponseKind::EnvCreateResponse);
        let decoded: Vec<f64> = serde_json::from_value(back.payload["observation"].clone()).unwrap();
        assert_eq!(decoded, obs);
    }

    #[test]
    fn mean_reward_only_on_submit() {
        assert_eq!(Response::submitted(1.25).mean_reward(), Some(1.25));
        assert_eq!(Response::error("x").mean_reward(), None);
    }
}
