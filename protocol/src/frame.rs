//! JSON array framing: every WebSocket text frame is a JSON array
//! of events, each event being `[name, data]`, `[name, data, ackId]`, or —
//! for an ack response — `[ackId, [errorOrNull, resultOrNull]]`.
//!
//! Serde's derive machinery assumes fixed-shape tuples, so the heterogeneous
//! per-item shape here is encoded/decoded by hand through `serde_json::Value`,
//! the same escape hatch the corpus reaches for whenever a wire shape doesn't
//! map onto a plain struct.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Ack ids are positive integers, monotonic per sender.
pub type AckId = u64;

/// A single outbound wire item, ready to be placed in a frame array.
pub enum OutboundItem {
    /// `[name, data]` or `[name, data, ackId]`.
    Event {
        name: &'static str,
        data: Value,
        ack_id: Option<AckId>,
    },
    /// `[ackId, [errorOrNull, resultOrNull]]`.
    Ack {
        ack_id: AckId,
        error: Option<String>,
        result: Value,
    },
}

impl OutboundItem {
    pub fn event(name: &'static str, data: Value, ack_id: Option<AckId>) -> Self {
        OutboundItem::Event { name, data, ack_id }
    }

    pub fn ack_ok(ack_id: AckId, result: Value) -> Self {
        OutboundItem::Ack { ack_id, error: None, result }
    }

    pub fn ack_err(ack_id: AckId, error: impl Into<String>) -> Self {
        OutboundItem::Ack { ack_id, error: Some(error.into()), result: Value::Null }
    }

    fn to_value(&self) -> Value {
        match self {
            OutboundItem::Event { name, data, ack_id: None } => {
                Value::Array(vec![Value::String((*name).to_string()), data.clone()])
            }
            OutboundItem::Event { name, data, ack_id: Some(id) } => Value::Array(vec![
                Value::String((*name).to_string()),
                data.clone(),
                Value::from(*id),
            ]),
            OutboundItem::Ack { ack_id, error, result } => {
                let err_value = match error {
                    Some(e) => Value::String(e.clone()),
                    None => Value::Null,
                };
                Value::Array(vec![
                    Value::from(*ack_id),
                    Value::Array(vec![err_value, result.clone()]),
                ])
            }
        }
    }
}

/// A decoded inbound wire item.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundItem {
    Event {
        name: String,
        data: Value,
        ack_id: Option<AckId>,
    },
    Ack {
        ack_id: AckId,
        error: Option<String>,
        result: Value,
    },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FrameError {
    #[error("frame was not a JSON array: {0}")]
    NotAnArray(String),
    #[error("frame item was not an array: {0}")]
    ItemNotAnArray(String),
    #[error("frame item had an unexpected shape: {0}")]
    BadShape(String),
    #[error("invalid JSON: {0}")]
    Json(String),
}

impl fmt::Display for InboundItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InboundItem::Event { name, ack_id, .. } => write!(f, "event {name} (ack={ack_id:?})"),
            InboundItem::Ack { ack_id, .. } => write!(f, "ack {ack_id}"),
        }
    }
}

/// A full text frame: an ordered batch of events, coalesced from a single
/// tick.
pub struct Frame;

impl Frame {
    /// Serializes a batch of outbound items into one JSON array text frame.
    pub fn encode(items: &[OutboundItem]) -> Result<String, serde_json::Error> {
        let values: Vec<Value> = items.iter().map(OutboundItem::to_value).collect();
        serde_json::to_string(&Value::Array(values))
    }

    /// Parses a single text frame into its ordered list of items.
    pub fn decode(text: &str) -> Result<Vec<InboundItem>, FrameError> {
        let root: Value =
            serde_json::from_str(text).map_err(|e| FrameError::Json(e.to_string()))?;
        let Value::Array(items) = root else {
            return Err(FrameError::NotAnArray(text.to_string()));
        };
        items.into_iter().map(Self::decode_item).collect()
    }

    fn decode_item(value: Value) -> Result<InboundItem, FrameError> {
        let Value::Array(mut elems) = value else {
            return Err(FrameError::ItemNotAnArray(format!("{value}")));
        };
        match elems.first() {
            Some(Value::String(_)) => {
                if elems.len() < 2 || elems.len() > 3 {
                    return Err(FrameError::BadShape(format!("{elems:?}")));
                }
                let ack_id = if elems.len() == 3 {
                    match elems.pop() {
                        Some(Value::Number(n)) => Some(n.as_u64().ok_or_else(|| {
                            FrameError::BadShape("ackId was not a non-negative integer".into())
                        })?),
                        _ => return Err(FrameError::BadShape("ackId was not a number".into())),
                    }
                } else {
                    None
                };
                let data = elems.pop().unwrap_or(Value::Null);
                let Some(Value::String(name)) = elems.pop() else {
                    unreachable!("checked above");
                };
                Ok(InboundItem::Event { name, data, ack_id })
            }
            Some(Value::Number(_)) => {
                if elems.len() != 2 {
                    return Err(FrameError::BadShape(format!("{elems:?}")));
                }
                let Value::Array(mut pair) = elems.pop().unwrap() else {
                    return Err(FrameError::BadShape("ack payload was not [error, result]".into()));
                };
                if pair.len() != 2 {
                    return Err(FrameError::BadShape("ack payload must have 2 elements".into()));
                }
                let result = pair.pop().unwrap();
                let error = match pair.pop().unwrap() {
                    Value::Null => None,
                    Value::String(s) => Some(s),
                    other => return Err(FrameError::BadShape(format!("bad ack error: {other}"))),
                };
                let Some(Value::Number(n)) = elems.pop() else {
                    unreachable!("checked above");
                };
                let ack_id = n.as_u64().ok_or_else(|| {
                    FrameError::BadShape("ackId was not a non-negative integer".into())
                })?;
                Ok(InboundItem::Ack { ack_id, error, result })
            }
            _ => Err(FrameError::BadShape(format!("{elems:?}"))),
        }
    }
}

/// Convenience for building the `data` `Value` of an event from any
/// serializable payload.
pub fn to_data<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).expect("event payload must serialize")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_event_without_ack() {
        let decoded = Frame::decode(r#"[["whoami", null]]"#).unwrap();
        assert_eq!(
            decoded,
            vec![InboundItem::Event { name: "whoami".into(), data: Value::Null, ack_id: None }]
        );
    }

    #[test]
    fn decodes_event_with_ack() {
        let decoded = Frame::decode(r#"[["room:create", {"name":"lobby"}, 7]]"#).unwrap();
        match &decoded[0] {
            InboundItem::Event { name, ack_id, .. } => {
                assert_eq!(name, "room:create");
                assert_eq!(*ack_id, Some(7));
            }
            _ => panic!("expected event"),
        }
    }

    #[test]
    fn decodes_ack_response() {
        let decoded = Frame::decode(r#"[[7, [null, "S1"]]]"#).unwrap();
        match &decoded[0] {
            InboundItem::Ack { ack_id, error, result } => {
                assert_eq!(*ack_id, 7);
                assert_eq!(*error, None);
                assert_eq!(*result, Value::String("S1".into()));
            }
            _ => panic!("expected ack"),
        }
    }

    #[test]
    fn encode_then_decode_is_identity_for_shape() {
        let items = vec![
            OutboundItem::event("whoami", Value::Null, Some(1)),
            OutboundItem::ack_ok(1, Value::String("S1".into())),
        ];
        let text = Frame::encode(&items).unwrap();
        let decoded = Frame::decode(&text).unwrap();
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn rejects_malformed_frame() {
        assert!(Frame::decode(r#"{"not":"an array"}"#).is_err());
        assert!(Frame::decode(r#"[["only_one"]]"#).is_err());
    }
}
