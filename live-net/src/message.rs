use serde::{Deserialize, Serialize};

/// Namespace prefix for live-broadcast rooms on the realtime channel.
pub const ROOM_PREFIX: &str = "live";

/// Channel key for one broadcast room: `live:<room_name>`.
pub fn room_key(room_name: &str) -> String {
    format!("{ROOM_PREFIX}:{room_name}")
}

/// Events a participant emits into the room. The gateway stamps the
/// timestamp on fan-out, so outbound payloads carry none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "chat:message")]
    Chat { text: String },
    #[serde(rename = "reaction")]
    Reaction { emoji: String },
}

/// Events fanned out to every participant of the room. Delivery is
/// best-effort and arrival-ordered; `ts` is display metadata, never an
/// ordering key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum RoomEvent {
    #[serde(rename = "chat:message")]
    Chat { text: String, ts: i64 },
    #[serde(rename = "reaction")]
    Reaction { emoji: String, ts: i64 },
    /// Viewer-count signal from the channel's presence layer. The client
    /// renders whatever number it is given.
    #[serde(rename = "presence")]
    Presence { viewers: u32 },
}

/// Encode an outbound event as a JSON text frame.
pub fn encode_client(event: &ClientEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

/// Decode an inbound room event from JSON bytes.
pub fn decode_room(bytes: &[u8]) -> Result<RoomEvent, serde_json::Error> {
    serde_json::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_key_is_namespaced() {
        assert_eq!(room_key("r1"), "live:r1");
    }

    #[test]
    fn chat_event_wire_format() {
        let out = encode_client(&ClientEvent::Chat {
            text: "hi".into(),
        })
        .expect("encode");
        let value: serde_json::Value = serde_json::from_str(&out).expect("json");
        assert_eq!(value["event"], "chat:message");
        assert_eq!(value["data"]["text"], "hi");
        assert!(value["data"].get("ts").is_none());
    }

    #[test]
    fn inbound_chat_carries_timestamp() {
        let event = decode_room(br#"{"event":"chat:message","data":{"text":"hi","ts":1000}}"#)
            .expect("decode");
        assert_eq!(
            event,
            RoomEvent::Chat {
                text: "hi".into(),
                ts: 1000
            }
        );
    }

    #[test]
    fn reaction_and_presence_decode() {
        let reaction = decode_room(r#"{"event":"reaction","data":{"emoji":"🐾","ts":5}}"#.as_bytes())
            .expect("decode reaction");
        assert!(matches!(reaction, RoomEvent::Reaction { ts: 5, .. }));

        let presence = decode_room(br#"{"event":"presence","data":{"viewers":12}}"#)
            .expect("decode presence");
        assert_eq!(presence, RoomEvent::Presence { viewers: 12 });
    }

    #[test]
    fn unknown_event_is_an_error() {
        assert!(decode_room(br#"{"event":"typing","data":{}}"#).is_err());
    }
}
