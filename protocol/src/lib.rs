//! Wire protocol shared between the arena server and its web client.
//!
//! Transport framing, ack-id correlation, the lobby/game event vocabulary and
//! the bonus kind enumeration all live here so that both `server` and any
//! future client tooling agree on exactly one definition of each.

mod errors;
mod events;
mod frame;
mod game;
mod lobby;

pub use errors::ErrorCode;
pub use events::{EVENT_ANGLE, EVENT_AVATAR_DIE, EVENT_BONUS_CLEAR, EVENT_BONUS_POP, EVENT_END,
    EVENT_GAME_START, EVENT_PING, EVENT_PLAYER_MOVE, EVENT_PONG, EVENT_POSITION,
    EVENT_ROOM_CONFIG, EVENT_ROOM_CREATE, EVENT_ROOM_FETCH, EVENT_ROOM_JOIN, EVENT_ROOM_KICKED,
    EVENT_ROOM_LEAVE, EVENT_ROOM_START, EVENT_ROUND_END, EVENT_ROUND_NEW, EVENT_WHOAMI,
    EVENT_PLAYER_READY};
pub use frame::{AckId, Frame, FrameError, InboundItem, OutboundItem, to_data};
pub use game::{AvatarDiePayload, BonusClearPayload, BonusKind, BonusPopPayload, EndPayload,
    PlayerMoveInput, PositionEntry, RoundEndEntry, RoundEndPayload, RoundNewEntry,
    RoundNewPayload};
pub use lobby::{PlayerSummary, RoomConfig, RoomConfigPatch, RoomConfigUpdate, RoomCreateRequest,
    RoomJoinRequest, RoomKickedPayload, RoomState, RoomSummary};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trips_through_json() {
        let items = vec![OutboundItem::event(EVENT_PING, serde_json::json!(12345_u64), None)];
        let text = Frame::encode(&items).expect("encode");
        let decoded = Frame::decode(&text).expect("decode");
        assert_eq!(decoded.len(), 1);
        match &decoded[0] {
            InboundItem::Event { name, ack_id, .. } => {
                assert_eq!(name, EVENT_PING);
                assert_eq!(*ack_id, None);
            }
            InboundItem::Ack { .. } => panic!("expected event"),
        }
    }
}
