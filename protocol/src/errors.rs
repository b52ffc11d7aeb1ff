/// Short string error codes sent back as the `error` element of an ack tuple.
///
/// The `Display` impl (derived by `thiserror`) is the canonical source of the
/// wire string for each variant — do not hand-roll the string anywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorCode {
    /// Another open room already uses this (normalized) name.
    #[error("name_taken")]
    NameTaken,
    /// No room with that name is currently open.
    #[error("room_not_found")]
    RoomNotFound,
    /// The room is already at its configured player cap.
    #[error("room_full")]
    RoomFull,
    /// The room is mid-round and not accepting joins.
    #[error("room_closed")]
    RoomClosed,
    /// The caller's session has no associated room.
    #[error("not_in_room")]
    NotInRoom,
    /// The action requires room leadership the caller does not have.
    #[error("not_leader")]
    NotLeader,
    /// The request payload was structurally invalid for the event.
    #[error("bad_input")]
    BadInput,
    /// `room:start` was attempted without enough ready players.
    #[error("not_enough_players")]
    NotEnoughPlayers,
    /// Synthetic ack error used for acks outstanding when a session closes.
    #[error("disconnected")]
    Disconnected,
    /// Unexpected server-side failure; the room is torn down.
    #[error("internal")]
    Internal,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NameTaken => "name_taken",
            ErrorCode::RoomNotFound => "room_not_found",
            ErrorCode::RoomFull => "room_full",
            ErrorCode::RoomClosed => "room_closed",
            ErrorCode::NotInRoom => "not_in_room",
            ErrorCode::NotLeader => "not_leader",
            ErrorCode::BadInput => "bad_input",
            ErrorCode::NotEnoughPlayers => "not_enough_players",
            ErrorCode::Disconnected => "disconnected",
            ErrorCode::Internal => "internal",
        }
    }
}

impl serde::Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
