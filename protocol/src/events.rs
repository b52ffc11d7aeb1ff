//! Event name constants shared by both directions of the wire protocol.
//! These are the literal `name` strings carried in the first slot of a
//! `[name, data, ackId?]` frame element.

// Lobby protocol, client -> server.
pub const EVENT_WHOAMI: &str = "whoami";
pub const EVENT_ROOM_FETCH: &str = "room:fetch";
pub const EVENT_ROOM_CREATE: &str = "room:create";
pub const EVENT_ROOM_JOIN: &str = "room:join";
pub const EVENT_ROOM_LEAVE: &str = "room:leave";
pub const EVENT_PLAYER_READY: &str = "player:ready";
pub const EVENT_ROOM_CONFIG: &str = "room:config";
pub const EVENT_ROOM_START: &str = "room:start";

// Lobby protocol, server -> client.
pub const EVENT_ROOM_KICKED: &str = "room:kicked";
pub const EVENT_GAME_START: &str = "game:start";

// In-game protocol, client -> server.
pub const EVENT_PLAYER_MOVE: &str = "player:move";

// In-game protocol, server -> client.
pub const EVENT_POSITION: &str = "position";
pub const EVENT_ANGLE: &str = "angle";
pub const EVENT_AVATAR_DIE: &str = "avatar:die";
pub const EVENT_BONUS_POP: &str = "bonus:pop";
pub const EVENT_BONUS_CLEAR: &str = "bonus:clear";
pub const EVENT_ROUND_NEW: &str = "round:new";
pub const EVENT_ROUND_END: &str = "round:end";
pub const EVENT_END: &str = "end";

// Transport-level keepalive, both directions.
pub const EVENT_PING: &str = "ping";
pub const EVENT_PONG: &str = "pong";
