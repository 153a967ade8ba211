//! 平面结构推断：从规范化实体中提取墙/门/窗，推断房间并组装 [`FloorStructure`]。

pub mod demo;
pub mod features;
pub mod rooms;
pub mod structure;

pub use features::{DEFAULT_DOOR_WIDTH, DEFAULT_WALL_THICKNESS, Door, Features, Wall, Window};
pub use rooms::{LayoutKind, Room, RoomId, RoomKind, classify_layout, classify_room, infer_rooms};
pub use structure::FloorStructure;
