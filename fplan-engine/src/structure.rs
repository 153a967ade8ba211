use fplan_core::document::{Entity, compute_bounds};
use fplan_core::geometry::Bounds2D;
use serde::Serialize;
use tracing::info;

use crate::features::{Door, Features, Wall, Window};
use crate::rooms::{Room, RoomId, infer_rooms, link_door_rooms};

/// 推断管线的完整输出。每次从实体列表整体重建，不做增量更新。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloorStructure {
    pub rooms: Vec<Room>,
    pub walls: Vec<Wall>,
    pub doors: Vec<Door>,
    pub windows: Vec<Window>,
    pub bounds: Bounds2D,
}

impl FloorStructure {
    /// 计算范围（空或退化时使用默认范围），提取要素，推断房间并回填门的归属。
    pub fn from_entities(entities: &[Entity]) -> Self {
        let measured = compute_bounds(entities);
        let bounds = Bounds2D::or_fallback(measured);
        let Features {
            walls,
            mut doors,
            windows,
        } = Features::extract(entities);
        let rooms = infer_rooms(&walls, &doors, &windows, Some(bounds));
        link_door_rooms(&mut doors, &rooms);

        info!(
            entities = entities.len(),
            fallback_bounds = measured.is_none_or(|b| b.is_degenerate()),
            rooms = rooms.len(),
            walls = walls.len(),
            doors = doors.len(),
            windows = windows.len(),
            "平面结构重建完成"
        );

        Self {
            rooms,
            walls,
            doors,
            windows,
            bounds,
        }
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.index()).filter(|room| room.id == id)
    }

    pub fn room_walls<'a>(&'a self, room: &'a Room) -> impl Iterator<Item = &'a Wall> + 'a {
        room.walls.iter().filter_map(|&index| self.walls.get(index))
    }

    pub fn room_doors<'a>(&'a self, room: &'a Room) -> impl Iterator<Item = &'a Door> + 'a {
        room.doors.iter().filter_map(|&index| self.doors.get(index))
    }

    pub fn room_windows<'a>(&'a self, room: &'a Room) -> impl Iterator<Item = &'a Window> + 'a {
        room.windows.iter().filter_map(|&index| self.windows.get(index))
    }
}
