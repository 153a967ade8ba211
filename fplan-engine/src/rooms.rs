//! 房间推断：由墙体布局生成候选区域，再挂接墙/门/窗并分类。
//!
//! 推断从不失败：没有任何候选区域时退化为覆盖整个范围的单个房间。

use std::collections::BTreeSet;
use std::fmt;

use fplan_core::geometry::Bounds2D;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::features::{Door, Wall, Window};

/// 网格单元边长（图纸单位）。
pub const GRID_CELL_SIZE: f64 = 50.0;
/// 判断单元内是否有墙体端点时，单元向外扩张的距离。
pub const CELL_WALL_TOLERANCE: f64 = 5.0;
/// 墙体方向与 60°/120° 的最大偏差（度）。
pub const TRIANGULAR_ANGLE_TOLERANCE: f64 = 15.0;
/// 判定为三角形布局所需的斜向墙体数量。
const TRIANGULAR_MIN_WALLS: usize = 2;

const BATHROOM_MAX_AREA: f64 = 500.0;
const BEDROOM_MAX_AREA: f64 = 1000.0;
const LIVING_MIN_AREA: f64 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayoutKind {
    Triangular,
    Grid,
}

/// 房间标识，序号即推断结果中的下标。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomId(pub usize);

impl RoomId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room-{}", self.0)
    }
}

impl Serialize for RoomId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Bathroom,
    Bedroom,
    Living,
    Room,
}

impl RoomKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RoomKind::Bathroom => "bathroom",
            RoomKind::Bedroom => "bedroom",
            RoomKind::Living => "living",
            RoomKind::Room => "room",
        }
    }

    /// 用于房间名称的首字母大写形式。
    pub fn title(self) -> &'static str {
        match self {
            RoomKind::Bathroom => "Bathroom",
            RoomKind::Bedroom => "Bedroom",
            RoomKind::Living => "Living",
            RoomKind::Room => "Room",
        }
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 推断出的房间。墙/门/窗只保存下标，指向推断时传入的集合。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub kind: RoomKind,
    pub bounds: Bounds2D,
    pub walls: Vec<usize>,
    pub doors: Vec<usize>,
    pub windows: Vec<usize>,
    pub area: f64,
}

/// 按面积与窗户数量分类，纯函数。
pub fn classify_room(area: f64, window_count: usize) -> RoomKind {
    if area < BATHROOM_MAX_AREA {
        RoomKind::Bathroom
    } else if area < BEDROOM_MAX_AREA {
        RoomKind::Bedroom
    } else if window_count > 1 || area > LIVING_MIN_AREA {
        RoomKind::Living
    } else {
        RoomKind::Room
    }
}

/// 统计接近 60° 或 120° 的墙体数量决定布局。方向不区分正反，零长度墙体忽略。
pub fn classify_layout(walls: &[Wall]) -> LayoutKind {
    let diagonal = walls
        .iter()
        .filter_map(Wall::angle)
        .map(|angle| angle.to_degrees().rem_euclid(180.0))
        .filter(|degrees| {
            (degrees - 60.0).abs() < TRIANGULAR_ANGLE_TOLERANCE
                || (degrees - 120.0).abs() < TRIANGULAR_ANGLE_TOLERANCE
        })
        .count();
    if diagonal >= TRIANGULAR_MIN_WALLS {
        LayoutKind::Triangular
    } else {
        LayoutKind::Grid
    }
}

/// 推断房间。`bounds` 为 `None`（空图纸）时返回空列表。
pub fn infer_rooms(
    walls: &[Wall],
    doors: &[Door],
    windows: &[Window],
    bounds: Option<Bounds2D>,
) -> Vec<Room> {
    let Some(bounds) = bounds.filter(|bounds| !bounds.is_empty()) else {
        debug!("缺少图纸范围，跳过房间推断");
        return Vec::new();
    };

    let layout = classify_layout(walls);
    let mut candidates = match layout {
        LayoutKind::Triangular => triangular_candidates(&bounds),
        LayoutKind::Grid => grid_candidates(&bounds, walls),
    };
    if candidates.is_empty() {
        candidates.push(bounds);
    }

    let rooms: Vec<Room> = candidates
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| build_room(index, candidate, walls, doors, windows))
        .collect();
    debug!(?layout, rooms = rooms.len(), "房间推断完成");
    rooms
}

/// 固定的三分划分：低 y 一侧左右两半，加上另一侧居中的一半宽度区域。
fn triangular_candidates(bounds: &Bounds2D) -> Vec<Bounds2D> {
    let center = bounds.center();
    let (mid_x, mid_y) = (center.x(), center.y());
    let quarter = bounds.width() / 4.0;
    vec![
        Bounds2D::from_extents(bounds.min_x(), bounds.min_y(), mid_x, mid_y),
        Bounds2D::from_extents(mid_x, bounds.min_y(), bounds.max_x(), mid_y),
        Bounds2D::from_extents(
            bounds.min_x() + quarter,
            mid_y,
            bounds.max_x() - quarter,
            bounds.max_y(),
        ),
    ]
}

/// 保留附近有墙体端点的网格单元，按行优先顺序输出。
///
/// 只访问每个端点容差框覆盖到的单元，代价与墙体数量成正比，与网格规模无关。
fn grid_candidates(bounds: &Bounds2D, walls: &[Wall]) -> Vec<Bounds2D> {
    let cols = grid_divisions(bounds.width());
    let rows = grid_divisions(bounds.height());
    let cell_w = bounds.width() / cols as f64;
    let cell_h = bounds.height() / rows as f64;
    let cell_at = |row: usize, col: usize| {
        let min_x = bounds.min_x() + col as f64 * cell_w;
        let min_y = bounds.min_y() + row as f64 * cell_h;
        Bounds2D::from_extents(min_x, min_y, min_x + cell_w, min_y + cell_h)
    };

    let mut hits = BTreeSet::new();
    for point in walls.iter().flat_map(|wall| [wall.start, wall.end]) {
        if !point.is_finite() {
            continue;
        }
        let cols_hit = touched_range(point.x() - bounds.min_x(), cell_w, cols);
        let rows_hit = touched_range(point.y() - bounds.min_y(), cell_h, rows);
        let (Some((col_lo, col_hi)), Some((row_lo, row_hi))) = (cols_hit, rows_hit) else {
            continue;
        };
        for row in row_lo..=row_hi {
            for col in col_lo..=col_hi {
                // 以实际单元再判定一次，与逐格扫描的边界结果保持一致
                if cell_at(row, col)
                    .expanded(CELL_WALL_TOLERANCE)
                    .contains(point)
                {
                    hits.insert((row, col));
                }
            }
        }
    }
    hits.into_iter().map(|(row, col)| cell_at(row, col)).collect()
}

/// 偏移 `offset` 处 ±容差范围可能触及的单元下标区间（闭区间，多留一格余量）。
fn touched_range(offset: f64, cell: f64, count: usize) -> Option<(usize, usize)> {
    let lo = ((offset - CELL_WALL_TOLERANCE) / cell).floor() - 1.0;
    let hi = ((offset + CELL_WALL_TOLERANCE) / cell).floor() + 1.0;
    let last = (count - 1) as f64;
    if !lo.is_finite() || !hi.is_finite() || hi < 0.0 || lo > last {
        return None;
    }
    Some((lo.max(0.0) as usize, hi.min(last) as usize))
}

fn grid_divisions(extent: f64) -> usize {
    let divisions = (extent / GRID_CELL_SIZE).floor();
    if divisions.is_finite() && divisions > 2.0 {
        divisions as usize
    } else {
        2
    }
}

fn build_room(
    index: usize,
    bounds: Bounds2D,
    walls: &[Wall],
    doors: &[Door],
    windows: &[Window],
) -> Room {
    let walls = indices_where(walls, |wall| {
        bounds.contains(wall.start) || bounds.contains(wall.end)
    });
    let doors = indices_where(doors, |door| bounds.contains(door.position));
    let windows = indices_where(windows, |window| bounds.contains(window.position));
    let area = bounds.width() * bounds.height();
    let kind = classify_room(area, windows.len());
    Room {
        id: RoomId(index),
        name: format!("{} {}", kind.title(), index + 1),
        kind,
        bounds,
        walls,
        doors,
        windows,
        area,
    }
}

fn indices_where<T>(items: &[T], predicate: impl Fn(&T) -> bool) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| predicate(item))
        .map(|(index, _)| index)
        .collect()
}

/// 按房间中的门下标回填 `Door::room_ids`。
pub fn link_door_rooms(doors: &mut [Door], rooms: &[Room]) {
    for door in doors.iter_mut() {
        door.room_ids.clear();
    }
    for room in rooms {
        for &index in &room.doors {
            if let Some(door) = doors.get_mut(index) {
                door.room_ids.insert(room.id);
            }
        }
    }
}
