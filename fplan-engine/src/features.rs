use std::collections::BTreeSet;

use fplan_core::document::Entity;
use fplan_core::geometry::{Point2, Vector2};
use fplan_core::layers;
use serde::Serialize;
use tracing::debug;

use crate::rooms::RoomId;

/// 所有墙体统一使用的厚度（图纸单位）。
pub const DEFAULT_WALL_THICKNESS: f64 = 0.3;
/// 块参照缺少可解析的 `width` 属性时使用的门宽。
pub const DEFAULT_DOOR_WIDTH: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wall {
    pub start: Point2,
    pub end: Point2,
    pub thickness: f64,
}

impl Wall {
    #[inline]
    pub fn length(&self) -> f64 {
        self.start.vector_to(self.end).length()
    }

    /// 墙体方向角（弧度），零长度墙体返回 `None`。
    pub fn angle(&self) -> Option<f64> {
        let direction = Vector2::from_points(self.start, self.end);
        if direction.length_squared() <= f64::EPSILON {
            None
        } else {
            Some(direction.angle())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Door {
    pub position: Point2,
    pub width: f64,
    /// 门的朝向（弧度）。
    pub direction: f64,
    /// 引用该门的房间，由 [`crate::rooms::link_door_rooms`] 填充。
    pub room_ids: BTreeSet<RoomId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    pub position: Point2,
    pub width: f64,
    pub direction: f64,
}

/// 从同一实体列表中提取的三类建筑要素。三者互不依赖。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Features {
    pub walls: Vec<Wall>,
    pub doors: Vec<Door>,
    pub windows: Vec<Window>,
}

impl Features {
    pub fn extract(entities: &[Entity]) -> Self {
        let features = Self {
            walls: extract_walls(entities),
            doors: extract_doors(entities),
            windows: extract_windows(entities),
        };
        debug!(
            walls = features.walls.len(),
            doors = features.doors.len(),
            windows = features.windows.len(),
            "要素提取完成"
        );
        features
    }
}

/// `WALLS` 或默认图层上的直线与多段线视为墙体。
///
/// N 个顶点的多段线产生 N−1 段墙，即使多段线标记为闭合也不补闭合段。
pub fn extract_walls(entities: &[Entity]) -> Vec<Wall> {
    let mut walls = Vec::new();
    for entity in entities {
        let layer = entity.layer_name();
        if layer != layers::WALLS && layer != layers::DEFAULT {
            continue;
        }
        match entity {
            Entity::Line(line) => walls.push(wall(line.start, line.end)),
            Entity::Polyline(polyline) => {
                walls.extend(
                    polyline
                        .vertices
                        .windows(2)
                        .map(|pair| wall(pair[0], pair[1])),
                );
            }
            _ => {}
        }
    }
    walls
}

fn wall(start: Point2, end: Point2) -> Wall {
    Wall {
        start,
        end,
        thickness: DEFAULT_WALL_THICKNESS,
    }
}

/// 任意图层上的块参照，以及 `DOORS` 图层上的两点线状图元。
pub fn extract_doors(entities: &[Entity]) -> Vec<Door> {
    entities
        .iter()
        .filter_map(|entity| match entity {
            Entity::Insert(insert) => Some(Door {
                position: insert.position,
                width: insert
                    .attribute("width")
                    .and_then(|raw| raw.trim().parse::<f64>().ok())
                    .filter(|width| width.is_finite())
                    .unwrap_or(DEFAULT_DOOR_WIDTH),
                direction: insert.rotation,
                room_ids: BTreeSet::new(),
            }),
            _ if entity.layer_name() == layers::DOORS => {
                entity.segment().map(|(start, end)| {
                    let (position, width, direction) = opening(start, end);
                    Door {
                        position,
                        width,
                        direction,
                        room_ids: BTreeSet::new(),
                    }
                })
            }
            _ => None,
        })
        .collect()
}

/// `WINDOWS` 图层上的两点线状图元，兼容旧图纸中 `WINDOW` 图层的直线。
pub fn extract_windows(entities: &[Entity]) -> Vec<Window> {
    entities
        .iter()
        .filter_map(|entity| {
            let layer = entity.layer_name();
            let segment = if layer == layers::WINDOWS {
                entity.segment()
            } else if layer == layers::WINDOW {
                match entity {
                    Entity::Line(line) => Some((line.start, line.end)),
                    _ => None,
                }
            } else {
                None
            };
            segment.map(|(start, end)| {
                let (position, width, direction) = opening(start, end);
                Window {
                    position,
                    width,
                    direction,
                }
            })
        })
        .collect()
}

/// 线段的中点、长度与方向角。
fn opening(start: Point2, end: Point2) -> (Point2, f64, f64) {
    let span = Vector2::from_points(start, end);
    (start.midpoint(end), span.length(), span.angle())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use fplan_core::document::{Circle, Insert, Line, Polyline};

    use super::*;

    fn line(layer: &str, ax: f64, ay: f64, bx: f64, by: f64) -> Entity {
        Entity::Line(Line {
            start: Point2::new(ax, ay),
            end: Point2::new(bx, by),
            layer: layer.to_string(),
        })
    }

    fn insert(layer: &str, attributes: &[(&str, &str)]) -> Entity {
        Entity::Insert(Insert {
            name: "DOOR".to_string(),
            position: Point2::new(4.0, 5.0),
            scale: Vector2::new(1.0, 1.0),
            rotation: 0.25,
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            layer: layer.to_string(),
        })
    }

    #[test]
    fn polyline_with_n_vertices_yields_n_minus_one_walls() {
        for count in 2..7 {
            let vertices = (0..count)
                .map(|i| Point2::new(i as f64 * 10.0, (i % 2) as f64 * 5.0))
                .collect();
            let entities = vec![Entity::Polyline(Polyline {
                vertices,
                is_closed: true,
                layer: layers::WALLS.to_string(),
            })];
            let walls = extract_walls(&entities);
            assert_eq!(walls.len(), count - 1);
            assert!(
                walls
                    .iter()
                    .all(|wall| (wall.thickness - DEFAULT_WALL_THICKNESS).abs() < 1e-12)
            );
        }
    }

    #[test]
    fn walls_come_from_walls_and_default_layers_only() {
        let entities = vec![
            line(layers::WALLS, 0.0, 0.0, 10.0, 0.0),
            line(layers::DEFAULT, 0.0, 0.0, 0.0, 10.0),
            line(layers::FURNITURE, 1.0, 1.0, 2.0, 2.0),
            Entity::Circle(Circle {
                center: Point2::new(0.0, 0.0),
                radius: 3.0,
                layer: layers::WALLS.to_string(),
            }),
        ];
        let walls = extract_walls(&entities);
        assert_eq!(walls.len(), 2);
        assert_eq!(walls[1].end, Point2::new(0.0, 10.0));
    }

    #[test]
    fn inserts_become_doors_on_any_layer() {
        let entities = vec![
            insert(layers::FURNITURE, &[]),
            insert(layers::DOORS, &[("WIDTH", "36")]),
            insert(layers::DOORS, &[("width", "wide")]),
        ];
        let doors = extract_doors(&entities);
        assert_eq!(doors.len(), 3);
        assert!((doors[0].width - DEFAULT_DOOR_WIDTH).abs() < 1e-12);
        assert!((doors[1].width - 36.0).abs() < 1e-12);
        assert!((doors[2].width - DEFAULT_DOOR_WIDTH).abs() < 1e-12);
        assert!((doors[0].direction - 0.25).abs() < 1e-12);
        assert!(doors.iter().all(|door| door.room_ids.is_empty()));
    }

    #[test]
    fn door_lines_use_midpoint_length_and_angle() {
        let entities = vec![
            line(layers::DOORS, 0.0, 0.0, 0.0, 30.0),
            line(layers::WALLS, 0.0, 0.0, 10.0, 0.0),
        ];
        let doors = extract_doors(&entities);
        assert_eq!(doors.len(), 1);
        assert_eq!(doors[0].position, Point2::new(0.0, 15.0));
        assert!((doors[0].width - 30.0).abs() < 1e-12);
        assert!((doors[0].direction - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn windows_accept_two_point_polylines_and_legacy_layer_lines() {
        let entities = vec![
            Entity::Polyline(Polyline {
                vertices: vec![Point2::new(0.0, 0.0), Point2::new(40.0, 0.0)],
                is_closed: false,
                layer: layers::WINDOWS.to_string(),
            }),
            Entity::Polyline(Polyline {
                vertices: vec![
                    Point2::new(0.0, 0.0),
                    Point2::new(40.0, 0.0),
                    Point2::new(40.0, 5.0),
                ],
                is_closed: false,
                layer: layers::WINDOWS.to_string(),
            }),
            line(layers::WINDOW, 10.0, 10.0, 10.0, 30.0),
            Entity::Polyline(Polyline {
                vertices: vec![Point2::new(0.0, 0.0), Point2::new(5.0, 0.0)],
                is_closed: false,
                layer: layers::WINDOW.to_string(),
            }),
        ];
        let windows = extract_windows(&entities);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].position, Point2::new(20.0, 0.0));
        assert!((windows[0].width - 40.0).abs() < 1e-12);
        assert_eq!(windows[1].position, Point2::new(10.0, 20.0));
    }

    #[test]
    fn extraction_is_independent_of_entity_mix() {
        let entities = vec![
            line(layers::WALLS, 0.0, 0.0, 10.0, 0.0),
            line(layers::DOORS, 2.0, 0.0, 4.0, 0.0),
            line(layers::WINDOWS, 6.0, 0.0, 8.0, 0.0),
        ];
        let features = Features::extract(&entities);
        assert_eq!(features.walls, extract_walls(&entities));
        assert_eq!(features.doors.len(), 1);
        assert_eq!(features.windows.len(), 1);
    }

    #[test]
    fn zero_length_wall_has_no_angle() {
        let wall = wall(Point2::new(1.0, 1.0), Point2::new(1.0, 1.0));
        assert!(wall.angle().is_none());
        assert!(wall.length().abs() < 1e-12);
    }
}
