use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;

use fplan_core::document::{
    Arc, Circle, Dimension, Ellipse, Entity, Insert, Line, Polyline, Text,
};
use fplan_core::geometry::{Point2, Vector2};
use fplan_core::layers;
use tracing::debug;

/// 内置示例平面：两室一厅的外墙、隔墙、门窗、家具、文字与一道总长标注。
///
/// 未提供图纸文件时 CLI 使用这份数据。
pub fn sample_floor_plan() -> Vec<Entity> {
    let mut entities = vec![
        Entity::Polyline(Polyline {
            vertices: vec![
                Point2::new(0.0, 0.0),
                Point2::new(400.0, 0.0),
                Point2::new(400.0, 300.0),
                Point2::new(0.0, 300.0),
                Point2::new(0.0, 0.0),
            ],
            is_closed: true,
            layer: layers::WALLS.to_string(),
        }),
        line(layers::WALLS, (200.0, 0.0), (200.0, 300.0)),
        line(layers::DEFAULT, (0.0, 150.0), (200.0, 150.0)),
        Entity::Insert(Insert {
            name: "DOOR_SINGLE".to_string(),
            position: Point2::new(200.0, 75.0),
            scale: Vector2::new(1.0, 1.0),
            rotation: FRAC_PI_2,
            attributes: BTreeMap::from([("WIDTH".to_string(), "36".to_string())]),
            layer: layers::DOORS.to_string(),
        }),
        line(layers::DOORS, (90.0, 150.0), (120.0, 150.0)),
        Entity::Arc(Arc {
            center: Point2::new(90.0, 150.0),
            radius: 30.0,
            start_angle: 0.0,
            end_angle: FRAC_PI_2,
            layer: layers::DOORS.to_string(),
        }),
        line(layers::WINDOWS, (60.0, 300.0), (140.0, 300.0)),
        line(layers::WINDOWS, (260.0, 300.0), (340.0, 300.0)),
        line(layers::WINDOW, (400.0, 100.0), (400.0, 180.0)),
        Entity::Circle(Circle {
            center: Point2::new(300.0, 200.0),
            radius: 25.0,
            layer: layers::FURNITURE.to_string(),
        }),
        Entity::Polyline(Polyline {
            vertices: vec![
                Point2::new(20.0, 170.0),
                Point2::new(100.0, 170.0),
                Point2::new(100.0, 280.0),
                Point2::new(20.0, 280.0),
            ],
            is_closed: true,
            layer: layers::FURNITURE.to_string(),
        }),
        Entity::Ellipse(Ellipse {
            center: Point2::new(300.0, 50.0),
            major_axis: Vector2::new(40.0, 0.0),
            ratio: 0.5,
            start_parameter: 0.0,
            end_parameter: std::f64::consts::TAU,
            layer: layers::FURNITURE.to_string(),
        }),
    ];

    let labels = [
        ("LIVING", 280.0, 240.0),
        ("BED", 40.0, 230.0),
        ("KITCHEN", 60.0, 70.0),
    ];
    for (content, x, y) in labels {
        entities.push(Entity::Text(Text {
            position: Point2::new(x, y),
            content: content.to_string(),
            height: 10.0,
            rotation: 0.0,
            layer: layers::TEXT.to_string(),
        }));
    }

    entities.push(Entity::Dimension(Dimension {
        definition_point: Point2::new(0.0, -20.0),
        text_midpoint: Point2::new(200.0, -20.0),
        first_point: Some(Point2::new(0.0, 0.0)),
        second_point: Some(Point2::new(400.0, 0.0)),
        text: None,
        measurement: Some(400.0),
        layer: layers::DIMENSIONS.to_string(),
    }));

    debug!(entities = entities.len(), "已生成示例平面");
    entities
}

fn line(layer: &str, start: (f64, f64), end: (f64, f64)) -> Entity {
    Entity::Line(Line {
        start: Point2::new(start.0, start.1),
        end: Point2::new(end.0, end.1),
        layer: layer.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use fplan_core::document::compute_bounds;
    use fplan_core::geometry::Bounds2D;

    use super::*;
    use crate::features::Features;

    #[test]
    fn sample_covers_every_styled_layer() {
        let entities = sample_floor_plan();
        let layers_seen: BTreeSet<&str> = entities.iter().map(Entity::layer_name).collect();
        for layer in [
            layers::WALLS,
            layers::DEFAULT,
            layers::DOORS,
            layers::WINDOWS,
            layers::FURNITURE,
            layers::TEXT,
            layers::DIMENSIONS,
        ] {
            assert!(layers_seen.contains(layer), "缺少图层 {layer}");
        }
    }

    #[test]
    fn sample_features_and_bounds() {
        let entities = sample_floor_plan();
        assert_eq!(
            compute_bounds(&entities),
            Some(Bounds2D::from_extents(0.0, -20.0, 400.0, 300.0))
        );
        let features = Features::extract(&entities);
        assert_eq!(features.walls.len(), 6);
        assert_eq!(features.doors.len(), 2);
        assert!((features.doors[0].width - 36.0).abs() < 1e-12);
        assert_eq!(features.windows.len(), 3);
    }
}
