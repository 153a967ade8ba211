//! 二进制（类 DWG）图纸的启发式重建。
//!
//! 这里不解码真实的 AutoCAD 二进制结构：只校验 `AC` 魔数，扫描字节流中
//! 接近 60°/120° 的浮点模式来猜测是否为三角形布局，否则按文件大小合成一份
//! 规模相当的墙/门/窗/家具/文字/标注布局。结果永远是近似值，调用方通过
//! [`BinaryReconstruction::is_approximate`] 与 `warn!` 日志得知这一点。

use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_3;

use byteorder::{ByteOrder, LittleEndian};
use fplan_core::document::{Dimension, Entity, Insert, Line, Polyline, Text};
use fplan_core::geometry::{Point2, Vector2};
use fplan_core::layers;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{BINARY_SIGNATURE, ParseError};

/// 判定为三角形布局所需的最少命中次数。
const TRIANGULAR_MIN_HITS: usize = 3;
const DEGREE_TOLERANCE: f32 = 0.5;
const RADIAN_TOLERANCE: f32 = 1e-3;

const MIN_EXTENT: f64 = 200.0;
const MAX_EXTENT: f64 = 2_000.0;
const SYNTHETIC_DOOR_WIDTH: f64 = 30.0;
const SYNTHETIC_WINDOW_WIDTH: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryLayout {
    /// 字节流中探测到 60°/120° 模式，合成三角形平面。
    Triangular,
    /// 按文件大小合成的矩形平面。
    Synthesized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntityClass {
    Wall,
    Door,
    Window,
    Furniture,
    Text,
    Dimension,
}

/// `(类别, 除数, 上限)`：数量 = min(floor(文件大小 / 除数), 上限)。
const SYNTHESIS_BUDGET: [(EntityClass, usize, usize); 6] = [
    (EntityClass::Wall, 4_096, 12),
    (EntityClass::Door, 8_192, 8),
    (EntityClass::Window, 6_144, 10),
    (EntityClass::Furniture, 10_240, 15),
    (EntityClass::Text, 16_384, 10),
    (EntityClass::Dimension, 20_480, 4),
];

#[derive(Debug, Clone)]
pub struct BinaryReconstruction {
    pub entities: Vec<Entity>,
    pub layout: BinaryLayout,
    /// 文件头中的版本标记，例如 `AC1032`。
    pub version: Option<String>,
}

impl BinaryReconstruction {
    /// 二进制路径永远不是几何精确的解码结果。
    #[inline]
    pub fn is_approximate(&self) -> bool {
        true
    }
}

/// 校验魔数并按启发式重建实体列表。
pub fn parse_binary_document(bytes: &[u8]) -> Result<BinaryReconstruction, ParseError> {
    if bytes.len() < BINARY_SIGNATURE.len() || !bytes.starts_with(BINARY_SIGNATURE) {
        return Err(ParseError::UnsupportedFormat(
            "缺少 AC 文件签名，无法识别为二进制 CAD 图纸".to_string(),
        ));
    }

    let version = read_version(bytes);
    let hits = count_angle_hits(bytes);
    let file_size = bytes.len();
    debug!(file_size, hits, version = ?version, "二进制图纸角度模式扫描完成");

    let (layout, entities) = if hits >= TRIANGULAR_MIN_HITS {
        (BinaryLayout::Triangular, synthesize_triangular(file_size))
    } else {
        (BinaryLayout::Synthesized, synthesize_layout(file_size))
    };

    warn!(
        ?layout,
        file_size,
        entities = entities.len(),
        "二进制图纸未真实解码，已按启发式生成近似布局"
    );

    Ok(BinaryReconstruction {
        entities,
        layout,
        version,
    })
}

fn read_version(bytes: &[u8]) -> Option<String> {
    let tag = bytes.get(..6)?;
    if tag[2..].iter().all(u8::is_ascii_digit) {
        std::str::from_utf8(tag).ok().map(str::to_string)
    } else {
        None
    }
}

/// 以 4 字节对齐读取小端 `f32`，统计接近 60°/120°（角度或弧度）的值。
fn count_angle_hits(bytes: &[u8]) -> usize {
    const DEGREES: [f32; 2] = [60.0, 120.0];
    const RADIANS: [f32; 2] = [std::f32::consts::FRAC_PI_3, 2.0 * std::f32::consts::FRAC_PI_3];

    bytes
        .chunks_exact(4)
        .map(LittleEndian::read_f32)
        .filter(|value| value.is_finite())
        .filter(|value| {
            DEGREES
                .iter()
                .any(|target| (value - target).abs() <= DEGREE_TOLERANCE)
                || RADIANS
                    .iter()
                    .any(|target| (value - target).abs() <= RADIAN_TOLERANCE)
        })
        .count()
}

fn extent_for(file_size: usize) -> f64 {
    (file_size as f64 / 100.0).clamp(MIN_EXTENT, MAX_EXTENT)
}

fn budget(class: EntityClass, file_size: usize) -> usize {
    SYNTHESIS_BUDGET
        .iter()
        .find(|(candidate, _, _)| *candidate == class)
        .map(|(_, divisor, cap)| (file_size / divisor).min(*cap))
        .unwrap_or(0)
}

fn synthesize_triangular(file_size: usize) -> Vec<Entity> {
    let side = extent_for(file_size);
    let height = side * FRAC_PI_3.sin();
    let a = Point2::new(0.0, 0.0);
    let b = Point2::new(side, 0.0);
    let c = Point2::new(side / 2.0, height);
    let ab = a.midpoint(b);
    let bc = b.midpoint(c);
    let ca = c.midpoint(a);

    let mut entities = Vec::new();
    for (start, end) in [(a, b), (b, c), (c, a), (ab, bc), (bc, ca), (ca, ab)] {
        entities.push(line(start, end, layers::WALLS));
    }

    // 门、窗各一处，放在底边上
    entities.push(horizontal_opening(a.midpoint(ab), SYNTHETIC_DOOR_WIDTH, layers::DOORS));
    entities.push(horizontal_opening(
        ab.midpoint(b),
        SYNTHETIC_WINDOW_WIDTH,
        layers::WINDOWS,
    ));
    entities
}

fn synthesize_layout(file_size: usize) -> Vec<Entity> {
    let width = extent_for(file_size);
    let height = width * 0.6;
    let mut entities = Vec::new();

    let corners = [
        Point2::new(0.0, 0.0),
        Point2::new(width, 0.0),
        Point2::new(width, height),
        Point2::new(0.0, height),
    ];
    for index in 0..corners.len() {
        let next = (index + 1) % corners.len();
        entities.push(line(corners[index], corners[next], layers::WALLS));
    }

    // 内墙交替竖向/横向均匀分布
    let walls = budget(EntityClass::Wall, file_size);
    let vertical = walls.div_ceil(2);
    let horizontal = walls / 2;
    for i in 0..vertical {
        let x = width * (i + 1) as f64 / (vertical + 1) as f64;
        entities.push(line(Point2::new(x, 0.0), Point2::new(x, height), layers::WALLS));
    }
    for i in 0..horizontal {
        let y = height * (i + 1) as f64 / (horizontal + 1) as f64;
        entities.push(line(Point2::new(0.0, y), Point2::new(width, y), layers::WALLS));
    }

    let doors = budget(EntityClass::Door, file_size);
    for i in 0..doors {
        let x = width * (i + 1) as f64 / (doors + 1) as f64;
        let mut attributes = BTreeMap::new();
        attributes.insert("WIDTH".to_string(), format!("{SYNTHETIC_DOOR_WIDTH}"));
        entities.push(Entity::Insert(Insert {
            name: format!("DOOR_{}", i + 1),
            position: Point2::new(x, 0.0),
            scale: Vector2::new(1.0, 1.0),
            rotation: 0.0,
            attributes,
            layer: layers::DOORS.to_string(),
        }));
    }

    let windows = budget(EntityClass::Window, file_size);
    for i in 0..windows {
        let x = width * (i + 1) as f64 / (windows + 1) as f64;
        entities.push(horizontal_opening(
            Point2::new(x, height),
            SYNTHETIC_WINDOW_WIDTH,
            layers::WINDOWS,
        ));
    }

    let furniture = budget(EntityClass::Furniture, file_size);
    let columns = 5;
    for i in 0..furniture {
        let column = i % columns;
        let row = i / columns;
        let x = width * (column as f64 + 0.5) / columns as f64;
        let y = height * (row as f64 + 0.5) / 3.0;
        entities.push(Entity::Polyline(Polyline {
            vertices: vec![
                Point2::new(x - 15.0, y - 10.0),
                Point2::new(x + 15.0, y - 10.0),
                Point2::new(x + 15.0, y + 10.0),
                Point2::new(x - 15.0, y + 10.0),
            ],
            is_closed: true,
            layer: layers::FURNITURE.to_string(),
        }));
    }

    let labels = budget(EntityClass::Text, file_size);
    for i in 0..labels {
        let x = width * (i as f64 + 0.5) / labels as f64;
        entities.push(Entity::Text(Text {
            position: Point2::new(x, height * 0.5),
            content: format!("ROOM {}", i + 1),
            height: 8.0,
            rotation: 0.0,
            layer: layers::TEXT.to_string(),
        }));
    }

    let dimensions = budget(EntityClass::Dimension, file_size);
    for i in 0..dimensions {
        let offset = 20.0 * (i + 1) as f64;
        let (first, second) = if i % 2 == 0 {
            (Point2::new(0.0, -offset), Point2::new(width, -offset))
        } else {
            (Point2::new(-offset, 0.0), Point2::new(-offset, height))
        };
        entities.push(Entity::Dimension(Dimension {
            definition_point: second,
            text_midpoint: first.midpoint(second),
            first_point: Some(first),
            second_point: Some(second),
            text: None,
            measurement: Some(first.vector_to(second).length()),
            layer: layers::DIMENSIONS.to_string(),
        }));
    }

    entities
}

fn horizontal_opening(center: Point2, width: f64, layer: &str) -> Entity {
    let half = Vector2::new(width / 2.0, 0.0);
    line(center.translate(Vector2::new(-half.x(), 0.0)), center.translate(half), layer)
}

fn line(start: Point2, end: Point2, layer: &str) -> Entity {
    Entity::Line(Line {
        start,
        end,
        layer: layer.to_string(),
    })
}
