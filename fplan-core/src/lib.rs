pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，单位为图纸单位（非像素）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn midpoint(self, other: Point2) -> Point2 {
            Self((self.0 + other.0) * 0.5)
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        /// 与 +X 轴的夹角（弧度，范围 (-π, π]）。
        #[inline]
        pub fn angle(self) -> f64 {
            self.0.y.atan2(self.0.x)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框，用于缩放、布局以及房间候选区域。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        /// 图纸为空或退化（零面积）时使用的默认范围。
        pub const FALLBACK: Bounds2D = Bounds2D {
            min: Point2(DVec2::new(-150.0, -100.0)),
            max: Point2(DVec2::new(150.0, 100.0)),
        };

        /// 以四个极值构造边界框，自动交换颠倒的分量。
        pub fn from_extents(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
            Self {
                min: Point2::new(min_x.min(max_x), min_y.min(max_y)),
                max: Point2::new(min_x.max(max_x), min_y.max(max_y)),
            }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        /// 宽或高为零（或空）时视为退化，下游不应直接使用。
        #[inline]
        pub fn is_degenerate(&self) -> bool {
            self.is_empty() || self.width() <= f64::EPSILON || self.height() <= f64::EPSILON
        }

        /// `None` 或退化范围统一替换为 [`Bounds2D::FALLBACK`]。
        pub fn or_fallback(bounds: Option<Bounds2D>) -> Bounds2D {
            match bounds {
                Some(bounds) if !bounds.is_degenerate() => bounds,
                _ => Self::FALLBACK,
            }
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn min_x(&self) -> f64 {
            self.min.x()
        }

        #[inline]
        pub fn min_y(&self) -> f64 {
            self.min.y()
        }

        #[inline]
        pub fn max_x(&self) -> f64 {
            self.max.x()
        }

        #[inline]
        pub fn max_y(&self) -> f64 {
            self.max.y()
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        /// 矩形面积；房间面积即以此近似。
        #[inline]
        pub fn area(&self) -> f64 {
            self.width() * self.height()
        }

        pub fn include_point(&mut self, point: Point2) {
            if !point.is_finite() {
                return;
            }
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        /// 闭区间包含判定（边界上的点视为在内）。
        #[inline]
        pub fn contains(&self, point: Point2) -> bool {
            point.x() >= self.min.x()
                && point.x() <= self.max.x()
                && point.y() >= self.min.y()
                && point.y() <= self.max.y()
        }

        /// 向四周扩张 `margin`。
        #[inline]
        pub fn expanded(&self, margin: f64) -> Bounds2D {
            let delta = DVec2::splat(margin);
            Self {
                min: Point2::from_vec(self.min.as_vec2() - delta),
                max: Point2::from_vec(self.max.as_vec2() + delta),
            }
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }
    }
}

/// 常用图层名。解析器不会改写图层，识别与渲染都按这些名字分派。
pub mod layers {
    pub const DEFAULT: &str = "0";
    pub const WALLS: &str = "WALLS";
    pub const DOORS: &str = "DOORS";
    pub const WINDOWS: &str = "WINDOWS";
    /// 旧版图纸使用的单数窗户图层，仅接受 LINE。
    pub const WINDOW: &str = "WINDOW";
    pub const FURNITURE: &str = "FURNITURE";
    pub const TEXT: &str = "TEXT";
    pub const DIMENSIONS: &str = "DIMENSIONS";
}

pub mod document {
    use std::collections::BTreeMap;
    use std::fmt;

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2, Vector2};

    /// 解析器输出的规范化图元。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Polyline(Polyline),
        Circle(Circle),
        Arc(Arc),
        Insert(Insert),
        Text(Text),
        Dimension(Dimension),
        Ellipse(Ellipse),
        Spline(Spline),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum EntityKind {
        Line,
        Polyline,
        Circle,
        Arc,
        Insert,
        Text,
        Dimension,
        Ellipse,
        Spline,
    }

    impl fmt::Display for EntityKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let name = match self {
                EntityKind::Line => "LINE",
                EntityKind::Polyline => "POLYLINE",
                EntityKind::Circle => "CIRCLE",
                EntityKind::Arc => "ARC",
                EntityKind::Insert => "INSERT",
                EntityKind::Text => "TEXT",
                EntityKind::Dimension => "DIMENSION",
                EntityKind::Ellipse => "ELLIPSE",
                EntityKind::Spline => "SPLINE",
            };
            f.write_str(name)
        }
    }

    impl Entity {
        #[inline]
        pub fn kind(&self) -> EntityKind {
            match self {
                Entity::Line(_) => EntityKind::Line,
                Entity::Polyline(_) => EntityKind::Polyline,
                Entity::Circle(_) => EntityKind::Circle,
                Entity::Arc(_) => EntityKind::Arc,
                Entity::Insert(_) => EntityKind::Insert,
                Entity::Text(_) => EntityKind::Text,
                Entity::Dimension(_) => EntityKind::Dimension,
                Entity::Ellipse(_) => EntityKind::Ellipse,
                Entity::Spline(_) => EntityKind::Spline,
            }
        }

        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::Polyline(polyline) => &polyline.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Arc(arc) => &arc.layer,
                Entity::Insert(insert) => &insert.layer,
                Entity::Text(text) => &text.layer,
                Entity::Dimension(dimension) => &dimension.layer,
                Entity::Ellipse(ellipse) => &ellipse.layer,
                Entity::Spline(spline) => &spline.layer,
            }
        }

        /// 两点线状图元（LINE，或恰好两个顶点的多段线）返回其端点。
        pub fn segment(&self) -> Option<(Point2, Point2)> {
            match self {
                Entity::Line(line) => Some((line.start, line.end)),
                Entity::Polyline(polyline) => match polyline.vertices.as_slice() {
                    [start, end] => Some((*start, *end)),
                    _ => None,
                },
                _ => None,
            }
        }

        /// 计算实体的 2D 轴对齐范围。圆弧与椭圆按完整外接框保守估计。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            match self {
                Entity::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                Entity::Polyline(polyline) => {
                    for vertex in &polyline.vertices {
                        bounds.include_point(*vertex);
                    }
                }
                Entity::Circle(Circle { center, radius, .. })
                | Entity::Arc(Arc { center, radius, .. }) => {
                    include_circle(&mut bounds, *center, *radius);
                }
                Entity::Insert(insert) => {
                    bounds.include_point(insert.position);
                }
                Entity::Text(text) => {
                    bounds.include_point(text.position);
                }
                Entity::Dimension(dimension) => {
                    bounds.include_point(dimension.definition_point);
                    bounds.include_point(dimension.text_midpoint);
                    if let Some(point) = dimension.first_point {
                        bounds.include_point(point);
                    }
                    if let Some(point) = dimension.second_point {
                        bounds.include_point(point);
                    }
                }
                Entity::Ellipse(ellipse) => {
                    include_circle(&mut bounds, ellipse.center, ellipse.major_axis.length());
                }
                Entity::Spline(spline) => {
                    for point in spline.control_points.iter().chain(&spline.fit_points) {
                        bounds.include_point(*point);
                    }
                }
            }
            if bounds.is_empty() {
                None
            } else {
                Some(bounds)
            }
        }
    }

    fn include_circle(bounds: &mut Bounds2D, center: Point2, radius: f64) {
        let radius = radius.abs();
        bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
        bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
    }

    /// 汇总所有实体的范围；空列表（或没有任何有限坐标）返回 `None`。
    pub fn compute_bounds(entities: &[Entity]) -> Option<Bounds2D> {
        let mut bounds = Bounds2D::empty();
        for entity in entities {
            if let Some(entity_bounds) = entity.bounds() {
                bounds.include_bounds(&entity_bounds);
            }
        }
        if bounds.is_empty() {
            None
        } else {
            Some(bounds)
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<Point2>,
        pub is_closed: bool,
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
    }

    /// 圆弧实体，角度以弧度形式储存，遵循数学正方向。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub layer: String,
    }

    /// 块参照。`attributes` 保存 ATTRIB 标记到文本的映射（例如门宽）。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Insert {
        pub name: String,
        pub position: Point2,
        pub scale: Vector2,
        pub rotation: f64,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        pub attributes: BTreeMap<String, String>,
        pub layer: String,
    }

    impl Insert {
        /// 不区分大小写地查找属性值。
        pub fn attribute(&self, key: &str) -> Option<&str> {
            self.attributes
                .iter()
                .find(|(tag, _)| tag.eq_ignore_ascii_case(key))
                .map(|(_, value)| value.as_str())
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Text {
        pub position: Point2,
        pub content: String,
        pub height: f64,
        pub rotation: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Dimension {
        pub definition_point: Point2,
        pub text_midpoint: Point2,
        pub first_point: Option<Point2>,
        pub second_point: Option<Point2>,
        pub text: Option<String>,
        pub measurement: Option<f64>,
        pub layer: String,
    }

    impl Dimension {
        /// 标注显示文本：优先使用覆盖文本，其次使用测量值。
        pub fn label(&self) -> Option<String> {
            if let Some(text) = &self.text {
                return Some(text.clone());
            }
            if let Some(value) = self.measurement {
                return Some(format!("{value:.2}"));
            }
            match (self.first_point, self.second_point) {
                (Some(a), Some(b)) => Some(format!("{:.2}", a.vector_to(b).length())),
                _ => None,
            }
        }
    }

    /// 椭圆实体，记录主轴向量与参数范围（单位为弧度）。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Ellipse {
        pub center: Point2,
        pub major_axis: Vector2,
        pub ratio: f64,
        pub start_parameter: f64,
        pub end_parameter: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Spline {
        pub degree: i32,
        pub control_points: Vec<Point2>,
        pub fit_points: Vec<Point2>,
        pub is_closed: bool,
        pub layer: String,
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::f64::consts::FRAC_PI_2;

        fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Entity {
            Entity::Line(Line {
                start: Point2::new(x1, y1),
                end: Point2::new(x2, y2),
                layer: "WALLS".to_string(),
            })
        }

        #[test]
        fn empty_entity_list_has_no_bounds() {
            assert!(compute_bounds(&[]).is_none());
        }

        #[test]
        fn bounds_cover_lines_polylines_and_circles() {
            let entities = vec![
                line(0.0, 0.0, 10.0, 8.0),
                Entity::Polyline(Polyline {
                    vertices: vec![Point2::new(-5.0, 2.0), Point2::new(3.0, 12.0)],
                    is_closed: false,
                    layer: "0".to_string(),
                }),
                Entity::Circle(Circle {
                    center: Point2::new(20.0, 0.0),
                    radius: 2.0,
                    layer: "FURNITURE".to_string(),
                }),
            ];
            let bounds = compute_bounds(&entities).expect("bounds");
            assert_eq!(bounds.min_x(), -5.0);
            assert_eq!(bounds.min_y(), -2.0);
            assert_eq!(bounds.max_x(), 22.0);
            assert_eq!(bounds.max_y(), 12.0);
        }

        #[test]
        fn arc_bounds_use_full_circle() {
            let arc = Entity::Arc(Arc {
                center: Point2::new(0.0, 0.0),
                radius: 5.0,
                start_angle: 0.0,
                end_angle: FRAC_PI_2,
                layer: "0".to_string(),
            });
            let bounds = arc.bounds().expect("arc bounds");
            assert_eq!(bounds.min_x(), -5.0);
            assert_eq!(bounds.min_y(), -5.0);
            assert_eq!(bounds.max_x(), 5.0);
            assert_eq!(bounds.max_y(), 5.0);
        }

        #[test]
        fn insert_and_text_contribute_their_position() {
            let entities = vec![
                Entity::Insert(Insert {
                    name: "DOOR".to_string(),
                    position: Point2::new(4.0, -3.0),
                    scale: Vector2::new(1.0, 1.0),
                    rotation: 0.0,
                    attributes: BTreeMap::new(),
                    layer: "DOORS".to_string(),
                }),
                Entity::Text(Text {
                    position: Point2::new(-1.0, 7.0),
                    content: "Kitchen".to_string(),
                    height: 2.5,
                    rotation: 0.0,
                    layer: "TEXT".to_string(),
                }),
            ];
            let bounds = compute_bounds(&entities).expect("bounds");
            assert_eq!(bounds.min(), Point2::new(-1.0, -3.0));
            assert_eq!(bounds.max(), Point2::new(4.0, 7.0));
        }

        #[test]
        fn bounds_are_ordered_for_reversed_geometry() {
            let entities = vec![line(50.0, 40.0, -10.0, -20.0), line(5.0, 5.0, 5.0, 5.0)];
            let bounds = compute_bounds(&entities).expect("bounds");
            assert!(bounds.min_x() <= bounds.max_x());
            assert!(bounds.min_y() <= bounds.max_y());
        }

        #[test]
        fn non_finite_points_are_ignored() {
            let entities = vec![line(f64::NAN, 0.0, f64::NAN, 1.0)];
            assert!(compute_bounds(&entities).is_none());
        }

        #[test]
        fn degenerate_bounds_fall_back_to_default() {
            let flat = compute_bounds(&[line(0.0, 0.0, 100.0, 0.0)]);
            assert!(flat.expect("bounds").is_degenerate());
            assert_eq!(Bounds2D::or_fallback(flat), Bounds2D::FALLBACK);
            assert_eq!(Bounds2D::or_fallback(None), Bounds2D::FALLBACK);

            let real = Bounds2D::from_extents(0.0, 0.0, 10.0, 8.0);
            assert_eq!(Bounds2D::or_fallback(Some(real)), real);
            assert!((real.area() - 80.0).abs() < 1e-9);
        }

        #[test]
        fn segment_only_for_two_point_shapes() {
            assert!(line(0.0, 0.0, 1.0, 1.0).segment().is_some());
            let three = Entity::Polyline(Polyline {
                vertices: vec![
                    Point2::new(0.0, 0.0),
                    Point2::new(1.0, 0.0),
                    Point2::new(1.0, 1.0),
                ],
                is_closed: false,
                layer: "DOORS".to_string(),
            });
            assert!(three.segment().is_none());
        }

        #[test]
        fn insert_attribute_lookup_ignores_case() {
            let mut attributes = BTreeMap::new();
            attributes.insert("WIDTH".to_string(), "36".to_string());
            let insert = Insert {
                name: "D1".to_string(),
                position: Point2::new(0.0, 0.0),
                scale: Vector2::new(1.0, 1.0),
                rotation: 0.0,
                attributes,
                layer: "DOORS".to_string(),
            };
            assert_eq!(insert.attribute("width"), Some("36"));
            assert_eq!(insert.attribute("height"), None);
        }
    }
}
