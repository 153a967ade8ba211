use std::collections::BTreeMap;

use fplan_core::document::{
    Arc, Circle, Dimension, Ellipse, Entity, Insert, Line, Polyline, Spline, Text,
};
use fplan_core::geometry::{Point2, Vector2};
use tracing::debug;

use crate::ParseError;

/// 解析 DXF 文本，返回 ENTITIES 段中的规范化实体。
///
/// 其余段（HEADER、TABLES、BLOCKS、OBJECTS 等）整体跳过；不认识的实体类型
/// 跳过而不报错。任何组码/数值层面的语法错误都会使整个文档失败，不返回部分结果。
pub fn parse_vector_document(text: &str) -> Result<Vec<Entity>, ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Err(ParseError::MalformedDocument("DXF 文档为空".to_string()));
    }
    DxfParser::new(text).parse().map_err(|err| match err {
        DxfError::Unsupported { feature } => ParseError::UnsupportedFormat(feature),
        DxfError::Invalid { message } => ParseError::MalformedDocument(message),
    })
}

#[derive(Debug)]
enum DxfError {
    Unsupported { feature: String },
    Invalid { message: String },
}

impl DxfError {
    fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    fn parse(mut self) -> Result<Vec<Entity>, DxfError> {
        let mut entities = Vec::new();
        while let Some((code, value)) = self.reader.next_pair()? {
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "第 {} 行出现意外的组码 {code}（期望 0 表示 SECTION/EOF）",
                    self.reader.line_number()
                )));
            }
            match value.trim() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.trim() {
                        "ENTITIES" => self.parse_entities(&mut entities)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        Ok(entities)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    fn parse_entities(&mut self, entities: &mut Vec<Entity>) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            let kind = value.trim().to_string();
            match kind.as_str() {
                "ENDSEC" => break,
                "SEQEND" => self.skip_entity_body()?,
                other => match self.parse_entity(other) {
                    Ok(entity) => entities.push(entity),
                    Err(DxfError::Unsupported { feature }) => {
                        debug!(kind = other, %feature, "跳过暂不支持的实体");
                        self.skip_entity_body()?;
                    }
                    Err(err) => return Err(err),
                },
            }
        }
        Ok(())
    }

    fn parse_entity(&mut self, kind: &str) -> Result<Entity, DxfError> {
        match kind {
            "LINE" => self.parse_line(),
            "LWPOLYLINE" => self.parse_lwpolyline(),
            "POLYLINE" => self.parse_polyline(),
            "CIRCLE" => self.parse_circle(),
            "ARC" => self.parse_arc(),
            "ELLIPSE" => self.parse_ellipse(),
            "SPLINE" => self.parse_spline(),
            "TEXT" => self.parse_text(),
            "MTEXT" => self.parse_mtext(),
            "INSERT" => self.parse_insert(),
            "DIMENSION" => self.parse_dimension(),
            other => Err(DxfError::unsupported(format!("暂不支持的实体类型 {other}"))),
        }
    }

    /// 读取当前实体的全部组码，直到下一个组码 0（回退给调用方）。
    fn read_body(&mut self, kind: &str) -> Result<Vec<(i32, String)>, DxfError> {
        let mut pairs = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    return Ok(pairs);
                }
                Some(pair) => pairs.push(pair),
                None => return Err(DxfError::invalid(format!("{kind} 未正确结束"))),
            }
        }
    }

    fn parse_line(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut start_x = None;
        let mut start_y = None;
        let mut end_x = None;
        let mut end_y = None;
        for (code, value) in self.read_body("LINE")? {
            match code {
                8 => layer = Some(value.trim().to_string()),
                10 => assign_coord(&mut start_x, &value, "LINE 起点 X（组码 10）")?,
                20 => assign_coord(&mut start_y, &value, "LINE 起点 Y（组码 20）")?,
                11 => assign_coord(&mut end_x, &value, "LINE 终点 X（组码 11）")?,
                21 => assign_coord(&mut end_y, &value, "LINE 终点 Y（组码 21）")?,
                _ => {} // Z 坐标、颜色、线型等
            }
        }

        let sx = start_x.ok_or_else(|| DxfError::invalid("LINE 缺少起点 X（组码 10）"))?;
        let sy = start_y.ok_or_else(|| DxfError::invalid("LINE 缺少起点 Y（组码 20）"))?;
        let ex = end_x.ok_or_else(|| DxfError::invalid("LINE 缺少终点 X（组码 11）"))?;
        let ey = end_y.ok_or_else(|| DxfError::invalid("LINE 缺少终点 Y（组码 21）"))?;

        Ok(Entity::Line(Line {
            start: Point2::new(sx, sy),
            end: Point2::new(ex, ey),
            layer: layer_or_default(layer),
        }))
    }

    fn parse_lwpolyline(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut is_closed = false;
        let mut vertices = PointCollector::new("LWPOLYLINE 顶点");
        for (code, value) in self.read_body("LWPOLYLINE")? {
            match code {
                8 => layer = Some(value.trim().to_string()),
                70 => is_closed = parse_i32(&value, "LWPOLYLINE 标志")? & 0x01 == 0x01,
                10 => vertices.push_x(parse_f64(&value, "LWPOLYLINE 顶点 X")?)?,
                20 => vertices.push_y(parse_f64(&value, "LWPOLYLINE 顶点 Y")?)?,
                _ => {} // bulge、线宽等暂不使用
            }
        }

        let vertices = vertices.finish()?;
        if vertices.is_empty() {
            return Err(DxfError::invalid("LWPOLYLINE 未解析到任何顶点"));
        }

        Ok(Entity::Polyline(Polyline {
            vertices,
            is_closed,
            layer: layer_or_default(layer),
        }))
    }

    /// 旧式 POLYLINE：头部之后跟随 VERTEX 记录，以 SEQEND 结束。
    fn parse_polyline(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut flags = 0;
        for (code, value) in self.read_body("POLYLINE")? {
            match code {
                8 => layer = Some(value.trim().to_string()),
                70 => flags = parse_i32(&value, "POLYLINE 标志（组码 70）")?,
                _ => {}
            }
        }

        let mut vertices = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "VERTEX" => {
                        if let Some(vertex) = self.parse_vertex()? {
                            vertices.push(vertex);
                        }
                    }
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        // 缺少 SEQEND 的文件也能见到，直接结束序列
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some((code, value)) => {
                    return Err(DxfError::invalid(format!(
                        "POLYLINE 顶点序列出现意外组码 {code} 值 {value}"
                    )));
                }
                None => return Err(DxfError::invalid("POLYLINE 顶点序列提前结束")),
            }
        }

        if flags & (0x10 | 0x40) != 0 {
            return Err(DxfError::unsupported("POLYLINE 网格/多面网格"));
        }
        if vertices.is_empty() {
            return Err(DxfError::invalid("POLYLINE 未解析到任何顶点"));
        }

        Ok(Entity::Polyline(Polyline {
            vertices,
            is_closed: flags & 0x01 != 0,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_vertex(&mut self) -> Result<Option<Point2>, DxfError> {
        let mut x = None;
        let mut y = None;
        let mut flags = 0;
        for (code, value) in self.read_body("VERTEX")? {
            match code {
                10 => assign_coord(&mut x, &value, "VERTEX X（组码 10）")?,
                20 => assign_coord(&mut y, &value, "VERTEX Y（组码 20）")?,
                70 => flags = parse_i32(&value, "VERTEX 标志（组码 70）")?,
                _ => {}
            }
        }
        // 样条框架控制点不属于折线本身
        if flags & 0x10 != 0 {
            return Ok(None);
        }
        let x = x.ok_or_else(|| DxfError::invalid("VERTEX 缺少 X（组码 10）"))?;
        let y = y.ok_or_else(|| DxfError::invalid("VERTEX 缺少 Y（组码 20）"))?;
        Ok(Some(Point2::new(x, y)))
    }

    fn parse_circle(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut center_x = None;
        let mut center_y = None;
        let mut radius = None;
        for (code, value) in self.read_body("CIRCLE")? {
            match code {
                8 => layer = Some(value.trim().to_string()),
                10 => assign_coord(&mut center_x, &value, "CIRCLE 圆心 X（组码 10）")?,
                20 => assign_coord(&mut center_y, &value, "CIRCLE 圆心 Y（组码 20）")?,
                40 => assign_coord(&mut radius, &value, "CIRCLE 半径（组码 40）")?,
                _ => {}
            }
        }

        let cx = center_x.ok_or_else(|| DxfError::invalid("CIRCLE 缺少圆心 X（组码 10）"))?;
        let cy = center_y.ok_or_else(|| DxfError::invalid("CIRCLE 缺少圆心 Y（组码 20）"))?;
        let radius = radius.ok_or_else(|| DxfError::invalid("CIRCLE 缺少半径（组码 40）"))?;

        Ok(Entity::Circle(Circle {
            center: Point2::new(cx, cy),
            radius,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_arc(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut center_x = None;
        let mut center_y = None;
        let mut radius = None;
        let mut start_angle = None;
        let mut end_angle = None;
        for (code, value) in self.read_body("ARC")? {
            match code {
                8 => layer = Some(value.trim().to_string()),
                10 => assign_coord(&mut center_x, &value, "ARC 圆心 X（组码 10）")?,
                20 => assign_coord(&mut center_y, &value, "ARC 圆心 Y（组码 20）")?,
                40 => assign_coord(&mut radius, &value, "ARC 半径（组码 40）")?,
                50 => assign_coord(&mut start_angle, &value, "ARC 起始角（组码 50）")?,
                51 => assign_coord(&mut end_angle, &value, "ARC 终止角（组码 51）")?,
                _ => {}
            }
        }

        let cx = center_x.ok_or_else(|| DxfError::invalid("ARC 缺少圆心 X（组码 10）"))?;
        let cy = center_y.ok_or_else(|| DxfError::invalid("ARC 缺少圆心 Y（组码 20）"))?;
        let radius = radius.ok_or_else(|| DxfError::invalid("ARC 缺少半径（组码 40）"))?;
        let start_angle =
            start_angle.ok_or_else(|| DxfError::invalid("ARC 缺少起始角（组码 50）"))?;
        let end_angle = end_angle.ok_or_else(|| DxfError::invalid("ARC 缺少终止角（组码 51）"))?;

        Ok(Entity::Arc(Arc {
            center: Point2::new(cx, cy),
            radius,
            start_angle: start_angle.to_radians(),
            end_angle: end_angle.to_radians(),
            layer: layer_or_default(layer),
        }))
    }

    fn parse_ellipse(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut center_x = None;
        let mut center_y = None;
        let mut major_x = None;
        let mut major_y = None;
        let mut ratio = None;
        let mut start_parameter = 0.0;
        let mut end_parameter = std::f64::consts::TAU;
        for (code, value) in self.read_body("ELLIPSE")? {
            match code {
                8 => layer = Some(value.trim().to_string()),
                10 => assign_coord(&mut center_x, &value, "ELLIPSE 圆心 X（组码 10）")?,
                20 => assign_coord(&mut center_y, &value, "ELLIPSE 圆心 Y（组码 20）")?,
                11 => assign_coord(&mut major_x, &value, "ELLIPSE 主轴向量 X（组码 11）")?,
                21 => assign_coord(&mut major_y, &value, "ELLIPSE 主轴向量 Y（组码 21）")?,
                40 => assign_coord(&mut ratio, &value, "ELLIPSE 半径比（组码 40）")?,
                41 => start_parameter = parse_f64(&value, "ELLIPSE 起始参数")?,
                42 => end_parameter = parse_f64(&value, "ELLIPSE 终止参数")?,
                _ => {}
            }
        }

        let cx = center_x.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少圆心 X（组码 10）"))?;
        let cy = center_y.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少圆心 Y（组码 20）"))?;
        let major_x =
            major_x.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少主轴向量 X（组码 11）"))?;
        let major_y =
            major_y.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少主轴向量 Y（组码 21）"))?;

        if major_x.abs() < f64::EPSILON && major_y.abs() < f64::EPSILON {
            return Err(DxfError::invalid("ELLIPSE 主轴向量长度为 0，无法创建实体"));
        }

        let ratio = ratio.unwrap_or(1.0);
        if ratio <= 0.0 {
            return Err(DxfError::invalid(format!(
                "ELLIPSE 半径比必须为正数，实际为 {ratio}"
            )));
        }

        Ok(Entity::Ellipse(Ellipse {
            center: Point2::new(cx, cy),
            major_axis: Vector2::new(major_x, major_y),
            ratio,
            start_parameter,
            end_parameter,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_spline(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut flags = 0;
        let mut degree = 3;
        let mut control_points = PointCollector::new("SPLINE 控制点");
        let mut fit_points = PointCollector::new("SPLINE 拟合点");
        for (code, value) in self.read_body("SPLINE")? {
            match code {
                8 => layer = Some(value.trim().to_string()),
                70 => flags = parse_i32(&value, "SPLINE 标志（组码 70）")?,
                71 => degree = parse_i32(&value, "SPLINE 阶数（组码 71）")?,
                10 => control_points.push_x(parse_f64(&value, "SPLINE 控制点 X")?)?,
                20 => control_points.push_y(parse_f64(&value, "SPLINE 控制点 Y")?)?,
                11 => fit_points.push_x(parse_f64(&value, "SPLINE 拟合点 X")?)?,
                21 => fit_points.push_y(parse_f64(&value, "SPLINE 拟合点 Y")?)?,
                _ => {} // 节点值、权重、切向量
            }
        }

        let control_points = control_points.finish()?;
        let fit_points = fit_points.finish()?;
        if control_points.is_empty() && fit_points.is_empty() {
            return Err(DxfError::invalid("SPLINE 缺少控制点与拟合点"));
        }

        Ok(Entity::Spline(Spline {
            degree,
            control_points,
            fit_points,
            is_closed: flags & 0x01 != 0,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_text(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut insert_x = None;
        let mut insert_y = None;
        let mut height = None;
        let mut rotation_deg = 0.0;
        let mut text: Option<String> = None;
        for (code, value) in self.read_body("TEXT")? {
            match code {
                8 => layer = Some(value.trim().to_string()),
                10 => assign_coord(&mut insert_x, &value, "TEXT 插入点 X（组码 10）")?,
                20 => assign_coord(&mut insert_y, &value, "TEXT 插入点 Y（组码 20）")?,
                40 => assign_coord(&mut height, &value, "TEXT 高度（组码 40）")?,
                50 => rotation_deg = parse_f64(&value, "TEXT 旋转角")?,
                1 => match text {
                    Some(ref mut existing) => {
                        existing.push('\n');
                        existing.push_str(&value);
                    }
                    None => text = Some(value),
                },
                _ => {} // 文字样式、对齐信息等
            }
        }

        let ix = insert_x.ok_or_else(|| DxfError::invalid("TEXT 缺少插入点 X（组码 10）"))?;
        let iy = insert_y.ok_or_else(|| DxfError::invalid("TEXT 缺少插入点 Y（组码 20）"))?;
        let height = height.ok_or_else(|| DxfError::invalid("TEXT 缺少文字高度（组码 40）"))?;
        let content = text.ok_or_else(|| DxfError::invalid("TEXT 缺少文本内容（组码 1）"))?;

        Ok(Entity::Text(Text {
            position: Point2::new(ix, iy),
            content: decode_inline_text(&content),
            height,
            rotation: rotation_deg.to_radians(),
            layer: layer_or_default(layer),
        }))
    }

    fn parse_mtext(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut insert_x = None;
        let mut insert_y = None;
        let mut height = None;
        let mut rotation_deg: Option<f64> = None;
        let mut direction_x: Option<f64> = None;
        let mut direction_y: Option<f64> = None;
        let mut fragments: Vec<String> = Vec::new();
        for (code, value) in self.read_body("MTEXT")? {
            match code {
                8 => layer = Some(value.trim().to_string()),
                10 => assign_coord(&mut insert_x, &value, "MTEXT 插入点 X（组码 10）")?,
                20 => assign_coord(&mut insert_y, &value, "MTEXT 插入点 Y（组码 20）")?,
                40 => assign_coord(&mut height, &value, "MTEXT 高度（组码 40）")?,
                11 => direction_x = Some(parse_f64(&value, "MTEXT 方向向量 X")?),
                21 => direction_y = Some(parse_f64(&value, "MTEXT 方向向量 Y")?),
                50 => rotation_deg = Some(parse_f64(&value, "MTEXT 旋转角")?),
                1 | 3 => fragments.push(value),
                _ => {}
            }
        }

        let ix = insert_x.ok_or_else(|| DxfError::invalid("MTEXT 缺少插入点 X（组码 10）"))?;
        let iy = insert_y.ok_or_else(|| DxfError::invalid("MTEXT 缺少插入点 Y（组码 20）"))?;
        let height = height.ok_or_else(|| DxfError::invalid("MTEXT 缺少文本高度（组码 40）"))?;
        if fragments.is_empty() {
            return Err(DxfError::invalid("MTEXT 缺少内容（组码 1/3）"));
        }

        let rotation = match (direction_x, direction_y) {
            (Some(x), Some(y)) if x.abs() >= f64::EPSILON || y.abs() >= f64::EPSILON => {
                y.atan2(x)
            }
            _ => rotation_deg.unwrap_or(0.0).to_radians(),
        };

        let content = fragments
            .iter()
            .map(|fragment| decode_inline_text(fragment))
            .collect::<String>();

        Ok(Entity::Text(Text {
            position: Point2::new(ix, iy),
            content,
            height,
            rotation,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_insert(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut name = None;
        let mut insert_x = None;
        let mut insert_y = None;
        let mut scale_x: Option<f64> = None;
        let mut scale_y: Option<f64> = None;
        let mut rotation_deg = 0.0;
        for (code, value) in self.read_body("INSERT")? {
            match code {
                8 => layer = Some(value.trim().to_string()),
                2 => {
                    if name.is_some() {
                        return Err(DxfError::invalid("INSERT 遇到重复的块名（组码 2）"));
                    }
                    name = Some(value.trim().to_string());
                }
                10 => assign_coord(&mut insert_x, &value, "INSERT 插入点 X（组码 10）")?,
                20 => assign_coord(&mut insert_y, &value, "INSERT 插入点 Y（组码 20）")?,
                41 => scale_x = Some(parse_f64(&value, "INSERT 缩放 X")?),
                42 => scale_y = Some(parse_f64(&value, "INSERT 缩放 Y")?),
                50 => rotation_deg = parse_f64(&value, "INSERT 旋转角")?,
                _ => {}
            }
        }

        let name = name.ok_or_else(|| DxfError::invalid("INSERT 缺少块名（组码 2）"))?;
        let ix = insert_x.ok_or_else(|| DxfError::invalid("INSERT 缺少插入点 X（组码 10）"))?;
        let iy = insert_y.ok_or_else(|| DxfError::invalid("INSERT 缺少插入点 Y（组码 20）"))?;
        let sx = scale_x.unwrap_or(1.0);
        let sy = scale_y.unwrap_or(sx);

        let mut attributes = BTreeMap::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "ATTRIB" => {
                        let (tag, text) = self.parse_attrib()?;
                        attributes.insert(tag, text);
                    }
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some((code, value)) => {
                    return Err(DxfError::invalid(format!(
                        "INSERT 属性段出现意外组码 {code} 值 {value}"
                    )));
                }
                None => break,
            }
        }

        Ok(Entity::Insert(Insert {
            name,
            position: Point2::new(ix, iy),
            scale: Vector2::new(sx, sy),
            rotation: rotation_deg.to_radians(),
            attributes,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_attrib(&mut self) -> Result<(String, String), DxfError> {
        let mut tag = None;
        let mut text = None;
        for (code, value) in self.read_body("ATTRIB")? {
            match code {
                1 => text = Some(decode_inline_text(&value)),
                2 => tag = Some(value.trim().to_string()),
                _ => {}
            }
        }
        let tag = tag.ok_or_else(|| DxfError::invalid("ATTRIB 缺少标记（组码 2）"))?;
        let text = text.ok_or_else(|| DxfError::invalid("ATTRIB 缺少文本内容（组码 1）"))?;
        Ok((tag, text))
    }

    fn parse_dimension(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut definition_x = None;
        let mut definition_y = None;
        let mut text_mid_x = None;
        let mut text_mid_y = None;
        let mut first_x = None;
        let mut first_y = None;
        let mut second_x = None;
        let mut second_y = None;
        let mut text = None;
        let mut measurement = None;
        for (code, value) in self.read_body("DIMENSION")? {
            match code {
                8 => layer = Some(value.trim().to_string()),
                1 => {
                    let entry = value.trim();
                    text = if entry.is_empty() || entry == "<>" {
                        None
                    } else {
                        Some(decode_inline_text(entry))
                    };
                }
                10 => assign_coord(&mut definition_x, &value, "DIMENSION 定义点 X（组码 10）")?,
                20 => assign_coord(&mut definition_y, &value, "DIMENSION 定义点 Y（组码 20）")?,
                11 => assign_coord(&mut text_mid_x, &value, "DIMENSION 文本位置 X（组码 11）")?,
                21 => assign_coord(&mut text_mid_y, &value, "DIMENSION 文本位置 Y（组码 21）")?,
                13 => assign_coord(&mut first_x, &value, "DIMENSION 第一尺寸界线 X（组码 13）")?,
                23 => assign_coord(&mut first_y, &value, "DIMENSION 第一尺寸界线 Y（组码 23）")?,
                14 => assign_coord(&mut second_x, &value, "DIMENSION 第二尺寸界线 X（组码 14）")?,
                24 => assign_coord(&mut second_y, &value, "DIMENSION 第二尺寸界线 Y（组码 24）")?,
                42 => measurement = Some(parse_f64(&value, "DIMENSION 测量值（组码 42）")?),
                _ => {}
            }
        }

        let dx = definition_x
            .ok_or_else(|| DxfError::invalid("DIMENSION 缺少定义点 X（组码 10）"))?;
        let dy = definition_y
            .ok_or_else(|| DxfError::invalid("DIMENSION 缺少定义点 Y（组码 20）"))?;
        let definition_point = Point2::new(dx, dy);
        let text_midpoint = match (text_mid_x, text_mid_y) {
            (Some(x), Some(y)) => Point2::new(x, y),
            (None, None) => definition_point,
            _ => return Err(DxfError::invalid("DIMENSION 文本位置坐标不完整（组码 11/21）")),
        };

        Ok(Entity::Dimension(Dimension {
            definition_point,
            text_midpoint,
            first_point: optional_point(first_x, first_y, "DIMENSION 第一尺寸界线")?,
            second_point: optional_point(second_x, second_y, "DIMENSION 第二尺寸界线")?,
            text,
            measurement,
            layer: layer_or_default(layer),
        }))
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }
}

/// 成对收集 10/20（或 11/21）组码形成的点序列。
struct PointCollector {
    context: &'static str,
    points: Vec<Point2>,
    pending_x: Option<f64>,
    pending_y: Option<f64>,
}

impl PointCollector {
    fn new(context: &'static str) -> Self {
        Self {
            context,
            points: Vec::new(),
            pending_x: None,
            pending_y: None,
        }
    }

    fn push_x(&mut self, x: f64) -> Result<(), DxfError> {
        if let Some(y) = self.pending_y.take() {
            self.points.push(Point2::new(x, y));
        } else if self.pending_x.replace(x).is_some() {
            return Err(DxfError::invalid(format!("{} 缺少对应的 Y 坐标", self.context)));
        }
        Ok(())
    }

    fn push_y(&mut self, y: f64) -> Result<(), DxfError> {
        if let Some(x) = self.pending_x.take() {
            self.points.push(Point2::new(x, y));
        } else if self.pending_y.replace(y).is_some() {
            return Err(DxfError::invalid(format!("{} 缺少对应的 X 坐标", self.context)));
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<Point2>, DxfError> {
        if self.pending_x.is_some() || self.pending_y.is_some() {
            return Err(DxfError::invalid(format!(
                "{} 坐标未成对出现，检测到不完整的点",
                self.context
            )));
        }
        Ok(self.points)
    }
}

/// 注释组码，任意位置出现都直接忽略。
const COMMENT_CODE: i32 = 999;

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    fn line_number(&self) -> usize {
        self.line_number
    }

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }
        loop {
            match self.read_pair()? {
                Some((COMMENT_CODE, _)) => continue,
                other => return Ok(other),
            }
        }
    }

    fn read_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        // 文件末尾允许有空行
        let code_line = loop {
            match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Ok(None),
            }
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "内部错误：尝试多次回退 DXF pair");
        self.buffer = Some(pair);
    }
}

fn layer_or_default(layer: Option<String>) -> String {
    match layer {
        Some(layer) if !layer.is_empty() => layer,
        _ => fplan_core::layers::DEFAULT.to_string(),
    }
}

fn assign_coord(slot: &mut Option<f64>, raw: &str, context: &str) -> Result<(), DxfError> {
    if slot.is_some() {
        return Err(DxfError::invalid(format!("{context} 出现重复值")));
    }
    *slot = Some(parse_f64(raw, context)?);
    Ok(())
}

fn optional_point(
    x: Option<f64>,
    y: Option<f64>,
    context: &str,
) -> Result<Option<Point2>, DxfError> {
    match (x, y) {
        (Some(x), Some(y)) => Ok(Some(Point2::new(x, y))),
        (None, None) => Ok(None),
        _ => Err(DxfError::invalid(format!("{context} 坐标不完整"))),
    }
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn decode_inline_text(raw: &str) -> String {
    let mut result = String::new();
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('P') | Some('p') => result.push('\n'),
                Some('~') => result.push(' '),
                Some('\\') => result.push('\\'),
                Some('S') | Some('s') => {
                    // 跳过堆叠分数段
                    for next in chars.by_ref() {
                        if next == ';' {
                            break;
                        }
                    }
                }
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_inline_text_handles_paragraphs_and_stacks() {
        assert_eq!(decode_inline_text("A\\PB"), "A\nB");
        assert_eq!(decode_inline_text("1\\S1/2;m"), "1m");
        assert_eq!(decode_inline_text("a\\~b"), "a b");
    }

    #[test]
    fn point_collector_rejects_unpaired_coordinates() {
        let mut collector = PointCollector::new("测试点");
        collector.push_x(1.0).unwrap();
        assert!(collector.push_x(2.0).is_err());

        let mut collector = PointCollector::new("测试点");
        collector.push_y(5.0).unwrap();
        collector.push_x(3.0).unwrap();
        collector.push_x(4.0).unwrap();
        assert!(collector.finish().is_err());
    }

    #[test]
    fn reader_reports_non_numeric_group_code() {
        let mut reader = DxfReader::new("abc\nLINE\n");
        let err = reader.next_pair().unwrap_err();
        assert!(matches!(err, DxfError::Invalid { .. }));
    }

    #[test]
    fn reader_skips_comment_pairs() {
        let mut reader = DxfReader::new("999\ndxfrw 0.6.3\n0\nSECTION\n999\nnote\n2\nENTITIES\n");
        assert_eq!(reader.next_pair().unwrap(), Some((0, "SECTION".to_string())));
        assert_eq!(reader.next_pair().unwrap(), Some((2, "ENTITIES".to_string())));
        assert_eq!(reader.next_pair().unwrap(), None);
    }

    #[test]
    fn reader_requires_value_line() {
        let mut reader = DxfReader::new("0\nSECTION\n2\n");
        assert!(reader.next_pair().unwrap().is_some());
        assert!(reader.next_pair().is_err());
    }
}
