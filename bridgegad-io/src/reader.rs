//! DXF 结构检查：把写出的文本重新拆成组码对，汇总头变量、图层表与实体记录。
//! 仅用于校验导出结果，不构建可编辑的文档。

use bridgegad_core::document::{DrawingUnits, TextAlignment};
use bridgegad_core::geometry::Point2;

use crate::{DxfVersion, IoError};

#[derive(Debug, Clone, PartialEq)]
pub struct LayerRecord {
    pub name: String,
    pub color_index: i16,
    pub linetype: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub kind: String,
    pub handle: Option<String>,
    pub layer: Option<String>,
    /// LINE 为起终点，LWPOLYLINE 为顶点序列，TEXT 为插入点。
    pub points: Vec<Point2>,
    pub text: Option<String>,
    pub height: Option<f64>,
    pub alignment: Option<TextAlignment>,
    pub alignment_point: Option<Point2>,
}

impl EntityRecord {
    fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            handle: None,
            layer: None,
            points: Vec::new(),
            text: None,
            height: None,
            alignment: None,
            alignment_point: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DxfSummary {
    pub acadver: Option<String>,
    pub units: Option<DrawingUnits>,
    pub handle_seed: Option<String>,
    pub linetypes: Vec<String>,
    pub layers: Vec<LayerRecord>,
    pub entities: Vec<EntityRecord>,
}

impl DxfSummary {
    pub fn version(&self) -> Option<DxfVersion> {
        self.acadver.as_deref().and_then(DxfVersion::from_acadver)
    }

    pub fn layer(&self, name: &str) -> Option<&LayerRecord> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    /// 实体引用但图层表中不存在的图层名。
    pub fn undeclared_layers(&self) -> Vec<&str> {
        self.entities
            .iter()
            .filter_map(|entity| entity.layer.as_deref())
            .filter(|layer| self.layer(layer).is_none())
            .collect()
    }

    pub fn entities_on<'a>(&'a self, layer: &'a str) -> impl Iterator<Item = &'a EntityRecord> + 'a {
        self.entities
            .iter()
            .filter(move |entity| entity.layer.as_deref() == Some(layer))
    }
}

pub fn inspect(source: &str) -> Result<DxfSummary, IoError> {
    let mut reader = DxfReader::new(source);
    let mut summary = DxfSummary::default();
    let mut saw_eof = false;

    while let Some((code, value)) = reader.next_pair()? {
        if code != 0 {
            return Err(invalid(format!(
                "顶层出现组码 {code}（应为 0，用于 SECTION/EOF）"
            )));
        }
        match value.as_str() {
            "SECTION" => {
                let (name_code, name) = reader
                    .next_pair()?
                    .ok_or_else(|| invalid("SECTION 缺少名称"))?;
                if name_code != 2 {
                    return Err(invalid(format!(
                        "SECTION 名称使用了组码 {name_code}（应为 2）"
                    )));
                }
                match name.as_str() {
                    "HEADER" => parse_header(&mut reader, &mut summary)?,
                    "TABLES" => parse_tables(&mut reader, &mut summary)?,
                    "ENTITIES" => parse_entities(&mut reader, &mut summary)?,
                    _ => skip_section(&mut reader)?,
                }
            }
            "EOF" => {
                saw_eof = true;
                break;
            }
            unexpected => {
                return Err(invalid(format!(
                    "意外的标记 {unexpected}，应为 SECTION 或 EOF"
                )));
            }
        }
    }

    if !saw_eof {
        return Err(invalid("缺少 EOF 结束标记"));
    }
    Ok(summary)
}

fn parse_header(reader: &mut DxfReader<'_>, summary: &mut DxfSummary) -> Result<(), IoError> {
    let mut variable: Option<String> = None;
    loop {
        let (code, value) = reader
            .next_pair()?
            .ok_or_else(|| invalid("HEADER 段在 ENDSEC 之前结束"))?;
        if code == 0 && value == "ENDSEC" {
            break;
        }
        if code == 9 {
            variable = Some(value);
            continue;
        }
        match (code, variable.as_deref()) {
            (1, Some("$ACADVER")) => summary.acadver = Some(value),
            (5, Some("$HANDSEED")) => summary.handle_seed = Some(value),
            (70, Some("$INSUNITS")) => {
                let code = parse_i16(&value, "$INSUNITS")?;
                summary.units = DrawingUnits::from_insunits_code(code);
            }
            _ => {}
        }
    }
    Ok(())
}

fn parse_tables(reader: &mut DxfReader<'_>, summary: &mut DxfSummary) -> Result<(), IoError> {
    loop {
        let (code, value) = reader
            .next_pair()?
            .ok_or_else(|| invalid("TABLES 段在 ENDSEC 之前结束"))?;
        if code != 0 {
            continue;
        }
        match value.as_str() {
            "ENDSEC" => break,
            "LAYER" => {
                let pairs = read_record(reader)?;
                let mut layer = LayerRecord {
                    name: String::new(),
                    color_index: 7,
                    linetype: "Continuous".to_string(),
                };
                for (code, raw) in pairs {
                    match code {
                        2 => layer.name = raw,
                        62 => layer.color_index = parse_i16(&raw, "LAYER 颜色")?,
                        6 => layer.linetype = raw,
                        _ => {}
                    }
                }
                summary.layers.push(layer);
            }
            "LTYPE" => {
                let pairs = read_record(reader)?;
                if let Some((_, name)) = pairs.into_iter().find(|(code, _)| *code == 2) {
                    summary.linetypes.push(name);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn parse_entities(reader: &mut DxfReader<'_>, summary: &mut DxfSummary) -> Result<(), IoError> {
    loop {
        let (code, kind) = reader
            .next_pair()?
            .ok_or_else(|| invalid("ENTITIES 段在 ENDSEC 之前结束"))?;
        if code != 0 {
            return Err(invalid(format!(
                "ENTITIES 段出现组码 {code}（实体应以组码 0 开始）"
            )));
        }
        if kind == "ENDSEC" {
            break;
        }
        let pairs = read_record(reader)?;
        summary.entities.push(build_entity_record(&kind, pairs)?);
    }
    Ok(())
}

fn build_entity_record(kind: &str, pairs: Vec<(i32, String)>) -> Result<EntityRecord, IoError> {
    let mut record = EntityRecord::new(kind);
    let mut x: Option<f64> = None;
    let mut second_x: Option<f64> = None;
    let mut second: Option<Point2> = None;
    let mut horizontal = 0;
    let mut vertical = 0;
    let context = kind.to_string();

    for (code, raw) in pairs {
        match code {
            5 => record.handle = Some(raw),
            8 => record.layer = Some(raw),
            1 => record.text = Some(raw),
            40 if kind == "TEXT" => record.height = Some(parse_f64(&raw, &context)?),
            10 => x = Some(parse_f64(&raw, &context)?),
            20 => {
                let x = x.take().ok_or_else(|| invalid(format!("{kind}: 缺少与 Y 对应的 X 坐标")))?;
                record.points.push(Point2::new(x, parse_f64(&raw, &context)?));
            }
            11 => second_x = Some(parse_f64(&raw, &context)?),
            21 => {
                let x = second_x
                    .take()
                    .ok_or_else(|| invalid(format!("{kind}: 缺少与第二点 Y 对应的 X 坐标")))?;
                second = Some(Point2::new(x, parse_f64(&raw, &context)?));
            }
            72 => horizontal = parse_i16(&raw, &context)?,
            73 => vertical = parse_i16(&raw, &context)?,
            _ => {}
        }
    }

    match kind {
        "LINE" => {
            let end = second.ok_or_else(|| invalid("LINE 缺少终点"))?;
            record.points.push(end);
        }
        "TEXT" => {
            record.alignment = TextAlignment::from_justification(horizontal, vertical);
            record.alignment_point = second;
        }
        _ => {}
    }
    Ok(record)
}

fn skip_section(reader: &mut DxfReader<'_>) -> Result<(), IoError> {
    loop {
        match reader.next_pair()? {
            Some((0, value)) if value == "ENDSEC" => break,
            Some(_) => continue,
            None => return Err(invalid("SECTION 缺少 ENDSEC")),
        }
    }
    Ok(())
}

/// 读取到下一个组码 0 之前的全部组码对，并把组码 0 放回。
fn read_record(reader: &mut DxfReader<'_>) -> Result<Vec<(i32, String)>, IoError> {
    let mut pairs = Vec::new();
    while let Some(pair) = reader.next_pair()? {
        if pair.0 == 0 {
            reader.put_back(pair);
            break;
        }
        pairs.push(pair);
    }
    Ok(pairs)
}

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

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, IoError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        let code_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => return Ok(None),
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(invalid(format!(
                    "文件在第 {} 行结束，组码缺少对应的值",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            invalid(format!(
                "第 {1} 行的组码 \"{0}\" 不是整数",
                code_line.trim(),
                self.line_number - 1
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "只能放回一个组码对");
        self.buffer = Some(pair);
    }
}

fn invalid(message: impl Into<String>) -> IoError {
    IoError::InvalidDocument(message.into())
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, IoError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| invalid(format!("{context}: 无法将 \"{raw}\" 解析为数值")))
}

fn parse_i16(raw: &str, context: &str) -> Result<i16, IoError> {
    raw.trim()
        .parse::<i16>()
        .map_err(|_| invalid(format!("{context}: 无法将 \"{raw}\" 解析为整数")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_pair_is_reported() {
        let err = inspect("  0\nSECTION\n  2").unwrap_err();
        assert!(matches!(err, IoError::InvalidDocument(message) if message.contains("缺少对应的值")));
    }

    #[test]
    fn non_integer_group_code_reports_line_number() {
        let err = inspect("  0\nSECTION\n  X\nHEADER\n").unwrap_err();
        assert!(
            matches!(&err, IoError::InvalidDocument(message) if message.contains("第 3 行的组码 \"X\" 不是整数")),
            "{err}"
        );
    }

    #[test]
    fn missing_eof_is_reported() {
        let err = inspect("  0\nSECTION\n  2\nHEADER\n  0\nENDSEC\n").unwrap_err();
        assert!(matches!(err, IoError::InvalidDocument(message) if message.contains("EOF")));
    }

    #[test]
    fn minimal_entities_section_is_summarised() {
        let source = "  0\nSECTION\n  2\nENTITIES\n  0\nLINE\n  8\nGRID\n 10\n0.0\n 20\n10.0\n 30\n0.0\n 11\n25.0\n 21\n12.0\n 31\n0.0\n  0\nENDSEC\n  0\nEOF\n";
        let summary = inspect(source).expect("valid dxf");
        assert_eq!(summary.entities.len(), 1);
        let line = &summary.entities[0];
        assert_eq!(line.kind, "LINE");
        assert_eq!(line.layer.as_deref(), Some("GRID"));
        assert_eq!(
            line.points,
            vec![Point2::new(0.0, 10.0), Point2::new(25.0, 12.0)]
        );
        assert_eq!(summary.undeclared_layers(), vec!["GRID"]);
    }
}
