//! ASCII DXF 写入。
//!
//! 输出顺序：HEADER、CLASSES、TABLES、BLOCKS、ENTITIES、OBJECTS、EOF。
//! 句柄按写入顺序从计数器分配，不写入时间戳，因此同一文档总是得到相同字节。

use std::fmt::{Display, Write as _};

use bridgegad_core::document::{DrawingDocument, Entity, LineSegment, Polyline, TextLabel};
use bridgegad_core::geometry::Point2;
use bridgegad_core::layer::{LAYER_DEFAULT, LineStyle};

use crate::{DxfVersion, IoError};

const FIRST_HANDLE: u64 = 0x10;
const DEFAULT_TEXT_STYLE: &str = "Standard";
const DASHED_DESCRIPTION: &str = "Dashed __ __ __ __ __ __ __ __";
const DASHED_PATTERN: [f64; 2] = [0.5, -0.25];

/// 编码入口，使用默认版本（R2010）。
pub fn encode(document: &DrawingDocument) -> Result<Vec<u8>, IoError> {
    DxfEncoder::default().encode(document)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DxfEncoder {
    version: DxfVersion,
}

impl DxfEncoder {
    pub fn new(version: DxfVersion) -> Self {
        Self { version }
    }

    #[inline]
    pub fn version(&self) -> DxfVersion {
        self.version
    }

    pub fn encode(&self, document: &DrawingDocument) -> Result<Vec<u8>, IoError> {
        self.encode_to_string(document).map(String::into_bytes)
    }

    pub fn encode_to_string(&self, document: &DrawingDocument) -> Result<String, IoError> {
        validate_document(document)?;

        let mut body = DxfWriter::new(FIRST_HANDLE);
        body.begin_section("CLASSES");
        body.end_section();
        let owners = self.write_tables(&mut body, document);
        write_blocks(&mut body, &owners);
        self.write_entities(&mut body, document, &owners);
        write_objects(&mut body);

        let mut output = DxfWriter::new(0);
        self.write_header(&mut output, document, body.peek_handle());
        output.append(body);
        Ok(output.finish())
    }

    fn write_header(&self, writer: &mut DxfWriter, document: &DrawingDocument, handle_seed: u64) {
        let units = document.units();
        writer.begin_section("HEADER");
        writer.pair(9, "$ACADVER");
        writer.pair(1, self.version.acadver());
        if !self.version.is_unicode() {
            writer.pair(9, "$DWGCODEPAGE");
            writer.pair(3, "ANSI_1252");
        }
        writer.pair(9, "$HANDSEED");
        writer.pair(5, format_handle(handle_seed));
        writer.pair(9, "$INSUNITS");
        writer.pair(70, units.insunits_code());
        writer.pair(9, "$MEASUREMENT");
        writer.pair(70, i16::from(units.is_metric()));

        let (min, max) = match document.bounds() {
            Some(bounds) => (bounds.min(), bounds.max()),
            None => (Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)),
        };
        writer.pair(9, "$EXTMIN");
        writer.point(10, min);
        writer.pair(9, "$EXTMAX");
        writer.point(10, max);
        writer.end_section();
    }

    fn write_tables(&self, writer: &mut DxfWriter, document: &DrawingDocument) -> BlockOwners {
        let layers = document.layers();
        writer.begin_section("TABLES");

        writer.begin_table("VPORT", 0);
        writer.end_table();

        let dashed = layers.uses_line_style(LineStyle::Dashed);
        let ltype = writer.begin_table("LTYPE", if dashed { 4 } else { 3 });
        for name in ["ByBlock", "ByLayer"] {
            writer.begin_record("LTYPE", &ltype, "AcDbLinetypeTableRecord");
            writer.pair(2, name);
            writer.pair(70, 0);
            writer.pair(3, "");
            writer.pair(72, 65);
            writer.pair(73, 0);
            writer.float(40, 0.0);
        }
        writer.begin_record("LTYPE", &ltype, "AcDbLinetypeTableRecord");
        writer.pair(2, LineStyle::Solid.linetype_name());
        writer.pair(70, 0);
        writer.pair(3, "Solid line");
        writer.pair(72, 65);
        writer.pair(73, 0);
        writer.float(40, 0.0);
        if dashed {
            writer.begin_record("LTYPE", &ltype, "AcDbLinetypeTableRecord");
            writer.pair(2, LineStyle::Dashed.linetype_name());
            writer.pair(70, 0);
            writer.pair(3, DASHED_DESCRIPTION);
            writer.pair(72, 65);
            writer.pair(73, DASHED_PATTERN.len());
            writer.float(40, DASHED_PATTERN.iter().map(|dash| dash.abs()).sum());
            for dash in DASHED_PATTERN {
                writer.float(49, dash);
                writer.pair(74, 0);
            }
        }
        writer.end_table();

        let layer_table = writer.begin_table("LAYER", layers.len());
        for layer in layers.iter() {
            writer.begin_record("LAYER", &layer_table, "AcDbLayerTableRecord");
            writer.pair(2, self.text(&layer.name));
            writer.pair(70, 0);
            writer.pair(62, layer.color_index);
            writer.pair(6, layer.line_style.linetype_name());
            writer.pair(370, -3);
        }
        writer.end_table();

        let style_table = writer.begin_table("STYLE", 1);
        writer.begin_record("STYLE", &style_table, "AcDbTextStyleTableRecord");
        writer.pair(2, DEFAULT_TEXT_STYLE);
        writer.pair(70, 0);
        writer.float(40, 0.0);
        writer.float(41, 1.0);
        writer.float(50, 0.0);
        writer.pair(71, 0);
        writer.float(42, 2.5);
        writer.pair(3, "txt");
        writer.pair(4, "");
        writer.end_table();

        writer.begin_table("VIEW", 0);
        writer.end_table();
        writer.begin_table("UCS", 0);
        writer.end_table();

        let appid_table = writer.begin_table("APPID", 1);
        writer.begin_record("APPID", &appid_table, "AcDbRegAppTableRecord");
        writer.pair(2, "ACAD");
        writer.pair(70, 0);
        writer.end_table();

        writer.begin_table("DIMSTYLE", 0);
        writer.end_table();

        let block_table = writer.begin_table("BLOCK_RECORD", 2);
        let model_space =
            writer.begin_record("BLOCK_RECORD", &block_table, "AcDbBlockTableRecord");
        writer.pair(2, "*Model_Space");
        let paper_space =
            writer.begin_record("BLOCK_RECORD", &block_table, "AcDbBlockTableRecord");
        writer.pair(2, "*Paper_Space");
        writer.end_table();

        writer.end_section();
        BlockOwners {
            model_space,
            paper_space,
        }
    }

    fn write_entities(&self, writer: &mut DxfWriter, document: &DrawingDocument, owners: &BlockOwners) {
        writer.begin_section("ENTITIES");
        for (_, entity) in document.entities() {
            match entity {
                Entity::Text(text) => self.write_text(writer, text, &owners.model_space),
                Entity::Line(line) => self.write_line(writer, line, &owners.model_space),
                Entity::Polyline(polyline) => {
                    self.write_polyline(writer, polyline, &owners.model_space)
                }
            }
        }
        writer.end_section();
    }

    fn write_line(&self, writer: &mut DxfWriter, line: &LineSegment, owner: &str) {
        writer.begin_entity("LINE", owner, &self.text(&line.layer));
        writer.pair(100, "AcDbLine");
        writer.point(10, line.start);
        writer.point(11, line.end);
    }

    fn write_text(&self, writer: &mut DxfWriter, text: &TextLabel, owner: &str) {
        let (horizontal, vertical) = text.alignment.justification();
        writer.begin_entity("TEXT", owner, &self.text(&text.layer));
        writer.pair(100, "AcDbText");
        writer.point(10, text.insert);
        writer.float(40, text.height);
        writer.pair(1, self.text(&text.content));
        writer.pair(
            7,
            self.text(text.style.as_deref().unwrap_or(DEFAULT_TEXT_STYLE)),
        );
        if !text.alignment.is_default() {
            // 非默认对齐时渲染端以第二对齐点定位字形。
            writer.pair(72, horizontal);
            writer.point(11, text.insert);
        }
        writer.pair(100, "AcDbText");
        if vertical != 0 {
            writer.pair(73, vertical);
        }
    }

    fn write_polyline(&self, writer: &mut DxfWriter, polyline: &Polyline, owner: &str) {
        writer.begin_entity("LWPOLYLINE", owner, &self.text(&polyline.layer));
        writer.pair(100, "AcDbPolyline");
        writer.pair(90, polyline.vertices.len());
        writer.pair(70, i16::from(polyline.closed));
        writer.float(43, 0.0);
        for vertex in &polyline.vertices {
            writer.float(10, vertex.x());
            writer.float(20, vertex.y());
        }
    }

    /// 字符串值不能跨行；R2007 之前的版本以 `\U+XXXX` 表示非 ASCII 字符。
    fn text(&self, raw: &str) -> String {
        let mut result = String::with_capacity(raw.len());
        for ch in raw.chars() {
            match ch {
                '\r' | '\n' => result.push(' '),
                ch if ch.is_ascii() || self.version.is_unicode() => result.push(ch),
                ch => {
                    let mut units = [0u16; 2];
                    for unit in ch.encode_utf16(&mut units) {
                        let _ = write!(result, "\\U+{:04X}", unit);
                    }
                }
            }
        }
        result
    }
}

struct BlockOwners {
    model_space: String,
    paper_space: String,
}

fn write_blocks(writer: &mut DxfWriter, owners: &BlockOwners) {
    writer.begin_section("BLOCKS");
    for (name, owner, paper) in [
        ("*Model_Space", &owners.model_space, false),
        ("*Paper_Space", &owners.paper_space, true),
    ] {
        writer.begin_entity_with_space("BLOCK", owner, LAYER_DEFAULT, paper);
        writer.pair(100, "AcDbBlockBegin");
        writer.pair(2, name);
        writer.pair(70, 0);
        writer.point(10, Point2::new(0.0, 0.0));
        writer.pair(3, name);
        writer.pair(1, "");
        writer.begin_entity_with_space("ENDBLK", owner, LAYER_DEFAULT, paper);
        writer.pair(100, "AcDbBlockEnd");
    }
    writer.end_section();
}

fn write_objects(writer: &mut DxfWriter) {
    writer.begin_section("OBJECTS");
    let root = writer.next_handle();
    let group = writer.next_handle();

    writer.pair(0, "DICTIONARY");
    writer.pair(5, &root);
    writer.pair(330, "0");
    writer.pair(100, "AcDbDictionary");
    writer.pair(281, 1);
    writer.pair(3, "ACAD_GROUP");
    writer.pair(350, &group);

    writer.pair(0, "DICTIONARY");
    writer.pair(5, &group);
    writer.pair(330, &root);
    writer.pair(100, "AcDbDictionary");
    writer.pair(281, 1);
    writer.end_section();
}

/// 编码前的一致性检查：图层必须已声明，数值必须有限。
fn validate_document(document: &DrawingDocument) -> Result<(), IoError> {
    let layers = document.layers();
    for (id, entity) in document.entities() {
        let layer = entity.layer_name();
        if !layers.contains(layer) {
            return Err(IoError::Encoding(format!(
                "实体 #{} ({}) 引用了未声明的图层 `{layer}`",
                id.get(),
                entity.kind_name()
            )));
        }
        let finite = match entity {
            Entity::Text(text) => {
                is_finite_point(text.insert) && text.height.is_finite() && text.height > 0.0
            }
            Entity::Line(line) => is_finite_point(line.start) && is_finite_point(line.end),
            Entity::Polyline(polyline) => polyline.vertices.iter().copied().all(is_finite_point),
        };
        if !finite {
            return Err(IoError::Encoding(format!(
                "实体 #{} ({}) 含有非有限的几何数值",
                id.get(),
                entity.kind_name()
            )));
        }
    }
    Ok(())
}

#[inline]
fn is_finite_point(point: Point2) -> bool {
    point.as_vec2().is_finite()
}

fn format_handle(handle: u64) -> String {
    format!("{handle:X}")
}

/// 浮点数以最短可回读形式输出，整数值补 `.0`。
fn format_float(value: f64) -> String {
    if value == 0.0 {
        "0.0".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// 组码-值对写入器，组码右对齐到 3 列。
struct DxfWriter {
    output: String,
    handle_counter: u64,
}

impl DxfWriter {
    fn new(first_handle: u64) -> Self {
        Self {
            output: String::new(),
            handle_counter: first_handle,
        }
    }

    fn next_handle(&mut self) -> String {
        let handle = format_handle(self.handle_counter);
        self.handle_counter += 1;
        handle
    }

    #[inline]
    fn peek_handle(&self) -> u64 {
        self.handle_counter
    }

    fn pair(&mut self, code: i32, value: impl Display) {
        let _ = write!(self.output, "{code:>3}\n{value}\n");
    }

    fn float(&mut self, code: i32, value: f64) {
        self.pair(code, format_float(value));
    }

    fn point(&mut self, base_code: i32, point: Point2) {
        self.float(base_code, point.x());
        self.float(base_code + 10, point.y());
        self.float(base_code + 20, 0.0);
    }

    fn begin_section(&mut self, name: &str) {
        self.pair(0, "SECTION");
        self.pair(2, name);
    }

    fn end_section(&mut self) {
        self.pair(0, "ENDSEC");
    }

    fn begin_table(&mut self, name: &str, count: usize) -> String {
        let handle = self.next_handle();
        self.pair(0, "TABLE");
        self.pair(2, name);
        self.pair(5, &handle);
        self.pair(330, "0");
        self.pair(100, "AcDbSymbolTable");
        self.pair(70, count);
        if name == "DIMSTYLE" {
            self.pair(100, "AcDbDimStyleTable");
            self.pair(71, 0);
        }
        handle
    }

    fn end_table(&mut self) {
        self.pair(0, "ENDTAB");
    }

    fn begin_record(&mut self, kind: &str, table: &str, subclass: &str) -> String {
        let handle = self.next_handle();
        self.pair(0, kind);
        self.pair(5, &handle);
        self.pair(330, table);
        self.pair(100, "AcDbSymbolTableRecord");
        self.pair(100, subclass);
        handle
    }

    fn begin_entity(&mut self, kind: &str, owner: &str, layer: &str) {
        self.begin_entity_with_space(kind, owner, layer, false);
    }

    fn begin_entity_with_space(&mut self, kind: &str, owner: &str, layer: &str, paper: bool) {
        let handle = self.next_handle();
        self.pair(0, kind);
        self.pair(5, handle);
        self.pair(330, owner);
        self.pair(100, "AcDbEntity");
        if paper {
            self.pair(67, 1);
        }
        self.pair(8, layer);
    }

    /// 追加另一个写入器的内容，并继承其句柄计数。
    fn append(&mut self, other: DxfWriter) {
        self.output.push_str(&other.output);
        self.handle_counter = self.handle_counter.max(other.handle_counter);
    }

    fn finish(mut self) -> String {
        self.pair(0, "EOF");
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_are_printed_in_shortest_readable_form() {
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(-0.0), "0.0");
        assert_eq!(format_float(50.0), "50.0");
        assert_eq!(format_float(-12.0), "-12.0");
        assert_eq!(format_float(2.5), "2.5");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(1e20), "100000000000000000000");
    }

    #[test]
    fn group_codes_are_right_aligned() {
        let mut writer = DxfWriter::new(FIRST_HANDLE);
        writer.pair(0, "SECTION");
        writer.pair(370, -3);
        assert_eq!(writer.output, "  0\nSECTION\n370\n-3\n");
    }

    #[test]
    fn handles_are_sequential_hex() {
        let mut writer = DxfWriter::new(0xE);
        assert_eq!(writer.next_handle(), "E");
        assert_eq!(writer.next_handle(), "F");
        assert_eq!(writer.next_handle(), "10");
        assert_eq!(writer.peek_handle(), 0x11);
    }

    #[test]
    fn text_values_are_single_line_and_escaped_for_legacy_versions() {
        let legacy = DxfEncoder::new(DxfVersion::R2004);
        assert_eq!(legacy.text("A\nB"), "A B");
        assert_eq!(legacy.text("桥"), "\\U+6865");
        let unicode = DxfEncoder::new(DxfVersion::R2010);
        assert_eq!(unicode.text("桥梁"), "桥梁");
    }
}
