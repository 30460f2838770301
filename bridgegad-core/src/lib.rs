pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，绘图空间与输入参数同单位。
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
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    impl From<(f64, f64)> for Point2 {
        fn from((x, y): (f64, f64)) -> Self {
            Self::new(x, y)
        }
    }

    /// 轴对齐边界框，编码器据此写出 `$EXTMIN/$EXTMAX`。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
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

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        pub fn include_point(&mut self, point: Point2) {
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
    }
}

pub mod errors {
    use thiserror::Error;

    /// 核心层错误。构建与插入阶段尽早失败，不做重试。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum CoreError {
        #[error("invalid parameter `{name}`: {reason}")]
        InvalidParameter { name: String, reason: String },
        #[error("unknown layer: {0}")]
        UnknownLayer(String),
        #[error("layer already defined: {0}")]
        DuplicateLayer(String),
    }

    impl CoreError {
        pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
            Self::InvalidParameter {
                name: name.into(),
                reason: reason.into(),
            }
        }
    }
}

pub mod layer {
    use std::collections::HashMap;

    use serde::{Deserialize, Serialize};

    use crate::errors::CoreError;

    pub const LAYER_DEFAULT: &str = "0";
    pub const LAYER_BRIDGE: &str = "BRIDGE";
    pub const LAYER_DIMENSIONS: &str = "DIMENSIONS";
    pub const LAYER_TEXT: &str = "TEXT";
    pub const LAYER_GRID: &str = "GRID";

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum LineStyle {
        Solid,
        Dashed,
    }

    impl LineStyle {
        /// DXF 线型表中的名称。
        #[inline]
        pub fn linetype_name(self) -> &'static str {
            match self {
                LineStyle::Solid => "Continuous",
                LineStyle::Dashed => "DASHED",
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        pub color_index: i16,
        pub line_style: LineStyle,
    }

    /// 常量图层描述，用于在编译期声明标准图层表。
    #[derive(Debug, Clone, Copy)]
    pub struct LayerSpec {
        pub name: &'static str,
        pub color_index: i16,
        pub line_style: LineStyle,
    }

    /// 标准图层表（定义顺序即图层表输出顺序）。`0` 图层为 CAD 读取端的必备图层。
    pub const STANDARD_LAYERS: [LayerSpec; 5] = [
        LayerSpec {
            name: LAYER_DEFAULT,
            color_index: 7,
            line_style: LineStyle::Solid,
        },
        LayerSpec {
            name: LAYER_BRIDGE,
            color_index: 1,
            line_style: LineStyle::Solid,
        },
        LayerSpec {
            name: LAYER_DIMENSIONS,
            color_index: 5,
            line_style: LineStyle::Solid,
        },
        LayerSpec {
            name: LAYER_TEXT,
            color_index: 3,
            line_style: LineStyle::Solid,
        },
        LayerSpec {
            name: LAYER_GRID,
            color_index: 8,
            line_style: LineStyle::Dashed,
        },
    ];

    /// 图层注册表：按定义顺序保存图层，并以名称建立索引。
    #[derive(Debug, Clone, Default)]
    pub struct LayerRegistry {
        layers: Vec<Layer>,
        index: HashMap<String, usize>,
    }

    impl LayerRegistry {
        pub fn new() -> Self {
            Self::default()
        }

        /// 由 [`STANDARD_LAYERS`] 构建的注册表。
        pub fn standard() -> Self {
            let mut registry = Self::new();
            for spec in &STANDARD_LAYERS {
                registry.push(Layer {
                    name: spec.name.to_string(),
                    color_index: spec.color_index,
                    line_style: spec.line_style,
                });
            }
            registry
        }

        pub fn from_specs(specs: &[LayerSpec]) -> Result<Self, CoreError> {
            let mut registry = Self::new();
            for spec in specs {
                registry.define(spec.name, spec.color_index, spec.line_style)?;
            }
            Ok(registry)
        }

        pub fn define(
            &mut self,
            name: impl Into<String>,
            color_index: i16,
            line_style: LineStyle,
        ) -> Result<&Layer, CoreError> {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(CoreError::invalid_parameter("layer.name", "must not be empty"));
            }
            if !(1..=255).contains(&color_index) {
                return Err(CoreError::invalid_parameter(
                    "layer.color_index",
                    format!("{color_index} is outside 1..=255"),
                ));
            }
            if self.index.contains_key(&name) {
                return Err(CoreError::DuplicateLayer(name));
            }
            let position = self.push(Layer {
                name,
                color_index,
                line_style,
            });
            Ok(&self.layers[position])
        }

        pub fn resolve(&self, name: &str) -> Result<&Layer, CoreError> {
            self.index
                .get(name)
                .map(|&position| &self.layers[position])
                .ok_or_else(|| CoreError::UnknownLayer(name.to_string()))
        }

        #[inline]
        pub fn contains(&self, name: &str) -> bool {
            self.index.contains_key(name)
        }

        #[inline]
        pub fn iter(&self) -> impl Iterator<Item = &Layer> {
            self.layers.iter()
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.layers.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.layers.is_empty()
        }

        pub fn uses_line_style(&self, style: LineStyle) -> bool {
            self.layers.iter().any(|layer| layer.line_style == style)
        }

        fn push(&mut self, layer: Layer) -> usize {
            let position = self.layers.len();
            self.index.insert(layer.name.clone(), position);
            self.layers.push(layer);
            position
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn standard_registry_keeps_definition_order() {
            let registry = LayerRegistry::standard();
            let names: Vec<_> = registry.iter().map(|l| l.name.as_str()).collect();
            assert_eq!(names, ["0", "BRIDGE", "DIMENSIONS", "TEXT", "GRID"]);

            let grid = registry.resolve(LAYER_GRID).expect("GRID is standard");
            assert_eq!(grid.color_index, 8);
            assert_eq!(grid.line_style, LineStyle::Dashed);
            assert_eq!(registry.resolve(LAYER_BRIDGE).unwrap().color_index, 1);
            assert_eq!(registry.resolve(LAYER_TEXT).unwrap().color_index, 3);
            assert_eq!(registry.resolve(LAYER_DIMENSIONS).unwrap().color_index, 5);
        }

        #[test]
        fn resolve_unknown_layer_fails() {
            let registry = LayerRegistry::standard();
            let err = registry.resolve("ANNOT").unwrap_err();
            assert_eq!(err, CoreError::UnknownLayer("ANNOT".to_string()));
        }

        #[test]
        fn define_rejects_duplicates_and_bad_colors() {
            let mut registry = LayerRegistry::new();
            registry
                .define("PIER", 4, LineStyle::Solid)
                .expect("first definition");
            assert!(matches!(
                registry.define("PIER", 2, LineStyle::Dashed),
                Err(CoreError::DuplicateLayer(name)) if name == "PIER"
            ));
            assert!(matches!(
                registry.define("CAP", 0, LineStyle::Solid),
                Err(CoreError::InvalidParameter { .. })
            ));
            assert!(matches!(
                registry.define("  ", 3, LineStyle::Solid),
                Err(CoreError::InvalidParameter { .. })
            ));
            assert_eq!(registry.len(), 1);
        }

        #[test]
        fn from_specs_matches_standard() {
            let built = LayerRegistry::from_specs(&STANDARD_LAYERS).expect("valid specs");
            let standard = LayerRegistry::standard();
            assert!(built.iter().eq(standard.iter()));
            assert!(standard.uses_line_style(LineStyle::Dashed));
        }
    }
}

pub mod document {
    use serde::{Deserialize, Serialize};

    use crate::errors::CoreError;
    use crate::geometry::{Bounds2D, Point2};
    use crate::layer::LayerRegistry;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    /// 绘图单位标签，对应 DXF `$INSUNITS`。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum DrawingUnits {
        Unitless,
        Inches,
        Feet,
        Millimeters,
        Centimeters,
        #[default]
        Meters,
    }

    impl DrawingUnits {
        #[inline]
        pub fn insunits_code(self) -> i16 {
            match self {
                DrawingUnits::Unitless => 0,
                DrawingUnits::Inches => 1,
                DrawingUnits::Feet => 2,
                DrawingUnits::Millimeters => 4,
                DrawingUnits::Centimeters => 5,
                DrawingUnits::Meters => 6,
            }
        }

        pub fn from_insunits_code(code: i16) -> Option<Self> {
            match code {
                0 => Some(DrawingUnits::Unitless),
                1 => Some(DrawingUnits::Inches),
                2 => Some(DrawingUnits::Feet),
                4 => Some(DrawingUnits::Millimeters),
                5 => Some(DrawingUnits::Centimeters),
                6 => Some(DrawingUnits::Meters),
                _ => None,
            }
        }

        #[inline]
        pub fn is_metric(self) -> bool {
            matches!(
                self,
                DrawingUnits::Millimeters | DrawingUnits::Centimeters | DrawingUnits::Meters
            )
        }
    }

    /// 单点文字对齐方式。除 `Left` 外，渲染端都以第二对齐点定位字形。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub enum TextAlignment {
        #[default]
        Left,
        Center,
        Right,
        Middle,
        BottomLeft,
        BottomCenter,
        BottomRight,
        MiddleLeft,
        MiddleCenter,
        MiddleRight,
        TopLeft,
        TopCenter,
        TopRight,
    }

    impl TextAlignment {
        /// 返回 (水平, 垂直) 对齐码，即 DXF 组码 72 / 73 的取值。
        pub fn justification(self) -> (i16, i16) {
            match self {
                TextAlignment::Left => (0, 0),
                TextAlignment::Center => (1, 0),
                TextAlignment::Right => (2, 0),
                TextAlignment::Middle => (4, 0),
                TextAlignment::BottomLeft => (0, 1),
                TextAlignment::BottomCenter => (1, 1),
                TextAlignment::BottomRight => (2, 1),
                TextAlignment::MiddleLeft => (0, 2),
                TextAlignment::MiddleCenter => (1, 2),
                TextAlignment::MiddleRight => (2, 2),
                TextAlignment::TopLeft => (0, 3),
                TextAlignment::TopCenter => (1, 3),
                TextAlignment::TopRight => (2, 3),
            }
        }

        pub fn from_justification(horizontal: i16, vertical: i16) -> Option<Self> {
            let alignment = match (horizontal, vertical) {
                (0, 0) => TextAlignment::Left,
                (1, 0) => TextAlignment::Center,
                (2, 0) => TextAlignment::Right,
                (4, 0) => TextAlignment::Middle,
                (0, 1) => TextAlignment::BottomLeft,
                (1, 1) => TextAlignment::BottomCenter,
                (2, 1) => TextAlignment::BottomRight,
                (0, 2) => TextAlignment::MiddleLeft,
                (1, 2) => TextAlignment::MiddleCenter,
                (2, 2) => TextAlignment::MiddleRight,
                (0, 3) => TextAlignment::TopLeft,
                (1, 3) => TextAlignment::TopCenter,
                (2, 3) => TextAlignment::TopRight,
                _ => return None,
            };
            Some(alignment)
        }

        #[inline]
        pub fn is_default(self) -> bool {
            self == TextAlignment::Left
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct TextLabel {
        pub insert: Point2,
        pub content: String,
        pub height: f64,
        pub alignment: TextAlignment,
        pub style: Option<String>,
        pub layer: String,
    }

    impl TextLabel {
        pub fn new(
            insert: Point2,
            content: impl Into<String>,
            height: f64,
            layer: impl Into<String>,
        ) -> Self {
            Self {
                insert,
                content: content.into(),
                height,
                alignment: TextAlignment::default(),
                style: None,
                layer: layer.into(),
            }
        }

        #[must_use]
        pub fn with_alignment(mut self, alignment: TextAlignment) -> Self {
            self.alignment = alignment;
            self
        }

        #[must_use]
        pub fn with_style(mut self, style: impl Into<String>) -> Self {
            self.style = Some(style.into());
            self
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct LineSegment {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<Point2>,
        pub closed: bool,
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Entity {
        Text(TextLabel),
        Line(LineSegment),
        Polyline(Polyline),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Text(text) => &text.layer,
                Entity::Line(line) => &line.layer,
                Entity::Polyline(polyline) => &polyline.layer,
            }
        }

        #[inline]
        pub fn kind_name(&self) -> &'static str {
            match self {
                Entity::Text(_) => "TextLabel",
                Entity::Line(_) => "LineSegment",
                Entity::Polyline(_) => "Polyline",
            }
        }

        /// 实体的 2D 范围，文字退化为插入点。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            match self {
                Entity::Text(text) => bounds.include_point(text.insert),
                Entity::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                Entity::Polyline(polyline) => {
                    for vertex in &polyline.vertices {
                        bounds.include_point(*vertex);
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

    /// 一次导出请求对应的图纸文档，只允许追加实体。
    #[derive(Debug, Clone)]
    pub struct DrawingDocument {
        layers: LayerRegistry,
        entities: Vec<(EntityId, Entity)>,
        units: DrawingUnits,
        next_entity_id: u64,
    }

    impl DrawingDocument {
        pub fn new(layers: LayerRegistry, units: DrawingUnits) -> Self {
            Self {
                layers,
                entities: Vec::new(),
                units,
                next_entity_id: 0,
            }
        }

        /// 标准图层表 + 米制单位。
        pub fn standard() -> Self {
            Self::new(LayerRegistry::standard(), DrawingUnits::Meters)
        }

        /// 追加实体；图层必须已在注册表中声明。
        pub fn add_entity(&mut self, entity: Entity) -> Result<EntityId, CoreError> {
            self.layers.resolve(entity.layer_name())?;
            let id = self.next_id();
            self.entities.push((id, entity));
            Ok(id)
        }

        pub fn add_line(
            &mut self,
            start: Point2,
            end: Point2,
            layer: impl Into<String>,
        ) -> Result<EntityId, CoreError> {
            self.add_entity(Entity::Line(LineSegment {
                start,
                end,
                layer: layer.into(),
            }))
        }

        pub fn add_text(&mut self, label: TextLabel) -> Result<EntityId, CoreError> {
            self.add_entity(Entity::Text(label))
        }

        pub fn add_polyline(
            &mut self,
            vertices: impl IntoIterator<Item = Point2>,
            closed: bool,
            layer: impl Into<String>,
        ) -> Result<EntityId, CoreError> {
            self.add_entity(Entity::Polyline(Polyline {
                vertices: vertices.into_iter().collect(),
                closed,
                layer: layer.into(),
            }))
        }

        #[inline]
        pub fn layers(&self) -> &LayerRegistry {
            &self.layers
        }

        #[inline]
        pub fn units(&self) -> DrawingUnits {
            self.units
        }

        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = &(EntityId, Entity)> {
            self.entities.iter()
        }

        /// 按插入顺序返回指定图层上的实体。
        pub fn entities_on<'a>(&'a self, layer: &'a str) -> impl Iterator<Item = &'a Entity> + 'a {
            self.entities
                .iter()
                .map(|(_, entity)| entity)
                .filter(move |entity| entity.layer_name() == layer)
        }

        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.entities
                .iter()
                .find(|(entity_id, _)| *entity_id == id)
                .map(|(_, entity)| entity)
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entities.is_empty()
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            let mut has = false;
            for (_, entity) in &self.entities {
                if let Some(entity_bounds) = entity.bounds() {
                    bounds.include_bounds(&entity_bounds);
                    has = true;
                }
            }
            if has { Some(bounds) } else { None }
        }

        #[inline]
        fn next_id(&mut self) -> EntityId {
            let id = self.next_entity_id;
            self.next_entity_id += 1;
            EntityId(id)
        }
    }

    impl Default for DrawingDocument {
        fn default() -> Self {
            Self::standard()
        }
    }

}
