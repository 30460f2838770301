use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use bridgegad_core::geometry::Point2;

/// 桥梁参数。JSON 保持扁平结构，结构尺寸在 Rust 侧按构件分组。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeParameters {
    /// 平面与立面图的比例分母。
    pub scale1: f64,
    pub datum: f64,
    /// X 轴起止里程。
    pub left: f64,
    pub right: f64,
    /// Y 轴顶部标高。
    pub toprl: f64,
    /// 斜交角（度），目前不参与几何计算。
    pub skew: f64,
    pub d1: f64,
    pub xincr: f64,
    pub yincr: f64,
    /// 跨数。接受任意整数以及整值浮点（`2.0`），不做范围检查。
    #[serde(deserialize_with = "deserialize_whole_number")]
    pub nspan: i64,
    #[serde(flatten)]
    pub deck: DeckDimensions,
    #[serde(flatten)]
    pub kerb: KerbDimensions,
    #[serde(flatten)]
    pub cap: CapDimensions,
    #[serde(flatten)]
    pub pier: PierDimensions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckDimensions {
    /// 桥梁全长。
    pub lbridge: f64,
    pub abtl: f64,
    #[serde(rename = "RTL")]
    pub rtl: f64,
    pub sofl: f64,
    pub ccbr: f64,
    pub slbthc: f64,
    pub slbthe: f64,
    pub slbtht: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KerbDimensions {
    pub kerbw: f64,
    pub kerbd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapDimensions {
    pub capt: f64,
    pub capb: f64,
    pub capw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PierDimensions {
    pub piertw: f64,
    pub battr: f64,
    pub pierst: f64,
}

/// 断面点类型。只区分地面线与其他类型：非 `Ground` 的原始字符串（如 `"Bed"`）
/// 不会保留，序列化时统一写回 `"Other"`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CrossSectionKind {
    #[default]
    Ground,
    Other,
}

impl From<String> for CrossSectionKind {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("ground") {
            CrossSectionKind::Ground
        } else {
            CrossSectionKind::Other
        }
    }
}

impl From<CrossSectionKind> for String {
    fn from(value: CrossSectionKind) -> Self {
        match value {
            CrossSectionKind::Ground => "Ground".to_string(),
            CrossSectionKind::Other => "Other".to_string(),
        }
    }
}

/// 纵断面采样点，按里程递增排列。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossSectionPoint {
    pub chainage: f64,
    pub level: f64,
    #[serde(rename = "type", default)]
    pub kind: CrossSectionKind,
}

impl CrossSectionPoint {
    #[inline]
    pub fn ground(chainage: f64, level: f64) -> Self {
        Self {
            chainage,
            level,
            kind: CrossSectionKind::Ground,
        }
    }

    /// 绘图空间坐标：里程为 X，标高为 Y，不做单位换算。
    #[inline]
    pub fn position(&self) -> Point2 {
        Point2::new(self.chainage, self.level)
    }
}

/// 导出服务接收的请求体。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeExportRequest {
    pub parameters: BridgeParameters,
    /// 必填字段；空数组合法。
    pub cross_sections: Vec<CrossSectionPoint>,
}

fn deserialize_whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct WholeNumber;

    impl Visitor<'_> for WholeNumber {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer or a float without fractional part")
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<i64, E> {
            Ok(value)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<i64, E> {
            i64::try_from(value)
                .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<i64, E> {
            let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
            if value.is_finite() && value.fract() == 0.0 && in_range {
                Ok(value as i64)
            } else {
                Err(E::invalid_value(de::Unexpected::Float(value), &self))
            }
        }
    }

    deserializer.deserialize_any(WholeNumber)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> serde_json::Value {
        json!({
            "parameters": {
                "scale1": 100, "datum": 95.0, "left": 0.0, "right": 50.0,
                "toprl": 120.0, "skew": 15.0, "d1": 1.5, "xincr": 5.0, "yincr": 1.0,
                "nspan": 2, "lbridge": 50.0, "abtl": 0.0, "RTL": 110.5,
                "sofl": 108.0, "kerbw": 0.25, "kerbd": 0.3, "ccbr": 7.5,
                "slbthc": 0.9, "slbthe": 0.75, "slbtht": 0.5, "capt": 107.5,
                "capb": 106.3, "capw": 1.2, "piertw": 1.0, "battr": 12.0,
                "pierst": 10.0
            },
            "crossSections": [
                { "chainage": 0.0, "level": 10.0 },
                { "chainage": 25.0, "level": 12.0, "type": "Ground" },
                { "chainage": 50.0, "level": 9.0, "type": "Bed" }
            ]
        })
    }

    #[test]
    fn request_deserializes_from_flat_json() {
        let request: BridgeExportRequest =
            serde_json::from_value(payload()).expect("payload matches schema");
        let params = &request.parameters;
        assert_eq!(params.scale1, 100.0);
        assert_eq!(params.nspan, 2);
        assert_eq!(params.deck.lbridge, 50.0);
        assert_eq!(params.deck.rtl, 110.5);
        assert_eq!(params.kerb.kerbd, 0.3);
        assert_eq!(params.cap.capw, 1.2);
        assert_eq!(params.pier.battr, 12.0);

        let kinds: Vec<_> = request.cross_sections.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            [
                CrossSectionKind::Ground,
                CrossSectionKind::Ground,
                CrossSectionKind::Other
            ]
        );
        assert_eq!(request.cross_sections[1].position(), Point2::new(25.0, 12.0));
    }

    #[test]
    fn serialized_parameters_keep_wire_names() {
        let request: BridgeExportRequest = serde_json::from_value(payload()).unwrap();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["parameters"]["RTL"], json!(110.5));
        assert_eq!(value["parameters"]["lbridge"], json!(50.0));
        assert!(value["parameters"].get("deck").is_none());
        assert_eq!(value["crossSections"][2]["type"], json!("Other"));
    }

    #[test]
    fn cross_sections_field_is_required() {
        let mut value = payload();
        value.as_object_mut().unwrap().remove("crossSections");
        let err = serde_json::from_value::<BridgeExportRequest>(value).unwrap_err();
        assert!(err.to_string().contains("crossSections"), "{err}");

        let mut value = payload();
        value["crossSections"] = json!([]);
        let request: BridgeExportRequest = serde_json::from_value(value).unwrap();
        assert!(request.cross_sections.is_empty());
    }

    #[test]
    fn nspan_accepts_negative_and_whole_float_values() {
        for (raw, expected) in [(json!(-3), -3), (json!(2.0), 2), (json!(4), 4)] {
            let mut value = payload();
            value["parameters"]["nspan"] = raw;
            let request: BridgeExportRequest = serde_json::from_value(value).unwrap();
            assert_eq!(request.parameters.nspan, expected);
        }

        let mut value = payload();
        value["parameters"]["nspan"] = json!(2.5);
        assert!(serde_json::from_value::<BridgeExportRequest>(value).is_err());
    }

    #[test]
    fn other_cross_section_kinds_collapse_to_other() {
        let point: CrossSectionPoint =
            serde_json::from_value(json!({ "chainage": 1.0, "level": 2.0, "type": "Bed" }))
                .unwrap();
        assert_eq!(point.kind, CrossSectionKind::Other);
        assert_eq!(serde_json::to_value(point).unwrap()["type"], json!("Other"));
    }
}
