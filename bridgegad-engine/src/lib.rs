pub mod params;

pub use builder::{build, build_with_units};
pub use params::{BridgeExportRequest, BridgeParameters, CrossSectionKind, CrossSectionPoint};

pub mod builder {
    use tracing::{debug, warn};

    use bridgegad_core::document::{DrawingDocument, DrawingUnits, TextAlignment, TextLabel};
    use bridgegad_core::errors::CoreError;
    use bridgegad_core::geometry::Point2;
    use bridgegad_core::layer::{LAYER_BRIDGE, LAYER_GRID, LAYER_TEXT, LayerRegistry};

    use crate::params::{BridgeExportRequest, BridgeParameters, CrossSectionPoint};

    pub const TITLE_TEXT: &str = "BRIDGE DRAWING";
    pub const TITLE_ANCHOR: (f64, f64) = (100.0, 290.0);
    pub const TITLE_HEIGHT: f64 = 5.0;
    pub const SCALE_LABEL_ANCHOR: (f64, f64) = (20.0, 280.0);
    pub const SCALE_LABEL_HEIGHT: f64 = 2.5;
    pub const TEXT_STYLE: &str = "Standard";

    /// 以米为绘图单位构建图纸。
    pub fn build(
        parameters: &BridgeParameters,
        cross_sections: &[CrossSectionPoint],
    ) -> Result<DrawingDocument, CoreError> {
        build_with_units(parameters, cross_sections, DrawingUnits::Meters)
    }

    /// 由桥梁参数与纵断面采样点生成图纸文档。
    ///
    /// 输出实体依次为：标题、比例注记、桥面基准线，以及相邻采样点之间的地面线。
    /// 斜交角不参与几何计算，所有实体都在未旋转的坐标系中布置。
    pub fn build_with_units(
        parameters: &BridgeParameters,
        cross_sections: &[CrossSectionPoint],
        units: DrawingUnits,
    ) -> Result<DrawingDocument, CoreError> {
        validate(parameters)?;
        report_suspicious_input(parameters, cross_sections);

        let mut document = DrawingDocument::new(LayerRegistry::standard(), units);

        document.add_text(
            TextLabel::new(
                Point2::from(TITLE_ANCHOR),
                TITLE_TEXT,
                TITLE_HEIGHT,
                LAYER_TEXT,
            )
            .with_alignment(TextAlignment::MiddleCenter)
            .with_style(TEXT_STYLE),
        )?;
        document.add_text(
            TextLabel::new(
                Point2::from(SCALE_LABEL_ANCHOR),
                scale_label(parameters.scale1),
                SCALE_LABEL_HEIGHT,
                LAYER_TEXT,
            )
            .with_style(TEXT_STYLE),
        )?;

        document.add_line(
            Point2::new(0.0, 0.0),
            Point2::new(parameters.deck.lbridge, 0.0),
            LAYER_BRIDGE,
        )?;

        for pair in cross_sections.windows(2) {
            document.add_line(pair[0].position(), pair[1].position(), LAYER_GRID)?;
        }

        debug!(
            entity_count = document.len(),
            ground_segments = cross_sections.len().saturating_sub(1),
            lbridge = parameters.deck.lbridge,
            "已生成桥梁图纸"
        );
        Ok(document)
    }

    /// `Scale: 1:<scale1>`，比例按浮点数书写：整数比例保留一位小数（`1:100.0`），
    /// 极大或极小的值使用带符号两位指数（`1e+16`）。
    pub fn scale_label(scale: f64) -> String {
        format!("Scale: 1:{}", format_scale(scale))
    }

    fn format_scale(scale: f64) -> String {
        let magnitude = scale.abs();
        if magnitude >= 1e16 || (magnitude != 0.0 && magnitude < 1e-4) {
            let raw = format!("{scale:e}");
            let Some((mantissa, exponent)) = raw.split_once('e') else {
                return raw;
            };
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        } else if scale.fract() == 0.0 {
            format!("{scale:.1}")
        } else {
            format!("{scale}")
        }
    }

    fn validate(parameters: &BridgeParameters) -> Result<(), CoreError> {
        let scale = parameters.scale1;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(CoreError::invalid_parameter(
                "scale1",
                format!("must be a positive number, got {scale}"),
            ));
        }
        Ok(())
    }

    // 只记录警告：其余范围检查属于上游校验阶段。
    fn report_suspicious_input(parameters: &BridgeParameters, cross_sections: &[CrossSectionPoint]) {
        if parameters.right <= parameters.left {
            warn!(
                left = parameters.left,
                right = parameters.right,
                "X 轴终点里程不大于起点里程"
            );
        }
        if let Some(index) = cross_sections
            .windows(2)
            .position(|pair| pair[1].chainage < pair[0].chainage)
        {
            warn!(
                index = index + 1,
                chainage = cross_sections[index + 1].chainage,
                "纵断面采样点未按里程递增排列"
            );
        }
        if parameters.skew != 0.0 {
            debug!(skew = parameters.skew, "斜交角未应用于几何");
        }
    }

    impl BridgeExportRequest {
        pub fn build(&self) -> Result<DrawingDocument, CoreError> {
            build(&self.parameters, &self.cross_sections)
        }

        pub fn build_with_units(&self, units: DrawingUnits) -> Result<DrawingDocument, CoreError> {
            build_with_units(&self.parameters, &self.cross_sections, units)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn scale_label_formats_whole_and_fractional_scales() {
            assert_eq!(scale_label(100.0), "Scale: 1:100.0");
            assert_eq!(scale_label(50.0), "Scale: 1:50.0");
            assert_eq!(scale_label(62.5), "Scale: 1:62.5");
            assert_eq!(scale_label(0.1), "Scale: 1:0.1");
        }

        #[test]
        fn scale_label_uses_signed_exponent_for_extreme_scales() {
            assert_eq!(scale_label(1e16), "Scale: 1:1e+16");
            assert_eq!(scale_label(2.5e-5), "Scale: 1:2.5e-05");
        }
    }
}
