use bridgegad_core::document::{DrawingUnits, Entity, TextAlignment};
use bridgegad_core::errors::CoreError;
use bridgegad_core::geometry::Point2;
use bridgegad_core::layer::{LAYER_BRIDGE, LAYER_GRID, LAYER_TEXT};
use bridgegad_engine::params::{
    CapDimensions, DeckDimensions, KerbDimensions, PierDimensions,
};
use bridgegad_engine::{BridgeExportRequest, BridgeParameters, CrossSectionPoint, build};

fn parameters(scale1: f64, lbridge: f64) -> BridgeParameters {
    BridgeParameters {
        scale1,
        datum: 95.0,
        left: 0.0,
        right: lbridge,
        toprl: 120.0,
        skew: 0.0,
        d1: 1.5,
        xincr: 5.0,
        yincr: 1.0,
        nspan: 2,
        deck: DeckDimensions {
            lbridge,
            abtl: 0.0,
            rtl: 110.5,
            sofl: 108.0,
            ccbr: 7.5,
            slbthc: 0.9,
            slbthe: 0.75,
            slbtht: 0.5,
        },
        kerb: KerbDimensions {
            kerbw: 0.25,
            kerbd: 0.3,
        },
        cap: CapDimensions {
            capt: 107.5,
            capb: 106.3,
            capw: 1.2,
        },
        pier: PierDimensions {
            piertw: 1.0,
            battr: 12.0,
            pierst: 10.0,
        },
    }
}

fn profile() -> Vec<CrossSectionPoint> {
    vec![
        CrossSectionPoint::ground(0.0, 10.0),
        CrossSectionPoint::ground(25.0, 12.0),
        CrossSectionPoint::ground(50.0, 9.0),
    ]
}

fn lines_on(document: &bridgegad_core::document::DrawingDocument, layer: &str) -> Vec<(Point2, Point2)> {
    document
        .entities_on(layer)
        .filter_map(|entity| match entity {
            Entity::Line(line) => Some((line.start, line.end)),
            _ => None,
        })
        .collect()
}

#[test]
fn reference_scenario_produces_ground_profile_baseline_and_labels() {
    let document = build(&parameters(100.0, 50.0), &profile()).expect("valid parameters");

    assert_eq!(document.len(), 5);
    assert_eq!(
        lines_on(&document, LAYER_GRID),
        vec![
            (Point2::new(0.0, 10.0), Point2::new(25.0, 12.0)),
            (Point2::new(25.0, 12.0), Point2::new(50.0, 9.0)),
        ]
    );
    assert_eq!(
        lines_on(&document, LAYER_BRIDGE),
        vec![(Point2::new(0.0, 0.0), Point2::new(50.0, 0.0))]
    );

    let texts: Vec<_> = document
        .entities_on(LAYER_TEXT)
        .filter_map(|entity| match entity {
            Entity::Text(text) => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(texts.len(), 2);

    let title = texts[0];
    assert_eq!(title.content, "BRIDGE DRAWING");
    assert_eq!(title.insert, Point2::new(100.0, 290.0));
    assert_eq!(title.height, 5.0);
    assert_eq!(title.alignment, TextAlignment::MiddleCenter);

    let scale = texts[1];
    assert_eq!(scale.content, "Scale: 1:100.0");
    assert_eq!(scale.insert, Point2::new(20.0, 280.0));
    assert_eq!(scale.height, 2.5);
    assert_eq!(scale.alignment, TextAlignment::Left);
}

#[test]
fn entity_count_follows_cross_section_count() {
    let all = profile();
    for n in 0..=all.len() {
        let mut sections = all[..n].to_vec();
        if n == 3 {
            sections.push(CrossSectionPoint::ground(75.0, 8.5));
        }
        let count = sections.len();
        let document = build(&parameters(250.0, 75.0), &sections).expect("valid parameters");
        assert_eq!(document.len(), 2 + 1 + count.saturating_sub(1), "n = {count}");
    }
}

#[test]
fn empty_profile_yields_no_grid_entities() {
    let document = build(&parameters(100.0, 50.0), &[]).expect("valid parameters");
    assert_eq!(document.len(), 3);
    assert_eq!(document.entities_on(LAYER_GRID).count(), 0);
}

#[test]
fn single_point_profile_is_degenerate_not_an_error() {
    let document = build(
        &parameters(100.0, 50.0),
        &[CrossSectionPoint::ground(12.0, 3.0)],
    )
    .expect("single point is allowed");
    assert_eq!(document.len(), 3);
    assert_eq!(document.entities_on(LAYER_GRID).count(), 0);
}

#[test]
fn non_positive_scale_is_rejected() {
    for scale in [0.0, -1.0, -100.0, f64::NAN, f64::NEG_INFINITY] {
        let err = build(&parameters(scale, 50.0), &profile()).unwrap_err();
        assert!(
            matches!(&err, CoreError::InvalidParameter { name, .. } if name == "scale1"),
            "scale {scale} gave {err:?}"
        );
    }
}

#[test]
fn skew_does_not_rotate_geometry() {
    let mut skewed = parameters(100.0, 50.0);
    skewed.skew = 30.0;
    let plain = build(&parameters(100.0, 50.0), &profile()).unwrap();
    let rotated = build(&skewed, &profile()).unwrap();

    let plain_entities: Vec<_> = plain.entities().map(|(_, e)| e.clone()).collect();
    let skewed_entities: Vec<_> = rotated.entities().map(|(_, e)| e.clone()).collect();
    assert_eq!(plain_entities, skewed_entities);
}

#[test]
fn request_builds_with_requested_units() {
    let request = BridgeExportRequest {
        parameters: parameters(50.0, 20.0),
        cross_sections: profile(),
    };
    let document = request
        .build_with_units(DrawingUnits::Millimeters)
        .expect("valid request");
    assert_eq!(document.units(), DrawingUnits::Millimeters);
    assert_eq!(request.build().unwrap().units(), DrawingUnits::Meters);
}

#[test]
fn unordered_chainage_is_passed_through() {
    let sections = vec![
        CrossSectionPoint::ground(30.0, 5.0),
        CrossSectionPoint::ground(10.0, 6.0),
    ];
    let document = build(&parameters(100.0, 50.0), &sections).unwrap();
    assert_eq!(
        lines_on(&document, LAYER_GRID),
        vec![(Point2::new(30.0, 5.0), Point2::new(10.0, 6.0))]
    );
}
