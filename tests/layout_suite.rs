use std::path::{Path, PathBuf};

use alluvial_rs::{
    FlowDataSource, FlowDataset, FlowLayout, FlowStyle, GradientStyle, IngroupScope, IngroupStyle,
    LayoutOptions, RenderConfig, render_svg,
};

const EPS: f32 = 1e-4;

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_fixture(name: &str) -> FlowDataset {
    FlowDataset::from_path(&fixture_path(name)).expect("fixture read failed")
}

fn assert_valid_svg(svg: &str, fixture: &str) {
    assert!(svg.contains("<svg"), "{fixture}: missing <svg tag");
    assert!(svg.contains("</svg>"), "{fixture}: missing </svg tag");
}

#[test]
fn render_all_fixtures() {
    // Keep this list explicit so new fixtures must be added intentionally.
    let candidates = [
        "basic.json",
        "sparse.json",
        "single_step.json",
        "overcommitted.json",
    ];

    for name in candidates {
        let path = fixture_path(name);
        assert!(path.exists(), "fixture missing: {}", name);
        let dataset = load_fixture(name);
        let layout = FlowLayout::new(&dataset, &LayoutOptions::default())
            .unwrap_or_else(|err| panic!("{name}: layout failed: {err}"));

        let highlight = dataset.nodes().first().cloned().into_iter().collect::<Vec<_>>();
        let styles = [
            FlowStyle::default(),
            FlowStyle::Ingroup(IngroupStyle::new(highlight, IngroupScope::AllFlow)),
            FlowStyle::Gradient(GradientStyle::new(dataset.nodes())),
        ];
        for style in styles {
            let svg = render_svg(&layout, &style, &RenderConfig::default());
            assert_valid_svg(&svg, name);
        }
    }
}

#[test]
fn basic_fixture_geometry() {
    let dataset = load_fixture("basic.json");
    let layout = FlowLayout::new(&dataset, &LayoutOptions::default()).expect("layout failed");

    let a = layout.outgoing("1", "A").expect("port missing");
    let b = layout.outgoing("1", "B").expect("port missing");
    let c = layout.outgoing("1", "C").expect("port missing");
    assert!((a.y1 - 0.0).abs() < EPS && (a.y2 - 10.0).abs() < EPS);
    assert!((b.y1 - 60.0).abs() < EPS && (b.y2 - 70.0).abs() < EPS);
    assert!((c.y1 - 120.0).abs() < EPS && (c.y2 - 130.0).abs() < EPS);
    assert!((layout.max_y() - 180.0).abs() < EPS);

    // B absorbs 5 + 10 + 5 across the first transition.
    let b_in = layout.incoming("2", "B").expect("port missing");
    assert!((b_in.height() - 20.0).abs() < EPS);
}

#[test]
fn sparse_fixture_tolerates_missing_entries() {
    let dataset = load_fixture("sparse.json");
    let layout = FlowLayout::new(&dataset, &LayoutOptions::default()).expect("layout failed");

    // west never appears anywhere: every port it owns is flat.
    for step in layout.steps() {
        if let Some(port) = layout.outgoing(step, "west") {
            assert!(port.height().abs() < EPS);
        }
        if let Some(port) = layout.incoming(step, "west") {
            assert!(port.height().abs() < EPS);
        }
    }

    // south is gone by 2015-02; its mass resurfaces in east's inflow.
    let south = layout.outgoing("2015-02", "south").expect("port missing");
    assert!(south.height().abs() < EPS);
    let east_in = layout.incoming("2015-02", "east").expect("port missing");
    assert!((east_in.height() - 4.0).abs() < EPS);

    let svg = render_svg(&layout, &FlowStyle::default(), &RenderConfig::default());
    assert_valid_svg(&svg, "sparse.json");
}

#[test]
fn single_step_fixture_has_no_transitions() {
    let dataset = load_fixture("single_step.json");
    let layout = FlowLayout::new(&dataset, &LayoutOptions::default()).expect("layout failed");
    assert!((layout.max_y() - 0.0).abs() < EPS);
    assert!(layout.outgoing("only", "A").is_none());
    assert!(layout.incoming("only", "A").is_none());

    let svg = render_svg(&layout, &FlowStyle::default(), &RenderConfig::default());
    assert_valid_svg(&svg, "single_step.json");
}

#[test]
fn overcommitted_fixture_is_drawn_without_clamping() {
    let dataset = load_fixture("overcommitted.json");
    let layout = FlowLayout::new(&dataset, &LayoutOptions::default()).expect("layout failed");

    // 8 + 6 leave a node of size 10: the port keeps its own mass and the
    // surplus spills past its lower edge.
    let a = layout.outgoing("1", "A").expect("port missing");
    assert!((a.height() - 10.0).abs() < EPS);
    let spill = layout.band("1", "A", "B").expect("band missing");
    assert!(spill.source_y.expect("center missing") + spill.size / 2.0 > a.y2 + EPS);

    let svg = render_svg(&layout, &FlowStyle::default(), &RenderConfig::default());
    assert_valid_svg(&svg, "overcommitted.json");
}

#[test]
fn non_compact_fixture_keeps_column_footprints() {
    let dataset = load_fixture("basic.json");
    let options = LayoutOptions {
        compact: false,
        ..Default::default()
    };
    let layout = FlowLayout::new(&dataset, &options).expect("layout failed");

    // Footprint starts are identical on both sides of every interior step.
    for node in layout.nodes() {
        let out_start = layout.outgoing("2", node).expect("port missing").y1;
        let in_start = layout.incoming("2", node).expect("port missing").y1;
        assert!((out_start - in_start).abs() < EPS);
    }
    assert!((layout.max_y() - 190.0).abs() < EPS);
}
