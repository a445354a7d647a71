//! # End-to-End Tests for the Tide Chart Binary
//!
//! These tests run service-shaped responses through the whole pipeline:
//! parsing, chart layout, rasterisation and terminal output. No network access
//! is needed; the bodies below mirror what NOAA and sunrise-sunset.org return.

use clap::Parser;
use std::fs;
use tempfile::NamedTempFile;
use tide_chart_lib::{
    chart::{self, ChartGeometry, ChartLayout},
    config::Config,
    display::{AsciiPanel, Panel},
    tide_data::{parse_heights_csv, parse_hilo_json, parse_sun_json},
    TideDay, TideKind,
};

use crate::Args;

const HILO_BODY: &str = r#"{"predictions":[
    {"t":"2022-07-08 03:41","v":"7.912","type":"H"},
    {"t":"2022-07-08 10:02","v":"-1.204","type":"L"},
    {"t":"2022-07-08 17:30","v":"7.105","type":"H"},
    {"t":"2022-07-08 22:15","v":"4.880","type":"L"}
]}"#;

const SUN_BODY: &str = r#"{"results":{
    "sunrise":"2022-07-08T05:20:03-07:00",
    "sunset":"2022-07-08T21:08:44-07:00",
    "solar_noon":"2022-07-08T13:14:24-07:00",
    "day_length":56921
},"status":"OK"}"#;

/// Six-minute heights CSV for one day, one cycle every ~12 h.
fn heights_body(rows: usize) -> String {
    let mut body = String::from("Date Time, Prediction\n");
    for i in 0..rows {
        let minutes = i * 6;
        let height = 3.3 + 4.5 * ((i as f32) * std::f32::consts::TAU / 124.0).cos();
        body.push_str(&format!(
            "2022-07-08 {:02}:{:02},{:.3}\n",
            minutes / 60 % 24,
            minutes % 60,
            height
        ));
    }
    body
}

fn sample_day() -> TideDay {
    let sun = parse_sun_json(SUN_BODY).expect("sun body parses");
    TideDay {
        samples: parse_heights_csv(&heights_body(240), 240).expect("heights parse"),
        events: parse_hilo_json(HILO_BODY).expect("hilo parses"),
        sunrise: sun.sunrise,
        sunset: sun.sunset,
    }
}

/// Responses as served turn into a complete, labelled chart.
#[test]
fn service_responses_render_a_full_chart() {
    let day = sample_day();
    let geometry = ChartGeometry::default();
    let layout = ChartLayout::compute(&geometry, &day).expect("layout");

    assert_eq!(layout.curve.len(), 240);
    assert_eq!(layout.time_labels.len(), 4);
    assert_eq!(
        layout.date_label.as_ref().map(|l| l.text.as_str()),
        Some("7/8")
    );
    assert_eq!(layout.time_labels[0].text, "3:41");
    assert_eq!(layout.time_labels[1].text, "10:02");
    assert_eq!(layout.max_label.text, chart::height_label(7.8));
    assert_eq!(layout.sunrise.index, chart::sun_index(day.sunrise, 240));

    let kinds: Vec<TideKind> = day.events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![TideKind::High, TideKind::Low, TideKind::High, TideKind::Low]
    );

    let image = chart::render(&geometry, &day).expect("render");
    assert_eq!((image.width(), image.height()), (250, 122));
    assert!(image.ink_count() > 1000, "chart should be mostly drawn");
}

/// Extra rows past the end of the day are ignored.
#[test]
fn long_heights_response_is_truncated() {
    let samples = parse_heights_csv(&heights_body(250), 240).expect("heights parse");
    assert_eq!(samples.len(), 240);
}

/// The terminal panel prints one text line per two pixel rows.
#[test]
fn ascii_output_covers_the_whole_image() {
    let image = chart::render(&ChartGeometry::default(), &sample_day()).expect("render");
    let mut panel = AsciiPanel::new(Vec::new());
    panel.render(image).expect("terminal output");

    let text = String::from_utf8(panel.into_inner()).expect("utf-8 output");
    assert_eq!(text.lines().count(), 61);
    assert!(text.lines().all(|line| line.chars().count() <= 250));
    assert!(text.contains('█'));
}

/// A day saved as JSON renders identically after loading.
#[test]
fn saved_day_renders_identically() {
    let day = sample_day();
    let file = NamedTempFile::new().expect("temp file");
    fs::write(file.path(), serde_json::to_vec(&day).expect("serialize")).expect("write");

    let loaded: TideDay =
        serde_json::from_slice(&fs::read(file.path()).expect("read")).expect("deserialize");
    let geometry = ChartGeometry::default();
    assert_eq!(
        chart::render(&geometry, &loaded).expect("render loaded"),
        chart::render(&geometry, &day).expect("render original")
    );
}

/// Geometry read from a config file drives the renderer.
#[test]
fn config_geometry_reaches_renderer() {
    let file = NamedTempFile::new().expect("temp file");
    fs::write(
        file.path(),
        "[display]\nsample_count = 120\nplot_width = 240\n",
    )
    .expect("write config");

    let config = Config::load_from_path(file.path());
    let geometry = ChartGeometry::from(&config.display);
    let mut day = sample_day();
    day.samples.truncate(120);

    let layout = ChartLayout::compute(&geometry, &day).expect("layout");
    assert_eq!(layout.curve.len(), 120);
    // Fewer samples stretch to the same plot width
    assert_eq!(layout.curve[119].x, geometry.sample_x(119));
    assert!(ChartLayout::compute(&ChartGeometry::default(), &day).is_err());
}

#[test]
fn command_line_defaults() {
    let args = Args::try_parse_from(["tide-chart"]).expect("no arguments needed");
    assert!(!args.stdout);
    assert!(!args.debug);
    assert!(args.date.is_none());
    assert_eq!(
        args.config.to_str(),
        Some(tide_chart_lib::config::DEFAULT_CONFIG_PATH)
    );
}

#[test]
fn command_line_date_is_validated() {
    let args = Args::try_parse_from(["tide-chart", "--date", "2022-07-08", "--stdout"])
        .expect("valid date");
    assert_eq!(args.date.map(|d| d.to_string()), Some("2022-07-08".to_string()));
    assert!(args.stdout);

    assert!(Args::try_parse_from(["tide-chart", "--date", "July 8"]).is_err());
}
