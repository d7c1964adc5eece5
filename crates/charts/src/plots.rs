use crate::ChartError;
use chrono::NaiveDate;
use fxta_core::{AnalysisFrame, BB_LOWER_COLUMN, BB_UPPER_COLUMN, CCI_COLUMN};
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::Path;

const SIZE: (u32, u32) = (1200, 600);

// matplotlib's default cycle, so the charts read like the familiar ones
const C0: RGBColor = RGBColor(31, 119, 180);
const C1: RGBColor = RGBColor(255, 127, 14);
const C2: RGBColor = RGBColor(44, 160, 44);
const C3: RGBColor = RGBColor(214, 39, 40);
const PURPLE: RGBColor = RGBColor(128, 0, 128);
const LIGHT_GREY: RGBColor = RGBColor(211, 211, 211);

const CCI_REFERENCE: f64 = 100.0;

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn render_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Render(e.to_string())
}

fn to_f64(values: &[Option<Decimal>]) -> Vec<Option<f64>> {
    values.iter().map(|v| v.and_then(|d| d.to_f64())).collect()
}

fn column_f64(frame: &AnalysisFrame, name: &str) -> Result<Vec<Option<f64>>, ChartError> {
    frame
        .column(name)
        .map(to_f64)
        .ok_or_else(|| ChartError::MissingColumn(name.to_string()))
}

fn closes_f64(frame: &AnalysisFrame) -> Vec<Option<f64>> {
    frame.closes().iter().map(|d| d.to_f64()).collect()
}

/// Split a column into runs of consecutive defined points.
fn segments(values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (i, v) in values.iter().enumerate() {
        match v {
            Some(y) if y.is_finite() => current.push((i as f64, *y)),
            _ => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Padded y-range covering every defined value and `extra`.
fn y_range<'a>(columns: impl IntoIterator<Item = &'a [Option<f64>]>, extra: &[f64]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    let defined = columns
        .into_iter()
        .flat_map(|c| c.iter().flatten().copied())
        .chain(extra.iter().copied())
        .filter(|v| v.is_finite());
    for v in defined {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { lo.abs().max(1.0) * 0.05 };
    (lo - pad, hi + pad)
}

fn date_label(dates: &[NaiveDate], x: f64) -> String {
    if x < 0.0 {
        return String::new();
    }
    dates
        .get(x.round() as usize)
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

fn ensure_parent(path: &Path) -> Result<(), ChartError> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => std::fs::create_dir_all(parent).map_err(|source| ChartError::Io {
            path: parent.to_path_buf(),
            source,
        }),
        None => Ok(()),
    }
}

fn build_chart<'a, DB: DrawingBackend>(
    root: &'a DrawingArea<DB, plotters::coord::Shift>,
    title: &str,
    dates: &[NaiveDate],
    y_desc: &str,
    y: (f64, f64),
) -> Result<Chart<'a, DB>, ChartError> {
    let x_max = dates.len().saturating_sub(1).max(1) as f64;
    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..x_max, y.0..y.1)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc(y_desc)
        .x_labels(10)
        .x_label_formatter(&|x| date_label(dates, *x))
        .light_line_style(RGBColor(235, 235, 235))
        .draw()
        .map_err(render_err)?;

    Ok(chart)
}

/// Draw a column as a labelled line, broken wherever a value is missing.
fn draw_line<DB: DrawingBackend>(
    chart: &mut Chart<'_, DB>,
    values: &[Option<f64>],
    label: &str,
    style: ShapeStyle,
    dashed: bool,
) -> Result<(), ChartError> {
    let mut runs = segments(values);
    if runs.is_empty() {
        // keep the legend entry even when nothing is defined
        runs.push(Vec::new());
    }
    for (i, run) in runs.into_iter().enumerate() {
        let anno = if dashed {
            chart
                .draw_series(DashedLineSeries::new(run, 10, 6, style))
                .map_err(render_err)?
        } else {
            chart
                .draw_series(LineSeries::new(run, style))
                .map_err(render_err)?
        };
        if i == 0 {
            anno.label(label).legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], style)
            });
        }
    }
    Ok(())
}

fn finish<'a, DB: DrawingBackend + 'a>(
    chart: &mut Chart<'a, DB>,
    root: &DrawingArea<DB, plotters::coord::Shift>,
) -> Result<(), ChartError> {
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_err)?;
    root.present().map_err(render_err)
}

/// Close price with the moving-average columns in `lines` (`(column, label)`).
pub fn plot_moving_average(
    frame: &AnalysisFrame,
    path: &Path,
    lines: &[(&str, String)],
) -> Result<(), ChartError> {
    let close = closes_f64(frame);
    let series = lines
        .iter()
        .map(|(column, label)| column_f64(frame, column).map(|v| (v, label.as_str())))
        .collect::<Result<Vec<_>, _>>()?;

    ensure_parent(path)?;
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let range = y_range(
        std::iter::once(close.as_slice()).chain(series.iter().map(|(v, _)| v.as_slice())),
        &[],
    );
    let mut chart = build_chart(&root, "Moving Average", frame.dates(), "Price", range)?;

    draw_line(&mut chart, &close, "Close Price", C0.stroke_width(2), false)?;
    for ((values, label), color) in series.iter().zip([C1, C2, C3]) {
        draw_line(&mut chart, values, label, color.stroke_width(2), false)?;
    }
    finish(&mut chart, &root)
}

/// Close price, middle band, dashed outer bands and the shaded envelope between them.
pub fn plot_bollinger_bands(
    frame: &AnalysisFrame,
    path: &Path,
    middle_column: &str,
    window: usize,
) -> Result<(), ChartError> {
    let close = closes_f64(frame);
    let middle = column_f64(frame, middle_column)?;
    let upper = column_f64(frame, BB_UPPER_COLUMN)?;
    let lower = column_f64(frame, BB_LOWER_COLUMN)?;

    ensure_parent(path)?;
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let range = y_range([close.as_slice(), upper.as_slice(), lower.as_slice()], &[]);
    let mut chart = build_chart(&root, "Bollinger Bands", frame.dates(), "Price", range)?;

    // envelope first so the lines sit on top of it
    let envelope: Vec<Option<(f64, f64)>> = upper
        .iter()
        .zip(&lower)
        .map(|(u, l)| u.zip(*l))
        .collect();
    let mut start = 0;
    while start < envelope.len() {
        if envelope[start].is_none() {
            start += 1;
            continue;
        }
        let end = envelope[start..]
            .iter()
            .position(Option::is_none)
            .map_or(envelope.len(), |p| start + p);
        let run: Vec<(usize, (f64, f64))> = (start..end)
            .filter_map(|i| envelope[i].map(|b| (i, b)))
            .collect();
        let mut outline: Vec<(f64, f64)> = run.iter().map(|(i, (u, _))| (*i as f64, *u)).collect();
        outline.extend(run.iter().rev().map(|(i, (_, l))| (*i as f64, *l)));
        chart
            .draw_series(std::iter::once(Polygon::new(outline, LIGHT_GREY.mix(0.5).filled())))
            .map_err(render_err)?;
        start = end;
    }

    draw_line(&mut chart, &close, "Close Price", C0.stroke_width(2), false)?;
    let mid_label = format!("{}-Day MA (Middle Band)", window);
    draw_line(&mut chart, &middle, &mid_label, C1.stroke_width(2), false)?;
    draw_line(&mut chart, &upper, "Upper Band", C2.stroke_width(1), true)?;
    draw_line(&mut chart, &lower, "Lower Band", C3.stroke_width(1), true)?;
    finish(&mut chart, &root)
}

/// CCI line with dashed reference lines at +100 and -100.
pub fn plot_cci(frame: &AnalysisFrame, path: &Path) -> Result<(), ChartError> {
    let cci = column_f64(frame, CCI_COLUMN)?;

    ensure_parent(path)?;
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let range = y_range([cci.as_slice()], &[CCI_REFERENCE, -CCI_REFERENCE]);
    let mut chart = build_chart(
        &root,
        "Commodity Channel Index (CCI)",
        frame.dates(),
        "CCI Value",
        range,
    )?;

    draw_line(&mut chart, &cci, "CCI", PURPLE.stroke_width(2), false)?;

    let x_max = frame.len().saturating_sub(1).max(1) as f64;
    for (level, color) in [(CCI_REFERENCE, RED), (-CCI_REFERENCE, GREEN)] {
        chart
            .draw_series(DashedLineSeries::new(
                vec![(0.0, level), (x_max, level)],
                10,
                6,
                color.stroke_width(1),
            ))
            .map_err(render_err)?;
    }
    finish(&mut chart, &root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxta_core::{PricePoint, PriceSeries};
    use rust_decimal_macros::dec;

    fn temp_svg(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("fxta-charts-{}-{}", std::process::id(), name))
    }

    fn frame() -> AnalysisFrame {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let closes = [dec!(90.1), dec!(90.4), dec!(89.9), dec!(90.8), dec!(91.2)];
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, c)| PricePoint::new(start + chrono::Days::new(i as u64), *c))
            .collect();
        let mut frame = AnalysisFrame::from_series(&PriceSeries::new("EURINR=X", points));
        frame
            .insert_column("MA_3", vec![None, None, Some(dec!(90.13)), Some(dec!(90.37)), Some(dec!(90.63))])
            .unwrap();
        frame
            .insert_column(BB_UPPER_COLUMN, vec![None, None, Some(dec!(90.6)), Some(dec!(91.3)), Some(dec!(91.6))])
            .unwrap();
        frame
            .insert_column(BB_LOWER_COLUMN, vec![None, None, Some(dec!(89.7)), Some(dec!(89.4)), Some(dec!(89.6))])
            .unwrap();
        frame
            .insert_column(CCI_COLUMN, vec![None, None, Some(dec!(-40)), Some(dec!(120)), None])
            .unwrap();
        frame
    }

    #[test]
    fn test_segments_break_on_gaps() {
        let runs = segments(&[None, Some(1.0), Some(2.0), None, Some(3.0)]);
        assert_eq!(runs, vec![vec![(1.0, 1.0), (2.0, 2.0)], vec![(4.0, 3.0)]]);
        assert!(segments(&[None, None]).is_empty());
    }

    #[test]
    fn test_y_range_pads_and_handles_flat_series() {
        let (lo, hi) = y_range([[Some(10.0), None, Some(20.0)].as_slice()], &[]);
        assert!(lo < 10.0 && hi > 20.0);
        let (lo, hi) = y_range([[Some(10.0), Some(10.0)].as_slice()], &[]);
        assert!(lo < 10.0 && hi > 10.0);
        assert_eq!(y_range([[None].as_slice()], &[]), (0.0, 1.0));
        let (lo, hi) = y_range([[None].as_slice()], &[100.0, -100.0]);
        assert!(lo < -100.0 && hi > 100.0);
    }

    #[test]
    fn test_plots_write_svg_files() {
        let frame = frame();
        let ma = temp_svg("ma.svg");
        let bb = temp_svg("bb.svg");
        let cci = temp_svg("cci.svg");

        plot_moving_average(&frame, &ma, &[("MA_3", "3-Day MA".to_string())]).unwrap();
        plot_bollinger_bands(&frame, &bb, "MA_3", 3).unwrap();
        plot_cci(&frame, &cci).unwrap();

        for path in [&ma, &bb, &cci] {
            let svg = std::fs::read_to_string(path).unwrap();
            std::fs::remove_file(path).ok();
            assert!(svg.contains("<svg"));
        }
    }

    #[test]
    fn test_missing_column_writes_nothing() {
        let path = temp_svg("missing.svg");
        let err = plot_moving_average(&frame(), &path, &[("MA_7", "1-Week MA".to_string())]).unwrap_err();
        assert!(matches!(err, ChartError::MissingColumn(name) if name == "MA_7"));
        assert!(!path.exists());
    }
}
