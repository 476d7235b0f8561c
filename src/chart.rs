//! Text rendering of the seven-day closing-price chart
//!
//! The chart is drawn with ratatui into an off-screen buffer, so the same
//! code serves the line-oriented CLI and tests without a terminal.

use crate::error::ChatError;
use crate::format;
use crate::models::PriceChart;
use crate::Result;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Widget},
};

pub const DEFAULT_WIDTH: u16 = 72;
pub const DEFAULT_HEIGHT: u16 = 16;

const MIN_WIDTH: u16 = 24;
const MIN_HEIGHT: u16 = 6;

/// Render `chart` into `height` lines of at most `width` cells each.
pub fn render_chart(chart: &PriceChart, width: u16, height: u16) -> Result<Vec<String>> {
    if chart.points.is_empty() {
        return Err(ChatError::ChartError(format!(
            "no points to plot for {}",
            chart.ticker
        )));
    }
    if width < MIN_WIDTH || height < MIN_HEIGHT {
        return Err(ChatError::ChartError(format!(
            "chart area {}x{} is too small",
            width, height
        )));
    }

    let data: Vec<(f64, f64)> = chart
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.close))
        .collect();

    let (low, high) = value_bounds(&data);
    let last_x = (data.len().saturating_sub(1)).max(1) as f64;

    let first_date = format::date(chart.points[0].date);
    let last_date = format::date(chart.points[chart.points.len() - 1].date);

    let dataset = Dataset::default()
        .name(chart.ticker.clone())
        .marker(Marker::Dot)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data);

    let widget = Chart::new(vec![dataset])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(chart.title.clone()),
        )
        .x_axis(
            Axis::default()
                .bounds([0.0, last_x])
                .labels(vec![Span::raw(first_date), Span::raw(last_date)]),
        )
        .y_axis(
            Axis::default()
                .title("USD")
                .bounds([low, high])
                .labels(vec![
                    Span::raw(format!("{:.2}", low)),
                    Span::raw(format!("{:.2}", high)),
                ]),
        );

    let area = Rect::new(0, 0, width, height);
    let mut buf = Buffer::empty(area);
    widget.render(area, &mut buf);

    Ok(buffer_lines(&buf))
}

/// Axis range with a little headroom; a flat series still gets a visible band.
fn value_bounds(data: &[(f64, f64)]) -> (f64, f64) {
    let low = data.iter().map(|(_, y)| *y).fold(f64::INFINITY, f64::min);
    let high = data.iter().map(|(_, y)| *y).fold(f64::NEG_INFINITY, f64::max);

    if (high - low).abs() < f64::EPSILON {
        return (low - 1.0, high + 1.0);
    }
    let pad = (high - low) * 0.05;
    (low - pad, high + pad)
}

fn buffer_lines(buf: &Buffer) -> Vec<String> {
    let width = buf.area.width as usize;
    buf.content
        .chunks(width)
        .map(|row| {
            let line: String = row.iter().map(|cell| cell.symbol()).collect();
            line.trim_end().to_string()
        })
        .collect()
}
