//! Row projection and terminal rendering of the aggregated state.
//!
//! Everything here is a pure read of cloned `SymbolState` snapshots; no
//! network access and no writes happen on the render path.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table},
    Frame,
};

use crate::market::calc;
use crate::market::state::SymbolState;
use crate::market::types::TakerSide;

/// Candles shown in the chart viewport.
const VIEW_WINDOW: usize = 60;

/// Vertical padding applied beyond the visible high/low when scaling charts.
const CHART_PADDING: f64 = 0.03;

const C_UP: Color = Color::Green;
const C_DOWN: Color = Color::Red;

/// "Chart stats" table entry for one product.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRow {
    pub product: String,
    pub rate: String,
    pub low: String,
    pub high: String,
    pub average: String,
    /// Percent change from the visible-window average to the current rate.
    pub pct_of_average: f64,
}

/// "Change" table entry: the granularity's 5 labeled horizon changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRow {
    pub product: String,
    pub entries: [(&'static str, Option<f64>); 5],
}

/// "Live trades & running totals" table entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveRow {
    pub product: String,
    pub price: String,
    pub side: TakerSide,
    pub size: String,
    pub bought: String,
    pub sold: String,
    pub buys: String,
    pub sells: String,
}

/// Values inside the chart viewport (last `VIEW_WINDOW` candles).
fn view_values(state: &SymbolState) -> Vec<f64> {
    let start = state.series.len().saturating_sub(VIEW_WINDOW);
    state.series[start..].iter().map(|c| c.value).collect()
}

/// Stats over the visible window, matching what the chart draws. `None`
/// until the first snapshot has arrived.
pub fn stats_row(state: &SymbolState) -> Option<StatsRow> {
    if state.series.is_empty() {
        return None;
    }

    let view = view_values(state);
    let low = calc::low(&view);
    let high = calc::high(&view);
    let average = calc::mean(&view);
    let fiat = state.config.fiat;

    Some(StatsRow {
        product: state.config.product.clone(),
        rate: fmt_amount(state.metrics.rate, fiat),
        low: fmt_amount(low, fiat),
        high: fmt_amount(high, fiat),
        average: fmt_amount(average, fiat),
        pct_of_average: calc::percent_change(average, state.metrics.rate),
    })
}

pub fn change_row(state: &SymbolState) -> Option<ChangeRow> {
    if state.series.is_empty() {
        return None;
    }

    let horizons = calc::horizons(state.config.granularity);
    let mut entries = [("", None); 5];
    for (entry, (horizon, change)) in entries
        .iter_mut()
        .zip(horizons.iter().zip(state.metrics.change))
    {
        *entry = (horizon.label, change);
    }

    Some(ChangeRow {
        product: state.config.product.clone(),
        entries,
    })
}

/// `None` until the first match for this product has arrived.
pub fn live_row(state: &SymbolState) -> Option<LiveRow> {
    if !state.trades.has_trades() {
        return None;
    }

    let trades = &state.trades;
    Some(LiveRow {
        product: state.config.product.clone(),
        price: fmt_amount(trades.last_price, state.config.fiat),
        side: trades.last_side,
        size: format!("{:.4}", trades.last_size),
        bought: thousands(trades.bought, 2),
        sold: thousands(trades.sold, 2),
        buys: thousands(trades.buy_count as f64, 0),
        sells: thousands(trades.sell_count as f64, 0),
    })
}

/// Fiat amounts get "$", thousands separators, and two decimals; everything
/// else is shown with four decimals.
pub fn fmt_amount(value: f64, fiat: bool) -> String {
    if fiat {
        format!("${}", thousands(value, 2))
    } else {
        format!("{value:.4}")
    }
}

/// "12,345.67" style grouping of the integer part.
pub fn thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{value:.decimals$}");
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part.to_string(), Some(frac_part.to_string())),
        None => (formatted, None),
    };

    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", int_part.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// "+1.23%" / "-0.45%"; "--" for horizons the series cannot reach yet.
pub fn fmt_percent(change: Option<f64>) -> String {
    match change {
        Some(value) if value >= 0.0 => format!("+{value:.2}%"),
        Some(value) => format!("{value:.2}%"),
        None => "--".to_string(),
    }
}

fn percent_style(change: Option<f64>) -> Style {
    match change {
        Some(value) if value >= 0.0 => Style::default().fg(C_UP),
        Some(_) => Style::default().fg(C_DOWN),
        None => Style::default(),
    }
}

fn side_style(side: TakerSide) -> Style {
    if side.is_buy() {
        Style::default().fg(C_UP)
    } else {
        Style::default().fg(C_DOWN)
    }
}

fn line_color(name: &str) -> Color {
    match name.to_ascii_lowercase().as_str() {
        "red" => Color::Red,
        "green" => Color::Green,
        "blue" => Color::Blue,
        "cyan" => Color::Cyan,
        "magenta" => Color::Magenta,
        "white" => Color::White,
        "gray" | "grey" => Color::Gray,
        _ => Color::Yellow,
    }
}

/// Render the whole dashboard: one chart per product on the left, the three
/// tables (stats, change, live trades) stacked on the right.
pub fn draw(frame: &mut Frame, states: &[SymbolState]) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(frame.area());

    if !states.is_empty() {
        let chart_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![
                Constraint::Ratio(1, states.len() as u32);
                states.len()
            ])
            .split(columns[0]);
        for (state, area) in states.iter().zip(chart_areas.iter()) {
            draw_chart(frame, *area, state);
        }
    }

    let table_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(columns[1]);
    draw_stats_table(frame, table_areas[0], states);
    draw_change_table(frame, table_areas[1], states);
    draw_live_table(frame, table_areas[2], states);
}

fn draw_chart(frame: &mut Frame, area: Rect, state: &SymbolState) {
    let title = format!(
        " {} ({} {}) ",
        state.config.product,
        state.config.granularity,
        state.config.value_field.as_str()
    );
    let block = Block::default().borders(Borders::ALL).title(title);

    if state.series.is_empty() {
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Paragraph::new("waiting for data..."), inner);
        return;
    }

    let values = view_values(state);
    let start = state.series.len().saturating_sub(VIEW_WINDOW);
    let view = &state.series[start..];

    let low = calc::low(&values);
    let high = calc::high(&values);
    let average = calc::mean(&values);
    let padding = (high - low) * CHART_PADDING;

    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, &value)| (i as f64, value))
        .collect();
    let average_points: Vec<(f64, f64)> = if state.config.draw_average {
        (0..values.len()).map(|i| (i as f64, average)).collect()
    } else {
        Vec::new()
    };

    let mut datasets = Vec::new();
    if state.config.draw_average {
        datasets.push(
            Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::DarkGray))
                .data(&average_points),
        );
    }
    datasets.push(
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(line_color(&state.config.line_color)))
            .data(&points),
    );

    let x_labels = vec![
        view.first().map(|c| c.label.clone()).unwrap_or_default(),
        view.last().map(|c| c.label.clone()).unwrap_or_default(),
    ];
    let y_labels = vec![
        fmt_amount(low - padding, state.config.fiat),
        fmt_amount(average, state.config.fiat),
        fmt_amount(high + padding, state.config.fiat),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, (values.len().saturating_sub(1)).max(1) as f64])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .bounds([low - padding, high + padding])
                .labels(y_labels),
        );

    frame.render_widget(chart, area);
}

fn header_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn draw_stats_table(frame: &mut Frame, area: Rect, states: &[SymbolState]) {
    let rows: Vec<Row> = states
        .iter()
        .filter_map(stats_row)
        .map(|row| {
            let pct = Some(row.pct_of_average);
            Row::new(vec![
                Cell::from(Span::styled(
                    row.product,
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Cell::from(row.rate),
                Cell::from(row.low),
                Cell::from(row.high),
                Cell::from(row.average),
                Cell::from(Span::styled(fmt_percent(pct), percent_style(pct))),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(9),
        Constraint::Length(13),
        Constraint::Length(13),
        Constraint::Length(13),
        Constraint::Length(13),
        Constraint::Length(13),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(["pair", "current", "low", "high", "average", "% of avg"])
                .style(header_style()),
        )
        .block(Block::default().borders(Borders::ALL).title(" Chart stats "));
    frame.render_widget(table, area);
}

fn draw_change_table(frame: &mut Frame, area: Rect, states: &[SymbolState]) {
    let rows: Vec<Row> = states
        .iter()
        .filter_map(change_row)
        .map(|row| {
            let mut cells = vec![Cell::from(Span::styled(
                row.product,
                Style::default().add_modifier(Modifier::BOLD),
            ))];
            for (label, change) in row.entries {
                cells.push(Cell::from(Span::styled(
                    format!("{label}:{}", fmt_percent(change)),
                    percent_style(change),
                )));
            }
            Row::new(cells)
        })
        .collect();

    let widths = [
        Constraint::Length(9),
        Constraint::Length(13),
        Constraint::Length(13),
        Constraint::Length(13),
        Constraint::Length(13),
        Constraint::Length(13),
    ];
    let table = Table::new(rows, widths)
        .block(Block::default().borders(Borders::ALL).title(" Change "));
    frame.render_widget(table, area);
}

fn draw_live_table(frame: &mut Frame, area: Rect, states: &[SymbolState]) {
    let rows: Vec<Row> = states
        .iter()
        .filter_map(live_row)
        .map(|row| {
            let style = side_style(row.side);
            Row::new(vec![
                Cell::from(Span::styled(
                    row.product,
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Cell::from(Span::styled(row.price, style)),
                Cell::from(Span::styled(row.side.to_string(), style)),
                Cell::from(row.size),
                Cell::from(Span::styled(row.bought, Style::default().fg(C_UP))),
                Cell::from(Span::styled(row.sold, Style::default().fg(C_DOWN))),
                Cell::from(Span::styled(row.buys, Style::default().fg(C_UP))),
                Cell::from(Span::styled(row.sells, Style::default().fg(C_DOWN))),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(9),
        Constraint::Length(11),
        Constraint::Length(5),
        Constraint::Length(9),
        Constraint::Length(13),
        Constraint::Length(13),
        Constraint::Length(7),
        Constraint::Length(7),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new([
                "pair", "last", "side", "size", "bought", "sold", "buys", "sells",
            ])
            .style(header_style()),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Live trades & running totals "),
        );
    frame.render_widget(table, area);
}
