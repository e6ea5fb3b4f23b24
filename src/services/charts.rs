//! Plotly figure descriptions
//!
//! Every builder returns a [`Figure`] whose JSON form can be passed straight
//! to `Plotly.newPlot(el, fig.data, fig.layout)` in the dashboard.

use crate::models::{DateRange, PerformanceMetric, SeriesBySymbol, StockPrice};
use crate::services::analysis::{CorrelationMatrix, MaRow, Performance, VolumeAnalysis};
use serde::Serialize;
use serde_json::{json, Value};

const NO_DATA: &str = "No data available for the selected period";
const VOLUME_COLOR: &str = "rgba(0, 0, 255, 0.5)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Value>,
    pub layout: Value,
}

impl Figure {
    /// Figure with no traces and a centered message
    pub fn empty(title: impl Into<String>) -> Self {
        Self {
            data: Vec::new(),
            layout: json!({
                "title": { "text": title.into() },
                "annotations": [{
                    "text": NO_DATA,
                    "xref": "paper", "yref": "paper",
                    "x": 0.5, "y": 0.5,
                    "showarrow": false
                }]
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn title(&self) -> Option<&str> {
        self.layout["title"]["text"].as_str()
    }
}

fn dates(rows: &[StockPrice]) -> Vec<String> {
    rows.iter().map(|r| r.date.to_string()).collect()
}

fn horizontal_legend() -> Value {
    json!({ "orientation": "h", "yanchor": "bottom", "y": 1.02, "xanchor": "right", "x": 1 })
}

/// Candlestick with volume bars underneath
pub fn price_chart(symbol: &str, rows: &[StockPrice], range: &DateRange) -> Figure {
    if rows.is_empty() {
        return Figure::empty(format!("{} - No Data Available", symbol));
    }

    let x = dates(rows);
    let candles = json!({
        "type": "candlestick",
        "name": "Price",
        "x": x,
        "open": rows.iter().map(|r| r.open).collect::<Vec<_>>(),
        "high": rows.iter().map(|r| r.high).collect::<Vec<_>>(),
        "low": rows.iter().map(|r| r.low).collect::<Vec<_>>(),
        "close": rows.iter().map(|r| r.close).collect::<Vec<_>>(),
        "yaxis": "y"
    });
    let volume = json!({
        "type": "bar",
        "name": "Volume",
        "x": x,
        "y": rows.iter().map(|r| r.volume).collect::<Vec<_>>(),
        "marker": { "color": VOLUME_COLOR },
        "yaxis": "y2"
    });

    Figure {
        data: vec![candles, volume],
        layout: json!({
            "title": { "text": format!("{} Stock Price ({} to {})", symbol, range.start, range.end) },
            "height": 600,
            "showlegend": false,
            "xaxis": { "title": { "text": "Date" }, "rangeslider": { "visible": false } },
            "yaxis": { "title": { "text": "Price" }, "domain": [0.35, 1.0] },
            "yaxis2": { "title": { "text": "Volume" }, "domain": [0.0, 0.25] }
        }),
    }
}

/// One line per symbol; `normalize` plots % change from the first close
pub fn comparison_chart(series: &SeriesBySymbol, range: &DateRange, normalize: bool) -> Figure {
    let data: Vec<Value> = series
        .iter()
        .filter(|(_, rows)| !rows.is_empty())
        .map(|(symbol, rows)| {
            let base = rows[0].close;
            let y: Vec<f64> = rows
                .iter()
                .map(|r| {
                    if normalize && base != 0.0 {
                        (r.close / base - 1.0) * 100.0
                    } else {
                        r.close
                    }
                })
                .collect();
            json!({ "type": "scatter", "mode": "lines", "name": symbol, "x": dates(rows), "y": y })
        })
        .collect();

    if data.is_empty() {
        return Figure::empty("No Data Available");
    }

    let (title, y_title) = if normalize {
        ("Stock Performance Comparison (% Change)", "% Change")
    } else {
        ("Stock Price Comparison", "Price")
    };

    Figure {
        data,
        layout: json!({
            "title": { "text": format!("{} ({} to {})", title, range.start, range.end) },
            "height": 500,
            "xaxis": { "title": { "text": "Date" } },
            "yaxis": { "title": { "text": y_title } },
            "legend": horizontal_legend()
        }),
    }
}

pub fn moving_average_chart(rows: &[MaRow], symbol: &str, short: usize, long: usize) -> Figure {
    if rows.is_empty() {
        return Figure::empty(format!("{} - No Moving Average Data", symbol));
    }

    let x: Vec<String> = rows.iter().map(|r| r.date.to_string()).collect();
    let line = |name: String, y: Vec<f64>, color: &str| {
        json!({ "type": "scatter", "mode": "lines", "name": name, "x": x, "y": y, "line": { "color": color } })
    };

    Figure {
        data: vec![
            line("Close Price".to_string(), rows.iter().map(|r| r.close).collect(), "black"),
            line(format!("{}-day MA", short), rows.iter().map(|r| r.ma_short).collect(), "blue"),
            line(format!("{}-day MA", long), rows.iter().map(|r| r.ma_long).collect(), "red"),
        ],
        layout: json!({
            "title": { "text": format!("{} with {}-day and {}-day Moving Averages", symbol, short, long) },
            "height": 500,
            "xaxis": { "title": { "text": "Date" } },
            "yaxis": { "title": { "text": "Price" } },
            "legend": horizontal_legend()
        }),
    }
}

/// Close on top, volume bars and their 5-day average below
pub fn volume_chart(analysis: &VolumeAnalysis, symbol: &str) -> Figure {
    if analysis.rows.is_empty() {
        return Figure::empty(format!("{} - No Volume Data", symbol));
    }

    let x: Vec<String> = analysis.rows.iter().map(|r| r.date.to_string()).collect();
    Figure {
        data: vec![
            json!({
                "type": "scatter", "mode": "lines", "name": "Close Price",
                "x": x, "y": analysis.rows.iter().map(|r| r.close).collect::<Vec<_>>(),
                "yaxis": "y"
            }),
            json!({
                "type": "bar", "name": "Volume",
                "x": x, "y": analysis.rows.iter().map(|r| r.volume).collect::<Vec<_>>(),
                "marker": { "color": VOLUME_COLOR },
                "yaxis": "y2"
            }),
            json!({
                "type": "scatter", "mode": "lines", "name": "Volume MA (5)",
                "x": x, "y": analysis.rows.iter().map(|r| r.volume_ma_5).collect::<Vec<_>>(),
                "line": { "color": "red" },
                "yaxis": "y2"
            }),
        ],
        layout: json!({
            "title": { "text": format!("{} Volume Analysis", symbol) },
            "height": 600,
            "xaxis": { "title": { "text": "Date" } },
            "yaxis": { "title": { "text": "Price" }, "domain": [0.55, 1.0] },
            "yaxis2": { "title": { "text": "Volume" }, "domain": [0.0, 0.45] },
            "legend": horizontal_legend()
        }),
    }
}

/// Histogram of `metric` across symbols with a dashed mean marker
pub fn performance_distribution(perfs: &[Performance], metric: PerformanceMetric) -> Figure {
    let values: Vec<f64> = perfs.iter().filter_map(|p| p.metric_value(metric)).collect();
    if values.is_empty() {
        return Figure::empty("No Performance Data");
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let label = metric.label();

    Figure {
        data: vec![json!({ "type": "histogram", "x": values, "nbinsx": 20, "name": label })],
        layout: json!({
            "title": { "text": format!("Distribution of {} Across Stocks", label) },
            "height": 400,
            "xaxis": { "title": { "text": label } },
            "yaxis": { "title": { "text": "Number of Stocks" } },
            "shapes": [{
                "type": "line", "x0": mean, "x1": mean, "yref": "paper", "y0": 0, "y1": 1,
                "line": { "color": "red", "dash": "dash" }
            }],
            "annotations": [{
                "text": format!("Mean: {:.2}", mean),
                "x": mean, "yref": "paper", "y": 1, "showarrow": false, "xanchor": "left"
            }]
        }),
    }
}

/// Bar chart of labelled values, best first unless `ascending`
pub fn top_performers_chart(rows: &[(String, f64)], metric_label: &str, top_n: usize, ascending: bool) -> Figure {
    if rows.is_empty() {
        return Figure::empty("No Performance Data");
    }

    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal);
        if ascending { ord } else { ord.reverse() }
    });
    sorted.truncate(top_n);

    let (labels, values): (Vec<String>, Vec<f64>) = sorted.into_iter().unzip();
    let title = format!("{} {} Stocks by {}", if ascending { "Bottom" } else { "Top" }, top_n, metric_label);

    Figure {
        data: vec![json!({
            "type": "bar",
            "x": labels,
            "y": values,
            "text": values.iter().map(|v| format!("{:.2}", v)).collect::<Vec<_>>(),
            "textposition": "outside",
            "marker": { "color": values, "colorscale": if ascending { "YlOrRd" } else { "RdYlGn" } }
        })],
        layout: json!({
            "title": { "text": title },
            "height": 500,
            "xaxis": { "title": { "text": "Stock Symbol" } },
            "yaxis": { "title": { "text": metric_label } }
        }),
    }
}

/// Annotated heatmap of a correlation matrix
pub fn correlation_heatmap(matrix: &CorrelationMatrix) -> Figure {
    if matrix.symbols.is_empty() {
        return Figure::empty("No Data Available");
    }

    let text: Vec<Vec<String>> = matrix
        .values
        .iter()
        .map(|row| row.iter().map(|v| v.map(|x| format!("{:.2}", x)).unwrap_or_default()).collect())
        .collect();

    Figure {
        data: vec![json!({
            "type": "heatmap",
            "x": matrix.symbols,
            "y": matrix.symbols,
            "z": matrix.values,
            "text": text,
            "texttemplate": "%{text}",
            "colorscale": "Viridis",
            "zmin": -1,
            "zmax": 1
        })],
        layout: json!({
            "title": { "text": "Correlation Matrix (Stock Prices)" },
            "height": 600
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analysis::{analyze_volume, moving_averages};
    use chrono::{Duration, NaiveDate};

    fn rows(symbol: &str, closes: &[f64]) -> Vec<StockPrice> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| StockPrice::new(symbol, start + Duration::days(i as i64), *c, c + 1.0, c - 1.0, *c, 100))
            .collect()
    }

    fn range() -> DateRange {
        DateRange::parse("2024-01-01", "2024-01-31").unwrap()
    }

    #[test]
    fn test_price_chart() {
        let fig = price_chart("TCS.NS", &rows("TCS.NS", &[1.0, 2.0]), &range());
        assert_eq!(fig.data.len(), 2);
        assert_eq!(fig.data[0]["type"], "candlestick");
        assert_eq!(fig.title(), Some("TCS.NS Stock Price (2024-01-01 to 2024-01-31)"));
    }

    #[test]
    fn test_empty_inputs_are_annotated() {
        let fig = price_chart("TCS.NS", &[], &range());
        assert!(fig.is_empty());
        assert_eq!(fig.layout["annotations"][0]["text"], NO_DATA);

        assert!(comparison_chart(&SeriesBySymbol::new(), &range(), true).is_empty());
        assert!(performance_distribution(&[], PerformanceMetric::Return).is_empty());
        assert!(top_performers_chart(&[], "Return (%)", 5, false).is_empty());
    }

    #[test]
    fn test_comparison_normalized() {
        let mut series = SeriesBySymbol::new();
        series.insert("A.NS".into(), rows("A.NS", &[100.0, 110.0]));
        let fig = comparison_chart(&series, &range(), true);
        assert_eq!(fig.data[0]["y"][1].as_f64().map(|v| (v - 10.0).abs() < 1e-9), Some(true));
        assert!(fig.title().unwrap().starts_with("Stock Performance Comparison (% Change)"));

        let raw = comparison_chart(&series, &range(), false);
        assert_eq!(raw.data[0]["y"][1], 110.0);
    }

    #[test]
    fn test_moving_average_and_volume_charts() {
        let closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let data = rows("INFY.NS", &closes);

        let ma = moving_averages(&data, 5, 20).unwrap();
        let fig = moving_average_chart(&ma, "INFY.NS", 5, 20);
        assert_eq!(fig.data.len(), 3);
        assert_eq!(fig.title(), Some("INFY.NS with 5-day and 20-day Moving Averages"));

        let vol = volume_chart(&analyze_volume(&data).unwrap(), "INFY.NS");
        assert_eq!(vol.data[2]["name"], "Volume MA (5)");
        // undefined averages serialize as null
        assert!(vol.data[2]["y"][0].is_null());
    }

    #[test]
    fn test_top_performers_title_and_order() {
        let values = vec![("A".to_string(), 1.0), ("B".to_string(), 3.0), ("C".to_string(), 2.0)];
        let fig = top_performers_chart(&values, "Return (%)", 2, false);
        assert_eq!(fig.title(), Some("Top 2 Stocks by Return (%)"));
        assert_eq!(fig.data[0]["x"], json!(["B", "C"]));

        let bottom = top_performers_chart(&values, "Return (%)", 2, true);
        assert_eq!(bottom.title(), Some("Bottom 2 Stocks by Return (%)"));
        assert_eq!(bottom.data[0]["x"], json!(["A", "C"]));
    }
}
