use super::{block_on, exit_with};
use crate::error::Result;
use crate::services::{QueryAssistant, QueryResponse, QueryResult, Storage};
use crate::utils::{parse_optional_date, today};
use serde_json::Value;

pub fn run(text: String, date: Option<String>) {
    match block_on(answer(text, date)) {
        Ok(response) => print_response(&response),
        Err(e) => exit_with(e),
    }
}

async fn answer(text: String, date: Option<String>) -> Result<QueryResponse> {
    let storage = Storage::from_env().await;
    let context = match parse_optional_date(date.as_deref())? {
        Some(date) => date,
        None => storage.latest_date().await?.unwrap_or_else(today),
    };
    QueryAssistant::new()?.process_query(&storage, &text, context).await
}

fn print_response(response: &QueryResponse) {
    println!("🔎 Intent: {}", response.intent);
    println!("💬 {}\n", response.explanation);

    match &response.result {
        QueryResult::Text(text) => println!("{}", text),
        QueryResult::Table(rows) => print_table(rows),
        QueryResult::Empty => {}
    }

    if response.chart.is_some() {
        println!("\n📊 A chart is available for this question in the dashboard (Query Assistant tab)");
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{:.2}", f),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Columns in first-row order, widths fitted to content
pub(crate) fn print_table(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        return;
    };
    let columns: Vec<&String> = first.keys().collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| columns.iter().map(|c| cell(&row[c.as_str()])).collect())
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| cells.iter().map(|r| r[i].chars().count()).max().unwrap_or(0).max(c.len()))
        .collect();

    let line = |values: Vec<String>| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = w))
            .collect::<Vec<_>>()
            .join("  ")
    };
    println!("{}", line(columns.iter().map(|c| c.to_string()).collect()));
    println!("{}", line(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for row in cells {
        println!("{}", line(row));
    }
}
