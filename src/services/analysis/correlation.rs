use crate::models::indicators::pearson;
use crate::models::SeriesBySymbol;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// Pairwise correlation of closing prices
///
/// `values[i][j]` correlates `symbols[i]` with `symbols[j]`. Each pair uses
/// only the dates both symbols have; pairs with fewer than two shared dates
/// or a constant side are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub symbols: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

pub fn correlation_matrix(series_by_symbol: &SeriesBySymbol) -> CorrelationMatrix {
    let symbols: Vec<String> = series_by_symbol
        .iter()
        .filter(|(_, series)| !series.is_empty())
        .map(|(symbol, _)| symbol.clone())
        .collect();

    let closes_by_date: Vec<HashMap<NaiveDate, f64>> = symbols
        .iter()
        .map(|s| {
            series_by_symbol
                .get(s)
                .map(|series| series.iter().map(|r| (r.date, r.close)).collect())
                .unwrap_or_default()
        })
        .collect();

    let n = symbols.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let mut shared: Vec<(&NaiveDate, &f64)> = closes_by_date[i].iter().collect();
            shared.sort_by_key(|(date, _)| **date);
            let (xs, ys): (Vec<f64>, Vec<f64>) = shared
                .into_iter()
                .filter_map(|(date, x)| Some((*x, *closes_by_date[j].get(date)?)))
                .unzip();

            let corr = pearson(&xs, &ys);
            values[i][j] = corr;
            values[j][i] = corr;
        }
    }

    CorrelationMatrix { symbols, values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analysis::fixtures::series;

    #[test]
    fn test_correlation_matrix() {
        let mut map = SeriesBySymbol::new();
        map.insert("A.NS".into(), series("A.NS", &[1.0, 2.0, 3.0, 4.0], &[1, 1, 1, 1]));
        map.insert("B.NS".into(), series("B.NS", &[2.0, 4.0, 6.0, 8.0], &[1, 1, 1, 1]));
        map.insert("C.NS".into(), series("C.NS", &[4.0, 3.0, 2.0, 1.0], &[1, 1, 1, 1]));
        map.insert("EMPTY.NS".into(), Vec::new());

        let m = correlation_matrix(&map);
        assert_eq!(m.symbols, vec!["A.NS", "B.NS", "C.NS"]);
        assert!((m.values[0][0].unwrap() - 1.0).abs() < 1e-12);
        assert!((m.values[0][1].unwrap() - 1.0).abs() < 1e-12);
        assert!((m.values[0][2].unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(m.values[2][0], m.values[0][2]);
    }

    #[test]
    fn test_correlation_uses_shared_dates() {
        let mut map = SeriesBySymbol::new();
        map.insert("A.NS".into(), series("A.NS", &[1.0, 2.0, 3.0, 4.0], &[1, 1, 1, 1]));
        // only the first date overlaps
        let mut late = series("B.NS", &[5.0, 6.0, 7.0, 9.0], &[1, 1, 1, 1]);
        for row in late.iter_mut() {
            row.date += chrono::Duration::days(3);
        }
        map.insert("B.NS".into(), late);

        let m = correlation_matrix(&map);
        assert_eq!(m.values[0][1], None);
    }
}
