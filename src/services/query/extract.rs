use crate::constants::DEFAULT_QUERY_LIMIT;
use crate::error::Result;
use crate::models::DateRange;
use crate::utils::base_symbol;
use chrono::{Datelike, Duration, Months, NaiveDate};
use regex::Regex;

const NUMBER_WORDS: &[(&str, usize)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
];

/// Pulls dates, symbols and numbers out of preprocessed query text
pub struct Extractor {
    punctuation: Regex,
    whitespace: Regex,
    days: Regex,
    weeks: Regex,
    months: Regex,
    number: Regex,
    number_words: Vec<(Regex, usize)>,
    window: Regex,
    short_window: Regex,
    long_window: Regex,
}

impl Extractor {
    pub fn new() -> Result<Self> {
        let number_words = NUMBER_WORDS
            .iter()
            .map(|(word, value)| Ok((Regex::new(&format!(r"\b{}\b", word))?, *value)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            punctuation: Regex::new(r"[^\w\s.]")?,
            whitespace: Regex::new(r"\s+")?,
            days: Regex::new(r"(\d+)\s+days?")?,
            weeks: Regex::new(r"(\d+)\s+weeks?")?,
            months: Regex::new(r"(\d+)\s+months?")?,
            number: Regex::new(r"\b(\d+)\b")?,
            number_words,
            window: Regex::new(r"(\d+)[ -]day")?,
            short_window: Regex::new(r"(\d+)[ -]day.*short")?,
            long_window: Regex::new(r"(\d+)[ -]day.*long")?,
        })
    }

    /// Lowercase, drop punctuation other than `.`, collapse whitespace
    pub fn preprocess(&self, query: &str) -> String {
        let lowered = query.to_lowercase();
        let stripped = self.punctuation.replace_all(&lowered, " ");
        self.whitespace.replace_all(&stripped, " ").trim().to_string()
    }

    /// Date range a question refers to, relative to `context`
    ///
    /// Defaults to the week ending at `context`. Named periods ("yesterday",
    /// "last month", ...) are applied first, then an explicit "N days/weeks/
    /// months" moves the start. A start that ends up after the end is pulled
    /// back to the end.
    pub fn extract_date_range(&self, query: &str, context: NaiveDate, available_dates: &[NaiveDate]) -> DateRange {
        let mut end = context;
        let mut start = context - Duration::days(7);

        if query.contains("today") {
            // default
        } else if query.contains("yesterday") {
            if let Some(idx) = available_dates.iter().position(|d| *d == context) {
                if idx > 0 {
                    end = available_dates[idx - 1];
                    start = end - Duration::days(1);
                }
            }
        } else if query.contains("this week") {
            start = context - Duration::days(context.weekday().num_days_from_monday() as i64);
        } else if query.contains("this month") {
            start = first_of_month(context);
        } else if query.contains("last week") {
            end = context - Duration::days(context.weekday().num_days_from_monday() as i64 + 1);
            start = end - Duration::days(6);
        } else if query.contains("last month") {
            let this_month = first_of_month(context);
            start = this_month - Months::new(1);
            end = this_month - Duration::days(1);
        }

        if let Some(n) = capture_number(&self.days, query) {
            start = days_back(context, n, 1);
        } else if let Some(n) = capture_number(&self.weeks, query) {
            start = days_back(context, n, 7);
        } else if let Some(n) = capture_number(&self.months, query) {
            start = first_of_month(context)
                .checked_sub_months(Months::new(n.min(u32::MAX as usize) as u32))
                .unwrap_or(start);
        }

        DateRange {
            start: start.min(end),
            end,
        }
    }

    /// Symbols mentioned in the query, in `available` order
    ///
    /// Full symbols ("tcs.ns") are matched as substrings first. Only when none
    /// is found are base names ("tcs") tried, as whole words.
    pub fn extract_symbols(&self, query: &str, available: &[String]) -> Vec<String> {
        let full: Vec<String> = available
            .iter()
            .filter(|s| query.contains(&s.to_lowercase()))
            .cloned()
            .collect();
        if !full.is_empty() {
            return full;
        }

        available
            .iter()
            .filter(|s| {
                let base = base_symbol(s).to_lowercase();
                !base.is_empty()
                    && Regex::new(&format!(r"\b{}\b", regex::escape(&base)))
                        .map(|re| re.is_match(query))
                        .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// First number in the query, digits before words; 5 when absent
    pub fn extract_number(&self, query: &str) -> usize {
        if let Some(n) = capture_number(&self.number, query) {
            return n;
        }
        self.number_words
            .iter()
            .find(|(re, _)| re.is_match(query))
            .map(|(_, value)| *value)
            .unwrap_or(DEFAULT_QUERY_LIMIT)
    }

    /// Window from "N day" / "N-day"
    pub fn extract_window(&self, query: &str) -> Option<usize> {
        capture_number(&self.window, query)
    }

    /// Short and long windows from "N day ... short" / "N day ... long"
    pub fn extract_ma_windows(&self, query: &str, default_short: usize, default_long: usize) -> (usize, usize) {
        let short = capture_number(&self.short_window, query).unwrap_or(default_short);
        let long = capture_number(&self.long_window, query).unwrap_or(default_long);
        if short >= long {
            (default_short, default_long)
        } else {
            (short, long)
        }
    }
}

fn capture_number(re: &Regex, text: &str) -> Option<usize> {
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

/// `context` minus `n * unit` days, clamped to the earliest representable date
fn days_back(context: NaiveDate, n: usize, unit: i64) -> NaiveDate {
    i64::try_from(n)
        .ok()
        .and_then(|n| n.checked_mul(unit))
        .and_then(Duration::try_days)
        .and_then(|span| context.checked_sub_signed(span))
        .unwrap_or(NaiveDate::MIN)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn extractor() -> Extractor {
        Extractor::new().unwrap()
    }

    fn range(q: &str, context: &str) -> (String, String) {
        let r = extractor().extract_date_range(q, d(context), &[d("2024-03-13"), d("2024-03-14"), d("2024-03-15")]);
        (r.start.to_string(), r.end.to_string())
    }

    #[test]
    fn test_preprocess() {
        let e = extractor();
        assert_eq!(e.preprocess("  What's   RELIANCE.NS price?! "), "what s reliance.ns price");
        assert_eq!(e.preprocess("20-day MA"), "20 day ma");
    }

    #[test]
    fn test_date_range_defaults_and_periods() {
        // 2024-03-15 is a Friday
        assert_eq!(range("top gainers", "2024-03-15"), ("2024-03-08".into(), "2024-03-15".into()));
        assert_eq!(range("gainers today", "2024-03-15"), ("2024-03-08".into(), "2024-03-15".into()));
        assert_eq!(range("price yesterday", "2024-03-15"), ("2024-03-13".into(), "2024-03-14".into()));
        assert_eq!(range("gainers this week", "2024-03-15"), ("2024-03-11".into(), "2024-03-15".into()));
        assert_eq!(range("gainers this month", "2024-03-15"), ("2024-03-01".into(), "2024-03-15".into()));
        assert_eq!(range("gainers last week", "2024-03-15"), ("2024-03-04".into(), "2024-03-10".into()));
        assert_eq!(range("gainers last month", "2024-03-15"), ("2024-02-01".into(), "2024-02-29".into()));
        assert_eq!(range("gainers last month", "2024-01-10"), ("2023-12-01".into(), "2023-12-31".into()));
    }

    #[test]
    fn test_date_range_explicit_spans() {
        assert_eq!(range("last 10 days", "2024-03-15"), ("2024-03-05".into(), "2024-03-15".into()));
        assert_eq!(range("past 2 weeks", "2024-03-15"), ("2024-03-01".into(), "2024-03-15".into()));
        assert_eq!(range("past 3 months", "2024-03-15"), ("2023-12-01".into(), "2024-03-15".into()));
        // yesterday without a known context date keeps the default week
        assert_eq!(range("yesterday", "2024-03-20"), ("2024-03-13".into(), "2024-03-20".into()));
    }

    #[test]
    fn test_date_range_huge_spans_clamp() {
        let e = extractor();
        let context = d("2024-01-30");
        for q in [
            "price of tcs last 100000000 days",
            "price of tcs last 99999999 weeks",
        ] {
            let r = e.extract_date_range(q, context, &[]);
            assert_eq!(r.start, NaiveDate::MIN, "{}", q);
            assert_eq!(r.end, context);
        }
    }

    #[test]
    fn test_extract_symbols() {
        let e = extractor();
        let available: Vec<String> = ["INFY.NS", "M&M.NS", "TCS.NS"].iter().map(|s| s.to_string()).collect();

        assert_eq!(e.extract_symbols("compare tcs.ns and infy.ns", &available), vec!["INFY.NS", "TCS.NS"]);
        assert_eq!(e.extract_symbols("price of tcs", &available), vec!["TCS.NS"]);
        // full matches suppress base-name matching
        assert_eq!(e.extract_symbols("tcs.ns vs infy", &available), vec!["TCS.NS"]);
        // base names must be whole words
        assert!(e.extract_symbols("tcsx trend", &available).is_empty());
    }

    #[test]
    fn test_extract_number() {
        let e = extractor();
        assert_eq!(e.extract_number("top 7 gainers"), 7);
        assert_eq!(e.extract_number("top three gainers"), 3);
        assert_eq!(e.extract_number("top gainers"), 5);
    }

    #[test]
    fn test_ma_windows() {
        let e = extractor();
        assert_eq!(e.extract_window("stocks above 50 day average"), Some(50));
        assert_eq!(e.extract_ma_windows("tcs 10 day short ma", 5, 20), (10, 20));
        assert_eq!(e.extract_ma_windows("tcs 50 day long ma", 5, 20), (5, 50));
        assert_eq!(e.extract_ma_windows("tcs ma", 5, 20), (5, 20));
        // inverted windows fall back to defaults
        assert_eq!(e.extract_ma_windows("tcs 30 day short ma", 5, 20), (5, 20));
    }
}
