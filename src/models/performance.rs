/// Ranking options for performance analysis
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metric used to rank symbols over a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMetric {
    /// Close-to-close return over the period
    #[default]
    #[serde(alias = "returns")]
    Return,

    /// Sample std of daily returns
    Volatility,

    /// Mean daily volume
    Volume,
}

impl PerformanceMetric {
    /// Parse from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "return" | "returns" => Ok(PerformanceMetric::Return),
            "volatility" => Ok(PerformanceMetric::Volatility),
            "volume" => Ok(PerformanceMetric::Volume),
            _ => Err(format!("Invalid metric: '{}'. Valid values: return, volatility, volume", s)),
        }
    }

    /// Column label used in tables and chart titles
    pub fn label(&self) -> &'static str {
        match self {
            PerformanceMetric::Return => "Return (%)",
            PerformanceMetric::Volatility => "Volatility (%)",
            PerformanceMetric::Volume => "Avg Volume",
        }
    }
}

impl fmt::Display for PerformanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PerformanceMetric::Return => "return",
            PerformanceMetric::Volatility => "volatility",
            PerformanceMetric::Volume => "volume",
        };
        write!(f, "{}", s)
    }
}

/// Which end of a ranking to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    #[serde(alias = "top", alias = "gainers")]
    Best,

    #[serde(alias = "bottom", alias = "losers")]
    Worst,
}

impl Direction {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "best" | "top" | "gainers" => Ok(Direction::Best),
            "worst" | "bottom" | "losers" => Ok(Direction::Worst),
            _ => Err(format!("Invalid direction: '{}'. Valid values: best, worst", s)),
        }
    }
}

/// Look-back windows offered for ranking on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankingPeriod {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1m")]
    OneMonth,
}

impl RankingPeriod {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "1d" | "day" => Ok(RankingPeriod::OneDay),
            "1w" | "week" => Ok(RankingPeriod::OneWeek),
            "1m" | "month" => Ok(RankingPeriod::OneMonth),
            _ => Err(format!("Invalid period: '{}'. Valid values: 1d, 1w, 1m", s)),
        }
    }

    /// Calendar days to look back from the reference date
    pub fn days(&self) -> i64 {
        match self {
            RankingPeriod::OneDay => 1,
            RankingPeriod::OneWeek => 7,
            RankingPeriod::OneMonth => 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_from_str() {
        assert_eq!(PerformanceMetric::from_str("RETURN").unwrap(), PerformanceMetric::Return);
        assert_eq!(PerformanceMetric::from_str("volume").unwrap(), PerformanceMetric::Volume);
        assert!(PerformanceMetric::from_str("alpha").is_err());
    }

    #[test]
    fn test_metric_serde() {
        assert_eq!(serde_json::to_string(&PerformanceMetric::Volatility).unwrap(), r#""volatility""#);
        let m: PerformanceMetric = serde_json::from_str(r#""returns""#).unwrap();
        assert_eq!(m, PerformanceMetric::Return);
    }

    #[test]
    fn test_direction_and_period() {
        assert_eq!(Direction::default(), Direction::Best);
        assert_eq!(Direction::from_str("losers").unwrap(), Direction::Worst);
        assert_eq!(RankingPeriod::from_str("1w").unwrap().days(), 7);
        assert!(RankingPeriod::from_str("1y").is_err());
    }
}
