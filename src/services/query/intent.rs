use crate::error::Result;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// What a question is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    TopGainers,
    TopLosers,
    PriceTrend,
    CompareStocks,
    MovingAverage,
    VolumeAnalysis,
    PriceSpike,
    CurrentPrice,
    GeneralInfo,
}

impl QueryIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::TopGainers => "top_gainers",
            QueryIntent::TopLosers => "top_losers",
            QueryIntent::PriceTrend => "price_trend",
            QueryIntent::CompareStocks => "compare_stocks",
            QueryIntent::MovingAverage => "moving_average",
            QueryIntent::VolumeAnalysis => "volume_analysis",
            QueryIntent::PriceSpike => "price_spike",
            QueryIntent::CurrentPrice => "current_price",
            QueryIntent::GeneralInfo => "general_info",
        }
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checked top to bottom, first hit wins
const INTENT_PATTERNS: &[(QueryIntent, &[&str])] = &[
    (
        QueryIntent::TopGainers,
        &[r"(top|best).*gain", r"gain.*most", r"perform.*best", r"highest.*return", r"most.*profit", r"biggest.*rise"],
    ),
    (
        QueryIntent::TopLosers,
        &[
            r"(top|worst).*los",
            r"los.*most",
            r"perform.*worst",
            r"lowest.*return",
            r"most.*loss",
            r"biggest.*drop",
            r"biggest.*fall",
        ],
    ),
    (
        QueryIntent::PriceTrend,
        &[r"(price|trend|movement|chart|graph).*for", r"show.*price", r"how.*price", r"price.*history", r"price.*trend"],
    ),
    (
        QueryIntent::CompareStocks,
        &[r"compare", r"\bvs\b", r"versus", r"against", r"difference.*between", r"perform.*better", r"which.*better"],
    ),
    (
        QueryIntent::MovingAverage,
        &[r"moving.*average", r"\bma\b", r"above.*average", r"below.*average", r"cross.*average", r"average.*price"],
    ),
    (
        QueryIntent::VolumeAnalysis,
        &[r"volume", r"trading.*volume", r"high.*volume", r"unusual.*volume"],
    ),
    (
        QueryIntent::PriceSpike,
        &[r"spike", r"jump", r"surge", r"plunge", r"crash", r"sudden", r"anomaly", r"unusual.*movement"],
    ),
    (
        QueryIntent::CurrentPrice,
        &[r"current.*price", r"what.*price", r"latest.*price", r"price.*now", r"how much.*cost"],
    ),
];

/// Keyword classifier over preprocessed query text
pub struct IntentMatcher {
    patterns: Vec<(QueryIntent, Vec<Regex>)>,
}

impl IntentMatcher {
    pub fn new() -> Result<Self> {
        let patterns = INTENT_PATTERNS
            .iter()
            .map(|(intent, sources)| {
                let compiled = sources.iter().map(|s| Regex::new(s)).collect::<std::result::Result<Vec<_>, _>>()?;
                Ok((*intent, compiled))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn identify(&self, query: &str) -> QueryIntent {
        self.patterns
            .iter()
            .find(|(_, regexes)| regexes.iter().any(|re| re.is_match(query)))
            .map(|(intent, _)| *intent)
            .unwrap_or(QueryIntent::GeneralInfo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identify(q: &str) -> QueryIntent {
        IntentMatcher::new().unwrap().identify(q)
    }

    #[test]
    fn test_identify_intents() {
        assert_eq!(identify("top 5 gainers this week"), QueryIntent::TopGainers);
        assert_eq!(identify("which stocks performed worst"), QueryIntent::TopLosers);
        assert_eq!(identify("show price of tcs"), QueryIntent::PriceTrend);
        assert_eq!(identify("compare tcs and infy"), QueryIntent::CompareStocks);
        assert_eq!(identify("tcs vs infy"), QueryIntent::CompareStocks);
        assert_eq!(identify("moving average of sbin"), QueryIntent::MovingAverage);
        // price trend is checked first
        assert_eq!(identify("price chart for sbin moving average"), QueryIntent::PriceTrend);
        assert_eq!(identify("sbin 20 day ma"), QueryIntent::MovingAverage);
        assert_eq!(identify("stocks above average"), QueryIntent::MovingAverage);
        assert_eq!(identify("trading volume of infy"), QueryIntent::VolumeAnalysis);
        assert_eq!(identify("any spikes in reliance"), QueryIntent::PriceSpike);
        assert_eq!(identify("latest price of tcs"), QueryIntent::CurrentPrice);
        assert_eq!(identify("tell me about tcs"), QueryIntent::GeneralInfo);
    }

    #[test]
    fn test_short_keywords_need_word_boundaries() {
        // "ma" inside "market" and "vs" inside a word must not match
        assert_eq!(identify("market overview"), QueryIntent::GeneralInfo);
        assert_eq!(identify("tell me about tvsmotor"), QueryIntent::GeneralInfo);
    }

    #[test]
    fn test_intent_names() {
        assert_eq!(QueryIntent::TopGainers.to_string(), "top_gainers");
        assert_eq!(serde_json::to_value(QueryIntent::PriceSpike).unwrap(), "price_spike");
    }
}
