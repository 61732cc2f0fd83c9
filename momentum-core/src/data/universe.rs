//! Symbol lists: where the tickers to screen come from.
//!
//! Every source's output goes through [`normalize_symbols`]: trimmed,
//! blanks dropped, `.` rewritten to `-` (`BRK.B` → `BRK-B`, the form the
//! price provider expects) and deduplicated with first-occurrence order.

use super::provider::DataError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const SP500_URL: &str = "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies";

/// A provider of ticker symbols.
pub trait SymbolSource: Send + Sync {
    fn name(&self) -> &str;

    /// Normalized, deduplicated symbols in source order.
    fn symbols(&self) -> Result<Vec<String>, DataError>;
}

/// Normalize a single raw ticker.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.replace('.', "-"))
}

/// Normalize and dedupe, keeping the first occurrence of each symbol.
pub fn normalize_symbols<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter_map(|s| normalize_symbol(s.as_ref()))
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Sector-organized ticker lists, stored as TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Universe {
    pub sectors: BTreeMap<String, Vec<String>>,
}

impl Universe {
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, DataError> {
        toml::from_str(content)
            .map_err(|e| DataError::SymbolListUnavailable(format!("parse universe TOML: {e}")))
    }

    /// All tickers, sector by sector (sectors in name order).
    pub fn all_tickers(&self) -> Vec<&str> {
        self.sectors
            .values()
            .flat_map(|tickers| tickers.iter().map(|t| t.as_str()))
            .collect()
    }

    /// A small built-in US large-cap universe.
    pub fn default_us() -> Self {
        let sectors: [(&str, &[&str]); 6] = [
            (
                "Technology",
                &["AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "AVGO", "CRM", "ADBE", "ORCL"],
            ),
            ("Healthcare", &["JNJ", "UNH", "PFE", "ABBV", "MRK", "LLY", "TMO", "ABT"]),
            (
                "Finance",
                &["JPM", "BAC", "WFC", "GS", "MS", "BLK", "SCHW", "C", "AXP", "BRK.B"],
            ),
            ("Energy", &["XOM", "CVX", "COP", "SLB", "EOG", "MPC", "PSX", "VLO"]),
            (
                "Consumer",
                &["WMT", "PG", "KO", "PEP", "COST", "HD", "MCD", "NKE", "SBUX", "TGT"],
            ),
            ("ETFs", &["SPY", "QQQ", "IWM", "DIA", "XLF", "XLE", "XLK", "XLV"]),
        ];

        Self {
            sectors: sectors
                .into_iter()
                .map(|(name, tickers)| {
                    (
                        name.to_string(),
                        tickers.iter().map(|t| t.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl SymbolSource for Universe {
    fn name(&self) -> &str {
        "universe"
    }

    fn symbols(&self) -> Result<Vec<String>, DataError> {
        Ok(normalize_symbols(self.all_tickers()))
    }
}

/// Plain-text symbol list: one ticker per line, `#` starts a comment.
#[derive(Debug, Clone)]
pub struct SymbolFile {
    path: PathBuf,
}

impl SymbolFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn parse(content: &str) -> Vec<String> {
        normalize_symbols(
            content
                .lines()
                .map(|line| line.split('#').next().unwrap_or_default()),
        )
    }
}

impl SymbolSource for SymbolFile {
    fn name(&self) -> &str {
        "file"
    }

    fn symbols(&self) -> Result<Vec<String>, DataError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            DataError::SymbolListUnavailable(format!("{}: {e}", self.path.display()))
        })?;
        Ok(Self::parse(&content))
    }
}

/// S&P 500 constituents scraped from Wikipedia.
pub struct WikipediaSp500 {
    client: reqwest::blocking::Client,
    url: String,
}

impl WikipediaSp500 {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("momentum-screener/0.1")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: SP500_URL.to_string(),
        })
    }

    /// First cell of every body row in the `constituents` table.
    pub fn parse_constituents(html: &str) -> Result<Vec<String>, DataError> {
        let start = html.find("id=\"constituents\"").ok_or_else(|| {
            DataError::ResponseFormatChanged("constituents table not found".into())
        })?;
        let table = &html[start..];
        let table = &table[..table.find("</table>").unwrap_or(table.len())];

        let mut raw = Vec::new();
        for row in table.split("<tr").skip(1) {
            let Some(cell_start) = row.find("<td") else {
                continue; // header row
            };
            let cell = &row[cell_start..];
            let Some(open_end) = cell.find('>') else {
                continue;
            };
            let body = &cell[open_end + 1..];
            let body = &body[..body.find("</td>").unwrap_or(body.len())];
            raw.push(decode_entities(&strip_tags(body)));
        }

        let symbols = normalize_symbols(raw);
        if symbols.is_empty() {
            return Err(DataError::ResponseFormatChanged(
                "constituents table has no rows".into(),
            ));
        }
        Ok(symbols)
    }
}

impl SymbolSource for WikipediaSp500 {
    fn name(&self) -> &str {
        "wikipedia_sp500"
    }

    fn symbols(&self) -> Result<Vec<String>, DataError> {
        debug!(url = %self.url, "fetching S&P 500 constituents");
        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(DataError::SymbolListUnavailable(format!(
                "HTTP {} from {}",
                resp.status(),
                self.url
            )));
        }
        let html = resp
            .text()
            .map_err(|e| DataError::ResponseFormatChanged(e.to_string()))?;
        Self::parse_constituents(&html)
    }
}

fn strip_tags(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_rewrites_dots_and_dedupes() {
        let got = normalize_symbols(["BRK.B", " AAPL ", "", "BRK-B", "AAPL", "BF.B"]);
        assert_eq!(got, vec!["BRK-B", "AAPL", "BF-B"]);
    }

    #[test]
    fn default_universe_is_normalized() {
        let symbols = Universe::default_us().symbols().unwrap();
        assert!(symbols.contains(&"BRK-B".to_string()));
        assert!(symbols.contains(&"SPY".to_string()));
        assert!(symbols.len() > 30);
    }

    #[test]
    fn universe_toml_lists_sectors_in_name_order() {
        let u = Universe::from_toml(
            "[sectors]\nTech = [\"AAPL\", \"MSFT\"]\nETFs = [\"SPY\", \"AAPL\"]\n",
        )
        .unwrap();
        assert_eq!(u.all_tickers(), vec!["SPY", "AAPL", "AAPL", "MSFT"]);
        assert_eq!(u.symbols().unwrap(), vec!["SPY", "AAPL", "MSFT"]);
        assert!(Universe::from_toml("sectors = 3").is_err());
    }

    #[test]
    fn symbol_file_skips_comments_and_blanks() {
        let got = SymbolFile::parse("# watchlist\nAAPL\n\nbrk.b # berkshire\nAAPL\n");
        assert_eq!(got, vec!["AAPL", "brk-b"]);
    }

    #[test]
    fn symbol_file_missing_is_unavailable() {
        let err = SymbolFile::new("/definitely/not/here.txt").symbols().unwrap_err();
        assert!(matches!(err, DataError::SymbolListUnavailable(_)));
    }

    #[test]
    fn parses_constituents_table() {
        let html = r#"
            <table class="wikitable"><tr><td>IGNORED</td></tr></table>
            <table class="wikitable sortable" id="constituents">
            <tbody><tr><th>Symbol</th><th>Security</th></tr>
            <tr>
            <td><a rel="nofollow" class="external text" href="https://www.nyse.com/quote/XNYS:MMM">MMM</a></td>
            <td><a href="/wiki/3M">3M</a></td></tr>
            <tr><td><a class="external text" href="x">BRK.B</a>
            </td><td>Berkshire Hathaway</td></tr>
            <tr><td>AT&amp;T</td><td>weird</td></tr>
            </tbody></table>
            <table><tr><td>AFTER</td></tr></table>"#;
        let got = WikipediaSp500::parse_constituents(html).unwrap();
        assert_eq!(got, vec!["MMM", "BRK-B", "AT&T"]);
    }

    #[test]
    fn missing_constituents_table_is_format_change() {
        let err = WikipediaSp500::parse_constituents("<html></html>").unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }
}
