//! IEX Cloud client
//!
//! Thin HTTP wrapper over the IEX Cloud chart endpoints, one client per
//! symbol. The sandbox and production environments use different subdomains
//! and different tokens; the caller picks at construction time. The token is
//! sent as a query parameter and is never logged.
//!
//! Message accounting: IEX reports the actual charge for each call in the
//! `iexcloud-messages-used` response header. When the header is missing or
//! unparseable we fall back to the published per-date weight so the ledger
//! never undercounts silently to zero.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    DailyCloseProvider, FetchOutcome, HistoricalRange, ProviderError, ProviderResult, RangeFetch,
};
use crate::series::DailySeries;

const CLOUD_BASE_URL: &str = "https://cloud.iexapis.com/v1";
const SANDBOX_BASE_URL: &str = "https://sandbox.iexapis.com/v1";

/// Message header carrying the actual charge for a call.
const MESSAGES_USED_HEADER: &str = "iexcloud-messages-used";

/// Published message weight of one adjusted close data point.
pub(super) const ADJUSTED_CLOSE_WEIGHT: u64 = 2;

/// Published message weight of one quote.
const QUOTE_WEIGHT: u64 = 1;

/// Published message weight of one region symbol listing request.
const REGION_SYMBOLS_WEIGHT: u64 = 100;

/// One point of a `chartCloseOnly` response. IEX returns `null` closes for
/// some thinly traded days; those rows carry no usable price.
#[derive(Debug, Deserialize)]
struct ChartPoint {
    date: NaiveDate,
    close: Option<Decimal>,
}

/// Subset of the quote endpoint used for spot checks.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub latest_price: Option<Decimal>,
    pub change_percent: Option<Decimal>,
    #[serde(rename = "isUSMarketOpen")]
    pub is_us_market_open: Option<bool>,
    pub latest_time: Option<String>,
}

/// Quote plus the message charge the call incurred.
#[derive(Debug)]
pub struct QuoteFetch {
    pub quote: Quote,
    pub cost: u64,
}

/// One entry of a region's symbol reference list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolListing {
    pub symbol: String,
    pub name: String,
}

/// Region symbol reference list plus the message charge.
#[derive(Debug)]
pub struct SymbolsFetch {
    pub listings: Vec<SymbolListing>,
    pub cost: u64,
}

/// IEX Cloud daily close provider for a single symbol.
pub struct IexClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    symbol: String,
}

impl IexClient {
    pub fn new(symbol: impl Into<String>, token: impl Into<String>, sandbox: bool) -> Self {
        let base_url = if sandbox {
            SANDBOX_BASE_URL
        } else {
            CLOUD_BASE_URL
        };
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.to_string(),
            token: token.into(),
            symbol: symbol.into(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// GET a path under the base URL with the token attached, mapping HTTP
    /// failures into provider errors. Returns the response headers alongside
    /// the body so callers can read the message charge.
    async fn get(&self, path: &str) -> ProviderResult<(HeaderMap, String)> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "iex request");

        let response = self
            .http
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        match status {
            s if s.is_success() => Ok((headers, body)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(
                ProviderError::Authentication(format!("status {status}: {body}")),
            ),
            s => Err(ProviderError::Status {
                status: s.as_u16(),
                body,
            }),
        }
    }

    /// Actual message charge from the response headers, falling back to
    /// `fallback` when IEX omits the header (the sandbox sometimes does).
    fn messages_used(headers: &HeaderMap, fallback: u64) -> u64 {
        match headers
            .get(MESSAGES_USED_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
        {
            Some(used) => used,
            None => {
                warn!(
                    fallback,
                    "missing {MESSAGES_USED_HEADER} header, using estimated cost"
                );
                fallback
            }
        }
    }

    fn parse_chart(body: &str) -> ProviderResult<Vec<ChartPoint>> {
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))
    }

    fn range_chart_path(symbol: &str, range: HistoricalRange) -> String {
        format!(
            "stock/{symbol}/chart/{}?chartCloseOnly=true",
            range.path_segment()
        )
    }

    /// `chartByDay` already returns both adjusted and unadjusted closes, so
    /// `chartCloseOnly` is not added here.
    fn date_chart_path(symbol: &str, date: NaiveDate) -> String {
        format!(
            "stock/{symbol}/chart/date/{}?chartByDay=true",
            date.format("%Y%m%d")
        )
    }

    /// Latest quote for the client's symbol, with the message charge.
    pub async fn fetch_quote(&self) -> ProviderResult<QuoteFetch> {
        let (headers, body) = self.get(&format!("stock/{}/quote", self.symbol)).await?;
        let quote =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;
        let cost = Self::messages_used(&headers, QUOTE_WEIGHT);
        Ok(QuoteFetch { quote, cost })
    }

    /// Symbol reference list for a region (e.g. `us`). Not bound to the
    /// client's symbol.
    pub async fn fetch_region_symbols(&self, region: &str) -> ProviderResult<SymbolsFetch> {
        let (headers, body) = self
            .get(&format!("ref-data/region/{region}/symbols"))
            .await?;
        let listings: Vec<SymbolListing> =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;
        let cost = Self::messages_used(&headers, REGION_SYMBOLS_WEIGHT);
        debug!(region, listings = listings.len(), cost, "fetched symbol list");
        Ok(SymbolsFetch { listings, cost })
    }
}

#[async_trait]
impl DailyCloseProvider for IexClient {
    fn estimated_date_cost(&self) -> u64 {
        ADJUSTED_CLOSE_WEIGHT
    }

    async fn fetch_range(&self, range: HistoricalRange) -> ProviderResult<RangeFetch> {
        let path = Self::range_chart_path(&self.symbol, range);
        let (headers, body) = self.get(&path).await?;
        let points = Self::parse_chart(&body)?;

        let series: DailySeries = points
            .into_iter()
            .filter_map(|p| p.close.map(|close| (p.date, close)))
            .collect();
        let cost = Self::messages_used(&headers, range.estimated_message_cost());

        debug!(
            symbol = %self.symbol,
            %range,
            rows = series.len(),
            cost,
            "fetched range"
        );
        Ok(RangeFetch { series, cost })
    }

    async fn fetch_date(&self, date: NaiveDate) -> ProviderResult<FetchOutcome> {
        let path = Self::date_chart_path(&self.symbol, date);
        let (headers, body) = self.get(&path).await?;
        let points = Self::parse_chart(&body)?;
        let cost = Self::messages_used(&headers, ADJUSTED_CLOSE_WEIGHT);

        // An empty array is a valid "no data for this day" answer, as is a
        // row with a null close.
        match points.into_iter().find_map(|p| p.close) {
            Some(value) => Ok(FetchOutcome::Close { value, cost }),
            None => {
                debug!(symbol = %self.symbol, %date, "no close for date");
                Ok(FetchOutcome::NoData { cost })
            }
        }
    }
}
