use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const READ_TIMEOUT: Duration = Duration::from_secs(10);
const TOTAL_TIMEOUT: Duration = Duration::from_secs(60);

/// Expiry status reported by the inventory service.
///
/// The service owns this enumeration and may grow it; values we do not know
/// about decode as [`InventoryStatus::Unknown`] instead of failing the whole
/// snapshot.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryStatus {
    Ok,
    NearExpiry,
    Expired,

    #[serde(other)]
    Unknown,
}

/// One record of the inventory snapshot, as returned by the service.
///
/// Everything except `id` and `status` is display material and may be absent.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub id: i64,
    pub status: InventoryStatus,

    #[serde(default)]
    pub product_name: Option<String>,

    #[serde(default)]
    pub batch_number: Option<String>,

    #[serde(default)]
    pub expiry_date: Option<String>,

    #[serde(default)]
    pub days_until_expiry: Option<i64>,
}

impl InventoryRecord {
    /// Parse `expiryDate` as an RFC 3339 timestamp or a plain `YYYY-MM-DD`
    /// date (assumed UTC midnight).
    pub fn parsed_expiry_date(&self) -> Option<OffsetDateTime> {
        static DATE_ONLY: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

        let raw = self.expiry_date.as_deref()?;

        if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
            return Some(parsed);
        }

        Date::parse(raw, DATE_ONLY)
            .ok()
            .map(|date| date.midnight().assume_utc())
    }
}

pub struct InventoryClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl InventoryClient {
    pub fn new(endpoint: Url) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .timeout(TOTAL_TIMEOUT)
            .build()
            .context("could not create an HTTP client")?;

        Ok(Self { http, endpoint })
    }

    /// Fetch the complete inventory snapshot in a single bulk read.
    pub async fn get_all(&self) -> Result<Vec<InventoryRecord>> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(Into::into)
            .and_then(|r| r.error_for_status().context("server returned an error"))
            .with_context(|| anyhow!("could not fetch `{}`", self.endpoint))?;

        response
            .json::<Vec<InventoryRecord>>()
            .await
            .with_context(|| {
                anyhow!(
                    "could not decode the inventory snapshot from `{}`",
                    self.endpoint
                )
            })
    }
}
