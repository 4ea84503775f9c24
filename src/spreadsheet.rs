use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, warn};

use crate::error::{ContentError, Result};
use crate::workbook::{RowRecord, Workbook};

/// Anything that can hand out the rows of a named sheet.
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn fetch_sheet(&self, sheet_name: &str) -> Result<Vec<RowRecord>>;
}

/// Reads sheets out of a workbook published at a fixed URL.
///
/// Every call downloads the whole workbook again; memoization is the
/// content cache's job.
#[derive(Clone, Debug)]
pub struct HttpSheetSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpSheetSource {
    pub fn new(url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn download(&self) -> Result<Vec<u8>> {
        debug!("Fetch {}", self.url);
        let bytes = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        debug!("Downloaded workbook, {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SheetSource for HttpSheetSource {
    async fn fetch_sheet(&self, sheet_name: &str) -> Result<Vec<RowRecord>> {
        let bytes = self.download().await?;
        let workbook = Workbook::from_bytes(&bytes)?;
        match workbook.sheet(sheet_name) {
            Some(sheet) => Ok(sheet.rows()),
            None => {
                warn!(
                    "Sheet {} not in workbook (have {:?})",
                    sheet_name,
                    workbook.sheet_names()
                );
                Err(ContentError::SheetNotFound(sheet_name.to_string()))
            }
        }
    }
}
