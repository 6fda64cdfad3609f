//! Reading every page of a query job's results.

use tracing::{debug, instrument};

use crate::client::BulkApiClient;
use crate::error::Result;

impl BulkApiClient {
    /// Follow the `Sforce-Locator` chain and return the whole result table.
    ///
    /// The table has exactly one header row, followed by data rows in the
    /// order the server returned them. If any page fails, the whole read
    /// fails and rows fetched so far are discarded.
    #[instrument(skip(self))]
    pub async fn collect_query_results(&self, job_id: &str) -> Result<Vec<Vec<String>>> {
        let mut table: Vec<Vec<String>> = Vec::new();
        let mut locator: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.get_query_results(job_id, locator.as_deref()).await?;
            pages += 1;

            let mut rows = page.rows.into_iter();
            if !table.is_empty() {
                // header already taken from an earlier page
                rows.next();
            }
            table.extend(rows);

            match page.locator {
                Some(next) => locator = Some(next),
                None => break,
            }
        }

        debug!(job_id, pages, rows = table.len(), "query results collected");
        Ok(table)
    }
}
