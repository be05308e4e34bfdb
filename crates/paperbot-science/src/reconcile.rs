use paperbot_core::config::ReconcileConfig;
use paperbot_core::models::ArticleRecord;
use paperbot_core::storage::RecordStore;
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::Result;

/// Second pass over the retry list.
pub struct Reconciler<'a> {
    dispatcher: &'a Dispatcher,
    store: &'a RecordStore,
    skip_domains: Vec<String>,
    skip_pdf: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(dispatcher: &'a Dispatcher, store: &'a RecordStore, config: &ReconcileConfig) -> Self {
        Self {
            dispatcher,
            store,
            skip_domains: config.skip_domains.clone(),
            skip_pdf: config.skip_pdf,
        }
    }

    /// URLs that are never attempted again. They stay on the list.
    pub fn is_skipped(&self, url: &str) -> bool {
        (self.skip_pdf && url.contains(".pdf")) || self.skip_domains.iter().any(|d| url.contains(d.as_str()))
    }

    /// Retry every listed URL once and rewrite the list with what still fails.
    /// Errors are logged, never returned.
    pub async fn reconcile(&self) -> Vec<ArticleRecord> {
        match self.try_reconcile().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "reconcile: retry list could not be processed");
                Vec::new()
            }
        }
    }

    /// A URL leaves the list once extraction returns a saved record, even one
    /// still lacking an abstract; only a found DOI is required here.
    pub async fn try_reconcile(&self) -> Result<Vec<ArticleRecord>> {
        let retry = self.dispatcher.retry_list();
        let pending = retry.pending()?;
        if pending.is_empty() {
            info!("reconcile: retry list is empty");
            return Ok(Vec::new());
        }
        info!(count = pending.len(), "reconcile: retrying links");

        let mut urls: Vec<&String> = pending.iter().collect();
        urls.sort();

        let mut outstanding = pending.clone();
        let mut records = Vec::new();
        for url in urls {
            if self.is_skipped(url) {
                continue;
            }
            match self.dispatcher.extract_unrecorded(url, None).await {
                Ok(record) => match self.store.save(&record) {
                    Ok(path) => {
                        info!(url = %url, path = %path.display(), "reconcile: recovered");
                        outstanding.remove(url.as_str());
                        records.push(record);
                    }
                    Err(e) => warn!(url = %url, error = %e, "reconcile: could not save record"),
                },
                Err(failure) => info!(url = %url, "reconcile: still failing: {failure}"),
            }
        }

        retry.rewrite(&outstanding)?;
        info!(recovered = records.len(), remaining = outstanding.len(), "reconcile: done");
        Ok(records)
    }
}
