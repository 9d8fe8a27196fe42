//! Work Item Gateway: query execution and batched detail fetches.
//!
//! The gateway is the only component that talks to the [`WorkItemService`]
//! port for reads. It owns paging (continuation tokens), batch splitting,
//! bounded concurrency, and retry of transient failures.

use std::collections::{BTreeMap, HashSet};

use backlog::{
    ContinuationToken, FieldMap, FieldName, Limits, QueryText, RetryConfig, SyncError, WorkItem,
    WorkItemId, WorkItemService,
};
use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tokio::time::Instant;

use crate::retry::with_retry;

/// Read side of the tracking service, parameterised by limits and retry policy.
pub struct Gateway<'a, S: ?Sized> {
    service: &'a S,
    fields: &'a FieldMap,
    limits: Limits,
    retry: RetryConfig,
}

enum Cursor {
    Start,
    Next(ContinuationToken),
    Done,
}

impl<'a, S> Gateway<'a, S>
where
    S: WorkItemService + ?Sized,
{
    pub fn new(service: &'a S, fields: &'a FieldMap, limits: Limits, retry: RetryConfig) -> Self {
        Self {
            service,
            fields,
            limits,
            retry,
        }
    }

    /// Executes `query` and yields identifiers in the query's own order.
    ///
    /// The stream is lazy: one page is requested at a time, and continuation
    /// tokens are followed until the service stops returning one. It cannot
    /// be restarted; run the query again for a fresh view.
    pub fn run_query<'q>(
        &self,
        query: &'q QueryText,
        deadline: Option<Instant>,
    ) -> BoxStream<'q, Result<WorkItemId, SyncError>>
    where
        'a: 'q,
    {
        let service = self.service;
        let retry = self.retry;

        stream::try_unfold(Cursor::Start, move |cursor| async move {
            let token = match cursor {
                Cursor::Done => return Ok(None),
                Cursor::Start => None,
                Cursor::Next(token) => Some(token),
            };

            let page = with_retry(&retry, deadline, None, "query", || {
                service.query_page(query, token.as_ref())
            })
            .await?;
            tracing::debug!(
                ids = page.ids.len(),
                more = page.continuation.is_some(),
                "Received query page"
            );

            let next = match page.continuation {
                Some(next) if Some(&next) == token.as_ref() => {
                    return Err(SyncError::MalformedResponse {
                        item: None,
                        message: format!("service repeated continuation token '{next}'"),
                    })
                }
                Some(next) => Cursor::Next(next),
                None => Cursor::Done,
            };
            Ok(Some((page.ids, next)))
        })
        .map_ok(|ids| stream::iter(ids.into_iter().map(Ok::<WorkItemId, SyncError>)))
        .try_flatten()
        .boxed()
    }

    /// Drains [`Gateway::run_query`] into a vector.
    pub async fn collect_query(
        &self,
        query: &QueryText,
        deadline: Option<Instant>,
    ) -> Result<Vec<WorkItemId>, SyncError> {
        self.run_query(query, deadline).try_collect().await
    }

    /// Fetches full records for `ids`, keyed by identifier.
    ///
    /// Identifiers are fetched once each, in batches of at most
    /// `limits.batch_size`, with up to `limits.concurrency` batches in flight.
    /// Any batch that fails (after retries) aborts the whole fetch and no
    /// partial map is returned. Identifiers the service no longer knows are
    /// absent from the result.
    pub async fn fetch_details(
        &self,
        ids: &[WorkItemId],
        deadline: Option<Instant>,
    ) -> Result<BTreeMap<WorkItemId, WorkItem>, SyncError> {
        let mut seen = HashSet::with_capacity(ids.len());
        let unique: Vec<WorkItemId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        let fields = self.fields.detail_fields();
        let batch_size = self.limits.batch_size.max(1);

        tracing::debug!(
            ids = unique.len(),
            batches = unique.len().div_ceil(batch_size),
            batch_size,
            "Fetching work item details"
        );

        stream::iter(unique.chunks(batch_size))
            .map(|batch| self.fetch_batch(batch, &fields, deadline))
            .buffer_unordered(self.limits.concurrency.max(1))
            .try_fold(BTreeMap::new(), |mut acc, items| async move {
                acc.extend(items.into_iter().map(|item| (item.id, item)));
                Ok::<_, SyncError>(acc)
            })
            .await
    }

    async fn fetch_batch(
        &self,
        batch: &[WorkItemId],
        fields: &[FieldName],
        deadline: Option<Instant>,
    ) -> Result<Vec<WorkItem>, SyncError> {
        let records = with_retry(&self.retry, deadline, None, "get_batch", || {
            self.service.get_batch(batch, fields)
        })
        .await?;

        let requested: HashSet<WorkItemId> = batch.iter().copied().collect();
        let mut items = Vec::with_capacity(records.len());
        for record in &records {
            if !requested.contains(&record.id) {
                tracing::warn!(id = %record.id, "Ignoring record that was not requested");
                continue;
            }
            items.push(WorkItem::from_record(record, self.fields)?);
        }
        if items.len() < batch.len() {
            tracing::warn!(
                requested = batch.len(),
                returned = items.len(),
                "Service returned fewer records than requested"
            );
        }
        Ok(items)
    }
}
