//! In-memory tracking service used by the engine integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use backlog::{
    ContinuationToken, FieldChange, FieldName, QueryPage, QueryText, RetryConfig, ServiceError,
    SyncConfig, WorkItemId, WorkItemRecord, WorkItemService,
};
use serde_json::{json, Map};

pub const ORDER_FIELD: &str = "Microsoft.VSTS.Common.StackRank";

pub fn id(n: u64) -> WorkItemId {
    WorkItemId::new(n).unwrap()
}

/// Config with near-zero back-off so retry paths run quickly.
pub fn fast_config() -> SyncConfig {
    let mut config = SyncConfig::default();
    config.retry = RetryConfig {
        max_retries: 3,
        initial_backoff_ms: 1,
        max_backoff_ms: 2,
    };
    config
}

#[derive(Default)]
struct State {
    orders: BTreeMap<WorkItemId, Option<f64>>,
    query_calls: usize,
    batch_calls: Vec<Vec<WorkItemId>>,
    patch_calls: Vec<(WorkItemId, Vec<FieldChange>)>,
}

/// Fake service. Queries return every item in rank order unless a subset
/// rule matches the query text.
#[derive(Default)]
pub struct FakeService {
    state: Mutex<State>,
    page_size: Option<usize>,
    subsets: Vec<(String, Vec<WorkItemId>)>,
    patch_failures: HashMap<WorkItemId, u16>,
    batch_failure: Option<u16>,
    batch_delay: Option<Duration>,
    hidden: HashSet<WorkItemId>,
    stuck_token: bool,
}

impl FakeService {
    pub fn with_items(items: &[(u64, f64)]) -> Self {
        let service = Self::default();
        {
            let mut state = service.state.lock().unwrap();
            for (n, order) in items {
                state.orders.insert(id(*n), Some(*order));
            }
        }
        service
    }

    pub fn with_unranked(self, n: u64) -> Self {
        self.state.lock().unwrap().orders.insert(id(n), None);
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn subset(mut self, needle: &str, ids: &[u64]) -> Self {
        self.subsets
            .push((needle.to_string(), ids.iter().map(|n| id(*n)).collect()));
        self
    }

    pub fn fail_patch(mut self, n: u64, status: u16) -> Self {
        self.patch_failures.insert(id(n), status);
        self
    }

    pub fn fail_batches(mut self, status: u16) -> Self {
        self.batch_failure = Some(status);
        self
    }

    /// Every batch fetch waits `delay` before answering.
    pub fn slow_batches(mut self, delay: Duration) -> Self {
        self.batch_delay = Some(delay);
        self
    }

    /// Queries still match `n`, but batch fetches no longer return it, as if
    /// it were deleted between the two calls.
    pub fn hide_from_batch(mut self, n: u64) -> Self {
        self.hidden.insert(id(n));
        self
    }

    /// Every query page hands back the same continuation token.
    pub fn stuck_continuation(mut self) -> Self {
        self.stuck_token = true;
        self
    }

    pub fn order_of(&self, n: u64) -> Option<f64> {
        self.state.lock().unwrap().orders.get(&id(n)).copied().flatten()
    }

    pub fn query_calls(&self) -> usize {
        self.state.lock().unwrap().query_calls
    }

    pub fn batch_calls(&self) -> Vec<Vec<WorkItemId>> {
        self.state.lock().unwrap().batch_calls.clone()
    }

    /// Identifiers in the order their patch calls arrived (including failures).
    pub fn patched(&self) -> Vec<WorkItemId> {
        self.state
            .lock()
            .unwrap()
            .patch_calls
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    fn ranked_ids(state: &State) -> Vec<WorkItemId> {
        let mut ids: Vec<(WorkItemId, Option<f64>)> =
            state.orders.iter().map(|(id, o)| (*id, *o)).collect();
        ids.sort_by(|(ia, a), (ib, b)| match (a, b) {
            (Some(a), Some(b)) => a.total_cmp(b).then(ia.cmp(ib)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => ia.cmp(ib),
        });
        ids.into_iter().map(|(id, _)| id).collect()
    }

    fn record(id: WorkItemId, order: Option<f64>) -> WorkItemRecord {
        let mut fields = Map::new();
        fields.insert("System.WorkItemType".into(), json!("Task"));
        fields.insert("System.Title".into(), json!(format!("Item {id}")));
        fields.insert("System.State".into(), json!("New"));
        if let Some(order) = order {
            fields.insert(ORDER_FIELD.into(), json!(order));
        }
        WorkItemRecord {
            id,
            revision: Some(1),
            fields,
        }
    }
}

#[async_trait]
impl WorkItemService for FakeService {
    async fn query_page(
        &self,
        query: &QueryText,
        continuation: Option<&ContinuationToken>,
    ) -> Result<QueryPage, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.query_calls += 1;

        let all = match self
            .subsets
            .iter()
            .find(|(needle, _)| query.as_str().contains(needle.as_str()))
        {
            Some((_, subset)) => Self::ranked_ids(&state)
                .into_iter()
                .filter(|id| subset.contains(id))
                .collect(),
            None => Self::ranked_ids(&state),
        };

        let size = self.page_size.unwrap_or(usize::MAX);
        if self.stuck_token {
            return Ok(QueryPage {
                ids: all.into_iter().take(size).collect(),
                continuation: ContinuationToken::new("stuck"),
            });
        }

        let offset: usize = continuation
            .map(|t| t.as_str().parse().unwrap())
            .unwrap_or(0);
        let end = offset.saturating_add(size).min(all.len());
        let continuation = (end < all.len())
            .then(|| ContinuationToken::new(end.to_string()))
            .flatten();

        Ok(QueryPage {
            ids: all[offset..end].to_vec(),
            continuation,
        })
    }

    async fn get_batch(
        &self,
        ids: &[WorkItemId],
        _fields: &[FieldName],
    ) -> Result<Vec<WorkItemRecord>, ServiceError> {
        if let Some(delay) = self.batch_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state.batch_calls.push(ids.to_vec());
        if let Some(status) = self.batch_failure {
            return Err(ServiceError::Status {
                status,
                message: "batch failure".into(),
                retry_after: None,
            });
        }
        Ok(ids
            .iter()
            .filter(|id| !self.hidden.contains(id))
            .filter_map(|id| state.orders.get(id).map(|o| Self::record(*id, *o)))
            .collect())
    }

    async fn patch_item(
        &self,
        id: WorkItemId,
        changes: &[FieldChange],
    ) -> Result<WorkItemRecord, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.patch_calls.push((id, changes.to_vec()));
        if let Some(status) = self.patch_failures.get(&id) {
            return Err(ServiceError::Status {
                status: *status,
                message: format!("patch of {id} failed"),
                retry_after: None,
            });
        }
        for change in changes {
            if change.field.as_str() == ORDER_FIELD {
                let value = change.value.as_f64();
                state.orders.insert(id, value);
            }
        }
        let order = state.orders.get(&id).copied().flatten();
        Ok(Self::record(id, order))
    }
}
