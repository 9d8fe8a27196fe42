//! The backlog sync workflow.
//!
//! Control flow for one invocation:
//!
//! ```text
//! QuerySpec ──► QueryBuilder ──► Gateway::collect_query ──► Gateway::fetch_details
//!                                                                   │
//!             SyncReport ◄── UpdateBatcher ◄── OrderResolver ◄──────┘
//! ```
//!
//! The renumber phase, when the resolver asks for one, is a strict
//! sequencing point: every renumber patch must be applied before any
//! placement patch is dispatched, because placements are computed against
//! the renumbered values.

use std::collections::BTreeMap;

use backlog::{
    Anchor, ContextEntry, OrderResolver, QueryBuilder, QuerySpec, ReorderIntent, SyncConfig,
    SyncError, SyncRunId, WorkItem, WorkItemId, WorkItemService,
};
use tokio::time::Instant;
use tracing::Instrument;

use crate::batcher::UpdateBatcher;
use crate::gateway::Gateway;
use crate::report::SyncReport;

/// Per-invocation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Overall deadline. Calls not yet issued when it passes are skipped and
    /// in-flight calls are cancelled; already-applied patches stay applied.
    pub deadline: Option<Instant>,
    /// Resolve new values without patching anything.
    pub dry_run: bool,
}

/// Entry point tying the query builder, gateway, resolver and batcher together.
pub struct BacklogSync<S> {
    service: S,
    config: SyncConfig,
    builder: QueryBuilder,
    resolver: OrderResolver,
}

impl<S> BacklogSync<S>
where
    S: WorkItemService,
{
    /// Creates an engine over `service`, rejecting an invalid `config`.
    pub fn new(service: S, config: SyncConfig) -> Result<Self, SyncError> {
        config.validate()?;
        Ok(Self {
            builder: QueryBuilder::new(config.fields.clone()),
            resolver: OrderResolver::new(config.ordering),
            service,
            config,
        })
    }

    /// Restricts custom query filters and sort keys to `allowed` field names.
    pub fn with_allowed_fields<I, T>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.builder = self.builder.with_allowed_fields(allowed);
        self
    }

    /// The configuration this engine runs with.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The tracking service this engine talks to.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Read-side gateway over the configured service.
    pub fn gateway(&self) -> Gateway<'_, S> {
        Gateway::new(
            &self.service,
            &self.config.fields,
            self.config.limits,
            self.config.retry,
        )
    }

    /// Write-side batcher over the configured service.
    pub fn batcher(&self) -> UpdateBatcher<'_, S> {
        UpdateBatcher::new(
            &self.service,
            self.config.retry,
            self.config.limits.concurrency,
        )
    }

    /// Lists the backlog view selected by `spec`, in view order.
    pub async fn list(
        &self,
        spec: &QuerySpec,
        options: &RunOptions,
    ) -> Result<Vec<WorkItem>, SyncError> {
        let run_id = SyncRunId::new_random();
        let span = tracing::info_span!("list", run_id = %run_id, project = %spec.project);
        async {
            let (ids, mut details) = self.load_view(spec, options).await?;
            Ok(ids.iter().filter_map(|id| details.remove(id)).collect())
        }
        .instrument(span)
        .await
    }

    /// Moves `intent.targets` to `intent.anchor` within the view selected by
    /// `spec`.
    pub async fn reorder(
        &self,
        spec: &QuerySpec,
        intent: &ReorderIntent,
        options: &RunOptions,
    ) -> Result<SyncReport, SyncError> {
        let run_id = SyncRunId::new_random();
        let span = tracing::info_span!(
            "reorder",
            run_id = %run_id,
            project = %spec.project,
            anchor = %intent.anchor,
            moved = intent.targets.len()
        );
        async {
            backlog::order::check_targets(&intent.targets)?;
            let (ids, details) = self.load_view(spec, options).await?;
            self.resolve_and_apply(run_id, &ids, &details, intent, options)
                .await
        }
        .instrument(span)
        .await
    }

    /// Bulk reprioritisation: every item matched by `subset` (in its current
    /// order) moves to `anchor` within the view selected by `context`.
    pub async fn reprioritize(
        &self,
        context: &QuerySpec,
        subset: &QuerySpec,
        anchor: Anchor,
        options: &RunOptions,
    ) -> Result<SyncReport, SyncError> {
        let run_id = SyncRunId::new_random();
        let span = tracing::info_span!(
            "reprioritize",
            run_id = %run_id,
            project = %context.project,
            anchor = %anchor
        );
        async {
            let subset_query = self.builder.build(subset)?;
            let targets = self
                .gateway()
                .collect_query(&subset_query, options.deadline)
                .await?;
            tracing::info!(matched = targets.len(), "Resolved bulk reprioritisation subset");

            let intent = ReorderIntent::new(targets, anchor);
            backlog::order::check_targets(&intent.targets)?;
            let (ids, details) = self.load_view(context, options).await?;
            self.resolve_and_apply(run_id, &ids, &details, &intent, options)
                .await
        }
        .instrument(span)
        .await
    }

    async fn load_view(
        &self,
        spec: &QuerySpec,
        options: &RunOptions,
    ) -> Result<(Vec<WorkItemId>, BTreeMap<WorkItemId, WorkItem>), SyncError> {
        let query = self.builder.build(spec)?;
        let gateway = self.gateway();
        let ids = gateway.collect_query(&query, options.deadline).await?;
        let details = gateway.fetch_details(&ids, options.deadline).await?;
        tracing::info!(
            matched = ids.len(),
            fetched = details.len(),
            "Loaded backlog view"
        );
        Ok((ids, details))
    }

    async fn resolve_and_apply(
        &self,
        run_id: SyncRunId,
        ids: &[WorkItemId],
        details: &BTreeMap<WorkItemId, WorkItem>,
        intent: &ReorderIntent,
        options: &RunOptions,
    ) -> Result<SyncReport, SyncError> {
        let mut missing = Vec::new();
        let mut context = Vec::with_capacity(ids.len());
        for id in ids {
            match details.get(id) {
                Some(item) => context.push(ContextEntry::new(*id, item.order)),
                None => missing.push(*id),
            }
        }
        if !missing.is_empty() {
            tracing::warn!(
                missing = ?missing,
                "Work items vanished between query and fetch; left out of the ordering context"
            );
        }

        let resolution = self.resolver.resolve(&context, intent)?;
        let order_field = &self.config.fields.order;

        if resolution.is_renumber() {
            tracing::warn!(
                renumbered = resolution.renumbered.as_ref().map_or(0, Vec::len),
                "Reorder requires renumbering items that were not asked to move"
            );
        }

        if options.dry_run {
            return Ok(SyncReport {
                run_id,
                resolution,
                missing,
                renumber: None,
                placement: None,
                dry_run: true,
            });
        }

        let batcher = self.batcher();
        let renumber_ops = resolution.renumber_patches(order_field);
        let renumber = if resolution.is_renumber() && !renumber_ops.is_empty() {
            let report = batcher.apply(renumber_ops, options.deadline).await;
            if !report.all_applied() {
                tracing::error!(
                    failed = report.failed().len(),
                    cancelled = report.cancelled().len(),
                    "Renumber phase incomplete; placement not dispatched"
                );
                return Ok(SyncReport {
                    run_id,
                    resolution,
                    missing,
                    renumber: Some(report),
                    placement: None,
                    dry_run: false,
                });
            }
            Some(report)
        } else {
            None
        };

        let placement = batcher
            .apply(resolution.placement_patches(order_field), options.deadline)
            .await;

        Ok(SyncReport {
            run_id,
            resolution,
            missing,
            renumber,
            placement: Some(placement),
            dry_run: false,
        })
    }
}
