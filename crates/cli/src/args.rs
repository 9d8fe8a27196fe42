//! Command-line surface.

use std::path::PathBuf;
use std::time::Duration;

use backlog::{Anchor, FieldFilter, QuerySpec, SyncError, WorkItemId};
use clap::{Args, Parser, Subcommand};
use engine::RunOptions;
use tokio::time::Instant;

use crate::config::DEFAULT_CONFIG_FILE;
use crate::telemetry::LogFormat;

#[derive(Parser, Debug)]
#[command(
    name = "backlog-sync",
    version,
    about = "Query and reorder backlog work items in a remote tracking service",
    long_about = None
)]
pub struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Log line format (logs go to stderr; filter with RUST_LOG).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the backlog view in its current order.
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Give up on calls not finished within this many seconds.
        #[arg(long, value_name = "SECS")]
        deadline_secs: Option<u64>,
    },

    /// Move work items to a new position within the backlog view.
    Move {
        /// Work items to move, in the order they should end up.
        #[arg(required = true, value_name = "ID")]
        ids: Vec<WorkItemId>,

        #[command(flatten)]
        anchor: AnchorArgs,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Move every item matching the `--where-*` filters, keeping their
    /// current relative order.
    Reprioritize {
        #[command(flatten)]
        anchor: AnchorArgs,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        subset: SubsetArgs,

        #[command(flatten)]
        run: RunArgs,
    },
}

/// Filters selecting the backlog view (the context set).
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Work item type; repeat for several.
    #[arg(long = "type", value_name = "TYPE")]
    pub types: Vec<String>,

    #[arg(long)]
    pub state: Option<String>,

    /// Iteration path; matches the path and everything under it.
    #[arg(long, value_name = "PATH")]
    pub iteration: Option<String>,

    /// Area path; matches the path and everything under it.
    #[arg(long, value_name = "PATH")]
    pub area: Option<String>,

    /// Tag the item must carry; repeat for several.
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    #[arg(long)]
    pub assignee: Option<String>,

    /// Exact match on any other field.
    #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_field_filter)]
    pub fields: Vec<FieldFilter>,

    /// Sort by this field instead of the configured order field.
    #[arg(long, value_name = "FIELD")]
    pub sort_by: Option<String>,
}

/// Extra filters narrowing the view down to the items to move.
#[derive(Args, Debug, Clone, Default)]
pub struct SubsetArgs {
    #[arg(long = "where-type", id = "where_types", value_name = "TYPE")]
    pub types: Vec<String>,

    #[arg(long = "where-state", id = "where_state", value_name = "STATE")]
    pub state: Option<String>,

    #[arg(long = "where-tag", id = "where_tags", value_name = "TAG")]
    pub tags: Vec<String>,

    #[arg(long = "where-assignee", id = "where_assignee", value_name = "NAME")]
    pub assignee: Option<String>,

    #[arg(
        long = "where-field",
        id = "where_fields",
        value_name = "NAME=VALUE",
        value_parser = parse_field_filter
    )]
    pub fields: Vec<FieldFilter>,
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct AnchorArgs {
    /// Place before the first item of the view.
    #[arg(long)]
    pub top: bool,

    /// Place after the last item of the view.
    #[arg(long)]
    pub bottom: bool,

    /// Place directly after this item.
    #[arg(long, value_name = "ID")]
    pub after: Option<WorkItemId>,

    /// Place directly before this item.
    #[arg(long, value_name = "ID")]
    pub before: Option<WorkItemId>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Compute new order values without patching anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Give up on calls not finished within this many seconds.
    #[arg(long, value_name = "SECS")]
    pub deadline_secs: Option<u64>,
}

impl AnchorArgs {
    pub fn anchor(&self) -> Anchor {
        match (self.after, self.before) {
            (Some(id), _) => Anchor::After(id),
            (_, Some(id)) => Anchor::Before(id),
            _ if self.bottom => Anchor::Bottom,
            _ => Anchor::Top,
        }
    }
}

impl FilterArgs {
    pub fn to_spec(&self, project: &str) -> QuerySpec {
        let mut spec = QuerySpec::new(project).with_types(self.types.clone());
        spec.state = self.state.clone();
        spec.iteration_path = self.iteration.clone();
        spec.area_path = self.area.clone();
        spec.tags = self.tags.clone();
        spec.assignee = self.assignee.clone();
        spec.custom = self.fields.clone();
        spec.sort_by = self.sort_by.clone();
        spec
    }
}

impl SubsetArgs {
    /// Narrows `context` to the subset. Type lists are intersected, tags and
    /// field filters are added, and a state or assignee that contradicts the
    /// context is rejected, so the subset never reaches outside the context.
    pub fn narrow(&self, context: &QuerySpec) -> Result<QuerySpec, SyncError> {
        let mut spec = context.clone();
        if !self.types.is_empty() {
            spec.types = if context.types.is_empty() {
                self.types.clone()
            } else {
                self.types
                    .iter()
                    .filter(|t| context.types.iter().any(|c| c.eq_ignore_ascii_case(t)))
                    .cloned()
                    .collect()
            };
            if spec.types.is_empty() {
                return Err(SyncError::invalid_spec(format!(
                    "--where-type {} is outside the view's types {}",
                    self.types.join(", "),
                    context.types.join(", ")
                )));
            }
        }
        spec.state = pick("state", &context.state, &self.state)?;
        spec.tags.extend(self.tags.iter().cloned());
        spec.assignee = pick("assignee", &context.assignee, &self.assignee)?;
        spec.custom.extend(self.fields.iter().cloned());
        Ok(spec)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.state.is_none()
            && self.tags.is_empty()
            && self.assignee.is_none()
            && self.fields.is_empty()
    }
}

impl RunArgs {
    pub fn options(&self) -> RunOptions {
        RunOptions {
            deadline: deadline_after(self.deadline_secs),
            dry_run: self.dry_run,
        }
    }
}

pub fn deadline_after(secs: Option<u64>) -> Option<Instant> {
    secs.map(|secs| Instant::now() + Duration::from_secs(secs))
}

/// Combines a single-valued view condition with its `--where-*` counterpart.
fn pick(
    name: &str,
    context: &Option<String>,
    subset: &Option<String>,
) -> Result<Option<String>, SyncError> {
    match (context, subset) {
        (Some(view), Some(wanted)) if !view.eq_ignore_ascii_case(wanted) => {
            Err(SyncError::invalid_spec(format!(
                "--where-{name} '{wanted}' conflicts with the view's {name} '{view}'"
            )))
        }
        (Some(view), _) => Ok(Some(view.clone())),
        (None, wanted) => Ok(wanted.clone()),
    }
}

fn parse_field_filter(raw: &str) -> Result<FieldFilter, String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => Ok(FieldFilter {
            field: field.trim().to_string(),
            value: value.to_string(),
        }),
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}
