//! Query Builder: turns a [`QuerySpec`] into query-language text.
//!
//! The emitted text always selects the identifier, type, title, state and
//! order fields and nothing else; callers that need more fields use a detail
//! fetch. Literal values are single-quoted with embedded quotes doubled, so
//! any input is representable and none can break out of its literal.
//!
//! ```text
//! SELECT [System.Id], [System.WorkItemType], [System.Title], [System.State], [Microsoft.VSTS.Common.StackRank]
//! FROM WorkItems
//! WHERE [System.TeamProject] = 'Fabrikam' AND [System.WorkItemType] IN ('Bug', 'User Story')
//! ORDER BY [Microsoft.VSTS.Common.StackRank] ASC, [System.Id] ASC
//! ```

use std::collections::BTreeSet;

use crate::config::FieldMap;
use crate::{QuerySpec, SyncError};

/// Query text ready to hand to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryText(String);

impl QueryText {
    /// Returns the query as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueryText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builds query text against a fixed field mapping.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    fields: FieldMap,
    allowed: Option<BTreeSet<String>>,
}

impl QueryBuilder {
    /// Creates a builder that accepts any syntactically valid custom field.
    pub fn new(fields: FieldMap) -> Self {
        Self {
            fields,
            allowed: None,
        }
    }

    /// Restricts custom filters and sort keys to `allowed` field names.
    ///
    /// The mapped built-in fields are always permitted.
    pub fn with_allowed_fields<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(allowed.into_iter().map(Into::into).collect());
        self
    }

    /// Builds the list query for `spec`.
    pub fn build(&self, spec: &QuerySpec) -> Result<QueryText, SyncError> {
        if spec.project.trim().is_empty() {
            return Err(SyncError::invalid_spec("project must not be empty"));
        }

        let f = &self.fields;
        let select = [
            &f.id,
            &f.work_item_type,
            &f.title,
            &f.state,
            &f.order,
        ]
        .iter()
        .map(|name| field_ref(name.as_str()))
        .collect::<Result<Vec<_>, _>>()?
        .join(", ");

        let mut clauses = vec![format!(
            "{} = {}",
            field_ref(f.project.as_str())?,
            literal(&spec.project)
        )];

        if !spec.types.is_empty() {
            let set = spec
                .types
                .iter()
                .map(|t| literal(t))
                .collect::<Vec<_>>()
                .join(", ");
            clauses.push(format!("{} IN ({set})", field_ref(f.work_item_type.as_str())?));
        }
        if let Some(state) = &spec.state {
            clauses.push(format!("{} = {}", field_ref(f.state.as_str())?, literal(state)));
        }
        if let Some(path) = &spec.iteration_path {
            clauses.push(format!(
                "{} UNDER {}",
                field_ref(f.iteration_path.as_str())?,
                literal(path)
            ));
        }
        if let Some(path) = &spec.area_path {
            clauses.push(format!(
                "{} UNDER {}",
                field_ref(f.area_path.as_str())?,
                literal(path)
            ));
        }
        for tag in &spec.tags {
            clauses.push(format!(
                "{} CONTAINS {}",
                field_ref(f.tags.as_str())?,
                literal(tag)
            ));
        }
        if let Some(assignee) = &spec.assignee {
            clauses.push(format!(
                "{} = {}",
                field_ref(f.assignee.as_str())?,
                literal(assignee)
            ));
        }
        for filter in &spec.custom {
            self.check_allowed(&filter.field)?;
            clauses.push(format!(
                "{} = {}",
                field_ref(&filter.field)?,
                literal(&filter.value)
            ));
        }

        let sort = match &spec.sort_by {
            Some(custom) => {
                self.check_allowed(custom)?;
                field_ref(custom)?
            }
            None => field_ref(f.order.as_str())?,
        };
        let id_ref = field_ref(f.id.as_str())?;
        let order_by = if sort == id_ref {
            format!("{sort} ASC")
        } else {
            format!("{sort} ASC, {id_ref} ASC")
        };

        let text = format!(
            "SELECT {select} FROM WorkItems WHERE {} ORDER BY {order_by}",
            clauses.join(" AND ")
        );
        tracing::debug!(query = %text, "Built backlog query");
        Ok(QueryText(text))
    }

    fn check_allowed(&self, field: &str) -> Result<(), SyncError> {
        let builtin = self.fields.detail_fields().iter().any(|f| f.as_str() == field)
            || self.fields.project.as_str() == field;
        match &self.allowed {
            Some(allowed) if !builtin && !allowed.contains(field) => Err(
                SyncError::invalid_spec(format!("field '{field}' is not in the allowed field list")),
            ),
            _ => Ok(()),
        }
    }
}

/// Quotes `value` as a string literal, doubling any embedded `'`.
pub fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Wraps a field reference name in brackets after checking it is well formed.
fn field_ref(name: &str) -> Result<String, SyncError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.contains(['[', ']']) {
        return Err(SyncError::invalid_spec(format!(
            "'{name}' is not a valid field name"
        )));
    }
    Ok(format!("[{trimmed}]"))
}
