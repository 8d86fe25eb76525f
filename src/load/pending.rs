//! Interactive loads: suspend after schema inference, resume with a reviewer's decision.
//!
//! [`BulkLoader::prepare`](super::BulkLoader::prepare) stops before the destination table is
//! created and hands back a [`PendingLoad`]. The pending load owns everything needed to
//! finish (dataset, destination, inferred schema) but no store connection; resuming opens a
//! fresh one on whichever thread calls [`PendingLoad::resume`].

use std::fmt;

use tracing::{debug, info, info_span};

use crate::inference::ProblemReport;
use crate::normalize::{apply_schema, normalize};
use crate::schema::TableSchema;
use crate::types::DataSet;

use super::cancel::CancellationToken;
use super::observer::{LoadOutcome, LoadSummary, Reporter};
use super::store::Destination;
use super::{BulkLoader, Interrupt, LoadContext};

/// What the reviewer decided.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewDecision {
    /// Load with the schema the loader inferred.
    UseInferred,
    /// Load with this schema instead; it replaces the inferred one wholesale.
    Corrected(TableSchema),
}

/// `(true, Some(schema))` is a correction; anything else keeps the inferred schema.
impl From<(bool, Option<TableSchema>)> for ReviewDecision {
    fn from((corrected, schema): (bool, Option<TableSchema>)) -> Self {
        match (corrected, schema) {
            (true, Some(schema)) => Self::Corrected(schema),
            _ => Self::UseInferred,
        }
    }
}

/// Receives suspended loads.
///
/// An implementation may resume the load immediately, move it to another thread and resume
/// there later, or drop it (which cancels the load).
pub trait SchemaReviewer: Send + Sync {
    fn review(&self, pending: PendingLoad);
}

impl<F> SchemaReviewer for F
where
    F: Fn(PendingLoad) + Send + Sync,
{
    fn review(&self, pending: PendingLoad) {
        self(pending)
    }
}

/// Reviewer that accepts every problem suggestion without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApplySuggestions;

impl SchemaReviewer for ApplySuggestions {
    fn review(&self, pending: PendingLoad) {
        let schema = pending.suggested_schema();
        let outcome = pending.resume(ReviewDecision::Corrected(schema));
        debug!(%outcome, "suggested corrections applied");
    }
}

/// Reviewer that keeps the inferred schema.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptInferred;

impl SchemaReviewer for AcceptInferred {
    fn review(&self, pending: PendingLoad) {
        let outcome = pending.resume(ReviewDecision::UseInferred);
        debug!(%outcome, "inferred schema accepted");
    }
}

pub(crate) struct Suspended {
    pub(crate) loader: BulkLoader,
    pub(crate) ctx: LoadContext,
    pub(crate) reporter: Reporter,
    pub(crate) destination: Destination,
    /// Null-normalized; dates and decimals are rewritten on resume under the final schema.
    pub(crate) dataset: DataSet,
    pub(crate) inferred: TableSchema,
    pub(crate) problems: Vec<ProblemReport>,
}

/// A load suspended for schema review.
///
/// Exactly one of [`resume`](Self::resume) or dropping the value happens; a drop reports a
/// cancelled outcome.
pub struct PendingLoad {
    state: Option<Suspended>,
}

impl PendingLoad {
    pub(crate) fn new(state: Suspended) -> Self {
        Self { state: Some(state) }
    }

    fn state(&self) -> &Suspended {
        // Only `resume` and `drop` take the state, and both consume `self`.
        self.state
            .as_ref()
            .unwrap_or_else(|| unreachable!("pending load state taken before consumption"))
    }

    /// The dataset as read, with nulls normalized.
    pub fn dataset(&self) -> &DataSet {
        &self.state().dataset
    }

    pub fn destination(&self) -> &Destination {
        &self.state().destination
    }

    pub fn inferred_schema(&self) -> &TableSchema {
        &self.state().inferred
    }

    /// Advisory findings on the inferred schema.
    pub fn problems(&self) -> &[ProblemReport] {
        &self.state().problems
    }

    /// The inferred schema with every problem suggestion applied.
    pub fn suggested_schema(&self) -> TableSchema {
        let state = self.state();
        state.inferred.with_suggestions(&state.problems)
    }

    /// The load's cancellation token; cancelling it makes `resume` report a cancelled load.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.state().ctx.cancel
    }

    /// Finish the load with the reviewer's decision, on the calling thread.
    ///
    /// A fresh store connection is opened here. The outcome is also delivered to the load's
    /// observer.
    pub fn resume(mut self, decision: impl Into<ReviewDecision>) -> LoadOutcome {
        let Some(state) = self.state.take() else {
            return LoadOutcome::Cancelled;
        };
        let Suspended {
            loader,
            ctx,
            mut reporter,
            destination,
            dataset,
            inferred,
            problems: _,
        } = state;

        let span = info_span!("load", table = %destination.table);
        let _entered = span.enter();
        let decision = decision.into();
        info!(corrected = matches!(decision, ReviewDecision::Corrected(_)), "resuming load");

        let result = finish_with_schema(&loader, &ctx, &mut reporter, &destination, dataset, inferred, decision);
        super::finish(reporter, &ctx, result)
    }
}

fn finish_with_schema(
    loader: &BulkLoader,
    ctx: &LoadContext,
    reporter: &mut Reporter,
    destination: &Destination,
    dataset: DataSet,
    inferred: TableSchema,
    decision: ReviewDecision,
) -> Result<LoadSummary, Interrupt> {
    super::checkpoint(ctx)?;
    let (schema, normalized) = match decision {
        ReviewDecision::UseInferred => {
            let normalized = normalize(dataset, &inferred);
            (inferred, normalized)
        }
        ReviewDecision::Corrected(schema) => {
            let schema = schema.validated_for(&dataset)?;
            let normalized = apply_schema(dataset, &schema);
            (schema, normalized)
        }
    };
    let store = loader.open_store(destination, ctx, reporter, "Reopening destination")?;
    loader.write(store, destination, &schema, normalized, ctx, reporter)
}

impl Drop for PendingLoad {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            info!(table = %state.destination.table, "schema review abandoned");
            super::finish(state.reporter, &state.ctx, Err(Interrupt::Cancelled));
        }
    }
}

impl fmt::Debug for PendingLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            Some(state) => f
                .debug_struct("PendingLoad")
                .field("destination", &state.destination)
                .field("rows", &state.dataset.row_count())
                .field("columns", &state.inferred.len())
                .field("problems", &state.problems.len())
                .finish(),
            None => f.write_str("PendingLoad(<finished>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSchema, StorageType};

    #[test]
    fn reviewer_tuple_converts_to_decision() {
        let schema = TableSchema::from_columns(vec![ColumnSchema::new("a", StorageType::Text)]);
        assert_eq!(
            ReviewDecision::from((true, Some(schema.clone()))),
            ReviewDecision::Corrected(schema.clone())
        );
        assert_eq!(ReviewDecision::from((false, Some(schema))), ReviewDecision::UseInferred);
        assert_eq!(ReviewDecision::from((true, None)), ReviewDecision::UseInferred);
    }
}
