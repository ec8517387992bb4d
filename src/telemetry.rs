//! `tracing` span helpers (enabled with the `tracing` feature)

use tracing::{info_span, Span};

pub fn execute_query_span(query: &str) -> Span {
    // Statements can be whole revision scripts; keep the span field short
    let statement: String = query.trim().chars().take(120).collect();
    info_span!("revisions.query", statement = %statement)
}

pub fn transaction_span() -> Span {
    info_span!("revisions.transaction")
}

pub fn begin_transaction_span() -> Span {
    info_span!("revisions.transaction.begin")
}

pub fn commit_transaction_span() -> Span {
    info_span!("revisions.transaction.commit")
}

pub fn rollback_transaction_span() -> Span {
    info_span!("revisions.transaction.rollback")
}

pub fn upgrade_span(namespace: &str) -> Span {
    info_span!("revisions.upgrade", namespace = %namespace)
}

pub fn downgrade_span(namespace: &str) -> Span {
    info_span!("revisions.downgrade", namespace = %namespace)
}

pub fn apply_revision_span(file: &str, direction: &str) -> Span {
    info_span!("revisions.apply", file = %file, direction = %direction)
}
