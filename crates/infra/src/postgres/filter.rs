//! Rendering of optional predicates into SQL `WHERE` fragments.
//!
//! Every value is bound as a parameter. Text matching mirrors the in-memory
//! evaluation: needles are already lowercased, so a case-insensitive
//! "contains" becomes `POSITION($n IN LOWER(column)) > 0`.

use sqlx::{Postgres, QueryBuilder};

use shelfkeep_catalog::{BookCriterion, LocationCriterion};
use shelfkeep_core::{Criterion, Filter, Predicate};

/// A criterion that can be pushed into a Postgres query.
pub(crate) trait SqlCriterion: Criterion {
    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>);
}

/// Push `filter` as a boolean expression; "no constraint" renders as `TRUE`.
pub(crate) fn push_filter<C: SqlCriterion>(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter<C>) {
    match filter {
        None => {
            qb.push("TRUE");
        }
        Some(predicate) => push_predicate(qb, predicate),
    }
}

fn push_predicate<C: SqlCriterion>(qb: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate<C>) {
    match predicate {
        Predicate::Test(criterion) => {
            qb.push("(");
            criterion.push_sql(qb);
            qb.push(")");
        }
        Predicate::And(lhs, rhs) => {
            qb.push("(");
            push_predicate(qb, lhs);
            qb.push(" AND ");
            push_predicate(qb, rhs);
            qb.push(")");
        }
        Predicate::Or(lhs, rhs) => {
            qb.push("(");
            push_predicate(qb, lhs);
            qb.push(" OR ");
            push_predicate(qb, rhs);
            qb.push(")");
        }
        Predicate::Not(inner) => {
            qb.push("NOT ");
            push_predicate(qb, inner);
        }
    }
}

fn push_contains(qb: &mut QueryBuilder<'_, Postgres>, column: &str, needle: &str) {
    qb.push("POSITION(")
        .push_bind(needle.to_owned())
        .push(" IN LOWER(")
        .push(column)
        .push(")) > 0");
}

/// Book columns are addressed through the `b` alias.
impl SqlCriterion for BookCriterion {
    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            BookCriterion::TitleContains(needle) => push_contains(qb, "b.title", needle),
            BookCriterion::AuthorContains(needle) => push_contains(qb, "b.author", needle),
            BookCriterion::GenreIs(genre) => {
                qb.push("b.genre = ").push_bind(genre.as_str());
            }
            BookCriterion::IsbnIs(isbn) => {
                qb.push("b.isbn = ").push_bind(isbn.as_str().to_owned());
            }
            BookCriterion::PublishedBetween { from, to } => {
                match from {
                    Some(from) => {
                        qb.push("b.publication_date >= ").push_bind(*from);
                    }
                    None => {
                        qb.push("TRUE");
                    }
                }
                qb.push(" AND ");
                match to {
                    Some(to) => {
                        qb.push("b.publication_date <= ").push_bind(*to);
                    }
                    None => {
                        qb.push("TRUE");
                    }
                }
            }
        }
    }
}

/// Location columns are addressed through the `l` alias.
impl SqlCriterion for LocationCriterion {
    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            LocationCriterion::NameContains(needle) => push_contains(qb, "l.name", needle),
            LocationCriterion::AddressContains(needle) => push_contains(qb, "l.address", needle),
            LocationCriterion::ManagedBy(user) => {
                qb.push("l.manager_id = ").push_bind(*user.as_uuid());
            }
        }
    }
}
