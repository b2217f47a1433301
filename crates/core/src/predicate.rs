//! Optional-predicate algebra for search filters.
//!
//! A search filter is either "no constraint" or a concrete boolean test over an
//! entity. "No constraint" is `None`, never a predicate that always matches, so
//! call sites can fold any number of optional filters with [`and`] without
//! branching:
//!
//! ```ignore
//! let filter = and(title_like(query.title), author_like(query.author));
//! ```
//!
//! `None` is absorbed by both [`and`] and [`or`], and negating it yields `None`
//! again. Concrete tests are expressed as a [`Criterion`] so that storage
//! backends can either evaluate them in memory or translate them into their own
//! query language.

/// A single concrete test over a subject (e.g. "title contains `rust`").
pub trait Criterion: Clone + core::fmt::Debug + Send + Sync {
    /// The entity type this criterion inspects.
    type Subject;

    fn matches(&self, subject: &Self::Subject) -> bool;
}

/// A composed boolean test over criteria of type `C`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate<C> {
    Test(C),
    And(Box<Predicate<C>>, Box<Predicate<C>>),
    Or(Box<Predicate<C>>, Box<Predicate<C>>),
    Not(Box<Predicate<C>>),
}

/// An optional predicate: `None` means "no constraint".
pub type Filter<C> = Option<Predicate<C>>;

impl<C> Predicate<C> {
    /// Wrap a concrete criterion as an always-present filter.
    pub fn filter(criterion: C) -> Filter<C> {
        Some(Predicate::Test(criterion))
    }
}

impl<C: Criterion> Predicate<C> {
    /// Evaluate against one subject. `And`/`Or` hold over the same instance.
    pub fn matches(&self, subject: &C::Subject) -> bool {
        match self {
            Predicate::Test(c) => c.matches(subject),
            Predicate::And(lhs, rhs) => lhs.matches(subject) && rhs.matches(subject),
            Predicate::Or(lhs, rhs) => lhs.matches(subject) || rhs.matches(subject),
            Predicate::Not(inner) => !inner.matches(subject),
        }
    }
}

/// Conjunction; an absent side is ignored.
pub fn and<C>(lhs: Filter<C>, rhs: Filter<C>) -> Filter<C> {
    match (lhs, rhs) {
        (None, rhs) => rhs,
        (lhs, None) => lhs,
        (Some(l), Some(r)) => Some(Predicate::And(Box::new(l), Box::new(r))),
    }
}

/// Disjunction; an absent side is ignored.
pub fn or<C>(lhs: Filter<C>, rhs: Filter<C>) -> Filter<C> {
    match (lhs, rhs) {
        (None, rhs) => rhs,
        (lhs, None) => lhs,
        (Some(l), Some(r)) => Some(Predicate::Or(Box::new(l), Box::new(r))),
    }
}

/// Negation; negating "no constraint" is still "no constraint".
pub fn not<C>(filter: Filter<C>) -> Filter<C> {
    filter.map(|p| Predicate::Not(Box::new(p)))
}

/// Left fold of [`and`] over any number of optional filters.
pub fn all_of<C>(filters: impl IntoIterator<Item = Filter<C>>) -> Filter<C> {
    filters.into_iter().fold(None, and)
}

/// Left fold of [`or`] over any number of optional filters.
pub fn any_of<C>(filters: impl IntoIterator<Item = Filter<C>>) -> Filter<C> {
    filters.into_iter().fold(None, or)
}

/// Evaluate an optional filter; "no constraint" matches every subject.
pub fn matches<C: Criterion>(filter: &Filter<C>, subject: &C::Subject) -> bool {
    filter.as_ref().is_none_or(|p| p.matches(subject))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Num {
        DivisibleBy(u32),
        Below(u32),
    }

    impl Criterion for Num {
        type Subject = u32;

        fn matches(&self, n: &u32) -> bool {
            match self {
                Num::DivisibleBy(d) => n % d == 0,
                Num::Below(limit) => n < limit,
            }
        }
    }

    fn even() -> Filter<Num> {
        Predicate::filter(Num::DivisibleBy(2))
    }

    fn small() -> Filter<Num> {
        Predicate::filter(Num::Below(10))
    }

    #[test]
    fn absent_is_the_identity_of_and() {
        assert_eq!(and::<Num>(None, None), None);
        assert_eq!(and(even(), None), even());
        assert_eq!(and(None, even()), even());
    }

    #[test]
    fn absent_is_the_identity_of_or() {
        assert_eq!(or::<Num>(None, None), None);
        assert_eq!(or(even(), None), even());
        assert_eq!(or(None, small()), small());
    }

    #[test]
    fn not_of_absent_stays_absent() {
        assert_eq!(not::<Num>(None), None);
    }

    #[test]
    fn and_requires_both_on_the_same_subject() {
        let f = and(even(), small());
        assert!(matches(&f, &4));
        assert!(!matches(&f, &12));
        assert!(!matches(&f, &3));
    }

    #[test]
    fn or_accepts_either() {
        let f = or(even(), small());
        assert!(matches(&f, &12));
        assert!(matches(&f, &3));
        assert!(!matches(&f, &13));
    }

    #[test]
    fn not_inverts_a_present_predicate() {
        let f = not(even());
        assert!(matches(&f, &3));
        assert!(!matches(&f, &4));
    }

    #[test]
    fn absent_filter_matches_everything() {
        assert!(matches::<Num>(&None, &7));
    }

    #[test]
    fn folds_skip_absent_filters() {
        assert_eq!(all_of(vec![None, even(), None]), even());
        assert_eq!(any_of::<Num>(vec![None, None]), None);
        let f = all_of(vec![even(), small(), Predicate::filter(Num::DivisibleBy(3))]);
        assert!(matches(&f, &6));
        assert!(!matches(&f, &4));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn filter_strategy() -> impl Strategy<Value = Filter<Num>> {
            prop_oneof![
                Just(None),
                (1u32..6).prop_map(|d| Predicate::filter(Num::DivisibleBy(d))),
                (0u32..50).prop_map(|l| Predicate::filter(Num::Below(l))),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: composition agrees with boolean logic, treating absence as "true".
            #[test]
            fn composition_matches_boolean_logic(
                p in filter_strategy(),
                q in filter_strategy(),
                n in 0u32..100
            ) {
                let mp = matches(&p, &n);
                let mq = matches(&q, &n);

                prop_assert_eq!(matches(&and(p.clone(), q.clone()), &n), mp && mq);

                // With one side absent, `or` degrades to the other side.
                let expected_or = match (&p, &q) {
                    (None, _) => mq,
                    (_, None) => mp,
                    _ => mp || mq,
                };
                prop_assert_eq!(matches(&or(p.clone(), q.clone()), &n), expected_or);

                if p.is_some() {
                    prop_assert_eq!(matches(&not(p.clone()), &n), !mp);
                } else {
                    prop_assert!(not(p.clone()).is_none());
                }
            }
        }
    }
}
