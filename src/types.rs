//! Function-shape vocabulary used as pipeline operation parameters.
//!
//! Each contract is a trait with a blanket implementation for matching closures, so callers
//! pass plain closures and the pipeline signatures stay readable. All contracts require
//! `Send + Sync` because the concurrent pipeline shares one parameter value across every
//! unit of work.

use std::cmp::Ordering;

/// Bounds every pipeline element must satisfy.
///
/// [`Default`] supplies the zero value that [`crate::pipeline::Pipeline::reduce`] folds from.
pub trait Element: Clone + Default + Send + Sync {}

impl<T> Element for T where T: Clone + Default + Send + Sync {}

/// Decides whether an element is kept / matches.
pub trait Predicate<T>: Fn(&T) -> bool + Send + Sync {}

impl<T, F> Predicate<T> for F where F: Fn(&T) -> bool + Send + Sync {}

/// Side-effecting callback invoked once per element.
pub trait Consumer<T>: Fn(&T) + Send + Sync {}

impl<T, F> Consumer<T> for F where F: Fn(&T) + Send + Sync {}

/// Element-to-element transform of the same type.
pub trait Mapper<T>: Fn(&T) -> T + Send + Sync {}

impl<T, F> Mapper<T> for F where F: Fn(&T) -> T + Send + Sync {}

/// Combines the running accumulator (first argument) with an element (second argument).
pub trait BinaryOperator<T>: Fn(&T, &T) -> T + Send + Sync {}

impl<T, F> BinaryOperator<T> for F where F: Fn(&T, &T) -> T + Send + Sync {}

/// Total ordering between two elements.
///
/// Part of the vocabulary for ordering use; no pipeline operation consumes it yet.
pub trait Comparator<T>: Fn(&T, &T) -> Ordering + Send + Sync {}

impl<T, F> Comparator<T> for F where F: Fn(&T, &T) -> Ordering + Send + Sync {}

#[cfg(test)]
mod tests {
    use super::{BinaryOperator, Comparator, Consumer, Mapper, Predicate};
    use std::cmp::Ordering;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn check<T, P: Predicate<T>>(p: P, v: &T) -> bool {
        p(v)
    }

    fn apply<T, M: Mapper<T>>(m: M, v: &T) -> T {
        m(v)
    }

    fn combine<T, B: BinaryOperator<T>>(b: B, a: &T, v: &T) -> T {
        b(a, v)
    }

    fn compare<T, C: Comparator<T>>(c: C, a: &T, b: &T) -> Ordering {
        c(a, b)
    }

    fn consume<T, C: Consumer<T>>(c: C, v: &T) {
        c(v)
    }

    #[test]
    fn closures_satisfy_functional_contracts() {
        assert!(check(|v: &i64| *v > 1, &2));
        assert_eq!(apply(|v: &i64| v * 3, &2), 6);
        assert_eq!(combine(|a: &i64, b: &i64| a - b, &10, &4), 6);
        assert_eq!(compare(|a: &i64, b: &i64| a.cmp(b), &1, &2), Ordering::Less);

        let seen = AtomicUsize::new(0);
        consume(
            |v: &usize| {
                seen.fetch_add(*v, AtomicOrdering::SeqCst);
            },
            &7,
        );
        assert_eq!(seen.load(AtomicOrdering::SeqCst), 7);
    }
}
