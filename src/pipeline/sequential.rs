//! Single-threaded, order-preserving pipeline.

use crate::types::{BinaryOperator, Consumer, Element, Mapper, Predicate};

use super::Pipeline;

/// Pipeline that evaluates every operation in input order on the calling thread.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequentialPipeline<T> {
    items: Vec<T>,
}

impl<T> SequentialPipeline<T> {
    /// Wrap `items` without copying.
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T: Element> Pipeline<T> for SequentialPipeline<T> {
    fn filter<P: Predicate<T>>(&self, predicate: P) -> Self {
        let items = self
            .items
            .iter()
            .filter(|&v| predicate(v))
            .cloned()
            .collect();
        Self { items }
    }

    fn map<M: Mapper<T>>(&self, mapper: M) -> Self {
        let items = self.items.iter().map(|v| mapper(v)).collect();
        Self { items }
    }

    fn for_each<C: Consumer<T>>(&self, consumer: C) {
        for v in &self.items {
            consumer(v);
        }
    }

    fn reduce<B: BinaryOperator<T>>(&self, combiner: B) -> T {
        self.items
            .iter()
            .fold(T::default(), |acc, v| combiner(&acc, v))
    }

    fn to_slice(&self) -> &[T] {
        &self.items
    }

    fn any_match<P: Predicate<T>>(&self, predicate: P) -> bool {
        self.items.iter().any(|v| predicate(v))
    }

    fn all_match<P: Predicate<T>>(&self, predicate: P) -> bool {
        !self.items.is_empty() && self.items.iter().all(|v| predicate(v))
    }

    fn into_vec(self) -> Vec<T> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::SequentialPipeline;
    use crate::pipeline::Pipeline;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn sample() -> SequentialPipeline<i64> {
        SequentialPipeline::new(vec![5, 1, 4, 2, 3])
    }

    #[test]
    fn filter_preserves_relative_order() {
        let p = sample();
        let out = p.filter(|v: &i64| *v > 2);
        assert_eq!(out.to_slice(), &[5, 4, 3]);
        // Receiver unchanged
        assert_eq!(p.to_slice(), &[5, 1, 4, 2, 3]);
    }

    #[test]
    fn filter_can_return_empty_pipeline() {
        let out = sample().filter(|_: &i64| false);
        assert_eq!(out.count(), 0);
        assert!(out.to_slice().is_empty());
    }

    #[test]
    fn map_is_element_wise_and_ordered() {
        let out = sample().map(|v: &i64| v * 10);
        assert_eq!(out.into_vec(), vec![50, 10, 40, 20, 30]);
    }

    #[test]
    fn for_each_visits_in_input_order() {
        let seen = Mutex::new(Vec::new());
        sample().for_each(|v: &i64| seen.lock().unwrap().push(*v));
        assert_eq!(seen.into_inner().unwrap(), vec![5, 1, 4, 2, 3]);
    }

    #[test]
    fn reduce_folds_left_to_right_from_zero_value() {
        let p = SequentialPipeline::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        let joined = p.reduce(|acc: &String, v: &String| format!("{acc}{v}"));
        assert_eq!(joined, "abc");

        // Non-commutative combiner is well-defined here: ((0 - 5) - 1) - 4 ...
        assert_eq!(sample().reduce(|acc: &i64, v: &i64| acc - v), -15);
    }

    #[test]
    fn reduce_on_empty_returns_zero_value() {
        let p = SequentialPipeline::<i64>::new(Vec::new());
        assert_eq!(p.reduce(|acc: &i64, v: &i64| acc + v), 0);
    }

    #[test]
    fn any_match_short_circuits_on_first_match() {
        let calls = AtomicUsize::new(0);
        let found = sample().any_match(|v: &i64| {
            calls.fetch_add(1, Ordering::SeqCst);
            *v == 1
        });
        assert!(found);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn all_match_short_circuits_on_first_failure() {
        let calls = AtomicUsize::new(0);
        let all = sample().all_match(|v: &i64| {
            calls.fetch_add(1, Ordering::SeqCst);
            *v > 1
        });
        assert!(!all);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_pipeline_matches_nothing() {
        let p = SequentialPipeline::<i64>::default();
        assert!(!p.any_match(|_: &i64| true));
        assert!(!p.all_match(|_: &i64| true));
    }
}
