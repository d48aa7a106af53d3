//! Function objects over values, and a decorator that serializes calls.

use std::sync::{Mutex, PoisonError};

use crate::model::AnyValue;

/// A callable mapping an input value to an output value.
pub trait AnyFunctor {
    fn invoke(&mut self, input: &AnyValue) -> AnyValue;
}

impl<F: FnMut(&AnyValue) -> AnyValue> AnyFunctor for F {
    fn invoke(&mut self, input: &AnyValue) -> AnyValue {
        self(input)
    }
}

/// Wraps a functor so that it can be shared between threads.
///
/// Concurrent calls run one at a time behind a single lock. A panic inside
/// the wrapped functor does not disable later calls.
#[derive(Debug, Default)]
pub struct ThreadSafeAnyFunctor<F> {
    inner: Mutex<F>,
}

impl<F: AnyFunctor> ThreadSafeAnyFunctor<F> {
    pub fn new(functor: F) -> Self {
        ThreadSafeAnyFunctor {
            inner: Mutex::new(functor),
        }
    }

    pub fn invoke(&self, input: &AnyValue) -> AnyValue {
        let mut functor = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        functor.invoke(input)
    }

    pub fn into_inner(self) -> F {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_closure_functor() {
        let mut double = |v: &AnyValue| AnyValue::from(v.as_scalar::<i32>().unwrap_or(0) * 2);
        assert_eq!(double.invoke(&21i32.into()), AnyValue::from(42i32));
    }

    #[test]
    fn test_calls_are_serialized() {
        let mut calls = 0u32;
        let counter = move |_: &AnyValue| {
            calls += 1;
            AnyValue::from(calls)
        };
        let functor = Arc::new(ThreadSafeAnyFunctor::new(counter));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let functor = Arc::clone(&functor);
                thread::spawn(move || {
                    for _ in 0..100 {
                        functor.invoke(&AnyValue::empty());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(functor.invoke(&AnyValue::empty()), AnyValue::from(801u32));
    }

    #[test]
    fn test_survives_panicking_call() {
        let functor = Arc::new(ThreadSafeAnyFunctor::new(|v: &AnyValue| {
            assert!(!v.is_empty(), "empty input");
            v.clone()
        }));
        let shared = Arc::clone(&functor);
        let result = thread::spawn(move || shared.invoke(&AnyValue::empty())).join();
        assert!(result.is_err());
        assert_eq!(functor.invoke(&7u8.into()), AnyValue::from(7u8));
    }
}
