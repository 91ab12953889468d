/*
Copyright 2025 Google LLC

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

/// Creates a binding on demand.
///
/// `T` is created each time [`Provider::get`] is called, allowing multiple
/// instances to be created.
///
/// This also prevents creating `T` immediately when constructing an object
/// that depends on `T`, which allows deferred initialization and can break
/// cyclic dependencies.
///
/// WARNING: calling [`Provider::get`] inside a constructor that is itself
/// part of the cycle can lead to stack overflow, and is best avoided.
///
/// If only a single cached instance is needed, use [`Lazy<T>`](crate::Lazy)
/// instead.
pub trait Provider<T> {
    fn get(&self) -> T;
}

/// A [`Provider`] backed by a closure.
///
/// Generated accessors use this to adapt arbitrary expressions to the
/// provider contract.
pub struct ProviderFn<T> {
    f: Box<dyn Fn() -> T>,
}

impl<T> ProviderFn<T> {
    pub fn new(f: impl Fn() -> T + 'static) -> Self {
        ProviderFn { f: Box::new(f) }
    }
}

impl<T> Provider<T> for ProviderFn<T> {
    fn get(&self) -> T {
        (self.f)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn provider_fn_creates_new_value_per_get() {
        let counter = Rc::new(Cell::new(0));
        let c = counter.clone();
        let provider = ProviderFn::new(move || {
            c.set(c.get() + 1);
            c.get()
        });
        assert_eq!(provider.get(), 1);
        assert_eq!(provider.get(), 2);
        assert_eq!(counter.get(), 2);
    }
}
