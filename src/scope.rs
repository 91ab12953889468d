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

use crate::{Once, Provider};
use std::rc::Rc;
use std::sync::{Arc, OnceLock};

/// Memoizing wrapper for scoped bindings.
///
/// The delegate runs at most once per graph instance; later calls return
/// clones of the cached value. Bind a shared handle (for example `Rc<T>`)
/// when all consumers must observe the same underlying instance.
///
/// Not thread safe; use [`DoubleCheck`] when providers cross threads.
pub struct SingleCheck<T: Clone> {
    delegate: Rc<dyn Provider<T>>,
    value: Once<T>,
}

impl<T: Clone> SingleCheck<T> {
    pub fn new(delegate: Rc<dyn Provider<T>>) -> Self {
        SingleCheck {
            delegate,
            value: Once::new(),
        }
    }
}

impl<T: Clone> Provider<T> for SingleCheck<T> {
    fn get(&self) -> T {
        self.value.get(|| self.delegate.get()).clone()
    }
}

/// Thread safe variant of [`SingleCheck`].
pub struct DoubleCheck<T: Clone> {
    delegate: Arc<dyn Provider<T> + Send + Sync>,
    value: OnceLock<T>,
}

impl<T: Clone> DoubleCheck<T> {
    pub fn new(delegate: Arc<dyn Provider<T> + Send + Sync>) -> Self {
        DoubleCheck {
            delegate,
            value: OnceLock::new(),
        }
    }
}

impl<T: Clone> Provider<T> for DoubleCheck<T> {
    fn get(&self) -> T {
        self.value.get_or_init(|| self.delegate.get()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderFn;
    use std::cell::Cell;

    #[test]
    fn single_check_memoizes() {
        let counter = Rc::new(Cell::new(0));
        let c = counter.clone();
        let provider = SingleCheck::new(Rc::new(ProviderFn::new(move || {
            c.set(c.get() + 1);
            Rc::new(c.get())
        })));
        let first = provider.get();
        let second = provider.get();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn double_check_memoizes() {
        struct CountingProvider(std::sync::atomic::AtomicU32);
        impl Provider<u32> for CountingProvider {
            fn get(&self) -> u32 {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1
            }
        }
        let provider = DoubleCheck::new(Arc::new(CountingProvider(Default::default())));
        assert_eq!(provider.get(), 1);
        assert_eq!(provider.get(), 1);
    }
}
