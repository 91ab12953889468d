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

use crate::Provider;
use std::cell::RefCell;
use std::rc::Rc;

/// A provider that forwards to a delegate installed after construction.
///
/// Generated graph implementations use this to realize dependency cycles:
/// the back edge of a cycle receives a `DelegateProvider` while the rest of
/// the cycle is constructed, and [`set_delegate`](Self::set_delegate) is
/// called as soon as the real provider exists. Calling [`Provider::get`]
/// before the delegate is installed is a bug in the generated code.
pub struct DelegateProvider<T> {
    delegate: RefCell<Option<Rc<dyn Provider<T>>>>,
}

impl<T> DelegateProvider<T> {
    pub fn new() -> Self {
        DelegateProvider {
            delegate: RefCell::new(None),
        }
    }

    /// Installs the real provider. May only be called once.
    pub fn set_delegate(&self, delegate: Rc<dyn Provider<T>>) {
        let mut slot = self.delegate.borrow_mut();
        if slot.is_some() {
            panic!("delegate already set");
        }
        *slot = Some(delegate);
    }
}

impl<T> Default for DelegateProvider<T> {
    fn default() -> Self {
        DelegateProvider::new()
    }
}

impl<T> Provider<T> for DelegateProvider<T> {
    fn get(&self) -> T {
        self.delegate
            .borrow()
            .as_ref()
            .expect("delegate provider used before set_delegate")
            .get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderFn;

    #[test]
    fn forwards_after_set_delegate() {
        let delegate: DelegateProvider<i32> = DelegateProvider::new();
        delegate.set_delegate(Rc::new(ProviderFn::new(|| 9)));
        assert_eq!(delegate.get(), 9);
    }

    #[test]
    #[should_panic(expected = "before set_delegate")]
    fn get_before_set_panics() {
        let delegate: DelegateProvider<i32> = DelegateProvider::new();
        delegate.get();
    }

    #[test]
    #[should_panic(expected = "already set")]
    fn double_set_panics() {
        let delegate: DelegateProvider<i32> = DelegateProvider::new();
        delegate.set_delegate(Rc::new(ProviderFn::new(|| 1)));
        delegate.set_delegate(Rc::new(ProviderFn::new(|| 2)));
    }
}
