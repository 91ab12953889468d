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

/// Wraps a binding so it is created on first use.
///
/// When `Foo` depends on `Bar`, `Bar` is created before `Foo`, which may
/// not be desirable if creating `Bar` is costly but it is only used much
/// later or only conditionally. By requesting `Lazy<Bar>` instead, `Bar` is
/// only created when [`Lazy::get`] is called.
///
/// [`Lazy::get`] is cached; the same value is returned on every call.
///
/// If a new instance per call is needed, request
/// [`Provider<T>`](crate::Provider) instead.
///
/// ```
/// use metro::{Lazy, ProviderFn};
/// use std::rc::Rc;
///
/// let lazy = Lazy::new(Rc::new(ProviderFn::new(|| "expensive".to_owned())));
/// assert_eq!(lazy.get(), "expensive");
/// assert_eq!(lazy.get(), "expensive");
/// ```
pub struct Lazy<T> {
    provider: Rc<dyn Provider<T>>,
    value: Once<T>,
}

impl<T: Clone> Lazy<T> {
    #[doc(hidden)]
    pub fn new(provider: Rc<dyn Provider<T>>) -> Self {
        Lazy {
            provider,
            value: Once::new(),
        }
    }

    /// Creates or retrieves the cached value.
    pub fn get(&self) -> T {
        self.value.get(|| self.provider.get()).clone()
    }
}
