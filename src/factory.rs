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

/// Marker for generated factories.
///
/// A factory is a [`Provider`] whose instances are assembled from
/// pre-resolved providers of the binding's dependencies.
pub trait Factory<T>: Provider<T> {}

/// A [`Provider`] that always returns a fixed value.
///
/// Used for values handed to the graph through its factory ("bound
/// instances").
pub struct InstanceFactory<T: Clone> {
    value: T,
}

impl<T: Clone> InstanceFactory<T> {
    pub fn new(value: T) -> Self {
        InstanceFactory { value }
    }
}

impl<T: Clone> Provider<T> for InstanceFactory<T> {
    fn get(&self) -> T {
        self.value.clone()
    }
}

impl<T: Clone> Factory<T> for InstanceFactory<T> {}
