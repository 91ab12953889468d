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
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

enum SetContribution<T> {
    Single(Rc<dyn Provider<T>>),
    Collection(Rc<dyn Provider<Vec<T>>>),
}

/// Aggregates element providers into a multi-bound collection.
///
/// Elements appear in the order their contributions were registered, which
/// the processor keeps deterministic across builds.
pub struct SetFactory<T> {
    contributions: Vec<SetContribution<T>>,
}

impl<T> SetFactory<T> {
    pub fn builder() -> SetFactoryBuilder<T> {
        SetFactoryBuilder {
            contributions: Vec::new(),
        }
    }
}

impl<T> Provider<Vec<T>> for SetFactory<T> {
    fn get(&self) -> Vec<T> {
        let mut result = Vec::new();
        for contribution in &self.contributions {
            match contribution {
                SetContribution::Single(provider) => result.push(provider.get()),
                SetContribution::Collection(provider) => result.extend(provider.get()),
            }
        }
        result
    }
}

pub struct SetFactoryBuilder<T> {
    contributions: Vec<SetContribution<T>>,
}

impl<T> SetFactoryBuilder<T> {
    pub fn add_provider(mut self, provider: Rc<dyn Provider<T>>) -> Self {
        self.contributions.push(SetContribution::Single(provider));
        self
    }

    pub fn add_collection_provider(mut self, provider: Rc<dyn Provider<Vec<T>>>) -> Self {
        self.contributions
            .push(SetContribution::Collection(provider));
        self
    }

    pub fn build(self) -> SetFactory<T> {
        SetFactory {
            contributions: self.contributions,
        }
    }
}

/// Aggregates keyed providers into a multi-bound map.
///
/// Key uniqueness is enforced by the processor before any code using this
/// factory is generated.
pub struct MapFactory<K: Eq + Hash + Clone, V> {
    entries: Vec<(K, Rc<dyn Provider<V>>)>,
    maps: Vec<Rc<dyn Provider<HashMap<K, V>>>>,
}

impl<K: Eq + Hash + Clone, V> MapFactory<K, V> {
    pub fn builder() -> MapFactoryBuilder<K, V> {
        MapFactoryBuilder {
            entries: Vec::new(),
            maps: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> Provider<HashMap<K, V>> for MapFactory<K, V> {
    fn get(&self) -> HashMap<K, V> {
        let mut result = HashMap::new();
        for (key, provider) in &self.entries {
            result.insert(key.clone(), provider.get());
        }
        for map_provider in &self.maps {
            result.extend(map_provider.get());
        }
        result
    }
}

pub struct MapFactoryBuilder<K: Eq + Hash + Clone, V> {
    entries: Vec<(K, Rc<dyn Provider<V>>)>,
    maps: Vec<Rc<dyn Provider<HashMap<K, V>>>>,
}

impl<K: Eq + Hash + Clone, V> MapFactoryBuilder<K, V> {
    pub fn put(mut self, key: K, provider: Rc<dyn Provider<V>>) -> Self {
        self.entries.push((key, provider));
        self
    }

    pub fn put_all(mut self, provider: Rc<dyn Provider<HashMap<K, V>>>) -> Self {
        self.maps.push(provider);
        self
    }

    pub fn build(self) -> MapFactory<K, V> {
        MapFactory {
            entries: self.entries,
            maps: self.maps,
        }
    }
}

/// Variant of [`MapFactory`] that exposes the element providers themselves,
/// for `Map<K, Provider<V>>` requests.
pub struct MapProviderFactory<K: Eq + Hash + Clone, V> {
    entries: Vec<(K, Rc<dyn Provider<V>>)>,
}

impl<K: Eq + Hash + Clone, V> MapProviderFactory<K, V> {
    pub fn builder() -> MapProviderFactoryBuilder<K, V> {
        MapProviderFactoryBuilder {
            entries: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> Provider<HashMap<K, Rc<dyn Provider<V>>>>
    for MapProviderFactory<K, V>
{
    fn get(&self) -> HashMap<K, Rc<dyn Provider<V>>> {
        let mut result = HashMap::new();
        for (key, provider) in &self.entries {
            result.insert(key.clone(), provider.clone());
        }
        result
    }
}

pub struct MapProviderFactoryBuilder<K: Eq + Hash + Clone, V> {
    entries: Vec<(K, Rc<dyn Provider<V>>)>,
}

impl<K: Eq + Hash + Clone, V> MapProviderFactoryBuilder<K, V> {
    pub fn put(mut self, key: K, provider: Rc<dyn Provider<V>>) -> Self {
        self.entries.push((key, provider));
        self
    }

    pub fn build(self) -> MapProviderFactory<K, V> {
        MapProviderFactory {
            entries: self.entries,
        }
    }
}
