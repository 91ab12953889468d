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

//! Runtime support library for the metro compile time dependency injection
//! framework.
//!
//! Code generated by the metro processor references the primitives in this
//! crate: [`Provider`] and its memoizing wrappers, [`Lazy`], the
//! multibinding aggregators, and the delegate provider used to break
//! dependency cycles. User code normally only touches [`Provider`],
//! [`Lazy`] and [`MembersInjector`]; everything else is plumbing for the
//! generated graph implementations.

mod delegate;
mod factory;
mod lazy;
mod members_injector;
mod multibindings;
mod once;
mod provider;
mod scope;

pub use delegate::DelegateProvider;
pub use factory::{Factory, InstanceFactory};
pub use lazy::Lazy;
pub use members_injector::MembersInjector;
pub use multibindings::{
    MapFactory, MapFactoryBuilder, MapProviderFactory, MapProviderFactoryBuilder, SetFactory,
    SetFactoryBuilder,
};
pub use once::Once;
pub use provider::{Provider, ProviderFn};
pub use scope::{DoubleCheck, SingleCheck};
