// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin resolution and application lifecycle orchestration.
//!
//! The [`Resolver`] turns plugin tags into installed plugins honoring
//! namespace ownership and sharing. The [`Broker`] drives applications
//! through create, start, stop, restart, scale, and remove against the
//! container runtime, record store, and proxy collaborators.

pub mod broker;
pub mod info;
pub mod resolver;
pub mod scale;

pub use broker::{Broker, CreateApplication, UserBroker};
pub use info::{ApplicationInfo, ApplicationUrls, BrokerSettings, Deployments};
pub use resolver::Resolver;
pub use scale::ScaleRequest;
