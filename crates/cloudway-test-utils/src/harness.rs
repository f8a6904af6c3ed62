// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broker test harness.
//!
//! `BrokerHarness` wires a [`Broker`] to a temp hub and the in-memory mocks,
//! keeping typed handles on each mock for assertions.

use std::sync::Arc;

use cloudway_broker::{Broker, BrokerSettings, UserBroker};
use cloudway_core::{CloudwayError, Identity};

use crate::hub_fixture::HubFixture;
use crate::mock_proxy::MockProxy;
use crate::mock_runtime::MockRuntime;
use crate::mock_scm::MockScm;
use crate::record_store::MemoryRecordStore;

/// A broker over mocks plus the mocks themselves.
pub struct BrokerHarness {
    pub fixture: HubFixture,
    pub runtime: Arc<MockRuntime>,
    pub records: Arc<MemoryRecordStore>,
    pub proxy: Arc<MockProxy>,
    pub scm: Arc<MockScm>,
    pub broker: Arc<Broker>,
}

impl BrokerHarness {
    pub fn new() -> Result<Self, CloudwayError> {
        Self::with_settings(BrokerSettings::default())
    }

    pub fn with_settings(settings: BrokerSettings) -> Result<Self, CloudwayError> {
        let fixture = HubFixture::new()?;
        let runtime = Arc::new(MockRuntime::new());
        let records = Arc::new(MemoryRecordStore::new());
        let proxy = Arc::new(MockProxy::new());
        let scm = Arc::new(MockScm::with_branches(&["master", "develop"]));

        let broker = Broker::new(
            fixture.hub(),
            runtime.clone(),
            records.clone(),
            proxy.clone(),
        )
        .with_scm(scm.clone())
        .with_settings(settings);

        Ok(Self {
            fixture,
            runtime,
            records,
            proxy,
            scm,
            broker: Arc::new(broker),
        })
    }

    /// A broker scoped to `username` in `namespace`.
    pub fn user(&self, username: &str, namespace: &str) -> UserBroker<'_> {
        self.broker.for_user(Identity::new(username, namespace))
    }
}
