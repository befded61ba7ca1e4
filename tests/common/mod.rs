//! Shared test utilities for the step binding tests.
//!
//! This module provides common test infrastructure including:
//! - Stub service startup with scripted ECU behaviour
//! - Client and context builders

#![allow(dead_code)]

use rosco_bdd::config::EcuBehaviour;
use rosco_bdd::stub::{Endpoint, StubOptions, StubServer};
use rosco_bdd::{RoscoClient, ScenarioContext};

/// Start a stub whose ECU behaves as `behaviour`.
pub fn spawn_stub(behaviour: EcuBehaviour) -> StubServer {
    StubServer::spawn_local(StubOptions {
        behaviour,
        ecu_id: "99 00 03 03".to_string(),
        iac_position: 30,
        connect_body: None,
    })
    .expect("Failed to start stub service")
}

/// Start a stub whose connect endpoint always answers `body` verbatim.
pub fn spawn_stub_with_body(body: &str) -> StubServer {
    let stub = spawn_stub(EcuBehaviour::Responsive);
    stub.set_connect_body(Some(body.to_string()));
    stub
}

pub fn client_for(stub: &StubServer) -> RoscoClient {
    RoscoClient::new(&stub.base_url()).expect("stub base URL is valid")
}

/// A context that has already run `the serial port "<port>"`.
pub fn context_with_port(port: &str) -> ScenarioContext {
    let mut ctx = ScenarioContext::new();
    rosco_bdd::steps::set_port(&mut ctx, port);
    ctx
}

/// Ports the stub saw on `endpoint`, oldest first.
pub fn ports_for(stub: &StubServer, endpoint: Endpoint) -> Vec<String> {
    stub.requests()
        .into_iter()
        .filter(|r| r.endpoint == endpoint)
        .map(|r| r.port)
        .collect()
}
