//! cucumber world binding the step patterns to the step operations.
//!
//! A fresh [`EcuWorld`] is built for every scenario. The runner injects the
//! configured [`RoscoClient`] through a `before` hook so no global state is
//! involved.

use cucumber::{given, then, when, World};

use crate::client::RoscoClient;
use crate::context::ScenarioContext;
use crate::error::{StepError, StepResult};
use crate::steps;

/// Scenario state: the step context plus the client used to reach the service.
#[derive(Debug, Default, World)]
pub struct EcuWorld {
    pub context: ScenarioContext,
    client: Option<RoscoClient>,
}

impl EcuWorld {
    pub fn set_client(&mut self, client: RoscoClient) {
        self.client = Some(client);
    }

    fn client(&self) -> StepResult<&RoscoClient> {
        self.client.as_ref().ok_or(StepError::ClientNotConfigured)
    }
}

#[given(expr = "the serial port {string}")]
fn the_serial_port(world: &mut EcuWorld, port: String) {
    steps::set_port(&mut world.context, &port);
}

#[when("the ConnectAndInitialise Rest API is called")]
fn connect_and_initialise(world: &mut EcuWorld) -> StepResult {
    let client = world.client()?.clone();
    steps::invoke_connect(&mut world.context, &client)
}

#[then(expr = "the ECU connection is {string}")]
fn ecu_connection_is(world: &mut EcuWorld, connected: String) -> StepResult {
    steps::assert_connected(&world.context, &connected)
}

#[then(expr = "the ECU has been initialised {string}")]
fn ecu_has_been_initialised(world: &mut EcuWorld, initialised: String) -> StepResult {
    steps::assert_initialised(&world.context, &initialised)
}

#[then("disconnect the ECU")]
fn disconnect_the_ecu(world: &mut EcuWorld) -> StepResult {
    steps::disconnect(&world.context, world.client()?)
}

#[when("disconnect the ECU")]
fn when_disconnect_the_ecu(world: &mut EcuWorld) -> StepResult {
    steps::disconnect(&world.context, world.client()?)
}
