//! Host simulation of the wireless stack and GATT database.
//!
//! Implements [`StackPort`] and [`AttributePort`] in memory, and [`ClockPort`]
//! through a [`HostClock`], so the responder runs on a development machine.
//! Every command is logged and recorded in order; a single failure can be
//! injected to exercise the halt path.

use std::collections::HashMap;

use log::{debug, info};

use crate::app::ports::{
    AdvertisingPacket, AdvertisingTiming, Attribute, AttributeError, AttributePort, ClockPort,
    PawrResponse, StackCommand, StackPort, StackStatus,
};
use crate::config::SyncReceiveParams;

use super::time::HostClock;

/// GATT handle of the Generic Access device name.
pub const DEVICE_NAME_HANDLE: u16 = 3;
/// GATT handle of the response-slot ("address") characteristic.
pub const ADDRESS_HANDLE: u16 = 21;

/// One command as seen by the simulated stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCommand {
    SyncReceiveParameters(SyncReceiveParams),
    CreateAdvertisingSet(u8),
    SetAdvertisingData {
        set: u8,
        packet: AdvertisingPacket,
        data: Vec<u8>,
    },
    SetAdvertisingTiming(u8, AdvertisingTiming),
    StartAdvertising(u8),
    StopAdvertising(u8),
    CloseConnection(u8),
    PawrResponse {
        sync: u16,
        event_counter: u16,
        subevent: u8,
        response_slot: u8,
        data: Vec<u8>,
    },
    WriteResponse {
        connection: u8,
        characteristic: u16,
        att_status: u8,
    },
}

pub struct SimStack {
    clock: HostClock,
    gatt: HashMap<u16, Vec<u8>>,
    next_set: u8,
    advertising: Option<u8>,
    commands: Vec<SimCommand>,
    failure: Option<(StackCommand, StackStatus)>,
}

impl SimStack {
    pub fn new(device_name: &str) -> Self {
        let mut gatt = HashMap::new();
        gatt.insert(DEVICE_NAME_HANDLE, device_name.as_bytes().to_vec());
        gatt.insert(ADDRESS_HANDLE, vec![0]);
        info!("SimStack: simulation backend, device name {:?}", device_name);
        Self {
            clock: HostClock::new(),
            gatt,
            next_set: 0,
            advertising: None,
            commands: Vec::new(),
            failure: None,
        }
    }

    /// Make the next `command` fail with `status`.
    pub fn inject_failure(&mut self, command: StackCommand, status: StackStatus) {
        self.failure = Some((command, status));
    }

    /// Every command accepted so far, in issue order.
    pub fn commands(&self) -> &[SimCommand] {
        &self.commands
    }

    /// Set that is currently advertising, if any.
    pub fn advertising(&self) -> Option<u8> {
        self.advertising
    }

    /// The stack stops legacy advertising once a central connects.
    pub fn on_connected(&mut self) {
        self.advertising = None;
    }

    fn accept(&mut self, command: StackCommand, record: SimCommand) -> Result<(), StackStatus> {
        if let Some((failing, status)) = self.failure {
            if failing == command {
                self.failure = None;
                return Err(status);
            }
        }
        debug!("SimStack: {:?}", record);
        self.commands.push(record);
        Ok(())
    }
}

impl StackPort for SimStack {
    fn set_default_sync_receive_parameters(
        &mut self,
        params: &SyncReceiveParams,
    ) -> Result<(), StackStatus> {
        self.accept(
            StackCommand::SetSyncReceiveParameters,
            SimCommand::SyncReceiveParameters(*params),
        )
    }

    fn create_advertising_set(&mut self) -> Result<u8, StackStatus> {
        let set = self.next_set;
        self.accept(StackCommand::CreateAdvertisingSet, SimCommand::CreateAdvertisingSet(set))?;
        self.next_set += 1;
        Ok(set)
    }

    fn set_advertising_data(
        &mut self,
        set: u8,
        packet: AdvertisingPacket,
        data: &[u8],
    ) -> Result<(), StackStatus> {
        self.accept(
            StackCommand::SetAdvertisingData,
            SimCommand::SetAdvertisingData {
                set,
                packet,
                data: data.to_vec(),
            },
        )
    }

    fn set_advertising_timing(
        &mut self,
        set: u8,
        timing: &AdvertisingTiming,
    ) -> Result<(), StackStatus> {
        self.accept(
            StackCommand::SetAdvertisingTiming,
            SimCommand::SetAdvertisingTiming(set, *timing),
        )
    }

    fn start_connectable_advertising(&mut self, set: u8) -> Result<(), StackStatus> {
        self.accept(StackCommand::StartAdvertising, SimCommand::StartAdvertising(set))?;
        self.advertising = Some(set);
        Ok(())
    }

    fn stop_advertising(&mut self, set: u8) -> Result<(), StackStatus> {
        self.accept(StackCommand::StopAdvertising, SimCommand::StopAdvertising(set))?;
        self.advertising = None;
        Ok(())
    }

    fn close_connection(&mut self, connection: u8) -> Result<(), StackStatus> {
        self.accept(StackCommand::CloseConnection, SimCommand::CloseConnection(connection))
    }

    fn set_pawr_response_data(&mut self, response: &PawrResponse<'_>) -> Result<(), StackStatus> {
        self.accept(
            StackCommand::SetPawrResponseData,
            SimCommand::PawrResponse {
                sync: response.sync,
                event_counter: response.event_counter,
                subevent: response.response_subevent,
                response_slot: response.response_slot,
                data: response.data.to_vec(),
            },
        )
    }

    fn send_user_write_response(
        &mut self,
        connection: u8,
        characteristic: u16,
        att_status: u8,
    ) -> Result<(), StackStatus> {
        self.accept(
            StackCommand::SendWriteResponse,
            SimCommand::WriteResponse {
                connection,
                characteristic,
                att_status,
            },
        )
    }
}

impl AttributePort for SimStack {
    fn attribute_handle(&self, attribute: Attribute) -> Option<u16> {
        match attribute {
            Attribute::DeviceName => Some(DEVICE_NAME_HANDLE),
            Attribute::DeviceAddress => Some(ADDRESS_HANDLE),
        }
    }

    fn read_attribute_value(
        &self,
        handle: u16,
        offset: u16,
        buf: &mut [u8],
    ) -> Result<usize, AttributeError> {
        let value = self.gatt.get(&handle).ok_or(AttributeError::InvalidHandle)?;
        let offset = offset as usize;
        if offset > value.len() {
            return Err(AttributeError::InvalidOffset);
        }
        let n = (value.len() - offset).min(buf.len());
        buf[..n].copy_from_slice(&value[offset..offset + n]);
        Ok(n)
    }
}

impl ClockPort for SimStack {
    fn tick_count(&self) -> u32 {
        self.clock.tick_count()
    }
}
