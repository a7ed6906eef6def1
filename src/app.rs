// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! The SPP application: one session, one outbound job, one retry timer.
//!
//! All entry points run on a single dispatch context. Effects returned by
//! the transfer engine are executed here, so the engine itself never touches
//! a timer.

use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bluetooth::{BdAddr, ManagementEvent, ManagementResponse, SppTransport, StackControl};
use crate::events::ManagementDispatcher;
use crate::session::Session;
use crate::state::Status;
use crate::storage::KeyValueStore;
use crate::transfer::{Payload, TransferJob, TransferStep};

/// One-shot timer that re-invokes the transfer engine.
///
/// When the timer fires, the owner calls [`SppApplication::on_retry_timer`].
pub trait RetryTimer {
    fn arm(&mut self, delay: Duration);
    fn cancel(&mut self);
    fn is_armed(&self) -> bool;
}

/// Session, transfer job and dispatcher wired to a transport and a timer.
pub struct SppApplication<T, R, S>
where
    T: SppTransport,
    R: RetryTimer,
    S: KeyValueStore,
{
    session: Session,
    job: TransferJob,
    transport: T,
    timer: R,
    dispatcher: ManagementDispatcher<S>,
}

impl<T, R, S> SppApplication<T, R, S>
where
    T: SppTransport,
    R: RetryTimer,
    S: KeyValueStore,
{
    pub fn new(
        transport: T,
        timer: R,
        job: TransferJob,
        dispatcher: ManagementDispatcher<S>,
    ) -> Self {
        Self {
            session: Session::new(),
            job,
            transport,
            timer,
            dispatcher,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn job(&self) -> &TransferJob {
        &self.job
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn timer(&self) -> &R {
        &self.timer
    }

    /// Run the one-time bring-up if the stack has not been initialized yet.
    pub fn start(&mut self, stack: &mut dyn StackControl) -> Result<()> {
        if self.dispatcher.is_initialized() {
            debug!("Already started");
            return Ok(());
        }
        self.dispatcher
            .handle(ManagementEvent::Enabled { success: true }, stack)?;
        Ok(())
    }

    pub fn handle_management_event(
        &mut self,
        event: ManagementEvent,
        stack: &mut dyn StackControl,
    ) -> Result<ManagementResponse> {
        self.dispatcher.handle(event, stack)
    }

    /// A connection came up. Any job left over from a previous session is
    /// dropped together with its timer.
    pub fn on_connect(&mut self, handle: u16, peer_address: Option<BdAddr>) -> bool {
        if !self.session.on_connect(handle, peer_address) {
            return false;
        }
        if self.timer.is_armed() {
            debug!("Dropping retry timer of the replaced session");
            self.timer.cancel();
        }
        true
    }

    /// A connection went down. Events for a handle other than the current
    /// session's are ignored.
    pub fn on_disconnect(&mut self, handle: u16) {
        if self.session.is_active() && handle != self.session.handle {
            debug!(
                "Ignoring disconnect of handle {}, session is {}",
                handle, self.session.handle
            );
            return;
        }
        self.session.on_disconnect(handle);
        if self.timer.is_armed() {
            debug!("Cancelling pending retry");
            self.timer.cancel();
        }
    }

    /// Data arrived. Only the current session's data is accepted.
    pub fn on_data_received(&mut self, handle: u16, data: Option<&[u8]>) -> bool {
        if handle != self.session.handle {
            warn!(
                "Dropping data on handle {}, session is {}",
                handle, self.session.handle
            );
            return false;
        }
        self.session.on_data_received(handle, data)
    }

    /// Start the bulk job on demand.
    ///
    /// A no-op while idle or while a retry is pending; the armed timer
    /// continues the job in that case.
    pub fn send_bulk_job(&mut self) -> TransferStep {
        if !self.session.is_active() {
            info!("SPP not connected");
            return TransferStep::Idle;
        }
        if self.timer.is_armed() {
            info!(
                "Bulk job already in progress at offset {}",
                self.session.tx_offset
            );
            return TransferStep::Idle;
        }
        self.run_job()
    }

    /// Start a bulk job over caller-supplied bytes.
    ///
    /// The bytes replace the configured payload for later jobs as well.
    pub fn send_bulk_bytes(&mut self, data: Vec<u8>) -> TransferStep {
        if !self.session.is_active() || self.timer.is_armed() {
            return self.send_bulk_job();
        }
        self.job.set_payload(Payload::Bytes(data));
        self.run_job()
    }

    /// The retry timer fired. A fire after the timer was cancelled is a no-op.
    pub fn on_retry_timer(&mut self) -> TransferStep {
        if !self.timer.is_armed() {
            debug!("Stale retry timer fire ignored");
            return TransferStep::Idle;
        }
        self.timer.cancel();
        self.run_job()
    }

    /// Send `data` as a single frame.
    pub fn send_data(&mut self, data: &[u8]) -> bool {
        if !self.session.is_active() {
            info!("SPP not connected");
            return false;
        }
        if data.is_empty() {
            warn!("Refusing to send an empty frame");
            return false;
        }
        if data.len() > self.job.max_payload() {
            warn!(
                "Frame of {} bytes exceeds max payload {}",
                data.len(),
                self.job.max_payload()
            );
            return false;
        }
        let handle = self.session.handle;
        if !self.transport.can_send_more(handle) {
            warn!("No send capacity on handle {}", handle);
            return false;
        }
        if !self.transport.send(handle, data) {
            warn!("Frame of {} bytes rejected on handle {}", data.len(), handle);
            return false;
        }
        info!("Sent {} bytes on handle {}", data.len(), handle);
        true
    }

    pub fn status(&self) -> Status {
        Status {
            connected: self.session.is_active(),
            handle: self.session.handle,
            peer: self.session.is_active().then_some(self.session.peer_address),
            rx_bytes: self.session.rx_byte_count,
            tx_offset: self.session.tx_offset,
            retry_count: self.session.retry_count,
            retry_armed: self.timer.is_armed(),
        }
    }

    fn run_job(&mut self) -> TransferStep {
        let step = self.job.send_job(&mut self.session, &mut self.transport);
        match step {
            TransferStep::RetryAfter(delay) => self.timer.arm(delay),
            TransferStep::Completed { bytes } => {
                debug!("Bulk job completed: {} bytes", bytes)
            }
            TransferStep::Abandoned { sent } => {
                debug!("Bulk job abandoned after {} bytes", sent)
            }
            TransferStep::Idle => {}
        }
        step
    }
}
