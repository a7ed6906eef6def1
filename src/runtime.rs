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


//! Single-task event loop.
//!
//! Link events, console commands and the retry timer are all served from one
//! `select!` loop, so the session and the transfer job are never touched
//! concurrently.

use anyhow::Result;
use futures::future::OptionFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::app::{RetryTimer, SppApplication};
use crate::bluetooth::{
    BdAddr, ChannelTransport, ManagementEvent, ManagementResponse, StackControl,
};
use crate::commands::{Command, MENU};
use crate::state::AppState;
use crate::storage::KeyValueStore;
use crate::transfer::TransferStep;

/// Events delivered by the Bluetooth backend.
#[derive(Debug)]
pub enum LinkEvent {
    /// A peer connected. Outbound frames for `handle` go into `outbound`.
    Connected {
        handle: u16,
        peer: Option<BdAddr>,
        outbound: mpsc::Sender<Vec<u8>>,
    },
    Disconnected {
        handle: u16,
    },
    DataReceived {
        handle: u16,
        data: Option<Vec<u8>>,
        ack: Option<oneshot::Sender<bool>>,
    },
    /// A management event waiting for its answer.
    Management {
        event: ManagementEvent,
        reply: Option<oneshot::Sender<ManagementResponse>>,
    },
}

/// Retry timer driven by the event loop.
#[derive(Debug, Default)]
pub struct TokioRetryTimer {
    deadline: Option<Instant>,
}

impl TokioRetryTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

impl RetryTimer for TokioRetryTimer {
    fn arm(&mut self, delay: Duration) {
        self.deadline = Some(Instant::now() + delay);
    }

    fn cancel(&mut self) {
        self.deadline = None;
    }

    fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}

pub type RuntimeApp<S> = SppApplication<ChannelTransport, TokioRetryTimer, S>;

/// Owns the application and serves it from one task.
pub struct Runtime<S: KeyValueStore> {
    app: RuntimeApp<S>,
    stack: Box<dyn StackControl + Send>,
    state: Arc<AppState>,
}

impl<S: KeyValueStore> Runtime<S> {
    pub fn new(
        app: RuntimeApp<S>,
        stack: Box<dyn StackControl + Send>,
        state: Arc<AppState>,
    ) -> Self {
        Self { app, stack, state }
    }

    /// Bring the stack up, then serve events until `quit` or until the link
    /// channel closes.
    ///
    /// Returns an error only when bring-up fails.
    pub async fn run(
        mut self,
        mut links: mpsc::Receiver<LinkEvent>,
        mut commands: mpsc::Receiver<Command>,
    ) -> Result<()> {
        self.app.start(self.stack.as_mut())?;
        self.publish();
        info!("Ready");

        let mut commands_open = true;

        loop {
            let retry: OptionFuture<_> = self
                .app
                .timer()
                .deadline()
                .map(tokio::time::sleep_until)
                .into();

            tokio::select! {
                biased;

                event = links.recv() => match event {
                    Some(event) => self.on_link_event(event)?,
                    None => {
                        info!("Link event channel closed");
                        break;
                    }
                },
                Some(()) = retry => {
                    debug!("Retry timer fired");
                    self.app.on_retry_timer();
                }
                command = commands.recv(), if commands_open => match command {
                    Some(Command::Quit) => {
                        info!("Quit requested");
                        break;
                    }
                    Some(command) => self.on_command(command),
                    None => {
                        debug!("Command input closed");
                        commands_open = false;
                    }
                },
            }

            self.publish();
        }

        self.publish();
        Ok(())
    }

    fn publish(&self) {
        self.state.publish(self.app.status());
    }

    fn on_link_event(&mut self, event: LinkEvent) -> Result<()> {
        match event {
            LinkEvent::Connected {
                handle,
                peer,
                outbound,
            } => {
                // A rejected connect leaves the current link untouched.
                if self.app.on_connect(handle, peer) {
                    self.app.transport_mut().attach(handle, outbound);
                }
            }
            LinkEvent::Disconnected { handle } => {
                self.app.on_disconnect(handle);
                self.app.transport_mut().detach(handle);
            }
            LinkEvent::DataReceived { handle, data, ack } => {
                let accepted = self.app.on_data_received(handle, data.as_deref());
                if let Some(ack) = ack {
                    let _ = ack.send(accepted);
                }
            }
            LinkEvent::Management { event, reply } => {
                let response = self
                    .app
                    .handle_management_event(event, self.stack.as_mut())?;
                if let Some(reply) = reply {
                    if reply.send(response).is_err() {
                        warn!("Management reply dropped by the backend");
                    }
                }
            }
        }
        Ok(())
    }

    fn on_command(&mut self, command: Command) {
        if command.needs_session() && !self.app.session().is_active() {
            println!("SPP not connected");
            return;
        }

        match command {
            Command::Menu => print!("{}", MENU),
            Command::Status => println!("{}", self.app.status()),
            Command::Bulk => match self.app.send_bulk_job() {
                TransferStep::Completed { bytes } => println!("Sent {} bytes", bytes),
                TransferStep::RetryAfter(_) => println!("Bulk transfer waiting for credit"),
                TransferStep::Abandoned { sent } => {
                    println!("Bulk transfer abandoned after {} bytes", sent)
                }
                TransferStep::Idle => {}
            },
            Command::Send(text) => {
                if !self.app.send_data(text.as_bytes()) {
                    println!("Send failed");
                }
            }
            Command::Quit => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::DEFAULT_LOCAL_ADDRESS;
    use crate::events::{BringUp, ManagementDispatcher};
    use crate::storage::{LinkKeyRecord, LinkKeyStore, MemoryNvram};
    use crate::transfer::{Payload, TransferJob};
    use anyhow::anyhow;

    struct NullStack {
        fail: bool,
    }

    impl StackControl for NullStack {
        fn set_local_address(&mut self, _address: BdAddr) -> Result<()> {
            if self.fail {
                return Err(anyhow!("controller unavailable"));
            }
            Ok(())
        }
        fn read_local_address(&mut self) -> Result<BdAddr> {
            Ok(DEFAULT_LOCAL_ADDRESS)
        }
        fn write_eir(&mut self, _eir: &[u8]) -> Result<()> {
            Ok(())
        }
        fn start_spp(&mut self, _channel: u8, _mtu: u16) -> Result<()> {
            Ok(())
        }
        fn set_pairable(&mut self, _pairable: bool) -> Result<()> {
            Ok(())
        }
        fn set_discoverable(&mut self, _discoverable: bool) -> Result<()> {
            Ok(())
        }
        fn set_connectable(&mut self, _connectable: bool) -> Result<()> {
            Ok(())
        }
    }

    struct Harness {
        links: mpsc::Sender<LinkEvent>,
        commands: mpsc::Sender<Command>,
        state: Arc<AppState>,
        task: tokio::task::JoinHandle<Result<()>>,
    }

    fn spawn_runtime(total: usize, fail: bool) -> Harness {
        let bring_up = BringUp {
            device_name: "spp test".to_string(),
            local_address: DEFAULT_LOCAL_ADDRESS,
            rfcomm_channel: 2,
            pin_code: "1234".to_string(),
        };
        let app = SppApplication::new(
            ChannelTransport::new(),
            TokioRetryTimer::new(),
            TransferJob::new(
                Payload::Pattern { len: total },
                100,
                3,
                Duration::from_millis(100),
            ),
            ManagementDispatcher::new(bring_up, LinkKeyStore::new(MemoryNvram::new())),
        );
        let state = AppState::new();
        let runtime = Runtime::new(app, Box::new(NullStack { fail }), state.clone());

        let (links, link_rx) = mpsc::channel(8);
        let (commands, command_rx) = mpsc::channel(8);
        let task = tokio::spawn(runtime.run(link_rx, command_rx));

        Harness {
            links,
            commands,
            state,
            task,
        }
    }

    fn peer() -> BdAddr {
        BdAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    async fn connect(h: &Harness, handle: u16, depth: usize) -> mpsc::Receiver<Vec<u8>> {
        let (outbound, rx) = mpsc::channel(depth);
        h.links
            .send(LinkEvent::Connected {
                handle,
                peer: Some(peer()),
                outbound,
            })
            .await
            .unwrap();
        settle().await;
        rx
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_job_paced_by_timer() {
        let h = spawn_runtime(250, false);
        let mut rx = connect(&h, 7, 1).await;
        assert!(h.state.is_connected());

        h.commands.send(Command::Bulk).await.unwrap();

        let started = Instant::now();
        let mut lens = Vec::new();
        for _ in 0..3 {
            lens.push(rx.recv().await.unwrap().len());
        }
        assert_eq!(lens, vec![100, 100, 50]);
        assert!(started.elapsed() >= Duration::from_millis(200));

        settle().await;
        let status = h.state.status();
        assert_eq!(status.tx_offset, 0);
        assert_eq!(status.retry_count, 0);
        assert!(!status.retry_armed);

        h.commands.send(Command::Quit).await.unwrap();
        h.task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_peer_abandons_job() {
        let h = spawn_runtime(250, false);
        let _rx = connect(&h, 7, 1).await;

        h.commands.send(Command::Bulk).await.unwrap();
        settle().await;
        assert!(h.state.status().retry_armed);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let status = h.state.status();
        assert!(!status.retry_armed);
        assert_eq!(status.tx_offset, 0);
        assert_eq!(status.retry_count, 0);
        assert!(status.connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_mid_transfer_then_reconnect() {
        let h = spawn_runtime(250, false);
        let mut old = connect(&h, 7, 1).await;

        h.commands.send(Command::Bulk).await.unwrap();
        settle().await;
        assert_eq!(h.state.status().tx_offset, 100);

        h.links
            .send(LinkEvent::Disconnected { handle: 7 })
            .await
            .unwrap();
        let mut new = connect(&h, 8, 4).await;

        let status = h.state.status();
        assert_eq!(status.handle, 8);
        assert_eq!(status.tx_offset, 0);
        assert!(!status.retry_armed);

        // Nothing from the abandoned job reaches the new link.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(new.try_recv().is_err());
        assert_eq!(old.recv().await.unwrap().len(), 100);
        assert!(old.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_data_ack_and_management_reply() {
        let h = spawn_runtime(250, false);
        let _rx = connect(&h, 7, 1).await;

        let (ack, ack_rx) = oneshot::channel();
        h.links
            .send(LinkEvent::DataReceived {
                handle: 7,
                data: Some(vec![0x41; 100]),
                ack: Some(ack),
            })
            .await
            .unwrap();
        assert!(ack_rx.await.unwrap());

        let (ack, ack_rx) = oneshot::channel();
        h.links
            .send(LinkEvent::DataReceived {
                handle: 7,
                data: None,
                ack: Some(ack),
            })
            .await
            .unwrap();
        assert!(!ack_rx.await.unwrap());
        settle().await;
        assert_eq!(h.state.status().rx_bytes, 100);

        let (reply, reply_rx) = oneshot::channel();
        h.links
            .send(LinkEvent::Management {
                event: ManagementEvent::PinRequest { peer: peer() },
                reply: Some(reply),
            })
            .await
            .unwrap();
        assert_eq!(
            reply_rx.await.unwrap(),
            ManagementResponse::PinCode {
                peer: peer(),
                pin: "1234".to_string()
            }
        );

        let record = LinkKeyRecord {
            peer: peer(),
            link_key: [0x5A; 16],
            key_type: 4,
        };
        h.links
            .send(LinkEvent::Management {
                event: ManagementEvent::LinkKeysUpdate(record),
                reply: None,
            })
            .await
            .unwrap();
        let (reply, reply_rx) = oneshot::channel();
        h.links
            .send(LinkEvent::Management {
                event: ManagementEvent::LinkKeysRequest { peer: peer() },
                reply: Some(reply),
            })
            .await
            .unwrap();
        assert_eq!(reply_rx.await.unwrap(), ManagementResponse::LinkKeys(record));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_connect_keeps_live_link() {
        let h = spawn_runtime(250, false);
        let mut live = connect(&h, 7, 8).await;

        let (outbound, _rejected) = mpsc::channel(8);
        h.links
            .send(LinkEvent::Connected {
                handle: 9,
                peer: None,
                outbound,
            })
            .await
            .unwrap();
        h.commands.send(Command::Send("hi".to_string())).await.unwrap();
        settle().await;

        let status = h.state.status();
        assert!(status.connected);
        assert_eq!(status.handle, 7);
        assert_eq!(live.try_recv().unwrap(), b"hi".to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replaced_connection_events_are_ignored() {
        let h = spawn_runtime(250, false);
        let _old = connect(&h, 7, 4).await;
        let mut new = connect(&h, 8, 4).await;

        let (ack, ack_rx) = oneshot::channel();
        h.links
            .send(LinkEvent::DataReceived {
                handle: 7,
                data: Some(vec![0x41; 10]),
                ack: Some(ack),
            })
            .await
            .unwrap();
        assert!(!ack_rx.await.unwrap());

        h.links
            .send(LinkEvent::Disconnected { handle: 7 })
            .await
            .unwrap();
        h.commands.send(Command::Send("ok".to_string())).await.unwrap();
        settle().await;

        let status = h.state.status();
        assert!(status.connected);
        assert_eq!(status.handle, 8);
        assert_eq!(status.rx_bytes, 0);
        assert_eq!(new.try_recv().unwrap(), b"ok".to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bring_up_failure_stops_runtime() {
        let h = spawn_runtime(250, true);
        assert!(h.task.await.unwrap().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_channel_close_ends_loop() {
        let h = spawn_runtime(250, false);
        drop(h.links);
        h.task.await.unwrap().unwrap();
        drop(h.commands);
    }
}
