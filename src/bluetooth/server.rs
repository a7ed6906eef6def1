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


//! BlueZ backend: adapter bring-up and the RFCOMM listener.

use anyhow::{Context, Result};
use bluer::rfcomm::{Listener, SocketAddr, Stream};
use bluer::{Adapter, Address, Session};
use std::future::Future;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::address::BdAddr;
use super::constants::{SPP_RFCOMM_MTU, SPP_UUID};
use super::transport::StackControl;
use crate::runtime::LinkEvent;

/// Run an adapter call from the synchronous bring-up path.
///
/// Needs the multi-threaded runtime.
fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// [`StackControl`] over the default BlueZ adapter.
pub struct BluezStack {
    session: Session,
    adapter: Adapter,
    device_name: String,
    spp_start: Option<oneshot::Sender<u8>>,
}

impl BluezStack {
    /// Open a BlueZ session and power the default adapter.
    ///
    /// `spp_start` receives the RFCOMM channel once bring-up starts the SPP
    /// service.
    pub async fn new(device_name: &str, spp_start: oneshot::Sender<u8>) -> Result<Self> {
        info!("Initializing Bluetooth adapter...");

        let session = Session::new().await?;
        let adapter = session.default_adapter().await?;
        info!("Using Bluetooth adapter: {}", adapter.name());

        if !adapter.is_powered().await? {
            info!("Powering on Bluetooth adapter...");
            adapter.set_powered(true).await?;
        }

        Ok(Self {
            session,
            adapter,
            device_name: device_name.to_string(),
            spp_start: Some(spp_start),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl StackControl for BluezStack {
    fn set_local_address(&mut self, address: BdAddr) -> Result<()> {
        // bluetoothd owns the controller address.
        let current = BdAddr::from(block_on(self.adapter.address())?);
        if current != address {
            warn!(
                "Controller address {} is fixed, configured {} not applied",
                current, address
            );
        }
        Ok(())
    }

    fn read_local_address(&mut self) -> Result<BdAddr> {
        Ok(block_on(self.adapter.address())?.into())
    }

    fn write_eir(&mut self, eir: &[u8]) -> Result<()> {
        // bluetoothd builds the EIR from the alias and the registered services.
        debug!("EIR ({} bytes): {}", eir.len(), hex::encode(eir));
        block_on(self.adapter.set_alias(self.device_name.clone()))
            .context("Failed to set adapter alias")?;
        info!("Bluetooth name set to: {}", self.device_name);
        Ok(())
    }

    fn start_spp(&mut self, channel: u8, mtu: u16) -> Result<()> {
        let Some(start) = self.spp_start.take() else {
            debug!("SPP listener already started");
            return Ok(());
        };
        info!(
            "Starting SPP service {} on channel {} (MTU {})",
            SPP_UUID, channel, mtu
        );
        start
            .send(channel)
            .map_err(|_| anyhow::anyhow!("SPP listener is gone"))
    }

    fn set_pairable(&mut self, pairable: bool) -> Result<()> {
        block_on(self.adapter.set_pairable(pairable))?;
        Ok(())
    }

    fn set_discoverable(&mut self, discoverable: bool) -> Result<()> {
        block_on(async {
            self.adapter.set_discoverable_timeout(0).await?;
            self.adapter.set_discoverable(discoverable).await
        })?;
        Ok(())
    }

    fn set_connectable(&mut self, connectable: bool) -> Result<()> {
        // A powered BR/EDR adapter is page scanning.
        block_on(self.adapter.set_powered(connectable))?;
        Ok(())
    }
}

/// RFCOMM listener handing accepted connections to the event loop.
pub struct SppServer {
    queue_frames: usize,
    links: mpsc::Sender<LinkEvent>,
    last_handle: u16,
}

impl SppServer {
    pub fn new(queue_frames: usize, links: mpsc::Sender<LinkEvent>) -> Self {
        Self {
            queue_frames: queue_frames.max(1),
            links,
            last_handle: 0,
        }
    }

    /// Wait for bring-up to start the service, then accept connections.
    pub async fn listen(mut self, start: oneshot::Receiver<u8>) {
        let Ok(channel) = start.await else {
            debug!("SPP service never started");
            return;
        };

        let local_addr = SocketAddr::new(Address::any(), channel);
        let listener = match Listener::bind(local_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind RFCOMM channel {}: {}", channel, e);
                return;
            }
        };
        info!("RFCOMM server listening on channel {}", channel);

        loop {
            match listener.accept().await {
                Ok((stream, remote_addr)) => {
                    let handle = self.next_handle();
                    info!("Connection from {} as handle {}", remote_addr.addr, handle);
                    tokio::spawn(run_connection(
                        stream,
                        handle,
                        remote_addr.addr.into(),
                        self.queue_frames,
                        self.links.clone(),
                    ));
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                    // Continue listening despite errors
                    tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                }
            }
        }
    }

    fn next_handle(&mut self) -> u16 {
        self.last_handle = self.last_handle.wrapping_add(1).max(1);
        self.last_handle
    }
}

async fn run_connection(
    stream: Stream,
    handle: u16,
    peer: BdAddr,
    queue_frames: usize,
    links: mpsc::Sender<LinkEvent>,
) {
    let (mut reader, mut writer) = stream.into_split();
    let (outbound, mut frames) = mpsc::channel::<Vec<u8>>(queue_frames);

    let connected = LinkEvent::Connected {
        handle,
        peer: Some(peer),
        outbound,
    };
    if links.send(connected).await.is_err() {
        return;
    }

    let writer_task = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            if let Err(e) = writer.write_all(&frame).await {
                warn!("Write failed on handle {}: {}", handle, e);
                break;
            }
        }
    });

    let mut buf = vec![0u8; usize::from(SPP_RFCOMM_MTU)];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let (ack, ack_rx) = oneshot::channel();
                let event = LinkEvent::DataReceived {
                    handle,
                    data: Some(buf[..n].to_vec()),
                    ack: Some(ack),
                };
                if links.send(event).await.is_err() {
                    break;
                }
                if let Ok(false) = ack_rx.await {
                    debug!("Data on handle {} not accepted", handle);
                }
            }
            Err(e) => {
                warn!("Read failed on handle {}: {}", handle, e);
                break;
            }
        }
    }

    let _ = links.send(LinkEvent::Disconnected { handle }).await;
    writer_task.abort();
}
