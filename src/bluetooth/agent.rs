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


//! BlueZ pairing agent.
//!
//! PIN and confirmation requests are forwarded into the event loop as
//! management events and answered with the dispatcher's response.

use anyhow::Result;
use bluer::agent::{
    Agent, AgentHandle, ReqError, ReqResult, RequestConfirmation, RequestPinCode,
};
use bluer::Session;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::management::{ManagementEvent, ManagementResponse};
use crate::runtime::LinkEvent;

/// Registered agent. Unregistered on drop.
pub struct PairingAgent {
    _handle: AgentHandle,
}

impl PairingAgent {
    pub async fn register(session: &Session, links: mpsc::Sender<LinkEvent>) -> Result<Self> {
        let pin_links = links.clone();
        let confirm_links = links;

        let agent = Agent {
            request_default: true,
            request_pin_code: Some(Box::new(move |req: RequestPinCode| {
                let links = pin_links.clone();
                Box::pin(async move {
                    let event = ManagementEvent::PinRequest {
                        peer: req.device.into(),
                    };
                    match forward(&links, event).await? {
                        ManagementResponse::PinCode { pin, .. } => Ok(pin),
                        _ => Err(ReqError::Rejected),
                    }
                })
            })),
            request_confirmation: Some(Box::new(move |req: RequestConfirmation| {
                let links = confirm_links.clone();
                Box::pin(async move {
                    let event = ManagementEvent::UserConfirmationRequest {
                        peer: req.device.into(),
                        numeric_value: req.passkey,
                    };
                    match forward(&links, event).await? {
                        ManagementResponse::Confirmation { accept: true, .. } => Ok(()),
                        _ => Err(ReqError::Rejected),
                    }
                })
            })),
            ..Default::default()
        };

        let handle = session.register_agent(agent).await?;
        info!("Pairing agent registered");
        Ok(Self { _handle: handle })
    }
}

async fn forward(
    links: &mpsc::Sender<LinkEvent>,
    event: ManagementEvent,
) -> ReqResult<ManagementResponse> {
    let (reply, reply_rx) = oneshot::channel();
    let request = LinkEvent::Management {
        event,
        reply: Some(reply),
    };
    if links.send(request).await.is_err() {
        warn!("Event loop gone, rejecting pairing request");
        return Err(ReqError::Rejected);
    }
    reply_rx.await.map_err(|_| ReqError::Rejected)
}
