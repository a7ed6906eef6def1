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

//! Flow-controlled bulk transfer.
//!
//! A job is pushed frame by frame while the transport grants capacity. When
//! the transport pushes back, [`TransferJob::send_job`] returns
//! [`TransferStep::RetryAfter`] and the caller schedules another call; it
//! never sleeps itself. After `max_retries` consecutive stalls the job is
//! abandoned.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bluetooth::constants::{transfer, SPP_MAX_PAYLOAD};
use crate::bluetooth::SppTransport;
use crate::session::Session;

/// Data pushed by a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Self-verifying test data: byte `i` of the stream is `i as u8`.
    Pattern { len: usize },
    /// Caller-supplied bytes.
    Bytes(Vec<u8>),
}

impl Payload {
    pub fn len(&self) -> usize {
        match self {
            Self::Pattern { len } => *len,
            Self::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace `frame` with `len` bytes of the payload starting at `offset`.
    fn fill(&self, offset: usize, len: usize, frame: &mut Vec<u8>) {
        frame.clear();
        match self {
            Self::Pattern { .. } => frame.extend((offset..offset + len).map(|i| i as u8)),
            Self::Bytes(bytes) => frame.extend_from_slice(&bytes[offset..offset + len]),
        }
    }
}

/// Result of one [`TransferJob::send_job`] invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStep {
    /// No active session, or nothing left to send.
    Idle,
    /// Every byte was accepted; the offset is back at zero.
    Completed { bytes: usize },
    /// The transport pushed back; call again after the delay.
    RetryAfter(Duration),
    /// Retry budget exhausted; the job was dropped after `sent` bytes.
    Abandoned { sent: usize },
}

/// Outbound bulk job parameters.
///
/// Progress lives in [`Session::tx_offset`] and [`Session::retry_count`] so a
/// disconnect resets it together with the session.
#[derive(Debug, Clone)]
pub struct TransferJob {
    payload: Payload,
    max_payload: usize,
    max_retries: u32,
    retry_delay: Duration,
    frame: Vec<u8>,
}

impl Default for TransferJob {
    fn default() -> Self {
        Self::new(
            Payload::Pattern {
                len: transfer::TOTAL_BYTES,
            },
            SPP_MAX_PAYLOAD,
            transfer::MAX_RETRIES,
            Duration::from_millis(transfer::RETRY_DELAY_MS),
        )
    }
}

impl TransferJob {
    pub fn new(
        payload: Payload,
        max_payload: usize,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        let max_payload = max_payload.max(1);
        Self {
            payload,
            max_payload,
            max_retries,
            retry_delay,
            frame: Vec::with_capacity(max_payload),
        }
    }

    pub fn total(&self) -> usize {
        self.payload.len()
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Swap the payload. Only meaningful while no job is in flight.
    pub fn set_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    /// Push as much of the job as the transport accepts.
    pub fn send_job<T: SppTransport + ?Sized>(
        &mut self,
        session: &mut Session,
        transport: &mut T,
    ) -> TransferStep {
        let total = self.total();
        debug!(
            "send_job entry: handle {} offset {}/{}",
            session.handle, session.tx_offset, total
        );

        if !session.is_active() {
            debug!("send_job: no active session");
            return TransferStep::Idle;
        }
        if session.tx_offset >= total {
            debug!("send_job: nothing to send");
            return TransferStep::Idle;
        }

        while session.is_active() && session.tx_offset < total {
            let chunk = self.max_payload.min(total - session.tx_offset);

            if !transport.can_send_more(session.handle) {
                debug!("No send capacity at offset {}", session.tx_offset);
                break;
            }

            self.payload.fill(session.tx_offset, chunk, &mut self.frame);

            if !transport.send(session.handle, &self.frame) {
                debug!("Frame of {} bytes rejected at offset {}", chunk, session.tx_offset);
                break;
            }

            session.tx_offset += chunk;
            session.retry_count = 0;
        }

        if session.tx_offset >= total {
            info!("Sent {} bytes of data", total);
            session.tx_offset = 0;
            return TransferStep::Completed { bytes: total };
        }

        if session.retry_count >= self.max_retries {
            let sent = session.tx_offset;
            warn!(
                "Reached max tx retries ({}) at offset {}, terminating transfer. \
                 Make sure the peer is granting credit",
                self.max_retries, sent
            );
            session.tx_offset = 0;
            session.retry_count = 0;
            return TransferStep::Abandoned { sent };
        }

        session.retry_count += 1;
        debug!(
            "Retry {} scheduled in {:?} at offset {}",
            session.retry_count, self.retry_delay, session.tx_offset
        );
        TransferStep::RetryAfter(self.retry_delay)
    }
}
