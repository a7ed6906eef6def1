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


//! SPP Server

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spp_server::commands::{Command, MENU};
use spp_server::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("spp_server=info".parse()?),
        )
        .init();

    info!("Starting SPP Server v{}...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded");

    let (command_tx, command_rx) = mpsc::channel::<Command>(8);
    tokio::spawn(read_console(command_tx));
    print!("{}", MENU);

    tokio::select! {
        result = serve(config, command_rx) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("SPP Server stopped");
    Ok(())
}

#[cfg(feature = "bluez")]
async fn serve(config: Config, commands: mpsc::Receiver<Command>) -> Result<()> {
    use spp_server::app::SppApplication;
    use spp_server::bluetooth::{BluezStack, ChannelTransport, PairingAgent, SppServer};
    use spp_server::events::{BringUp, ManagementDispatcher};
    use spp_server::runtime::{Runtime, TokioRetryTimer};
    use spp_server::state::AppState;
    use spp_server::storage::{FileNvram, LinkKeyStore};

    // Initialize storage
    let nvram = FileNvram::new(&config.data_dir)?;
    info!("Link key storage initialized");

    let (link_tx, link_rx) = mpsc::channel(32);
    let (spp_start, spp_started) = tokio::sync::oneshot::channel();

    let stack = BluezStack::new(&config.bluetooth.device_name, spp_start).await?;
    let _agent = PairingAgent::register(stack.session(), link_tx.clone()).await?;
    let server = SppServer::new(config.transfer.tx_queue_frames, link_tx);

    let app = SppApplication::new(
        ChannelTransport::new(),
        TokioRetryTimer::new(),
        config.transfer.job(),
        ManagementDispatcher::new(BringUp::from_config(&config), LinkKeyStore::new(nvram)),
    );
    let runtime = Runtime::new(app, Box::new(stack), AppState::new());

    // The listener starts once bring-up has configured the adapter.
    tokio::spawn(server.listen(spp_started));

    runtime.run(link_rx, commands).await
}

#[cfg(not(feature = "bluez"))]
async fn serve(_config: Config, _commands: mpsc::Receiver<Command>) -> Result<()> {
    anyhow::bail!("No Bluetooth backend compiled in, rebuild with `--features bluez`")
}

/// Feed console lines into the event loop.
async fn read_console(commands: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match Command::parse(&line) {
                Ok(command) => {
                    if commands.send(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => println!("{}", e),
            },
            Ok(None) => break,
            Err(e) => {
                warn!("Console read failed: {}", e);
                break;
            }
        }
    }
}
