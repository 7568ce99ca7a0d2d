use clap::Parser;
use color_eyre::Result;
use ppba_alpaca::{
    cli,
    config::Config,
    device::switch::SWITCH,
    discovery::{MdnsAdvertiser, TxtRecord},
    gateway::Gateway,
    logging,
    mock::MockBoxBuilder,
    serial::serial_port,
    server,
};

use tracing::{debug, error, info, warn};

#[cfg(unix)]
async fn hangup() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::hangup()) {
        Ok(mut hangup) => {
            hangup.recv().await;
        }
        Err(e) => {
            warn!(%e, "Cannot listen for hangups");
            futures::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn hangup() {
    futures::future::pending::<()>().await
}

/// Advertising is a convenience, the gateway works without it.
async fn advertise(config: &Config, port: u16) -> Option<MdnsAdvertiser> {
    let record = TxtRecord {
        device_type: SWITCH.into(),
        device_number: config.device_number,
        manufacturer: config.discovery.manufacturer.clone(),
    };

    let advertiser = match MdnsAdvertiser::new() {
        Ok(advertiser) => advertiser,
        Err(e) => {
            warn!(%e, "Not advertising");
            return None;
        }
    };

    match advertiser.start(&config.discovery.name, port, &record).await {
        Ok(()) => Some(advertiser),
        Err(e) => {
            warn!(%e, "Not advertising");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = cli::Cli::parse();

    if let Some(command) = cli.command {
        println!("{}", cli::handle_command(command)?);

        return Ok(());
    }

    let config = if let Some(config_path) = &cli.config {
        Config::new_from_path(config_path)?
    } else {
        Config::default()
    };
    config.validate()?;

    let level = match cli.log_level {
        Some(level) => level,
        None => config.logging.level()?,
    };
    let file_logging = config.logging.directory.clone().map(|dir| (level, dir));
    logging::init(level, file_logging).await;

    debug!(config_path = ?cli.config, ?config, "Configuration");
    info!(
        address = %config.server.address,
        port = config.server.port,
        serial = %config.serial.path,
        baud = config.serial.baud,
        devices = ?config.device_numbers(),
        "Starting PPBA Alpaca gateway"
    );

    let gateway = if config.serial.mock {
        warn!("Talking to a simulated box, no hardware is switched");
        let (link, _mock) = MockBoxBuilder::new().build();

        Gateway::new(link, &config).await?
    } else {
        Gateway::new(serial_port::open(&config.serial)?, &config).await?
    };

    if let Err(e) = gateway.initialize().await {
        error!(%e, "Aborting startup");
        return Err(e.into());
    }

    let mut server = server::spawn(&config.server, gateway.registry()).await?;

    let advertiser = if config.discovery.enabled {
        advertise(&config, server.local_addr().port()).await
    } else {
        debug!("Discovery disabled");
        None
    };

    info!("Press Ctrl+C to exit");

    let result = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C, quitting");
            Ok(())
        }
        _ = hangup() => {
            info!("Told to hang up, quitting");
            Ok(())
        }
        _ = server.stopped() => {
            error!("Server returned");
            Err(color_eyre::eyre::eyre!("Server stopped unexpectedly"))
        }
    };

    if let Some(advertiser) = advertiser {
        advertiser.stop().await;
    }

    server.stop().await;
    gateway.shutdown().await;

    result
}
