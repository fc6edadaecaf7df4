//! BACnet device simulator
//!
//! Runs the BACnet/IP responder, the periodic I-Am announcement, the value
//! simulation and the HTTP control API until Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use tokio::sync::watch;

use bacnet_sim::http;
use bacnet_sim::server::ANNOUNCE_INITIAL_DELAY;
use bacnet_sim::transport::UdpTransport;
use bacnet_sim::{
    BacnetServer, ControlApi, PointStore, PropertyDispatcher, Responder, SimulationDriver,
    SimulatorConfig,
};

#[derive(Parser, Debug)]
#[command(name = "bacnet-simulator", version)]
#[command(about = "Simulated BACnet/IP device with an HTTP control API", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device instance number
    #[arg(long)]
    device_id: Option<u32>,

    /// UDP port for BACnet/IP
    #[arg(long)]
    bacnet_port: Option<u16>,

    /// First port tried for the control API
    #[arg(long)]
    http_port: Option<u16>,

    /// Log filter such as `debug` or `bacnet_sim=trace`, overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,
}

fn load_config(args: &Args) -> bacnet_sim::Result<SimulatorConfig> {
    let mut config = match &args.config {
        Some(path) => SimulatorConfig::load(path)?,
        None => SimulatorConfig::default(),
    };

    if let Some(device_id) = args.device_id {
        config.device.id = device_id;
    }
    if let Some(port) = args.bacnet_port {
        config = config.with_bacnet_port(port);
    }
    if let Some(port) = args.http_port {
        config.http.port = port;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = &args.log_level {
        logger.parse_filters(level);
    }
    logger.init();

    if let Err(err) = run(args).await {
        error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> bacnet_sim::Result<()> {
    let config = load_config(&args)?;

    let store = Arc::new(PointStore::new(config.device.clone()));
    let device = store.get_device();
    info!("Starting BACnet simulator");
    info!("Device ID: {}", device.id);
    info!("Device Name: {}", device.name);

    let dispatcher =
        PropertyDispatcher::new(store.clone()).with_policy(config.protocol.write_policy());
    let transport = Arc::new(UdpTransport::bind(&config.bacnet.transport_config())?);
    let server = Arc::new(BacnetServer::new(Responder::new(dispatcher), transport));

    let (simulation, _) = watch::channel(config.simulation);
    let control = Arc::new(ControlApi::new(store.clone(), simulation).with_announcer(server.clone()));
    let driver = SimulationDriver::new(store.clone(), control.subscribe_simulation());

    let listener =
        http::bind_listener(config.http.host, config.http.port, config.http.port_attempts).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let responder_task = {
        let server = server.clone();
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { server.run(shutdown).await })
    };
    let announce_task = {
        let server = server.clone();
        let shutdown = shutdown_rx.clone();
        let interval = config.bacnet.announce_interval();
        tokio::spawn(async move {
            server
                .announce_loop(ANNOUNCE_INITIAL_DELAY, interval, shutdown)
                .await
        })
    };
    let simulation_task = tokio::spawn(driver.run(shutdown_rx.clone()));
    let http_task = tokio::spawn(http::serve(listener, control, shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    let _ = shutdown_tx.send(true);

    match responder_task.await {
        Ok(Err(err)) => error!("Responder stopped with error: {}", err),
        Err(err) => error!("Responder task failed: {}", err),
        Ok(Ok(())) => {}
    }
    match http_task.await {
        Ok(Err(err)) => error!("Control API stopped with error: {}", err),
        Err(err) => error!("Control API task failed: {}", err),
        Ok(Ok(())) => {}
    }
    let _ = tokio::join!(announce_task, simulation_task);

    info!("Simulator stopped");
    Ok(())
}
