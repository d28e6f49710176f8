use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod animator;
mod audio;
mod config;
mod controller;
mod driver;
mod level;
mod mapper;
mod topology;
mod util;

use crate::{
    animator::Animator,
    config::Config,
    controller::{Controller, Shutdown},
    driver::{ChannelSink, PadGrid},
    mapper::PadMapper,
};

/// Lights controller pads from live audio loudness.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON config file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print audio inputs and MIDI outputs, then exit.
    #[arg(long)]
    list_devices: bool,

    /// Print the effective configuration as JSON, then exit.
    #[arg(long)]
    print_config: bool,
}

fn list_devices() -> anyhow::Result<()> {
    println!("audio inputs:");
    for (i, name) in audio::input_device_names()?.iter().enumerate() {
        println!("  {i}: {name}");
    }

    println!("midi outputs:");
    for (i, name) in driver::midi::port_names()?.iter().enumerate() {
        println!("  {i}: {name}");
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if args.list_devices {
        return list_devices();
    }

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let topology = Arc::new(config.validate().context("invalid configuration")?);
    info!(
        "{} pads in {} zones",
        topology.len(),
        topology.zones().len()
    );

    let cts = CancellationToken::new();
    let ct = cts.clone();

    ctrlc::set_handler(move || {
        info!("received ctrl+c, exiting");
        cts.cancel();
    })?;

    let conn = driver::midi::open(&config.midi.port)?;
    let (cmd_tx, cmd_rx) = flume::bounded(256);
    let output_join = driver::midi::spawn_thread(conn, config.midi.channel, cmd_rx);

    let grid = PadGrid::new(ChannelSink::new(cmd_tx));

    let animator = Animator::spawn(
        ct.clone(),
        config.animation(&topology),
        topology.clone(),
        grid.clone(),
        config.interval(),
    );
    let controller = Controller::new(
        PadMapper::new(topology.clone(), config.hysteresis),
        animator.handle(),
        grid.clone(),
        config.silence_threshold,
    );

    // from here on the pads are cleared however we leave this scope
    let mut shutdown = Shutdown::new(animator, grid, topology);

    let result = (move || {
        let stream = audio::start(&config.audio, controller)?;
        info!("running, ctrl+c to exit");

        futures::executor::block_on(ct.cancelled());

        drop(stream);
        anyhow::Ok(())
    })();

    shutdown.finish();
    drop(shutdown);

    // the last grid handle is gone, so the output thread drains and closes
    output_join
        .join()
        .map_err(|_| anyhow::anyhow!("midi output thread panicked"))??;

    result?;

    info!("exit");

    Ok(())
}
