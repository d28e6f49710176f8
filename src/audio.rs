//! Audio input: opens the capture stream and feeds each block's loudness to
//! the controller from inside the audio callback.

use anyhow::Context;
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig,
};
use tracing::{debug, info, warn};

use crate::{config::AudioConfig, controller::Controller, level};

/// Names of every audio input device on the default host.
pub fn input_device_names() -> anyhow::Result<Vec<String>> {
    let host = cpal::default_host();
    let names = host
        .input_devices()
        .context("failed to enumerate audio inputs")?
        .filter_map(|device| device.name().ok())
        .collect();
    Ok(names)
}

fn find_device(name: Option<&str>) -> anyhow::Result<Device> {
    let host = cpal::default_host();

    match name {
        Some(name) => host
            .input_devices()
            .context("failed to enumerate audio inputs")?
            .find(|device| device.name().ok().as_deref() == Some(name))
            .with_context(|| format!("audio input {name:?} not found")),
        None => host
            .default_input_device()
            .context("no default audio input device"),
    }
}

/// Opens and starts the input stream. The stream stops when dropped, which
/// also drops `controller`.
pub fn start(config: &AudioConfig, controller: Controller) -> anyhow::Result<Stream> {
    let device = find_device(config.device.as_deref())?;
    let default_config = device
        .default_input_config()
        .context("failed to query audio input config")?;
    let sample_format = default_config.sample_format();

    let mut stream_config: StreamConfig = default_config.into();
    stream_config.channels = config.channels;
    stream_config.sample_rate = cpal::SampleRate(config.sample_rate);

    info!(
        "opening audio input {:?} ({} ch, {} Hz, {sample_format:?})",
        device.name().unwrap_or_default(),
        stream_config.channels,
        stream_config.sample_rate.0,
    );

    let gain = config.gain;
    let stream = match sample_format {
        SampleFormat::F32 => build::<f32>(&device, &stream_config, gain, controller)?,
        SampleFormat::I16 => build::<i16>(&device, &stream_config, gain, controller)?,
        SampleFormat::U16 => build::<u16>(&device, &stream_config, gain, controller)?,
        format => anyhow::bail!("unsupported sample format {format}"),
    };

    stream.play().context("failed to start audio input")?;
    debug!("audio input running");

    Ok(stream)
}

fn build<T>(
    device: &Device,
    config: &StreamConfig,
    gain: f32,
    mut controller: Controller,
) -> anyhow::Result<Stream>
where
    T: Sample + SizedSample,
    f32: FromSample<T>,
{
    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let loudness = level::loudness(data.iter().map(|s| f32::from_sample(*s)), gain);
                controller.on_loudness(loudness);
            },
            |err| warn!("audio input stream error: {err}"),
            None,
        )
        .context("failed to build audio input stream")?;

    Ok(stream)
}
