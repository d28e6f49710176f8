//! MIDI transport for the pad grid.

use std::{thread::JoinHandle, time::Duration};

use anyhow::Context;
use midir::{MidiOutput, MidiOutputConnection};
use tracing::{debug, info, trace, warn};

use super::{Error, PadCommand};

const CLIENT_NAME: &str = "padlight";

/// Names of every MIDI output port currently visible.
pub fn port_names() -> anyhow::Result<Vec<String>> {
    let out = MidiOutput::new(CLIENT_NAME).context("failed to create midi client")?;
    let names = out
        .ports()
        .iter()
        .filter_map(|port| out.port_name(port).ok())
        .collect();
    Ok(names)
}

/// Opens the named output port. An exact name match wins, otherwise the first
/// port whose name contains `port_name`.
pub fn open(port_name: &str) -> anyhow::Result<MidiOutputConnection> {
    let out = MidiOutput::new(CLIENT_NAME).context("failed to create midi client")?;
    let ports = out.ports();

    let names: Vec<_> = ports
        .iter()
        .map(|port| out.port_name(port).unwrap_or_default())
        .collect();

    let idx = find_port(&names, port_name)
        .with_context(|| format!("midi output port {port_name:?} not found (have {names:?})"))?;

    let conn = out
        .connect(&ports[idx], "padlight-out")
        .map_err(|err| anyhow::anyhow!("failed to open midi output {:?}: {err}", names[idx]))?;

    info!("opened midi output {:?}", names[idx]);

    Ok(conn)
}

/// Exact match first, then the first name containing `port_name`. An empty
/// name matches nothing.
fn find_port(names: &[String], port_name: &str) -> Option<usize> {
    if port_name.trim().is_empty() {
        return None;
    }

    names
        .iter()
        .position(|name| name == port_name)
        .or_else(|| names.iter().position(|name| name.contains(port_name)))
}

fn send(conn: &mut MidiOutputConnection, channel: u8, cmd: PadCommand) -> Result<(), Error> {
    conn.send(&cmd.to_midi(channel))?;
    Ok(())
}

/// Owns the MIDI connection and writes every command it receives. Runs until
/// all senders are gone, then closes the port.
pub fn spawn_thread(
    mut conn: MidiOutputConnection,
    channel: u8,
    cmd_rx: flume::Receiver<PadCommand>,
) -> JoinHandle<anyhow::Result<()>> {
    std::thread::spawn(move || {
        loop {
            // idle until we get a new command, then drain whatever else is
            // already queued before blocking again
            match cmd_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(mut cmd) => loop {
                    trace!("writing command {cmd:?}");

                    if let Err(err) = send(&mut conn, channel, cmd) {
                        warn!("failed to write {cmd:?}: {err}");
                    }

                    cmd = match cmd_rx.try_recv() {
                        Ok(cmd) => cmd,
                        Err(_) => break,
                    };
                },
                Err(flume::RecvTimeoutError::Timeout) => {}
                Err(flume::RecvTimeoutError::Disconnected) => break,
            }
        }

        debug!("pad command channel closed, releasing midi output");
        conn.close();

        Ok(())
    })
}

#[cfg(test)]
mod test {
    use super::find_port;

    fn names() -> Vec<String> {
        vec![
            "Midi Through:Midi Through Port-0 14:0".into(),
            "Launchkey Mini MK3:Launchkey Mini MK3 MIDI 2 20:1".into(),
            "MIDIOUT2 (Launchkey MIDI) 2".into(),
        ]
    }

    #[test]
    fn prefers_exact_name() {
        assert_eq!(find_port(&names(), "MIDIOUT2 (Launchkey MIDI) 2"), Some(2));
    }

    #[test]
    fn falls_back_to_substring() {
        assert_eq!(find_port(&names(), "Launchkey Mini"), Some(1));
        assert_eq!(find_port(&names(), "Nope"), None);
    }

    #[test]
    fn empty_name_matches_nothing() {
        assert_eq!(find_port(&names(), ""), None);
        assert_eq!(find_port(&names(), "  "), None);
    }
}
