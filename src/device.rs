//! Hardware MIDI devices
//!
//! The input device pushes every received message, unchanged, into one
//! unbounded queue drained by the host task, so messages are handled in
//! arrival order. The passthrough device is a plain output port that gets a
//! copy of everything the host sends.

use anyhow::{anyhow, Context, Result};
use midir::{MidiIO, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::error::{HostError, HostResult};
use crate::midi::format_hex;
use crate::synth::Sink;

/// Case-insensitive substring match, so names with platform suffixes still match
pub fn port_matches(name: &str, pattern: &str) -> bool {
    name.to_lowercase().contains(&pattern.to_lowercase())
}

/// Find the first port of `io` whose name matches `pattern`
pub fn find_port<T: MidiIO>(io: &T, pattern: &str) -> Option<(T::Port, String)> {
    io.ports().into_iter().find_map(|port| {
        let name = io.port_name(&port).ok()?;
        if port_matches(&name, pattern) {
            debug!("Found port '{}' matching pattern '{}'", name, pattern);
            Some((port, name))
        } else {
            None
        }
    })
}

/// An open hardware input port
pub struct InputDevice {
    name: String,
    _connection: MidiInputConnection<()>,
}

impl InputDevice {
    /// Open the first input port matching `pattern`. Received bytes go to `queue`.
    pub fn open(pattern: &str, queue: UnboundedSender<Vec<u8>>) -> HostResult<Self> {
        let open_error = |reason: String| HostError::DeviceOpen {
            pattern: pattern.to_string(),
            reason,
        };

        let midi_in = MidiInput::new("Synth-Host-In").map_err(|e| open_error(e.to_string()))?;
        debug!("Found {} MIDI input ports", midi_in.port_count());

        let (port, name) =
            find_port(&midi_in, pattern).ok_or_else(|| open_error("port not found".to_string()))?;

        let connection = midi_in
            .connect(
                &port,
                "synth-host-in",
                move |_timestamp, data, _| {
                    // The receiver is gone only while the process shuts down
                    if queue.send(data.to_vec()).is_err() {
                        debug!("Input queue closed, dropping {}", format_hex(data));
                    }
                },
                (),
            )
            .map_err(|e| open_error(e.to_string()))?;

        info!("🎛️ Input device connected: {}", name);
        Ok(Self {
            name,
            _connection: connection,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Which input device is active. At most one at a time.
pub struct InputSelection {
    device: Option<InputDevice>,
    queue: UnboundedSender<Vec<u8>>,
}

impl InputSelection {
    pub fn new(queue: UnboundedSender<Vec<u8>>) -> Self {
        Self {
            device: None,
            queue,
        }
    }

    /// Switch to the device matching `pattern`, or to none.
    ///
    /// The previous device is always closed first; when the new one fails to
    /// open, the selection stays at none and the error is returned for display.
    pub fn select(&mut self, pattern: Option<&str>) -> HostResult<Option<&str>> {
        if let Some(previous) = self.device.take() {
            info!("Input device closed: {}", previous.name());
        }

        let Some(pattern) = pattern else {
            return Ok(None);
        };

        match InputDevice::open(pattern, self.queue.clone()) {
            Ok(device) => Ok(Some(self.device.insert(device).name())),
            Err(e) => {
                warn!("⚠️ {}", e);
                Err(e)
            }
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.device.as_ref().map(InputDevice::name)
    }
}

/// Output port that mirrors everything sent to the synth
pub struct OutputDevice {
    name: String,
    connection: MidiOutputConnection,
}

impl OutputDevice {
    pub fn open(pattern: &str) -> Result<Self> {
        let midi_out = MidiOutput::new("Synth-Host-Thru").context("Failed to create MIDI output")?;

        let (port, name) = find_port(&midi_out, pattern)
            .ok_or_else(|| anyhow!("Passthrough port '{}' not found", pattern))?;

        let connection = midi_out
            .connect(&port, "synth-host-thru")
            .map_err(|e| anyhow!("Failed to connect to '{}': {}", name, e))?;

        info!("🔁 Passthrough connected: {}", name);
        Ok(Self { name, connection })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Sink for OutputDevice {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.connection
            .send(message)
            .map_err(|e| anyhow!("Passthrough '{}': {}", self.name, e))
    }
}

/// Port discovery for `--list-ports`
pub mod discovery {
    use super::*;
    use colored::*;

    /// A port as listed by the backend
    #[derive(Debug, Clone)]
    pub struct PortInfo {
        pub index: usize,
        pub name: String,
    }

    fn list<T: MidiIO>(io: &T) -> Vec<PortInfo> {
        io.ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                io.port_name(port).ok().map(|name| PortInfo { index, name })
            })
            .collect()
    }

    pub fn input_ports() -> Result<Vec<PortInfo>> {
        Ok(list(&MidiInput::new("Synth-Host-Discovery")?))
    }

    pub fn output_ports() -> Result<Vec<PortInfo>> {
        Ok(list(&MidiOutput::new("Synth-Host-Discovery")?))
    }

    fn print_section(title: &str, ports: Result<Vec<PortInfo>>) {
        println!("\n{}", title.bold().cyan());
        match ports {
            Ok(ports) if ports.is_empty() => println!("  {}", "(none)".dimmed()),
            Ok(ports) => {
                for port in ports {
                    println!("  {}: {}", port.index.to_string().yellow(), port.name);
                }
            }
            Err(e) => println!("  {} {}", "error:".red(), e),
        }
    }

    /// Print every input and output port
    pub fn print_ports() {
        print_section("=== MIDI Input Ports ===", input_ports());
        print_section("=== MIDI Output Ports ===", output_ports());
        println!();
    }
}
