//! The audio source manager.
//!
//! Owns the (lazily created) analysis context and decides which input feeds it:
//! the media element's tap or the microphone, never both.

use std::sync::Arc;

use crate::config::AnalysisSettings;
use crate::error::{Error, Result};

use super::analyser::AnalysisHandle;
use super::bus::{InputBus, InputKind, InputPort};
use super::capture::{CaptureStream, InputDevice};

struct Microphone {
    port: InputPort,
    _stream: CaptureStream,
}

pub struct AudioGraph<D> {
    settings: AnalysisSettings,
    analysis: AnalysisHandle,
    device: D,
    media_port: Option<InputPort>,
    microphone: Option<Microphone>,
}

impl<D: InputDevice> AudioGraph<D> {
    pub fn new(analysis: AnalysisHandle, settings: AnalysisSettings, device: D) -> Self {
        Self {
            settings,
            analysis,
            device,
            media_port: None,
            microphone: None,
        }
    }

    fn ensure_context(&mut self) -> Result<Arc<InputBus>> {
        let bus = self
            .analysis
            .ensure_context(&self.settings)
            .ok_or_else(|| Error::PlaybackFailure("analysis context unavailable".into()))?;

        // A recreated context means the old ports point at a dead bus.
        if self
            .media_port
            .as_ref()
            .is_some_and(|port| !Arc::ptr_eq(port.bus(), &bus))
        {
            self.media_port = None;
        }
        Ok(bus)
    }

    /// Attach the media element's port, creating it on first use.
    pub fn connect_track(&mut self) -> Result<InputPort> {
        let bus = self.ensure_context()?;
        self.disconnect_microphone();

        let port = match &self.media_port {
            Some(port) => port.clone(),
            None => {
                let port = bus.port(InputKind::Media);
                log::debug!("graph: created media port {}", port.id());
                self.media_port = Some(port.clone());
                port
            }
        };
        bus.attach(&port);
        Ok(port)
    }

    /// Start capturing from the input device. On failure nothing is attached
    /// and the previous input keeps playing into the analyser.
    pub fn connect_microphone(&mut self) -> Result<()> {
        let bus = self.ensure_context()?;
        if self.microphone.is_some() {
            return Ok(());
        }

        let port = bus.port(InputKind::Microphone);
        let stream = self.device.open(port.clone())?;

        if let Some(media) = &self.media_port {
            bus.detach(media);
        }
        bus.attach(&port);
        log::info!("graph: microphone attached (port {})", port.id());
        self.microphone = Some(Microphone {
            port,
            _stream: stream,
        });
        Ok(())
    }

    pub fn disconnect_microphone(&mut self) {
        if let Some(mic) = self.microphone.take() {
            mic.port.bus().detach(&mic.port);
            log::info!("graph: microphone detached");
        }
    }

    pub fn resume(&self) -> bool {
        let resumed = self.analysis.resume();
        if resumed {
            log::debug!("graph: analysis context resumed");
        }
        resumed
    }

    /// Disconnect every input and close the context.
    pub fn teardown(&mut self) {
        self.disconnect_microphone();
        if let Some(port) = self.media_port.take() {
            port.bus().detach(&port);
        }
        self.analysis.close();
        log::debug!("graph: torn down");
    }
}
