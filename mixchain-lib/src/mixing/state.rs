//! Per-stream mixing state and working buffer lifecycle.

use log::{debug, info, warn};

use super::chain::MixChain;
use super::command::MixCommand;
use super::error::MixError;

/// Mixing configuration and scratch space owned by one stream.
///
/// The state moves through two phases. While configuring, commands are
/// appended through the builder and macro methods. [`MixingState::activate`]
/// then sizes the float buffer and locks the chain; from that point only
/// [`MixingState::mix`] does any work.
#[derive(Debug)]
pub struct MixingState {
    pub(super) chain: MixChain,
    pub(super) activated: bool,
    pub(super) stream_channels: usize,
    pub(super) mixbuf: Vec<f32>,
    pub(super) max_frames: usize,
}

impl MixingState {
    /// Create the state for a stream with `channels` decoded channels.
    pub fn new(channels: usize) -> Self {
        Self {
            chain: MixChain::new(channels),
            activated: false,
            stream_channels: channels,
            mixbuf: Vec::new(),
            max_frames: 0,
        }
    }

    /// Account for a synthetic extra channel carried by the decoded stream.
    ///
    /// Only meaningful before any command is appended.
    pub fn add_virtual_channel(&mut self) {
        if !self.chain.is_empty() || self.activated {
            warn!("virtual channel requested after mixes were configured, ignoring");
            return;
        }
        self.stream_channels += 1;
        self.chain.add_virtual_channel();
    }

    /// Size the working buffer for blocks of up to `max_frames` frames and
    /// enable mixing.
    ///
    /// Calling again with a new size resizes the buffer. A size of zero only
    /// queries: nothing is allocated and the state stays as it was. If the
    /// buffer cannot be allocated the state is left inactive.
    pub fn activate(&mut self, max_frames: usize) {
        if max_frames == 0 {
            return;
        }

        let Some(len) = max_frames.checked_mul(self.chain.mixing_channels()) else {
            warn!("mix buffer size overflows for {} frame(s)", max_frames);
            return;
        };

        if len > self.mixbuf.capacity() {
            let additional = len - self.mixbuf.len();
            if let Err(err) = self.mixbuf.try_reserve_exact(additional) {
                warn!("failed to allocate mix buffer: {}", err);
                return;
            }
        }
        self.mixbuf.resize(len, 0.0);
        self.max_frames = max_frames;

        if !self.activated {
            info!(
                "mixing active: {} mix(es), {} -> {} channel(s), {} mixing channel(s)",
                self.chain.len(),
                self.stream_channels,
                self.chain.output_channels(),
                self.chain.mixing_channels()
            );
        }
        self.activated = true;
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    /// `(input_channels, output_channels)` for sizing the host's PCM buffer.
    ///
    /// The input width is the larger of the decoded width and the mixed
    /// width, since mixing happens in place.
    pub fn info(&self) -> (usize, usize) {
        let output_channels = self.chain.output_channels();
        let input_channels = output_channels.max(self.stream_channels);
        (input_channels, output_channels)
    }

    /// Width of the frames the host hands to [`MixingState::mix`], counting
    /// a virtual channel.
    pub fn stream_channels(&self) -> usize {
        self.stream_channels
    }

    pub fn chain(&self) -> &MixChain {
        &self.chain
    }

    pub fn commands(&self) -> &[MixCommand] {
        self.chain.commands()
    }

    /// Number of frames the working buffer holds per call.
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Release the working buffer and the chain.
    pub fn close(self) {
        debug!(
            "closing mixing state ({} mix(es), {} buffered sample(s))",
            self.chain.len(),
            self.mixbuf.len()
        );
    }

    /// Gatekeeper for every append: rejects once active or full.
    pub(super) fn ensure_appendable(&self) -> Result<(), MixError> {
        if self.activated {
            return Err(MixError::Activated);
        }
        if self.chain.is_full() {
            return Err(MixError::ChainFull(super::chain::MAX_MIXES));
        }
        Ok(())
    }

    pub(super) fn append(&mut self, command: MixCommand) -> Result<(), MixError> {
        self.ensure_appendable()?;
        self.chain.push(command)?;
        debug!("mix {} added ({} total)", command, self.chain.len());
        Ok(())
    }
}
