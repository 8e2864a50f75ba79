//! Audio output abstraction consumed by the scheduler.
//!
//! The scheduler treats the device as a blocking sink: `write` accepts one
//! interleaved buffer and returns once the samples are queued. The cpal
//! implementation bridges that model onto cpal's pull-style callback with an
//! SPSC ring buffer.

use crate::error::EngineError;

/// Parameters for opening an output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_frames: usize,
    /// Specific output device by name; `None` picks the default.
    pub device_name: Option<String>,
}

/// An open, scoped output stream. Dropping the sink releases the device.
pub trait AudioSink {
    /// Queue one interleaved buffer, blocking until the sink accepts it.
    fn write(&mut self, interleaved: &[f32]) -> Result<(), EngineError>;

    /// Single-shot stop/start cycle after a failed write.
    fn recover(&mut self) -> Result<(), EngineError>;
}

/// Opens sinks on the worker thread. Implementations are shared across runs.
pub trait SinkProvider: Send + Sync {
    fn open(&self, spec: &StreamSpec) -> Result<Box<dyn AudioSink>, EngineError>;
}

#[cfg(feature = "realtime")]
pub use self::realtime::CpalOutput;

#[cfg(feature = "realtime")]
mod realtime {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{BufferSize, SampleRate, StreamConfig};
    use log::{error, info};
    use ringbuf::traits::{Consumer, Producer, Split};
    use ringbuf::HeapRb;

    use super::{AudioSink, SinkProvider, StreamSpec};
    use crate::error::EngineError;

    /// Sleep step while the ring buffer is full.
    const WRITE_POLL: Duration = Duration::from_millis(2);

    /// Settle time between the stop and start halves of a recovery attempt.
    const RECOVER_SETTLE: Duration = Duration::from_millis(500);

    /// cpal-backed [`SinkProvider`].
    pub struct CpalOutput;

    impl CpalOutput {
        pub fn new() -> Self {
            Self
        }

        /// Names of the available output devices, for the presentation layer.
        pub fn list_devices() -> Result<Vec<String>, EngineError> {
            let host = cpal::default_host();
            let devices = host
                .output_devices()
                .map_err(|e| EngineError::DeviceInit(e.to_string()))?;
            let mut names = Vec::new();
            for dev in devices {
                names.push(dev.name().map_err(|e| EngineError::DeviceInit(e.to_string()))?);
            }
            Ok(names)
        }

        fn pick_device(name: Option<&str>) -> Result<cpal::Device, EngineError> {
            let host = cpal::default_host();
            if let Some(name) = name {
                let devices = host
                    .output_devices()
                    .map_err(|e| EngineError::DeviceInit(e.to_string()))?;
                for dev in devices {
                    if dev.name().map(|n| n == name).unwrap_or(false) {
                        return Ok(dev);
                    }
                }
                return Err(EngineError::DeviceInit(format!(
                    "requested device not found: {name}"
                )));
            }
            host.default_output_device()
                .ok_or_else(|| EngineError::DeviceInit("no default output device".into()))
        }
    }

    impl Default for CpalOutput {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SinkProvider for CpalOutput {
        fn open(&self, spec: &StreamSpec) -> Result<Box<dyn AudioSink>, EngineError> {
            let device = Self::pick_device(spec.device_name.as_deref())?;
            let config = StreamConfig {
                channels: spec.channels,
                sample_rate: SampleRate(spec.sample_rate),
                buffer_size: BufferSize::Default,
            };

            // ~1 second of queue between the scheduler and the callback.
            let capacity = spec.sample_rate as usize * spec.channels as usize;
            let rb = HeapRb::<f32>::new(capacity);
            let (producer, mut consumer) = rb.split();

            let failed = Arc::new(AtomicBool::new(false));
            let failed_cb = Arc::clone(&failed);

            let stream = device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let read = consumer.pop_slice(data);
                        for sample in &mut data[read..] {
                            *sample = 0.0;
                        }
                    },
                    move |err| {
                        error!("audio output stream error: {err}");
                        failed_cb.store(true, Ordering::Relaxed);
                    },
                    None,
                )
                .map_err(|e| EngineError::DeviceInit(e.to_string()))?;

            stream
                .play()
                .map_err(|e| EngineError::DeviceInit(e.to_string()))?;

            let name = device.name().unwrap_or_else(|_| "<unknown>".into());
            info!("opened output stream on {name} @ {} Hz", spec.sample_rate);

            Ok(Box::new(CpalSink {
                stream,
                producer,
                failed,
            }))
        }
    }

    struct CpalSink {
        stream: cpal::Stream,
        producer: ringbuf::HeapProd<f32>,
        failed: Arc<AtomicBool>,
    }

    impl AudioSink for CpalSink {
        fn write(&mut self, interleaved: &[f32]) -> Result<(), EngineError> {
            let mut written = 0;
            while written < interleaved.len() {
                if self.failed.load(Ordering::Relaxed) {
                    return Err(EngineError::Io("output stream reported an error".into()));
                }
                written += self.producer.push_slice(&interleaved[written..]);
                if written < interleaved.len() {
                    thread::sleep(WRITE_POLL);
                }
            }
            Ok(())
        }

        fn recover(&mut self) -> Result<(), EngineError> {
            self.stream
                .pause()
                .map_err(|e| EngineError::Io(e.to_string()))?;
            thread::sleep(RECOVER_SETTLE);
            self.stream
                .play()
                .map_err(|e| EngineError::Io(e.to_string()))?;
            self.failed.store(false, Ordering::Relaxed);
            Ok(())
        }
    }
}
