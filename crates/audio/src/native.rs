//! Natives Audio-Backend via cpal
//!
//! cpal-Streams sind !Send und leben deshalb auf einem dedizierten
//! Audio-Thread. Steuerkommandos laufen ueber crossbeam-channel,
//! Capture-Samples ueber einen lock-free Ring-Buffer (ringbuf).
//!
//! Prozessweit existiert hoechstens ein Capture-Stream; `start_capture`
//! gibt bei wiederholtem Aufruf dieselbe Quelle heraus.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, unbounded, Sender};
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapRb};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::backend::{AudioBackend, PlaybackSink};
use crate::error::{AudioError, AudioResult};
use crate::meter::METER_WINDOW;
use crate::source::SampleSource;

/// Abtastrate der Capture-Session
const SAMPLE_RATE: u32 = 48_000;
/// Mono reicht fuer Sprach-Chat
const CHANNELS: u16 = 1;
/// Ring-Buffer-Kapazitaet: 2 Sekunden Puffer
const RING_CAPACITY: usize = SAMPLE_RATE as usize * 2;
/// Timeout fuer Antworten des Audio-Threads
const ANTWORT_TIMEOUT: Duration = Duration::from_secs(5);

enum AudioCommand {
    StartCapture {
        antwort: Sender<AudioResult<Arc<CaptureSource>>>,
    },
    StopCapture,
    StartPlayback {
        id: u64,
        quelle: Arc<dyn SampleSource>,
        antwort: Sender<AudioResult<()>>,
    },
    StopPlayback {
        id: u64,
    },
    Shutdown,
}

/// Rollendes Fenster der juengsten Capture-Samples
///
/// Der cpal-Callback schreibt in den Ring-Buffer; `read_window` leert
/// den Ring in das rollende Fenster und kopiert dann nicht-destruktiv
/// die juengsten Samples heraus.
pub struct CaptureSource {
    cons: Mutex<HeapCons<f32>>,
    fenster: Mutex<Vec<f32>>,
}

impl CaptureSource {
    fn new(cons: HeapCons<f32>) -> Self {
        Self {
            cons: Mutex::new(cons),
            fenster: Mutex::new(Vec::with_capacity(METER_WINDOW)),
        }
    }
}

impl SampleSource for CaptureSource {
    fn read_window(&self, out: &mut [f32]) -> usize {
        let mut fenster = self.fenster.lock();
        {
            let mut cons = self.cons.lock();
            let mut block = [0.0f32; 1024];
            loop {
                let n = cons.pop_slice(&mut block);
                if n == 0 {
                    break;
                }
                fenster.extend_from_slice(&block[..n]);
            }
        }
        let len = fenster.len();
        if len > METER_WINDOW {
            fenster.drain(..len - METER_WINDOW);
        }
        let n = out.len().min(fenster.len());
        let start = fenster.len() - n;
        out[..n].copy_from_slice(&fenster[start..]);
        n
    }
}

/// cpal-basiertes Audio-Backend
pub struct NativeBackend {
    cmd_tx: Sender<AudioCommand>,
    mikrofon: AtomicBool,
    capture: Mutex<Option<Arc<CaptureSource>>>,
    naechste_sink_id: AtomicU64,
}

impl NativeBackend {
    /// Erstellt das Backend und startet den Audio-Thread.
    /// Streams werden erst bei Bedarf geoeffnet.
    pub fn new() -> AudioResult<Self> {
        let (cmd_tx, cmd_rx) = unbounded::<AudioCommand>();

        std::thread::Builder::new()
            .name("sprechfunk-audio".to_string())
            .spawn(move || audio_thread(cmd_rx))
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

        let mikrofon = cpal::default_host().default_input_device().is_some();
        debug!(
            mikrofon,
            "NativeBackend initialisiert (Audio-Thread gestartet)"
        );

        Ok(Self {
            cmd_tx,
            mikrofon: AtomicBool::new(mikrofon),
            capture: Mutex::new(None),
            naechste_sink_id: AtomicU64::new(0),
        })
    }

    fn senden(&self, cmd: AudioCommand) -> AudioResult<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| AudioError::ThreadAntwortetNicht)
    }
}

#[async_trait::async_trait]
impl AudioBackend for NativeBackend {
    async fn probe_microphone(&self) -> bool {
        // Geraete-Enumeration kann blockieren, deshalb nicht auf dem
        // async-Executor ausfuehren
        let gefunden = tokio::task::spawn_blocking(|| {
            cpal::default_host().default_input_device().is_some()
        })
        .await
        .unwrap_or(false);
        self.mikrofon.store(gefunden, Ordering::SeqCst);
        debug!(
            gefunden,
            "Mikrofon-Erkennung abgeschlossen"
        );
        gefunden
    }

    fn has_microphone(&self) -> bool {
        self.mikrofon.load(Ordering::SeqCst)
    }

    async fn start_capture(&self) -> AudioResult<Arc<dyn SampleSource>> {
        if let Some(quelle) = self.capture.lock().clone() {
            return Ok(quelle);
        }
        let (tx, rx) = bounded(1);
        self.senden(AudioCommand::StartCapture { antwort: tx })?;
        let quelle = tokio::task::spawn_blocking(move || rx.recv_timeout(ANTWORT_TIMEOUT))
            .await
            .map_err(|_| AudioError::ThreadAntwortetNicht)?
            .map_err(|_| AudioError::ThreadAntwortetNicht)??;
        *self.capture.lock() = Some(Arc::clone(&quelle));
        Ok(quelle)
    }

    fn stop_capture(&self) {
        if self.capture.lock().take().is_some() {
            if let Err(e) = self.senden(AudioCommand::StopCapture) {
                debug!(fehler = %e, "StopCapture nicht zustellbar");
            }
        }
    }

    fn create_playback_sink(
        &self,
        quelle: Arc<dyn SampleSource>,
    ) -> AudioResult<Box<dyn PlaybackSink>> {
        let id = self.naechste_sink_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = bounded(1);
        self.senden(AudioCommand::StartPlayback {
            id,
            quelle,
            antwort: tx,
        })?;
        rx.recv_timeout(ANTWORT_TIMEOUT)
            .map_err(|_| AudioError::ThreadAntwortetNicht)??;
        Ok(Box::new(NativeSink {
            id,
            cmd_tx: self.cmd_tx.clone(),
            gestoppt: AtomicBool::new(false),
        }))
    }
}

impl Drop for NativeBackend {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        debug!("NativeBackend gestoppt");
    }
}

/// Playback-Sink des nativen Backends
struct NativeSink {
    id: u64,
    cmd_tx: Sender<AudioCommand>,
    gestoppt: AtomicBool,
}

impl PlaybackSink for NativeSink {
    fn stop(&self) -> AudioResult<()> {
        if self.gestoppt.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.cmd_tx
            .send(AudioCommand::StopPlayback { id: self.id })
            .map_err(|_| AudioError::ThreadAntwortetNicht)
    }
}

impl Drop for NativeSink {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Audio-Thread: haelt die !Send cpal-Streams am Leben
fn audio_thread(cmd_rx: crossbeam_channel::Receiver<AudioCommand>) {
    let mut capture_stream: Option<cpal::Stream> = None;
    let mut playback_streams: HashMap<u64, cpal::Stream> = HashMap::new();

    debug!("Audio-Thread gestartet");

    for cmd in cmd_rx.iter() {
        match cmd {
            AudioCommand::StartCapture { antwort } => {
                let ergebnis = capture_stream_oeffnen();
                let _ = match ergebnis {
                    Ok((stream, quelle)) => {
                        capture_stream = Some(stream);
                        antwort.send(Ok(quelle))
                    }
                    Err(e) => antwort.send(Err(e)),
                };
            }
            AudioCommand::StopCapture => {
                if capture_stream.take().is_some() {
                    debug!("Capture-Stream gestoppt");
                }
            }
            AudioCommand::StartPlayback { id, quelle, antwort } => {
                let ergebnis = playback_stream_oeffnen(quelle);
                let _ = match ergebnis {
                    Ok(stream) => {
                        playback_streams.insert(id, stream);
                        antwort.send(Ok(()))
                    }
                    Err(e) => antwort.send(Err(e)),
                };
            }
            AudioCommand::StopPlayback { id } => {
                if playback_streams.remove(&id).is_some() {
                    debug!(sink = id, "Playback-Stream gestoppt");
                }
            }
            AudioCommand::Shutdown => break,
        }
    }

    debug!("Audio-Thread beendet");
}

fn capture_stream_oeffnen() -> AudioResult<(cpal::Stream, Arc<CaptureSource>)> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(AudioError::KeinMikrofon)?;

    let stream_config = StreamConfig {
        channels: CHANNELS,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    };

    let rb = HeapRb::<f32>::new(RING_CAPACITY);
    let (mut producer, consumer) = rb.split();
    let quelle = Arc::new(CaptureSource::new(consumer));

    let err_fn = |err| error!("Capture-Fehler: {}", err);

    let sample_format = device
        .supported_input_configs()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        .find(|c| {
            c.min_sample_rate().0 <= SAMPLE_RATE
                && c.max_sample_rate().0 >= SAMPLE_RATE
                && c.channels() >= CHANNELS
        })
        .map(|c| c.sample_format())
        .unwrap_or(SampleFormat::F32);

    let stream = match sample_format {
        SampleFormat::F32 => device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _| {
                    let geschrieben = producer.push_slice(data);
                    if geschrieben < data.len() {
                        warn!(
                            "Capture Ring-Buffer voll, {} Samples verworfen",
                            data.len() - geschrieben
                        );
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
        SampleFormat::I16 => device
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _| {
                    let floats: Vec<f32> =
                        data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                    let geschrieben = producer.push_slice(&floats);
                    if geschrieben < floats.len() {
                        warn!("Capture Ring-Buffer voll");
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
        andere => return Err(AudioError::SampleFormat(format!("{:?}", andere))),
    };

    stream
        .play()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    debug!("Capture-Stream geoeffnet: {}Hz {}ch", SAMPLE_RATE, CHANNELS);

    Ok((stream, quelle))
}

fn playback_stream_oeffnen(quelle: Arc<dyn SampleSource>) -> AudioResult<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::KeinStandardAusgabegeraet)?;

    let stream_config = StreamConfig {
        channels: CHANNELS,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    };

    let err_fn = |err| error!("Playback-Fehler: {}", err);

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _| {
                let n = quelle.read_window(data);
                data[n..].fill(0.0);
            },
            err_fn,
            None,
        )
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    debug!("Playback-Stream geoeffnet");

    Ok(stream)
}
