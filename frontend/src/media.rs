//! Microphone capture and speech synthesis over browser APIs.

use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::oneshot;
use harness_core::VoiceError;
use harness_core::voice::{ActiveRecording, AudioCapture, AudioClip, CaptureSettings, SpeechOutput};
use js_sys::{Array, Object, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Blob, BlobEvent, BlobPropertyBag, Event, MediaRecorder, MediaRecorderOptions, MediaStream,
    MediaStreamConstraints, MediaStreamTrack, RecordingState, SpeechSynthesisUtterance,
};

use crate::api::js_message;

fn capture_error(value: JsValue) -> VoiceError {
    VoiceError::Capture(js_message(&value))
}

fn playback_error(value: JsValue) -> VoiceError {
    VoiceError::Playback(js_message(&value))
}

/// `getUserMedia` + `MediaRecorder`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserCapture;

impl AudioCapture for BrowserCapture {
    type Recording = BrowserRecording;

    fn supports_mime_type(&self, mime_type: &str) -> bool {
        MediaRecorder::is_type_supported(mime_type)
    }

    async fn start(&self, settings: &CaptureSettings) -> Result<BrowserRecording, VoiceError> {
        let window = web_sys::window().ok_or_else(|| VoiceError::Capture("no window".to_string()))?;
        let devices = window
            .navigator()
            .media_devices()
            .map_err(|e| VoiceError::CaptureDenied(js_message(&e)))?;

        let audio = Object::new();
        Reflect::set(
            &audio,
            &JsValue::from_str("echoCancellation"),
            &JsValue::from_bool(settings.echo_cancellation),
        )
        .map_err(capture_error)?;
        Reflect::set(
            &audio,
            &JsValue::from_str("noiseSuppression"),
            &JsValue::from_bool(settings.noise_suppression),
        )
        .map_err(capture_error)?;

        let constraints = MediaStreamConstraints::new();
        constraints.set_audio(&audio);

        let request = devices
            .get_user_media_with_constraints(&constraints)
            .map_err(|e| VoiceError::CaptureDenied(js_message(&e)))?;
        let stream: MediaStream = JsFuture::from(request)
            .await
            .map_err(|e| VoiceError::CaptureDenied(js_message(&e)))?
            .unchecked_into();

        BrowserRecording::begin(stream, settings.mime_type)
    }
}

/// A running `MediaRecorder` and the stream it records from.
pub struct BrowserRecording {
    stream: MediaStream,
    recorder: MediaRecorder,
    chunks: Rc<RefCell<Vec<Blob>>>,
    _on_data: Closure<dyn FnMut(BlobEvent)>,
    released: bool,
}

impl BrowserRecording {
    fn begin(stream: MediaStream, mime_type: Option<&str>) -> Result<Self, VoiceError> {
        let recorder = match mime_type {
            Some(mime_type) => {
                let options = MediaRecorderOptions::new();
                options.set_mime_type(mime_type);
                MediaRecorder::new_with_media_stream_and_media_recorder_options(&stream, &options)
            }
            None => MediaRecorder::new_with_media_stream(&stream),
        };
        let recorder = match recorder {
            Ok(recorder) => recorder,
            Err(e) => {
                stop_tracks(&stream);
                return Err(capture_error(e));
            }
        };

        let chunks = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&chunks);
        let on_data = Closure::<dyn FnMut(BlobEvent)>::new(move |ev: BlobEvent| {
            if let Some(blob) = ev.data() {
                if blob.size() > 0.0 {
                    sink.borrow_mut().push(blob);
                }
            }
        });
        recorder.set_ondataavailable(Some(on_data.as_ref().unchecked_ref()));

        let mut recording = Self {
            stream,
            recorder,
            chunks,
            _on_data: on_data,
            released: false,
        };
        if let Err(e) = recording.recorder.start() {
            recording.release();
            return Err(capture_error(e));
        }
        Ok(recording)
    }

    async fn wait_for_stop(&self) -> Result<(), VoiceError> {
        if self.recorder.state() == RecordingState::Inactive {
            return Ok(());
        }

        let (tx, rx) = oneshot::channel::<()>();
        let mut tx = Some(tx);
        let on_stop = Closure::<dyn FnMut()>::new(move || {
            if let Some(tx) = tx.take() {
                let _ = tx.send(());
            }
        });
        self.recorder.set_onstop(Some(on_stop.as_ref().unchecked_ref()));

        let stopped = match self.recorder.stop() {
            Ok(()) => rx
                .await
                .map_err(|_| VoiceError::Capture("recorder never finished".to_string())),
            Err(e) => Err(capture_error(e)),
        };
        self.recorder.set_onstop(None);
        stopped
    }
}

impl ActiveRecording for BrowserRecording {
    async fn stop(&mut self) -> Result<AudioClip, VoiceError> {
        self.wait_for_stop().await?;

        let parts = Array::new();
        for blob in self.chunks.borrow().iter() {
            parts.push(blob);
        }
        let mime_type = self.recorder.mime_type();
        let options = BlobPropertyBag::new();
        options.set_type(&mime_type);
        let blob = Blob::new_with_blob_sequence_and_options(&parts, &options).map_err(capture_error)?;

        let buffer = JsFuture::from(blob.array_buffer()).await.map_err(capture_error)?;
        Ok(AudioClip {
            data: Uint8Array::new(&buffer).to_vec(),
            mime_type,
        })
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.recorder.set_ondataavailable(None);
        stop_tracks(&self.stream);
    }
}

impl Drop for BrowserRecording {
    fn drop(&mut self) {
        self.release();
    }
}

fn stop_tracks(stream: &MediaStream) {
    for track in stream.get_tracks().iter() {
        track.unchecked_into::<MediaStreamTrack>().stop();
    }
}

/// `window.speechSynthesis`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserSpeech;

impl SpeechOutput for BrowserSpeech {
    fn is_available(&self) -> bool {
        web_sys::window()
            .map(|w| Reflect::has(&w, &JsValue::from_str("speechSynthesis")).unwrap_or(false))
            .unwrap_or(false)
    }

    async fn speak(&self, text: &str) -> Result<(), VoiceError> {
        let window = web_sys::window().ok_or_else(|| VoiceError::Playback("no window".to_string()))?;
        let synth = window.speech_synthesis().map_err(playback_error)?;
        let utterance = SpeechSynthesisUtterance::new_with_text(text).map_err(playback_error)?;

        let (tx, rx) = oneshot::channel::<Result<(), String>>();
        let tx = Rc::new(RefCell::new(Some(tx)));

        let done = Rc::clone(&tx);
        let on_end = Closure::<dyn FnMut()>::new(move || {
            if let Some(tx) = done.borrow_mut().take() {
                let _ = tx.send(Ok(()));
            }
        });
        let on_error = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(Err(format!("speech synthesis {}", ev.type_())));
            }
        });
        utterance.set_onend(Some(on_end.as_ref().unchecked_ref()));
        utterance.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        synth.cancel();
        synth.speak(&utterance);
        let outcome = rx.await;

        utterance.set_onend(None);
        utterance.set_onerror(None);
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(VoiceError::Playback(message)),
            Err(_) => Err(VoiceError::Playback("speech was interrupted".to_string())),
        }
    }
}
