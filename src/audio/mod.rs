//! Audio utilities
//!
//! Format conversion to model-ready WAV and wake word detection.

mod convert;
mod file;
mod keyword;
mod recognizer;

pub use convert::{
    AudioBuffer, AudioSpec, SAMPLE_RATE, SourceEncoding, convert_format, decode_wav, is_silent,
    rms_energy, samples_to_wav,
};
pub use file::{load_audio_from_file, save_audio_to_file};
pub use keyword::{Alternative, ENERGY_THRESHOLD, KeywordSpotter, Recognition, detect_keyword};
pub use recognizer::{Recognizer, ScriptedRecognizer, SttRecognizer};
