mod engine;
mod filter_bank;
mod goertzel;
mod handoff;
mod ingest;
mod noise;
mod normalizer;
mod source_pipe;
mod spectrogram;
mod tables;

pub use engine::{Engine, EngineConfig, FrameStats, TuningConfig};
pub use filter_bank::{BankConfig, FilterBank, NoteFilter};
pub use goertzel::{magnitude, GoertzelExecutor};
pub use handoff::ChunkHandoff;
pub use ingest::{condition_raw, Conditioning, SampleHistory};
pub use noise::{CalibrationState, NoiseCalibrator};
pub use normalizer::{AdaptiveNormalizer, NormalizerSettings};
pub use source_pipe::{CaptureSettings, SourcePipe};
pub use spectrogram::{fold_chromagram, AggregatorSettings, Lookahead, SpectrogramAggregator, LOOKAHEAD_FRAMES};
pub use tables::{a_weighting_db, db_to_ratio, note_frequency, WindowTable, A_WEIGHT_TABLE, WINDOW_LENGTH};
