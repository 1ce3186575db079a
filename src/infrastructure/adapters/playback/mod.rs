//! Playback Adapter - 音频播放与保存实现

mod rodio_output;

pub use rodio_output::RodioAudioOutput;
