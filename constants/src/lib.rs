/// Shared configuration for event tile processing
pub mod events;
pub mod perceptual;
pub mod sensor;
pub mod storage;
