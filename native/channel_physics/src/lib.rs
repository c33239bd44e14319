//! Channel Physics for the CPFSK link
//!
//! Channel model (delay, CFO, AWGN, receive lowpass), packet framing, and
//! the Monte-Carlo harness producing BER/PER and estimator RMSE per SNR
//! point. Also drives the streaming receiver over a simulated stream.

pub mod channel;
pub mod error;
pub mod harness;
pub mod metrics;
pub mod noise;
pub mod stream_sim;
pub mod transmitter;


pub use channel::{Channel, FirLowPassFilter};
pub use error::{SweepError, SweepResult};
pub use harness::{GroundTruth, HarnessConfig, MonteCarlo};
pub use metrics::{write_csv, DetectionClass, MetricsRow, PacketOutcome};
pub use noise::NoiseGenerator;
pub use stream_sim::{StreamOutcome, StreamPacket, StreamSimulation};
pub use transmitter::{frame_waveform, PacketDraw};
