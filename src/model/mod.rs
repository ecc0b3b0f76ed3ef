//! Price model: encoding, networks, training, persistence

mod artifacts;
mod encoder;
mod net;
mod optim;
mod price;
mod trainer;

pub use artifacts::{ArtifactBundle, NetState};
pub use encoder::LabelEncoder;
pub use net::EstimatorNet;
pub use optim::Adam;
pub use price::{train, PriceModel, COSTS_SLOT, SCALED_FEATURES};
pub use trainer::{split_indices, TrainConfig, TrainReport};
