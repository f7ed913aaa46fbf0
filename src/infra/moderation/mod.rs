pub mod disabled_classifier;
pub mod perspective_client;

pub use disabled_classifier::DisabledClassifier;
pub use perspective_client::{PerspectiveClient, DEFAULT_PERSPECTIVE_ENDPOINT};
