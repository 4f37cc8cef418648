//! # bankmark-serve
//!
//! Serving core for a pre-trained bank marketing classifier: will a client
//! subscribe to a term deposit?
//!
//! ## Layers
//!
//! - [`schema`]: the ordered feature set and categorical vocabularies the
//!   pipeline was trained on.
//! - [`validation`]: untyped [`RawRecord`]s in, [`NormalizedRecord`]s or
//!   structured [`ValidationError`]s out.
//! - [`engine`]: scores normalized records with the loaded [`Pipeline`];
//!   single and batch predictions share one code path.
//! - [`predictor`]: validator and engine behind one cloneable handle.
//!
//! The schema registry and pipeline are built once at startup and shared
//! read-only through `Arc`s; nothing in the request path takes a lock.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bankmark_serve::{Predictor, RawRecord, ServeConfig};
//!
//! let predictor = Predictor::from_config(&ServeConfig::default())?;
//! let record = RawRecord::from_json_str(r#"{"age": 35, "occupation": "admin."}"#)?;
//! match predictor.predict(&record) {
//!     Ok(result) => println!("{}", result.prediction_label()),
//!     Err(err) if err.is_client_error() => eprintln!("bad input: {err}"),
//!     Err(err) => eprintln!("internal error: {err}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod csv_io;
pub mod engine;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod predictor;
pub mod preprocessing;
pub mod schema;
pub mod serialization;
pub mod telemetry;
pub mod validation;

pub use config::{LogFormat, ServeConfig};
pub use engine::{PredictionEngine, PredictionError, PredictionResponse, PredictionResult};
pub use error::{ServeError, StartupError};
pub use pipeline::{Pipeline, PipelineParams, ARTIFACT_FORMAT_VERSION, DECISION_THRESHOLD};
pub use predictor::{BatchPolicy, BatchRejected, BatchSummary, Predictor};
pub use schema::{FeatureKind, FeatureSpec, SchemaRegistry};
pub use validation::{FeatureValue, NormalizedRecord, RawRecord, RawValue, ValidationError, Validator};
