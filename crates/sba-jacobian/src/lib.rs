//! Sparse Jacobian engine for metric bundle adjustment.
//!
//! Given a scene of points, rigid bodies, views and cameras (any of which can be
//! marked known), this crate computes the analytic Jacobian of the reprojection
//! residual with respect to every free parameter, split into the two blocks a
//! Schur complement solver works with.
//!
//! # Key Components
//!
//! - **Scene data**: [`SceneStructure`] and [`SceneObservations`]
//! - **Layout**: [`ParameterLayout`] maps entities to slots of the flat parameter vector
//! - **Decoder**: [`StateDecoder`] turns a parameter vector into current transforms
//! - **Jacobian**: [`MetricSchurJacobian`] fills the left (points) and right (views) blocks
//! - **Residual**: [`MetricResidual`] with the same row order
//! - **Storage**: the [`JacobianStorage`] trait and its dense / sparse implementations
//! - **Codec**: [`SceneCodec`] encodes a scene into parameters and back
//! - **Checking**: finite-difference Jacobians and synthetic scenes
//!
//! # Example
//!
//! ```
//! use nalgebra::DMatrix;
//! use sba_jacobian::{RodriguesSchurJacobian, SceneCodec, SyntheticSceneConfig};
//!
//! let (mut scene, observations) = SyntheticSceneConfig::new().generate()?;
//! let mut jacobian = RodriguesSchurJacobian::new();
//! jacobian.configure(&scene, &observations)?;
//!
//! let params = SceneCodec::<sba_geometry::RodriguesJacobian>::new().encode(&scene);
//! let mut left = DMatrix::zeros(0, 0);
//! let mut right = DMatrix::zeros(0, 0);
//! jacobian.evaluate(&mut scene, &observations, &params, &mut left, &mut right)?;
//! assert_eq!(left.nrows(), jacobian.output_count());
//! # Ok::<(), sba_jacobian::BundleError>(())
//! ```

pub mod codec;
pub mod decoder;
pub mod error;
pub mod jacobian;
pub mod layout;
pub mod logger;
pub mod numerical;
pub mod observations;
pub mod residual;
pub mod storage;
pub mod structure;
pub mod synthetic;

pub use codec::SceneCodec;
pub use decoder::StateDecoder;
pub use error::{BundleError, BundleResult};
pub use jacobian::{MetricSchurJacobian, RodriguesSchurJacobian};
pub use layout::ParameterLayout;
pub use logger::{init_logger, init_logger_with_level};
pub use numerical::{JacobianComparison, NumericalJacobianConfig, hstack, numerical_jacobian};
pub use observations::{ObservationView, SceneObservations};
pub use residual::MetricResidual;
pub use storage::{JacobianStorage, RowMajorMatrix, TripletMatrix};
pub use structure::{SceneCamera, SceneRigid, SceneStructure, SceneView};
pub use synthetic::{SyntheticCamera, SyntheticSceneConfig, rescale_homogeneous};

pub use sba_camera_models;
pub use sba_geometry;
