//! Numerical building blocks: NaN-aware statistics, PCA and t-SNE.

pub mod pca;
pub mod stats;
pub mod tsne;

pub use pca::*;
pub use stats::*;
pub use tsne::*;
