//! Ancestry walks over layers and commits.
//!
//! Two distinct notions of history live here: [`dag`] walks the
//! content-addressed layer chain backing a single repository's data, while
//! [`mrca`] walks the commit DAG to find where two repositories' histories
//! last agreed.

mod ancestry;
mod commit_id;
pub mod copy;
pub mod dag;
pub mod mrca;

pub use ancestry::ancestors_oldest_first;
pub use commit_id::CommitId;
pub use dag::{child_until_parents, repository_layer_to_layerids};
pub use mrca::{mrca as most_recent_common_ancestor, CommitGraph, Mrca};
