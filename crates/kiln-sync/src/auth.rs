/// Authorization, external to this crate's engines in the same sense
/// [`kiln_layer_store::LayerStore`] is: a capability the embedder supplies.
///
/// `db` is the fully qualified `account/db` path the operation targets.
pub trait AuthContext {
    fn can_fetch(&self, db: &str) -> bool;
    fn can_push(&self, db: &str) -> bool;
    fn can_pull(&self, db: &str) -> bool;
    fn can_clone(&self, db: &str) -> bool;
}

/// Grants every operation. Useful for tests and for embedders that perform
/// authorization upstream of this crate.
pub struct AllowAll;

impl AuthContext for AllowAll {
    fn can_fetch(&self, _db: &str) -> bool {
        true
    }

    fn can_push(&self, _db: &str) -> bool {
        true
    }

    fn can_pull(&self, _db: &str) -> bool {
        true
    }

    fn can_clone(&self, _db: &str) -> bool {
        true
    }
}
