//! Copying a chain of layers from one store into another.

use kiln_layer_store::{Layer, LayerStore};

/// Insert each of `layers` (oldest-first) into `dest`, skipping any already
/// present. Idempotent: copying the same chain twice is a no-op the second
/// time.
pub fn copy_layers<D: LayerStore>(dest: &D, layers: impl IntoIterator<Item = Layer>) -> Result<(), D::Error> {
    for layer in layers {
        dest.put_layer(layer.id, layer.parent, layer.bytes)?;
    }
    Ok(())
}
