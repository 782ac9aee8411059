use prism_core::Result;
use prism_scene::Object;

use super::{ObjectConverter, pass_through, unexpected};
use crate::scope::{NodeScope, OwnedNode};

/// [`ExternalProcedural`](prism_scene::ExternalProcedural) → `procedural`.
///
/// The renderer loads the file itself; only the path, bounds and parameters
/// are translated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalProceduralConverter;

impl ObjectConverter for ExternalProceduralConverter {
    fn convert(&self, object: &Object, scope: &NodeScope, name: &str) -> Result<OwnedNode> {
        let Object::ExternalProcedural(procedural) = object else {
            return Err(unexpected("ExternalProcedural", object));
        };

        let node = scope.create("procedural", name)?;
        let key = node.key();
        scope.set(key, "filename", procedural.file_name.as_str());
        scope.set(key, "bound_min", procedural.bound_min);
        scope.set(key, "bound_max", procedural.bound_max);
        pass_through(scope, key, &procedural.parameters);
        Ok(node)
    }
}
