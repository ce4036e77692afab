use crate::error::MapError;
use crate::ir_map::Atlas;
use log::debug;
use std::collections::HashMap;

/// Name of the material shared by every face that samples `atlas`.
pub fn material_name(atlas: &Atlas) -> String {
    format!("{}_material", atlas.name)
}

/// Name of the texture backing [`material_name`].
pub fn texture_name(atlas: &Atlas) -> String {
    format!("{}_texture", atlas.name)
}

/// Host-side factory for renderable surfaces bound to an atlas image.
///
/// Implementations create unconditionally; deduplication is the job of
/// [`MaterialLibrary`].
pub trait MaterialBinder {
    /// Whatever the host draws with: a texture, a material id, ...
    type Handle: Clone;

    /// Create the surface called `name` for `atlas.image`.
    fn create(&mut self, name: &str, atlas: &Atlas) -> Result<Self::Handle, MapError>;
}

/// Name-keyed cache in front of a [`MaterialBinder`]: binding the same atlas
/// twice hands back the first handle without touching the binder again.
///
/// Binding takes `&mut self`, so a library shared between threads has to sit
/// behind a lock; one writer at a time is what keeps two atlases with the same
/// name from producing two materials.
pub struct MaterialLibrary<B: MaterialBinder> {
    binder: B,
    bound: HashMap<String, B::Handle>,
}

impl<B: MaterialBinder> MaterialLibrary<B> {
    /// Empty library in front of `binder`.
    pub fn new(binder: B) -> Self {
        Self {
            binder,
            bound: HashMap::new(),
        }
    }

    /// Handle for `atlas`, created on first request.
    pub fn bind(&mut self, atlas: &Atlas) -> Result<B::Handle, MapError> {
        let name = material_name(atlas);
        if let Some(handle) = self.bound.get(&name) {
            return Ok(handle.clone());
        }

        debug!("creating material {name} for {}", atlas.image);
        let handle = self.binder.create(&name, atlas)?;
        self.bound.insert(name, handle.clone());
        Ok(handle)
    }

    /// Handle already bound under material `name`.
    pub fn get(&self, name: &str) -> Option<&B::Handle> {
        self.bound.get(name)
    }

    /// Number of distinct materials bound so far.
    pub fn len(&self) -> usize {
        self.bound.len()
    }

    /// `true` until the first successful bind.
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// The wrapped binder.
    pub fn binder(&self) -> &B {
        &self.binder
    }

    /// Drop the cache and return the binder.
    pub fn into_binder(self) -> B {
        self.binder
    }
}

/// Binder that records every creation; handles are the material names.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingBinder {
    pub created: Vec<String>,
    pub fail_on: Option<String>,
}

#[cfg(test)]
impl MaterialBinder for RecordingBinder {
    type Handle = String;

    fn create(&mut self, name: &str, atlas: &Atlas) -> Result<String, MapError> {
        if self.fail_on.as_deref() == Some(atlas.name.as_str()) {
            return Err(MapError::MissingImage {
                path: atlas.image.clone().into(),
                reason: "not found".to_owned(),
            });
        }
        self.created.push(name.to_owned());
        Ok(name.to_owned())
    }
}
