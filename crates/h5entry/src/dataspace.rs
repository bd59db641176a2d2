//! Shape descriptors.

use std::rc::Rc;

use crate::error::StoreError;
use crate::handle::release;
use crate::store::{Hid, SharedStore};

/// An open dataspace id with its extents. The id is released on drop.
pub struct Dataspace {
    store: SharedStore,
    id: Hid,
    extents: Vec<u64>,
}

impl Dataspace {
    /// A new simple dataspace. Empty `extents` describe a scalar.
    pub fn create(store: &SharedStore, extents: &[u64]) -> Result<Dataspace, StoreError> {
        let id = store.borrow_mut().create_space(extents)?;
        Ok(Dataspace {
            store: Rc::clone(store),
            id,
            extents: extents.to_vec(),
        })
    }

    /// Take ownership of an already-open dataspace id.
    pub(crate) fn adopt(store: &SharedStore, id: Hid) -> Result<Dataspace, StoreError> {
        let extents = store.borrow().space_extents(id);
        match extents {
            Ok(extents) => Ok(Dataspace {
                store: Rc::clone(store),
                id,
                extents,
            }),
            Err(err) => {
                release(store, id);
                Err(err)
            }
        }
    }

    pub fn id(&self) -> Hid {
        self.id
    }

    pub fn extents(&self) -> &[u64] {
        &self.extents
    }

    pub fn rank(&self) -> usize {
        self.extents.len()
    }
}

impl Drop for Dataspace {
    fn drop(&mut self) {
        release(&self.store, self.id);
    }
}

impl std::fmt::Debug for Dataspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataspace")
            .field("id", &self.id)
            .field("extents", &self.extents)
            .finish()
    }
}
