//! Element type descriptors.

use std::rc::Rc;

use crate::error::StoreError;
use crate::handle::release;
use crate::marshal::Element;
use crate::store::{Hid, Primitive, SharedStore};

/// An open datatype id. The id is released on drop.
pub struct Datatype {
    store: SharedStore,
    id: Hid,
    primitive: Primitive,
}

impl Datatype {
    pub fn create(store: &SharedStore, primitive: Primitive) -> Datatype {
        let id = store.borrow_mut().create_type(primitive);
        Datatype {
            store: Rc::clone(store),
            id,
            primitive,
        }
    }

    /// The datatype matching the native element `E`.
    pub fn native<E: Element>(store: &SharedStore) -> Datatype {
        Datatype::create(store, E::PRIMITIVE)
    }

    pub(crate) fn adopt(store: &SharedStore, id: Hid) -> Result<Datatype, StoreError> {
        let primitive = store.borrow().type_primitive(id);
        match primitive {
            Ok(primitive) => Ok(Datatype {
                store: Rc::clone(store),
                id,
                primitive,
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

    pub fn primitive(&self) -> Primitive {
        self.primitive
    }
}

impl Drop for Datatype {
    fn drop(&mut self) {
        release(&self.store, self.id);
    }
}

impl std::fmt::Debug for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datatype")
            .field("id", &self.id)
            .field("primitive", &self.primitive)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::FileAccessProps;
    use crate::store::Store;

    #[test]
    fn native_types() {
        let store = Store::new(FileAccessProps::default()).into_shared();
        assert_eq!(Datatype::native::<f32>(&store).primitive(), Primitive::F32);
        assert_eq!(Datatype::native::<u64>(&store).primitive(), Primitive::U64);
        assert_eq!(store.borrow().open_ids(), 0);
    }

    #[test]
    fn adopt_rejects_other_kinds() {
        let store = Store::new(FileAccessProps::default()).into_shared();
        let space = store.borrow_mut().create_space(&[1]).unwrap();
        assert!(matches!(
            Datatype::adopt(&store, space),
            Err(StoreError::WrongKind { .. })
        ));
        assert_eq!(store.borrow().open_ids(), 0);
    }
}
