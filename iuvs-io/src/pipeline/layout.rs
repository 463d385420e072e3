//! Group structure of a product.

use iuvs_core::{Channel, GroupPath, Orbit, ProductStore, Result, Segment};

/// Root attribute holding the orbit number.
pub const ORBIT_ATTR: &str = "orbit";
/// Root attribute holding the product version.
pub const PRODUCT_VERSION_ATTR: &str = "version";

/// Creates every group of one segment and channel and stamps the root
/// attributes. Existing groups and matching attributes are left alone.
///
/// # Errors
/// Propagates store errors.
pub fn require_layout<S: ProductStore + ?Sized>(
    store: &mut S,
    orbit: Orbit,
    segment: Segment,
    channel: Channel,
    product_version: Option<u32>,
) -> Result<()> {
    for group in GroupPath::layout(segment, channel) {
        let path = group.path();
        if !store.group_exists(&path)? {
            store.require_group(&path)?;
        }
    }
    set_root(store, ORBIT_ATTR, i64::from(orbit.number()))?;
    if let Some(version) = product_version {
        set_root(store, PRODUCT_VERSION_ATTR, i64::from(version))?;
    }
    Ok(())
}

fn set_root<S: ProductStore + ?Sized>(store: &mut S, name: &str, value: i64) -> Result<()> {
    if store.root_attribute(name)? != Some(value) {
        store.set_root_attribute(name, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use iuvs_core::MemoryStore;

    #[test]
    fn test_layout_is_idempotent() {
        let mut store = MemoryStore::new();
        let orbit = Orbit::new(3453);
        for _ in 0..2 {
            require_layout(&mut store, orbit, Segment::Apoapse, Channel::Muv, Some(2)).unwrap();
        }
        for group in GroupPath::layout(Segment::Apoapse, Channel::Muv) {
            assert!(store.group_exists(&group.path()).unwrap(), "{group}");
        }
        assert!(store.group_exists("apoapse/muv/nightside").unwrap());
        assert_eq!(store.root_attribute(ORBIT_ATTR).unwrap(), Some(3453));
        assert_eq!(store.root_attribute(PRODUCT_VERSION_ATTR).unwrap(), Some(2));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_version_attribute_is_optional() {
        let mut store = MemoryStore::new();
        require_layout(&mut store, Orbit::new(99), Segment::Periapse, Channel::Fuv, None).unwrap();
        assert_eq!(store.root_attribute(PRODUCT_VERSION_ATTR).unwrap(), None);
        assert!(store.group_exists("periapse/fuv/failsafe/bin_geometry").unwrap());
    }
}
