//! Static mapping from a mutation to the cache partitions it makes stale.

use domains::{CacheOp, EntityKind, Partition};

pub const DASHBOARD: &str = "dashboard";

/// Partitions to invalidate after `op` on an entity of `kind`.
///
/// Creates and deletes change every listing, so the collection and the
/// dashboard aggregate go stale. Updates only touch the entity's own page and
/// its collection.
pub fn partitions_for(op: CacheOp, kind: EntityKind, id: Option<&str>) -> Vec<Partition> {
    let collection = kind.plural();
    match op {
        CacheOp::Create | CacheOp::Delete => vec![
            Partition::path(format!("/{DASHBOARD}")),
            Partition::path(format!("/{collection}")),
            Partition::tag(collection),
            Partition::tag(DASHBOARD),
        ],
        CacheOp::Update => {
            let mut partitions = Vec::with_capacity(3);
            if let Some(id) = id {
                partitions.push(Partition::path(format!("/{collection}/{id}")));
            }
            partitions.push(Partition::path(format!("/{collection}")));
            partitions.push(Partition::tag(collection));
            partitions
        }
    }
}
