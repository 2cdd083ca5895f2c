//! Sparse-to-dense reconstruction of a value history.
//!
//! A history only records transitions. Reconstruction turns it into one value
//! per slot of a [`Window`]: slot 0 is seeded with the value in force at the
//! window start, snapshots inside the window are placed into their slots, and
//! every slot left unset takes the value of the nearest set slot before it.

use crate::compute::temporal::Window;
use crate::config::ValueSnapshot;

/// Build the dense per-slot sequence for one entity.
///
/// `seed` is the value in force at `window.start()`. `snapshots` must be in
/// ascending timestamp order: when several land in the same slot the last one
/// wins. Snapshots outside the window are ignored.
pub fn reconstruct(seed: i64, snapshots: &[ValueSnapshot], window: &Window) -> Vec<i64> {
    let slot_count = window.slot_count();
    if slot_count == 0 {
        return Vec::new();
    }

    debug_assert!(
        snapshots.windows(2).all(|w| w[0].timestamp <= w[1].timestamp),
        "snapshots must be sorted by timestamp"
    );

    // `None` marks a slot no snapshot has touched.
    let mut slots: Vec<Option<i64>> = vec![None; slot_count];
    slots[0] = Some(seed);

    for snapshot in snapshots {
        if let Some(index) = window.slot_index(snapshot.timestamp) {
            slots[index] = Some(snapshot.value);
        }
    }

    let mut carried = seed;
    slots
        .into_iter()
        .map(|slot| {
            if let Some(value) = slot {
                carried = value;
            }
            carried
        })
        .collect()
}
