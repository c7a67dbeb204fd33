//! Block id generation.

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use plotline_block::BlockId;

const CHILD_PREFIX: &str = "blk_";
const MANUAL_PREFIX: &str = "manual_blk_";

/// Generates block ids from a ChaCha stream.
///
/// A fixed seed yields the same ids in the same order.
#[derive(Debug)]
pub struct IdGenerator {
    rng: Mutex<ChaCha8Rng>,
}

impl IdGenerator {
    /// Creates a generator, seeded from entropy when `seed` is `None`.
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { rng: Mutex::new(rng) }
    }

    /// Id for a workflow-driven child: `blk_` and 32 hex digits.
    #[must_use]
    pub fn child_id(&self) -> BlockId {
        let bits: u128 = self.rng.lock().r#gen();
        BlockId::new(format!("{CHILD_PREFIX}{bits:032x}"))
    }

    /// Id for a hand-made block: `manual_blk_` and 8 hex digits.
    #[must_use]
    pub fn manual_id(&self) -> BlockId {
        let bits: u32 = self.rng.lock().r#gen();
        BlockId::new(format!("{MANUAL_PREFIX}{bits:08x}"))
    }
}
