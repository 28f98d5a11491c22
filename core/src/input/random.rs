use std::net::Ipv4Addr;

use addrbatch_common::address::record::{AddressRecord, host_name};
use rand::Rng;

use super::{AddressSource, today};

pub const DEFAULT_COUNT: usize = 10;

const BASE_NETWORK: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 0);
/// Highest usable host offset inside `10.0.0.0/8`.
const MAX_HOST_OFFSET: u32 = 16_777_214;

/// Synthesizes `/32` host routes inside `10.0.0.0/8` for test runs.
///
/// Colors are left unset; they are drawn when the record is normalized.
pub struct RandomSource {
    count: usize,
    date: String,
}

impl RandomSource {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            date: today(),
        }
    }

    pub fn generate<R: Rng>(&self, rng: &mut R) -> Vec<AddressRecord> {
        (1..=self.count)
            .map(|i| {
                let offset: u32 = rng.random_range(1..=MAX_HOST_OFFSET);
                let host = Ipv4Addr::from(u32::from(BASE_NETWORK) + offset);

                AddressRecord::new(
                    host_name(i),
                    format!("{host}/32"),
                    format!("Host #{i} created for TEST via addrbatch on {}", self.date),
                )
            })
            .collect()
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new(DEFAULT_COUNT)
    }
}

impl AddressSource for RandomSource {
    fn load(&self) -> Vec<AddressRecord> {
        self.generate(&mut rand::rng())
    }
}
