//! `rh-resolver`: approximate employee-name resolution.
//!
//! Names are shingled into lowercase character trigrams, summarised as
//! MinHash signatures and bucketed by a banded LSH index tuned for a
//! loose Jaccard threshold. LSH candidates are then rescored with a
//! weighted, token-order-insensitive ratio and the best few returned.
//!
//! The index is rebuilt from the current roster for every query; the
//! caller fetches the roster and decides where the CPU work runs.

pub mod index;
pub mod lsh;
pub mod minhash;
pub mod score;

pub use index::{id_match, is_employee_id, EmployeeIndex, EmployeeIndexEntry, EmployeeMatch};
pub use score::weighted_ratio;
