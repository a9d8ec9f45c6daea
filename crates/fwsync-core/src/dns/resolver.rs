//! Alias-chain resolution
//!
//! Follows CNAME indirection inside a single answer section down to the
//! address records it ends in. Chains of any depth are followed; a name that
//! was already expanded is never expanded again, so alias cycles terminate.

use super::record::AnswerRecord;
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::IpAddr;

/// Resolve `queried_name` against `answers`
///
/// Returns every address reachable from `queried_name` through alias records,
/// in the order they are discovered. Duplicates are kept. An empty result is
/// not an error: NXDOMAIN responses and dangling aliases simply yield nothing.
///
/// Names are compared exactly as received.
pub fn resolve(answers: &[AnswerRecord], queried_name: &str) -> Vec<IpAddr> {
    let mut by_owner: HashMap<&str, Vec<&AnswerRecord>> = HashMap::new();
    for record in answers {
        by_owner.entry(record.owner()).or_default().push(record);
    }

    let mut addrs = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut pending: VecDeque<&str> = VecDeque::from([queried_name]);

    while let Some(name) = pending.pop_front() {
        if !visited.insert(name) {
            continue;
        }

        let Some(records) = by_owner.get(name) else {
            continue;
        };

        for &record in records {
            match record {
                AnswerRecord::Address { addr, .. } => addrs.push(*addr),
                AnswerRecord::Alias { target, .. } => pending.push_back(target),
                AnswerRecord::Other { .. } => {}
            }
        }
    }

    addrs
}
