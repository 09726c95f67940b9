//! Choosing which stored credential answers a presentation request.
//!
//! Candidates are ordered by:
//!
//! 1. unexpired before expired,
//! 2. later certification date,
//! 3. higher overall score, only when the request thresholds `overall`,
//! 4. larger summed margin over the requested thresholds,
//! 5. storage order.

use std::cmp::Reverse;

use certproof_core::Timestamp;
use certproof_vc::Credential;

use crate::presentation::PresentationRequest;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RankKey {
    expired: bool,
    certified: Reverse<Timestamp>,
    overall: Reverse<Option<u32>>,
    margin: Reverse<Option<i64>>,
}

fn rank_key(credential: &Credential, request: &PresentationRequest, now: &Timestamp) -> RankKey {
    let overall = request
        .overall_threshold()
        .and(credential.overall_score())
        .map(|s| s.hundredths());
    let margin = request
        .predicates()
        .iter()
        .map(|p| p.margin(credential))
        .sum::<Option<i64>>();
    RankKey {
        expired: credential.is_expired_at(now),
        certified: Reverse(credential.certification_date),
        overall: Reverse(overall),
        margin: Reverse(margin),
    }
}

/// Indices into `candidates`, best first. The sort is stable, so equal
/// keys keep storage order.
pub fn rank_candidates(
    candidates: &[&Credential],
    request: &PresentationRequest,
    now: &Timestamp,
) -> Vec<usize> {
    let keys: Vec<RankKey> = candidates
        .iter()
        .map(|c| rank_key(c, request, now))
        .collect();
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|a, b| keys[*a].cmp(&keys[*b]));
    order
}
