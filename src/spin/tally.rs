//! Vote counting and result assembly.

use indexmap::IndexMap;

use crate::dao::models::{FinalResults, SpinTarget, Vote, VoteDetail, now_millis};

/// Separator between tied names in [`FinalResults::winner`].
pub const TIE_SEPARATOR: &str = ", ";

/// Outcome of counting votes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyOutcome {
    /// Count per voted name, in first-vote order.
    pub counts: IndexMap<String, u32>,
    /// Every name at the top count, in first-vote order.
    pub winners: Vec<String>,
}

impl TallyOutcome {
    pub fn is_tie(&self) -> bool {
        self.winners.len() > 1
    }

    /// Single winner name, or all tied names joined.
    pub fn winner_label(&self) -> String {
        self.winners.join(TIE_SEPARATOR)
    }
}

/// Votes ordered by submission time, ties broken by client id so the order is stable.
pub fn ordered_votes(votes: &IndexMap<String, Vote>) -> Vec<(&String, &Vote)> {
    let mut ordered: Vec<_> = votes.iter().collect();
    ordered.sort_by(|(a_id, a), (b_id, b)| a.timestamp.cmp(&b.timestamp).then(a_id.cmp(b_id)));
    ordered
}

/// Count `votedFor` occurrences and find the mode. `None` without votes.
pub fn tally(votes: &IndexMap<String, Vote>) -> Option<TallyOutcome> {
    let mut counts: IndexMap<String, u32> = IndexMap::new();
    for (_, vote) in ordered_votes(votes) {
        *counts.entry(vote.voted_for.clone()).or_insert(0) += 1;
    }

    let top = counts.values().copied().max()?;
    let winners = counts
        .iter()
        .filter(|&(_, &count)| count == top)
        .map(|(name, _)| name.clone())
        .collect();
    Some(TallyOutcome { counts, winners })
}

/// Menu-mode result from the votes collected so far.
///
/// `forced` marks an owner-triggered finalization; the result is only flagged as forced when
/// fewer votes than participants came in.
pub fn menu_results(
    votes: &IndexMap<String, Vote>,
    total_participants: usize,
    forced: bool,
) -> Option<FinalResults> {
    let outcome = tally(votes)?;
    let details = ordered_votes(votes)
        .into_iter()
        .map(|(_, vote)| VoteDetail {
            user_name: vote.user_name.clone(),
            voted_for: vote.voted_for.clone(),
        })
        .collect();

    Some(FinalResults {
        mode: SpinTarget::Menu,
        winner: outcome.winner_label(),
        is_tie: outcome.is_tie(),
        is_forced: forced && votes.len() < total_participants,
        total_votes: votes.len(),
        total_participants,
        votes: details,
        finalized_at: now_millis(),
        winners: outcome.winners,
        tally: outcome.counts,
    })
}

/// People-mode result: the owner's spin decides alone.
pub fn people_results(spinner: &str, winner: &str, total_participants: usize) -> FinalResults {
    FinalResults {
        mode: SpinTarget::People,
        winner: winner.to_string(),
        winners: vec![winner.to_string()],
        tally: IndexMap::from([(winner.to_string(), 1)]),
        is_tie: false,
        is_forced: false,
        total_votes: 1,
        total_participants,
        votes: vec![VoteDetail {
            user_name: spinner.to_string(),
            voted_for: winner.to_string(),
        }],
        finalized_at: now_millis(),
    }
}
