use chrono::NaiveDate;
use mutasi_core::{CandidateKind, MatchRef, Money, ReconciliationStatus};
use std::collections::HashSet;

/// The matcher's read-only view of a statement line.
#[derive(Debug, Clone)]
pub struct LineSnapshot {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub reference: String,
    pub debit: Money,
    pub credit: Money,
    pub status: ReconciliationStatus,
}

impl LineSnapshot {
    fn amount(&self) -> Money {
        if !self.debit.is_zero() {
            self.debit
        } else {
            self.credit
        }
    }
}

/// One unconsumed expense, receipt, fund transfer or journal entry.
/// Callers supply these in creation order; that order is the final
/// tie-break when two candidates sit at the same date distance.
#[derive(Debug, Clone)]
pub struct CandidateSnapshot {
    pub kind: CandidateKind,
    pub id: i64,
    pub date: NaiveDate,
    pub amount: Money,
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Matched,
    Suggested,
}

#[derive(Debug, Clone)]
pub struct MatchAssignment {
    pub line_id: i64,
    pub target: MatchRef,
    pub tier: MatchTier,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MatchReport {
    pub matched_count: usize,
    pub suggested_count: usize,
    /// Lines that were already suggested, matched or recorded when the
    /// pass ran. A second pass over the same data reports everything
    /// here and changes nothing.
    pub skipped_count: usize,
}

pub struct MatchEngine {
    pub date_window_days: i64,
    pub matched_threshold: f32,
    pub suggested_threshold: f32,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self {
            date_window_days: 7,
            matched_threshold: 0.85,
            suggested_threshold: 0.70,
        }
    }
}

impl MatchEngine {
    pub fn new(date_window_days: i64, matched_threshold: f32, suggested_threshold: f32) -> Self {
        Self {
            date_window_days,
            matched_threshold,
            suggested_threshold,
        }
    }

    /// One matching pass. Lines are visited in (date, id) order and
    /// each consumed candidate is off the table for the rest of the
    /// pass, whether it produced a match or only a suggestion.
    pub fn run(
        &self,
        lines: &[LineSnapshot],
        candidates: &[CandidateSnapshot],
    ) -> (Vec<MatchAssignment>, MatchReport) {
        let mut order: Vec<usize> = (0..lines.len()).collect();
        order.sort_by_key(|&i| (lines[i].date, lines[i].id));

        let mut consumed = vec![false; candidates.len()];
        let mut assignments = Vec::new();
        let mut report = MatchReport::default();

        for i in order {
            let line = &lines[i];
            if line.status != ReconciliationStatus::Unmatched {
                report.skipped_count += 1;
                continue;
            }
            let amount = line.amount();
            if amount.is_zero() {
                continue;
            }

            let best = candidates
                .iter()
                .enumerate()
                .filter(|(j, cand)| {
                    !consumed[*j]
                        && cand.amount == amount
                        && (cand.date - line.date).num_days().abs() <= self.date_window_days
                })
                .min_by_key(|(j, cand)| ((cand.date - line.date).num_days().abs(), *j));

            let Some((j, cand)) = best else { continue };
            let confidence = self.confidence(line, cand);
            if confidence < self.suggested_threshold {
                continue;
            }

            consumed[j] = true;
            let tier = if confidence >= self.matched_threshold {
                MatchTier::Matched
            } else {
                MatchTier::Suggested
            };
            match tier {
                MatchTier::Matched => report.matched_count += 1,
                MatchTier::Suggested => report.suggested_count += 1,
            }
            assignments.push(MatchAssignment {
                line_id: line.id,
                target: MatchRef {
                    kind: cand.kind,
                    id: cand.id,
                },
                tier,
                confidence,
            });
        }

        (assignments, report)
    }

    /// Score a qualifying pair. The amount already matched exactly, so
    /// the base score sits at the suggestion floor; date proximity and
    /// description overlap push it toward a confirmed match.
    fn confidence(&self, line: &LineSnapshot, cand: &CandidateSnapshot) -> f32 {
        let gap = (cand.date - line.date).num_days().abs();
        let mut score = self.suggested_threshold;
        if gap == 0 {
            score += 0.15;
        } else {
            score += 0.10 * (1.0 - gap as f32 / self.date_window_days as f32);
        }
        let line_text = format!("{} {}", line.description, line.reference);
        if let Some(memo) = &cand.memo {
            if tokens_overlap(&line_text, memo) {
                score += 0.15;
            }
        }
        score.min(1.0)
    }
}

/// Whether two free-text fields share any word of three letters or
/// more, after lowercasing and splitting on non-alphanumerics.
fn tokens_overlap(a: &str, b: &str) -> bool {
    let ta = tokens(a);
    let tb = tokens(b);
    !ta.is_disjoint(&tb)
}

fn tokens(s: &str) -> HashSet<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .map(str::to_string)
        .collect()
}
