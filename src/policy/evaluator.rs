//! Policy evaluator
//!
//! Decides allow / deny / allow-with-obfuscation for one classified field
//! under one purpose. Evaluation is a pure function of
//! (policy, consent, classification, purpose): identical inputs always
//! yield an identical verdict.

use crate::classify::Classification;
use crate::policy::{
    Consent, ConsentStatus, Decision, Policy, PolicyRule, RuleDecision, Verdict, VerdictReason,
    WILDCARD,
};

/// Stateless per-field policy evaluator
#[derive(Debug, Default)]
pub struct PolicyEvaluator;

impl PolicyEvaluator {
    /// Create an evaluator
    pub fn new() -> Self {
        Self
    }

    /// Evaluate one classified field for a purpose.
    ///
    /// Order of authority: rule match (most specific wins) → consent
    /// ceiling → obfuscation requirements. No matching rule means deny.
    pub fn evaluate(
        &self,
        classification: &Classification,
        purpose: &str,
        policy: &Policy,
        consent: &Consent,
    ) -> Verdict {
        let Some((index, rule)) = best_match(&policy.rules, &classification.category, purpose)
        else {
            return Verdict::deny(VerdictReason::NoMatchingRule, None);
        };
        let rule_id = policy.rule_id(index);

        if rule.decision == RuleDecision::Deny {
            return Verdict::deny(VerdictReason::PolicyDenied, Some(rule_id));
        }

        // Consent is a ceiling: an explicit denial overrides any allow, and
        // a pair with no recorded consent denies as well.
        match consent.status(&classification.category, purpose) {
            ConsentStatus::Denied => {
                return Verdict::deny(VerdictReason::ConsentDenied, Some(rule_id));
            }
            ConsentStatus::Unspecified => {
                return Verdict::deny(VerdictReason::ConsentUnspecified, Some(rule_id));
            }
            ConsentStatus::Granted => {}
        }

        if rule.obfuscation_required {
            return Verdict {
                decision: Decision::AllowWithObfuscation,
                matched_rule_id: Some(rule_id),
                reason: VerdictReason::ObfuscationRequired,
            };
        }

        // Above the purpose's sensitivity ceiling the allow is downgraded to
        // obfuscation, never to an outright deny.
        if let Some(threshold) = policy.threshold_for(purpose) {
            if classification.sensitivity > threshold {
                return Verdict {
                    decision: Decision::AllowWithObfuscation,
                    matched_rule_id: Some(rule_id),
                    reason: VerdictReason::SensitivityThreshold,
                };
            }
        }

        Verdict {
            decision: Decision::Allow,
            matched_rule_id: Some(rule_id),
            reason: VerdictReason::PolicyAllowed,
        }
    }
}

/// Ranked-match table. Lower rank is more specific; the first rule at the
/// best rank (declaration order) wins.
///
/// | category | purpose  | rank |
/// |----------|----------|------|
/// | exact    | exact    | 0    |
/// | exact    | wildcard | 1    |
/// | wildcard | exact    | 2    |
/// | wildcard | wildcard | 3    |
fn best_match<'a>(
    rules: &'a [PolicyRule],
    category: &str,
    purpose: &str,
) -> Option<(usize, &'a PolicyRule)> {
    let mut best: Option<(u8, usize)> = None;

    for (index, rule) in rules.iter().enumerate() {
        let category_exact = if rule.category == category {
            true
        } else if rule.category == WILDCARD {
            false
        } else {
            continue;
        };
        let purpose_exact = if rule.purpose == purpose {
            true
        } else if rule.purpose == WILDCARD {
            false
        } else {
            continue;
        };

        let rank = match (category_exact, purpose_exact) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        };

        if best.map_or(true, |(current, _)| rank < current) {
            best = Some((rank, index));
            if rank == 0 {
                break;
            }
        }
    }

    best.map(|(_, index)| (index, &rules[index]))
}
