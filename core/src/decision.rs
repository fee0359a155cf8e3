//! Next-best-action decision rules.
//!
//! An explicit ordered rule table, evaluated top to bottom, first match
//! wins. Ordering is load-bearing: a customer matching both the VIP and
//! the promo predicate must get the VIP treatment. Every threshold is a
//! strict comparison, so a probability of exactly 0.8 or a spend of
//! exactly 2000 falls through.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    VipAlert,
    BundlePromo,
    ChurnRisk,
    UrgencyNudge,
    Nurture,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action:  Action,
    pub message: String,
}

fn vip(probability: f64, _days: f64, monetary: f64) -> bool {
    probability > 0.8 && monetary > 2000.0
}

fn promo(probability: f64, _days: f64, _monetary: f64) -> bool {
    probability > 0.8
}

fn churn_risk(probability: f64, _days: f64, monetary: f64) -> bool {
    probability < 0.3 && monetary > 2000.0
}

fn urgency(probability: f64, days: f64, _monetary: f64) -> bool {
    probability > 0.5 && days < 7.0
}

/// Evaluated in order; the fallthrough is Nurture. Reordering entries
/// changes which action a multi-match customer receives.
const RULES: [(Action, fn(f64, f64, f64) -> bool); 4] = [
    (Action::VipAlert, vip),
    (Action::BundlePromo, promo),
    (Action::ChurnRisk, churn_risk),
    (Action::UrgencyNudge, urgency),
];

/// Map one customer's scores to the single action taken for them.
/// Stateless; nothing here remembers previous requests.
pub fn decide(probability: f64, days: f64, monetary: f64) -> Decision {
    let action = RULES
        .iter()
        .find(|(_, predicate)| predicate(probability, days, monetary))
        .map(|(action, _)| *action)
        .unwrap_or(Action::Nurture);
    Decision {
        action,
        message: render_message(action, days),
    }
}

/// The day count in the VIP message truncates toward zero.
fn render_message(action: Action, days: f64) -> String {
    match action {
        Action::VipAlert => format!(
            "VIP ALERT: Send Early Access Catalog. (Expected buy in {} days)",
            days.trunc() as i64
        ),
        Action::BundlePromo => "PROMO: Send 'Bundle Discount' to increase basket size.".to_string(),
        Action::ChurnRisk => "RISK: High Value Churn Risk! Trigger Personal Outreach.".to_string(),
        Action::UrgencyNudge => "URGENCY: Send 'Free Shipping for 48 Hours' nudge.".to_string(),
        Action::Nurture => "NURTURE: Add to General Newsletter.".to_string(),
    }
}
