//! Local event demand-impact policy.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Alert, AlertKind, Severity};
use crate::services::events::{EventsSnapshot, LocalEvent};

/// Title or venue phrases that on their own mark an event as high draw.
pub const HIGH_DRAW_KEYWORDS: &[&str] = &[
    "super bowl",
    "world series",
    "nba finals",
    "stanley cup",
    "playoff",
    "championship",
    "world cup",
    "grand prix",
    "formula 1",
    "wrestlemania",
    "art basel",
    "ultra music festival",
    "rolling loud",
    "taylor swift",
    "beyonce",
    "bad bunny",
];

/// Generic draw phrases worth a medium rating.
pub const MEDIUM_KEYWORDS: &[&str] = &[
    "concert",
    "festival",
    "tour",
    "live",
    "game",
    "match",
    "tournament",
    "marathon",
    "convention",
    "expo",
];

/// A well-reviewed venue counts as high draw only if its name carries one
/// of these.
pub const LARGE_VENUE_TERMS: &[&str] = &["stadium", "arena"];

pub const HIGH_VENUE_REVIEWS: u32 = 10_000;
pub const MEDIUM_VENUE_REVIEWS: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandImpact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventImpactRules {
    pub high_draw_keywords: Vec<String>,
    pub medium_keywords: Vec<String>,
    pub large_venue_terms: Vec<String>,
    pub high_venue_reviews: u32,
    pub medium_venue_reviews: u32,
}

impl Default for EventImpactRules {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            high_draw_keywords: owned(HIGH_DRAW_KEYWORDS),
            medium_keywords: owned(MEDIUM_KEYWORDS),
            large_venue_terms: owned(LARGE_VENUE_TERMS),
            high_venue_reviews: HIGH_VENUE_REVIEWS,
            medium_venue_reviews: MEDIUM_VENUE_REVIEWS,
        }
    }
}

/// An event rated above `low`, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSignal {
    pub airport: String,
    pub title: String,
    pub venue: Option<String>,
    pub when: Option<String>,
    pub impact: DemandImpact,
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whole-word phrase match. The last word of a phrase may carry a plural
/// `s`, so `playoff` matches "Playoffs" but `tour` never matches "Detour".
fn contains_phrase(haystack: &[String], phrase: &str) -> bool {
    let needle = words(phrase);
    let Some((last, head)) = needle.split_last() else {
        return false;
    };
    haystack.windows(needle.len()).any(|window| {
        let (window_last, window_head) = (&window[needle.len() - 1], &window[..needle.len() - 1]);
        window_head == head && (window_last == last || *window_last == format!("{}s", last))
    })
}

fn contains_any(haystack: &[String], phrases: &[String]) -> bool {
    phrases.iter().any(|phrase| contains_phrase(haystack, phrase))
}

pub fn classify_event_impact(event: &LocalEvent, rules: &EventImpactRules) -> DemandImpact {
    let venue = words(event.venue.as_deref().unwrap_or_default());
    let mut haystack = words(&event.title);
    haystack.extend(venue.iter().cloned());
    let reviews = event.venue_reviews.unwrap_or(0);

    let large_venue = contains_any(&venue, &rules.large_venue_terms);

    if contains_any(&haystack, &rules.high_draw_keywords)
        || (large_venue && reviews >= rules.high_venue_reviews)
    {
        DemandImpact::High
    } else if contains_any(&haystack, &rules.medium_keywords) || reviews >= rules.medium_venue_reviews
    {
        DemandImpact::Medium
    } else {
        DemandImpact::Low
    }
}

/// Rated events for one airport, high first. `low` events are dropped.
pub fn derive_event_signals(snapshot: &EventsSnapshot, rules: &EventImpactRules) -> Vec<EventSignal> {
    let mut signals: Vec<EventSignal> = snapshot
        .events
        .iter()
        .filter_map(|event| {
            let impact = classify_event_impact(event, rules);
            (impact > DemandImpact::Low).then(|| EventSignal {
                airport: snapshot.airport.clone(),
                title: event.title.clone(),
                venue: event.venue.clone(),
                when: event.when.clone(),
                impact,
            })
        })
        .collect();

    signals.sort_by(|a, b| b.impact.cmp(&a.impact));
    signals
}

/// Alerts for rated events that were not in the previous listing for the
/// same key. High-impact events warn; medium ones are informational.
pub fn derive_event_alerts(
    previous: Option<&EventsSnapshot>,
    current: &EventsSnapshot,
    rules: &EventImpactRules,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let seen: HashSet<&str> = previous
        .map(|p| p.events.iter().map(|e| e.title.as_str()).collect())
        .unwrap_or_default();

    derive_event_signals(current, rules)
        .into_iter()
        .filter(|signal| !seen.contains(signal.title.as_str()))
        .map(|signal| signal_alert(&signal, now))
        .collect()
}

fn signal_alert(signal: &EventSignal, now: DateTime<Utc>) -> Alert {
    let severity = match signal.impact {
        DemandImpact::High => Severity::Warning,
        _ => Severity::Info,
    };
    let venue = signal
        .venue
        .as_deref()
        .map(|v| format!(" at {}", v))
        .unwrap_or_default();
    let when = signal
        .when
        .as_deref()
        .map(|w| format!(" ({})", w))
        .unwrap_or_default();

    Alert {
        kind: AlertKind::EventImpact,
        severity,
        title: format!("Demand event near {}", signal.airport),
        message: format!("{}{}{}", signal.title, venue, when),
        subject: signal.airport.clone(),
        raised_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::events::EventCategory;

    fn event(title: &str, venue: Option<&str>, reviews: Option<u32>) -> LocalEvent {
        LocalEvent {
            title: title.into(),
            start_date: None,
            when: None,
            venue: venue.map(str::to_string),
            venue_rating: None,
            venue_reviews: reviews,
            address: None,
            link: None,
        }
    }

    fn rate(e: &LocalEvent) -> DemandImpact {
        classify_event_impact(e, &EventImpactRules::default())
    }

    #[test]
    fn curated_keyword_is_high() {
        assert_eq!(rate(&event("Art Basel Miami Beach", None, None)), DemandImpact::High);
        assert_eq!(
            rate(&event("Eastern Conference Playoffs", Some("Kaseya Center"), None)),
            DemandImpact::High
        );
    }

    #[test]
    fn busy_stadium_is_high_but_busy_club_is_medium() {
        assert_eq!(
            rate(&event("Dolphins vs Jets", Some("Hard Rock Stadium"), Some(45_000))),
            DemandImpact::High
        );
        assert_eq!(
            rate(&event("Salsa night", Some("Ball & Chain"), Some(12_000))),
            DemandImpact::Medium
        );
    }

    #[test]
    fn generic_keywords_are_medium() {
        assert_eq!(rate(&event("Jazz Concert", None, None)), DemandImpact::Medium);
        assert_eq!(rate(&event("Food Festival", Some("Bayfront Park"), Some(50))), DemandImpact::Medium);
    }

    #[test]
    fn quiet_events_are_low() {
        assert_eq!(rate(&event("Book reading", Some("Library"), Some(40))), DemandImpact::Low);
    }

    #[test]
    fn keywords_match_whole_words_only() {
        assert_eq!(
            rate(&event("Olive Oil Tasting", Some("Detour Cafe"), Some(12))),
            DemandImpact::Low
        );
        assert_eq!(rate(&event("Speed matchmaking mixer", None, None)), DemandImpact::Low);
        assert_eq!(rate(&event("Tourism board breakfast", None, None)), DemandImpact::Low);
        assert_eq!(rate(&event("Live at the Fillmore", None, None)), DemandImpact::Medium);
        assert_eq!(rate(&event("Formula 1 Crypto.com Miami", None, None)), DemandImpact::High);
    }

    #[test]
    fn overridden_rules_apply() {
        let rules = EventImpactRules {
            high_draw_keywords: vec!["book reading".into()],
            ..EventImpactRules::default()
        };
        assert_eq!(
            classify_event_impact(&event("Book Reading", None, None), &rules),
            DemandImpact::High
        );
    }

    fn listing(events: Vec<LocalEvent>) -> EventsSnapshot {
        EventsSnapshot {
            airport: "MIA".into(),
            city: "Miami".into(),
            category: EventCategory::Events,
            events,
        }
    }

    #[test]
    fn signals_drop_low_and_order_high_first() {
        let snapshot = listing(vec![
            event("Jazz Concert", None, None),
            event("Book reading", None, None),
            event("Miami Grand Prix", Some("Hard Rock Stadium"), None),
        ]);

        let signals = derive_event_signals(&snapshot, &EventImpactRules::default());
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].title, "Miami Grand Prix");
        assert_eq!(signals[0].impact, DemandImpact::High);
        assert_eq!(signals[1].impact, DemandImpact::Medium);

        let alerts = derive_event_alerts(None, &snapshot, &EventImpactRules::default(), Utc::now());
        assert_eq!(alerts[0].severity, Severity::Warning);
        assert_eq!(alerts[0].message, "Miami Grand Prix at Hard Rock Stadium");
        assert_eq!(alerts[1].severity, Severity::Info);
        assert_eq!(alerts[1].subject, "MIA");
    }

    #[test]
    fn alerts_only_for_events_new_since_previous_listing() {
        let previous = listing(vec![event("Miami Grand Prix", None, None)]);
        let current = listing(vec![
            event("Miami Grand Prix", None, None),
            event("Art Basel Miami Beach", None, None),
        ]);

        let alerts = derive_event_alerts(
            Some(&previous),
            &current,
            &EventImpactRules::default(),
            Utc::now(),
        );
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].message.starts_with("Art Basel"));
    }
}
