//! Decides which job alerts a freshly ingested posting satisfies.

use crate::dedup::shingle::normalize;
use crate::models::alert::JobAlertRow;
use crate::models::job::JobRow;

/// Normalized view of a posting, built once and checked against many alerts.
pub struct MatchTarget {
    text: String,
    location: String,
    remote: bool,
    source: String,
}

impl MatchTarget {
    pub fn new(job: &JobRow) -> Self {
        let combined = format!("{} {} {}", job.title, job.description, job.tags.join(" "));
        Self {
            text: format!(" {} ", normalize(&combined)),
            location: normalize(job.location.as_deref().unwrap_or_default()),
            remote: job.remote,
            source: job.source.clone(),
        }
    }
}

/// Every keyword must occur as a whole word (or phrase) in title, description or
/// tags; location is a substring check; `remote_only` requires a remote posting;
/// a non-empty source list restricts boards.
pub fn alert_matches(alert: &JobAlertRow, target: &MatchTarget) -> bool {
    if alert.remote_only && !target.remote {
        return false;
    }
    if !alert.sources.is_empty()
        && !alert
            .sources
            .iter()
            .any(|s| s.eq_ignore_ascii_case(&target.source))
    {
        return false;
    }
    if let Some(location) = alert.location.as_deref() {
        let wanted = normalize(location);
        if !wanted.is_empty() && !target.location.contains(&wanted) {
            return false;
        }
    }
    alert.keywords.iter().all(|keyword| {
        let keyword = normalize(keyword);
        keyword.is_empty() || target.text.contains(&format!(" {keyword} "))
    })
}

/// Alerts from `alerts` that `job` satisfies.
pub fn matching_alerts<'a>(alerts: &'a [JobAlertRow], job: &JobRow) -> Vec<&'a JobAlertRow> {
    let target = MatchTarget::new(job);
    alerts.iter().filter(|a| alert_matches(a, &target)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn job() -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            source: "greenhouse".into(),
            external_id: "1".into(),
            title: "Senior Rust Engineer".into(),
            company: "Acme".into(),
            location: Some("Remote - Europe".into()),
            remote: true,
            url: "https://a.io/1".into(),
            description: "<p>Build async services with Tokio and PostgreSQL.</p>".into(),
            salary: None,
            tags: vec!["Machine Learning".into()],
            posted_at: None,
            duplicate_of: None,
            similarity: None,
            created_at: Utc::now(),
        }
    }

    fn alert(keywords: &[&str]) -> JobAlertRow {
        JobAlertRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "test".into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            location: None,
            remote_only: false,
            sources: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_all_keywords_required() {
        let target = MatchTarget::new(&job());
        assert!(alert_matches(&alert(&["rust", "tokio"]), &target));
        assert!(!alert_matches(&alert(&["rust", "golang"]), &target));
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        let target = MatchTarget::new(&job());
        assert!(!alert_matches(&alert(&["rus"]), &target));
        assert!(!alert_matches(&alert(&["post"]), &target));
    }

    #[test]
    fn test_phrase_keyword_and_tags() {
        let target = MatchTarget::new(&job());
        assert!(alert_matches(&alert(&["Machine Learning"]), &target));
        assert!(alert_matches(&alert(&["async services"]), &target));
    }

    #[test]
    fn test_location_and_remote_filters() {
        let target = MatchTarget::new(&job());
        let mut a = alert(&["rust"]);
        a.location = Some("europe".into());
        a.remote_only = true;
        assert!(alert_matches(&a, &target));

        a.location = Some("Austin".into());
        assert!(!alert_matches(&a, &target));

        let mut onsite = job();
        onsite.remote = false;
        let mut b = alert(&["rust"]);
        b.remote_only = true;
        assert!(!alert_matches(&b, &MatchTarget::new(&onsite)));
    }

    #[test]
    fn test_source_filter() {
        let target = MatchTarget::new(&job());
        let mut a = alert(&["rust"]);
        a.sources = vec!["Lever".into()];
        assert!(!alert_matches(&a, &target));
        a.sources.push("GREENHOUSE".into());
        assert!(alert_matches(&a, &target));
    }

    #[test]
    fn test_matching_alerts_filters_list() {
        let alerts = vec![alert(&["rust"]), alert(&["java"]), alert(&["postgresql"])];
        let matched = matching_alerts(&alerts, &job());
        assert_eq!(matched.len(), 2);
    }
}
