use chrono::{DateTime, Duration, Utc};

use crate::fs::SessionMap;

/// Finished sessions whose end time is at least `after` before `now`.
pub fn select_archivable(sessions: &SessionMap, now: DateTime<Utc>, after: Duration) -> Vec<String> {
    sessions
        .values()
        .filter(|s| s.lifecycle.is_finished())
        .filter(|s| s.ended_at.is_some_and(|ended| now - ended >= after))
        .map(|s| s.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::{Session, WindowHandle};
    use crate::models::status::Lifecycle;
    use std::path::PathBuf;

    #[test]
    fn test_only_old_finished_sessions() {
        let now = Utc::now();
        let mut map = SessionMap::new();
        let make = |name: &str, lifecycle: Lifecycle, ended_ago: Option<i64>| {
            let mut s = Session::new(name, WindowHandle::new("agents", "@1"), PathBuf::from("/"), None);
            s.lifecycle = lifecycle;
            s.ended_at = ended_ago.map(|secs| now - Duration::seconds(secs));
            s
        };
        map.insert("old-done".into(), make("old-done", Lifecycle::Done, Some(7200)));
        map.insert("new-done".into(), make("new-done", Lifecycle::Done, Some(60)));
        map.insert("old-term".into(), make("old-term", Lifecycle::Terminated, Some(3600)));
        map.insert("running".into(), make("running", Lifecycle::Running, None));

        let mut picked = select_archivable(&map, now, Duration::seconds(3600));
        picked.sort();
        assert_eq!(picked, vec!["old-done".to_string(), "old-term".to_string()]);
    }
}
