use std::sync::Arc;

use medialog_core::{MediaType, ScheduleState, ScheduledShow, Status, Weekday};
use medialog_journal::{Annotation, ListeningEntry, PeriodKey};
use medialog_session::{IndexOutcome, Session};
use medialog_store::{MemoryBackend, PutOutcome, StoreConfig};
use serde_json::Value;
use time::macros::datetime;

fn session() -> (Arc<MemoryBackend>, Session) {
    let backend = Arc::new(MemoryBackend::new());
    let session = Session::new(backend.clone(), StoreConfig::for_repo("aztkp/media-log"));
    (backend, session)
}

fn stored_json(backend: &MemoryBackend) -> Value {
    serde_json::from_str(&backend.content("schedule.json").expect("state written")).unwrap()
}

#[tokio::test]
async fn cycling_four_times_returns_to_want() {
    let (backend, session) = session();
    let now = datetime!(2024-02-11 12:00:00 UTC);
    session
        .apply(|s| s.quick_add("Dune", MediaType::Movie, now))
        .await
        .unwrap();

    let expected = [Status::Watching, Status::Done, Status::Hold, Status::Want];
    for want in expected {
        let got = session.apply(|s| s.cycle_status(0, now)).await.unwrap();
        assert_eq!(got, want);
        let json = stored_json(&backend);
        let item = &json["watchlist"][0];
        if want == Status::Done {
            assert!(item["completedAt"].is_string(), "done must stamp completedAt");
        } else {
            assert!(item.get("completedAt").map_or(true, Value::is_null));
        }
    }
    let state = session.load_state().await.unwrap();
    assert_eq!(state.watchlist[0].status, Status::Want);
}

#[tokio::test]
async fn recording_a_show_leaves_schedule_untouched() {
    let (backend, session) = session();
    let mut seed = ScheduleState::default();
    seed.weekly.mon.push(ScheduledShow {
        name: "Show1".into(),
        ..ScheduledShow::default()
    });
    session.save_state(&seed).await.unwrap();

    session
        .apply(|s| s.record_show(Weekday::Mon, 0, datetime!(2024-02-12 21:00:00 UTC)))
        .await
        .unwrap();

    let json = stored_json(&backend);
    assert_eq!(json["watchlist"][0]["title"], "Show1");
    assert_eq!(json["watchlist"][0]["status"], "done");
    assert!(json["watchlist"][0]["completedAt"].is_string());
    assert_eq!(json["weekly"]["mon"][0]["name"], "Show1");
    assert_eq!(json["weekly"]["mon"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn state_saves_ride_out_one_conflict() {
    let (backend, session) = session();
    session.save_state(&ScheduleState::default()).await.unwrap();
    backend.script_puts(vec![PutOutcome::Conflict]);

    session
        .apply(|s| s.quick_add("Oppenheimer", MediaType::Movie, datetime!(2024-02-11 00:00 UTC)))
        .await
        .unwrap();

    assert_eq!(stored_json(&backend)["watchlist"][0]["title"], "Oppenheimer");
}

fn listening(station: &str, program_time: &str) -> ListeningEntry {
    ListeningEntry {
        station_id: station.into(),
        program_title: Some("Night Show".into()),
        program_time: Some(program_time.into()),
        saved_at: "2024-02-11T03:00:00+09:00".into(),
        memo: None,
        songs: Vec::new(),
        url: format!("https://radiko.jp/#!/ts/{station}/{program_time}"),
    }
}

#[tokio::test]
async fn listening_writes_log_and_calendar() {
    let (backend, session) = session();

    let first = session
        .record_listening(&listening("TBS", "20240211010000"))
        .await
        .unwrap();
    assert!(matches!(first.index, IndexOutcome::Updated(Annotation::Linked)));
    let second = session
        .record_listening(&listening("QRR", "20240211020000"))
        .await
        .unwrap();
    assert!(matches!(second.index, IndexOutcome::Updated(Annotation::Added)));

    let log = backend.content("logs/2024-02.md").unwrap();
    assert!(log.starts_with("# 2024年2月\n\n## 2/11\n\n### 02:00 - QRR"));
    assert!(log.find("QRR").unwrap() < log.find("TBS").unwrap());

    let index = backend.content("logs/README.md").unwrap();
    assert!(index.contains("[11 TBS,QRR](2024-02.md#211)"));
}

#[tokio::test]
async fn index_failure_keeps_the_log_entry() {
    let (backend, session) = session();
    // The log write succeeds, the index write is rejected.
    backend.script_puts(vec![
        PutOutcome::Ok {
            version: String::new(),
        },
        PutOutcome::NotFound,
    ]);

    let outcome = session
        .record_listening(&listening("TBS", "20240211010000"))
        .await
        .unwrap();

    assert!(matches!(outcome.index, IndexOutcome::Failed(_)));
    assert!(backend.content("logs/2024-02.md").is_some());
    assert!(backend.content("logs/README.md").is_none());
}

#[tokio::test]
async fn surface_operations_compose() {
    let (backend, session) = session();
    let period: PeriodKey = "2024-03".parse().unwrap();
    session
        .append_log(period, period.day(3).unwrap(), "hello\n\n")
        .await
        .unwrap();
    let outcome = session
        .update_calendar_index(period, 3, "LFR")
        .await
        .unwrap();
    assert_eq!(outcome, Annotation::Linked);
    assert_eq!(
        backend.content("logs/2024-03.md").unwrap(),
        "# 2024年3月\n\n## 3/3\n\nhello\n\n"
    );
    assert!(backend
        .content("logs/README.md")
        .unwrap()
        .contains("[3 LFR](2024-03.md#33)"));
}

#[tokio::test]
async fn bare_log_entries_stay_separate() {
    let (backend, session) = session();
    let period: PeriodKey = "2024-03".parse().unwrap();
    let day = period.day(3).unwrap();
    session.append_log(period, day, "E1").await.unwrap();
    session.append_log(period, day, "E2").await.unwrap();
    assert_eq!(
        backend.content("logs/2024-03.md").unwrap(),
        "# 2024年3月\n\n## 3/3\n\nE2\n\nE1\n\n"
    );
}
