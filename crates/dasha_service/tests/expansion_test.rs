//! Drill-down sessions against an in-process fake calculation service.
//!
//! Runs on a paused tokio clock, so delays and timeouts are deterministic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

use dasha_base::Graha;
use dasha_base::dasha::{DashaLevel, DashaSystem, NodeId};
use dasha_service::{
    DashaRequest, ExpansionController, ExpansionDriver, ExpansionState, ExpansionWarning,
    PeriodSource, Resolution, ServiceError,
};

type Responder = fn(&DashaRequest, usize) -> (Duration, Result<Value, ServiceError>);

struct FakeService {
    calls: Mutex<Vec<DashaRequest>>,
    count: AtomicUsize,
    respond: Responder,
}

impl FakeService {
    fn new(respond: Responder) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            count: AtomicUsize::new(0),
            respond,
        })
    }

    fn calls(&self) -> Vec<DashaRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl PeriodSource for FakeService {
    fn fetch(
        &self,
        request: &DashaRequest,
    ) -> impl std::future::Future<Output = Result<Value, ServiceError>> + Send {
        self.calls.lock().unwrap().push(request.clone());
        let n = self.count.fetch_add(1, Ordering::SeqCst);
        let (delay, result) = (self.respond)(request, n);
        async move {
            tokio::time::sleep(delay).await;
            result
        }
    }
}

const TIMEOUT: Duration = Duration::from_secs(5);
const FAST: Duration = Duration::from_millis(20);

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()
}

/// Contiguous periods of `years` each, starting Jan 1 of `from`.
fn periods(key: &str, planets: &[&str], from: i32, years: i32) -> Value {
    let list: Vec<Value> = planets
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let start = from + years * i as i32;
            json!({
                "planet": p,
                "start_date": format!("{start}-01-01"),
                "end_date": format!("{}-01-01", start + years),
            })
        })
        .collect();
    json!({ key: list })
}

fn mahadashas() -> Value {
    periods("mahadashas", &["Ra", "Ju", "Sa", "Me", "Ke", "Ve"], 2003, 18)
}

/// Nine antardashas, one lord each, for whichever mahadasha was asked for.
fn antardashas(from: i32) -> Value {
    periods(
        "antardashas",
        &["Ju", "Sa", "Me", "Ke", "Ve", "Su", "Mo", "Ma", "Ra"],
        from,
        2,
    )
}

fn standard(request: &DashaRequest, _n: usize) -> (Duration, Result<Value, ServiceError>) {
    let body = match request.level {
        DashaLevel::Mahadasha => mahadashas(),
        _ => antardashas(2021),
    };
    (FAST, Ok(body))
}

fn driver(service: &Arc<FakeService>) -> ExpansionDriver<Arc<FakeService>> {
    let controller = ExpansionController::for_system("subject-1", DashaSystem::Vimshottari);
    ExpansionDriver::new(Arc::clone(service), controller, TIMEOUT).with_clock(fixed_now)
}

fn id_of(d: &ExpansionDriver<Arc<FakeService>>, graha: Graha) -> NodeId {
    d.controller()
        .viewing()
        .iter()
        .find(|n| n.lord.graha() == Some(graha))
        .map(|n| n.id.clone())
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn drill_down_into_jupiter() {
    let service = FakeService::new(standard);
    let mut d = driver(&service);
    d.start();
    assert_eq!(d.settle().await, Some(Resolution::Applied { periods: 6 }));

    let ju = id_of(&d, Graha::Guru);
    d.drill_down(&ju).unwrap();
    assert_eq!(d.settle().await, Some(Resolution::Applied { periods: 9 }));

    let c = d.controller();
    assert_eq!(c.viewing().len(), 9);
    let path: Vec<_> = c.path().iter().map(|n| n.lord.graha()).collect();
    assert_eq!(path, vec![Some(Graha::Guru)]);

    let calls = service.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].context, None);
    assert_eq!(calls[1].level, DashaLevel::Antardasha);
    assert_eq!(
        calls[1].context.as_ref().unwrap().maha_lord.as_deref(),
        Some("Jupiter")
    );
}

fn slow_rahu(request: &DashaRequest, _n: usize) -> (Duration, Result<Value, ServiceError>) {
    let maha = request.context.as_ref().and_then(|c| c.maha_lord.as_deref());
    match maha {
        None => (FAST, Ok(mahadashas())),
        Some("Rahu") => (Duration::from_millis(800), Ok(antardashas(2003))),
        Some(_) => (FAST, Ok(antardashas(2021))),
    }
}

#[tokio::test(start_paused = true)]
async fn last_drill_down_wins() {
    let service = FakeService::new(slow_rahu);
    let mut d = driver(&service);
    d.start();
    d.settle().await;

    let ra = id_of(&d, Graha::Rahu);
    let ju = id_of(&d, Graha::Guru);
    d.drill_down(&ra).unwrap();
    // let the Rahu fetch get under way before it is superseded
    tokio::task::yield_now().await;
    d.drill_down(&ju).unwrap();
    assert_eq!(d.settle().await, Some(Resolution::Applied { periods: 9 }));
    assert_eq!(d.controller().path()[0].id, ju);
    assert_eq!(d.controller().viewing()[0].start.format("%Y").to_string(), "2021");

    // the superseded fetch never lands
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(d.next_resolution().await, None);
    assert_eq!(d.controller().path()[0].id, ju);
}

fn hangs_once(request: &DashaRequest, n: usize) -> (Duration, Result<Value, ServiceError>) {
    match (request.level, n) {
        (DashaLevel::Mahadasha, _) => (FAST, Ok(mahadashas())),
        (_, 1) => (Duration::from_secs(60), Ok(antardashas(2021))),
        _ => (FAST, Ok(antardashas(2021))),
    }
}

#[tokio::test(start_paused = true)]
async fn timeout_fails_then_retry_succeeds() {
    let service = FakeService::new(hangs_once);
    let mut d = driver(&service);
    d.start();
    d.settle().await;

    let ju = id_of(&d, Graha::Guru);
    d.drill_down(&ju).unwrap();
    assert_eq!(d.settle().await, Some(Resolution::Failed));
    match d.controller().state() {
        ExpansionState::Failed(msg) => assert!(msg.contains("timed out"), "{msg}"),
        other => panic!("expected failure, got {other:?}"),
    }
    // previous list stays visible
    assert_eq!(d.controller().viewing().len(), 6);
    assert!(d.controller().path().is_empty());

    assert!(d.retry());
    assert_eq!(d.settle().await, Some(Resolution::Applied { periods: 9 }));
    assert_eq!(d.controller().path().len(), 1);
    assert!(!d.retry());
}

fn panics_below_root(request: &DashaRequest, _n: usize) -> (Duration, Result<Value, ServiceError>) {
    match request.level {
        DashaLevel::Mahadasha => (FAST, Ok(mahadashas())),
        level => panic!("no handler for {level}"),
    }
}

#[tokio::test(start_paused = true)]
async fn panicking_source_fails_instead_of_hanging() {
    let service = FakeService::new(panics_below_root);
    let mut d = driver(&service);
    d.start();
    d.settle().await;

    let ju = id_of(&d, Graha::Guru);
    d.drill_down(&ju).unwrap();
    assert_eq!(d.settle().await, Some(Resolution::Failed));
    match d.controller().state() {
        ExpansionState::Failed(msg) => assert!(msg.contains("without a result"), "{msg}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(d.controller().viewing().len(), 6);
    assert_eq!(d.next_resolution().await, None);
}

fn service_error(request: &DashaRequest, _n: usize) -> (Duration, Result<Value, ServiceError>) {
    match request.level {
        DashaLevel::Mahadasha => (FAST, Ok(mahadashas())),
        _ => (
            FAST,
            Err(ServiceError::Status {
                status: 500,
                body: "ephemeris unavailable".into(),
            }),
        ),
    }
}

#[tokio::test(start_paused = true)]
async fn service_error_is_non_destructive() {
    let service = FakeService::new(service_error);
    let mut d = driver(&service);
    d.start();
    d.settle().await;
    let before: Vec<_> = d.controller().viewing().iter().map(|n| n.id.clone()).collect();

    let ju = id_of(&d, Graha::Guru);
    d.drill_down(&ju).unwrap();
    assert_eq!(d.settle().await, Some(Resolution::Failed));
    let after: Vec<_> = d.controller().viewing().iter().map(|n| n.id.clone()).collect();
    assert_eq!(before, after);
}

fn empty_below(request: &DashaRequest, _n: usize) -> (Duration, Result<Value, ServiceError>) {
    match request.level {
        DashaLevel::Mahadasha => (FAST, Ok(mahadashas())),
        _ => (FAST, Ok(json!({"status": "ok", "antardashas": []}))),
    }
}

#[tokio::test(start_paused = true)]
async fn empty_result_is_not_a_failure() {
    let service = FakeService::new(empty_below);
    let mut d = driver(&service);
    d.start();
    d.settle().await;

    let ju = id_of(&d, Graha::Guru);
    d.drill_down(&ju).unwrap();
    assert_eq!(d.settle().await, Some(Resolution::Empty));
    assert_eq!(d.controller().state(), &ExpansionState::Loaded);
    assert!(matches!(
        d.controller().last_warning(),
        Some(ExpansionWarning::EmptyResult { level: DashaLevel::Antardasha, .. })
    ));
}

fn one_per_level(request: &DashaRequest, _n: usize) -> (Duration, Result<Value, ServiceError>) {
    let body = json!([{
        "planet": "Ju",
        "start": "2021-01-01T00:00:00Z",
        "end": "2037-01-01T00:00:00Z",
        "level": request.level,
    }]);
    (FAST, Ok(body))
}

#[tokio::test(start_paused = true)]
async fn prana_rejected_without_network_call() {
    let service = FakeService::new(one_per_level);
    let mut d = driver(&service);
    d.start();
    d.settle().await;

    for _ in 0..4 {
        let id = d.controller().viewing()[0].id.clone();
        d.drill_down(&id).unwrap();
        assert_eq!(d.settle().await, Some(Resolution::Applied { periods: 1 }));
    }
    let prana = d.controller().viewing()[0].clone();
    assert_eq!(prana.level, DashaLevel::Prana);
    assert_eq!(service.calls().len(), 5);

    let err = d.drill_down(&prana.id).unwrap_err();
    assert!(matches!(err, ServiceError::Dasha(_)));
    assert_eq!(service.calls().len(), 5);
    assert_eq!(d.controller().state(), &ExpansionState::Loaded);
    assert_eq!(d.next_resolution().await, None);

    let crumbs = d.controller().breadcrumbs();
    assert_eq!(crumbs.len(), 5);
    assert_eq!(crumbs[4].label, "Jupiter Sookshma");
}

#[tokio::test(start_paused = true)]
async fn breadcrumb_navigation_refetches() {
    let service = FakeService::new(standard);
    let mut d = driver(&service);
    d.start();
    d.settle().await;
    let ju = id_of(&d, Graha::Guru);
    d.drill_down(&ju).unwrap();
    d.settle().await;

    d.navigate_to(0).unwrap();
    assert_eq!(d.settle().await, Some(Resolution::Applied { periods: 6 }));
    assert!(d.controller().path().is_empty());
    let calls = service.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2].level, DashaLevel::Mahadasha);
}
