use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use datafile_manager::{
    Datafile, DatafileManager, EngineOptions, EvaluationEngine, ManagerConfig, ManagerLogger,
    Result,
};
use httpmock::prelude::*;
use serde_json::{json, Value};

/// Enables exactly the flags set to `true` under `"flags"`, for every user.
struct FlagsEngine {
    flags: Value,
}

impl EvaluationEngine for FlagsEngine {
    fn is_feature_enabled(&self, flag_key: &str, _user_id: &str) -> bool {
        self.flags[flag_key] == json!(true)
    }
}

fn create_engine(
    datafile: &Datafile,
    _logger: &ManagerLogger,
    _options: &EngineOptions,
) -> Result<Arc<dyn EvaluationEngine>> {
    Ok(Arc::new(FlagsEngine {
        flags: datafile.as_value()["flags"].clone(),
    }))
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn swaps_engine_only_when_datafile_changes() {
    init_logger();

    // Scripted responses; the last one repeats.
    let responses = Arc::new(Mutex::new(vec![
        json!({"flags": {"f1": true}}),
        json!({"flags": {"f1": true}}),
        json!({"flags": {"f1": false}}),
    ]));
    let polls = Arc::new(Mutex::new(0usize));

    let source = {
        let responses = responses.clone();
        let polls = polls.clone();
        move || -> Result<Datafile> {
            let mut responses = responses.lock().unwrap();
            *polls.lock().unwrap() += 1;
            let value = if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            };
            Ok(Datafile::from_value(value))
        }
    };

    let manager = DatafileManager::new();
    let client = manager
        .configure_with_source(
            ManagerConfig::from_sdk_key("abc123").poll_interval(Duration::from_millis(20)),
            source,
            create_engine,
        )
        .unwrap();

    manager.wait_for_configuration().unwrap();
    assert!(client.is_ready());

    // Third datafile eventually flips the flag, after exactly one more swap.
    assert!(wait_until(Duration::from_secs(5), || !client
        .evaluate_flag("f1", Some("u1"))));
    assert_eq!(client.revision(), 2);

    // Further identical polls keep the handle stable.
    let handle = client.active_handle();
    let seen = *polls.lock().unwrap();
    assert!(wait_until(Duration::from_secs(5), || *polls.lock().unwrap() > seen + 2));
    assert!(Arc::ptr_eq(&handle, &client.active_handle()));

    manager.shutdown().unwrap();
}

#[test]
fn evaluates_after_first_http_fetch() {
    init_logger();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/abc123.json");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"flags": {"f1": true}}"#);
    });

    let (manager, client) = ManagerConfig::from_sdk_key("abc123")
        .base_url(server.base_url())
        .poll_interval(Duration::from_millis(50))
        .to_manager(create_engine)
        .unwrap();

    manager.wait_for_configuration().unwrap();

    assert!(client.evaluate_flag("f1", Some("u1")));
    assert!(client.evaluate_flag("f1", None));
    assert!(!client.evaluate_flag("f2", Some("u1")));

    manager.shutdown().unwrap();
}

#[test]
fn unreachable_datafile_keeps_client_uninitialized() {
    init_logger();

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/abc123.json");
        then.status(500);
    });

    let (manager, client) = ManagerConfig::from_sdk_key("abc123")
        .base_url(server.base_url())
        .poll_interval(Duration::from_millis(10))
        .to_manager(create_engine)
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || mock.hits() >= 3));
    assert!(!client.is_ready());
    assert!(!client.evaluate_flag("any_flag", Some("user1")));

    manager.shutdown().unwrap();
}
