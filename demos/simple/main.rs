use std::{sync::Arc, time::Duration};

use datafile_manager::{
    Datafile, EngineOptions, EvaluationEngine, ManagerConfig, ManagerLogger, Result,
};

/// Toy engine: a flag is enabled if the datafile lists it under `"featureFlags"` with
/// `"enabled": true`. Real applications plug in their feature flag SDK here.
struct ListedFlags {
    enabled: Vec<String>,
}

impl EvaluationEngine for ListedFlags {
    fn is_feature_enabled(&self, flag_key: &str, _user_id: &str) -> bool {
        self.enabled.iter().any(|key| key == flag_key)
    }
}

fn create_engine(
    datafile: &Datafile,
    _logger: &ManagerLogger,
    _options: &EngineOptions,
) -> Result<Arc<dyn EvaluationEngine>> {
    let enabled = datafile.as_value()["featureFlags"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|flag| flag["enabled"].as_bool() == Some(true))
        .filter_map(|flag| flag["key"].as_str().map(str::to_owned))
        .collect();
    Ok(Arc::new(ListedFlags { enabled }))
}

pub fn main() -> Result<()> {
    env_logger::init();

    let sdk_key = std::env::var("SDK_KEY").unwrap_or_default();
    let (manager, client) = ManagerConfig::from_sdk_key(sdk_key)
        .poll_interval(Duration::from_secs(1))
        .to_manager(create_engine)?;

    // Until the first datafile arrives, every flag evaluates to false.
    manager.wait_for_configuration()?;

    let enabled = client.evaluate_flag("a-boolean-flag", Some("test-user"));
    println!("Enabled: {:?}", enabled);

    manager.shutdown()
}
