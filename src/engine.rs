use std::sync::Arc;

use crate::{
    logger::{manager_log, ManagerLogger},
    Datafile, EngineOptions, Result,
};

/// A feature flag evaluation engine built from one datafile.
///
/// Bucketing and targeting rules live entirely in the engine; the manager only decides which
/// engine is current. Engines are immutable: a new datafile always produces a new engine.
pub trait EvaluationEngine: Send + Sync {
    /// Returns `true` if `flag_key` is enabled for `user_id`.
    fn is_feature_enabled(&self, flag_key: &str, user_id: &str) -> bool;
}

/// Builds an [`EvaluationEngine`] from a datafile.
///
/// Any `Fn(&Datafile, &ManagerLogger, &EngineOptions) -> Result<Arc<dyn EvaluationEngine>>`
/// closure can be used as a factory.
///
/// ```
/// # use std::sync::Arc;
/// # use datafile_manager::{Datafile, EngineOptions, EvaluationEngine, ManagerLogger, Result};
/// struct AlwaysOn;
/// impl EvaluationEngine for AlwaysOn {
///     fn is_feature_enabled(&self, _flag_key: &str, _user_id: &str) -> bool {
///         true
///     }
/// }
///
/// let factory = |_datafile: &Datafile,
///                _logger: &ManagerLogger,
///                _options: &EngineOptions|
///  -> Result<Arc<dyn EvaluationEngine>> { Ok(Arc::new(AlwaysOn)) };
/// # let _ = factory;
/// ```
pub trait EngineFactory: Send + Sync {
    /// Create an engine for `datafile`. `options` are the ones set with
    /// [`ManagerConfig::engine_options`](crate::ManagerConfig::engine_options).
    fn create(
        &self,
        datafile: &Datafile,
        logger: &ManagerLogger,
        options: &EngineOptions,
    ) -> Result<Arc<dyn EvaluationEngine>>;
}

impl<F> EngineFactory for F
where
    F: Fn(&Datafile, &ManagerLogger, &EngineOptions) -> Result<Arc<dyn EvaluationEngine>>
        + Send
        + Sync,
{
    fn create(
        &self,
        datafile: &Datafile,
        logger: &ManagerLogger,
        options: &EngineOptions,
    ) -> Result<Arc<dyn EvaluationEngine>> {
        self(datafile, logger, options)
    }
}

const UNINITIALIZED_ERROR: &str = "evaluate_flag called before the datafile manager was initialized.

If you just started a web application or app server, try the request again,
or configure the datafile manager earlier in your application startup code,
or evaluate flags later in your application lifecycle.";

/// Placeholder engine served until the first datafile is accepted. Every flag is disabled.
pub(crate) struct UninitializedEngine {
    logger: ManagerLogger,
}

impl UninitializedEngine {
    pub(crate) fn new(logger: ManagerLogger) -> UninitializedEngine {
        UninitializedEngine { logger }
    }
}

impl EvaluationEngine for UninitializedEngine {
    fn is_feature_enabled(&self, flag_key: &str, user_id: &str) -> bool {
        manager_log!(self.logger, log::Level::Error, flag_key, user_id;
                     "{}", UNINITIALIZED_ERROR);
        false
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::{EngineFactory, EvaluationEngine, UninitializedEngine};
    use crate::{Datafile, EngineOptions, Error, ManagerLogger, Result};

    struct FixedEngine(bool);

    impl EvaluationEngine for FixedEngine {
        fn is_feature_enabled(&self, _flag_key: &str, _user_id: &str) -> bool {
            self.0
        }
    }

    #[test]
    fn placeholder_reports_disabled() {
        let engine = UninitializedEngine::new(ManagerLogger::default());
        assert!(!engine.is_feature_enabled("any_flag", "user1"));
    }

    #[test]
    fn closures_are_factories() {
        let factory = |datafile: &Datafile,
                       _logger: &ManagerLogger,
                       options: &EngineOptions|
         -> Result<Arc<dyn EvaluationEngine>> {
            if options.contains_key("reject") {
                return Err(Error::EngineCreation("rejected".to_owned()));
            }
            Ok(Arc::new(FixedEngine(datafile.as_value()["on"] == json!(true))))
        };

        let datafile = Datafile::from_value(json!({"on": true}));
        let engine = factory
            .create(&datafile, &ManagerLogger::default(), &EngineOptions::new())
            .unwrap();
        assert!(engine.is_feature_enabled("f", "u"));

        let mut options = EngineOptions::new();
        options.insert("reject".to_owned(), true.into());
        assert!(factory
            .create(&datafile, &ManagerLogger::default(), &options)
            .is_err());
    }
}
