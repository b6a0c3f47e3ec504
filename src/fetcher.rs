//! An HTTP client that fetches the datafile.
use std::time::Duration;

use reqwest::Url;

use crate::{
    logger::{manager_log, ManagerLogger},
    Datafile, Error, Result,
};

/// Source of datafiles polled by the refresher.
///
/// [`DatafileFetcher`] is the production implementation. Closures returning
/// `Result<Datafile>` implement the trait too, which is handy for tests.
pub trait DatafileSource {
    /// Retrieve the current datafile. Any error means "no update this tick".
    fn fetch(&self) -> Result<Datafile>;
}

impl<F: Fn() -> Result<Datafile>> DatafileSource for F {
    fn fetch(&self) -> Result<Datafile> {
        self()
    }
}

/// Build the datafile address for `sdk_key`.
pub fn datafile_url(base_url: &str, sdk_key: &str) -> Result<Url> {
    Url::parse(&format!(
        "{}/{}.json",
        base_url.trim_end_matches('/'),
        sdk_key
    ))
    .map_err(Error::InvalidBaseUrl)
}

/// Fetches the datafile over HTTP with a bounded timeout.
pub struct DatafileFetcher {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::blocking::Client,
    url: Url,
    logger: ManagerLogger,
}

impl DatafileFetcher {
    /// Create a fetcher for `{base_url}/{sdk_key}.json`.
    pub fn new(
        base_url: &str,
        sdk_key: &str,
        timeout: Duration,
        logger: ManagerLogger,
    ) -> Result<DatafileFetcher> {
        let url = datafile_url(base_url, sdk_key)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(DatafileFetcher {
            client,
            url,
            logger,
        })
    }

    /// Address the datafile is requested from.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl DatafileSource for DatafileFetcher {
    fn fetch(&self) -> Result<Datafile> {
        manager_log!(self.logger, log::Level::Trace, "fetching datafile");

        let response = self.client.get(self.url.clone()).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus(status));
        }

        let body = response.bytes()?;
        let datafile = Datafile::from_slice(&body)?;

        manager_log!(self.logger, log::Level::Trace,
                     revision = datafile.revision();
                     "fetched datafile");

        Ok(datafile)
    }
}
