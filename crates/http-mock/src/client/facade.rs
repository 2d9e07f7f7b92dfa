//! Per-test entry point bundling one running server with its collaborators.
//!
//! Collaborators are built on first access and memoized for the life of the
//! facade. Between tests, [`HttpMock::reset`] cleans the server instead of
//! restarting it.

use super::requests::RequestCollection;
use super::transport::MockClient;
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::expectation::MockBuilder;
use crate::predicate::{ExtractorFactory, MatcherFactory};
use crate::process::Server;
use once_cell::sync::OnceCell;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Services a facade can hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    Server,
    Matches,
    Mock,
    Client,
    Requests,
}

impl Collaborator {
    pub const ALL: [Collaborator; 5] = [
        Collaborator::Server,
        Collaborator::Matches,
        Collaborator::Mock,
        Collaborator::Client,
        Collaborator::Requests,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collaborator::Server => "server",
            Collaborator::Matches => "matches",
            Collaborator::Mock => "mock",
            Collaborator::Client => "client",
            Collaborator::Requests => "requests",
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collaborator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Collaborator::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::UnknownCollaborator(s.to_string()))
    }
}

pub struct HttpMock {
    server: Server,
    base_path: Option<String>,
    matches: OnceCell<MatcherFactory>,
    mock: Option<MockBuilder>,
    client: OnceCell<MockClient>,
    requests: OnceCell<RequestCollection>,
}

impl fmt::Debug for HttpMock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpMock")
            .field("server", &self.server)
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

impl HttpMock {
    /// Start a server for `config` and wrap it.
    pub async fn start(config: ServerConfig) -> Result<Self> {
        let base_path = config.base_path.clone();
        let server = Server::new(config)?;
        server.start().await?;
        Ok(Self::with_server(server, base_path))
    }

    /// Wrap an already started server.
    pub fn with_server(server: Server, base_path: Option<String>) -> Self {
        Self {
            server,
            base_path,
            matches: OnceCell::new(),
            mock: None,
            client: OnceCell::new(),
            requests: OnceCell::new(),
        }
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn matches(&self) -> &MatcherFactory {
        self.matches.get_or_init(MatcherFactory::default)
    }

    /// Expectation builder; extractors it creates strip the configured base path.
    pub fn mock(&mut self) -> &mut MockBuilder {
        let matches = *self.matches();
        let base_path = self.base_path.clone();
        self.mock
            .get_or_insert_with(|| MockBuilder::new(matches, ExtractorFactory::new(base_path)))
    }

    pub fn client(&self) -> Result<&MockClient> {
        self.client.get_or_try_init(|| self.server.client())
    }

    pub fn requests(&self) -> Result<&RequestCollection> {
        self.requests.get_or_try_init(|| {
            let client = self.client()?.clone();
            Ok(RequestCollection::new(Arc::new(client)))
        })
    }

    /// Build the collaborator called `name`.
    pub fn init(&mut self, name: &str) -> Result<Collaborator> {
        let collaborator: Collaborator = name.parse()?;
        match collaborator {
            Collaborator::Server => {}
            Collaborator::Matches => {
                self.matches();
            }
            Collaborator::Mock => {
                self.mock();
            }
            Collaborator::Client => {
                self.client()?;
            }
            Collaborator::Requests => {
                self.requests()?;
            }
        }
        Ok(collaborator)
    }

    pub fn is_initialized(&self, collaborator: Collaborator) -> bool {
        match collaborator {
            Collaborator::Server => true,
            Collaborator::Matches => self.matches.get().is_some(),
            Collaborator::Mock => self.mock.is_some(),
            Collaborator::Client => self.client.get().is_some(),
            Collaborator::Requests => self.requests.get().is_some(),
        }
    }

    /// Flush the builder's pending expectations into the server.
    pub async fn set_up(&mut self) -> Result<()> {
        let expectations = self.mock().flush_expectations()?;
        debug!("Flushing {} expectation(s)", expectations.len());
        self.server.set_up(&expectations).await
    }

    /// Prepare for the next test: clean the server and drop undelivered declarations.
    pub async fn reset(&mut self) -> Result<()> {
        if let Some(mock) = self.mock.as_mut() {
            mock.discard();
        }
        self.server.clean().await
    }

    pub fn stop(&self) {
        self.server.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_collaborator_names() {
        for collaborator in Collaborator::ALL {
            assert_eq!(collaborator.as_str().parse::<Collaborator>().unwrap(), collaborator);
        }
        let err = "database".parse::<Collaborator>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid collaborator \"database\" requested");
    }

    #[tokio::test]
    #[serial]
    async fn test_collaborators_are_built_lazily_and_memoized() {
        let mut http_mock = HttpMock::start(ServerConfig::new("127.0.0.1", 0)).await.unwrap();
        assert!(!http_mock.is_initialized(Collaborator::Requests));
        assert!(!http_mock.is_initialized(Collaborator::Client));

        http_mock.init("requests").unwrap();
        assert!(http_mock.is_initialized(Collaborator::Requests));
        assert!(http_mock.is_initialized(Collaborator::Client));

        let first = http_mock.client().unwrap() as *const MockClient;
        let second = http_mock.client().unwrap() as *const MockClient;
        assert_eq!(first, second);

        assert!(matches!(
            http_mock.init("nope"),
            Err(Error::UnknownCollaborator(name)) if name == "nope"
        ));

        http_mock.stop();
    }

    #[tokio::test]
    #[serial]
    async fn test_set_up_then_reset() {
        let mut http_mock = HttpMock::start(ServerConfig::new("127.0.0.1", 0)).await.unwrap();
        http_mock
            .mock()
            .when()
            .path_is("/foo")
            .then()
            .body("bar")
            .end();
        http_mock.set_up().await.unwrap();

        let client = http_mock.client().unwrap().clone();
        assert_eq!(client.get("/foo").send().await.unwrap().text().await.unwrap(), "bar");
        assert_eq!(http_mock.requests().unwrap().count().await.unwrap(), 1);

        http_mock.mock().when().path_is("/pending").then().end();
        http_mock.reset().await.unwrap();
        assert!(http_mock.mock().pending().is_empty());
        assert_eq!(client.get("/foo").send().await.unwrap().status(), 404);
        assert_eq!(http_mock.requests().unwrap().count().await.unwrap(), 1);

        http_mock.stop();
    }
}
