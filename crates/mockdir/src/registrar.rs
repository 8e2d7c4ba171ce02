//! Fixture registration for test setup code.

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::response::Response;
use crate::store::StateDir;
use tracing::info;

/// Writes fixtures into a state directory ahead of the requests that use them.
pub struct Registrar<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> Registrar<'a> {
    pub fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    fn dir(&self) -> &StateDir {
        self.dispatcher.state_dir()
    }

    /// Serve `response` for `path` (and anything `path` matches as a pattern).
    /// Returns the response reference.
    pub fn set_response_of_path(&self, path: &str, response: &Response) -> Result<String> {
        let reference = self.dir().responses().store(response)?;
        self.dir().registry().append(path)?;
        self.dir().aliases().bind(path, &reference)?;
        info!(path, reference = %reference, kind = response.kind(), "Registered fixture");
        Ok(reference)
    }

    /// Store `response` and return the `/<vendor>/<reference>` path serving it.
    pub fn url_path_of_response(&self, response: &Response) -> Result<String> {
        let reference = self.dir().responses().store(response)?;
        Ok(self.dispatcher.direct_path(&reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{MockResponse, StaticResponse};

    #[test]
    fn test_set_response_of_path_writes_all_three_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let dispatcher = Dispatcher::new(StateDir::create(tmp.path()).unwrap());
        let registrar = Registrar::new(&dispatcher);
        let response: Response = StaticResponse::new("hi").into();

        let reference = registrar.set_response_of_path("/hello", &response).unwrap();

        let dir = dispatcher.state_dir();
        assert!(dir.file(&reference).exists());
        assert_eq!(dir.registry().patterns().unwrap(), vec!["/hello"]);
        assert_eq!(
            dir.aliases().lookup("/hello").unwrap().as_deref(),
            Some(reference.as_str())
        );
    }

    #[test]
    fn test_url_path_of_response() {
        let tmp = tempfile::tempdir().unwrap();
        let dispatcher = Dispatcher::new(StateDir::create(tmp.path()).unwrap());
        let response: Response = StaticResponse::new("direct").into();

        let path = Registrar::new(&dispatcher)
            .url_path_of_response(&response)
            .unwrap();
        assert_eq!(path, format!("/VND.Mockdir/{}", response.reference()));
    }
}
