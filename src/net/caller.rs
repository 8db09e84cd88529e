//! Runs raw request bytes through an [`Application`] on the calling thread.
//!
//! ## Call flow
//!
//! 1. Save the ambient principal and site
//!    (see [`StateGuard`](crate::publisher::state::StateGuard))
//! 2. Parse the request
//!    (delegated to [`parse_request`](crate::http::parser::parse_request))
//! 3. Build the dispatch environment
//!    (delegated to [`build_environ`](crate::publisher::environ::build_environ))
//! 4. Publish into a fresh [`Response`]
//! 5. Sync the application's storage so the next call sees the changes
//! 6. Restore the ambient state, whatever the outcome
//!
//! Application failures become error pages unless `handle_errors` is off,
//! in which case they are returned to the caller untouched.

use std::rc::Rc;

use tracing::{debug, warn};

use crate::config::{HarnessConfig, config};
use crate::error::Result;
use crate::http::parser::parse_request;
use crate::http::response::Response;
use crate::publisher::environ::build_environ;
use crate::publisher::responses::error_page;
use crate::publisher::state::save_state;
use crate::publisher::{Application, PublishRequest};

pub struct Caller<A: Application> {
    app: Rc<A>,
    config: HarnessConfig,
}

impl<A: Application> Caller<A> {
    pub fn new(app: Rc<A>) -> Self {
        Self::with_config(app, config().clone())
    }

    pub fn with_config(app: Rc<A>, config: HarnessConfig) -> Self {
        Self { app, config }
    }

    pub fn app(&self) -> &Rc<A> {
        &self.app
    }

    /// Publishes `request` and returns the application's response.
    pub fn call(&self, request: &[u8], handle_errors: bool) -> Result<Response> {
        save_state(|| self.dispatch(request, handle_errors))
    }

    fn dispatch(&self, request: &[u8], handle_errors: bool) -> Result<Response> {
        let parsed = parse_request(request)?;
        let environ = build_environ(&parsed, &self.config);

        let mut publish = PublishRequest::new(environ, parsed.body, !handle_errors);
        let mut response = Response::new();

        match self.app.publish(&mut publish, &mut response) {
            Ok(()) => {}
            Err(err) if handle_errors => {
                warn!(method = %parsed.method, path = %parsed.path_info, %err, "rendering application error");
                response = error_page(&err);
            }
            Err(err) => return Err(err.into()),
        }

        if !publish.stderr.is_empty() {
            debug!(stderr = %String::from_utf8_lossy(&publish.stderr), "application wrote to stderr");
        }

        self.app.sync();

        debug!(
            method = %parsed.method,
            path = %parsed.path_info,
            status = response.get_status(),
            "published request"
        );
        Ok(response)
    }
}
