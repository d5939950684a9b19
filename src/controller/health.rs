use chrono::Utc;
use serde::Serialize;

use super::Controller;
use crate::context::Context;
use crate::http::StatusCode;

/// The fixed health-check route. Requests to it are never access-logged.
pub const HEALTH_CHECK_ROUTE: &str = "health";

/// RFC 822 layout, always rendered in UTC.
const RFC822_UTC: &str = "%d %b %y %H:%M UTC";

/// Body returned by [`HealthCheckController`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheckResource {
    pub timestamp: String,
    pub status: String,
}

impl HealthCheckResource {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now().format(RFC822_UTC).to_string(),
            status: "OK".to_owned(),
        }
    }
}

/// Answers `GET health` without authentication.
#[derive(Debug, Default, Clone, Copy)]
pub struct HealthCheckController;

impl Controller for HealthCheckController {
    fn routes(&self) -> Vec<String> {
        vec![HEALTH_CHECK_ROUTE.to_owned()]
    }

    fn authenticate(&self, _ctx: &Context) -> bool {
        true
    }

    fn get(&self, ctx: &mut Context) {
        ctx.set_response(&HealthCheckResource::now(), StatusCode::Ok);
    }
}
