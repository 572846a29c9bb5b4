//! Active household user selection.

use crate::config::normalize_user_id;
use crate::events::DashboardEvent;
use crate::model::state::StateValue;
use crate::service::ServiceContext;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from user selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserServiceError {
    UnknownUser(String),
}

impl Display for UserServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownUser(user) => write!(f, "unknown user: `{user}`"),
        }
    }
}

impl Error for UserServiceError {}

pub struct UserService {
    ctx: ServiceContext,
}

impl UserService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn users(&self) -> &[String] {
        &self.ctx.config.users
    }

    pub fn current_user(&self) -> String {
        self.ctx.store.current_user()
    }

    /// Makes `user` active; emits `user:changed` when it differs.
    ///
    /// Returns whether the active user changed.
    pub fn switch_user(&self, user: &str) -> Result<bool, UserServiceError> {
        if !self.ctx.config.is_known_user(user) {
            return Err(UserServiceError::UnknownUser(user.to_string()));
        }
        let current = normalize_user_id(user);
        let previous = self.ctx.store.current_user();
        if previous == current {
            return Ok(false);
        }

        self.ctx
            .store
            .set(StateValue::CurrentUser(current.clone()), false);
        info!("event=user_switch module=service status=ok from={previous} to={current}");
        self.ctx
            .bus
            .emit(&DashboardEvent::UserChanged { previous, current });
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::{UserService, UserServiceError};
    use crate::events::{DashboardEvent, EventKind};
    use crate::service::test_context;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn switch_user_emits_change_once() {
        let ctx = test_context();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        ctx.bus.on(EventKind::UserChanged, move |event| {
            sink.borrow_mut().push(event.clone());
        });
        let service = UserService::new(ctx);

        assert_eq!(service.switch_user(" Dad "), Ok(true));
        assert_eq!(service.switch_user("dad"), Ok(false));
        assert_eq!(service.current_user(), "dad");
        assert_eq!(
            *seen.borrow(),
            vec![DashboardEvent::UserChanged {
                previous: "mom".to_string(),
                current: "dad".to_string(),
            }]
        );
    }

    #[test]
    fn unknown_user_is_rejected() {
        let service = UserService::new(test_context());
        assert_eq!(
            service.switch_user("grandma"),
            Err(UserServiceError::UnknownUser("grandma".to_string()))
        );
        assert_eq!(service.current_user(), "mom");
    }
}
